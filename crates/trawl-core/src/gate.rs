//! Per-conversation ownership of in-flight turns.
//!
//! Each conversation has one async mutex. Handling a turn holds its owned
//! guard from retrieval until the reply is composed, so at most one crawl
//! runs per conversation and later turns observe its memory append.

use crate::error::RouterError;
use log::debug;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tokio::sync::OwnedMutexGuard;
use trawl_config::BusyPolicy;

/// What the owner of a conversation is doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConversationState {
    #[default]
    Idle,
    Retrieving,
    Answering,
    Crawling,
}

impl fmt::Display for ConversationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Idle => "idle",
            Self::Retrieving => "retrieving",
            Self::Answering => "answering",
            Self::Crawling => "crawling",
        };
        f.write_str(label)
    }
}

#[derive(Default)]
struct Slot {
    turn: Arc<tokio::sync::Mutex<()>>,
    state: Mutex<ConversationState>,
}

type Slots = Arc<Mutex<HashMap<String, Arc<Slot>>>>;

/// Map of conversation id to its turn lock and state.
///
/// A slot lives only while some turn owns or waits on it.
#[derive(Default)]
pub struct ConversationGate {
    slots: Slots,
}

impl ConversationGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take ownership of a conversation for one turn.
    ///
    /// With `BusyPolicy::Reject`, fails with `Busy` instead of waiting when the
    /// current owner is crawling.
    pub async fn enter(
        &self,
        conversation_id: &str,
        policy: BusyPolicy,
    ) -> Result<TurnGuard, RouterError> {
        let slot = self.slot(conversation_id);
        let guard = match slot.turn.clone().try_lock_owned() {
            Ok(guard) => guard,
            Err(_) => {
                let state = *slot.state.lock();
                if policy == BusyPolicy::Reject && state == ConversationState::Crawling {
                    debug!(
                        "rejecting turn for busy conversation (conversation_id={})",
                        conversation_id
                    );
                    return Err(RouterError::Busy(conversation_id.to_string()));
                }
                debug!(
                    "queueing turn behind owner (conversation_id={}, state={})",
                    conversation_id, state
                );
                slot.turn.clone().lock_owned().await
            }
        };
        Ok(TurnGuard {
            conversation_id: conversation_id.to_string(),
            slots: self.slots.clone(),
            slot,
            _turn: guard,
        })
    }

    /// Current state of a conversation; unknown conversations are idle.
    pub fn state(&self, conversation_id: &str) -> ConversationState {
        self.slots
            .lock()
            .get(conversation_id)
            .map(|slot| *slot.state.lock())
            .unwrap_or_default()
    }

    /// Number of conversations with a live slot.
    pub fn active(&self) -> usize {
        self.slots.lock().len()
    }

    fn slot(&self, conversation_id: &str) -> Arc<Slot> {
        self.slots
            .lock()
            .entry(conversation_id.to_string())
            .or_default()
            .clone()
    }
}

/// Ownership token for a conversation; dropping it returns the state to idle.
pub struct TurnGuard {
    conversation_id: String,
    slots: Slots,
    slot: Arc<Slot>,
    _turn: OwnedMutexGuard<()>,
}

impl TurnGuard {
    pub fn set_state(&self, state: ConversationState) {
        *self.slot.state.lock() = state;
    }

    pub fn state(&self) -> ConversationState {
        *self.slot.state.lock()
    }
}

impl Drop for TurnGuard {
    fn drop(&mut self) {
        let mut slots = self.slots.lock();
        *self.slot.state.lock() = ConversationState::Idle;
        // One reference in the map and one here: nobody is queued.
        if Arc::strong_count(&self.slot) == 2 {
            slots.remove(&self.conversation_id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::time::Duration;

    #[tokio::test]
    async fn guard_drop_returns_to_idle() {
        let gate = ConversationGate::new();
        let guard = gate.enter("chat", BusyPolicy::Queue).await.expect("enter");
        guard.set_state(ConversationState::Crawling);
        assert_eq!(gate.state("chat"), ConversationState::Crawling);
        drop(guard);
        assert_eq!(gate.state("chat"), ConversationState::Idle);
        assert_eq!(gate.state("other"), ConversationState::Idle);
    }

    #[tokio::test]
    async fn reject_only_while_crawling() {
        let gate = ConversationGate::new();
        let guard = gate.enter("chat", BusyPolicy::Reject).await.expect("enter");
        guard.set_state(ConversationState::Crawling);
        let err = gate
            .enter("chat", BusyPolicy::Reject)
            .await
            .err()
            .expect("busy");
        assert!(matches!(err, RouterError::Busy(_)));

        let other = gate.enter("other", BusyPolicy::Reject).await;
        assert!(other.is_ok());
    }

    #[tokio::test]
    async fn queue_waits_for_owner() {
        let gate = Arc::new(ConversationGate::new());
        let guard = gate.enter("chat", BusyPolicy::Queue).await.expect("enter");
        guard.set_state(ConversationState::Crawling);

        let waiter = {
            let gate = gate.clone();
            tokio::spawn(async move {
                let next = gate.enter("chat", BusyPolicy::Queue).await.expect("enter");
                next.state()
            })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());
        drop(guard);
        let state = waiter.await.expect("join");
        assert_eq!(state, ConversationState::Idle);
        assert_eq!(gate.active(), 0);
    }

    #[tokio::test]
    async fn idle_slots_are_released() {
        let gate = ConversationGate::new();
        for index in 0..8 {
            let guard = gate
                .enter(&format!("chat-{index}"), BusyPolicy::Queue)
                .await
                .expect("enter");
            assert_eq!(gate.active(), 1);
            drop(guard);
        }
        assert_eq!(gate.active(), 0);
    }
}
