//! Decision router: answer from memory, crawl, or chat.

use crate::error::RouterError;
use crate::gate::{ConversationGate, ConversationState};
use crate::responder::{Responder, ResponseRequest, TemplateResponder};
use crate::settings::RouterSettings;
use log::{debug, info, warn};
use regex::Regex;
use std::sync::{Arc, LazyLock};
use trawl_crawl::CrawlOrchestrator;
use trawl_memory::{MemoryStore, NewMemoryRecord, RecordKind, RetrievalHit, RetrievalQuery};
use trawl_protocol::{EventMsg, EventPayload, EventSink, Reply, Route};

const TRAILING_PUNCTUATION: &[char] = &['.', ',', ';', ':', '!', '?', ')', ']', '}', '"', '\'', '>'];

/// Routes each user turn and records it in memory.
pub struct DecisionRouter {
    store: Arc<dyn MemoryStore>,
    crawler: CrawlOrchestrator,
    responder: Arc<dyn Responder>,
    settings: RouterSettings,
    gate: ConversationGate,
    event_sink: Option<Arc<dyn EventSink>>,
}

impl DecisionRouter {
    pub fn new(store: Arc<dyn MemoryStore>, crawler: CrawlOrchestrator) -> Self {
        Self {
            store,
            crawler,
            responder: Arc::new(TemplateResponder),
            settings: RouterSettings::default(),
            gate: ConversationGate::new(),
            event_sink: None,
        }
    }

    pub fn with_responder(mut self, responder: Arc<dyn Responder>) -> Self {
        self.responder = responder;
        self
    }

    pub fn with_settings(mut self, settings: RouterSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_event_sink(mut self, event_sink: Arc<dyn EventSink>) -> Self {
        self.event_sink = Some(event_sink);
        self
    }

    pub fn settings(&self) -> &RouterSettings {
        &self.settings
    }

    /// Current state of a conversation.
    pub fn state(&self, conversation_id: &str) -> ConversationState {
        self.gate.state(conversation_id)
    }

    /// Handle one user turn.
    ///
    /// The conversation is owned for the whole call, so a turn queued behind
    /// a crawl sees that crawl's memory record.
    pub async fn handle(&self, user_text: &str, conversation_id: &str) -> Result<Reply, RouterError> {
        let result = self.handle_turn(user_text, conversation_id).await;
        match &result {
            Ok(reply) => self.emit(
                conversation_id,
                EventPayload::ReplyReady {
                    kind: reply.kind,
                    chars: reply.text.chars().count(),
                },
            ),
            Err(err) => {
                warn!(
                    "turn failed (conversation_id={}, error={})",
                    conversation_id, err
                );
                self.emit(
                    conversation_id,
                    EventPayload::Error {
                        message: err.user_message(),
                    },
                );
            }
        }
        result
    }

    async fn handle_turn(&self, user_text: &str, conversation_id: &str) -> Result<Reply, RouterError> {
        let turn = self
            .gate
            .enter(conversation_id, self.settings.busy_policy)
            .await?;
        turn.set_state(ConversationState::Retrieving);

        let query = RetrievalQuery::from_text(user_text);
        let hits = self
            .store
            .retrieve(&query, conversation_id, self.settings.retrieval_limit)
            .await;
        let history = self.history(conversation_id).await;
        self.store
            .append(NewMemoryRecord::user(conversation_id, user_text))
            .await
            .map_err(RouterError::StoreUnavailable)?;

        let best_crawl = hits.iter().find(|hit| hit.record.kind == RecordKind::Crawl);
        let best_score = best_crawl.map(|hit| hit.score);
        let mut request = ResponseRequest {
            conversation_id: conversation_id.to_string(),
            question: user_text.to_string(),
            route: Route::Chat,
            context: Vec::new(),
            history,
            crawl: None,
        };

        if let Some(hit) = best_crawl
            && hit.score > self.settings.answer_threshold
        {
            turn.set_state(ConversationState::Answering);
            self.decided(conversation_id, Route::Memory, best_score);
            request.route = Route::Memory;
            request.context = crawl_context(&hits);
            let text = self.compose(&request).await;
            self.remember_reply(conversation_id, &text).await;
            return Ok(Reply::answered(text));
        }

        if let Some(url) = extract_url(user_text) {
            turn.set_state(ConversationState::Crawling);
            self.decided(conversation_id, Route::Crawl, best_score);
            let result = self
                .crawler
                .crawl_for(
                    conversation_id,
                    &url,
                    self.settings.max_pages,
                    self.settings.max_depth,
                )
                .await?;
            let id = self
                .store
                .append(NewMemoryRecord::crawl(conversation_id, result.render()))
                .await
                .map_err(RouterError::StoreUnavailable)?;
            info!(
                "stored crawl result (conversation_id={}, id={}, pages={})",
                conversation_id,
                id,
                result.pages.len()
            );
            request.route = Route::Crawl;
            request.crawl = Some(result);
            let text = self.compose(&request).await;
            return Ok(Reply::crawled(text));
        }

        turn.set_state(ConversationState::Answering);
        self.decided(conversation_id, Route::Chat, best_score);
        request.context = hits.into_iter().map(|hit| hit.record).collect();
        let text = self.compose(&request).await;
        self.remember_reply(conversation_id, &text).await;
        Ok(Reply::answered(text))
    }

    async fn compose(&self, request: &ResponseRequest) -> String {
        match self.responder.respond(request).await {
            Ok(text) if !text.trim().is_empty() => text,
            Ok(_) => {
                warn!(
                    "responder returned empty text, using template (conversation_id={})",
                    request.conversation_id
                );
                TemplateResponder.render(request)
            }
            Err(err) => {
                warn!(
                    "responder failed, using template (conversation_id={}, error={})",
                    request.conversation_id, err
                );
                TemplateResponder.render(request)
            }
        }
    }

    async fn history(&self, conversation_id: &str) -> Vec<String> {
        if self.settings.history_messages == 0 {
            return Vec::new();
        }
        match self
            .store
            .recent(conversation_id, self.settings.history_messages)
            .await
        {
            Ok(records) => records
                .iter()
                .map(|record| {
                    let content: String = record
                        .content
                        .chars()
                        .take(self.settings.history_chars)
                        .collect();
                    format!("{}: {}", record.author, content)
                })
                .collect(),
            Err(err) => {
                warn!(
                    "history unavailable (conversation_id={}, error={})",
                    conversation_id, err
                );
                Vec::new()
            }
        }
    }

    async fn remember_reply(&self, conversation_id: &str, text: &str) {
        if !self.settings.remember_replies {
            return;
        }
        if let Err(err) = self
            .store
            .append(NewMemoryRecord::agent(conversation_id, text))
            .await
        {
            warn!(
                "agent reply not remembered (conversation_id={}, error={})",
                conversation_id, err
            );
        }
    }

    fn decided(&self, conversation_id: &str, route: Route, score: Option<f32>) {
        debug!(
            "route decided (conversation_id={}, route={:?}, score={:?})",
            conversation_id, route, score
        );
        self.emit(conversation_id, EventPayload::RouteDecided { route, score });
    }

    fn emit(&self, conversation_id: &str, payload: EventPayload) {
        if let Some(sink) = &self.event_sink {
            sink.emit(EventMsg::new(conversation_id, payload));
        }
    }
}

fn crawl_context(hits: &[RetrievalHit]) -> Vec<trawl_memory::MemoryRecord> {
    hits.iter()
        .filter(|hit| hit.record.kind == RecordKind::Crawl)
        .map(|hit| hit.record.clone())
        .collect()
}

static EXPLICIT_URL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bhttps?://\S+").expect("explicit url pattern"));

static BARE_DOMAIN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?:[a-z0-9](?:[a-z0-9-]*[a-z0-9])?\.)+([a-z]{2,})(?:/\S*)?$")
        .expect("bare domain pattern")
});

/// Endings that name files far more often than sites (`config.json`, `node.js`).
const FILE_EXTENSIONS: &[&str] = &[
    "bak", "bat", "cfg", "conf", "cpp", "css", "csv", "dll", "doc", "docx", "env", "exe", "gif",
    "go", "gz", "htm", "html", "ini", "java", "jpeg", "jpg", "js", "json", "jsx", "lock", "log",
    "md", "mp3", "mp4", "pdf", "php", "png", "py", "rb", "rs", "sh", "sql", "svg", "tar", "toml",
    "ts", "tsx", "txt", "wav", "xls", "xlsx", "xml", "yaml", "yml", "zip",
];

/// First URL in the text, if any.
///
/// Explicit `http(s)://` links win; otherwise a bare domain such as
/// `example.org` is promoted to `https://example.org`. Bare names ending in
/// a file extension are left alone.
pub fn extract_url(text: &str) -> Option<String> {
    if let Some(found) = EXPLICIT_URL.find(text) {
        let url = found.as_str().trim_end_matches(TRAILING_PUNCTUATION);
        if url
            .split_once("://")
            .is_some_and(|(_, rest)| !rest.is_empty())
        {
            return Some(url.to_string());
        }
    }
    text.split_whitespace()
        .map(|token| {
            token
                .trim_start_matches(['(', '[', '<', '"', '\''])
                .trim_end_matches(TRAILING_PUNCTUATION)
        })
        .find(|token| !token.contains('@') && is_bare_domain(token))
        .map(|domain| format!("https://{domain}"))
}

fn is_bare_domain(token: &str) -> bool {
    let Some(captures) = BARE_DOMAIN.captures(token) else {
        return false;
    };
    captures.get(1).is_some_and(|tld| {
        let tld = tld.as_str().to_ascii_lowercase();
        !FILE_EXTENSIONS.contains(&tld.as_str())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn extracts_explicit_urls_without_trailing_punctuation() {
        assert_eq!(
            extract_url("please crawl https://example.org/docs."),
            Some("https://example.org/docs".to_string())
        );
        assert_eq!(
            extract_url("(see http://site.test/a?b=1), thanks"),
            Some("http://site.test/a?b=1".to_string())
        );
    }

    #[test]
    fn promotes_bare_domains() {
        assert_eq!(
            extract_url("look at example.org please"),
            Some("https://example.org".to_string())
        );
        assert_eq!(
            extract_url("check docs.site.test/guide!"),
            Some("https://docs.site.test/guide".to_string())
        );
    }

    #[test]
    fn ignores_text_without_urls() {
        assert_eq!(extract_url("how are you today?"), None);
        assert_eq!(extract_url("version 1.2 is out"), None);
        assert_eq!(extract_url("mail me at team@example.org"), None);
    }

    #[test]
    fn file_names_are_not_domains() {
        assert_eq!(extract_url("I edited config.json yesterday"), None);
        assert_eq!(extract_url("node.js is slow"), None);
        assert_eq!(extract_url("see src/main.rs and README.md"), None);
        assert_eq!(
            extract_url("config.json lives on docs.example.org"),
            Some("https://docs.example.org".to_string())
        );
    }
}
