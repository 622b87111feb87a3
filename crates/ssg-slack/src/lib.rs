//! Slack adapter (Web API over reqwest).
//!
//! Implements the `ssg-core` ChatBackend port with `chat.postMessage`,
//! `conversations.history` and `conversations.open`.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tokio::time::sleep;
use tracing::{debug, warn};

use ssg_core::{
    chat::port::ChatBackend,
    config::Config,
    domain::{AccountId, ChatMessage, ConversationId, MessageTs},
    errors::Error,
    Result,
};

/// Page size for `conversations.history`.
const HISTORY_PAGE_LIMIT: u32 = 200;
/// Upper bound on pages walked per fetch.
const HISTORY_MAX_PAGES: usize = 10;

#[derive(Clone, Debug)]
pub struct SlackConfig {
    pub token: String,
    pub api_base: String,
    pub timeout: Duration,
}

impl From<&Config> for SlackConfig {
    fn from(cfg: &Config) -> Self {
        Self {
            token: cfg.slack_user_token.clone(),
            api_base: cfg.slack_api_base.clone(),
            timeout: cfg.slack_http_timeout,
        }
    }
}

#[derive(Clone, Debug)]
pub struct SlackBackend {
    cfg: SlackConfig,
    http: reqwest::Client,
}

impl SlackBackend {
    pub fn new(cfg: SlackConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(cfg.timeout)
            .build()
            .map_err(|e| Error::External(format!("slack http client build failed: {e}")))?;
        Ok(Self { cfg, http })
    }

    fn url(&self, method: &str) -> String {
        format!("{}/{method}", self.cfg.api_base.trim_end_matches('/'))
    }

    /// POST a Web API method (form-encoded) and unwrap the `{"ok": ..}` envelope.
    ///
    /// HTTP 429 is retried once after the server's `Retry-After`.
    async fn call(&self, method: &str, params: &[(&str, String)]) -> Result<Value> {
        const MAX_RETRIES: usize = 1;
        let mut attempts = 0usize;
        loop {
            let resp = self
                .http
                .post(self.url(method))
                .bearer_auth(&self.cfg.token)
                .form(params)
                .send()
                .await
                .map_err(|e| Error::External(format!("slack {method} request error: {e}")))?;

            let status = resp.status();
            if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                let wait = retry_after(resp.headers());
                if attempts < MAX_RETRIES {
                    attempts += 1;
                    warn!(method, ?wait, "slack rate limited; retrying");
                    sleep(wait).await;
                    continue;
                }
                return Err(Error::Api {
                    method: method.to_string(),
                    code: "ratelimited".to_string(),
                });
            }

            if !status.is_success() {
                let body = resp.text().await.unwrap_or_default();
                return Err(Error::External(format!(
                    "slack {method} failed: {status} {}",
                    body.chars().take(200).collect::<String>()
                )));
            }

            let v: Value = resp
                .json()
                .await
                .map_err(|e| Error::External(format!("slack {method} json error: {e}")))?;
            return check_ok(method, v);
        }
    }
}

#[async_trait]
impl ChatBackend for SlackBackend {
    async fn post_message(&self, conversation: &ConversationId, text: &str) -> Result<MessageTs> {
        let v = self
            .call(
                "chat.postMessage",
                &[
                    ("channel", conversation.0.clone()),
                    ("text", text.to_string()),
                ],
            )
            .await?;
        v.get("ts")
            .and_then(|t| t.as_str())
            .map(MessageTs::new)
            .ok_or_else(|| Error::External("chat.postMessage returned no ts".to_string()))
    }

    async fn fetch_history(
        &self,
        conversation: &ConversationId,
        oldest: &MessageTs,
    ) -> Result<Vec<ChatMessage>> {
        let mut messages = Vec::new();
        let mut cursor: Option<String> = None;

        for _ in 0..HISTORY_MAX_PAGES {
            let mut params = vec![
                ("channel", conversation.0.clone()),
                ("oldest", oldest.as_str().to_string()),
                ("inclusive", "false".to_string()),
                ("limit", HISTORY_PAGE_LIMIT.to_string()),
            ];
            if let Some(c) = &cursor {
                params.push(("cursor", c.clone()));
            }

            let v = self.call("conversations.history", &params).await?;
            let page = parse_history(&v)?;
            debug!(conversation = %conversation, count = page.messages.len(), "history page");
            messages.extend(page.messages);

            match page.next_cursor {
                Some(next) => cursor = Some(next),
                None => break,
            }
        }

        // Slack answers newest-first; the port contract is oldest-first.
        messages.sort_by(|a, b| a.ts.cmp(&b.ts));
        Ok(messages)
    }

    async fn open_direct_conversation(&self, account: &AccountId) -> Result<ConversationId> {
        let v = self
            .call("conversations.open", &[("users", account.0.clone())])
            .await?;
        v.pointer("/channel/id")
            .and_then(|id| id.as_str())
            .filter(|id| !id.is_empty())
            .map(|id| ConversationId(id.to_string()))
            .ok_or_else(|| Error::External("conversations.open returned no channel id".to_string()))
    }
}

fn retry_after(headers: &reqwest::header::HeaderMap) -> Duration {
    headers
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
        .unwrap_or(Duration::from_secs(1))
}

/// Map `{"ok": false, "error": code}` to `Error::Api`.
fn check_ok(method: &str, v: Value) -> Result<Value> {
    if v.get("ok").and_then(|ok| ok.as_bool()) == Some(true) {
        return Ok(v);
    }
    let code = v
        .get("error")
        .and_then(|e| e.as_str())
        .unwrap_or("unknown_error")
        .to_string();
    Err(Error::Api {
        method: method.to_string(),
        code,
    })
}

#[derive(Debug)]
struct HistoryPage {
    messages: Vec<ChatMessage>,
    next_cursor: Option<String>,
}

fn parse_history(v: &Value) -> Result<HistoryPage> {
    let raw = v
        .get("messages")
        .and_then(|m| m.as_array())
        .ok_or_else(|| Error::External("conversations.history returned no messages".to_string()))?;

    let messages = raw
        .iter()
        .filter_map(|m| {
            let ts = m.get("ts").and_then(|t| t.as_str())?;
            let author = m
                .get("user")
                .or_else(|| m.get("bot_id"))
                .and_then(|u| u.as_str())
                .map(|u| AccountId(u.to_string()));
            let text = m
                .get("text")
                .and_then(|t| t.as_str())
                .unwrap_or("")
                .to_string();
            Some(ChatMessage {
                author,
                text,
                ts: MessageTs::new(ts),
            })
        })
        .collect();

    let has_more = v.get("has_more").and_then(|h| h.as_bool()).unwrap_or(false);
    let next_cursor = v
        .pointer("/response_metadata/next_cursor")
        .and_then(|c| c.as_str())
        .filter(|c| has_more && !c.is_empty())
        .map(|c| c.to_string());

    Ok(HistoryPage {
        messages,
        next_cursor,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn ok_envelope_passes_through() {
        let v = json!({"ok": true, "ts": "1700000000.000100"});
        assert_eq!(check_ok("chat.postMessage", v.clone()).unwrap(), v);
    }

    #[test]
    fn error_envelope_maps_to_api_error() {
        let err = check_ok("chat.postMessage", json!({"ok": false, "error": "invalid_auth"}))
            .unwrap_err();
        assert_eq!(err.api_code(), Some("invalid_auth"));
        assert_eq!(err.to_string(), "chat.postMessage failed: invalid_auth");

        let err = check_ok("conversations.open", json!({})).unwrap_err();
        assert_eq!(err.api_code(), Some("unknown_error"));
    }

    #[test]
    fn parses_history_messages() {
        let v = json!({
            "ok": true,
            "messages": [
                {"type": "message", "user": "UBOT", "text": "second", "ts": "1700000002.000000"},
                {"type": "message", "bot_id": "B1", "text": "from an app", "ts": "1700000001.500000"},
                {"type": "message", "subtype": "channel_join", "text": "joined", "ts": "1700000001.000000"},
                {"type": "message", "user": "UX", "text": "no ts"}
            ],
            "has_more": false
        });
        let page = parse_history(&v).unwrap();
        assert_eq!(page.messages.len(), 3);
        assert_eq!(page.messages[0].author, Some(AccountId("UBOT".to_string())));
        assert_eq!(page.messages[0].text, "second");
        assert_eq!(page.messages[1].author, Some(AccountId("B1".to_string())));
        assert_eq!(page.messages[2].author, None);
        assert!(page.next_cursor.is_none());
    }

    #[test]
    fn follows_cursor_only_when_more_pages_exist() {
        let more = json!({
            "ok": true,
            "messages": [],
            "has_more": true,
            "response_metadata": {"next_cursor": "bmV4dA=="}
        });
        assert_eq!(
            parse_history(&more).unwrap().next_cursor.as_deref(),
            Some("bmV4dA==")
        );

        let done = json!({
            "ok": true,
            "messages": [],
            "has_more": false,
            "response_metadata": {"next_cursor": ""}
        });
        assert!(parse_history(&done).unwrap().next_cursor.is_none());
    }

    #[test]
    fn missing_messages_array_is_an_error() {
        assert!(parse_history(&json!({"ok": true})).is_err());
    }

    #[test]
    fn retry_after_defaults_to_one_second() {
        let mut headers = reqwest::header::HeaderMap::new();
        assert_eq!(retry_after(&headers), Duration::from_secs(1));
        headers.insert(reqwest::header::RETRY_AFTER, "7".parse().unwrap());
        assert_eq!(retry_after(&headers), Duration::from_secs(7));
    }

    #[test]
    fn builds_method_urls() {
        let b = SlackBackend::new(SlackConfig {
            token: "xoxp".to_string(),
            api_base: "https://slack.com/api/".to_string(),
            timeout: Duration::from_secs(1),
        })
        .unwrap();
        assert_eq!(b.url("chat.postMessage"), "https://slack.com/api/chat.postMessage");
    }
}
