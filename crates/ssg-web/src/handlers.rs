use std::{sync::Arc, time::Instant};

use axum::{extract::State, http::StatusCode, response::Html, Form};
use serde::Deserialize;
use tracing::{debug, info, warn};

use ssg_core::{
    chat::correlator::RequestState,
    errors::Error,
    formatting::{format_story, STORY_HEADING},
    story::{build_prompt, ChildProfile},
};

use crate::{
    page::{self, Outcome},
    router::AppState,
};

/// Raw form fields. Kept as strings so invalid input can be echoed back.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct StoryForm {
    #[serde(default)]
    pub gender: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub age: String,
    #[serde(default)]
    pub situation: String,
}

pub async fn index(State(state): State<Arc<AppState>>) -> Html<String> {
    Html(page::render(
        &state.cfg.model_label,
        &StoryForm::default(),
        Outcome::Empty,
    ))
}

pub async fn healthz() -> &'static str {
    "ok"
}

pub async fn generate(
    State(state): State<Arc<AppState>>,
    Form(form): Form<StoryForm>,
) -> (StatusCode, Html<String>) {
    let label = &state.cfg.model_label;

    let profile = match ChildProfile::parse(&form.gender, &form.name, &form.age, &form.situation)
    {
        Ok(p) => p,
        Err(e) => {
            debug!(error = %e, "rejected story form");
            return (
                status_for(&e),
                Html(page::render(label, &form, Outcome::Error(&e.to_string()))),
            );
        }
    };

    let prompt = build_prompt(&profile);
    let policy = state.cfg.wait_policy();
    let cancel = state.shutdown.child_token();
    let started = Instant::now();

    info!(age = profile.age, gender = %profile.gender, "generating social story");

    let result = state
        .correlator
        .request(&prompt, &policy, &cancel, &mut |s: &RequestState| {
            log_state(s)
        })
        .await;

    match result {
        Ok(reply) => {
            info!(
                polls = reply.polls,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "story delivered"
            );
            let story = format_story(&reply.text, STORY_HEADING);
            (
                StatusCode::OK,
                Html(page::render(label, &form, Outcome::Story(&story))),
            )
        }
        Err(e) => {
            warn!(
                error = %e,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "story generation failed"
            );
            (
                status_for(&e),
                Html(page::render(label, &form, Outcome::Error(&e.to_string()))),
            )
        }
    }
}

fn log_state(s: &RequestState) {
    match s {
        RequestState::Sent(token) => {
            debug!(conversation = %token.conversation, ts = %token.ts, "request sent")
        }
        RequestState::Polling { attempt } => debug!(attempt, "polling for reply"),
        other if other.is_terminal() => debug!(state = ?other, "request finished"),
        _ => {}
    }
}

fn status_for(e: &Error) -> StatusCode {
    match e {
        Error::Validation(_) => StatusCode::BAD_REQUEST,
        Error::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
        Error::Cancelled => StatusCode::SERVICE_UNAVAILABLE,
        Error::Delivery(_)
        | Error::Lookup(_)
        | Error::Backend { .. }
        | Error::Api { .. }
        | Error::External(_) => StatusCode::BAD_GATEWAY,
        Error::Config(_) | Error::Io(_) | Error::Json(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use tokio_util::sync::CancellationToken;

    use ssg_core::{
        chat::{correlator::Correlator, port::ChatBackend},
        config::Config,
        domain::{AccountId, ChatMessage, ConversationId, MessageTs},
        Result,
    };

    #[derive(Default)]
    struct FakeSlack {
        reject_post: Option<&'static str>,
        replies: Mutex<VecDeque<Vec<ChatMessage>>>,
        posted: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl ChatBackend for FakeSlack {
        async fn post_message(&self, _c: &ConversationId, text: &str) -> Result<MessageTs> {
            if let Some(code) = self.reject_post {
                return Err(Error::Api {
                    method: "chat.postMessage".to_string(),
                    code: code.to_string(),
                });
            }
            self.posted.lock().unwrap().push(text.to_string());
            Ok(MessageTs::new("1700000000.000100"))
        }

        async fn fetch_history(
            &self,
            _c: &ConversationId,
            _oldest: &MessageTs,
        ) -> Result<Vec<ChatMessage>> {
            Ok(self.replies.lock().unwrap().pop_front().unwrap_or_default())
        }

        async fn open_direct_conversation(&self, account: &AccountId) -> Result<ConversationId> {
            Ok(ConversationId(format!("D-{}", account.0)))
        }
    }

    fn config(timeout_ms: &str) -> Config {
        let timeout_ms = timeout_ms.to_string();
        Config::from_lookup(move |k: &str| match k {
            "SLACK_USER_TOKEN" => Some("xoxp-test".to_string()),
            "BOT_USER_ID" => Some("UBOT".to_string()),
            "REPLY_TIMEOUT_MS" => Some(timeout_ms.clone()),
            _ => None,
        })
        .unwrap()
    }

    fn state(backend: Arc<FakeSlack>, timeout_ms: &str) -> Arc<AppState> {
        Arc::new(AppState {
            cfg: Arc::new(config(timeout_ms)),
            correlator: Arc::new(Correlator::new(backend)),
            shutdown: CancellationToken::new(),
        })
    }

    fn form(age: &str) -> StoryForm {
        StoryForm {
            gender: "male".to_string(),
            name: "Yoni".to_string(),
            age: age.to_string(),
            situation: "getting a haircut".to_string(),
        }
    }

    fn bot(text: &str, ts: &str) -> ChatMessage {
        ChatMessage {
            author: Some(AccountId("UBOT".to_string())),
            text: text.to_string(),
            ts: MessageTs::new(ts),
        }
    }

    #[tokio::test]
    async fn index_renders_form() {
        let Html(body) = index(State(state(Arc::new(FakeSlack::default()), "0"))).await;
        assert!(body.contains(page::TITLE));
        assert!(body.contains("Using model: claude_2"));
        assert!(body.contains(page::SUBMIT_LABEL));
    }

    #[tokio::test]
    async fn invalid_age_is_rejected_without_sending() {
        let backend = Arc::new(FakeSlack::default());
        let (status, Html(body)) = generate(State(state(backend.clone(), "0")), Form(form("1"))).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body.contains("age must be at least 2"));
        assert!(backend.posted.lock().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn renders_finished_story() {
        let backend = Arc::new(FakeSlack::default());
        backend.replies.lock().unwrap().extend([
            vec![],
            vec![bot("_Typing…_", "1700000001.000000")],
            vec![bot(
                "- Title: הספר\nאני הולך לספר.",
                "1700000002.000000",
            )],
        ]);

        let (status, Html(body)) = generate(State(state(backend.clone(), "0")), Form(form("4"))).await;

        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("Claude's Social Story:"));
        assert!(body.contains("<h3 style='color: #333;'>Title: הספר</h3>"));
        assert!(body.contains("<p>אני הולך לספר.</p>"));
        assert!(!body.contains("Typing…"));

        let posted = backend.posted.lock().unwrap();
        assert_eq!(posted.len(), 1);
        assert!(posted[0].contains("a male child named Yoni, who is 4 years old, about getting a haircut"));
    }

    #[tokio::test]
    async fn delivery_error_is_shown_verbatim() {
        let backend = Arc::new(FakeSlack {
            reject_post: Some("not_authed"),
            ..FakeSlack::default()
        });
        let (status, Html(body)) = generate(State(state(backend, "0")), Form(form("6"))).await;

        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert!(body.contains("error sending message: chat.postMessage failed: not_authed"));
    }

    #[tokio::test(start_paused = true)]
    async fn silent_responder_times_out() {
        let backend = Arc::new(FakeSlack::default());
        let (status, Html(body)) =
            generate(State(state(backend, "20000")), Form(form("9"))).await;

        assert_eq!(status, StatusCode::GATEWAY_TIMEOUT);
        assert!(body.contains("no reply within 20s"));
    }

    #[tokio::test]
    async fn shutdown_cancels_before_sending() {
        let backend = Arc::new(FakeSlack::default());
        let st = state(backend.clone(), "0");
        st.shutdown.cancel();

        let (status, _) = generate(State(st), Form(form("5"))).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert!(backend.posted.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn healthz_is_ok() {
        assert_eq!(healthz().await, "ok");
    }
}
