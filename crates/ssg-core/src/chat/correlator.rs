//! Request/reply correlation over an asynchronous chat backend.
//!
//! A request posts a prompt, keeps the posted message's timestamp as the
//! correlation token and polls the conversation until the responder account has
//! produced a finished reply newer than that token:
//!
//! `Idle -> Sent(token) -> Polling -> {Delivered | TimedOut | Failed}`

use std::{sync::Arc, time::Duration};

use tokio::time::{sleep, sleep_until, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::{
    chat::port::ChatBackend,
    domain::{AccountId, ChatMessage, ConversationId, MessageTs},
    errors::Error,
    Result,
};

/// Trailing marker the Slack Claude app leaves on a message while it is still
/// composing (`…_`, as in `_Typing…_` or `Still working…_`). Text-suffix
/// sniffing is fragile; the backend exposes no structured "finished" flag.
pub const DEFAULT_IN_PROGRESS_SUFFIX: &str = "…_";

/// The outbound message a reply is correlated against.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CorrelationToken {
    pub conversation: ConversationId,
    pub ts: MessageTs,
}

/// How long and how often to poll, and whose messages count as replies.
#[derive(Clone, Debug)]
pub struct WaitPolicy {
    pub responder: AccountId,
    pub poll_interval: Duration,
    /// `None` polls until cancelled.
    pub timeout: Option<Duration>,
    /// Consecutive failed fetches tolerated before giving up.
    pub max_fetch_failures: u32,
}

impl WaitPolicy {
    pub fn new(responder: AccountId) -> Self {
        Self {
            responder,
            poll_interval: Duration::from_secs(5),
            timeout: Some(Duration::from_secs(600)),
            max_fetch_failures: 3,
        }
    }
}

/// A finished reply from the responder.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Reply {
    pub text: String,
    pub ts: MessageTs,
    /// Number of history fetches it took.
    pub polls: u32,
}

/// Per-request lifecycle, reported through [`Correlator::request`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RequestState {
    Idle,
    Sent(CorrelationToken),
    Polling { attempt: u32 },
    Delivered(String),
    TimedOut,
    Failed(String),
}

impl RequestState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RequestState::Delivered(_) | RequestState::TimedOut | RequestState::Failed(_)
        )
    }
}

#[derive(Clone, Copy, Debug)]
struct Deadline {
    at: Instant,
    limit: Duration,
}

#[derive(Clone)]
pub struct Correlator {
    backend: Arc<dyn ChatBackend>,
    in_progress_suffix: String,
}

impl Correlator {
    pub fn new(backend: Arc<dyn ChatBackend>) -> Self {
        Self {
            backend,
            in_progress_suffix: DEFAULT_IN_PROGRESS_SUFFIX.to_string(),
        }
    }

    pub fn with_in_progress_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.in_progress_suffix = suffix.into();
        self
    }

    pub fn in_progress_suffix(&self) -> &str {
        &self.in_progress_suffix
    }

    /// True when `text` is a "still composing" placeholder.
    pub fn is_in_progress(&self, text: &str) -> bool {
        !self.in_progress_suffix.is_empty() && text.trim_end().ends_with(&self.in_progress_suffix)
    }

    /// Open (or look up) the direct conversation with `account`.
    pub async fn resolve_conversation(&self, account: &AccountId) -> Result<ConversationId> {
        match self.backend.open_direct_conversation(account).await {
            Ok(conversation) if !conversation.0.trim().is_empty() => {
                debug!(%account, %conversation, "resolved direct conversation");
                Ok(conversation)
            }
            Ok(_) => Err(Error::Lookup(format!(
                "no direct conversation with {account}"
            ))),
            Err(e) => Err(Error::Lookup(e.to_string())),
        }
    }

    /// Post `text` and return the correlation token. Never retried.
    pub async fn send(&self, conversation: &ConversationId, text: &str) -> Result<CorrelationToken> {
        let ts = self
            .backend
            .post_message(conversation, text)
            .await
            .map_err(|e| Error::Delivery(e.to_string()))?;

        info!(
            %conversation,
            ts = %ts,
            posted_at = ?ts.to_datetime(),
            chars = text.chars().count(),
            "prompt sent"
        );

        Ok(CorrelationToken {
            conversation: conversation.clone(),
            ts,
        })
    }

    /// Wait for the responder's finished reply to `token`.
    pub async fn await_reply(
        &self,
        token: &CorrelationToken,
        policy: &WaitPolicy,
        cancel: &CancellationToken,
    ) -> Result<Reply> {
        self.poll(token, policy, cancel, &mut |_: &RequestState| {}).await
    }

    /// Full flow: resolve the responder's DM, send `text`, wait for the reply.
    ///
    /// Every state transition is passed to `on_state`, ending with exactly one
    /// terminal state.
    pub async fn request(
        &self,
        text: &str,
        policy: &WaitPolicy,
        cancel: &CancellationToken,
        on_state: &mut (dyn FnMut(&RequestState) + Send),
    ) -> Result<Reply> {
        on_state(&RequestState::Idle);

        let result = self.run_request(text, policy, cancel, &mut *on_state).await;

        match &result {
            Ok(reply) => on_state(&RequestState::Delivered(reply.text.clone())),
            Err(Error::Timeout(_)) => on_state(&RequestState::TimedOut),
            Err(e) => on_state(&RequestState::Failed(e.to_string())),
        }
        result
    }

    async fn run_request(
        &self,
        text: &str,
        policy: &WaitPolicy,
        cancel: &CancellationToken,
        on_state: &mut (dyn FnMut(&RequestState) + Send),
    ) -> Result<Reply> {
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }

        let token = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(Error::Cancelled),
            r = async {
                let conversation = self.resolve_conversation(&policy.responder).await?;
                self.send(&conversation, text).await
            } => r?,
        };
        on_state(&RequestState::Sent(token.clone()));

        self.poll(&token, policy, cancel, on_state).await
    }

    async fn poll(
        &self,
        token: &CorrelationToken,
        policy: &WaitPolicy,
        cancel: &CancellationToken,
        on_state: &mut (dyn FnMut(&RequestState) + Send),
    ) -> Result<Reply> {
        let deadline = policy.timeout.map(|limit| Deadline {
            at: Instant::now() + limit,
            limit,
        });
        let max_failures = policy.max_fetch_failures.max(1);

        let mut attempt = 0u32;
        let mut failures = 0u32;

        loop {
            attempt += 1;
            on_state(&RequestState::Polling { attempt });

            let fetched = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(Error::Cancelled),
                limit = expired(deadline) => return Err(Error::Timeout(limit)),
                r = self.backend.fetch_history(&token.conversation, &token.ts) => r,
            };

            match fetched {
                Ok(messages) => {
                    failures = 0;
                    match latest_candidate(&messages, &token.ts, &policy.responder) {
                        Some(m) if !self.is_in_progress(&m.text) => {
                            info!(
                                conversation = %token.conversation,
                                ts = %m.ts,
                                polls = attempt,
                                "reply received"
                            );
                            return Ok(Reply {
                                text: m.text.clone(),
                                ts: m.ts.clone(),
                                polls: attempt,
                            });
                        }
                        Some(m) => debug!(attempt, ts = %m.ts, "responder still composing"),
                        None => debug!(attempt, "no reply yet"),
                    }
                }
                Err(e) => {
                    failures += 1;
                    warn!(attempt, failures, error = %e, "history fetch failed");
                    if failures >= max_failures {
                        return Err(Error::Backend {
                            attempts: failures,
                            reason: e.to_string(),
                        });
                    }
                }
            }

            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(Error::Cancelled),
                limit = expired(deadline) => return Err(Error::Timeout(limit)),
                _ = sleep(policy.poll_interval) => {}
            }
        }
    }
}

/// Resolves once the deadline passes; never resolves without one.
async fn expired(deadline: Option<Deadline>) -> Duration {
    match deadline {
        Some(d) => {
            sleep_until(d.at).await;
            d.limit
        }
        None => std::future::pending().await,
    }
}

/// Most recent message from `responder` strictly newer than `after`, picked by
/// timestamp rather than position in `messages`.
pub fn latest_candidate<'a>(
    messages: &'a [ChatMessage],
    after: &MessageTs,
    responder: &AccountId,
) -> Option<&'a ChatMessage> {
    messages
        .iter()
        .filter(|m| m.is_from(responder) && &m.ts > after)
        .max_by(|a, b| a.ts.cmp(&b.ts))
}
