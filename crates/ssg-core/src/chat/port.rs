use async_trait::async_trait;

use crate::{
    domain::{AccountId, ChatMessage, ConversationId, MessageTs},
    Result,
};

/// Chat backend port.
///
/// Slack is the first implementation; anything that can post a message, list the
/// messages after a cursor and open a direct conversation fits behind it.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Post `text` into `conversation` and return the new message's timestamp.
    async fn post_message(&self, conversation: &ConversationId, text: &str) -> Result<MessageTs>;

    /// Messages in `conversation` strictly newer than `oldest`, **oldest-first**.
    async fn fetch_history(
        &self,
        conversation: &ConversationId,
        oldest: &MessageTs,
    ) -> Result<Vec<ChatMessage>>;

    /// Open (or look up) the direct conversation with `account`. Idempotent.
    async fn open_direct_conversation(&self, account: &AccountId) -> Result<ConversationId>;
}
