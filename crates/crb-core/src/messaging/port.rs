use async_trait::async_trait;

use crate::{
    domain::{ChatId, MessageRef},
    Result,
};

/// Cross-messenger port.
///
/// Telegram is the first implementation; the relay only ever sends plain
/// text, so the surface is a single method returning a reference to the sent
/// message (needed for the forward-mapping).
#[async_trait]
pub trait MessagingPort: Send + Sync {
    async fn send_message(&self, chat_id: ChatId, text: &str) -> Result<MessageRef>;
}
