//! Telegram update handlers.
//!
//! Routing mirrors the bot's three surfaces:
//! - private chat text is relayed to the staff destinations
//! - slash messages go through the command dispatcher
//! - non-command replies inside the staff group are routed back to clients

use std::sync::Arc;

use teloxide::{prelude::*, types::Message};

use crate::router::AppState;

mod client;
mod commands;
mod reply;

pub async fn handle_message(msg: Message, state: Arc<AppState>) -> ResponseResult<()> {
    let Some(text) = msg.text() else {
        // Only text messages are relayed.
        return Ok(());
    };

    if text.starts_with('/') {
        return commands::handle_command(msg, state).await;
    }

    if msg.chat.is_private() {
        return client::handle_client_message(msg, state).await;
    }

    let in_staff_group = state.cfg.crm_group_id == Some(msg.chat.id.0);
    if in_staff_group && msg.reply_to_message().is_some() {
        return reply::handle_staff_reply(msg, state).await;
    }

    Ok(())
}
