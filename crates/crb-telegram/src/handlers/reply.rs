use std::sync::Arc;

use teloxide::{prelude::*, types::Message};

use crb_core::domain::MessageId;

use crate::router::AppState;

/// Outbound path: a staff member replied to a forwarded message inside the
/// staff group. Replies to untracked messages are dropped by the relay.
pub async fn handle_staff_reply(msg: Message, state: Arc<AppState>) -> ResponseResult<()> {
    let Some(replied) = msg.reply_to_message() else {
        return Ok(());
    };
    let Some(text) = msg.text() else {
        return Ok(());
    };

    if let Err(e) = state
        .relay
        .relay_reply(MessageId(replied.id.0), text, state.messenger.as_ref())
        .await
    {
        tracing::error!("staff reply relay failed: {e}");
    }

    Ok(())
}
