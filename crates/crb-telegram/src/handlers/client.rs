use std::sync::Arc;

use teloxide::{prelude::*, types::Message};

use crb_core::{domain::ClientId, registry::ClientProfile};

use crate::router::AppState;

/// Inbound path: a private text message from a client.
pub async fn handle_client_message(msg: Message, state: Arc<AppState>) -> ResponseResult<()> {
    let Some(user) = msg.from() else {
        return Ok(());
    };
    let Some(text) = msg.text() else {
        return Ok(());
    };

    let id = ClientId(user.id.0 as i64);
    let profile = ClientProfile {
        username: user.username.clone(),
        name: user.full_name(),
    };

    if let Err(e) = state
        .relay
        .handle_client_message(id, &profile, text, state.messenger.as_ref())
        .await
    {
        tracing::error!(client = id.0, "client relay failed: {e}");
    }

    Ok(())
}
