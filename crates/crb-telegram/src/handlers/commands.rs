use std::sync::Arc;

use teloxide::{prelude::*, types::Message};

use crb_core::{
    domain::{ChatId, MessageId},
    relay,
    tagging::CodeSegment,
};

use crate::handlers::client;
use crate::router::AppState;

fn parse_command(text: &str) -> (String, String) {
    // Telegram may send `/cmd@botname arg1 ...`
    let mut parts = text.trim().splitn(2, char::is_whitespace);
    let first = parts.next().unwrap_or("").trim();
    let rest = parts.next().unwrap_or("").trim().to_string();

    let cmd = first
        .trim_start_matches('/')
        .split('@')
        .next()
        .unwrap_or("")
        .to_lowercase();

    (cmd, rest)
}

fn first_arg(rest: &str) -> Option<&str> {
    rest.split_whitespace().next()
}

pub async fn handle_command(msg: Message, state: Arc<AppState>) -> ResponseResult<()> {
    let Some(text) = msg.text() else {
        return Ok(());
    };
    let (cmd, args) = parse_command(text);
    let chat_id = ChatId(msg.chat.id.0);

    if cmd == "start" {
        if let Err(e) = state.messenger.send_message(chat_id, relay::GREETING).await {
            tracing::error!("greeting failed: {e}");
        }
        return Ok(());
    }

    let in_staff_group = state.cfg.crm_group_id == Some(msg.chat.id.0);
    if !in_staff_group {
        // Slash text from a private chat is relayed like any other message;
        // anything else is not ours to answer.
        if msg.chat.is_private() {
            return client::handle_client_message(msg, state).await;
        }
        return Ok(());
    }

    let reply_to = msg.reply_to_message().map(|m| MessageId(m.id.0));
    let arg = first_arg(&args);

    let out = match cmd.as_str() {
        "setcode" | "updatecode" => state.relay.set_code(reply_to, arg).await,
        "codeinfo" => state.relay.code_info(reply_to).await,
        "markprio" => state.relay.change_digit(reply_to, CodeSegment::Priority, arg).await,
        "status" => state.relay.change_digit(reply_to, CodeSegment::Status, arg).await,
        "type" => state.relay.change_digit(reply_to, CodeSegment::Type, arg).await,
        _ => return Ok(()),
    };

    match out {
        Ok(reply_text) => {
            if let Err(e) = state.messenger.send_message(chat_id, &reply_text).await {
                tracing::error!("command reply failed: {e}");
            }
        }
        Err(e) => tracing::error!("command {cmd} failed: {e}"),
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_command_with_bot_suffix_and_args() {
        let (cmd, rest) = parse_command("/setcode@crm_bot 1.2.3.4 extra");
        assert_eq!(cmd, "setcode");
        assert_eq!(rest, "1.2.3.4 extra");
        assert_eq!(first_arg(&rest), Some("1.2.3.4"));
    }

    #[test]
    fn parses_bare_command() {
        let (cmd, rest) = parse_command("/codeinfo");
        assert_eq!(cmd, "codeinfo");
        assert_eq!(rest, "");
        assert_eq!(first_arg(&rest), None);
    }

    #[test]
    fn command_is_lowercased() {
        let (cmd, rest) = parse_command("/Status 2");
        assert_eq!(cmd, "status");
        assert_eq!(first_arg(&rest), Some("2"));
    }
}
