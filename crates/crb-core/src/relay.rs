//! Bidirectional relay between clients and the staff group.
//!
//! Inbound client messages are forwarded to the configured destinations; the
//! message id of the copy sent to the primary group is remembered so a staff
//! reply to it can be routed back to the client. The forward-mapping lives in
//! memory only and is lost on restart.

use std::{collections::HashMap, sync::Arc};

use tokio::sync::Mutex;

use crate::{
    config::Config,
    domain::{ChatId, ClientId, MessageId},
    messaging::port::MessagingPort,
    registry::{ClientProfile, ClientRegistry},
    tagging::{self, CodeSegment},
    Result,
};

pub const GREETING: &str =
    "Здравствуйте! Отправьте сообщение и наши сотрудники свяжутся с вами.";

const USAGE_REPLY_WITH_CODE: &str =
    "Команда используется ответом на сообщение клиента и принимает код";
const USAGE_REPLY_WITH_DIGIT: &str =
    "Команда используется ответом на сообщение клиента и принимает число";
const USAGE_REPLY: &str = "Команда используется ответом на сообщение клиента";
const UNKNOWN_CLIENT: &str = "Не удалось определить клиента";

struct RelayState {
    registry: ClientRegistry,
    forwards: HashMap<MessageId, ClientId>,
}

/// Relay + tagging service.
///
/// Owns the client registry and the forward-mapping behind one mutex; the
/// messenger is injected per call so the logic is testable without a live
/// connection.
pub struct RelayService {
    cfg: Arc<Config>,
    state: Mutex<RelayState>,
}

impl RelayService {
    pub fn new(cfg: Arc<Config>, registry: ClientRegistry) -> Self {
        Self {
            cfg,
            state: Mutex::new(RelayState {
                registry,
                forwards: HashMap::new(),
            }),
        }
    }

    pub async fn client_count(&self) -> usize {
        self.state.lock().await.registry.len()
    }

    /// Inbound path: ensure the record exists, then forward the message to
    /// the configured destinations. Only the primary-group copy gets a
    /// forward-mapping entry; the broadcast copy cannot be replied to.
    pub async fn handle_client_message(
        &self,
        id: ClientId,
        profile: &ClientProfile,
        text: &str,
        messenger: &dyn MessagingPort,
    ) -> Result<()> {
        let mut st = self.state.lock().await;
        let rec = st.registry.get_or_create(&id, profile)?;

        // Handle and name come from the live update, the code from the record.
        let username = profile.username.as_deref().unwrap_or("nousername");
        let forward_text = format!(
            "🔵 #{} | @{} | {}\n✉️ {}",
            rec.code, username, profile.name, text
        );

        if let Some(group) = self.cfg.crm_group_id {
            let sent = messenger.send_message(ChatId(group), &forward_text).await?;
            st.forwards.insert(sent.message_id, id);
            tracing::info!(client = id.0, "forwarded client message to staff group");
        }
        if let Some(superchat) = self.cfg.superchat_id {
            messenger.send_message(ChatId(superchat), &forward_text).await?;
        }

        Ok(())
    }

    /// Outbound path: a staff reply to a forwarded message goes back to the
    /// originating client verbatim. Replies to untracked messages are
    /// silently ignored.
    pub async fn relay_reply(
        &self,
        replied_to: MessageId,
        text: &str,
        messenger: &dyn MessagingPort,
    ) -> Result<()> {
        let client = {
            let st = self.state.lock().await;
            st.forwards.get(&replied_to).copied()
        };

        let Some(client) = client else {
            tracing::debug!(message_id = replied_to.0, "reply to untracked message, skipping");
            return Ok(());
        };

        messenger.send_message(client.chat_id(), text).await?;
        tracing::info!(client = client.0, "relayed staff reply");
        Ok(())
    }

    /// `/setcode` and `/updatecode`: overwrite the full code verbatim.
    /// Returns the staff-facing reply text.
    pub async fn set_code(
        &self,
        reply_to: Option<MessageId>,
        code: Option<&str>,
    ) -> Result<String> {
        let (Some(reply_to), Some(code)) = (reply_to, code) else {
            return Ok(USAGE_REPLY_WITH_CODE.to_string());
        };

        let mut st = self.state.lock().await;
        let Some(client) = st.forwards.get(&reply_to).copied() else {
            return Ok(UNKNOWN_CLIENT.to_string());
        };
        let Some(rec) = st.registry.set_code(&client, code)? else {
            return Ok(UNKNOWN_CLIENT.to_string());
        };

        Ok(format!(
            "Код установлен для @{}: #{}\n{}",
            rec.username,
            code,
            tagging::describe(code)
        ))
    }

    /// `/codeinfo`: read-only report of the current code.
    pub async fn code_info(&self, reply_to: Option<MessageId>) -> Result<String> {
        let Some(reply_to) = reply_to else {
            return Ok(USAGE_REPLY.to_string());
        };

        let st = self.state.lock().await;
        let Some(client) = st.forwards.get(&reply_to) else {
            return Ok(UNKNOWN_CLIENT.to_string());
        };
        let Some(rec) = st.registry.get(client) else {
            return Ok(UNKNOWN_CLIENT.to_string());
        };

        Ok(format!(
            "Текущий код: #{}\n{}",
            rec.code,
            tagging::describe(&rec.code)
        ))
    }

    /// `/markprio`, `/status`, `/type`: overwrite one code segment. A
    /// malformed stored code is reset to the default before the change.
    pub async fn change_digit(
        &self,
        reply_to: Option<MessageId>,
        segment: CodeSegment,
        value: Option<&str>,
    ) -> Result<String> {
        let (Some(reply_to), Some(value)) = (reply_to, value) else {
            return Ok(USAGE_REPLY_WITH_DIGIT.to_string());
        };

        let mut st = self.state.lock().await;
        let Some(client) = st.forwards.get(&reply_to).copied() else {
            return Ok(UNKNOWN_CLIENT.to_string());
        };
        let Some(rec) = st.registry.get(&client) else {
            return Ok(UNKNOWN_CLIENT.to_string());
        };

        let new_code = tagging::with_digit(&rec.code, segment, value);
        st.registry.set_code(&client, &new_code)?;

        Ok(format!(
            "Код обновлен: #{}\n{}",
            new_code,
            tagging::describe(&new_code)
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::MessageRef;
    use async_trait::async_trait;
    use std::path::PathBuf;
    use std::sync::Mutex as StdMutex;

    #[derive(Default)]
    struct FakeMessenger {
        next_id: StdMutex<i32>,
        sent: StdMutex<Vec<(ChatId, String)>>,
    }

    impl FakeMessenger {
        fn sent_messages(&self) -> Vec<(ChatId, String)> {
            self.sent.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl MessagingPort for FakeMessenger {
        async fn send_message(&self, chat_id: ChatId, text: &str) -> Result<MessageRef> {
            self.sent.lock().unwrap().push((chat_id, text.to_string()));
            let mut guard = self.next_id.lock().unwrap();
            *guard += 1;
            Ok(MessageRef {
                chat_id,
                message_id: MessageId(*guard),
            })
        }
    }

    fn tmp_file(prefix: &str) -> PathBuf {
        let ts = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos();
        let pid = std::process::id();
        PathBuf::from(format!("/tmp/{prefix}-{pid}-{ts}.json"))
    }

    const CRM_GROUP: i64 = -100;
    const SUPERCHAT: i64 = -200;

    fn service(
        prefix: &str,
        crm_group_id: Option<i64>,
        superchat_id: Option<i64>,
    ) -> (RelayService, PathBuf) {
        let path = tmp_file(prefix);
        let cfg = Arc::new(Config {
            bot_token: "x".to_string(),
            crm_group_id,
            superchat_id,
            clients_file: path.clone(),
        });
        let registry = ClientRegistry::load(&path).unwrap();
        (RelayService::new(cfg, registry), path)
    }

    fn bob() -> ClientProfile {
        ClientProfile {
            username: Some("bob".to_string()),
            name: "Bob B".to_string(),
        }
    }

    #[tokio::test]
    async fn end_to_end_forward_reply_and_status() {
        let (relay, path) = service("crb-relay-e2e", Some(CRM_GROUP), None);
        let messenger = FakeMessenger::default();

        relay
            .handle_client_message(ClientId(123), &bob(), "Hello", &messenger)
            .await
            .unwrap();

        let sent = messenger.sent_messages();
        assert_eq!(
            sent,
            vec![(
                ChatId(CRM_GROUP),
                "🔵 #0.0.0.0 | @bob | Bob B\n✉️ Hello".to_string()
            )]
        );

        let doc = std::fs::read_to_string(&path).unwrap();
        assert!(doc.contains("\"123\""));
        assert!(doc.contains("\"username\": \"bob\""));
        assert!(doc.contains("\"name\": \"Bob B\""));
        assert!(doc.contains("\"code\": \"0.0.0.0\""));

        // Staff replies to the forwarded message.
        let forwarded = MessageId(1);
        relay.relay_reply(forwarded, "Hi Bob", &messenger).await.unwrap();
        assert_eq!(
            messenger.sent_messages().last().unwrap(),
            &(ChatId(123), "Hi Bob".to_string())
        );

        // Staff tags the client via the same forwarded message.
        let out = relay
            .change_digit(Some(forwarded), CodeSegment::Status, Some("2"))
            .await
            .unwrap();
        assert!(out.contains("#0.0.2.0"));
        assert!(out.contains("оплата"));

        let doc = std::fs::read_to_string(&path).unwrap();
        assert!(doc.contains("\"code\": \"0.0.2.0\""));

        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test]
    async fn reply_to_untracked_message_is_a_noop() {
        let (relay, path) = service("crb-relay-untracked", Some(CRM_GROUP), None);
        let messenger = FakeMessenger::default();

        relay
            .relay_reply(MessageId(999), "anyone there?", &messenger)
            .await
            .unwrap();
        assert!(messenger.sent_messages().is_empty());

        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test]
    async fn broadcast_copy_gets_no_mapping() {
        let (relay, path) = service("crb-relay-broadcast", Some(CRM_GROUP), Some(SUPERCHAT));
        let messenger = FakeMessenger::default();

        relay
            .handle_client_message(ClientId(1), &bob(), "hi", &messenger)
            .await
            .unwrap();

        let sent = messenger.sent_messages();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0].0, ChatId(CRM_GROUP));
        assert_eq!(sent[1].0, ChatId(SUPERCHAT));
        assert_eq!(sent[0].1, sent[1].1);

        // Message id 2 was the broadcast copy; replies there go nowhere.
        relay.relay_reply(MessageId(2), "reply", &messenger).await.unwrap();
        assert_eq!(messenger.sent_messages().len(), 2);

        // The primary copy routes.
        relay.relay_reply(MessageId(1), "reply", &messenger).await.unwrap();
        assert_eq!(
            messenger.sent_messages().last().unwrap(),
            &(ChatId(1), "reply".to_string())
        );

        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test]
    async fn no_primary_group_still_creates_record() {
        let (relay, path) = service("crb-relay-nogroup", None, Some(SUPERCHAT));
        let messenger = FakeMessenger::default();

        relay
            .handle_client_message(ClientId(5), &bob(), "hi", &messenger)
            .await
            .unwrap();

        // Broadcast only, and nothing to reply to.
        assert_eq!(messenger.sent_messages().len(), 1);
        relay.relay_reply(MessageId(1), "reply", &messenger).await.unwrap();
        assert_eq!(messenger.sent_messages().len(), 1);

        assert_eq!(relay.client_count().await, 1);

        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test]
    async fn missing_username_uses_placeholder() {
        let (relay, path) = service("crb-relay-nouser", Some(CRM_GROUP), None);
        let messenger = FakeMessenger::default();

        let profile = ClientProfile {
            username: None,
            name: "Anon".to_string(),
        };
        relay
            .handle_client_message(ClientId(77), &profile, "hey", &messenger)
            .await
            .unwrap();

        assert_eq!(
            messenger.sent_messages()[0].1,
            "🔵 #0.0.0.0 | @nousername | Anon\n✉️ hey"
        );

        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test]
    async fn second_message_reuses_record_and_code() {
        let (relay, path) = service("crb-relay-repeat", Some(CRM_GROUP), None);
        let messenger = FakeMessenger::default();

        relay
            .handle_client_message(ClientId(123), &bob(), "first", &messenger)
            .await
            .unwrap();
        relay
            .set_code(Some(MessageId(1)), Some("1.2.2.0"))
            .await
            .unwrap();
        relay
            .handle_client_message(ClientId(123), &bob(), "second", &messenger)
            .await
            .unwrap();

        // The second forward carries the updated code.
        assert_eq!(
            messenger.sent_messages().last().unwrap().1,
            "🔵 #1.2.2.0 | @bob | Bob B\n✉️ second"
        );
        assert_eq!(relay.client_count().await, 1);

        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test]
    async fn commands_without_reply_report_usage() {
        let (relay, path) = service("crb-relay-usage", Some(CRM_GROUP), None);

        assert_eq!(
            relay.set_code(None, Some("1.1.1.1")).await.unwrap(),
            USAGE_REPLY_WITH_CODE
        );
        assert_eq!(
            relay.set_code(Some(MessageId(1)), None).await.unwrap(),
            USAGE_REPLY_WITH_CODE
        );
        assert_eq!(relay.code_info(None).await.unwrap(), USAGE_REPLY);
        assert_eq!(
            relay
                .change_digit(None, CodeSegment::Priority, Some("1"))
                .await
                .unwrap(),
            USAGE_REPLY_WITH_DIGIT
        );

        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test]
    async fn commands_on_unmapped_reply_report_unknown_client() {
        let (relay, path) = service("crb-relay-unmapped", Some(CRM_GROUP), None);

        assert_eq!(
            relay
                .set_code(Some(MessageId(5)), Some("1.1.1.1"))
                .await
                .unwrap(),
            UNKNOWN_CLIENT
        );
        assert_eq!(
            relay.code_info(Some(MessageId(5))).await.unwrap(),
            UNKNOWN_CLIENT
        );
        assert_eq!(
            relay
                .change_digit(Some(MessageId(5)), CodeSegment::Type, Some("1"))
                .await
                .unwrap(),
            UNKNOWN_CLIENT
        );

        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test]
    async fn malformed_code_is_stored_and_described_invalid() {
        let (relay, path) = service("crb-relay-malformed", Some(CRM_GROUP), None);
        let messenger = FakeMessenger::default();

        relay
            .handle_client_message(ClientId(123), &bob(), "hi", &messenger)
            .await
            .unwrap();
        let forwarded = MessageId(1);

        let out = relay
            .set_code(Some(forwarded), Some("abc"))
            .await
            .unwrap();
        assert!(out.contains("Код установлен для @bob: #abc"));
        assert!(out.contains(tagging::INVALID_CODE_TEXT));

        let out = relay.code_info(Some(forwarded)).await.unwrap();
        assert_eq!(out, format!("Текущий код: #abc\n{}", tagging::INVALID_CODE_TEXT));

        // Digit change resets the malformed code before applying.
        let out = relay
            .change_digit(Some(forwarded), CodeSegment::Priority, Some("1"))
            .await
            .unwrap();
        assert!(out.contains("#0.0.0.1"));

        let _ = std::fs::remove_file(&path);
    }
}
