/// Platform chat id (numeric).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ChatId(pub i64);

/// Platform message id (numeric).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MessageId(pub i32);

/// A stable reference to a sent message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MessageRef {
    pub chat_id: ChatId,
    pub message_id: MessageId,
}

/// A client's numeric platform id.
///
/// The registry keys records by the string form of this id; replies to the
/// client go to the private chat with the same numeric id.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ClientId(pub i64);

impl ClientId {
    pub fn storage_key(&self) -> String {
        self.0.to_string()
    }

    pub fn chat_id(&self) -> ChatId {
        ChatId(self.0)
    }
}
