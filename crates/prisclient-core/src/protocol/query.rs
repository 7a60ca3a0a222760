//! Wire envelope (`Query`) and its command/message blocks.
//!
//! Optional fields are omitted from the serialized form when empty, and a
//! missing field decodes to its zero value.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{PrisError, Result};

/// Source identity used for envelopes synthesized locally by the client.
pub const LOCAL_SOURCE: &str = "pris";

/// Routing hint for envelopes addressed to the hub itself.
pub const HUB_DESTINATION: &str = "server";

fn is_false(v: &bool) -> bool {
    !*v
}

fn is_zero(v: &i64) -> bool {
    *v == 0
}

/// Envelope kind (field name is `type` in JSON).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryType {
    Command,
    Message,
}

/// Command verbs understood by the hub.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    /// Handshake request.
    Engage,
    /// Handshake acceptance.
    Proceed,
    /// Session termination.
    Disengage,
    /// Identity lookup (`type` ∈ user, mention, email, id).
    UserRequest,
    /// Room lookup (`type` ∈ name, id).
    RoomRequest,
    /// Info query (`type` ∈ user, room).
    Info,
}

impl Action {
    pub fn as_str(self) -> &'static str {
        match self {
            Action::Engage => "engage",
            Action::Proceed => "proceed",
            Action::Disengage => "disengage",
            Action::UserRequest => "user_request",
            Action::RoomRequest => "room_request",
            Action::Info => "info",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Role a client announces in its engage command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClientType {
    /// Bridges an external chat transport into the hub.
    Adapter,
    /// Implements command/message handling on top of the hub.
    Responder,
}

impl ClientType {
    pub fn as_str(self) -> &'static str {
        match self {
            ClientType::Adapter => "adapter",
            ClientType::Responder => "responder",
        }
    }
}

impl FromStr for ClientType {
    type Err = PrisError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "adapter" => Ok(ClientType::Adapter),
            "responder" => Ok(ClientType::Responder),
            other => Err(PrisError::Config(format!(
                "client type has to be adapter or responder, got {other:?}"
            ))),
        }
    }
}

impl fmt::Display for ClientType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Resolved identity record, owned by the hub.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserInfo {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub mention: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub email: String,
}

/// Command payload (present when `type == "command"`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandBlock {
    /// Request correlation id; minted by the validator when empty.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<Action>,
    /// Sub-kind; its meaning depends on `action` (field name is `type` in JSON).
    #[serde(rename = "type", default, skip_serializing_if = "String::is_empty")]
    pub kind: String,
    /// Handshake timestamp, seconds since epoch (engage only).
    #[serde(default, skip_serializing_if = "is_zero")]
    pub time: i64,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub data: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub error: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub array: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub map: BTreeMap<String, String>,
}

impl CommandBlock {
    pub fn new(action: Action) -> Self {
        Self {
            action: Some(action),
            ..Self::default()
        }
    }

    pub fn with_kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = kind.into();
        self
    }

    pub fn with_data(mut self, data: impl Into<String>) -> Self {
        self.data = data.into();
        self
    }
}

/// Message payload (present when `type == "message"`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageBlock {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub message: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub from: String,
    /// Required: a message envelope without a room is invalid.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub room: String,
    #[serde(default, skip_serializing_if = "is_false")]
    pub mentioned: bool,
    /// Text with the leading mention token removed.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub stripped: String,
    #[serde(rename = "mentionnotify", default, skip_serializing_if = "Vec::is_empty")]
    pub mention_notify: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<UserInfo>,
    #[serde(rename = "username", default, skip_serializing_if = "String::is_empty")]
    pub display_name: String,
}

impl MessageBlock {
    pub fn new(room: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            room: room.into(),
            message: text.into(),
            ..Self::default()
        }
    }
}

/// Wire envelope. Exactly one of `command`/`message` is expected to be
/// populated, matching `kind`; the validator enforces it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Query {
    #[serde(rename = "type")]
    pub kind: QueryType,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub source: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub to: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<CommandBlock>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<MessageBlock>,
}

impl Query {
    pub fn command(source: impl Into<String>, command: CommandBlock) -> Self {
        Self {
            kind: QueryType::Command,
            source: source.into(),
            to: String::new(),
            command: Some(command),
            message: None,
        }
    }

    pub fn message(source: impl Into<String>, message: MessageBlock) -> Self {
        Self {
            kind: QueryType::Message,
            source: source.into(),
            to: String::new(),
            command: None,
            message: Some(message),
        }
    }

    pub fn to(mut self, to: impl Into<String>) -> Self {
        self.to = to.into();
        self
    }

    /// Notice handed to the owning application when the session ends.
    pub fn disengage_notice() -> Self {
        Self::command(LOCAL_SOURCE, CommandBlock::new(Action::Disengage))
    }

    pub fn action(&self) -> Option<Action> {
        self.command.as_ref().and_then(|c| c.action)
    }

    pub fn is_disengage(&self) -> bool {
        self.kind == QueryType::Command && self.action() == Some(Action::Disengage)
    }
}
