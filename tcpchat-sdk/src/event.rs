//! Events emitted by the chat client for the UI layer to consume.

use serde::Serialize;

/// Events decoded from server lines, plus the locally raised
/// [`Event::PeerDisconnected`].
///
/// Serialized with `#[serde(tag = "type", content = "data")]` so consumers
/// printing JSON can switch on `type`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum Event {
    /// Response to a login request. `reason` is set only on failure.
    LoginResult {
        success: bool,
        reason: Option<String>,
    },

    /// A message sent to everyone.
    PublicMessage {
        sender: String,
        text: String,
    },

    /// A message addressed only to us.
    PrivateMessage {
        sender: String,
        text: String,
    },

    /// Our last message could not be delivered.
    MessageDeliveryError {
        reason: String,
    },

    /// The server did not understand our last command.
    CommandError {
        reason: String,
    },

    /// Currently connected users.
    UserListUpdate {
        usernames: Vec<String>,
    },

    /// Commands the server supports.
    SupportedCommands {
        commands: Vec<String>,
    },

    /// The connection failed while reading. Never sent by the server.
    PeerDisconnected,
}

impl Event {
    /// Short name of the variant, used in log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            Event::LoginResult { .. } => "login_result",
            Event::PublicMessage { .. } => "public_message",
            Event::PrivateMessage { .. } => "private_message",
            Event::MessageDeliveryError { .. } => "message_delivery_error",
            Event::CommandError { .. } => "command_error",
            Event::UserListUpdate { .. } => "user_list_update",
            Event::SupportedCommands { .. } => "supported_commands",
            Event::PeerDisconnected => "peer_disconnected",
        }
    }
}
