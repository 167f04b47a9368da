//! # Transport Collaborator
//!
//! The messaging gateway the flows talk to. The engine only needs to send,
//! edit and delete a message carrying an [`OptionSet`], acknowledge a raw
//! selection event, and bind a selection token to a handler. Everything else
//! (polling, rate limits, retries, timeouts) belongs to the implementation.
//!
//! Calls are treated as bounded synchronous operations; implementations over
//! an async client are expected to block on their runtime handle or hand the
//! work to a dedicated thread.
//!
//! - [`memory`] - an in-process transport that records every call

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod memory;

/// Opaque handle to a displayed message, needed to edit or delete it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageRef {
    /// Chat/recipient the message lives in.
    pub chat: String,
    /// Transport-specific message id.
    pub id: String,
}

impl fmt::Display for MessageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.chat, self.id)
    }
}

/// How the options are attached to the message.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Layout {
    /// Buttons under the message, one per row, reporting back a token.
    #[default]
    Inline,
    /// A reply keyboard whose buttons send their label as a plain message.
    Reply,
}

/// One selectable entry of a rendered option set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MenuOption {
    /// Routing token the transport reports when this option is chosen.
    pub token: String,
    /// Localized label shown to the user.
    pub text: String,
}

/// A compiled, ready-to-send set of options in display order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionSet {
    pub layout: Layout,
    pub options: Vec<MenuOption>,
}

impl OptionSet {
    pub fn inline(options: Vec<MenuOption>) -> Self {
        Self {
            layout: Layout::Inline,
            options,
        }
    }

    pub fn reply(options: Vec<MenuOption>) -> Self {
        Self {
            layout: Layout::Reply,
            options,
        }
    }

    /// No buttons at all; used for plain messages.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.options.is_empty()
    }

    pub fn len(&self) -> usize {
        self.options.len()
    }

    /// Labels in display order.
    pub fn labels(&self) -> Vec<&str> {
        self.options.iter().map(|o| o.text.as_str()).collect()
    }

    pub fn tokens(&self) -> Vec<&str> {
        self.options.iter().map(|o| o.token.as_str()).collect()
    }

    pub fn token_for(&self, label: &str) -> Option<&str> {
        self.options
            .iter()
            .find(|o| o.text == label)
            .map(|o| o.token.as_str())
    }
}

/// A raw "option selected" event as delivered by the transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    /// Transport event id, used to acknowledge it.
    pub id: String,
    /// Recipient key of the user who pressed the option.
    pub sender: String,
    /// Token of the pressed option.
    pub token: String,
    /// The message the option was attached to, when known.
    pub message: Option<MessageRef>,
}

/// Kind of an incoming plain message; chain steps match on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    Text,
    Photo,
    Location,
    Contact,
    Audio,
    Video,
    VideoNote,
    Voice,
    Document,
    Sticker,
}

/// A plain (non-selection) message from a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncomingMessage {
    pub sender: String,
    pub kind: MessageKind,
    /// Text body or caption.
    pub text: Option<String>,
}

impl IncomingMessage {
    pub fn text(sender: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            sender: sender.into(),
            kind: MessageKind::Text,
            text: Some(text.into()),
        }
    }

    pub fn of_kind(sender: impl Into<String>, kind: MessageKind) -> Self {
        Self {
            sender: sender.into(),
            kind,
            text: None,
        }
    }
}

/// Errors reported by a transport implementation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// The remote side refused the request.
    #[error("rejected: {0}")]
    Rejected(String),

    /// The message or handler being addressed does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Local I/O failure while talking to the gateway.
    #[error("io: {0}")]
    Io(String),
}

impl From<std::io::Error> for TransportError {
    fn from(err: std::io::Error) -> Self {
        TransportError::Io(err.to_string())
    }
}

/// Callback bound to a selection token.
pub type SelectionHandler = Arc<dyn Fn(&Selection) + Send + Sync>;

/// Messaging gateway used by menus, chains and lists.
pub trait Transport: Send + Sync {
    /// Send a new message to `to`.
    fn send(&self, to: &str, text: &str, options: &OptionSet) -> Result<MessageRef, TransportError>;

    /// Replace the text and options of an existing message.
    fn edit(
        &self,
        message: &MessageRef,
        text: &str,
        options: &OptionSet,
    ) -> Result<MessageRef, TransportError>;

    /// Delete a message. Callers treat this as best-effort.
    fn delete(&self, message: &MessageRef) -> Result<(), TransportError>;

    /// Answer a selection event so the client stops its spinner.
    fn acknowledge(&self, selection: &Selection) -> Result<(), TransportError>;

    /// Route selections carrying `token` to `handler`, replacing any previous binding.
    fn register_selection_handler(&self, token: &str, handler: SelectionHandler);
}
