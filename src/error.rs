use thiserror::Error;

use crate::menu::NodeId;
use crate::transport::TransportError;
use crate::validation::IdentifierError;

/// Errors surfaced by flow lifecycle, authoring and compile operations.
///
/// Navigation steps triggered by a selection never return these; they log
/// and abort instead (see [`crate::menu::navigate`]).
#[derive(Debug, Error)]
pub enum FlowError {
    /// The menu was never compiled for this locale (or the resolver lacks it).
    #[error("locale '{0}' has not been compiled")]
    InvalidLocale(String),

    /// The recipient has no live dialog.
    #[error("dialog not found for recipient {0}")]
    DialogNotFound(String),

    /// Starting a flow that has nothing to show.
    #[error("flow has no options under its root")]
    EmptyTree,

    /// A list flow was created without any text paths.
    #[error("list has no text paths")]
    EmptyList,

    /// Wrapper around the transport collaborator's failure.
    #[error("transport failure: {0}")]
    Transport(#[from] TransportError),

    /// The node id does not belong to this menu.
    #[error("unknown node {0}")]
    UnknownNode(NodeId),

    /// Splicing a subtree whose root already has a parent.
    #[error("node {0} is already attached to a parent")]
    AlreadyAttached(NodeId),

    /// Splicing a node underneath itself or one of its descendants.
    #[error("node {0} cannot be spliced under its own subtree")]
    CyclicSplice(NodeId),

    /// Two siblings resolve to the same compiled path.
    #[error("duplicate path '{path}' while compiling locale '{locale}'")]
    DuplicatePath { path: String, locale: String },

    #[error("invalid identifier: {0}")]
    InvalidIdentifier(#[from] IdentifierError),

    #[error("menu '{0}' is not registered")]
    MenuNotFound(String),

    #[error("chain '{0}' is not registered")]
    ChainNotFound(String),

    #[error("list '{0}' is not registered")]
    ListNotFound(String),
}

pub type Result<T, E = FlowError> = std::result::Result<T, E>;
