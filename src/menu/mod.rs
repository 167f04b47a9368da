//! # Menu Flow
//!
//! A tree of inline options rendered as one message per user and edited in
//! place as the user moves into sub-menus and back.
//!
//! ## Components
//!
//! - [`node`] - tree nodes, actions and the authoring API
//! - [`compile`] - per-locale compilation into option sets
//! - [`navigate`] - the forward/back/caption protocol run per selection
//!
//! ## Usage
//!
//! ```rust
//! use std::sync::Arc;
//! use menuflow::i18n::Catalog;
//! use menuflow::menu::{action, Menu, NodeId, Step};
//! use menuflow::transport::memory::MemoryTransport;
//!
//! # fn main() -> menuflow::error::Result<()> {
//! let transport = Arc::new(MemoryTransport::new());
//! let catalog = Arc::new(
//!     Catalog::new()
//!         .with("en", "flow1/greetings", "Greetings")
//!         .with("en", "flow1/order", "Order")
//!         .with("en", "flow1/order/pizza", "Pizza")
//!         .with("en", "flow1/order/back", "Back"),
//! );
//! let menu = Menu::new("flow1", "en", transport.clone(), catalog)?;
//! menu.add_child(NodeId::ROOT, "greetings", action(|_, _| Step::Forward))?;
//! let order = menu.add_child(NodeId::ROOT, "order", None)?;
//! menu.add_child(order, "pizza", action(|_, _| Step::Forward))?;
//! menu.add_back_node(order, "back")?;
//! menu.compile("en")?;
//!
//! menu.start("42", "Hello there", "en")?;
//! assert_eq!(transport.labels("42"), vec!["Greetings", "Order"]);
//! transport.press_label("42", "Order").unwrap();
//! assert_eq!(transport.labels("42"), vec!["Pizza", "Back"]);
//! # Ok(())
//! # }
//! ```
//!
//! ## Dialog Lifecycle
//!
//! 1. `start`/`start_at` sends the menu and records a [`Dialog`]
//! 2. every selection edits the message and moves `Dialog::position`
//! 3. `move_to` jumps to any node by editing in place
//! 4. `stop` deletes the message and forgets the dialog

use std::collections::HashSet;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard, Weak};

use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use serde::Serialize;

use crate::error::{FlowError, Result};
use crate::i18n::TextResolver;
use crate::logutil;
use crate::metrics;
use crate::session::SessionStore;
use crate::transport::{MessageRef, OptionSet, Transport};
use crate::validation::{validate_flow_id, validate_locale};

pub mod compile;
pub mod navigate;
pub mod node;

pub use compile::selection_token;
pub use node::{action, back_action, forward_action, Action, NodeContext, NodeId, NodeView, Step};

use node::Node;

/// One recipient's live menu.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Dialog {
    pub recipient: String,
    /// Handle of the message currently showing the menu.
    pub message: MessageRef,
    /// Caption currently shown above the options.
    pub text: String,
    pub language: String,
    /// Node whose options are on screen.
    pub position: NodeId,
    pub started_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub struct Menu {
    pub(crate) id: String,
    serial: AtomicU32,
    tree: RwLock<Vec<Node>>,
    pub(crate) compiled: RwLock<HashSet<String>>,
    pub(crate) dialogs: SessionStore<Dialog>,
    default_locale: String,
    pub(crate) transport: Arc<dyn Transport>,
    pub(crate) resolver: Arc<dyn TextResolver>,
    pub(crate) self_ref: Weak<Menu>,
}

impl std::fmt::Debug for Menu {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Menu")
            .field("id", &self.id)
            .field("nodes", &self.node_count())
            .field("locales", &self.locales())
            .field("dialogs", &self.dialogs.len())
            .finish()
    }
}

impl Menu {
    /// Create an empty menu with its root node.
    ///
    /// `id` namespaces selection tokens and is the base of every text path,
    /// so treat it like a directory name: letters, digits and underscores.
    pub fn new(
        id: &str,
        default_locale: &str,
        transport: Arc<dyn Transport>,
        resolver: Arc<dyn TextResolver>,
    ) -> Result<Arc<Self>> {
        validate_flow_id(id)?;
        validate_locale(default_locale)?;
        Ok(Arc::new_cyclic(|self_ref| Menu {
            id: id.to_string(),
            serial: AtomicU32::new(0),
            tree: RwLock::new(vec![Node::new("", None, None)]),
            compiled: RwLock::new(HashSet::new()),
            dialogs: SessionStore::new(),
            default_locale: default_locale.to_string(),
            transport,
            resolver,
            self_ref: self_ref.clone(),
        }))
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn root(&self) -> NodeId {
        NodeId::ROOT
    }

    pub fn default_locale(&self) -> &str {
        &self.default_locale
    }

    /// Nodes created so far, root excluded.
    pub fn node_count(&self) -> usize {
        self.serial.load(Ordering::SeqCst) as usize
    }

    pub fn transport(&self) -> &Arc<dyn Transport> {
        &self.transport
    }

    pub fn dialog(&self, recipient: &str) -> Option<Dialog> {
        self.dialogs.get(recipient)
    }

    /// Recipients with a live dialog.
    pub fn active_recipients(&self) -> Vec<String> {
        self.dialogs.keys()
    }

    /// Language of the recipient's dialog, or the menu default.
    pub fn language(&self, recipient: &str) -> String {
        self.dialogs
            .get(recipient)
            .map(|d| d.language)
            .unwrap_or_else(|| self.default_locale.clone())
    }

    /// Send the root menu to `recipient`, replacing any menu already shown.
    pub fn start(&self, recipient: &str, text: &str, locale: &str) -> Result<()> {
        let options = {
            let tree = self.read_tree();
            let root = &tree[NodeId::ROOT.index()];
            if root.children.is_empty() {
                return Err(FlowError::EmptyTree);
            }
            root.rendered
                .get(locale)
                .cloned()
                .ok_or_else(|| FlowError::InvalidLocale(locale.to_string()))?
        };
        self.open(recipient, text, locale, NodeId::ROOT, &options)
    }

    /// Send the menu opened at `node` (deep link).
    pub fn start_at(&self, recipient: &str, text: &str, locale: &str, node: NodeId) -> Result<()> {
        let options = self.options_for(node, locale)?;
        self.open(recipient, text, locale, node, &options)
    }

    /// Edit the recipient's menu in place to show `node`.
    pub fn move_to(&self, recipient: &str, text: &str, locale: &str, node: NodeId) -> Result<()> {
        let mut dialog = self
            .dialogs
            .get(recipient)
            .ok_or_else(|| FlowError::DialogNotFound(recipient.to_string()))?;
        let options = self.options_for(node, locale)?;
        let message = self.transport.edit(&dialog.message, text, &options)?;
        // Caption replaced; no earlier change left to flush.
        self.forget_pending(recipient);
        debug!("menu {}: {} moved to {}", self.id, recipient, node);
        dialog.message = message;
        dialog.text = text.to_string();
        dialog.language = locale.to_string();
        dialog.position = node;
        dialog.updated_at = Utc::now();
        self.dialogs.set(recipient, dialog);
        Ok(())
    }

    /// Delete the recipient's menu and forget the dialog.
    pub fn stop(&self, recipient: &str) -> Result<()> {
        if let Some(dialog) = self.dialogs.delete(recipient) {
            if let Err(e) = self.transport.delete(&dialog.message) {
                debug!("menu {}: could not delete {}: {}", self.id, dialog.message, e);
            }
            self.forget_pending(recipient);
            metrics::inc_stop();
            info!("menu {} stopped for {}", self.id, recipient);
        }
        Ok(())
    }

    fn options_for(&self, node: NodeId, locale: &str) -> Result<Arc<OptionSet>> {
        let tree = self.read_tree();
        let target = tree.get(node.index()).ok_or(FlowError::UnknownNode(node))?;
        target
            .rendered
            .get(locale)
            .cloned()
            .ok_or_else(|| FlowError::InvalidLocale(locale.to_string()))
    }

    fn open(
        &self,
        recipient: &str,
        text: &str,
        locale: &str,
        position: NodeId,
        options: &OptionSet,
    ) -> Result<()> {
        let previous = self.dialogs.get(recipient);
        if let Some(previous) = &previous {
            if let Err(e) = self.transport.delete(&previous.message) {
                debug!("menu {}: could not delete {}: {}", self.id, previous.message, e);
            }
        }
        let message = match self.transport.send(recipient, text, options) {
            Ok(message) => message,
            Err(e) => {
                // Previous message is already deleted.
                if previous.is_some() {
                    self.dialogs.delete(recipient);
                    self.forget_pending(recipient);
                    warn!("menu {}: dropped dialog of {} after failed send", self.id, recipient);
                }
                return Err(e.into());
            }
        };
        self.forget_pending(recipient);
        let now = Utc::now();
        self.dialogs.set(
            recipient,
            Dialog {
                recipient: recipient.to_string(),
                message,
                text: text.to_string(),
                language: locale.to_string(),
                position,
                started_at: now,
                updated_at: now,
            },
        );
        metrics::inc_start();
        info!(
            "menu {} started for {} at {} [{}]: {}",
            self.id,
            recipient,
            position,
            locale,
            logutil::caption(text)
        );
        Ok(())
    }

    fn forget_pending(&self, recipient: &str) {
        for node in self.read_tree().iter() {
            node.clear_pending(recipient);
        }
    }

    pub(crate) fn next_serial(&self) -> u32 {
        self.serial.fetch_add(1, Ordering::SeqCst) + 1
    }

    // Poisoned tree locks are recovered.
    pub(crate) fn read_tree(&self) -> RwLockReadGuard<'_, Vec<Node>> {
        self.tree.read().unwrap_or_else(|e| e.into_inner())
    }

    pub(crate) fn write_tree(&self) -> RwLockWriteGuard<'_, Vec<Node>> {
        self.tree.write().unwrap_or_else(|e| e.into_inner())
    }
}
