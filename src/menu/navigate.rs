//! # Navigation Engine
//!
//! Runs once per "option selected" event:
//!
//! ```text
//! selection ──ack──► action? ──Forward──► advance ──edit──► dialog.set
//!                      │
//!                      └──────Back──────► retreat ──edit──► dialog.set
//! ```
//!
//! - **advance**: a node with children replaces the message options with its
//!   own; a leaf only re-edits (with its parent's options) when a caption
//!   change is pending.
//! - **retreat**: shows the grandparent's options; from the first level it
//!   can only flush a pending caption over the root options.
//!
//! A failed acknowledge or edit is logged and ends the step; the dialog is
//! only written after a successful edit. The dialog read → edit → write
//! sequence is not atomic, see [`crate::session`].

use std::sync::Arc;

use chrono::Utc;
use log::{debug, warn};

use super::node::{NodeContext, NodeId, Step};
use super::{Dialog, Menu};
use crate::error::{FlowError, Result};
use crate::logutil;
use crate::metrics;
use crate::transport::{OptionSet, Selection};

const NAV: &str = "menuflow::nav";

impl Menu {
    /// Handler for options that carry an action.
    pub fn handle_selection(&self, node: NodeId, selection: &Selection) {
        if !self.acknowledge(selection) {
            return;
        }
        let action = self
            .read_tree()
            .get(node.index())
            .and_then(|n| n.action.clone());
        let step = match action {
            Some(action) => {
                let ctx = NodeContext { menu: self, node };
                action(&ctx, selection)
            }
            None => Step::Forward,
        };
        debug!(target: NAV, "{} pressed {} -> {:?}", selection.sender, node, step);
        match step {
            Step::Forward => {
                self.advance(node, &selection.sender);
            }
            Step::Back => {
                self.retreat(node, &selection.sender);
            }
        }
    }

    /// Handler for options without an action: always continue.
    pub fn handle_dead_end(&self, node: NodeId, selection: &Selection) {
        if !self.acknowledge(selection) {
            return;
        }
        metrics::inc_dead_end();
        debug!(target: NAV, "{} pressed dead end {}", selection.sender, node);
        self.advance(node, &selection.sender);
    }

    /// Move forward into `node`, or flush a pending caption at a leaf.
    ///
    /// Returns whether the message was edited.
    pub fn advance(&self, node: NodeId, recipient: &str) -> bool {
        let Some(dialog) = self.live_dialog(recipient) else {
            return false;
        };
        self.advance_dialog(dialog, node, recipient)
    }

    /// `advance` on a dialog that may carry uncommitted changes; they are
    /// stored only if the edit succeeds.
    fn advance_dialog(&self, dialog: Dialog, node: NodeId, recipient: &str) -> bool {
        let target = {
            let tree = self.read_tree();
            let Some(current) = tree.get(node.index()) else {
                warn!(target: NAV, "advance on unknown node {}", node);
                return false;
            };
            let pending =
                current.is_pending(recipient) || tree[dialog.position.index()].is_pending(recipient);
            if !current.children.is_empty() {
                node
            } else if pending {
                current.parent.unwrap_or(NodeId::ROOT)
            } else {
                return false;
            }
        };
        self.redisplay(dialog, node, target, recipient)
    }

    /// Go back one page from `node`.
    ///
    /// Returns whether the message was edited; `false` from the first level
    /// with nothing pending means "cannot go further back".
    pub fn retreat(&self, node: NodeId, recipient: &str) -> bool {
        let Some(dialog) = self.live_dialog(recipient) else {
            return false;
        };
        let target = {
            let tree = self.read_tree();
            let Some(current) = tree.get(node.index()) else {
                warn!(target: NAV, "retreat on unknown node {}", node);
                return false;
            };
            match current.parent.and_then(|p| tree[p.index()].parent) {
                Some(grandparent) => grandparent,
                None => {
                    let pending = current.is_pending(recipient)
                        || tree[dialog.position.index()].is_pending(recipient);
                    if !pending {
                        debug!(target: NAV, "{} cannot go further back from {}", recipient, node);
                        return false;
                    }
                    NodeId::ROOT
                }
            }
        };
        self.redisplay(dialog, node, target, recipient)
    }

    /// Change the caption shown to `recipient`.
    ///
    /// Nothing is sent here: the change is marked pending on the current
    /// position and folded into the next advance/retreat edit. Returns
    /// `false` when there is no dialog or the text is unchanged. Format
    /// parameters in with `format!` before calling.
    pub fn set_caption(&self, recipient: &str, text: impl AsRef<str>) -> bool {
        let text = text.as_ref();
        let Some(mut dialog) = self.dialogs.get(recipient) else {
            return false;
        };
        if dialog.text == text {
            return false;
        }
        debug!(target: NAV, "{} caption -> {}", recipient, logutil::caption(text));
        dialog.text = text.to_string();
        let position = dialog.position;
        self.dialogs.set(recipient, dialog);
        if let Some(node) = self.read_tree().get(position.index()) {
            node.mark_pending(recipient);
        }
        true
    }

    /// Switch `recipient` to `locale` and redisplay the current position.
    ///
    /// The new language is stored only once the edit went through.
    pub fn set_language(&self, recipient: &str, locale: &str) -> Result<bool> {
        if !self.is_compiled(locale) {
            return Err(FlowError::InvalidLocale(locale.to_string()));
        }
        let mut dialog = self
            .dialogs
            .get(recipient)
            .ok_or_else(|| FlowError::DialogNotFound(recipient.to_string()))?;
        dialog.language = locale.to_string();
        let position = dialog.position;
        if let Some(node) = self.read_tree().get(position.index()) {
            node.mark_pending(recipient);
        }
        debug!(target: NAV, "{} language -> {}", recipient, locale);
        Ok(self.advance_dialog(dialog, position, recipient))
    }

    fn acknowledge(&self, selection: &Selection) -> bool {
        if !self.dialogs.contains(&selection.sender) {
            debug!(target: NAV, "selection from {} without a dialog ignored", selection.sender);
            return false;
        }
        if let Err(e) = self.transport.acknowledge(selection) {
            metrics::inc_ack_failed();
            warn!(target: NAV, "failed to respond to {}: {}", selection.sender, e);
            return false;
        }
        metrics::inc_selection();
        true
    }

    fn live_dialog(&self, recipient: &str) -> Option<Dialog> {
        let dialog = self.dialogs.get(recipient);
        if dialog.is_none() {
            debug!(target: NAV, "{} does not have a dialog", recipient);
        }
        dialog
    }

    /// Edit the dialog's message to show `target`'s options and commit the
    /// new position on success.
    fn redisplay(&self, mut dialog: Dialog, pressed: NodeId, target: NodeId, recipient: &str) -> bool {
        let Some(options) = self.rendered(target, &dialog.language) else {
            warn!(
                target: NAV,
                "node {} has no options compiled for {}",
                target,
                dialog.language
            );
            return false;
        };
        match self.transport.edit(&dialog.message, &dialog.text, &options) {
            Ok(message) => {
                {
                    let tree = self.read_tree();
                    for id in [pressed, dialog.position, target] {
                        if let Some(node) = tree.get(id.index()) {
                            node.clear_pending(recipient);
                        }
                    }
                }
                metrics::inc_edit();
                debug!(
                    target: NAV,
                    "{} moved {} -> {} ({} options)",
                    recipient,
                    dialog.position,
                    target,
                    options.len()
                );
                dialog.message = message;
                dialog.position = target;
                dialog.updated_at = Utc::now();
                self.dialogs.set(recipient, dialog);
                true
            }
            Err(e) => {
                metrics::inc_edit_failed();
                warn!(target: NAV, "failed to update menu for {}: {}", recipient, e);
                false
            }
        }
    }

    pub(crate) fn rendered(&self, node: NodeId, locale: &str) -> Option<Arc<OptionSet>> {
        self.read_tree()
            .get(node.index())
            .and_then(|n| n.rendered.get(locale).cloned())
    }
}
