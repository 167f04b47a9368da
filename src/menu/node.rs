//! Menu tree nodes and the authoring API.
//!
//! Nodes live in an arena owned by the [`Menu`]; parent/child links are
//! [`NodeId`]s. The root is always `NodeId::ROOT` (0) and every other node
//! gets the next value of the menu's serial counter, so ids are never reused.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

use serde::{Deserialize, Serialize};

use super::Menu;
use crate::error::{FlowError, Result};
use crate::transport::{OptionSet, Selection};

/// Index of a node in its menu's arena.
///
/// Ids are only meaningful for the [`Menu`] that issued them. They carry no
/// menu identity, so an id from another menu that happens to be in range
/// addresses an unrelated node there; out-of-range ids fail with
/// [`FlowError::UnknownNode`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub(crate) u32);

impl NodeId {
    pub const ROOT: NodeId = NodeId(0);

    pub fn value(self) -> u32 {
        self.0
    }

    pub fn is_root(self) -> bool {
        self == Self::ROOT
    }

    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What the engine does after an action ran.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Open the node's own options, or flush a pending caption.
    Forward,
    /// Return to the previous page.
    Back,
}

impl From<bool> for Step {
    fn from(proceed: bool) -> Self {
        if proceed {
            Step::Forward
        } else {
            Step::Back
        }
    }
}

/// Business logic attached to an option.
pub type Action = Arc<dyn Fn(&NodeContext<'_>, &Selection) -> Step + Send + Sync>;

/// Wrap a closure as an option action.
///
/// ```
/// use menuflow::menu::{action, Step};
/// let greet = action(|node, sel| {
///     node.menu().set_caption(&sel.sender, format!("Pressed {}", node.text()));
///     Step::Forward
/// });
/// assert!(greet.is_some());
/// ```
pub fn action<F>(f: F) -> Option<Action>
where
    F: Fn(&NodeContext<'_>, &Selection) -> Step + Send + Sync + 'static,
{
    Some(Arc::new(f))
}

/// Action that always goes back one page.
pub fn back_action() -> Action {
    Arc::new(|_, _| Step::Back)
}

/// Action that always continues.
pub fn forward_action() -> Action {
    Arc::new(|_, _| Step::Forward)
}

/// Handle passed to actions: the pressed node plus its menu.
pub struct NodeContext<'a> {
    pub(crate) menu: &'a Menu,
    pub(crate) node: NodeId,
}

impl<'a> NodeContext<'a> {
    pub fn menu(&self) -> &'a Menu {
        self.menu
    }

    pub fn id(&self) -> NodeId {
        self.node
    }

    /// Author-supplied text key of the node.
    pub fn text(&self) -> String {
        self.menu.read_tree()[self.node.index()].text.clone()
    }

    /// Path computed by the most recent compile.
    pub fn path(&self) -> String {
        self.menu.read_tree()[self.node.index()].path.clone()
    }

    /// Language of the sender's dialog, or the menu default.
    pub fn language(&self, selection: &Selection) -> String {
        self.menu.language(&selection.sender)
    }

    /// Queue a caption change for the sender; it is flushed by the step that
    /// follows this action.
    pub fn set_caption(&self, selection: &Selection, text: impl AsRef<str>) -> bool {
        self.menu.set_caption(&selection.sender, text)
    }

    /// Switch the sender's language and redisplay immediately.
    pub fn set_language(&self, selection: &Selection, locale: &str) -> Result<bool> {
        self.menu.set_language(&selection.sender, locale)
    }
}

pub(crate) struct Node {
    pub(crate) text: String,
    pub(crate) path: String,
    pub(crate) action: Option<Action>,
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
    pub(crate) rendered: HashMap<String, Arc<OptionSet>>,
    /// Recipients whose caption changed while this node was displayed.
    pending: Mutex<HashSet<String>>,
}

impl Node {
    pub(crate) fn new(text: &str, action: Option<Action>, parent: Option<NodeId>) -> Self {
        Node {
            text: text.to_string(),
            path: text.to_string(),
            action,
            parent,
            children: Vec::new(),
            rendered: HashMap::new(),
            pending: Mutex::new(HashSet::new()),
        }
    }

    fn pending(&self) -> MutexGuard<'_, HashSet<String>> {
        self.pending.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub(crate) fn mark_pending(&self, recipient: &str) {
        self.pending().insert(recipient.to_string());
    }

    pub(crate) fn is_pending(&self, recipient: &str) -> bool {
        self.pending().contains(recipient)
    }

    pub(crate) fn clear_pending(&self, recipient: &str) {
        self.pending().remove(recipient);
    }
}

/// Read-only snapshot of a node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NodeView {
    pub id: NodeId,
    pub text: String,
    pub path: String,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    pub has_action: bool,
    /// Locales this node has a compiled option set for.
    pub locales: Vec<String>,
}

impl Menu {
    /// Append a new option under `parent` and return its id.
    ///
    /// `None` as action makes a dead-end option that only navigates.
    pub fn add_child(&self, parent: NodeId, text: &str, action: Option<Action>) -> Result<NodeId> {
        let mut tree = self.write_tree();
        if tree.get(parent.index()).is_none() {
            return Err(FlowError::UnknownNode(parent));
        }
        let id = self.alloc(&mut tree, text, action, Some(parent));
        tree[parent.index()].children.push(id);
        Ok(id)
    }

    /// Append a new option under `parent` and move the detached `subtrees`
    /// beneath it, in order.
    ///
    /// Subtree roots must come from [`Menu::new_node`] and not have been
    /// spliced anywhere yet; re-splicing fails with `AlreadyAttached`.
    pub fn add_child_with_subtree(
        &self,
        parent: NodeId,
        text: &str,
        action: Option<Action>,
        subtrees: &[NodeId],
    ) -> Result<NodeId> {
        let mut tree = self.write_tree();
        if tree.get(parent.index()).is_none() {
            return Err(FlowError::UnknownNode(parent));
        }
        let mut seen = HashSet::new();
        for &sub in subtrees {
            let node = tree.get(sub.index()).ok_or(FlowError::UnknownNode(sub))?;
            if sub.is_root() {
                return Err(FlowError::CyclicSplice(sub));
            }
            if node.parent.is_some() || !seen.insert(sub) {
                return Err(FlowError::AlreadyAttached(sub));
            }
            // `parent` must not sit inside the subtree being moved under it.
            let mut cursor = Some(parent);
            while let Some(at) = cursor {
                if at == sub {
                    return Err(FlowError::CyclicSplice(sub));
                }
                cursor = tree[at.index()].parent;
            }
        }
        let id = self.alloc(&mut tree, text, action, Some(parent));
        tree[parent.index()].children.push(id);
        for &sub in subtrees {
            tree[sub.index()].parent = Some(id);
        }
        tree[id.index()].children.extend_from_slice(subtrees);
        Ok(id)
    }

    /// Append an option that takes the user one page back.
    pub fn add_back_node(&self, parent: NodeId, text: &str) -> Result<NodeId> {
        self.add_child(parent, text, Some(back_action()))
    }

    /// Create a node outside the tree, to be spliced later with
    /// [`Menu::add_child_with_subtree`].
    pub fn new_node(&self, text: &str, action: Option<Action>) -> NodeId {
        let mut tree = self.write_tree();
        self.alloc(&mut tree, text, action, None)
    }

    /// Detached back option.
    pub fn new_back_node(&self, text: &str) -> NodeId {
        self.new_node(text, Some(back_action()))
    }

    /// Like [`Menu::add_child`] but returns `parent`, so sibling options can
    /// be chained with `?`.
    pub fn add(&self, parent: NodeId, text: &str, action: Option<Action>) -> Result<NodeId> {
        self.add_child(parent, text, action)?;
        Ok(parent)
    }

    pub fn node(&self, id: NodeId) -> Option<NodeView> {
        let tree = self.read_tree();
        let node = tree.get(id.index())?;
        let mut locales: Vec<String> = node.rendered.keys().cloned().collect();
        locales.sort();
        Some(NodeView {
            id,
            text: node.text.clone(),
            path: node.path.clone(),
            parent: node.parent,
            children: node.children.clone(),
            has_action: node.action.is_some(),
            locales,
        })
    }

    pub fn children(&self, id: NodeId) -> Vec<NodeId> {
        self.read_tree()
            .get(id.index())
            .map(|n| n.children.clone())
            .unwrap_or_default()
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.read_tree().get(id.index()).and_then(|n| n.parent)
    }

    /// Follow child texts from the root, e.g. `"order/pizza"`.
    pub fn lookup(&self, texts: &str) -> Option<NodeId> {
        let tree = self.read_tree();
        let mut at = NodeId::ROOT;
        for segment in texts.split('/').filter(|s| !s.is_empty()) {
            at = *tree[at.index()]
                .children
                .iter()
                .find(|c| tree[c.index()].text == segment)?;
        }
        Some(at)
    }

    /// Whether a caption change for `recipient` is waiting on `node`.
    pub fn is_pending(&self, node: NodeId, recipient: &str) -> bool {
        self.read_tree()
            .get(node.index())
            .is_some_and(|n| n.is_pending(recipient))
    }

    fn alloc(
        &self,
        tree: &mut Vec<Node>,
        text: &str,
        action: Option<Action>,
        parent: Option<NodeId>,
    ) -> NodeId {
        // Ids are handed out under the tree write lock, so arena index == id.
        let id = NodeId(self.next_serial());
        debug_assert_eq!(id.index(), tree.len());
        tree.push(Node::new(text, action, parent));
        id
    }
}
