//! Locale compiler.
//!
//! Walks the tree depth-first for one locale, recomputes every node's path,
//! resolves each child's label and stores the resulting [`OptionSet`] on the
//! parent. Handlers for all selection tokens are registered once the walk has
//! finished and the tree lock is released.

use std::collections::HashSet;
use std::sync::Arc;

use log::{debug, info};

use super::node::{Node, NodeId};
use super::Menu;
use crate::error::{FlowError, Result};
use crate::i18n::{TextResolver, PATH_SEPARATOR};
use crate::transport::{MenuOption, OptionSet, SelectionHandler};
use crate::validation::validate_locale;

/// Token the transport reports back for `node` shown in `locale`.
pub fn selection_token(flow_id: &str, locale: &str, node: NodeId) -> String {
    format!("{flow_id}:{locale}:{node}")
}

struct Route {
    token: String,
    node: NodeId,
    dead_end: bool,
}

impl Menu {
    /// Compile the tree for `locale` and register its selection handlers.
    ///
    /// Re-compiling is allowed: paths and option sets are rebuilt and the
    /// handlers re-registered under the same tokens.
    pub fn compile(&self, locale: &str) -> Result<&Self> {
        validate_locale(locale)?;
        if !self.resolver.has_locale(locale) {
            return Err(FlowError::InvalidLocale(locale.to_string()));
        }
        let mut routes = Vec::new();
        {
            let mut tree = self.write_tree();
            check_siblings(&tree, NodeId::ROOT, &self.id, locale)?;
            compile_node(
                &mut tree,
                NodeId::ROOT,
                &self.id,
                locale,
                self.resolver.as_ref(),
                &mut routes,
            );
        }

        for route in &routes {
            let menu = self.self_ref.clone();
            let node = route.node;
            let handler: SelectionHandler = if route.dead_end {
                Arc::new(move |selection| {
                    if let Some(menu) = menu.upgrade() {
                        menu.handle_dead_end(node, selection);
                    }
                })
            } else {
                Arc::new(move |selection| {
                    if let Some(menu) = menu.upgrade() {
                        menu.handle_selection(node, selection);
                    }
                })
            };
            self.transport
                .register_selection_handler(&route.token, handler);
        }

        self.compiled
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(locale.to_string());
        info!(
            "menu {} compiled for {} ({} options)",
            self.id,
            locale,
            routes.len()
        );
        Ok(self)
    }

    /// Compile every locale in turn.
    pub fn compile_all<'l>(&self, locales: impl IntoIterator<Item = &'l str>) -> Result<&Self> {
        for locale in locales {
            self.compile(locale)?;
        }
        Ok(self)
    }

    pub fn is_compiled(&self, locale: &str) -> bool {
        self.compiled
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .contains(locale)
    }

    /// Compiled locales, sorted.
    pub fn locales(&self) -> Vec<String> {
        let mut out: Vec<String> = self
            .compiled
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .cloned()
            .collect();
        out.sort();
        out
    }

    /// Compiled option set of `node` for `locale`.
    pub fn option_set(&self, node: NodeId, locale: &str) -> Option<OptionSet> {
        self.read_tree()
            .get(node.index())
            .and_then(|n| n.rendered.get(locale))
            .map(|set| set.as_ref().clone())
    }
}

fn child_path(parent_path: &str, text: &str) -> String {
    format!("{parent_path}{PATH_SEPARATOR}{text}")
}

/// Reject sibling texts that would compile to the same path.
fn check_siblings(tree: &[Node], id: NodeId, path: &str, locale: &str) -> Result<()> {
    let mut seen = HashSet::new();
    for child in &tree[id.index()].children {
        let child_node = &tree[child.index()];
        let path = child_path(path, &child_node.text);
        if !seen.insert(child_node.text.as_str()) {
            return Err(FlowError::DuplicatePath {
                path,
                locale: locale.to_string(),
            });
        }
        check_siblings(tree, *child, &path, locale)?;
    }
    Ok(())
}

fn compile_node(
    tree: &mut [Node],
    id: NodeId,
    base_path: &str,
    locale: &str,
    resolver: &dyn TextResolver,
    routes: &mut Vec<Route>,
) {
    let path = match tree[id.index()].parent {
        Some(parent) => child_path(&tree[parent.index()].path, &tree[id.index()].text),
        None => base_path.to_string(),
    };
    tree[id.index()].path = path;

    let children = tree[id.index()].children.clone();
    for &child in &children {
        compile_node(tree, child, base_path, locale, resolver, routes);
    }

    let mut options = Vec::with_capacity(children.len());
    for &child in &children {
        let node = &tree[child.index()];
        let token = selection_token(base_path, locale, child);
        options.push(MenuOption {
            token: token.clone(),
            text: resolver.resolve(&node.path, locale),
        });
        routes.push(Route {
            token,
            node: child,
            dead_end: node.action.is_none(),
        });
    }
    debug!(
        "compiled {} [{}]: {} options",
        tree[id.index()].path,
        locale,
        options.len()
    );
    tree[id.index()]
        .rendered
        .insert(locale.to_string(), Arc::new(OptionSet::inline(options)));
}
