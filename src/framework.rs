//! # Flow Registry
//!
//! Ties menus, chains and lists to one transport and one text resolver,
//! routes incoming plain messages to whichever chain or list the sender is
//! in, and starts flows with the resolver's text for a given path.
//!
//! ```text
//! IncomingMessage ──► Framework::process ──► Chain::process (sender's chain)
//!                                        └─► List::process  (open lists)
//!                                        └─► unknown-message handler
//! ```

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use log::{debug, info};

use crate::chain::Chain;
use crate::error::{FlowError, Result};
use crate::i18n::TextResolver;
use crate::list::List;
use crate::menu::Menu;
use crate::session::SessionStore;
use crate::transport::{IncomingMessage, Transport};

/// Called for messages from a chain participant that no step accepted.
pub type UnknownMessageHandler = Arc<dyn Fn(&Chain, &IncomingMessage) + Send + Sync>;

pub struct Framework {
    name: String,
    default_locale: String,
    transport: Arc<dyn Transport>,
    resolver: Arc<dyn TextResolver>,
    menus: RwLock<HashMap<String, Arc<Menu>>>,
    chains: RwLock<HashMap<String, Arc<Chain>>>,
    lists: RwLock<HashMap<String, Arc<List>>>,
    /// Sender -> id of the chain they are in.
    sessions: SessionStore<String>,
    default_handler: RwLock<Option<UnknownMessageHandler>>,
}

impl std::fmt::Debug for Framework {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Framework")
            .field("name", &self.name)
            .field("default_locale", &self.default_locale)
            .field("chain_sessions", &self.sessions.len())
            .finish()
    }
}

impl Framework {
    pub fn new(
        name: &str,
        default_locale: &str,
        transport: Arc<dyn Transport>,
        resolver: Arc<dyn TextResolver>,
    ) -> Self {
        Framework {
            name: name.to_string(),
            default_locale: default_locale.to_string(),
            transport,
            resolver,
            menus: RwLock::new(HashMap::new()),
            chains: RwLock::new(HashMap::new()),
            lists: RwLock::new(HashMap::new()),
            sessions: SessionStore::new(),
            default_handler: RwLock::new(None),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn transport(&self) -> &Arc<dyn Transport> {
        &self.transport
    }

    pub fn resolver(&self) -> &Arc<dyn TextResolver> {
        &self.resolver
    }

    pub fn set_default_unknown_message_handler<F>(&self, handler: F) -> &Self
    where
        F: Fn(&Chain, &IncomingMessage) + Send + Sync + 'static,
    {
        *self
            .default_handler
            .write()
            .unwrap_or_else(|e| e.into_inner()) = Some(Arc::new(handler));
        self
    }

    pub fn add_menu(&self, menu: Arc<Menu>) -> &Self {
        self.menus
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(menu.id().to_string(), menu);
        self
    }

    pub fn add_chain(&self, chain: Arc<Chain>) -> &Self {
        self.chains
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(chain.id().to_string(), chain);
        self
    }

    pub fn add_list(&self, list: Arc<List>) -> &Self {
        self.lists
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(list.id().to_string(), list);
        self
    }

    pub fn menu(&self, id: &str) -> Option<Arc<Menu>> {
        self.menus
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(id)
            .cloned()
    }

    pub fn chain(&self, id: &str) -> Option<Arc<Chain>> {
        self.chains
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(id)
            .cloned()
    }

    pub fn list(&self, id: &str) -> Option<Arc<List>> {
        self.lists
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(id)
            .cloned()
    }

    /// Id of the chain `sender` is currently in.
    pub fn chain_session(&self, sender: &str) -> Option<String> {
        self.sessions.get(sender)
    }

    /// Start chain `chain_id` for `to` with the default-locale text at `text_path`.
    pub fn run_chain(&self, to: &str, chain_id: &str, text_path: &str) -> Result<()> {
        let chain = self
            .chain(chain_id)
            .ok_or_else(|| FlowError::ChainNotFound(chain_id.to_string()))?;
        let text = self.resolver.resolve(text_path, &self.default_locale);
        chain.start(to, &text)?;
        self.sessions.set(to, chain_id.to_string());
        Ok(())
    }

    /// Start menu `menu_id` in the user's preferred locale when the menu was
    /// compiled for it, otherwise in the default locale.
    pub fn run_menu(
        &self,
        to: &str,
        menu_id: &str,
        text_path: &str,
        preferred_locale: Option<&str>,
    ) -> Result<()> {
        let menu = self
            .menu(menu_id)
            .ok_or_else(|| FlowError::MenuNotFound(menu_id.to_string()))?;
        let locale = match preferred_locale {
            Some(locale) if menu.is_compiled(locale) => locale.to_string(),
            _ => self.default_locale.clone(),
        };
        let text = self.resolver.resolve(text_path, &locale);
        menu.start(to, &text, &locale)
    }

    /// Start menu `menu_id` in exactly `locale`.
    pub fn run_menu_in(&self, to: &str, menu_id: &str, locale: &str, text_path: &str) -> Result<()> {
        let menu = self
            .menu(menu_id)
            .ok_or_else(|| FlowError::MenuNotFound(menu_id.to_string()))?;
        let text = self.resolver.resolve(text_path, locale);
        menu.start(to, &text, locale)
    }

    pub fn run_list(&self, to: &str, list_id: &str, text_path: &str, locale: &str) -> Result<()> {
        let list = self
            .list(list_id)
            .ok_or_else(|| FlowError::ListNotFound(list_id.to_string()))?;
        list.start(to, text_path, locale)
    }

    /// Route a plain message. Returns `true` when something consumed it.
    pub fn process(&self, message: &IncomingMessage) -> bool {
        if let Some(chain_id) = self.sessions.get(&message.sender) {
            let Some(chain) = self.chain(&chain_id) else {
                self.sessions.delete(&message.sender);
                return false;
            };
            let handled = chain.process(message);
            if !chain.is_active(&message.sender) {
                debug!("{} left chain {}", message.sender, chain_id);
                self.sessions.delete(&message.sender);
            }
            if !handled {
                let handler = self
                    .default_handler
                    .read()
                    .unwrap_or_else(|e| e.into_inner())
                    .clone();
                if let Some(handler) = handler {
                    handler(&chain, message);
                    return true;
                }
            }
            return handled;
        }

        let lists: Vec<Arc<List>> = self
            .lists
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .values()
            .cloned()
            .collect();
        for list in lists {
            if list.process(message) {
                return true;
            }
        }
        debug!("{}: message from {} not routed", self.name, message.sender);
        false
    }

    /// Stop every flow `to` takes part in.
    pub fn stop_all(&self, to: &str) -> Result<()> {
        let menus: Vec<Arc<Menu>> = self
            .menus
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .values()
            .cloned()
            .collect();
        for menu in menus {
            menu.stop(to)?;
        }
        if let Some(chain_id) = self.sessions.delete(to) {
            if let Some(chain) = self.chain(&chain_id) {
                chain.clear_position(to);
            }
        }
        for list in self.lists.read().unwrap_or_else(|e| e.into_inner()).values() {
            list.stop(to);
        }
        info!("{}: stopped all flows for {}", self.name, to);
        Ok(())
    }
}
