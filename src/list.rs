//! # List Flow
//!
//! A flat set of canned replies shown as a reply keyboard in the
//! recipient's language. When the recipient sends one of the labels back,
//! the callback receives the matching text path and decides whether the
//! session is over.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use log::{debug, info};

use crate::error::{FlowError, Result};
use crate::i18n::TextResolver;
use crate::metrics;
use crate::session::SessionStore;
use crate::transport::{IncomingMessage, MenuOption, OptionSet, Transport};
use crate::validation::validate_flow_id;

/// Called with the chosen text path; returning `true` ends the session.
pub type ListCallback = Arc<dyn Fn(&List, &str, &IncomingMessage) -> bool + Send + Sync>;

#[derive(Default)]
struct Compiled {
    options: OptionSet,
    /// Localized label -> index into `paths`.
    links: HashMap<String, usize>,
}

pub struct List {
    id: String,
    paths: Vec<String>,
    compiled: RwLock<HashMap<String, Arc<Compiled>>>,
    sessions: SessionStore<String>,
    callback: ListCallback,
    transport: Arc<dyn Transport>,
    resolver: Arc<dyn TextResolver>,
}

impl std::fmt::Debug for List {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("List")
            .field("id", &self.id)
            .field("paths", &self.paths)
            .field("active", &self.sessions.len())
            .finish()
    }
}

impl List {
    pub fn new<F>(
        id: &str,
        transport: Arc<dyn Transport>,
        resolver: Arc<dyn TextResolver>,
        paths: &[&str],
        callback: F,
    ) -> Result<Self>
    where
        F: Fn(&List, &str, &IncomingMessage) -> bool + Send + Sync + 'static,
    {
        validate_flow_id(id)?;
        if paths.is_empty() {
            return Err(FlowError::EmptyList);
        }
        Ok(List {
            id: id.to_string(),
            paths: paths.iter().map(|p| p.to_string()).collect(),
            compiled: RwLock::new(HashMap::new()),
            sessions: SessionStore::new(),
            callback: Arc::new(callback),
            transport,
            resolver,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn paths(&self) -> &[String] {
        &self.paths
    }

    /// Resolve every path for `locale` into a reply keyboard.
    pub fn compile(&self, locale: &str) -> Result<&Self> {
        if !self.resolver.has_locale(locale) {
            return Err(FlowError::InvalidLocale(locale.to_string()));
        }
        let mut compiled = Compiled::default();
        let mut options = Vec::with_capacity(self.paths.len());
        for (i, path) in self.paths.iter().enumerate() {
            let text = self.resolver.resolve(path, locale);
            compiled.links.insert(text.clone(), i);
            options.push(MenuOption {
                token: text.clone(),
                text,
            });
        }
        compiled.options = OptionSet::reply(options);
        self.compiled
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(locale.to_string(), Arc::new(compiled));
        debug!("list {} compiled for {}", self.id, locale);
        Ok(self)
    }

    pub fn option_set(&self, locale: &str) -> Option<OptionSet> {
        self.compiled_for(locale).map(|c| c.options.clone())
    }

    /// Send the resolved `text_path` with the reply keyboard and open a
    /// session for `recipient`. Uncompiled but known locales compile on demand.
    pub fn start(&self, recipient: &str, text_path: &str, locale: &str) -> Result<()> {
        if !self.resolver.has_locale(locale) {
            return Err(FlowError::InvalidLocale(locale.to_string()));
        }
        let compiled = match self.compiled_for(locale) {
            Some(c) => c,
            None => {
                self.compile(locale)?;
                self.compiled_for(locale)
                    .ok_or_else(|| FlowError::InvalidLocale(locale.to_string()))?
            }
        };
        self.sessions.set(recipient, locale.to_string());
        let text = self.resolver.resolve(text_path, locale);
        self.transport.send(recipient, &text, &compiled.options)?;
        info!("list {} started for {} [{}]", self.id, recipient, locale);
        Ok(())
    }

    /// Session language of `recipient`, if a session is open.
    pub fn session(&self, recipient: &str) -> Option<String> {
        self.sessions.get(recipient)
    }

    pub fn stop(&self, recipient: &str) {
        self.sessions.delete(recipient);
    }

    /// Match a reply against the recipient's keyboard.
    ///
    /// Returns `true` when the text matched an option and the callback ran.
    pub fn process(&self, message: &IncomingMessage) -> bool {
        let Some(locale) = self.sessions.get(&message.sender) else {
            return false;
        };
        let Some(text) = message.text.as_deref() else {
            return false;
        };
        let Some(index) = self
            .compiled_for(&locale)
            .and_then(|c| c.links.get(text).copied())
        else {
            return false;
        };
        metrics::inc_list_reply();
        if (self.callback)(self, &self.paths[index], message) {
            debug!("list {}: session for {} completed", self.id, message.sender);
            self.sessions.delete(&message.sender);
        }
        true
    }

    fn compiled_for(&self, locale: &str) -> Option<Arc<Compiled>> {
        self.compiled
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(locale)
            .cloned()
    }
}
