//! # Chain Flow
//!
//! A linear sequence of steps, each waiting for one kind of incoming message
//! (a name, then a photo, then a location...). Every recipient's current
//! step is tracked in a [`SessionStore`]; a step handler decides where the
//! recipient goes next.
//!
//! ```rust
//! use std::sync::Arc;
//! use menuflow::chain::{Chain, Next};
//! use menuflow::transport::{memory::MemoryTransport, IncomingMessage, MessageKind};
//!
//! let transport = Arc::new(MemoryTransport::new());
//! let chain = Chain::new("signup", transport.clone()).unwrap();
//! chain
//!     .then("name", Some(MessageKind::Text), |_, _| Next::Next)
//!     .then("photo", Some(MessageKind::Photo), |_, _| Next::Finish);
//! chain.start("7", "What is your name?").unwrap();
//! assert!(chain.process(&IncomingMessage::text("7", "Ada")));
//! assert_eq!(chain.position("7").as_deref(), Some("photo"));
//! ```

use std::sync::{Arc, RwLock, RwLockReadGuard};

use log::{debug, info};

use crate::error::{FlowError, Result};
use crate::metrics;
use crate::session::SessionStore;
use crate::transport::{IncomingMessage, MessageKind, MessageRef, OptionSet, Transport};
use crate::validation::validate_flow_id;

/// Where a recipient goes after a step handler ran.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Next {
    /// The following step; finishing the chain after the last one.
    Next,
    /// Remain on the current step (e.g. invalid input).
    Stay,
    /// Jump to the step with this id; an unknown id leaves the chain.
    Goto(String),
    /// Leave the chain.
    Finish,
}

pub type StepHandler = Arc<dyn Fn(&StepContext<'_>, &IncomingMessage) -> Next + Send + Sync>;

/// Handle passed to step handlers.
pub struct StepContext<'a> {
    chain: &'a Chain,
    step: String,
}

impl<'a> StepContext<'a> {
    pub fn chain(&self) -> &'a Chain {
        self.chain
    }

    /// Id of the step the recipient is on.
    pub fn step(&self) -> &str {
        &self.step
    }

    /// Send a plain message back to `to`.
    pub fn reply(&self, to: &str, text: &str) -> Result<MessageRef> {
        Ok(self.chain.transport.send(to, text, &OptionSet::empty())?)
    }
}

struct ChainStep {
    id: String,
    expect: Option<MessageKind>,
    handler: StepHandler,
}

impl ChainStep {
    /// Whether `message` is the kind of input this step waits for.
    fn accepts(&self, message: &IncomingMessage) -> bool {
        match self.expect {
            None => true,
            Some(MessageKind::Text) => {
                message.kind == MessageKind::Text
                    && message.text.as_deref().is_some_and(|t| !t.is_empty())
            }
            Some(kind) => message.kind == kind,
        }
    }
}

pub struct Chain {
    id: String,
    steps: RwLock<Vec<ChainStep>>,
    positions: SessionStore<String>,
    default_handler: RwLock<Option<StepHandler>>,
    transport: Arc<dyn Transport>,
}

impl std::fmt::Debug for Chain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Chain")
            .field("id", &self.id)
            .field("steps", &self.step_ids())
            .field("active", &self.positions.len())
            .finish()
    }
}

impl Chain {
    pub fn new(id: &str, transport: Arc<dyn Transport>) -> Result<Self> {
        validate_flow_id(id)?;
        Ok(Chain {
            id: id.to_string(),
            steps: RwLock::new(Vec::new()),
            positions: SessionStore::new(),
            default_handler: RwLock::new(None),
            transport,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Append a step. `expect: None` accepts any message kind.
    pub fn then<F>(&self, id: &str, expect: Option<MessageKind>, handler: F) -> &Self
    where
        F: Fn(&StepContext<'_>, &IncomingMessage) -> Next + Send + Sync + 'static,
    {
        self.steps
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .push(ChainStep {
                id: id.to_string(),
                expect,
                handler: Arc::new(handler),
            });
        self
    }

    /// Handler for messages the current step does not accept.
    pub fn set_default_handler<F>(&self, handler: F) -> &Self
    where
        F: Fn(&StepContext<'_>, &IncomingMessage) -> Next + Send + Sync + 'static,
    {
        *self
            .default_handler
            .write()
            .unwrap_or_else(|e| e.into_inner()) = Some(Arc::new(handler));
        self
    }

    pub fn step_ids(&self) -> Vec<String> {
        self.steps().iter().map(|s| s.id.clone()).collect()
    }

    /// Whether a step with `step_id` exists.
    pub fn search(&self, step_id: &str) -> bool {
        self.steps().iter().any(|s| s.id == step_id)
    }

    /// Send `text` and put `recipient` on the first step.
    pub fn start(&self, recipient: &str, text: &str) -> Result<()> {
        let first = self
            .steps()
            .first()
            .map(|s| s.id.clone())
            .ok_or(FlowError::EmptyTree)?;
        self.transport.send(recipient, text, &OptionSet::empty())?;
        self.positions.set(recipient, first);
        info!("chain {} started for {}", self.id, recipient);
        Ok(())
    }

    pub fn position(&self, recipient: &str) -> Option<String> {
        self.positions.get(recipient)
    }

    /// Move `recipient` to `step_id`; returns `false` for an unknown step.
    pub fn set_position(&self, recipient: &str, step_id: &str) -> bool {
        if !self.search(step_id) {
            return false;
        }
        self.positions.set(recipient, step_id.to_string());
        true
    }

    pub fn clear_position(&self, recipient: &str) {
        self.positions.delete(recipient);
    }

    pub fn is_active(&self, recipient: &str) -> bool {
        self.positions.contains(recipient)
    }

    /// Run the sender's current step against `message`.
    ///
    /// Returns `true` when a handler consumed the message, `false` when the
    /// sender is not in this chain or nothing could handle it.
    pub fn process(&self, message: &IncomingMessage) -> bool {
        let sender = message.sender.as_str();
        let Some(step_id) = self.positions.get(sender) else {
            return false;
        };
        let (handler, index) = {
            let steps = self.steps();
            let Some(index) = steps.iter().position(|s| s.id == step_id) else {
                debug!("chain {}: {} is on unknown step {}", self.id, sender, step_id);
                self.positions.delete(sender);
                return false;
            };
            let step = &steps[index];
            if step.accepts(message) {
                (Some(step.handler.clone()), index)
            } else {
                (self.default_handler(), index)
            }
        };
        let Some(handler) = handler else {
            debug!("chain {}: {} sent unexpected {:?}", self.id, sender, message.kind);
            return false;
        };
        let ctx = StepContext {
            chain: self,
            step: step_id.clone(),
        };
        let next = handler(&ctx, message);
        metrics::inc_chain_step();
        self.apply(sender, index, next);
        true
    }

    fn apply(&self, sender: &str, index: usize, next: Next) {
        let target = match next {
            Next::Stay => return,
            Next::Finish => None,
            Next::Next => self.steps().get(index + 1).map(|s| s.id.clone()),
            Next::Goto(id) => self.search(&id).then_some(id),
        };
        match target {
            Some(id) => {
                debug!("chain {}: {} -> {}", self.id, sender, id);
                self.positions.set(sender, id);
            }
            None => {
                info!("chain {} finished for {}", self.id, sender);
                self.positions.delete(sender);
            }
        }
    }

    fn default_handler(&self) -> Option<StepHandler> {
        self.default_handler
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    fn steps(&self) -> RwLockReadGuard<'_, Vec<ChainStep>> {
        self.steps.read().unwrap_or_else(|e| e.into_inner())
    }
}
