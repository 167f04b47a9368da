//! In-process transport.
//!
//! Keeps the latest message per chat, records every call in order and lets a
//! caller "press" a displayed option, which invokes the registered handler
//! the way a real gateway would. Used by the test-suite and the `console`
//! command.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, RwLock};

use log::trace;
use uuid::Uuid;

use super::{MessageRef, OptionSet, Selection, SelectionHandler, Transport, TransportError};

/// Transport operation, used for call counting and failure injection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    Send,
    Edit,
    Delete,
    Acknowledge,
}

/// One recorded transport call. Failed attempts are recorded too.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Send {
        to: String,
        text: String,
        options: OptionSet,
    },
    Edit {
        message: MessageRef,
        text: String,
        options: OptionSet,
    },
    Delete {
        message: MessageRef,
    },
    Acknowledge {
        selection: String,
    },
}

impl Call {
    pub fn op(&self) -> Op {
        match self {
            Call::Send { .. } => Op::Send,
            Call::Edit { .. } => Op::Edit,
            Call::Delete { .. } => Op::Delete,
            Call::Acknowledge { .. } => Op::Acknowledge,
        }
    }
}

/// What a chat currently shows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Displayed {
    pub message: MessageRef,
    pub text: String,
    pub options: OptionSet,
}

#[derive(Debug, Default)]
struct State {
    calls: Vec<Call>,
    displayed: HashMap<String, Displayed>,
    fail_next: Vec<Op>,
}

#[derive(Default)]
pub struct MemoryTransport {
    state: Mutex<State>,
    handlers: RwLock<HashMap<String, SelectionHandler>>,
}

impl std::fmt::Debug for MemoryTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryTransport")
            .field("state", &*self.lock())
            .field("handlers", &self.handler_count())
            .finish()
    }
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next call of `op` fail with [`TransportError::Rejected`].
    pub fn fail_next(&self, op: Op) {
        self.lock().fail_next.push(op);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.lock().calls.clone()
    }

    pub fn count(&self, op: Op) -> usize {
        self.lock().calls.iter().filter(|c| c.op() == op).count()
    }

    pub fn clear_calls(&self) {
        self.lock().calls.clear();
    }

    /// The message currently shown in `chat`, if any.
    pub fn displayed(&self, chat: &str) -> Option<Displayed> {
        self.lock().displayed.get(chat).cloned()
    }

    /// Labels of the options currently shown in `chat`.
    pub fn labels(&self, chat: &str) -> Vec<String> {
        self.displayed(chat)
            .map(|d| d.options.options.into_iter().map(|o| o.text).collect())
            .unwrap_or_default()
    }

    pub fn handler_count(&self) -> usize {
        self.handlers
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }

    pub fn has_handler(&self, token: &str) -> bool {
        self.handlers
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .contains_key(token)
    }

    /// Deliver a selection of `token` from `sender` to the registered handler.
    ///
    /// The handler runs on the calling thread with no transport lock held.
    pub fn press(&self, sender: &str, token: &str) -> Result<(), TransportError> {
        let handler = self
            .handlers
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(token)
            .cloned()
            .ok_or_else(|| TransportError::NotFound(format!("handler for {token}")))?;
        let selection = Selection {
            id: Uuid::new_v4().to_string(),
            sender: sender.to_string(),
            token: token.to_string(),
            message: self.displayed(sender).map(|d| d.message),
        };
        trace!("press {} by {}", token, sender);
        handler(&selection);
        Ok(())
    }

    /// Press the option labelled `label` on the message shown to `sender`.
    pub fn press_label(&self, sender: &str, label: &str) -> Result<(), TransportError> {
        let token = self
            .displayed(sender)
            .and_then(|d| d.options.token_for(label).map(str::to_string))
            .ok_or_else(|| TransportError::NotFound(format!("option '{label}'")))?;
        self.press(sender, &token)
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl State {
    fn take_failure(&mut self, op: Op) -> Option<TransportError> {
        let pos = self.fail_next.iter().position(|o| *o == op)?;
        self.fail_next.remove(pos);
        Some(TransportError::Rejected(format!("injected {:?} failure", op)))
    }

    fn current(&self, message: &MessageRef) -> Result<&Displayed, TransportError> {
        self.displayed
            .get(&message.chat)
            .filter(|d| d.message.id == message.id)
            .ok_or_else(|| TransportError::NotFound(format!("message {message}")))
    }
}

impl Transport for MemoryTransport {
    fn send(&self, to: &str, text: &str, options: &OptionSet) -> Result<MessageRef, TransportError> {
        let mut state = self.lock();
        state.calls.push(Call::Send {
            to: to.to_string(),
            text: text.to_string(),
            options: options.clone(),
        });
        if let Some(err) = state.take_failure(Op::Send) {
            return Err(err);
        }
        let message = MessageRef {
            chat: to.to_string(),
            id: Uuid::new_v4().to_string(),
        };
        state.displayed.insert(
            to.to_string(),
            Displayed {
                message: message.clone(),
                text: text.to_string(),
                options: options.clone(),
            },
        );
        Ok(message)
    }

    fn edit(
        &self,
        message: &MessageRef,
        text: &str,
        options: &OptionSet,
    ) -> Result<MessageRef, TransportError> {
        let mut state = self.lock();
        state.calls.push(Call::Edit {
            message: message.clone(),
            text: text.to_string(),
            options: options.clone(),
        });
        if let Some(err) = state.take_failure(Op::Edit) {
            return Err(err);
        }
        state.current(message)?;
        state.displayed.insert(
            message.chat.clone(),
            Displayed {
                message: message.clone(),
                text: text.to_string(),
                options: options.clone(),
            },
        );
        Ok(message.clone())
    }

    fn delete(&self, message: &MessageRef) -> Result<(), TransportError> {
        let mut state = self.lock();
        state.calls.push(Call::Delete {
            message: message.clone(),
        });
        if let Some(err) = state.take_failure(Op::Delete) {
            return Err(err);
        }
        state.current(message)?;
        state.displayed.remove(&message.chat);
        Ok(())
    }

    fn acknowledge(&self, selection: &Selection) -> Result<(), TransportError> {
        let mut state = self.lock();
        state.calls.push(Call::Acknowledge {
            selection: selection.id.clone(),
        });
        match state.take_failure(Op::Acknowledge) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn register_selection_handler(&self, token: &str, handler: SelectionHandler) {
        self.handlers
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(token.to_string(), handler);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::MenuOption;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn options() -> OptionSet {
        OptionSet::inline(vec![MenuOption {
            token: "t1".into(),
            text: "One".into(),
        }])
    }

    #[test]
    fn edit_replaces_displayed_message() {
        let t = MemoryTransport::new();
        let msg = t.send("42", "hello", &options()).expect("send");
        t.edit(&msg, "bye", &OptionSet::empty()).expect("edit");
        let shown = t.displayed("42").expect("displayed");
        assert_eq!(shown.text, "bye");
        assert!(shown.options.is_empty());
        assert_eq!(t.count(Op::Send), 1);
        assert_eq!(t.count(Op::Edit), 1);
    }

    #[test]
    fn stale_handles_are_rejected() {
        let t = MemoryTransport::new();
        let old = t.send("42", "first", &options()).expect("send");
        t.send("42", "second", &options()).expect("send");
        assert!(matches!(
            t.edit(&old, "x", &options()),
            Err(TransportError::NotFound(_))
        ));
    }

    #[test]
    fn injected_failure_is_consumed_once() {
        let t = MemoryTransport::new();
        t.fail_next(Op::Send);
        assert!(t.send("1", "a", &options()).is_err());
        assert!(t.send("1", "a", &options()).is_ok());
        assert_eq!(t.count(Op::Send), 2);
    }

    #[test]
    fn press_label_routes_to_handler() {
        let t = MemoryTransport::new();
        let hits = Arc::new(AtomicUsize::new(0));
        let seen = hits.clone();
        t.register_selection_handler(
            "t1",
            Arc::new(move |sel: &Selection| {
                assert_eq!(sel.sender, "7");
                assert_eq!(sel.token, "t1");
                seen.fetch_add(1, Ordering::SeqCst);
            }),
        );
        t.send("7", "menu", &options()).expect("send");
        t.press_label("7", "One").expect("press");
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert!(t.press_label("7", "Two").is_err());
    }
}
