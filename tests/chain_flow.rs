//! Linear chain flows.

use std::sync::{Arc, Mutex};

use menuflow::chain::{Chain, Next};
use menuflow::error::FlowError;
use menuflow::transport::memory::{Call, MemoryTransport, Op};
use menuflow::transport::{IncomingMessage, MessageKind};

fn signup(transport: Arc<MemoryTransport>, answers: Arc<Mutex<Vec<String>>>) -> Chain {
    let chain = Chain::new("signup", transport).expect("chain");
    let names = answers.clone();
    chain
        .then("name", Some(MessageKind::Text), move |ctx, msg| {
            names
                .lock()
                .unwrap()
                .push(msg.text.clone().unwrap_or_default());
            let _ = ctx.reply(&msg.sender, "Now a photo please");
            Next::Next
        })
        .then("photo", Some(MessageKind::Photo), |_, _| Next::Next)
        .then("anything", None, |_, _| Next::Next);
    chain
}

#[test]
fn walks_steps_in_order_and_finishes() {
    let transport = Arc::new(MemoryTransport::new());
    let answers = Arc::new(Mutex::new(Vec::new()));
    let chain = signup(transport.clone(), answers.clone());

    chain.start("7", "What is your name?").expect("start");
    assert_eq!(chain.position("7").as_deref(), Some("name"));
    assert_eq!(transport.count(Op::Send), 1);

    assert!(chain.process(&IncomingMessage::text("7", "Ada")));
    assert_eq!(chain.position("7").as_deref(), Some("photo"));
    assert_eq!(*answers.lock().unwrap(), vec!["Ada".to_string()]);
    assert!(matches!(
        transport.calls().last(),
        Some(Call::Send { text, .. }) if text == "Now a photo please"
    ));

    assert!(chain.process(&IncomingMessage::of_kind("7", MessageKind::Photo)));
    assert!(chain.process(&IncomingMessage::of_kind("7", MessageKind::Sticker)));
    assert!(!chain.is_active("7"));
}

#[test]
fn wrong_kind_is_not_consumed_without_default_handler() {
    let transport = Arc::new(MemoryTransport::new());
    let chain = signup(transport, Arc::new(Mutex::new(Vec::new())));
    chain.start("7", "Name?").expect("start");

    assert!(!chain.process(&IncomingMessage::of_kind("7", MessageKind::Voice)));
    assert!(!chain.process(&IncomingMessage::text("7", "")));
    assert_eq!(chain.position("7").as_deref(), Some("name"));
}

#[test]
fn default_handler_catches_unexpected_input() {
    let transport = Arc::new(MemoryTransport::new());
    let chain = signup(transport.clone(), Arc::new(Mutex::new(Vec::new())));
    chain.set_default_handler(|ctx, msg| {
        let _ = ctx.reply(&msg.sender, &format!("Please answer step {}", ctx.step()));
        Next::Stay
    });
    chain.start("7", "Name?").expect("start");

    assert!(chain.process(&IncomingMessage::of_kind("7", MessageKind::Location)));
    assert_eq!(chain.position("7").as_deref(), Some("name"));
    assert!(matches!(
        transport.calls().last(),
        Some(Call::Send { text, .. }) if text == "Please answer step name"
    ));
}

#[test]
fn goto_and_finish() {
    let transport = Arc::new(MemoryTransport::new());
    let chain = Chain::new("quiz", transport).expect("chain");
    chain
        .then("q1", None, |_, msg| match msg.text.as_deref() {
            Some("skip") => Next::Goto("q3".into()),
            Some("quit") => Next::Finish,
            Some("nowhere") => Next::Goto("missing".into()),
            _ => Next::Next,
        })
        .then("q2", None, |_, _| Next::Next)
        .then("q3", None, |_, _| Next::Stay);

    chain.start("1", "go").expect("start");
    chain.process(&IncomingMessage::text("1", "skip"));
    assert_eq!(chain.position("1").as_deref(), Some("q3"));
    chain.process(&IncomingMessage::text("1", "again"));
    assert_eq!(chain.position("1").as_deref(), Some("q3"));

    chain.start("2", "go").expect("start");
    chain.process(&IncomingMessage::text("2", "quit"));
    assert!(!chain.is_active("2"));

    chain.start("3", "go").expect("start");
    chain.process(&IncomingMessage::text("3", "nowhere"));
    assert!(!chain.is_active("3"));
}

#[test]
fn positions_can_be_set_and_cleared() {
    let transport = Arc::new(MemoryTransport::new());
    let chain = signup(transport, Arc::new(Mutex::new(Vec::new())));
    assert!(chain.search("photo"));
    assert!(!chain.search("address"));
    assert_eq!(chain.step_ids(), vec!["name", "photo", "anything"]);

    assert!(chain.set_position("9", "photo"));
    assert!(!chain.set_position("9", "address"));
    assert_eq!(chain.position("9").as_deref(), Some("photo"));
    chain.clear_position("9");
    assert!(chain.position("9").is_none());
    assert!(!chain.process(&IncomingMessage::text("9", "hi")));
}

#[test]
fn empty_chain_cannot_start() {
    let transport = Arc::new(MemoryTransport::new());
    let chain = Chain::new("empty", transport.clone()).expect("chain");
    assert!(matches!(chain.start("1", "hi"), Err(FlowError::EmptyTree)));
    assert!(transport.calls().is_empty());
}
