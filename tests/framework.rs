//! Flow registry routing.

mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use common::{labels, pizza_menu, FLOW, USER};
use menuflow::chain::{Chain, Next};
use menuflow::error::FlowError;
use menuflow::framework::Framework;
use menuflow::list::List;
use menuflow::transport::memory::Op;
use menuflow::transport::{IncomingMessage, MessageKind};

fn framework() -> (common::Fixture, Framework) {
    let fx = pizza_menu();
    let fw = Framework::new("bot", "en", fx.transport.clone(), fx.catalog.clone());
    fw.add_menu(fx.menu.clone());
    (fx, fw)
}

#[test]
fn run_menu_uses_preferred_locale_when_compiled() {
    let (fx, fw) = framework();

    fw.run_menu(USER, FLOW, "greeting", Some("ru")).expect("run");
    assert_eq!(fx.transport.displayed(USER).expect("shown").text, "Привет");
    assert_eq!(fx.menu.language(USER), "ru");

    fw.run_menu("8", FLOW, "greeting", Some("de")).expect("fallback");
    assert_eq!(fx.transport.displayed("8").expect("shown").text, "Hello there");
    assert_eq!(fx.transport.labels("8"), labels(&["Greetings", "Order"]));

    fw.run_menu("9", FLOW, "greeting", None).expect("default");
    assert_eq!(fx.menu.language("9"), "en");
}

#[test]
fn run_menu_in_requires_compiled_locale() {
    let (_fx, fw) = framework();
    assert!(matches!(
        fw.run_menu_in(USER, FLOW, "de", "greeting"),
        Err(FlowError::InvalidLocale(_))
    ));
    fw.run_menu_in(USER, FLOW, "ru", "greeting").expect("ru");
}

#[test]
fn unknown_flows_are_reported() {
    let (_fx, fw) = framework();
    assert!(matches!(
        fw.run_menu(USER, "nope", "greeting", None),
        Err(FlowError::MenuNotFound(_))
    ));
    assert!(matches!(
        fw.run_chain(USER, "nope", "greeting"),
        Err(FlowError::ChainNotFound(_))
    ));
    assert!(matches!(
        fw.run_list(USER, "nope", "greeting", "en"),
        Err(FlowError::ListNotFound(_))
    ));
}

#[test]
fn messages_route_to_the_senders_chain() {
    let (fx, fw) = framework();
    let chain = Arc::new(Chain::new("signup", fx.transport.clone()).expect("chain"));
    chain
        .then("name", Some(MessageKind::Text), |_, _| Next::Next)
        .then("photo", Some(MessageKind::Photo), |_, _| Next::Finish);
    fw.add_chain(chain.clone());

    fw.run_chain(USER, "signup", "greeting").expect("run");
    assert_eq!(fw.chain_session(USER).as_deref(), Some("signup"));
    assert_eq!(fx.transport.displayed(USER).expect("shown").text, "Hello there");

    assert!(fw.process(&IncomingMessage::text(USER, "Ada")));
    assert_eq!(chain.position(USER).as_deref(), Some("photo"));
    assert!(fw.process(&IncomingMessage::of_kind(USER, MessageKind::Photo)));
    assert!(fw.chain_session(USER).is_none());

    assert!(!fw.process(&IncomingMessage::text("stranger", "hi")));
}

#[test]
fn unknown_messages_reach_default_handler() {
    let (fx, fw) = framework();
    let chain = Arc::new(Chain::new("signup", fx.transport.clone()).expect("chain"));
    chain.then("photo", Some(MessageKind::Photo), |_, _| Next::Finish);
    fw.add_chain(chain);
    let hits = Arc::new(AtomicUsize::new(0));
    let counter = hits.clone();
    fw.set_default_unknown_message_handler(move |chain, msg| {
        assert_eq!(chain.id(), "signup");
        assert_eq!(msg.kind, MessageKind::Text);
        counter.fetch_add(1, Ordering::SeqCst);
    });

    fw.run_chain(USER, "signup", "greeting").expect("run");
    assert!(fw.process(&IncomingMessage::text(USER, "not a photo")));
    assert_eq!(hits.load(Ordering::SeqCst), 1);
    assert_eq!(fw.chain_session(USER).as_deref(), Some("signup"));
}

#[test]
fn replies_route_to_open_lists() {
    let (fx, fw) = framework();
    let list = List::new(
        "yesno",
        fx.transport.clone(),
        Arc::new(
            menuflow::i18n::Catalog::new()
                .with("en", "ask", "Sure?")
                .with("en", "yes", "Yes")
                .with("en", "no", "No"),
        ),
        &["yes", "no"],
        |_, path, _| path == "yes",
    )
    .expect("list");
    fw.add_list(Arc::new(list));

    fw.run_list(USER, "yesno", "ask", "en").expect("run");
    assert!(fw.process(&IncomingMessage::text(USER, "No")));
    assert!(fw.process(&IncomingMessage::text(USER, "Yes")));
    assert!(!fw.process(&IncomingMessage::text(USER, "Yes")));
}

#[test]
fn stop_all_closes_every_flow() {
    let (fx, fw) = framework();
    let chain = Arc::new(Chain::new("signup", fx.transport.clone()).expect("chain"));
    chain.then("name", None, |_, _| Next::Next);
    fw.add_chain(chain.clone());

    fw.run_menu(USER, FLOW, "greeting", None).expect("menu");
    fw.run_chain(USER, "signup", "greeting").expect("chain");

    fw.stop_all(USER).expect("stop");

    assert!(fx.menu.dialog(USER).is_none());
    assert!(!chain.is_active(USER));
    assert!(fw.chain_session(USER).is_none());
    assert_eq!(fx.transport.count(Op::Delete), 1);
}
