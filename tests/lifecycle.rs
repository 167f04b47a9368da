//! start / start_at / move_to / stop.

mod common;

use std::sync::Arc;

use common::{labels, pizza_menu, started, GREETING, USER};
use menuflow::error::FlowError;
use menuflow::i18n::Catalog;
use menuflow::menu::{Menu, NodeId};
use menuflow::transport::memory::{Call, MemoryTransport, Op};

#[test]
fn start_sends_root_options() {
    let fx = pizza_menu();
    fx.menu.start(USER, GREETING, "en").expect("start");

    let calls = fx.transport.calls();
    assert_eq!(calls.len(), 1);
    match &calls[0] {
        Call::Send { to, text, options } => {
            assert_eq!(to, USER);
            assert_eq!(text, GREETING);
            assert_eq!(options.labels(), vec!["Greetings", "Order"]);
        }
        other => panic!("unexpected call {other:?}"),
    }
    let dialog = fx.menu.dialog(USER).expect("dialog");
    assert_eq!(dialog.position, NodeId::ROOT);
    assert_eq!(dialog.language, "en");
    assert_eq!(dialog.text, GREETING);
    assert_eq!(fx.menu.active_recipients(), vec![USER.to_string()]);
}

#[test]
fn start_on_empty_tree_fails_without_transport_call() {
    let transport = Arc::new(MemoryTransport::new());
    let catalog = Arc::new(Catalog::new().with("en", "greeting", "Hi"));
    let menu = Menu::new("empty", "en", transport.clone(), catalog).expect("menu");
    menu.compile("en").expect("compile");

    assert!(matches!(
        menu.start(USER, "Hi", "en"),
        Err(FlowError::EmptyTree)
    ));
    assert!(transport.calls().is_empty());
    assert!(menu.dialog(USER).is_none());
}

#[test]
fn start_in_uncompiled_locale_fails() {
    let fx = pizza_menu();
    assert!(matches!(
        fx.menu.start(USER, GREETING, "de"),
        Err(FlowError::InvalidLocale(locale)) if locale == "de"
    ));
    assert!(fx.transport.calls().is_empty());
}

#[test]
fn restart_replaces_previous_message() {
    let fx = started();
    let first = fx.menu.dialog(USER).expect("dialog").message;
    fx.transport.press_label(USER, "Order").expect("order");

    fx.menu.start(USER, "Again", "ru").expect("restart");

    assert_eq!(fx.transport.count(Op::Delete), 1);
    assert_eq!(fx.transport.count(Op::Send), 2);
    let dialog = fx.menu.dialog(USER).expect("dialog");
    assert_ne!(dialog.message, first);
    assert_eq!(dialog.position, NodeId::ROOT);
    assert_eq!(dialog.language, "ru");
    assert_eq!(fx.transport.labels(USER), labels(&["Приветствие", "Заказ"]));
}

#[test]
fn restart_clears_pending_caption() {
    let fx = started();
    fx.menu.set_caption(USER, "stale");
    fx.menu.start(USER, GREETING, "en").expect("restart");
    assert!(!fx.menu.is_pending(NodeId::ROOT, USER));
}

#[test]
fn failed_send_leaves_no_dialog() {
    let fx = pizza_menu();
    fx.transport.fail_next(Op::Send);
    assert!(matches!(
        fx.menu.start(USER, GREETING, "en"),
        Err(FlowError::Transport(_))
    ));
    assert!(fx.menu.dialog(USER).is_none());
}

#[test]
fn restart_failed_send_drops_stale_dialog() {
    let fx = started();
    fx.menu.set_caption(USER, "pending");
    fx.transport.fail_next(Op::Send);

    assert!(matches!(
        fx.menu.start(USER, "Again", "en"),
        Err(FlowError::Transport(_))
    ));

    assert_eq!(fx.transport.count(Op::Delete), 1);
    assert!(fx.transport.displayed(USER).is_none());
    assert!(fx.menu.dialog(USER).is_none());
    assert!(!fx.menu.is_pending(NodeId::ROOT, USER));
    assert!(matches!(
        fx.menu.move_to(USER, "x", "en", fx.order),
        Err(FlowError::DialogNotFound(_))
    ));
}

#[test]
fn move_to_clears_pending_caption() {
    let fx = started();
    fx.menu.set_caption(USER, "stale");
    assert!(fx.menu.is_pending(NodeId::ROOT, USER));

    fx.menu
        .move_to(USER, "Jumped", "en", fx.order)
        .expect("move_to");
    assert!(!fx.menu.is_pending(NodeId::ROOT, USER));
    assert!(!fx.menu.is_pending(fx.order, USER));

    // Moving back to root has nothing to flush on a leaf press.
    fx.menu
        .move_to(USER, "Home", "en", NodeId::ROOT)
        .expect("move_to root");
    fx.transport.clear_calls();
    assert!(!fx.menu.advance(fx.greetings, USER));
    assert_eq!(fx.transport.count(Op::Edit), 0);
}

#[test]
fn start_at_opens_deep_link() {
    let fx = pizza_menu();
    fx.menu
        .start_at(USER, "Pick a pizza", "en", fx.pizza)
        .expect("start_at");

    assert_eq!(
        fx.transport.labels(USER),
        labels(&["Margarita", "Pepperoni", "Back"])
    );
    assert_eq!(fx.menu.dialog(USER).expect("dialog").position, fx.pizza);

    fx.transport.press_label(USER, "Back").expect("back");
    assert_eq!(fx.transport.labels(USER), labels(&["Pizza", "Back"]));
}

#[test]
fn start_at_unknown_node_fails() {
    let fx = pizza_menu();
    let other = pizza_menu();
    let stray = other.menu.new_node("stray", None);
    assert!(matches!(
        fx.menu.start_at(USER, "x", "en", stray),
        Err(FlowError::UnknownNode(_))
    ));
}

#[test]
fn move_to_unknown_node_fails() {
    let fx = started();
    let other = pizza_menu();
    let stray = other.menu.new_node("stray", None);
    assert!(matches!(
        fx.menu.move_to(USER, "x", "en", stray),
        Err(FlowError::UnknownNode(id)) if id == stray
    ));
    assert_eq!(fx.transport.count(Op::Edit), 0);
}

#[test]
fn move_to_edits_in_place() {
    let fx = started();
    let message = fx.menu.dialog(USER).expect("dialog").message;

    fx.menu
        .move_to(USER, "Jumped", "en", fx.pizza)
        .expect("move_to");

    assert_eq!(fx.transport.count(Op::Edit), 1);
    assert_eq!(fx.transport.count(Op::Send), 1);
    let dialog = fx.menu.dialog(USER).expect("dialog");
    assert_eq!(dialog.message, message);
    assert_eq!(dialog.position, fx.pizza);
    assert_eq!(dialog.text, "Jumped");
    assert_eq!(fx.transport.displayed(USER).expect("shown").text, "Jumped");
}

#[test]
fn scenario_e_move_to_without_dialog_fails() {
    let fx = pizza_menu();
    assert!(matches!(
        fx.menu.move_to("nobody", "x", "en", fx.order),
        Err(FlowError::DialogNotFound(r)) if r == "nobody"
    ));
    assert!(fx.transport.calls().is_empty());
}

#[test]
fn move_to_failed_edit_propagates() {
    let fx = started();
    fx.transport.fail_next(Op::Edit);
    assert!(matches!(
        fx.menu.move_to(USER, "x", "en", fx.order),
        Err(FlowError::Transport(_))
    ));
    assert_eq!(fx.menu.dialog(USER).expect("dialog").position, NodeId::ROOT);
}

#[test]
fn stop_deletes_message_and_forgets_dialog() {
    let fx = started();
    fx.menu.stop(USER).expect("stop");

    assert_eq!(fx.transport.count(Op::Delete), 1);
    assert!(fx.menu.dialog(USER).is_none());
    assert!(fx.transport.displayed(USER).is_none());

    // Idempotent
    fx.menu.stop(USER).expect("stop again");
    assert_eq!(fx.transport.count(Op::Delete), 1);
}

#[test]
fn stop_swallows_delete_failure() {
    let fx = started();
    fx.transport.fail_next(Op::Delete);
    fx.menu.stop(USER).expect("stop");
    assert!(fx.menu.dialog(USER).is_none());
}

#[test]
fn selections_after_stop_are_ignored() {
    let fx = started();
    let token = fx
        .menu
        .option_set(NodeId::ROOT, "en")
        .and_then(|set| set.token_for("Order").map(str::to_string))
        .expect("token");
    fx.menu.stop(USER).expect("stop");
    fx.transport.clear_calls();

    fx.transport.press(USER, &token).expect("press");

    assert!(fx.transport.calls().is_empty());
    assert!(fx.menu.dialog(USER).is_none());
}

#[test]
fn language_defaults_without_dialog() {
    let fx = pizza_menu();
    assert_eq!(fx.menu.language("nobody"), "en");
    assert_eq!(fx.menu.default_locale(), "en");
}

#[test]
fn dropped_menu_ignores_selections() {
    let fx = started();
    let token = menuflow::menu::selection_token(common::FLOW, "en", fx.order);
    let transport = fx.transport.clone();
    drop(fx);
    transport.clear_calls();

    transport.press(USER, &token).expect("handler still registered");
    assert!(transport.calls().is_empty());
}
