//! Test utilities & fixtures.
//! Builds the pizza menu used across the integration tests on an in-memory
//! transport with an in-code catalog.

use std::sync::Arc;

use menuflow::i18n::Catalog;
use menuflow::menu::{action, Menu, NodeId, Step};
use menuflow::transport::memory::MemoryTransport;

pub const FLOW: &str = "flow1";
pub const USER: &str = "42";
pub const GREETING: &str = "Hello there";

#[allow(dead_code)]
pub struct Fixture {
    pub transport: Arc<MemoryTransport>,
    pub catalog: Arc<Catalog>,
    pub menu: Arc<Menu>,
    pub greetings: NodeId,
    pub order: NodeId,
    pub pizza: NodeId,
    pub margarita: NodeId,
    pub pizza_back: NodeId,
    pub order_back: NodeId,
}

pub fn catalog() -> Catalog {
    Catalog::new()
        .with("en", "greeting", GREETING)
        .with("en", "flow1/greetings", "Greetings")
        .with("en", "flow1/order", "Order")
        .with("en", "flow1/order/pizza", "Pizza")
        .with("en", "flow1/order/pizza/margarita", "Margarita")
        .with("en", "flow1/order/pizza/pepperoni", "Pepperoni")
        .with("en", "flow1/order/pizza/back", "Back")
        .with("en", "flow1/order/back", "Back")
        .with("ru", "greeting", "Привет")
        .with("ru", "flow1/greetings", "Приветствие")
        .with("ru", "flow1/order", "Заказ")
        .with("ru", "flow1/order/pizza", "Пицца")
        .with("ru", "flow1/order/pizza/margarita", "Маргарита")
        .with("ru", "flow1/order/pizza/pepperoni", "Пепперони")
        .with("ru", "flow1/order/pizza/back", "Назад")
        .with("ru", "flow1/order/back", "Назад")
}

/// root -> greetings (caption action), order -> { pizza -> { margarita,
/// pepperoni, back }, back }, compiled for `en` and `ru`.
pub fn pizza_menu() -> Fixture {
    let transport = Arc::new(MemoryTransport::new());
    let catalog = Arc::new(catalog());
    let menu = Menu::new(FLOW, "en", transport.clone(), catalog.clone()).expect("menu");

    let greetings = menu
        .add_child(
            NodeId::ROOT,
            "greetings",
            action(|node, sel| {
                node.set_caption(sel, "Hi there");
                Step::Forward
            }),
        )
        .expect("greetings");
    let order = menu.add_child(NodeId::ROOT, "order", None).expect("order");
    let pizza = menu
        .add_child(order, "pizza", action(|_, _| Step::Forward))
        .expect("pizza");
    let margarita = menu.add_child(pizza, "margarita", None).expect("margarita");
    menu.add_child(pizza, "pepperoni", None).expect("pepperoni");
    let pizza_back = menu.add_back_node(pizza, "back").expect("pizza back");
    let order_back = menu.add_back_node(order, "back").expect("order back");
    menu.compile_all(["en", "ru"]).expect("compile");

    Fixture {
        transport,
        catalog,
        menu,
        greetings,
        order,
        pizza,
        margarita,
        pizza_back,
        order_back,
    }
}

/// Fixture with the menu already started for [`USER`] in English.
#[allow(dead_code)]
pub fn started() -> Fixture {
    let fx = pizza_menu();
    fx.menu.start(USER, GREETING, "en").expect("start");
    fx
}

#[allow(dead_code)]
pub fn labels(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}
