//! # Configuration Management Module
//!
//! TOML configuration for the `menuflow` binary and for embedders that want
//! to describe a menu declaratively instead of authoring it in code.
//!
//! ## Configuration Structure
//!
//! - [`BotConfig`] - flow id, locales and where the locale files live
//! - [`LoggingConfig`] - log level and optional log file
//! - [`MenuItemConfig`] - the menu tree, one `[[menu]]` table per root option
//!
//! ## Configuration File Format
//!
//! ```toml
//! [bot]
//! flow_id = "flow1"
//! default_locale = "en"
//! locales = ["en", "ru"]
//! locale_dir = "lang"
//! greeting = "greeting"
//!
//! [logging]
//! level = "info"
//!
//! [[menu]]
//! text = "greetings"
//! action = { kind = "caption", text = "Hi there" }
//!
//! [[menu]]
//! text = "order"
//!
//! [[menu.items]]
//! text = "pizza"
//!
//! [[menu.items]]
//! text = "back"
//! action = { kind = "back" }
//! ```
//!
//! Item texts are catalog keys: `order/pizza` above resolves through
//! `flow1/order/pizza` in `lang/<locale>.toml`.

use std::sync::Arc;

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use tokio::fs;

use crate::error::FlowError;
use crate::i18n::TextResolver;
use crate::menu::{back_action, forward_action, Action, Menu, NodeContext, NodeId, Step};
use crate::transport::{Selection, Transport};
use crate::validation::{validate_flow_id, validate_locale};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotConfig {
    pub flow_id: String,
    pub default_locale: String,
    pub locales: Vec<String>,
    /// Directory holding one `<locale>.toml` catalog per locale.
    pub locale_dir: String,
    /// Text path of the caption sent with the root menu.
    #[serde(default = "default_greeting")]
    pub greeting: String,
}

fn default_greeting() -> String {
    "greeting".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
}

/// Built-in actions available to declarative menus.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ActionConfig {
    Forward,
    Back,
    /// Replace the caption, flushed with the next edit.
    Caption { text: String },
    /// Switch to `locale`, or to the next configured locale when unset.
    Language {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        locale: Option<String>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MenuItemConfig {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<ActionConfig>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub items: Vec<MenuItemConfig>,
}

impl MenuItemConfig {
    pub fn new(text: &str, action: Option<ActionConfig>) -> Self {
        Self {
            text: text.to_string(),
            action,
            items: Vec::new(),
        }
    }

    pub fn with_items(mut self, items: Vec<MenuItemConfig>) -> Self {
        self.items = items;
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub bot: BotConfig,
    pub logging: LoggingConfig,
    #[serde(default)]
    pub menu: Vec<MenuItemConfig>,
}

impl Default for Config {
    fn default() -> Self {
        use ActionConfig::*;
        let back = || MenuItemConfig::new("back", Some(Back));
        let order_of = |name: &str, items: &[&str]| {
            let mut children: Vec<MenuItemConfig> = items
                .iter()
                .map(|item| {
                    MenuItemConfig::new(
                        item,
                        Some(Caption {
                            text: format!("Added {item} to your order"),
                        }),
                    )
                })
                .collect();
            children.push(back());
            MenuItemConfig::new(name, Some(Forward)).with_items(children)
        };
        Config {
            bot: BotConfig {
                flow_id: "flow1".to_string(),
                default_locale: "en".to_string(),
                locales: vec!["en".to_string(), "ru".to_string()],
                locale_dir: "lang".to_string(),
                greeting: default_greeting(),
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                file: None,
            },
            menu: vec![
                MenuItemConfig::new(
                    "greetings",
                    Some(Caption {
                        text: "Hi there".to_string(),
                    }),
                ),
                MenuItemConfig::new("order", None).with_items(vec![
                    order_of("pizza", &["margarita", "pepperoni"]),
                    order_of("sushi", &["temaki", "nigiri", "sasazushi"]),
                    back(),
                ]),
                MenuItemConfig::new("language", Some(Language { locale: None })),
            ],
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub async fn load(path: &str) -> Result<Self> {
        let content = fs::read_to_string(path)
            .await
            .map_err(|e| anyhow!("Failed to read config file {}: {}", path, e))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| anyhow!("Failed to parse config file {}: {}", path, e))?;

        config.validate()?;
        Ok(config)
    }

    /// Create a default configuration file
    pub async fn create_default(path: &str) -> Result<()> {
        let content = toml::to_string_pretty(&Config::default())
            .map_err(|e| anyhow!("Failed to serialize default config: {}", e))?;
        fs::write(path, content)
            .await
            .map_err(|e| anyhow!("Failed to write config file {}: {}", path, e))?;
        Ok(())
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        validate_flow_id(&self.bot.flow_id)?;
        if self.bot.locales.is_empty() {
            return Err(anyhow!("bot.locales must list at least one locale"));
        }
        for locale in &self.bot.locales {
            validate_locale(locale)?;
        }
        if !self.bot.locales.contains(&self.bot.default_locale) {
            return Err(anyhow!(
                "default locale '{}' is not listed in bot.locales",
                self.bot.default_locale
            ));
        }
        if self.menu.is_empty() {
            return Err(anyhow!("menu must define at least one option"));
        }
        check_items(&self.menu, &self.bot.locales)?;
        Ok(())
    }
}

fn check_items(items: &[MenuItemConfig], locales: &[String]) -> Result<()> {
    for item in items {
        if item.text.trim().is_empty() {
            return Err(anyhow!("menu item with empty text"));
        }
        if let Some(ActionConfig::Language {
            locale: Some(locale),
        }) = &item.action
        {
            if !locales.contains(locale) {
                return Err(anyhow!(
                    "menu item '{}' switches to unknown locale '{}'",
                    item.text,
                    locale
                ));
            }
        }
        check_items(&item.items, locales)?;
    }
    Ok(())
}

/// Author the configured tree on a new menu and compile it for every locale.
pub fn build_menu(
    config: &Config,
    transport: Arc<dyn Transport>,
    resolver: Arc<dyn TextResolver>,
) -> Result<Arc<Menu>, FlowError> {
    let menu = Menu::new(
        &config.bot.flow_id,
        &config.bot.default_locale,
        transport,
        resolver,
    )?;
    add_items(&menu, NodeId::ROOT, &config.menu, &config.bot.locales)?;
    menu.compile_all(config.bot.locales.iter().map(String::as_str))?;
    Ok(menu)
}

fn add_items(
    menu: &Menu,
    parent: NodeId,
    items: &[MenuItemConfig],
    locales: &[String],
) -> Result<(), FlowError> {
    for item in items {
        let node = menu.add_child(
            parent,
            &item.text,
            item.action.as_ref().map(|a| to_action(a, locales)),
        )?;
        add_items(menu, node, &item.items, locales)?;
    }
    Ok(())
}

fn to_action(config: &ActionConfig, locales: &[String]) -> Action {
    match config.clone() {
        ActionConfig::Forward => forward_action(),
        ActionConfig::Back => back_action(),
        ActionConfig::Caption { text } => with_action(move |node, selection| {
            node.set_caption(selection, &text);
            Step::Forward
        }),
        ActionConfig::Language { locale } => {
            let locales = locales.to_vec();
            with_action(move |node, selection| {
                let target = match &locale {
                    Some(locale) => locale.clone(),
                    None => next_locale(&locales, &node.language(selection)),
                };
                if let Err(e) = node.set_language(selection, &target) {
                    log::warn!("language switch to {} failed: {}", target, e);
                }
                Step::Forward
            })
        }
    }
}

fn with_action<F>(f: F) -> Action
where
    F: Fn(&NodeContext<'_>, &Selection) -> Step + Send + Sync + 'static,
{
    Arc::new(f)
}

/// The locale after `current` in `locales`, wrapping around.
fn next_locale(locales: &[String], current: &str) -> String {
    if locales.is_empty() {
        return current.to_string();
    }
    let at = locales.iter().position(|l| l == current).unwrap_or(0);
    locales[(at + 1) % locales.len()].clone()
}

/// Starter catalog written by `menuflow init` for the default menu.
pub fn sample_locale(locale: &str) -> Option<&'static str> {
    match locale {
        "en" => Some(SAMPLE_EN),
        "ru" => Some(SAMPLE_RU),
        _ => None,
    }
}

const SAMPLE_EN: &str = r#"greeting = "Hello there"

[flow1]
greetings = "Greetings"
order = "Order"
language = "Language"
"order/pizza" = "Pizza"
"order/sushi" = "Sushi"
"order/back" = "Back"
"order/pizza/margarita" = "Margarita"
"order/pizza/pepperoni" = "Pepperoni"
"order/pizza/back" = "Back"
"order/sushi/temaki" = "Temaki"
"order/sushi/nigiri" = "Nigiri"
"order/sushi/sasazushi" = "Sasazushi"
"order/sushi/back" = "Back"
"#;

const SAMPLE_RU: &str = r#"greeting = "Привет"

[flow1]
greetings = "Приветствие"
order = "Заказ"
language = "Язык"
"order/pizza" = "Пицца"
"order/sushi" = "Суши"
"order/back" = "Назад"
"order/pizza/margarita" = "Маргарита"
"order/pizza/pepperoni" = "Пепперони"
"order/pizza/back" = "Назад"
"order/sushi/temaki" = "Темаки"
"order/sushi/nigiri" = "Нигири"
"order/sushi/sasazushi" = "Сасазуши"
"order/sushi/back" = "Назад"
"#;
