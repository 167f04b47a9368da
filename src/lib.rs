//! # Menuflow - Conversational Menus for Chat Bots
//!
//! Menuflow drives inline-keyboard menus in chat messengers. A menu is a tree
//! of options; each user sees it as a single message that is edited in place
//! as they open sub-menus, go back, or trigger actions that change the caption.
//!
//! ## Features
//!
//! - **Menu Trees**: Build option trees in code or from TOML, splice detached subtrees, look nodes up by path.
//! - **Localization**: Compile the same tree for several locales; users switch language mid-dialog.
//! - **Edit-in-place Navigation**: Forward, back and caption changes are one message edit each.
//! - **Chains and Lists**: Step-by-step questionnaires and canned reply keyboards next to menus.
//! - **Transport Agnostic**: Anything implementing [`transport::Transport`] can carry the menus.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use menuflow::config::{build_menu, Config};
//! use menuflow::i18n::Catalog;
//! use menuflow::transport::memory::MemoryTransport;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     // Load configuration and the locale catalogs
//!     let config = Config::load("config.toml").await?;
//!     let catalog = Catalog::load_dir(&config.bot.locale_dir).await?;
//!
//!     // Build, compile and start the menu
//!     let transport = Arc::new(MemoryTransport::new());
//!     let menu = build_menu(&config, transport.clone(), Arc::new(catalog))?;
//!     menu.start("42", "Hello there", &config.bot.default_locale)?;
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Module Organization
//!
//! - [`menu`] - node tree, locale compiler and navigation engine
//! - [`chain`] - linear multi-step flows
//! - [`list`] - reply-keyboard flows
//! - [`framework`] - registry routing messages to flows
//! - [`session`] - per-recipient state store
//! - [`i18n`] - text resolution and TOML catalogs
//! - [`transport`] - messenger abstraction and the in-memory implementation
//! - [`config`] - configuration management and declarative menus
//! - [`validation`] - flow id and locale checks
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────┐
//! │   Framework     │ ← Routes messages to menus, chains and lists
//! └─────────────────┘
//!          │
//! ┌─────────────────┐
//! │   Menu Engine   │ ← Tree, compiled option sets, dialogs
//! └─────────────────┘
//!          │
//! ┌─────────────────┐
//! │   Transport     │ ← send / edit / delete / acknowledge
//! └─────────────────┘
//! ```

pub mod chain;
pub mod config;
pub mod error;
pub mod framework;
pub mod i18n;
pub mod list;
pub mod logutil;
pub mod menu;
pub mod metrics;
pub mod session;
pub mod transport;
pub mod validation;
