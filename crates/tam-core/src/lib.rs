//! Core domain + application logic for the Telegram account manager.
//!
//! Framework-agnostic: the Telegram adapter lives in `tam-telegram` and talks
//! to this crate through services, store ports and the messaging port.

pub mod accounts;
pub mod config;
pub mod dates;
pub mod domain;
pub mod errors;
pub mod export;
pub mod formatting;
pub mod index;
pub mod logging;
pub mod messaging;
pub mod phone;
pub mod proxies;
pub mod proxy;
pub mod security;
pub mod sessions;
pub mod store;
pub mod utils;

pub use errors::{Error, Result};
