//! # Core Runtime Module
//!
//! Provides foundational runtime infrastructure for the catalog core:
//! - Logging and tracing infrastructure
//! - Configuration management
//! - Event bus for notifications and track change events
//!
//! ## Overview
//!
//! Other crates depend on this one for the logging conventions, the
//! validated [`CatalogConfig`](config::CatalogConfig) and the
//! [`EventBus`](events::EventBus) that carries user-facing notifications.

pub mod config;
pub mod error;
pub mod events;
pub mod logging;

pub use error::{Error, Result};
