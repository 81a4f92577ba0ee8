//! Core domain + application logic for the report bot.
//!
//! This crate is framework-agnostic. The messaging network, report storage and
//! AI inference live behind ports (traits) implemented in adapter crates.

pub mod ai;
pub mod commands;
pub mod config;
pub mod credentials;
pub mod dispatcher;
pub mod domain;
pub mod errors;
pub mod logging;
pub mod messaging;
pub mod replies;
pub mod reports;
pub mod supervisor;
pub mod throttle;
pub mod utils;

pub use errors::{Error, Result};
