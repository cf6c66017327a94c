//! Core types and trait definitions for the Accolade achievement tracker.
//!
//! This crate has no HTTP or database dependencies. Authorization, the
//! achievement lifecycle and every storage backend build on it.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod achievement;
pub mod clock;
pub mod config;
pub mod deadline;
pub mod error;
pub mod notification;
pub mod rbac;
pub mod status;
pub mod store;
pub mod subject;
pub mod user;

pub use error::{Error, ErrorKind, Result};
