//! In-process backend for every Accolade collaborator trait.
//!
//! Holds roles, profiles, documents, references and delivered notifications
//! behind one lock, so each conditional write is atomic the way a single
//! `UPDATE … WHERE status = ?` is in a relational store. Faults and latency
//! can be injected to exercise the failure paths of the services above it.

mod store;

pub mod error;

pub use error::{Error, Result};
pub use store::MemoryStore;

#[cfg(test)]
mod tests;
