//! Shared domain types for the entrance agent builder.
//!
//! The configuration document, field paths, patches, versions, interaction
//! records, build phases, validation reports, settings, and their error types.
//!
//! Zero infrastructure dependencies -- only serde, uuid, chrono, thiserror.

pub mod agent;
pub mod catalog;
pub mod config;
pub mod error;
pub mod interaction;
pub mod patch;
pub mod path;
pub mod phase;
pub mod session;
pub mod validation;
pub mod version;
