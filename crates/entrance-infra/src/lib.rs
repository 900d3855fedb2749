//! Infrastructure layer for Entrance.
//!
//! Contains implementations of the ports defined in `entrance-core`: the
//! built-in tool catalog, a template content generator, a catalog-backed
//! skill resolver, a mock agent runtime, a quality reviewer, the TOML
//! settings loader, and SQLite plus in-memory session repositories.

pub mod catalog;
pub mod config;
pub mod creator;
pub mod generator;
pub mod memory;
pub mod resolver;
pub mod reviewer;
pub mod sqlite;
