//! Business logic and port definitions for Entrance.
//!
//! This crate owns the build state machine, the versioned configuration
//! store, validation and the interaction broker. Collaborators (content
//! generation, skill resolution, agent creation, session persistence) are
//! traits here and implemented in `entrance-infra`. It depends only on
//! `entrance-types` -- never on `entrance-infra` or any database/IO crate.

pub mod collaborator;
pub mod diff;
pub mod interaction;
pub mod orchestrator;
pub mod repository;
pub mod session;
pub mod store;
pub mod transcript;
pub mod validator;
