//! Shadow Exec - run a command with secrets injected into its environment.
//!
//! Secrets are fetched per service from a secret store and merged into the
//! child's environment according to a [`policy::PolicyFlags`]. Secrets only
//! ever live in memory and in the child's environment.

pub mod config;
pub mod engine;
pub mod environment;
pub mod error;
pub mod exec;
pub mod launcher;
pub mod logging;
pub mod policy;
pub mod service;
pub mod store;
