//! # rebound-core
//!
//! Composable retry policies and the drivers that apply them:
//! - [`policy`]: delay functions and their combinators
//! - [`retry`]: result-driven and failure-driven retry loops, blocking and async
//! - [`config`]: policies described in TOML
//! - [`logging`]: tracing subscriber setup

pub mod config;
pub mod logging;
pub mod policy;
pub mod retry;

pub use policy::RetryPolicy;
