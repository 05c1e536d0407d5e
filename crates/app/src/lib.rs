//! # feedgate-app
//!
//! Application core for the feedgate gateway.
//!
//! ## Responsibilities
//! - Evaluate script expressions against the table store ([`eval`])
//! - Render JSON payload templates ([`template`])
//! - Match runtime events against the compiled script and execute actions
//!   ([`automation_engine`])
//! - Define IO boundaries as **ports** — trait definitions the adapters
//!   implement ([`ports`])
//!
//! ## Dependency rule
//! Depends only on `feedgate-domain`. Never imports adapters; everything
//! that touches the network goes through the [`ports::Dispatcher`] trait.

pub mod automation_engine;
pub mod context;
pub mod eval;
pub mod ports;
pub mod template;
