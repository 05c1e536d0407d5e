//! # feedgate-adapter-http
//!
//! Outbound HTTP dispatch for feedgate.
//!
//! ## Responsibilities
//! - Parse and validate the configured HTTP targets ([`config`])
//! - Fan every dispatched request out to all enabled targets, joining the
//!   action path onto each target's base URL ([`fanout`])
//! - Log response status; never feed results back into automation state
//!
//! ## Dependency rule
//! Depends only on `feedgate-domain`. The engine talks to this adapter
//! through the `Dispatcher` port implementation wired up in the binary.

pub mod config;
pub mod fanout;

pub use fanout::{HttpFanout, HttpRequest};
