//! # feedgate-domain
//!
//! Pure domain model for the feedgate data-feed gateway.
//!
//! ## Responsibilities
//! - Define **Values** (tagged int/string evaluation results) and the
//!   **ValuePool** slab they are allocated from
//! - Define **Tables** (named row/field snapshots of upstream data sets)
//!   and the **TableStore** with its dump/load text format
//! - Define **AutomationEvents** (connection, table, command, timer)
//! - Define the compiled automation **Script** (entries, templates,
//!   requests) and its typed expression/action tree
//! - Contain all invariant enforcement and domain logic
//!
//! ## Dependency rule
//! This crate has **no internal dependencies**.
//! It must never import anything from `app`, adapters, or network crates.
//! All IO boundaries are expressed as traits in the `app` crate (ports);
//! the only IO here is the explicit dump/load over `io::Write`/`BufRead`.

pub mod error;

pub mod event;
pub mod script;
pub mod table;
pub mod value;
