//! # feedgate-adapter-net
//!
//! TCP adapters for feedgate.
//!
//! ## Responsibilities
//! - Frame the upstream byte stream and transcode it ([`codec`])
//! - Demultiplex framed records into the table store and detect complete
//!   transmissions ([`data`])
//! - Parse and answer operator console commands ([`ctrl`])
//! - Offer both behaviors behind one closed [`protocol::Protocol`] enum
//! - Run the tokio connection loops: the feed client with fixed reconnect
//!   backoff ([`feed`]) and the console listener ([`console`])
//!
//! ## Dependency rule
//! Depends only on `feedgate-domain`. The protocol types perform no IO
//! themselves — the connection loops shovel bytes over channels and the
//! gateway loop drives the protocols synchronously.

pub mod codec;
pub mod config;
pub mod console;
pub mod ctrl;
pub mod data;
pub mod feed;
pub mod protocol;
