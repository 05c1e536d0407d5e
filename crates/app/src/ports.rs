//! Ports — trait definitions implemented by adapters.
//!
//! The application core calls these; concrete implementations live in the
//! adapter crates and are wired together by the binary.

mod dispatch;

pub use dispatch::Dispatcher;
