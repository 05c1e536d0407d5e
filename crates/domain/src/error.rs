//! Domain error types.
//!
//! One `thiserror` enum per concern. Data-plane code never returns these —
//! malformed feed input and lookup misses are logged and skipped by the
//! callers; errors here surface only from the explicit load paths, which
//! are fatal at startup.

/// Errors from loading or validating a compiled automation script.
#[derive(Debug, thiserror::Error)]
pub enum ScriptError {
    /// The script file could not be read.
    #[error("failed to read script file")]
    Io(#[from] std::io::Error),

    /// The script JSON could not be deserialized.
    #[error("failed to parse script")]
    Parse(#[from] serde_json::Error),

    /// An entry has no actions.
    #[error("entry for {event} has no actions")]
    EmptyEntry { event: String },

    /// A template or request was registered under an empty name.
    #[error("empty {kind} name")]
    EmptyName { kind: &'static str },
}

/// Errors from dumping or loading the table store.
#[derive(Debug, thiserror::Error)]
pub enum DumpError {
    /// Underlying file or stream IO failed.
    #[error("dump file IO failed")]
    Io(#[from] std::io::Error),

    /// A line outside any `[section]` was encountered while loading.
    #[error("line {line} belongs to no section")]
    OrphanLine { line: usize },
}
