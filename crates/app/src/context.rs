//! GatewayContext — the mutable state shared by protocol and automation.
//!
//! The table store and value pool are owned exactly once per process, by
//! the gateway reactor loop, and passed down by `&mut` — there are no
//! hidden statics. Single-threaded execution makes this safe; the strict
//! cursor save/restore discipline in the engine keeps re-entrant table
//! iteration correct.

use feedgate_domain::table::store::TableStore;
use feedgate_domain::value::pool::ValuePool;

/// All mutable gateway state touched by evaluation and automation.
#[derive(Debug, Default)]
pub struct GatewayContext {
    pub tables: TableStore,
    pub pool: ValuePool,
}

impl GatewayContext {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}
