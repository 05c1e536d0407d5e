//! Dispatcher port — the outbound surface automation actions write to.

use feedgate_domain::script::HttpMethod;

/// Outbound dispatch consumed by the automation engine.
///
/// Both calls are fire-and-forget: the engine never blocks on network IO
/// and never sees transport results. Implementations log failures and
/// response status; nothing feeds back into automation state.
pub trait Dispatcher {
    /// Send raw bytes over the upstream feed connection.
    fn send_raw(&self, payload: &[u8]);

    /// Send one HTTP request, fanned to every enabled target.
    ///
    /// An empty `body` means no request body (and no content type).
    fn send_http(&self, method: HttpMethod, url: &str, body: String);
}
