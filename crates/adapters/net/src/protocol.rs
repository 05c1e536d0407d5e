//! Protocol — the closed set of connection behaviors.
//!
//! A connection speaks exactly one protocol: `data` (the framed feed
//! stream) or `ctrl` (the operator console). The gateway loop drives
//! whichever variant a connection was configured with through one
//! uniform surface.

use feedgate_domain::event::AutomationEvent;
use feedgate_domain::table::store::TableStore;

use crate::ctrl::{ControlEffect, CtrlProtocol};
use crate::data::DataProtocol;

/// Uniform result of feeding bytes or a lifecycle event to a protocol.
#[derive(Debug, Default)]
pub struct ProtocolOutcome {
    /// Events to run through the automation engine.
    pub events: Vec<AutomationEvent>,
    /// Bytes to write back to the connected peer.
    pub reply: Vec<u8>,
    /// Frames ready to go out over the feed connection.
    pub send_upstream: Vec<Vec<u8>>,
    /// Control effects for the gateway loop.
    pub effects: Vec<ControlEffect>,
}

/// One connection behavior.
#[derive(Debug)]
pub enum Protocol {
    Data(DataProtocol),
    Ctrl(CtrlProtocol),
}

impl Protocol {
    /// Resolve a protocol by its configuration scheme name.
    #[must_use]
    pub fn from_scheme(scheme: &str, targets: Vec<String>) -> Option<Self> {
        match scheme {
            "data" => Some(Self::Data(DataProtocol::new())),
            "ctrl" => Some(Self::Ctrl(CtrlProtocol::new(targets))),
            _ => None,
        }
    }

    /// Feed received bytes through the protocol.
    pub fn on_read(
        &mut self,
        bytes: &[u8],
        tables: &mut TableStore,
        paused: bool,
    ) -> ProtocolOutcome {
        match self {
            Self::Data(data) => {
                let read = data.on_read(bytes, tables);
                ProtocolOutcome {
                    events: read.events,
                    send_upstream: read.send_upstream,
                    ..ProtocolOutcome::default()
                }
            }
            Self::Ctrl(ctrl) => {
                let read = ctrl.on_read(bytes, tables, paused);
                ProtocolOutcome {
                    events: read.events,
                    reply: read.reply,
                    effects: read.effects,
                    ..ProtocolOutcome::default()
                }
            }
        }
    }

    /// The peer connected.
    pub fn on_connected(&mut self, tables: &mut TableStore) -> ProtocolOutcome {
        match self {
            Self::Data(data) => ProtocolOutcome {
                events: vec![data.on_connected(tables)],
                ..ProtocolOutcome::default()
            },
            Self::Ctrl(ctrl) => {
                let out = ctrl.on_connected();
                ProtocolOutcome {
                    reply: out.reply,
                    ..ProtocolOutcome::default()
                }
            }
        }
    }

    /// The peer disconnected.
    pub fn on_disconnected(&mut self) {
        if let Self::Data(data) = self {
            data.on_disconnected();
        }
    }

    /// Write a payload through the protocol (data connections frame and
    /// possibly queue it; the console has no outbound payloads).
    pub fn write(&mut self, payload: &[u8]) -> Vec<Vec<u8>> {
        match self {
            Self::Data(data) => data.write(payload),
            Self::Ctrl(_) => Vec::new(),
        }
    }

    /// Whether a data link is waiting on a response table.
    #[must_use]
    pub fn awaiting_response(&self) -> bool {
        match self {
            Self::Data(data) => data.awaiting_response(),
            Self::Ctrl(_) => false,
        }
    }

    /// Give up on an outstanding response and drain queued requests.
    pub fn on_response_timeout(&mut self) -> Vec<Vec<u8>> {
        match self {
            Self::Data(data) => data.on_response_timeout(),
            Self::Ctrl(_) => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_resolve_known_schemes() {
        assert!(matches!(
            Protocol::from_scheme("data", vec![]),
            Some(Protocol::Data(_))
        ));
        assert!(matches!(
            Protocol::from_scheme("ctrl", vec![]),
            Some(Protocol::Ctrl(_))
        ));
        assert!(Protocol::from_scheme("smtp", vec![]).is_none());
    }

    #[test]
    fn should_route_data_bytes_into_tables() {
        let mut protocol = Protocol::from_scheme("data", vec![]).unwrap();
        let mut tables = TableStore::new();
        let outcome = protocol.on_read(b"\x02STT0|100\x03", &mut tables, false);
        assert_eq!(outcome.events, vec![AutomationEvent::table("STT")]);
        assert!(tables.get("STT").is_some());
    }

    #[test]
    fn should_reply_to_console_bytes() {
        let mut protocol = Protocol::from_scheme("ctrl", vec![]).unwrap();
        let mut tables = TableStore::new();
        let outcome = protocol.on_read(b"help\r\n", &mut tables, false);
        assert!(!outcome.reply.is_empty());
        assert!(outcome.send_upstream.is_empty());
    }

    #[test]
    fn should_raise_connection_event_for_data_protocol() {
        let mut protocol = Protocol::from_scheme("data", vec![]).unwrap();
        let mut tables = TableStore::new();
        let outcome = protocol.on_connected(&mut tables);
        assert_eq!(
            outcome.events,
            vec![AutomationEvent::connection_established()]
        );
    }

    #[test]
    fn should_frame_writes_on_data_protocol_only() {
        let mut data = Protocol::from_scheme("data", vec![]).unwrap();
        assert_eq!(data.write(b"x"), vec![b"\x02x\x03".to_vec()]);

        let mut ctrl = Protocol::from_scheme("ctrl", vec![]).unwrap();
        assert!(ctrl.write(b"x").is_empty());
    }
}
