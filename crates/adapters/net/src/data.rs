//! Data-feed protocol — routes framed records into the table store.
//!
//! Each record is `<tag>|<field>|<field>...`. The tag's last character is
//! a flag: `'0'` marks the final line of a transmission, any other digit
//! a continuation, and a non-digit an unsolicited single-line response
//! (the whole tag is the table name then). The flag is stripped from the
//! table name except in the response case. A record arriving for a table
//! already marked complete starts a fresh transmission and clears the old
//! rows first. Completing a table raises a `Table` event.
//!
//! Outbound requests are framed `0x02 ... 0x03`. A request starting with
//! `'?'` expects the named table as a response; until it completes (or a
//! response timeout fires) further requests queue up and drain in order.

use std::collections::VecDeque;

use feedgate_domain::event::AutomationEvent;
use feedgate_domain::table::store::TableStore;
use feedgate_domain::table::{FIELD_SEPARATOR, RecvState};

use crate::codec::{FrameDecoder, frame};

/// Request/response state of the feed link.
#[derive(Debug, Clone, PartialEq, Eq)]
enum LinkState {
    Idle,
    /// A `?` request went out; its table has not completed yet.
    AwaitingResponse { table: String },
}

/// What one read produced: events to trigger and frames now ready to go
/// upstream.
#[derive(Debug, Default)]
pub struct ReadOutcome {
    pub events: Vec<AutomationEvent>,
    pub send_upstream: Vec<Vec<u8>>,
}

/// The framed data-protocol state machine.
#[derive(Debug)]
pub struct DataProtocol {
    decoder: FrameDecoder,
    link: LinkState,
    pending: VecDeque<Vec<u8>>,
}

impl DataProtocol {
    #[must_use]
    pub fn new() -> Self {
        Self {
            decoder: FrameDecoder::new(),
            link: LinkState::Idle,
            pending: VecDeque::new(),
        }
    }

    /// Whether the link waits on a response table (callers arm the
    /// response timeout while this holds).
    #[must_use]
    pub fn awaiting_response(&self) -> bool {
        matches!(self.link, LinkState::AwaitingResponse { .. })
    }

    /// Consume feed bytes: frame, transcode, and route every complete
    /// record into `tables`.
    pub fn on_read(&mut self, bytes: &[u8], tables: &mut TableStore) -> ReadOutcome {
        let mut outcome = ReadOutcome::default();
        for record in self.decoder.push(bytes) {
            if let Some(event) = self.process_record(&record, tables) {
                outcome.events.push(event);
            }
        }
        if matches!(self.link, LinkState::Idle) {
            outcome.send_upstream = self.drain_pending();
        }
        outcome
    }

    /// Frame `payload` for the wire, or queue it while a response is
    /// outstanding. Returns the frames to send now.
    pub fn write(&mut self, payload: &[u8]) -> Vec<Vec<u8>> {
        if matches!(self.link, LinkState::Idle) {
            self.frame_tracking_response(payload)
        } else {
            tracing::debug!("link busy, queueing request");
            self.pending.push_back(payload.to_vec());
            Vec::new()
        }
    }

    /// The response timed out: reset the link and drain queued requests.
    pub fn on_response_timeout(&mut self) -> Vec<Vec<u8>> {
        tracing::debug!("response missing or timed out, link idle again");
        self.link = LinkState::Idle;
        self.drain_pending()
    }

    /// The feed connection came up.
    ///
    /// Tables still marked receiving from a previous connection are kept
    /// (a resumed transmission may complete them); they are only named in
    /// a warning here.
    pub fn on_connected(&mut self, tables: &mut TableStore) -> AutomationEvent {
        let stale: Vec<_> = tables
            .tables()
            .iter()
            .filter(|t| t.state() == RecvState::Receiving)
            .map(|t| t.name().to_string())
            .collect();
        if !stale.is_empty() {
            tracing::warn!(tables = ?stale, "tables still receiving from previous connection");
        }
        AutomationEvent::connection_established()
    }

    /// The feed connection dropped: discard the partial frame and queued
    /// requests; table states are left as they are.
    pub fn on_disconnected(&mut self) {
        self.decoder.reset();
        self.pending.clear();
        self.link = LinkState::Idle;
    }

    fn process_record(
        &mut self,
        record: &str,
        tables: &mut TableStore,
    ) -> Option<AutomationEvent> {
        let Some((tag, payload)) = record.split_once(FIELD_SEPARATOR) else {
            tracing::debug!(record, "record without field separator discarded");
            return None;
        };
        if tag.chars().count() < 2 {
            tracing::debug!(tag, "tag too short, record discarded");
            return None;
        }

        let flag = tag.chars().last()?;
        let is_last_line = flag == '0';
        let is_response_line = !flag.is_ascii_digit();
        let name = if is_response_line {
            tag
        } else {
            &tag[..tag.len() - flag.len_utf8()]
        };

        let table = tables.get_or_create(name, true)?;
        // A record for a complete table starts a fresh transmission.
        if is_response_line || table.state() == RecvState::Complete {
            table.clear();
        }
        table.add_row(payload, FIELD_SEPARATOR);

        if is_response_line || is_last_line {
            table.set_state(RecvState::Complete);
            tracing::info!(table = name, rows = table.row_count(), "table received");
            self.note_completed(name);
            Some(AutomationEvent::table(name))
        } else {
            table.set_state(RecvState::Receiving);
            None
        }
    }

    /// A table completed; release the link if it was the awaited one.
    fn note_completed(&mut self, name: &str) {
        if let LinkState::AwaitingResponse { table } = &self.link
            && table.eq_ignore_ascii_case(name)
        {
            tracing::debug!(table = name, "awaited response received, link idle");
            self.link = LinkState::Idle;
        }
    }

    fn frame_tracking_response(&mut self, payload: &[u8]) -> Vec<Vec<u8>> {
        if let Some(rest) = payload.strip_prefix(b"?") {
            let table_end = rest.iter().position(|&b| b == b'|').unwrap_or(rest.len());
            let table = String::from_utf8_lossy(&rest[..table_end]).into_owned();
            if !table.is_empty() {
                tracing::debug!(%table, "request sent, awaiting response");
                self.link = LinkState::AwaitingResponse { table };
            }
        }
        vec![frame(payload)]
    }

    fn drain_pending(&mut self) -> Vec<Vec<u8>> {
        let mut out = Vec::new();
        while matches!(self.link, LinkState::Idle) {
            let Some(next) = self.pending.pop_front() else {
                break;
            };
            out.extend(self.frame_tracking_response(&next));
        }
        out
    }
}

impl Default for DataProtocol {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn read(protocol: &mut DataProtocol, tables: &mut TableStore, bytes: &[u8]) -> ReadOutcome {
        protocol.on_read(bytes, tables)
    }

    #[test]
    fn should_mark_table_receiving_on_continuation_flag() {
        let mut protocol = DataProtocol::new();
        let mut tables = TableStore::new();

        let outcome = read(&mut protocol, &mut tables, b"\x02TBL1|r1c1|r1c2\x03");
        assert!(outcome.events.is_empty());

        let tbl = tables.get("TBL").unwrap();
        assert_eq!(tbl.state(), RecvState::Receiving);
        assert_eq!(tbl.row_count(), 1);
    }

    #[test]
    fn should_complete_table_and_raise_event_on_final_flag() {
        let mut protocol = DataProtocol::new();
        let mut tables = TableStore::new();

        read(&mut protocol, &mut tables, b"\x02TBL1|r1c1|r1c2\x03");
        let outcome = read(&mut protocol, &mut tables, b"\x02TBL0|r2c1|r2c2\x03");

        assert_eq!(outcome.events, vec![AutomationEvent::table("TBL")]);
        let tbl = tables.get("TBL").unwrap();
        assert_eq!(tbl.state(), RecvState::Complete);
        assert_eq!(tbl.row_count(), 2);
        assert_eq!(tbl.rows()[0].fields(), ["r1c1", "r1c2"]);
        assert_eq!(tbl.rows()[1].fields(), ["r2c1", "r2c2"]);
    }

    #[test]
    fn should_treat_any_nonzero_digit_as_continuation() {
        let mut protocol = DataProtocol::new();
        let mut tables = TableStore::new();

        let outcome = read(&mut protocol, &mut tables, b"\x02TBL7|row\x03");
        assert!(outcome.events.is_empty());
        assert_eq!(tables.get("TBL").unwrap().state(), RecvState::Receiving);
    }

    #[test]
    fn should_clear_previous_rows_on_fresh_transmission() {
        let mut protocol = DataProtocol::new();
        let mut tables = TableStore::new();

        read(&mut protocol, &mut tables, b"\x02TBL0|old\x03");
        let outcome = read(&mut protocol, &mut tables, b"\x02TBL0|new\x03");

        assert_eq!(outcome.events.len(), 1);
        let tbl = tables.get("TBL").unwrap();
        assert_eq!(tbl.row_count(), 1);
        assert_eq!(tbl.rows()[0].fields(), ["new"]);
    }

    #[test]
    fn should_handle_response_line_as_complete_single_line_table() {
        let mut protocol = DataProtocol::new();
        let mut tables = TableStore::new();

        read(&mut protocol, &mut tables, b"\x02RQ1|partial\x03");
        // Non-digit flag: the whole tag names the table.
        let outcome = read(&mut protocol, &mut tables, b"\x02RQX|answer\x03");

        assert_eq!(outcome.events, vec![AutomationEvent::table("RQX")]);
        let tbl = tables.get("RQX").unwrap();
        assert_eq!(tbl.state(), RecvState::Complete);
        assert_eq!(tbl.row_count(), 1);
    }

    #[test]
    fn should_discard_record_without_separator() {
        let mut protocol = DataProtocol::new();
        let mut tables = TableStore::new();

        let outcome = read(&mut protocol, &mut tables, b"\x02noseparator\x03");
        assert!(outcome.events.is_empty());
        assert!(tables.is_empty());
    }

    #[test]
    fn should_discard_record_with_short_tag() {
        let mut protocol = DataProtocol::new();
        let mut tables = TableStore::new();

        let outcome = read(&mut protocol, &mut tables, b"\x02X|row\x03");
        assert!(outcome.events.is_empty());
        assert!(tables.is_empty());
    }

    #[test]
    fn should_frame_writes_when_idle() {
        let mut protocol = DataProtocol::new();
        let frames = protocol.write(b"snapshot");
        assert_eq!(frames, vec![b"\x02snapshot\x03".to_vec()]);
        assert!(!protocol.awaiting_response());
    }

    #[test]
    fn should_await_response_after_question_request() {
        let mut protocol = DataProtocol::new();
        let frames = protocol.write(b"?STT|all");
        assert_eq!(frames, vec![b"\x02?STT|all\x03".to_vec()]);
        assert!(protocol.awaiting_response());
    }

    #[test]
    fn should_queue_requests_while_awaiting_response() {
        let mut protocol = DataProtocol::new();
        protocol.write(b"?STT");
        let frames = protocol.write(b"?LOG");
        assert!(frames.is_empty());
        assert!(protocol.awaiting_response());
    }

    #[test]
    fn should_drain_queue_when_awaited_table_completes() {
        let mut protocol = DataProtocol::new();
        let mut tables = TableStore::new();

        protocol.write(b"?STT");
        protocol.write(b"plain");

        let outcome = read(&mut protocol, &mut tables, b"\x02STT0|100|idle\x03");
        assert_eq!(outcome.events, vec![AutomationEvent::table("STT")]);
        assert_eq!(outcome.send_upstream, vec![b"\x02plain\x03".to_vec()]);
        assert!(!protocol.awaiting_response());
    }

    #[test]
    fn should_stop_draining_at_next_question_request() {
        let mut protocol = DataProtocol::new();
        let mut tables = TableStore::new();

        protocol.write(b"?STT");
        protocol.write(b"?LOG");
        protocol.write(b"plain");

        let outcome = read(&mut protocol, &mut tables, b"\x02STT0|x\x03");
        // Only the next `?` request goes out; `plain` stays queued behind
        // the new outstanding response.
        assert_eq!(outcome.send_upstream, vec![b"\x02?LOG\x03".to_vec()]);
        assert!(protocol.awaiting_response());
    }

    #[test]
    fn should_drain_queue_on_response_timeout() {
        let mut protocol = DataProtocol::new();
        protocol.write(b"?STT");
        protocol.write(b"plain");

        let frames = protocol.on_response_timeout();
        assert_eq!(frames, vec![b"\x02plain\x03".to_vec()]);
        assert!(!protocol.awaiting_response());
    }

    #[test]
    fn should_reset_link_and_queue_on_disconnect() {
        let mut protocol = DataProtocol::new();
        protocol.write(b"?STT");
        protocol.write(b"queued");
        protocol.on_disconnected();

        assert!(!protocol.awaiting_response());
        // Nothing left to drain.
        assert!(protocol.on_response_timeout().is_empty());
    }

    #[test]
    fn should_raise_exactly_one_event_for_two_line_transmission() {
        let mut protocol = DataProtocol::new();
        let mut tables = TableStore::new();

        let mut events = Vec::new();
        events.extend(read(&mut protocol, &mut tables, b"\x02TBL1|r1c1|r1c2\x03").events);
        events.extend(read(&mut protocol, &mut tables, b"\x02TBL0|r2c1|r2c2\x03").events);

        assert_eq!(events, vec![AutomationEvent::table("TBL")]);
    }
}
