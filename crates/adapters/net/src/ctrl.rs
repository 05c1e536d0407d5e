//! Control-console protocol — a CRLF line console for operators.
//!
//! Commands inspect and mutate the table store, raise automation events
//! (`trigger`), and request control effects (pause, dump, terminate) that
//! the gateway loop applies. The protocol itself performs no IO; it
//! buffers incoming bytes into lines and produces reply bytes plus
//! effects.

use feedgate_domain::event::AutomationEvent;
use feedgate_domain::table::store::TableStore;

/// Greeting sent on connect, before the first prompt.
pub const BANNER: &str = "feedgate control console";
const PROMPT: &str = "feedgate> ";

/// Longest unterminated input line tolerated before draining.
const MAX_LINE: usize = 1024;

/// Side effects a command asks the gateway loop to perform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlEffect {
    /// Suspend automation triggers.
    Pause,
    /// Resume automation triggers.
    Resume,
    /// Dump all tables, to the given path or the configured default.
    Dump(Option<String>),
    /// Send a raw request over the feed connection.
    RawRequest(String),
    /// Close this console connection.
    CloseConnection,
    /// Stop the gateway.
    Terminate,
}

/// What a chunk of console input produced.
#[derive(Debug, Default)]
pub struct CtrlOutcome {
    /// Bytes to write back to the operator.
    pub reply: Vec<u8>,
    /// Events to run through the automation engine.
    pub events: Vec<AutomationEvent>,
    /// Effects for the gateway loop.
    pub effects: Vec<ControlEffect>,
}

/// The console line protocol. The gateway passes its automation-paused
/// flag into [`on_read`](Self::on_read) so `pause`/`resume` report
/// idempotently.
#[derive(Debug)]
pub struct CtrlProtocol {
    buf: Vec<u8>,
    /// Names of the configured HTTP targets, for `list targets`.
    targets: Vec<String>,
}

impl CtrlProtocol {
    #[must_use]
    pub fn new(targets: Vec<String>) -> Self {
        Self {
            buf: Vec::new(),
            targets,
        }
    }

    /// Greeting and first prompt for a fresh connection.
    #[must_use]
    pub fn on_connected(&mut self) -> CtrlOutcome {
        self.buf.clear();
        CtrlOutcome {
            reply: format!("{BANNER}\r\n{PROMPT}").into_bytes(),
            ..CtrlOutcome::default()
        }
    }

    /// Consume console bytes, handling every complete line.
    pub fn on_read(&mut self, bytes: &[u8], tables: &mut TableStore, paused: bool) -> CtrlOutcome {
        self.buf.extend_from_slice(bytes);

        let mut outcome = CtrlOutcome::default();
        while let Some(pos) = self.buf.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.buf.drain(..=pos).collect();
            let line = String::from_utf8_lossy(&line);
            let line = line.trim();
            if !line.is_empty() {
                self.handle_command(line, tables, paused, &mut outcome);
            }
            if outcome.effects.contains(&ControlEffect::CloseConnection) {
                return outcome;
            }
            outcome.reply.extend_from_slice(PROMPT.as_bytes());
        }

        if self.buf.len() > MAX_LINE {
            self.buf.clear();
            outcome
                .reply
                .extend_from_slice(b"Sorry, line too long\r\n");
            outcome.reply.extend_from_slice(PROMPT.as_bytes());
        }
        outcome
    }

    fn handle_command(
        &mut self,
        line: &str,
        tables: &mut TableStore,
        paused: bool,
        outcome: &mut CtrlOutcome,
    ) {
        tracing::debug!(command = line, "console command");
        let mut words = line.split_whitespace();
        let command = words.next().unwrap_or_default();

        let response = match command {
            "help" => help_text(),
            "list" => self.list(words.next(), tables),
            "show" => show(words.next(), tables),
            "add" => add(line, tables),
            "clear" => clear(words.next(), tables),
            "dump" => {
                let path = words.next().map(str::to_string);
                let text = match &path {
                    Some(p) => format!("dumping tables to {p}"),
                    None => "dumping tables to default file".to_string(),
                };
                outcome.effects.push(ControlEffect::Dump(path));
                text
            }
            "request" => match words.next() {
                Some(payload) => {
                    outcome
                        .effects
                        .push(ControlEffect::RawRequest(payload.to_string()));
                    format!("requesting {payload}")
                }
                None => "no request given".to_string(),
            },
            "trigger" => trigger(words.next(), words.next(), outcome),
            "pause" => {
                if paused {
                    "already paused".to_string()
                } else {
                    outcome.effects.push(ControlEffect::Pause);
                    "paused".to_string()
                }
            }
            "resume" => {
                if paused {
                    outcome.effects.push(ControlEffect::Resume);
                    "resumed".to_string()
                } else {
                    "not paused".to_string()
                }
            }
            "terminate" => {
                outcome.effects.push(ControlEffect::Terminate);
                "terminating".to_string()
            }
            "exit" | "quit" => {
                outcome.effects.push(ControlEffect::CloseConnection);
                outcome.reply.extend_from_slice(b"Bye!\r\n");
                return;
            }
            other => {
                tracing::warn!(command = other, "unknown console command");
                format!("unknown command {other}")
            }
        };

        outcome.reply.extend_from_slice(response.as_bytes());
        outcome.reply.extend_from_slice(b"\r\n");
    }

    fn list(&self, object: Option<&str>, tables: &mut TableStore) -> String {
        match object {
            Some("tables") => {
                let mut out = format!("{} tables present", tables.len());
                for tbl in tables.tables() {
                    out.push_str(&format!("\r\n\t{} ({})", tbl.name(), tbl.row_count()));
                }
                out
            }
            Some("targets") => {
                let mut out = format!("{} http targets defined", self.targets.len());
                for name in &self.targets {
                    out.push_str(&format!("\r\n\t{name}"));
                }
                out
            }
            Some(other) => format!("unknown objects to list: '{other}'"),
            None => "don't know what to list".to_string(),
        }
    }
}

fn help_text() -> String {
    [
        "add: add a row of records to a table (usage: add table row)",
        "clear: clears the given data table (argument)",
        "dump: dump all tables to file (optional argument)",
        "exit: terminate connection",
        "help: show this help",
        "list: list objects: tables, targets",
        "pause: disable automation actions",
        "request: issue request to data feed provider(s)",
        "resume: re-enable automation actions",
        "show: show content of table (name is argument)",
        "terminate: terminate the gateway",
        "trigger: trigger actions (table, command)",
    ]
    .join("\r\n")
}

fn show(name: Option<&str>, tables: &mut TableStore) -> String {
    let Some(name) = name else {
        return "missing table name".to_string();
    };
    let Some(tbl) = tables.get(name) else {
        return format!("unknown table '{name}'");
    };
    if tbl.row_count() == 0 {
        return format!("table '{}' is empty", tbl.name());
    }

    let mut out = format!(
        "table '{}' has {} records and {} fields",
        tbl.name(),
        tbl.row_count(),
        tbl.field_count()
    );
    let widths = tbl.field_widths();
    for row in tbl.rows() {
        out.push_str("\r\n");
        for (i, field) in row.fields().iter().enumerate() {
            if i > 0 {
                out.push_str(" | ");
            }
            let width = widths.get(i).copied().unwrap_or(0);
            out.push_str(&format!("{field:width$}"));
        }
    }
    out
}

fn add(line: &str, tables: &mut TableStore) -> String {
    // The row is everything after the table name, spaces included.
    let rest = line.strip_prefix("add").unwrap_or(line).trim_start();
    if rest.is_empty() {
        return "missing table name".to_string();
    }
    let Some((name, row)) = rest.split_once(char::is_whitespace) else {
        return format!("missing/empty row for table {rest} (not added)");
    };
    let row = row.trim_start();
    if row.is_empty() {
        return format!("missing/empty row for table {name} (not added)");
    }
    match tables.get_or_create(name, true) {
        Some(tbl) => {
            tbl.add_row(row, '|');
            format!("row added to {name}")
        }
        None => format!("could not allocate new table {name}"),
    }
}

fn clear(name: Option<&str>, tables: &mut TableStore) -> String {
    let Some(name) = name else {
        return "missing table name".to_string();
    };
    match tables.get(name) {
        Some(tbl) => {
            tbl.clear();
            format!("table '{name}' cleared")
        }
        None => format!("unknown table '{name}'"),
    }
}

fn trigger(object: Option<&str>, name: Option<&str>, outcome: &mut CtrlOutcome) -> String {
    let Some(object) = object else {
        return "missing object (table or command)".to_string();
    };
    let Some(name) = name else {
        return "missing object name".to_string();
    };
    let event = if object.eq_ignore_ascii_case("table") {
        AutomationEvent::table(name)
    } else if object.eq_ignore_ascii_case("command") {
        AutomationEvent::Command {
            name: name.to_string(),
        }
    } else {
        return format!("invalid trigger object '{object}'");
    };
    outcome.events.push(event);
    format!("triggered {object} {name}")
}
