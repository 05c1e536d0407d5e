//! AutomationEvent — a typed trigger keying into the compiled script.
//!
//! Events are raised by the feed protocol (connection established, table
//! complete), by the control console (`trigger` command) and by timers.
//! Matching is by variant plus case-insensitive name; timers match on
//! their interval.

use serde::{Deserialize, Serialize};

/// A runtime trigger for the automation engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AutomationEvent {
    /// The feed connection changed state (e.g. `"established"`).
    Connection { name: String },
    /// A table finished a transmission.
    Table { name: String },
    /// An operator or external system issued a named command.
    Command { name: String },
    /// A recurring timer fired, identified by its interval in seconds.
    Timer { interval: u64 },
}

impl AutomationEvent {
    /// Convenience constructor for the connection-established event.
    #[must_use]
    pub fn connection_established() -> Self {
        Self::Connection {
            name: "established".to_string(),
        }
    }

    /// Convenience constructor for a table-complete event.
    #[must_use]
    pub fn table(name: impl Into<String>) -> Self {
        Self::Table { name: name.into() }
    }

    /// Check whether this event matches another.
    ///
    /// Same variant and case-insensitive equal name; timers compare their
    /// intervals.
    #[must_use]
    pub fn matches(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Connection { name: a }, Self::Connection { name: b })
            | (Self::Table { name: a }, Self::Table { name: b })
            | (Self::Command { name: a }, Self::Command { name: b }) => {
                a.eq_ignore_ascii_case(b)
            }
            (Self::Timer { interval: a }, Self::Timer { interval: b }) => a == b,
            _ => false,
        }
    }
}

impl std::fmt::Display for AutomationEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Connection { name } => write!(f, "connection({name})"),
            Self::Table { name } => write!(f, "table({name})"),
            Self::Command { name } => write!(f, "command({name})"),
            Self::Timer { interval } => write!(f, "timer({interval}s)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_match_same_variant_with_same_name() {
        let a = AutomationEvent::table("LOG");
        let b = AutomationEvent::table("LOG");
        assert!(a.matches(&b));
    }

    #[test]
    fn should_match_names_case_insensitively() {
        let a = AutomationEvent::table("log");
        let b = AutomationEvent::table("LOG");
        assert!(a.matches(&b));
    }

    #[test]
    fn should_not_match_different_variants_with_same_name() {
        let a = AutomationEvent::table("LOG");
        let b = AutomationEvent::Command {
            name: "LOG".to_string(),
        };
        assert!(!a.matches(&b));
    }

    #[test]
    fn should_match_timers_on_interval() {
        let a = AutomationEvent::Timer { interval: 30 };
        assert!(a.matches(&AutomationEvent::Timer { interval: 30 }));
        assert!(!a.matches(&AutomationEvent::Timer { interval: 60 }));
    }

    #[test]
    fn should_display_event_variants() {
        assert_eq!(
            AutomationEvent::connection_established().to_string(),
            "connection(established)"
        );
        assert_eq!(AutomationEvent::table("STT").to_string(), "table(STT)");
        assert_eq!(
            AutomationEvent::Timer { interval: 10 }.to_string(),
            "timer(10s)"
        );
    }

    #[test]
    fn should_roundtrip_through_serde_json() {
        let events = vec![
            AutomationEvent::connection_established(),
            AutomationEvent::table("LOG"),
            AutomationEvent::Command {
                name: "refresh".to_string(),
            },
            AutomationEvent::Timer { interval: 5 },
        ];
        for event in &events {
            let json = serde_json::to_string(event).unwrap();
            let parsed: AutomationEvent = serde_json::from_str(&json).unwrap();
            assert_eq!(&parsed, event);
        }
    }

    #[test]
    fn should_deserialize_from_tagged_json() {
        let json = serde_json::json!({"type": "table", "name": "STT"});
        let event: AutomationEvent = serde_json::from_value(json).unwrap();
        assert_eq!(event, AutomationEvent::table("STT"));
    }
}
