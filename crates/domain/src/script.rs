//! Script — the compiled automation table.
//!
//! The automation DSL is parsed elsewhere; this module defines the typed
//! tree the engine consumes: expressions, actions, JSON templates, and
//! the event → action-list entries, plus the named template/request
//! registries. The whole tree is serde-tagged so a compiled script can be
//! loaded from JSON; loading replaces the previous script wholesale.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ScriptError;
use crate::event::AutomationEvent;

/// A typed expression node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Expr {
    /// Integer literal.
    Int { value: i64 },
    /// String literal.
    Str { value: String },
    /// Field of the named table's current row.
    Field { table: String, field: FieldRef },
    /// Unary operator application.
    Unary { op: UnaryOp, operand: Box<Expr> },
    /// Binary operator application.
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    /// Built-in function call.
    Call { function: String, args: Vec<Expr> },
}

impl Expr {
    /// Integer literal shorthand.
    #[must_use]
    pub fn int(value: i64) -> Self {
        Self::Int { value }
    }

    /// String literal shorthand.
    #[must_use]
    pub fn str(value: impl Into<String>) -> Self {
        Self::Str {
            value: value.into(),
        }
    }

    /// Field reference shorthand.
    #[must_use]
    pub fn field(table: impl Into<String>, field: impl Into<FieldRef>) -> Self {
        Self::Field {
            table: table.into(),
            field: field.into(),
        }
    }

    /// Binary operation shorthand.
    #[must_use]
    pub fn binary(op: BinaryOp, left: Self, right: Self) -> Self {
        Self::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    /// Function call shorthand.
    #[must_use]
    pub fn call(function: impl Into<String>, args: Vec<Self>) -> Self {
        Self::Call {
            function: function.into(),
            args,
        }
    }
}

/// How a field reference addresses its field: 1-based position or
/// declared name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldRef {
    Index(i64),
    Name(String),
}

impl From<i64> for FieldRef {
    fn from(index: i64) -> Self {
        Self::Index(index)
    }
}

impl From<&str> for FieldRef {
    fn from(name: &str) -> Self {
        Self::Name(name.to_string())
    }
}

/// Unary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnaryOp {
    /// Integer negation; a no-op on strings.
    Neg,
}

/// Binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BinaryOp {
    /// Integer addition, or string concatenation when either operand is
    /// not an integer.
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Or,
    And,
    Eq,
    Ne,
    Lt,
    Le,
    Ge,
    Gt,
}

impl BinaryOp {
    /// Whether this operator compares rather than computes.
    #[must_use]
    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            Self::Eq | Self::Ne | Self::Lt | Self::Le | Self::Ge | Self::Gt
        )
    }
}

/// HTTP methods supported by the dispatch surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
}

impl std::fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Get => f.write_str("GET"),
            Self::Post => f.write_str("POST"),
            Self::Put => f.write_str("PUT"),
            Self::Delete => f.write_str("DELETE"),
        }
    }
}

/// One executable automation step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Action {
    /// Run the nested actions once per row of `table`.
    Iterate {
        table: String,
        /// Evaluated once before the loop; skips the whole block when
        /// false.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        condition: Option<Expr>,
        actions: Vec<Action>,
    },
    /// Send a named, pre-registered request over the feed connection.
    Request { name: String },
    /// Dispatch an HTTP call to all configured targets.
    Http {
        method: HttpMethod,
        url: Expr,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        template: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        value: Option<Expr>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        table: Option<String>,
        /// With a template and table: one call per row instead of one
        /// aggregated array call.
        #[serde(default)]
        per_record: bool,
    },
    /// Overwrite one field of the table's current row.
    SetRecord {
        table: String,
        field: Expr,
        value: Expr,
    },
}

/// A JSON object template: ordered `name → expression` pairs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Template {
    pub fields: Vec<TemplateField>,
}

/// One `"name": expr` pair of a template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateField {
    pub name: String,
    pub value: Expr,
}

/// One compiled `event → actions` rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    pub event: AutomationEvent,
    pub actions: Vec<Action>,
}

/// The whole compiled script: entries plus named templates and requests.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Script {
    #[serde(default)]
    pub entries: Vec<Entry>,
    #[serde(default)]
    pub templates: BTreeMap<String, Template>,
    #[serde(default)]
    pub requests: BTreeMap<String, Expr>,
}

impl Script {
    /// Parse a compiled script from JSON text and validate it.
    ///
    /// # Errors
    ///
    /// Returns [`ScriptError`] on malformed JSON or failed validation.
    pub fn from_json(text: &str) -> Result<Self, ScriptError> {
        let script: Self = serde_json::from_str(text)?;
        script.validate()?;
        Ok(script)
    }

    /// Load a compiled script from the file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`ScriptError`] when the file cannot be read or parsed.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ScriptError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    /// Check script invariants.
    ///
    /// # Errors
    ///
    /// Returns [`ScriptError::EmptyEntry`] for an entry without actions
    /// and [`ScriptError::EmptyName`] for a nameless template or request.
    pub fn validate(&self) -> Result<(), ScriptError> {
        for entry in &self.entries {
            if entry.actions.is_empty() {
                return Err(ScriptError::EmptyEntry {
                    event: entry.event.to_string(),
                });
            }
        }
        if self.templates.keys().any(String::is_empty) {
            return Err(ScriptError::EmptyName { kind: "template" });
        }
        if self.requests.keys().any(String::is_empty) {
            return Err(ScriptError::EmptyName { kind: "request" });
        }
        Ok(())
    }

    /// Look up a template by case-insensitive name.
    #[must_use]
    pub fn template(&self, name: &str) -> Option<&Template> {
        self.templates
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v)
    }

    /// Look up a registered request expression by case-insensitive name.
    #[must_use]
    pub fn request(&self, name: &str) -> Option<&Expr> {
        self.requests
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v)
    }

    /// Distinct timer intervals the script's entries listen on.
    #[must_use]
    pub fn timer_intervals(&self) -> Vec<u64> {
        let mut intervals: Vec<u64> = self
            .entries
            .iter()
            .filter_map(|e| match e.event {
                AutomationEvent::Timer { interval } => Some(interval),
                _ => None,
            })
            .collect();
        intervals.sort_unstable();
        intervals.dedup();
        intervals
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request_entry() -> Entry {
        Entry {
            event: AutomationEvent::connection_established(),
            actions: vec![Action::Request {
                name: "snapshot".to_string(),
            }],
        }
    }

    #[test]
    fn should_validate_script_with_actions() {
        let script = Script {
            entries: vec![request_entry()],
            ..Script::default()
        };
        assert!(script.validate().is_ok());
    }

    #[test]
    fn should_reject_entry_without_actions() {
        let script = Script {
            entries: vec![Entry {
                event: AutomationEvent::table("LOG"),
                actions: vec![],
            }],
            ..Script::default()
        };
        assert!(matches!(
            script.validate(),
            Err(ScriptError::EmptyEntry { .. })
        ));
    }

    #[test]
    fn should_reject_empty_template_name() {
        let mut script = Script::default();
        script
            .templates
            .insert(String::new(), Template { fields: vec![] });
        assert!(matches!(
            script.validate(),
            Err(ScriptError::EmptyName { kind: "template" })
        ));
    }

    #[test]
    fn should_look_up_templates_case_insensitively() {
        let mut script = Script::default();
        script
            .templates
            .insert("Result".to_string(), Template { fields: vec![] });
        assert!(script.template("RESULT").is_some());
        assert!(script.template("missing").is_none());
    }

    #[test]
    fn should_look_up_requests_case_insensitively() {
        let mut script = Script::default();
        script
            .requests
            .insert("Snapshot".to_string(), Expr::str("?STT"));
        assert!(script.request("snapshot").is_some());
        assert!(script.request("other").is_none());
    }

    #[test]
    fn should_collect_distinct_timer_intervals() {
        let script = Script {
            entries: vec![
                Entry {
                    event: AutomationEvent::Timer { interval: 30 },
                    actions: vec![Action::Request {
                        name: "a".to_string(),
                    }],
                },
                Entry {
                    event: AutomationEvent::Timer { interval: 5 },
                    actions: vec![Action::Request {
                        name: "b".to_string(),
                    }],
                },
                Entry {
                    event: AutomationEvent::Timer { interval: 30 },
                    actions: vec![Action::Request {
                        name: "c".to_string(),
                    }],
                },
            ],
            ..Script::default()
        };
        assert_eq!(script.timer_intervals(), vec![5, 30]);
    }

    #[test]
    fn should_parse_script_from_tagged_json() {
        let json = r#"{
            "entries": [{
                "event": {"type": "table", "name": "LOG"},
                "actions": [{
                    "type": "http",
                    "method": "POST",
                    "url": {"type": "str", "value": "/results"},
                    "template": "result",
                    "table": "LOG",
                    "per_record": true
                }]
            }],
            "templates": {
                "result": {"fields": [
                    {"name": "boat", "value": {"type": "field", "table": "LOG", "field": 2}}
                ]}
            },
            "requests": {
                "snapshot": {"type": "str", "value": "?LOG"}
            }
        }"#;
        let script = Script::from_json(json).unwrap();
        assert_eq!(script.entries.len(), 1);
        assert!(script.template("result").is_some());
        assert!(script.request("snapshot").is_some());
        match &script.entries[0].actions[0] {
            Action::Http {
                method, per_record, ..
            } => {
                assert_eq!(*method, HttpMethod::Post);
                assert!(*per_record);
            }
            other => panic!("expected http action, got {other:?}"),
        }
    }

    #[test]
    fn should_deserialize_field_ref_from_index_or_name() {
        let by_index: Expr =
            serde_json::from_str(r#"{"type": "field", "table": "LOG", "field": 3}"#).unwrap();
        assert_eq!(by_index, Expr::field("LOG", 3));

        let by_name: Expr =
            serde_json::from_str(r#"{"type": "field", "table": "LOG", "field": "boat"}"#).unwrap();
        assert_eq!(by_name, Expr::field("LOG", "boat"));
    }

    #[test]
    fn should_roundtrip_actions_through_serde_json() {
        let actions = vec![
            Action::Iterate {
                table: "LOG".to_string(),
                condition: Some(Expr::binary(
                    BinaryOp::Gt,
                    Expr::field("STT", 1),
                    Expr::int(0),
                )),
                actions: vec![Action::Request {
                    name: "next".to_string(),
                }],
            },
            Action::SetRecord {
                table: "STT".to_string(),
                field: Expr::str("state"),
                value: Expr::str("seen"),
            },
        ];
        for action in &actions {
            let json = serde_json::to_string(action).unwrap();
            let parsed: Action = serde_json::from_str(&json).unwrap();
            assert_eq!(&parsed, action);
        }
    }

    #[test]
    fn should_report_parse_error_for_invalid_json() {
        assert!(matches!(
            Script::from_json("{nope"),
            Err(ScriptError::Parse(_))
        ));
    }
}
