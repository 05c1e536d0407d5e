//! Automation engine — reacts to events by executing compiled script
//! entries against the table store.
//!
//! The engine holds the compiled [`Script`] and a [`Dispatcher`]. For an
//! incoming event the first matching entry wins; its actions run in
//! order, and every per-action failure (unknown table, template or
//! request name, evaluation error) is logged and skipped without
//! aborting the rest. Execution is a pure function of the table store
//! contents and the event, plus dispatch side effects.
//!
//! Cursor discipline: every iterating action snapshots and restores the
//! table cursor, so nested iteration over the same table — e.g. a
//! per-record HTTP dispatch inside an `iterate` block — leaves the outer
//! loop's position intact.

use feedgate_domain::event::AutomationEvent;
use feedgate_domain::script::{Action, Expr, HttpMethod, Script, Template};
use feedgate_domain::value::Value;

use crate::context::GatewayContext;
use crate::eval::Evaluator;
use crate::ports::Dispatcher;
use crate::template::render_object;

/// Executes compiled automation entries in response to runtime events.
pub struct AutomationEngine<D> {
    script: Script,
    dispatcher: D,
}

impl<D: Dispatcher> AutomationEngine<D> {
    /// Create an engine over a compiled script.
    pub fn new(script: Script, dispatcher: D) -> Self {
        Self { script, dispatcher }
    }

    /// The compiled script currently in force.
    #[must_use]
    pub fn script(&self) -> &Script {
        &self.script
    }

    /// Replace the whole compiled script (reload semantics).
    pub fn replace_script(&mut self, script: Script) {
        self.script = script;
    }

    /// The dispatcher the engine writes through.
    #[must_use]
    pub fn dispatcher(&self) -> &D {
        &self.dispatcher
    }

    /// Process one event: run the first matching entry's actions.
    ///
    /// Returns whether an entry matched. No match is a silent drop.
    pub fn trigger(&self, event: &AutomationEvent, ctx: &mut GatewayContext) -> bool {
        let Some(entry) = self.script.entries.iter().find(|e| e.event.matches(event)) else {
            tracing::debug!(%event, "no automation entry matches");
            return false;
        };

        tracing::debug!(%event, actions = entry.actions.len(), "automation entry matched");
        self.run_actions(&entry.actions, ctx);
        true
    }

    fn run_actions(&self, actions: &[Action], ctx: &mut GatewayContext) {
        for action in actions {
            self.run_action(action, ctx);
        }
    }

    fn run_action(&self, action: &Action, ctx: &mut GatewayContext) {
        match action {
            Action::Iterate {
                table,
                condition,
                actions,
            } => self.run_iterate(table, condition.as_ref(), actions, ctx),
            Action::Request { name } => self.run_request(name, ctx),
            Action::Http {
                method,
                url,
                template,
                value,
                table,
                per_record,
            } => self.run_http(
                *method,
                url,
                template.as_deref(),
                value.as_ref(),
                table.as_deref(),
                *per_record,
                ctx,
            ),
            Action::SetRecord {
                table,
                field,
                value,
            } => run_set_record(table, field, value, ctx),
        }
    }

    fn run_iterate(
        &self,
        table: &str,
        condition: Option<&Expr>,
        actions: &[Action],
        ctx: &mut GatewayContext,
    ) {
        if let Some(condition) = condition {
            match Evaluator::new(ctx).eval_bool(condition) {
                Ok(true) => {}
                Ok(false) => return,
                Err(err) => {
                    tracing::warn!(table, %err, "iterate condition failed to evaluate");
                    return;
                }
            }
        }

        let Some((saved, rows)) = snapshot(ctx, table) else {
            tracing::warn!(table, "iterate over unknown table");
            return;
        };
        for row in 0..rows {
            set_cursor(ctx, table, Some(row));
            self.run_actions(actions, ctx);
        }
        set_cursor(ctx, table, saved);
    }

    fn run_request(&self, name: &str, ctx: &mut GatewayContext) {
        let Some(expr) = self.script.request(name) else {
            tracing::warn!(request = name, "unknown request");
            return;
        };
        match Evaluator::new(ctx).eval_text(expr) {
            Ok(payload) => {
                tracing::debug!(request = name, %payload, "sending feed request");
                self.dispatcher.send_raw(payload.as_bytes());
            }
            Err(err) => tracing::warn!(request = name, %err, "request failed to evaluate"),
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn run_http(
        &self,
        method: HttpMethod,
        url: &Expr,
        template: Option<&str>,
        value: Option<&Expr>,
        table: Option<&str>,
        per_record: bool,
        ctx: &mut GatewayContext,
    ) {
        if let Some(name) = template {
            let Some(tpl) = self.script.template(name) else {
                tracing::warn!(template = name, "unknown template");
                return;
            };
            if let Some(table) = table {
                self.http_per_table(method, url, tpl, table, per_record, ctx);
            } else {
                self.http_single(method, url, tpl, ctx);
            }
            return;
        }

        if let Some(value) = value {
            let rendered = match Evaluator::new(ctx).eval_value(value) {
                Ok(v) => v,
                Err(err) => {
                    tracing::warn!(%err, "http value failed to evaluate");
                    return;
                }
            };
            let body = serde_json::json!({ "v": json_value(rendered) }).to_string();
            self.dispatch(method, url, body, ctx);
            return;
        }

        self.dispatch(method, url, String::new(), ctx);
    }

    /// Template + table: one call per row, or one aggregated array call.
    fn http_per_table(
        &self,
        method: HttpMethod,
        url: &Expr,
        tpl: &Template,
        table: &str,
        per_record: bool,
        ctx: &mut GatewayContext,
    ) {
        let Some((saved, rows)) = snapshot(ctx, table) else {
            tracing::warn!(table, "http dispatch over unknown table");
            return;
        };

        if per_record {
            for row in 0..rows {
                set_cursor(ctx, table, Some(row));
                match render_object(tpl, &mut Evaluator::new(ctx)) {
                    Ok(object) => self.dispatch(method, url, object.to_string(), ctx),
                    Err(err) => tracing::warn!(table, row, %err, "template failed to render"),
                }
            }
        } else {
            let mut items = Vec::with_capacity(rows);
            for row in 0..rows {
                set_cursor(ctx, table, Some(row));
                match render_object(tpl, &mut Evaluator::new(ctx)) {
                    Ok(object) => items.push(object),
                    Err(err) => tracing::warn!(table, row, %err, "template failed to render"),
                }
            }
            self.dispatch(method, url, serde_json::Value::Array(items).to_string(), ctx);
        }

        set_cursor(ctx, table, saved);
    }

    /// Template without table: render once against the current row.
    fn http_single(&self, method: HttpMethod, url: &Expr, tpl: &Template, ctx: &mut GatewayContext) {
        match render_object(tpl, &mut Evaluator::new(ctx)) {
            Ok(object) => self.dispatch(method, url, object.to_string(), ctx),
            Err(err) => tracing::warn!(%err, "template failed to render"),
        }
    }

    /// Evaluate the url and hand the request to the dispatcher.
    fn dispatch(&self, method: HttpMethod, url: &Expr, body: String, ctx: &mut GatewayContext) {
        match Evaluator::new(ctx).eval_text(url) {
            Ok(url) => self.dispatcher.send_http(method, &url, body),
            Err(err) => tracing::warn!(%err, "http url failed to evaluate"),
        }
    }
}

fn run_set_record(table: &str, field: &Expr, value: &Expr, ctx: &mut GatewayContext) {
    let field_value = match Evaluator::new(ctx).eval_value(field) {
        Ok(v) => v,
        Err(err) => {
            tracing::warn!(table, %err, "set_record field failed to evaluate");
            return;
        }
    };
    let value_text = match Evaluator::new(ctx).eval_text(value) {
        Ok(v) => v,
        Err(err) => {
            tracing::warn!(table, %err, "set_record value failed to evaluate");
            return;
        }
    };

    let Some(tbl) = ctx.tables.get(table) else {
        tracing::warn!(table, "set_record on unknown table");
        return;
    };

    let index = match field_value.as_int() {
        Some(i) => match usize::try_from(i) {
            Ok(i) => i,
            Err(_) => {
                tracing::warn!(table, index = i, "set_record index out of range");
                return;
            }
        },
        // Not an integer: treat as a field name, declaring it on demand.
        None => {
            let name = field_value.into_text();
            match tbl.field_index(&name) {
                Some(i) => i,
                None => tbl.add_field(name),
            }
        }
    };
    tbl.set_field(index, &value_text);
}

fn json_value(value: Value) -> serde_json::Value {
    match value {
        Value::None => serde_json::Value::Null,
        Value::Int(i) => serde_json::Value::from(i),
        Value::Str(s) => serde_json::Value::from(s),
    }
}

/// Cursor and row count of `table`, or `None` when it does not exist.
fn snapshot(ctx: &mut GatewayContext, table: &str) -> Option<(Option<usize>, usize)> {
    let tbl = ctx.tables.get(table)?;
    Some((tbl.cursor(), tbl.row_count()))
}

fn set_cursor(ctx: &mut GatewayContext, table: &str, cursor: Option<usize>) {
    if let Some(tbl) = ctx.tables.get(table) {
        tbl.set_cursor(cursor);
    }
}
