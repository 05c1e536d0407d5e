//! Template rendering — turns a [`Template`] into a JSON object.
//!
//! Each template field's expression is evaluated against the current row
//! and placed into a `serde_json` object under the field's name, so
//! string escaping is correct by construction. Integers become JSON
//! numbers, strings JSON strings, missing values JSON null.

use feedgate_domain::script::Template;
use feedgate_domain::value::Value;

use crate::eval::{EvalError, Evaluator};

/// Render `template` into one JSON object against the current rows.
///
/// # Errors
///
/// Propagates [`EvalError`] from the field expressions.
pub fn render_object(
    template: &Template,
    eval: &mut Evaluator<'_>,
) -> Result<serde_json::Value, EvalError> {
    let mut object = serde_json::Map::with_capacity(template.fields.len());
    for field in &template.fields {
        let value = eval.eval_value(&field.value)?;
        object.insert(field.name.clone(), to_json(value));
    }
    Ok(serde_json::Value::Object(object))
}

fn to_json(value: Value) -> serde_json::Value {
    match value {
        Value::None => serde_json::Value::Null,
        Value::Int(i) => serde_json::Value::from(i),
        Value::Str(s) => serde_json::Value::from(s),
    }
}
