//! Decoding of the wide value row into the `Value` sum type.
//!
//! The schema guarantees at most one non-null column per row; if that ever
//! breaks the fixed precedence below decides deterministically, so the rest
//! of the engine never sees an ambiguous row.

use crate::models::{FormatKind, Value};

use super::rows::ValueColumns;

/// Decodes one row's value columns. Precedence: boolean, double,
/// percentage, number, text, rich text. All-null rows decode to `None` and
/// are skipped by callers; no placeholder value is synthesized.
pub fn decode_value(
    columns: &ValueColumns,
    format: FormatKind,
    is_player_name: bool,
) -> Option<Value> {
    if let Some(value) = columns.boolean_value {
        return Some(Value::Boolean { value });
    }
    if let Some(value) = columns.double_value {
        return Some(Value::Double { value });
    }
    if let Some(value) = columns.percentage_value {
        return Some(Value::Percentage { value });
    }
    if let Some(value) = columns.number_value {
        return Some(Value::Number { value, format });
    }
    if let Some(value) = &columns.text_value {
        return Some(Value::Text { value: value.clone(), is_player_name });
    }
    if let Some(value) = &columns.rich_text_value {
        return Some(Value::RichText { value: value.clone() });
    }
    None
}
