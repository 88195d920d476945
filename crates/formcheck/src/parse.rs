//! Parsing of `--event` and `--set` arguments.

use form_events::{FormEvent, types};
use serde_json::Value;

use crate::error::{Error, Result};

/// Parse `TYPE[:ARRAY[:ARGS...]]` into an event.
///
/// Array commands take the array key, then their indices:
/// `add-array-item:contacts[:i]`, `insert-array-item:contacts:i`,
/// `remove-array-item:contacts[:i]`, `move-array-item:contacts:from:to`.
/// Unknown types become custom events whose remaining parts are JSON arguments,
/// with bare words taken as strings.
pub fn parse_event(spec: &str) -> Result<FormEvent> {
    let mut parts = spec.split(':');
    let kind = parts.next().unwrap_or_default();
    let rest: Vec<&str> = parts.collect();
    let array = || {
        rest.first()
            .filter(|k| !k.is_empty())
            .map(|k| k.to_string())
            .ok_or_else(|| Error::event(spec, "missing array key"))
    };
    let index = |i: usize| -> Result<Option<usize>> {
        rest.get(i)
            .map(|s| {
                s.parse()
                    .map_err(|_| Error::event(spec, format!("'{s}' is not an index")))
            })
            .transpose()
    };
    let required = |i: usize| -> Result<usize> {
        index(i)?.ok_or_else(|| Error::event(spec, "missing index"))
    };
    Ok(match kind {
        "" => return Err(Error::event(spec, "empty event type")),
        types::NEXT_PAGE => FormEvent::NextPage,
        types::PREVIOUS_PAGE => FormEvent::PreviousPage,
        types::SUBMIT => FormEvent::Submit,
        types::ADD_ARRAY_ITEM => FormEvent::AddArrayItem {
            array_key: array()?,
            index: index(1)?,
        },
        types::PREPEND_ARRAY_ITEM => FormEvent::PrependArrayItem {
            array_key: array()?,
        },
        types::INSERT_ARRAY_ITEM => FormEvent::InsertArrayItem {
            array_key: array()?,
            index: required(1)?,
        },
        types::REMOVE_ARRAY_ITEM => FormEvent::RemoveArrayItem {
            array_key: array()?,
            index: index(1)?,
        },
        types::POP_ARRAY_ITEM => FormEvent::PopArrayItem {
            array_key: array()?,
        },
        types::SHIFT_ARRAY_ITEM => FormEvent::ShiftArrayItem {
            array_key: array()?,
        },
        types::MOVE_ARRAY_ITEM => FormEvent::MoveArrayItem {
            array_key: array()?,
            from: required(1)?,
            to: required(2)?,
        },
        other => FormEvent::Custom {
            event_type: other.to_string(),
            args: rest.iter().map(|a| json_or_string(a)).collect(),
        },
    })
}

/// Parse `PATH=JSON`; a right-hand side that is not JSON is taken as a string.
pub fn parse_assignment(arg: &str) -> Result<(String, Value)> {
    let Some((path, raw)) = arg.split_once('=') else {
        return Err(Error::Assignment(arg.to_string()));
    };
    let path = path.trim();
    if path.is_empty() {
        return Err(Error::Assignment(arg.to_string()));
    }
    Ok((path.to_string(), json_or_string(raw)))
}

/// `raw` as JSON, or as a JSON string when it does not parse.
fn json_or_string(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}
