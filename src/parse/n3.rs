//! Typed-property parser for the N3 pass: finds the JSON object in a model
//! response and coerces it into a [`PropertySet`].

use serde_json::Value;

use crate::dataset::PropertySet;
use crate::parse::n2::clean_output;

/// Parse the outermost `{...}` slice of a response into properties.
///
/// Returns `None` when no parseable JSON object is present; the retry
/// controller treats that as a failed attempt and the runner falls back to
/// `PropertySet::default()` on exhaustion. Values are coerced leniently:
/// numbers become their decimal string, null and non-string shapes become
/// empty.
pub fn parse_properties(text: &str) -> Option<PropertySet> {
    let cleaned = clean_output(text);
    let start = cleaned.find('{')?;
    let end = cleaned.rfind('}')?;
    if end <= start {
        return None;
    }

    let data: Value = serde_json::from_str(&cleaned[start..=end]).ok()?;
    let obj = data.as_object()?;

    Some(PropertySet {
        kind: coerce(obj.get("type")),
        object: coerce(obj.get("object")),
        property: coerce(obj.get("property")),
        comparation: coerce(obj.get("comparation")),
        target: coerce(obj.get("target")),
        unit: coerce(obj.get("unit")),
    })
}

fn coerce(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    }
}
