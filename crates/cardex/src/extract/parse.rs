//! Turns free-form model output into structured card data.

use serde_json::{Map, Value};

use crate::model::{CompanyData, PersonalData};

use super::{Extraction, ExtractionError};

/// Finds the first balanced `{ ... }` block in `text`.
///
/// Braces inside JSON string literals are ignored, so prose or code fences
/// around the object don't matter.
pub fn locate_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in text[start..].char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + offset + ch.len_utf8()]);
                }
            }
            _ => {}
        }
    }
    None
}

/// Drops `null` members and turns scalar leaves into strings.
///
/// Every leaf of the card contract is a string; models sometimes emit phone
/// numbers as numbers or unknown values as `null`.
fn normalize(value: Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .filter(|(_, v)| !v.is_null())
                .map(|(k, v)| (k, normalize(v)))
                .collect::<Map<_, _>>(),
        ),
        Value::Number(n) => Value::String(n.to_string()),
        Value::Bool(b) => Value::String(b.to_string()),
        other => other,
    }
}

fn unparseable(reason: impl Into<String>, raw: &str) -> ExtractionError {
    ExtractionError::Unparseable {
        reason: reason.into(),
        raw: raw.to_string(),
    }
}

fn section<T: serde::de::DeserializeOwned + Default>(
    object: &mut Map<String, Value>,
    key: &str,
    raw: &str,
) -> Result<T, ExtractionError> {
    match object.remove(key) {
        None => Ok(T::default()),
        Some(value @ Value::Object(_)) => serde_json::from_value(value)
            .map_err(|e| unparseable(format!("invalid '{}' section: {}", key, e), raw)),
        Some(_) => Err(unparseable(format!("'{}' is not an object", key), raw)),
    }
}

/// Parses the model's answer into an [`Extraction`].
///
/// The answer must contain a JSON object with at least one of the
/// `personal_data` / `company_data` keys. A missing section, missing fields,
/// and `null` values all default to empty strings; unknown fields are ignored.
pub fn parse_extraction(raw_text: &str) -> Result<Extraction, ExtractionError> {
    let json = locate_json_object(raw_text)
        .ok_or_else(|| unparseable("no JSON object found in model output", raw_text))?;

    let value: Value = serde_json::from_str(json)
        .map_err(|e| unparseable(format!("model output is not valid JSON: {}", e), raw_text))?;

    let mut object = match normalize(value) {
        Value::Object(map) => map,
        _ => return Err(unparseable("model output is not a JSON object", raw_text)),
    };

    if !object.contains_key("personal_data") && !object.contains_key("company_data") {
        return Err(unparseable(
            "model output has neither 'personal_data' nor 'company_data'",
            raw_text,
        ));
    }

    let personal_data: PersonalData = section(&mut object, "personal_data", raw_text)?;
    let company_data: CompanyData = section(&mut object, "company_data", raw_text)?;

    Ok(Extraction {
        personal_data,
        company_data,
        raw_text: raw_text.to_string(),
    })
}
