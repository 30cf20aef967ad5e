//! Guard file loading with schema + invariant validation.
//!
//! Guard files are line-oriented: unindented `key:` lines open a section,
//! `- ` lines add an item, and indented `self:`/`peer:` lines split
//! `reviews`. The rest of a `- ` line is taken verbatim, so commands need no
//! quoting. Self-review items are `- slug: ...` followed by `prompt: ...`.
//! Full-line `#` comments and blank lines are ignored.
//!
//! The lines are assembled into a JSON value that is validated against an
//! embedded JSON Schema before being deserialized, so an unrecognized shape is
//! an error rather than a silently different guard.

use std::collections::HashSet;
use std::fs;
use std::path::Path;
use std::sync::LazyLock;

use anyhow::{Context, Result, anyhow, bail};
use jsonschema::{Validator, validator_for};
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::stone::{Guard, Reviews};

const GUARD_SCHEMA: &str = include_str!("../../schemas/guard.schema.json");

static GUARD_VALIDATOR: LazyLock<Result<Validator, String>> = LazyLock::new(|| {
    let schema: Value = serde_json::from_str(GUARD_SCHEMA).map_err(|err| err.to_string())?;
    validator_for(&schema).map_err(|err| err.to_string())
});

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct GuardDoc {
    #[serde(default)]
    artifacts: Vec<String>,
    #[serde(default)]
    reviews: Reviews,
    #[serde(default)]
    judges: Vec<String>,
}

/// Load and validate a guard from disk.
pub fn load_guard(path: &Path) -> Result<Guard> {
    let contents =
        fs::read_to_string(path).with_context(|| format!("read guard {}", path.display()))?;
    parse_guard(path, &contents)
}

/// Parse and validate guard text; `path` is recorded on the result and used in errors.
pub fn parse_guard(path: &Path, contents: &str) -> Result<Guard> {
    let value = guard_value(contents).with_context(|| format!("parse guard {}", path.display()))?;
    validate_schema(&value).with_context(|| format!("validate guard {}", path.display()))?;
    let doc: GuardDoc = serde_json::from_value(value)
        .with_context(|| format!("deserialize guard {}", path.display()))?;
    validate_guard_invariants(&doc).with_context(|| format!("validate guard {}", path.display()))?;
    Ok(Guard {
        path: path.to_path_buf(),
        artifacts: doc.artifacts,
        reviews: doc.reviews,
        judges: doc.judges,
    })
}

/// Assemble guard lines into the JSON shape the schema describes.
fn guard_value(contents: &str) -> Result<Value> {
    let mut doc = Map::new();
    let mut section: Option<String> = None;
    let mut subsection: Option<String> = None;

    for (offset, raw) in contents.lines().enumerate() {
        let line_no = offset + 1;
        let line = raw.trim_end();
        let text = line.trim_start();
        if text.is_empty() || text.starts_with('#') {
            continue;
        }
        let indented = text.len() < line.len();

        if !indented && item_text(text).is_none() {
            let name = section_name(text)
                .ok_or_else(|| anyhow!("line {line_no}: expected `key:`, found `{text}`"))?;
            if doc.contains_key(name) {
                bail!("line {line_no}: duplicate key `{name}`");
            }
            doc.insert(name.to_string(), Value::Array(Vec::new()));
            section = Some(name.to_string());
            subsection = None;
            continue;
        }

        let Some(current) = section.as_deref() else {
            bail!("line {line_no}: `{text}` appears before any key");
        };
        let Some(slot) = doc.get_mut(current) else {
            bail!("line {line_no}: unknown section `{current}`");
        };

        if let Some(item) = item_text(text) {
            let list = match subsection.as_deref() {
                None => slot.as_array_mut().ok_or_else(|| {
                    anyhow!("line {line_no}: `{current}` mixes list items with sub-keys")
                })?,
                Some(sub) => slot
                    .get_mut(sub)
                    .and_then(Value::as_array_mut)
                    .ok_or_else(|| anyhow!("line {line_no}: unknown sub-key `{sub}`"))?,
            };
            if subsection.as_deref() == Some("self") {
                let (field, value) = field_pair(item)
                    .ok_or_else(|| anyhow!("line {line_no}: expected `- slug: ...`"))?;
                let mut entry = Map::new();
                entry.insert(field.to_string(), Value::String(value));
                list.push(Value::Object(entry));
            } else {
                list.push(Value::String(item.to_string()));
            }
            continue;
        }

        if let Some(name) = section_name(text) {
            if slot.as_array().is_some_and(|items| !items.is_empty()) {
                bail!("line {line_no}: `{current}` mixes list items with sub-keys");
            }
            if slot.is_array() {
                *slot = Value::Object(Map::new());
            }
            let Some(nested) = slot.as_object_mut() else {
                bail!("line {line_no}: unexpected sub-key `{name}`");
            };
            if nested.contains_key(name) {
                bail!("line {line_no}: duplicate key `{name}`");
            }
            nested.insert(name.to_string(), Value::Array(Vec::new()));
            subsection = Some(name.to_string());
            continue;
        }

        // Continuation of the open self-review item.
        let (field, value) =
            field_pair(text).ok_or_else(|| anyhow!("line {line_no}: unexpected `{text}`"))?;
        let entry = match subsection.as_deref() {
            Some("self") => slot
                .get_mut("self")
                .and_then(Value::as_array_mut)
                .and_then(|items| items.last_mut())
                .and_then(Value::as_object_mut),
            _ => None,
        }
        .ok_or_else(|| anyhow!("line {line_no}: `{text}` does not belong to a self-review"))?;
        if entry.contains_key(field) {
            bail!("line {line_no}: duplicate field `{field}`");
        }
        entry.insert(field.to_string(), Value::String(value));
    }

    Ok(Value::Object(doc))
}

/// `- rest` -> `rest`, verbatim apart from surrounding whitespace.
fn item_text(text: &str) -> Option<&str> {
    if text == "-" {
        return Some("");
    }
    text.strip_prefix("- ").map(str::trim)
}

/// `name:` with nothing after the colon.
fn section_name(text: &str) -> Option<&str> {
    let name = text.strip_suffix(':')?.trim_end();
    let valid = !name.is_empty() && !name.contains(|c: char| c == ':' || c.is_whitespace());
    valid.then_some(name)
}

/// `field: value`, with one pair of surrounding quotes removed from the value.
fn field_pair(text: &str) -> Option<(&str, String)> {
    let (field, value) = text.split_once(':')?;
    let field = field.trim();
    if field.is_empty() || field.contains(char::is_whitespace) {
        return None;
    }
    Some((field, unquote(value.trim()).to_string()))
}

fn unquote(value: &str) -> &str {
    for quote in ['"', '\''] {
        let inner = value
            .strip_prefix(quote)
            .and_then(|rest| rest.strip_suffix(quote));
        if let Some(inner) = inner {
            return inner;
        }
    }
    value
}

fn validate_schema(value: &Value) -> Result<()> {
    let validator = GUARD_VALIDATOR
        .as_ref()
        .map_err(|err| anyhow!("invalid guard schema: {err}"))?;
    if !validator.is_valid(value) {
        let messages = validator
            .iter_errors(value)
            .map(|err| err.to_string())
            .collect::<Vec<_>>();
        return Err(anyhow!(
            "guard schema validation failed: {}",
            messages.join("; ")
        ));
    }
    Ok(())
}

/// Invariants the schema cannot express: self-review slugs are unique.
fn validate_guard_invariants(doc: &GuardDoc) -> Result<()> {
    let mut seen = HashSet::new();
    for review in doc.reviews.self_reviews() {
        if !seen.insert(review.slug.as_str()) {
            return Err(anyhow!("duplicate self-review slug '{}'", review.slug));
        }
    }
    Ok(())
}
