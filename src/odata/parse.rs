//! Body parsing for OData responses.
//!
//! SAP Gateway answers either with an Atom feed or with a JSON envelope. Both
//! are reduced to a list of [`RawEntity`] maps; the field mapping happens in
//! [`super::mapping`].

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use quick_xml::events::Event;
use quick_xml::reader::Reader;
use serde_json::Value;
use thiserror::Error;

/// One entity as delivered by SAP: property name to text value.
pub type RawEntity = HashMap<String, String>;

/// Why a body could not be read in a given format.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("malformed XML: {0}")]
    Xml(String),

    #[error("malformed JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Body format, either declared by the server or guessed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyFormat {
    Atom,
    Json,
}

impl BodyFormat {
    /// Read the format from a `Content-Type` value. `None` when the header
    /// says nothing useful.
    pub fn from_content_type(content_type: &str) -> Option<Self> {
        let mime = content_type.split(';').next().unwrap_or_default().trim().to_ascii_lowercase();
        if mime.contains("json") {
            Some(Self::Json)
        } else if mime.contains("xml") {
            Some(Self::Atom)
        } else {
            None
        }
    }

    fn parser(self) -> Parser {
        match self {
            Self::Atom => parse_atom_feed,
            Self::Json => parse_json_envelope,
        }
    }
}

type Parser = fn(&str) -> Result<Vec<RawEntity>, ParseError>;

/// Parsers tried, in order, when the format is unknown.
const FALLBACK_CHAIN: [BodyFormat; 2] = [BodyFormat::Atom, BodyFormat::Json];

/// Parse a response body. A declared format picks its parser directly;
/// otherwise Atom is tried first and JSON second. The error lists every
/// attempt that failed.
pub fn parse_body(
    body: &str,
    declared: Option<BodyFormat>,
) -> Result<(BodyFormat, Vec<RawEntity>), Vec<ParseError>> {
    let chain: &[BodyFormat] = match declared {
        Some(ref format) => std::slice::from_ref(format),
        None => &FALLBACK_CHAIN,
    };

    let mut failures = Vec::new();
    for format in chain {
        match (format.parser())(body) {
            Ok(entities) => return Ok((*format, entities)),
            Err(err) => failures.push(err),
        }
    }
    Err(failures)
}

/// Extract the `properties` of every `entry` in an Atom feed.
///
/// Element names are matched by local name, so any namespace prefix works.
/// A well-formed document without entries yields an empty list.
pub fn parse_atom_feed(body: &str) -> Result<Vec<RawEntity>, ParseError> {
    let mut reader = Reader::from_str(body);
    reader.trim_text(true);

    let mut entities = Vec::new();
    let mut depth = 0usize;
    let mut seen_root = false;

    // entry / properties tracking
    let mut in_entry = false;
    let mut entry_done = false;
    let mut current: Option<RawEntity> = None;
    let mut property: Option<(String, String)> = None;
    let mut property_depth = 0usize;

    loop {
        let event = reader
            .read_event()
            .map_err(|e| ParseError::Xml(format!("{e} at byte {}", reader.buffer_position())))?;

        match event {
            Event::Start(e) => {
                if depth == 0 {
                    if seen_root {
                        return Err(ParseError::Xml("multiple root elements".into()));
                    }
                    seen_root = true;
                }
                depth += 1;

                let name = local_name(e.local_name().as_ref());
                if property.is_some() {
                    property_depth += 1;
                } else if current.is_some() {
                    property = Some((name, String::new()));
                    property_depth = 1;
                } else if in_entry && !entry_done && name == "properties" {
                    current = Some(RawEntity::new());
                } else if name == "entry" {
                    in_entry = true;
                    entry_done = false;
                }
            }
            Event::Empty(e) => {
                if depth == 0 {
                    if seen_root {
                        return Err(ParseError::Xml("multiple root elements".into()));
                    }
                    seen_root = true;
                }
                let name = local_name(e.local_name().as_ref());
                if property.is_none() {
                    if let Some(entity) = current.as_mut() {
                        // <d:Wonot/> and <d:Wonot m:null="true"/>
                        entity.insert(name, String::new());
                    } else if in_entry && !entry_done && name == "properties" {
                        entities.push(RawEntity::new());
                        entry_done = true;
                    }
                }
            }
            Event::End(e) => {
                depth = depth.saturating_sub(1);
                let name = local_name(e.local_name().as_ref());

                if property.is_some() {
                    property_depth -= 1;
                    if property_depth == 0 {
                        if let (Some((key, value)), Some(entity)) = (property.take(), current.as_mut()) {
                            entity.insert(key, value);
                        }
                    }
                } else if current.is_some() && name == "properties" {
                    entities.extend(current.take());
                    entry_done = true;
                } else if in_entry && name == "entry" {
                    in_entry = false;
                }
            }
            Event::Text(text) => {
                if depth == 0 {
                    return Err(ParseError::Xml("text outside the root element".into()));
                }
                if let Some((_, value)) = property.as_mut() {
                    let unescaped = text.unescape().map_err(|e| ParseError::Xml(e.to_string()))?;
                    value.push_str(&unescaped);
                }
            }
            Event::CData(data) => {
                if let Some((_, value)) = property.as_mut() {
                    value.push_str(&String::from_utf8_lossy(&data));
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !seen_root {
        return Err(ParseError::Xml("document has no root element".into()));
    }
    if depth != 0 {
        return Err(ParseError::Xml("unexpected end of document".into()));
    }
    Ok(entities)
}

fn local_name(raw: &[u8]) -> String {
    String::from_utf8_lossy(raw).into_owned()
}

/// Extract the result list from a JSON envelope.
///
/// Supports `{"d": {"results": [...]}}` (OData v2) and `{"value": [...]}`
/// (OData v4). Any other shape yields an empty list.
pub fn parse_json_envelope(body: &str) -> Result<Vec<RawEntity>, ParseError> {
    let root: Value = serde_json::from_str(body)?;

    let results = root
        .get("d")
        .and_then(|d| d.get("results"))
        .or_else(|| root.get("value"))
        .and_then(Value::as_array);

    let Some(results) = results else {
        return Ok(Vec::new());
    };

    Ok(results
        .iter()
        .filter_map(Value::as_object)
        .map(|object| {
            object
                .iter()
                .filter_map(|(key, value)| json_scalar(value).map(|text| (key.clone(), text)))
                .collect()
        })
        .collect())
}

fn json_scalar(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(normalize_json_date(s).unwrap_or_else(|| s.clone())),
        Value::Null => Some(String::new()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Array(_) | Value::Object(_) => None,
    }
}

/// Rewrite an OData v2 JSON date (`/Date(1705276800000)/`, optionally with a
/// `+hhmm` offset) into `YYYY-MM-DDTHH:MM:SS` UTC.
fn normalize_json_date(raw: &str) -> Option<String> {
    let inner = raw.strip_prefix("/Date(")?.strip_suffix(")/")?;
    let mut chars = inner.char_indices();
    chars.next()?;
    // the offset only annotates the value; the millis are already UTC
    let millis_end = chars
        .find(|(_, c)| *c == '+' || *c == '-')
        .map_or(inner.len(), |(i, _)| i);
    let millis: i64 = inner[..millis_end].parse().ok()?;
    let timestamp = DateTime::<Utc>::from_timestamp_millis(millis)?;
    Some(timestamp.naive_utc().format("%Y-%m-%dT%H:%M:%S").to_string())
}
