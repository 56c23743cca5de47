//! Dot/bracket data paths.
//!
//! A data path such as `customer.name` or `items[0].price` names a value inside
//! the JSON payload that is stamped onto the document. Each dot-separated part
//! is a key optionally followed by one or more `[N]` array indexes.

#[cfg(test)]
#[path = "data_path_test.rs"]
mod data_path_test;

use serde_json::{Map, Value};

use crate::consts::MAX_DATA_PATH_INDEX;
use crate::doc::{Element, ElementKind};

/// One step of a parsed path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Key(String),
    Index(usize),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DataPathError {
    #[error("data path is empty")]
    Empty,
    #[error("empty segment at position {0}")]
    EmptySegment(usize),
    #[error("unclosed bracket in segment `{0}`")]
    UnclosedBracket(String),
    #[error("empty brackets in segment `{0}`")]
    EmptyIndex(String),
    #[error("invalid index `{index}` in segment `{segment}`")]
    InvalidIndex { segment: String, index: String },
    #[error("unexpected `{found}` after index in segment `{segment}`")]
    TrailingCharacters { segment: String, found: char },
    #[error("index {index} in segment `{segment}` exceeds {max}")]
    IndexTooLarge { segment: String, index: usize, max: usize },
}

/// Example values keyed by a word found anywhere in the path; first match wins.
const EXAMPLE_VALUES: &[(&str, ExampleValue)] = &[
    ("name", ExampleValue::Text("John Doe")),
    ("email", ExampleValue::Text("john@example.com")),
    ("date", ExampleValue::Text("2024-01-17")),
    ("price", ExampleValue::Number(10000)),
    ("quantity", ExampleValue::Number(2)),
    ("total", ExampleValue::Number(40000)),
    ("address", ExampleValue::Text("123 Main St")),
    ("checked", ExampleValue::Flag(true)),
];

#[derive(Debug, Clone, Copy)]
enum ExampleValue {
    Text(&'static str),
    Number(i64),
    Flag(bool),
}

impl ExampleValue {
    fn to_json(self) -> Value {
        match self {
            Self::Text(s) => Value::from(s),
            Self::Number(n) => Value::from(n),
            Self::Flag(b) => Value::from(b),
        }
    }
}

/// Parse a path into its segments.
///
/// # Errors
///
/// Returns a [`DataPathError`] for empty paths or segments, unclosed or empty
/// brackets, non-numeric indexes, and indexes above [`MAX_DATA_PATH_INDEX`].
pub fn parse(path: &str) -> Result<Vec<Segment>, DataPathError> {
    if path.trim().is_empty() {
        return Err(DataPathError::Empty);
    }
    let mut segments = Vec::new();
    for (position, part) in path.split('.').enumerate() {
        let key_end = part.find('[').unwrap_or(part.len());
        let key = &part[..key_end];
        if key.is_empty() {
            return Err(DataPathError::EmptySegment(position));
        }
        segments.push(Segment::Key(key.to_owned()));
        parse_indexes(part, &part[key_end..], &mut segments)?;
    }
    Ok(segments)
}

fn parse_indexes(part: &str, mut rest: &str, out: &mut Vec<Segment>) -> Result<(), DataPathError> {
    while let Some(first) = rest.chars().next() {
        if first != '[' {
            return Err(DataPathError::TrailingCharacters { segment: part.to_owned(), found: first });
        }
        let Some(close) = rest.find(']') else {
            return Err(DataPathError::UnclosedBracket(part.to_owned()));
        };
        let digits = &rest[1..close];
        if digits.is_empty() {
            return Err(DataPathError::EmptyIndex(part.to_owned()));
        }
        let index = digits
            .parse::<usize>()
            .map_err(|_| DataPathError::InvalidIndex { segment: part.to_owned(), index: digits.to_owned() })?;
        if index > MAX_DATA_PATH_INDEX {
            return Err(DataPathError::IndexTooLarge { segment: part.to_owned(), index, max: MAX_DATA_PATH_INDEX });
        }
        out.push(Segment::Index(index));
        rest = &rest[close + 1..];
    }
    Ok(())
}

/// Look up the value at `path`. Invalid paths and missing values both resolve to `None`.
#[must_use]
pub fn resolve<'a>(data: &'a Value, path: &str) -> Option<&'a Value> {
    let Ok(segments) = parse(path) else {
        return None;
    };
    segments.iter().try_fold(data, |current, segment| match segment {
        Segment::Key(key) => current.get(key.as_str()),
        Segment::Index(index) => current.get(*index),
    })
}

/// Set `value` at `path`, creating intermediate objects and arrays as needed.
///
/// Arrays are padded with empty objects up to the requested index. Scalars in
/// the way are replaced by the container the path requires.
///
/// # Errors
///
/// Returns a [`DataPathError`] if `path` does not parse; `data` is untouched.
pub fn insert(data: &mut Value, path: &str, value: Value) -> Result<(), DataPathError> {
    let segments = parse(path)?;
    insert_at(data, &segments, value);
    Ok(())
}

fn insert_at(current: &mut Value, segments: &[Segment], value: Value) {
    let Some((first, rest)) = segments.split_first() else {
        *current = value;
        return;
    };
    let slot = match first {
        Segment::Key(key) => {
            if !current.is_object() {
                *current = Value::Object(Map::new());
            }
            let Value::Object(map) = current else {
                return;
            };
            map.entry(key.clone()).or_insert(Value::Null)
        }
        Segment::Index(index) => {
            if !current.is_array() {
                *current = Value::Array(Vec::new());
            }
            let Value::Array(items) = current else {
                return;
            };
            while items.len() <= *index {
                items.push(Value::Object(Map::new()));
            }
            &mut items[*index]
        }
    };
    insert_at(slot, rest, value);
}

/// Example value for a text field bound to `path`.
#[must_use]
pub fn example_text_value(path: &str) -> Value {
    let lower = path.to_lowercase();
    EXAMPLE_VALUES
        .iter()
        .find(|(keyword, _)| lower.contains(keyword))
        .map_or_else(|| Value::from("Example text value"), |(_, value)| value.to_json())
}

/// Build an example render payload covering every bound element.
///
/// Image and repeat elements and elements without a data path are skipped; checkboxes get
/// `true`. Elements whose path does not parse are skipped.
#[must_use]
pub fn example_payload(elements: &[Element]) -> Value {
    let mut payload = Value::Object(Map::new());
    for element in elements {
        if element.data_path.is_empty() {
            continue;
        }
        let value = match element.kind {
            ElementKind::Image { .. } | ElementKind::Repeat(_) => continue,
            ElementKind::Checkbox => Value::Bool(true),
            ElementKind::Text { .. } => example_text_value(&element.data_path),
        };
        if let Err(err) = insert(&mut payload, &element.data_path, value) {
            log::debug!("skipping {} in example payload: {err}", element.id);
        }
    }
    payload
}
