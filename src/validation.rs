//! Book payload validation.
//!
//! Pure field presence/type/format checks over the incoming JSON object.
//! Returns a map from field name to violation message; an empty map means
//! the payload is valid. Deterministic, no side effects, never fails.
//!
//! `coverImageBase64` is deliberately not checked here; image handling
//! (including its create/update asymmetry) belongs to the lifecycle
//! manager.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde_json::{Map, Value};

use crate::ident::DocId;

/// Whether the payload is for a create (all fields required) or an
/// update (only provided fields are checked).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Create,
    Update,
}

/// Fields that must be present in create mode.
const REQUIRED_FIELDS: [&str; 5] = ["title", "author", "publishDate", "pageCount", "description"];

/// Validate a book payload, returning a field → violation map.
pub fn validate_book(data: &Map<String, Value>, mode: Mode) -> BTreeMap<String, String> {
    let mut errors = BTreeMap::new();

    if mode == Mode::Create {
        for field in REQUIRED_FIELDS {
            if !data.contains_key(field) {
                errors.insert(field.to_string(), "is required".to_string());
            }
        }
    }

    if let Some(value) = data.get("title") {
        match value.as_str() {
            None => {
                errors.insert("title".to_string(), "must be a string".to_string());
            }
            Some("") => {
                errors.insert("title".to_string(), "cannot be empty".to_string());
            }
            Some(_) => {}
        }
    }

    if let Some(value) = data.get("author") {
        match value.as_str() {
            None => {
                errors.insert(
                    "author".to_string(),
                    "must be a string (author id)".to_string(),
                );
            }
            // A present-but-unparseable id is a distinct violation from a
            // wrong type.
            Some(s) => {
                if s.parse::<DocId>().is_err() {
                    errors.insert("author".to_string(), "must be a valid author id".to_string());
                }
            }
        }
    }

    if let Some(value) = data.get("publishDate") {
        match value.as_str() {
            None => {
                errors.insert("publishDate".to_string(), "must be a string".to_string());
            }
            Some(s) => {
                if parse_publish_date(s).is_none() {
                    errors.insert(
                        "publishDate".to_string(),
                        "must be a valid date in YYYY-MM-DD format".to_string(),
                    );
                }
            }
        }
    }

    if let Some(value) = data.get("pageCount") {
        match value.as_i64() {
            Some(n) if n > 0 => {}
            _ => {
                errors.insert(
                    "pageCount".to_string(),
                    "must be a positive integer".to_string(),
                );
            }
        }
    }

    if let Some(value) = data.get("description") {
        if !value.is_string() {
            errors.insert("description".to_string(), "must be a string".to_string());
        }
    }

    errors
}

/// Parse a strict `YYYY-MM-DD` date: exactly ten characters with
/// zero-padded components and a real calendar date.
pub fn parse_publish_date(s: &str) -> Option<NaiveDate> {
    let bytes = s.as_bytes();
    if bytes.len() != 10 || bytes[4] != b'-' || bytes[7] != b'-' {
        return None;
    }
    if !s
        .char_indices()
        .all(|(i, c)| matches!(i, 4 | 7) || c.is_ascii_digit())
    {
        return None;
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()
}

// ── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn payload(value: Value) -> Map<String, Value> {
        value.as_object().expect("payload must be an object").clone()
    }

    fn valid_create() -> Map<String, Value> {
        payload(json!({
            "title": "Dune",
            "author": "65a1b2c3d4e5f60718293a4b",
            "publishDate": "1965-06-01",
            "pageCount": 412,
            "description": "Melange."
        }))
    }

    #[test]
    fn test_valid_create_payload() {
        assert!(validate_book(&valid_create(), Mode::Create).is_empty());
    }

    #[test]
    fn test_create_requires_every_field() {
        for field in REQUIRED_FIELDS {
            let mut data = valid_create();
            data.remove(field);
            let errors = validate_book(&data, Mode::Create);
            assert_eq!(errors.get(field).map(String::as_str), Some("is required"));
        }
    }

    #[test]
    fn test_update_allows_partial_payload() {
        let data = payload(json!({ "title": "Dune Messiah" }));
        assert!(validate_book(&data, Mode::Update).is_empty());
        assert!(validate_book(&payload(json!({})), Mode::Update).is_empty());
    }

    #[test]
    fn test_title_type_and_emptiness() {
        let errors = validate_book(&payload(json!({ "title": 7 })), Mode::Update);
        assert_eq!(errors.get("title").map(String::as_str), Some("must be a string"));

        let errors = validate_book(&payload(json!({ "title": "" })), Mode::Update);
        assert_eq!(errors.get("title").map(String::as_str), Some("cannot be empty"));
    }

    #[test]
    fn test_author_wrong_type_vs_unparseable() {
        let errors = validate_book(&payload(json!({ "author": 42 })), Mode::Update);
        assert_eq!(
            errors.get("author").map(String::as_str),
            Some("must be a string (author id)")
        );

        let errors = validate_book(&payload(json!({ "author": "not-an-id" })), Mode::Update);
        assert_eq!(
            errors.get("author").map(String::as_str),
            Some("must be a valid author id")
        );
    }

    #[test]
    fn test_publish_date_rules() {
        let errors = validate_book(&payload(json!({ "publishDate": 1965 })), Mode::Update);
        assert_eq!(
            errors.get("publishDate").map(String::as_str),
            Some("must be a string")
        );

        for bad in ["1965-6-1", "1965/06/01", "2021-02-30", "not-a-date", "196-506-01"] {
            let errors = validate_book(&payload(json!({ "publishDate": bad })), Mode::Update);
            assert_eq!(
                errors.get("publishDate").map(String::as_str),
                Some("must be a valid date in YYYY-MM-DD format"),
                "expected {bad:?} to be rejected"
            );
        }

        let errors = validate_book(&payload(json!({ "publishDate": "2024-02-29" })), Mode::Update);
        assert!(errors.is_empty());
    }

    #[test]
    fn test_page_count_must_be_positive_integer() {
        for bad in [json!(-5), json!(0), json!("412"), json!(4.5), json!(true)] {
            let errors = validate_book(&payload(json!({ "pageCount": bad })), Mode::Update);
            assert_eq!(
                errors.get("pageCount").map(String::as_str),
                Some("must be a positive integer")
            );
        }
        assert!(validate_book(&payload(json!({ "pageCount": 1 })), Mode::Update).is_empty());
    }

    #[test]
    fn test_description_may_be_empty_but_must_be_string() {
        assert!(validate_book(&payload(json!({ "description": "" })), Mode::Update).is_empty());
        let errors = validate_book(&payload(json!({ "description": [] })), Mode::Update);
        assert_eq!(
            errors.get("description").map(String::as_str),
            Some("must be a string")
        );
    }

    #[test]
    fn test_unknown_fields_are_ignored() {
        let mut data = valid_create();
        data.insert("coverImageBase64".to_string(), json!("!!not-base64!!"));
        data.insert("shelf".to_string(), json!(3));
        assert!(validate_book(&data, Mode::Create).is_empty());
    }

    #[test]
    fn test_parse_publish_date_strictness() {
        assert!(parse_publish_date("1965-06-01").is_some());
        assert!(parse_publish_date("1965-6-1").is_none());
        assert!(parse_publish_date("1965-06-01 ").is_none());
        assert!(parse_publish_date("1965-13-01").is_none());
        assert!(parse_publish_date("2023-02-29").is_none());
    }
}
