//! Pulls a metadata record out of free-form model output.

use serde_json::Value;
use tracing::{debug, warn};

use crate::models::{
    MetadataRecord, Scalar, FALLBACK_DESCRIPTION, SOURCE_FALLBACK, SOURCE_SERVICE, UNKNOWN,
};

/// Parse the outermost `{...}` span of `raw_text` into a record.
///
/// Never fails: text without a usable span, or a span that does not parse,
/// yields [`fallback`]. Parsed records always get `source_label` and
/// `original_query` overwritten.
pub fn extract(raw_text: &str, original_query: &str) -> MetadataRecord {
    let Some(span) = json_span(raw_text) else {
        debug!(query = original_query, "model output has no JSON object");
        return fallback(original_query);
    };

    // Going through `Value` lets repeated keys resolve to the last one.
    let parsed =
        serde_json::from_str::<Value>(span).and_then(serde_json::from_value::<MetadataRecord>);
    match parsed {
        Ok(mut record) => {
            record.source_label = Some(SOURCE_SERVICE.to_string());
            record.original_query = Some(original_query.to_string());
            record
        }
        Err(err) => {
            warn!(query = original_query, "failed to parse model output: {err}");
            fallback(original_query)
        }
    }
}

/// The default record used whenever the service gives nothing usable.
pub fn fallback(original_query: &str) -> MetadataRecord {
    let unknown = || Some(UNKNOWN.to_string());
    MetadataRecord {
        title: unknown(),
        genre: unknown(),
        developer: unknown(),
        publisher: unknown(),
        release_year: Some(Scalar::unknown()),
        short_description: Some(FALLBACK_DESCRIPTION.to_string()),
        quality_score: Some(Scalar::unknown()),
        typical_completion_hours: Some(Scalar::unknown()),
        platform_list: Some(vec![UNKNOWN.to_string()]),
        trivia_note: unknown(),
        source_label: Some(SOURCE_FALLBACK.to_string()),
        original_query: Some(original_query.to_string()),
    }
}

/// First `{` through last `}` inclusive, if the last `}` comes after the first `{`.
fn json_span(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end <= start {
        return None;
    }
    Some(&text[start..=end])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_object_surrounded_by_noise() {
        let record = extract(r#"noise {"nome":"X","genero":"RPG"} trailing"#, "x query");
        assert_eq!(record.title.as_deref(), Some("X"));
        assert_eq!(record.genre.as_deref(), Some("RPG"));
        assert_eq!(record.source_label.as_deref(), Some(SOURCE_SERVICE));
        assert_eq!(record.original_query.as_deref(), Some("x query"));
        assert!(!record.is_fallback());
    }

    #[test]
    fn overwrites_provenance_fields_from_model() {
        let raw = r#"```json
{"nome": "Doom", "fonte": "made up", "consulta": "something else"}
```"#;
        let record = extract(raw, "doom");
        assert_eq!(record.source_label.as_deref(), Some(SOURCE_SERVICE));
        assert_eq!(record.original_query.as_deref(), Some("doom"));
    }

    #[test]
    fn plain_text_yields_default_record() {
        let record = extract("plain text, no braces", "q");
        assert_eq!(record, fallback("q"));
        assert_eq!(record.source_label.as_deref(), Some(SOURCE_FALLBACK));
        assert_eq!(record.platform_list, Some(vec![UNKNOWN.to_string()]));
        assert_eq!(record.short_description.as_deref(), Some(FALLBACK_DESCRIPTION));
        assert_eq!(record.original_query.as_deref(), Some("q"));
    }

    #[test]
    fn malformed_json_yields_default_record() {
        let record = extract(r#"{"nome": invalid json"#, "q");
        assert!(record.is_fallback());

        let record = extract(r#"{"nome": invalid json}"#, "q");
        assert!(record.is_fallback());
    }

    #[test]
    fn reversed_or_single_braces_yield_default_record() {
        assert!(extract("} before {", "q").is_fallback());
        assert!(extract("}{", "q").is_fallback());
        assert!(extract("only { open", "q").is_fallback());
        assert!(extract("only } close", "q").is_fallback());
        assert!(extract("", "q").is_fallback());
    }

    #[test]
    fn uses_outermost_span() {
        let raw = r#"a {"nome": "Outer", "plataformas": ["PC"]} b } c"#;
        // Last `}` is past the object, so the span is not valid JSON.
        assert!(extract(raw, "q").is_fallback());

        let raw = r#"{"nome": "Nested", "curiosidade": "uses {braces}"}"#;
        let record = extract(raw, "q");
        assert_eq!(record.trivia_note.as_deref(), Some("uses {braces}"));
    }

    #[test]
    fn repeated_keys_keep_the_last_value() {
        let record = extract(r#"{"nome":"A","genero":"RPG","nome":"B"}"#, "q");
        assert!(!record.is_fallback());
        assert_eq!(record.title.as_deref(), Some("B"));
        assert_eq!(record.genre.as_deref(), Some("RPG"));
    }

    #[test]
    fn empty_object_is_a_service_record() {
        let record = extract("{}", "q");
        assert_eq!(record.source_label.as_deref(), Some(SOURCE_SERVICE));
        assert_eq!(record.title, None);
    }

    #[test]
    fn fallback_is_deterministic() {
        assert_eq!(fallback("same"), fallback("same"));
        let record = fallback("Zelda");
        assert_eq!(record.title.as_deref(), Some(UNKNOWN));
        assert_eq!(record.display_title(), "Zelda");
    }
}
