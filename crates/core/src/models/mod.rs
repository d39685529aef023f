//! Shared domain models.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Number, Value};

/// Placeholder written into every metadata field the service could not fill.
pub const UNKNOWN: &str = "unknown";
/// Source label stamped on records parsed from service output.
pub const SOURCE_SERVICE: &str = "external-ai-service";
/// Source label stamped on default records.
pub const SOURCE_FALLBACK: &str = "system-fallback (service unavailable)";
/// Description used by default records.
pub const FALLBACK_DESCRIPTION: &str = "information currently unavailable";

/// A value the model may report either as a number or as free text
/// (e.g. `2015` vs `"unknown"`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    /// JSON number, kept exactly as received.
    Number(Number),
    /// Anything textual.
    Text(String),
}

impl Scalar {
    /// Shorthand for the `"unknown"` sentinel.
    pub fn unknown() -> Self {
        Scalar::Text(UNKNOWN.to_string())
    }

    /// Whether the value carries no information.
    pub fn is_unknown(&self) -> bool {
        match self {
            Scalar::Number(_) => false,
            Scalar::Text(text) => is_placeholder(text),
        }
    }

    /// Numeric view of the value, parsing text like `"93"` when possible.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Scalar::Number(number) => number.as_f64(),
            Scalar::Text(text) => text.trim().parse().ok(),
        }
    }

    /// Integral view of the value, truncating fractions: `93.5` and
    /// `"93.5"` both give `93`.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Scalar::Number(number) => number.as_i64().or_else(|| truncate(number.as_f64()?)),
            Scalar::Text(text) => {
                let text = text.trim();
                text.parse().ok().or_else(|| truncate(text.parse().ok()?))
            }
        }
    }

    fn from_json(value: Value) -> Option<Self> {
        match value {
            Value::Null => None,
            Value::Number(number) => Some(Scalar::Number(number)),
            Value::String(text) => Some(Scalar::Text(text)),
            Value::Bool(flag) => Some(Scalar::Text(flag.to_string())),
            Value::Array(_) | Value::Object(_) => None,
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Number(number) => write!(f, "{number}"),
            Scalar::Text(text) => f.write_str(text),
        }
    }
}

impl From<i64> for Scalar {
    fn from(value: i64) -> Self {
        Scalar::Number(value.into())
    }
}

impl From<&str> for Scalar {
    fn from(value: &str) -> Self {
        Scalar::Text(value.to_string())
    }
}

/// Metadata about one queried game.
///
/// Field names on disk are the ones existing cache files use, so the
/// serde renames must stay as they are.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetadataRecord {
    /// Game title as reported by the service.
    #[serde(
        rename = "nome",
        default,
        deserialize_with = "lenient_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub title: Option<String>,
    /// Main genre.
    #[serde(
        rename = "genero",
        default,
        deserialize_with = "lenient_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub genre: Option<String>,
    /// Lead developer.
    #[serde(
        rename = "desenvolvedor",
        default,
        deserialize_with = "lenient_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub developer: Option<String>,
    /// Publisher.
    #[serde(
        rename = "publicador",
        default,
        deserialize_with = "lenient_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub publisher: Option<String>,
    /// Release year.
    #[serde(
        rename = "ano_lancamento",
        default,
        deserialize_with = "lenient_scalar",
        skip_serializing_if = "Option::is_none"
    )]
    pub release_year: Option<Scalar>,
    /// Short description.
    #[serde(
        rename = "descricao",
        default,
        deserialize_with = "lenient_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub short_description: Option<String>,
    /// Review score on a 0-100 scale.
    #[serde(
        rename = "metacritic_score",
        default,
        deserialize_with = "lenient_scalar",
        skip_serializing_if = "Option::is_none"
    )]
    pub quality_score: Option<Scalar>,
    /// Typical completion time in hours.
    #[serde(
        rename = "tempo_medio_conclusao",
        default,
        deserialize_with = "lenient_scalar",
        skip_serializing_if = "Option::is_none"
    )]
    pub typical_completion_hours: Option<Scalar>,
    /// Platforms the game is available on, in the order reported.
    #[serde(
        rename = "plataformas",
        default,
        deserialize_with = "lenient_list",
        skip_serializing_if = "Option::is_none"
    )]
    pub platform_list: Option<Vec<String>>,
    /// A piece of trivia.
    #[serde(
        rename = "curiosidade",
        default,
        deserialize_with = "lenient_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub trivia_note: Option<String>,
    /// Where the record came from.
    #[serde(
        rename = "fonte",
        default,
        deserialize_with = "lenient_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub source_label: Option<String>,
    /// The subject name exactly as the user submitted it.
    #[serde(
        rename = "consulta",
        default,
        deserialize_with = "lenient_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub original_query: Option<String>,
}

impl MetadataRecord {
    /// True when the record was produced without usable service output.
    pub fn is_fallback(&self) -> bool {
        self.source_label.as_deref() == Some(SOURCE_FALLBACK)
    }

    /// Title for headings: the reported title, else the original query.
    pub fn display_title(&self) -> String {
        known(self.title.as_deref())
            .or_else(|| self.original_query.as_deref())
            .unwrap_or("Unknown")
            .to_string()
    }

    /// Platforms with placeholder entries removed.
    pub fn known_platforms(&self) -> Vec<&str> {
        self.platform_list
            .iter()
            .flatten()
            .map(String::as_str)
            .filter(|platform| !is_placeholder(platform))
            .collect()
    }
}

fn truncate(value: f64) -> Option<i64> {
    value.is_finite().then(|| value.trunc() as i64)
}

/// Whether a text value is empty or one of the placeholders the model or the
/// default record use for missing data.
pub fn is_placeholder(text: &str) -> bool {
    let text = text.trim();
    text.is_empty() || text.eq_ignore_ascii_case(UNKNOWN) || text.eq_ignore_ascii_case("n/a")
}

/// Filters a text field down to something worth displaying.
pub fn known(value: Option<&str>) -> Option<&str> {
    value.filter(|text| !is_placeholder(text))
}

fn lenient_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(value_to_text(value))
}

fn lenient_scalar<'de, D>(deserializer: D) -> Result<Option<Scalar>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(Scalar::from_json(value))
}

fn lenient_list<'de, D>(deserializer: D) -> Result<Option<Vec<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Array(items) => Some(items.into_iter().filter_map(value_to_text).collect()),
        Value::String(text) => Some(vec![text]),
        _ => None,
    })
}

fn value_to_text(value: Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(text) => Some(text),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        Value::Array(_) | Value::Object(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn deserializes_persisted_keys() -> anyhow::Result<()> {
        let record: MetadataRecord = serde_json::from_value(json!({
            "nome": "Hades",
            "genero": "Roguelike",
            "ano_lancamento": 2020,
            "metacritic_score": 93,
            "tempo_medio_conclusao": 22.5,
            "plataformas": ["PC", "Switch"],
            "fonte": "external-ai-service",
            "consulta": "hades"
        }))?;

        assert_eq!(record.title.as_deref(), Some("Hades"));
        assert_eq!(record.genre.as_deref(), Some("Roguelike"));
        assert_eq!(record.release_year, Some(Scalar::from(2020_i64)));
        assert_eq!(record.quality_score.as_ref().and_then(Scalar::as_i64), Some(93));
        assert_eq!(
            record.typical_completion_hours.as_ref().and_then(Scalar::as_f64),
            Some(22.5)
        );
        assert_eq!(record.known_platforms(), vec!["PC", "Switch"]);
        assert_eq!(record.developer, None);
        Ok(())
    }

    #[test]
    fn tolerates_loosely_typed_fields() -> anyhow::Result<()> {
        let record: MetadataRecord = serde_json::from_value(json!({
            "nome": 1942,
            "genero": null,
            "metacritic_score": "N/A",
            "plataformas": "PC",
            "curiosidade": {"nested": true},
            "extra_key": "ignored"
        }))?;

        assert_eq!(record.title.as_deref(), Some("1942"));
        assert_eq!(record.genre, None);
        assert!(record.quality_score.as_ref().map(Scalar::is_unknown).unwrap_or(false));
        assert_eq!(record.platform_list, Some(vec!["PC".to_string()]));
        assert_eq!(record.trivia_note, None);
        Ok(())
    }

    #[test]
    fn serializes_in_file_order_and_skips_absent_fields() -> anyhow::Result<()> {
        let record = MetadataRecord {
            title: Some("Celeste".to_string()),
            typical_completion_hours: Some(Scalar::Number(Number::from_f64(8.5).unwrap())),
            source_label: Some(SOURCE_SERVICE.to_string()),
            original_query: Some("celeste".to_string()),
            ..MetadataRecord::default()
        };

        let text = serde_json::to_string(&record)?;
        assert_eq!(
            text,
            r#"{"nome":"Celeste","tempo_medio_conclusao":8.5,"fonte":"external-ai-service","consulta":"celeste"}"#
        );
        Ok(())
    }

    #[test]
    fn integral_view_truncates() -> anyhow::Result<()> {
        let half: Scalar = serde_json::from_value(json!(93.5))?;
        assert_eq!(half.as_i64(), Some(93));
        assert_eq!(Scalar::from("93.5").as_i64(), Some(93));
        assert_eq!(Scalar::from(" 88 ").as_i64(), Some(88));
        assert_eq!(Scalar::from(UNKNOWN).as_i64(), None);
        Ok(())
    }

    #[test]
    fn display_title_falls_back_to_query() {
        let record = MetadataRecord {
            title: Some(UNKNOWN.to_string()),
            original_query: Some("Outer Wilds".to_string()),
            ..MetadataRecord::default()
        };
        assert_eq!(record.display_title(), "Outer Wilds");
        assert!(is_placeholder(" N/A "));
        assert!(!is_placeholder("PC"));
    }
}
