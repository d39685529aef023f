//! Presentation helpers shared by frontends.

use crate::models::{known, MetadataRecord, Scalar};

/// Suggestions per genre keyword. English and Portuguese keywords are both
/// listed because the model answers in either.
const RECOMMENDATIONS: &[(&[&str], [&str; 4])] = &[
    (
        &["rpg"],
        ["The Witcher 3", "Elden Ring", "Baldur's Gate 3", "Cyberpunk 2077"],
    ),
    (
        &["action", "ação"],
        ["God of War", "Doom Eternal", "Devil May Cry 5", "Hades"],
    ),
    (
        &["adventure", "aventura"],
        [
            "The Legend of Zelda",
            "Uncharted 4",
            "Red Dead Redemption 2",
            "Horizon Zero Dawn",
        ],
    ),
    (
        &["strategy", "estratégia"],
        ["Civilization VI", "XCOM 2", "StarCraft II", "Age of Empires IV"],
    ),
    (
        &["sport", "esporte"],
        ["FIFA 23", "NBA 2K24", "Rocket League", "Tony Hawk's Pro Skater 1+2"],
    ),
    (
        &["racing", "corrida"],
        ["Forza Horizon 5", "Gran Turismo 7", "Mario Kart 8", "F1 2023"],
    ),
];

/// Labelled facts worth showing for a record, skipping unknown values.
pub fn details(record: &MetadataRecord) -> Vec<(&'static str, String)> {
    let mut rows = Vec::new();
    let mut push_text = |label, value: Option<&str>| {
        if let Some(value) = known(value) {
            rows.push((label, value.to_string()));
        }
    };
    push_text("Developer", record.developer.as_deref());
    push_text("Publisher", record.publisher.as_deref());
    push_text("Genre", record.genre.as_deref());

    if let Some(year) = known_scalar(record.release_year.as_ref()) {
        rows.push(("Released", year.to_string()));
    }
    if let Some(score) = known_scalar(record.quality_score.as_ref()) {
        rows.push(("Metacritic", format_score(score)));
    }
    if let Some(hours) = known_scalar(record.typical_completion_hours.as_ref()) {
        rows.push(("Average time", format!("{hours} hours")));
    }
    let platforms = record.known_platforms();
    if !platforms.is_empty() {
        rows.push(("Platforms", platforms.join(", ")));
    }
    rows
}

/// One line of the comparison table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComparisonRow {
    /// Display title, at most 24 characters.
    pub title: String,
    /// Genre, at most 19 characters.
    pub genre: String,
    /// Release year.
    pub year: String,
    /// Score as `N/100`.
    pub score: String,
    /// Completion time with one decimal.
    pub hours: String,
}

/// Column headers matching [`ComparisonRow`].
pub const COMPARISON_HEADERS: [&str; 5] = ["Game", "Genre", "Year", "Metacritic", "Time (h)"];

/// Table rows comparing several records side by side.
pub fn comparison_rows(records: &[MetadataRecord]) -> Vec<ComparisonRow> {
    records
        .iter()
        .map(|record| ComparisonRow {
            title: truncate(&record.display_title(), 24),
            genre: truncate(known(record.genre.as_deref()).unwrap_or("N/A"), 19),
            year: truncate(&scalar_or_na(record.release_year.as_ref()), 7),
            score: known_scalar(record.quality_score.as_ref())
                .map(format_score)
                .unwrap_or_else(|| "N/A".to_string()),
            hours: known_scalar(record.typical_completion_hours.as_ref())
                .map(|hours| match hours.as_f64() {
                    Some(value) => format!("{value:.1}"),
                    None => hours.to_string(),
                })
                .unwrap_or_else(|| "N/A".to_string()),
        })
        .collect()
}

/// A short suggestion based on the record's genre, else its score.
pub fn recommendation(record: &MetadataRecord) -> String {
    let genre = record.genre.as_deref().unwrap_or_default().to_lowercase();
    for (keywords, games) in RECOMMENDATIONS {
        if keywords.iter().any(|keyword| genre.contains(keyword)) {
            return format!(
                "Based on the genre '{genre}', you might enjoy: {}",
                games[..3].join(", ")
            );
        }
    }

    match known_scalar(record.quality_score.as_ref()).and_then(Scalar::as_i64) {
        Some(score) if score >= 90 => "This is an outstanding game. Good taste!".to_string(),
        Some(score) if score >= 80 => "This game is very well reviewed.".to_string(),
        Some(score) if score >= 70 => "A solid, fun game.".to_string(),
        _ => "Keep exploring new games!".to_string(),
    }
}

fn known_scalar(value: Option<&Scalar>) -> Option<&Scalar> {
    value.filter(|scalar| !scalar.is_unknown())
}

fn scalar_or_na(value: Option<&Scalar>) -> String {
    known_scalar(value)
        .map(Scalar::to_string)
        .unwrap_or_else(|| "N/A".to_string())
}

fn format_score(score: &Scalar) -> String {
    match score.as_i64() {
        Some(value) => format!("{value}/100"),
        None => score.to_string(),
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract;

    fn witcher() -> MetadataRecord {
        extract::extract(
            r#"{
                "nome": "The Witcher 3: Wild Hunt - Complete Edition",
                "genero": "RPG de ação",
                "desenvolvedor": "CD Projekt Red",
                "publicador": "N/A",
                "ano_lancamento": 2015,
                "metacritic_score": 93,
                "tempo_medio_conclusao": 51.5,
                "plataformas": ["PC", "PlayStation 4"]
            }"#,
            "witcher 3",
        )
    }

    #[test]
    fn details_skip_unknown_values() {
        let rows = details(&witcher());
        assert_eq!(
            rows,
            vec![
                ("Developer", "CD Projekt Red".to_string()),
                ("Genre", "RPG de ação".to_string()),
                ("Released", "2015".to_string()),
                ("Metacritic", "93/100".to_string()),
                ("Average time", "51.5 hours".to_string()),
                ("Platforms", "PC, PlayStation 4".to_string()),
            ]
        );
        assert!(details(&extract::fallback("x")).is_empty());
    }

    #[test]
    fn comparison_rows_truncate_and_format() {
        let rows = comparison_rows(&[witcher(), extract::fallback("Unknown Game")]);
        assert_eq!(
            rows[0],
            ComparisonRow {
                title: "The Witcher 3: Wild Hunt".to_string(),
                genre: "RPG de ação".to_string(),
                year: "2015".to_string(),
                score: "93/100".to_string(),
                hours: "51.5".to_string(),
            }
        );
        assert_eq!(rows[1].title, "Unknown Game");
        assert_eq!(rows[1].score, "N/A");
        assert_eq!(rows[1].hours, "N/A");
    }

    #[test]
    fn recommendation_by_genre_then_score() -> anyhow::Result<()> {
        assert!(recommendation(&witcher()).contains("Elden Ring"));

        let mut record = extract::fallback("x");
        record.genre = Some("Puzzle".to_string());
        record.quality_score = Some(Scalar::from(91_i64));
        assert_eq!(recommendation(&record), "This is an outstanding game. Good taste!");
        record.quality_score = Some(Scalar::from("84"));
        assert_eq!(recommendation(&record), "This game is very well reviewed.");
        record.quality_score = Some(serde_json::from_str("93.5")?);
        assert_eq!(recommendation(&record), "This is an outstanding game. Good taste!");
        assert_eq!(
            details(&record),
            vec![
                ("Genre", "Puzzle".to_string()),
                ("Metacritic", "93/100".to_string()),
            ]
        );
        record.quality_score = Some(Scalar::from(40_i64));
        assert_eq!(recommendation(&record), "Keep exploring new games!");

        record.genre = Some("Corrida arcade".to_string());
        assert!(recommendation(&record).contains("Forza Horizon 5"));
        Ok(())
    }
}
