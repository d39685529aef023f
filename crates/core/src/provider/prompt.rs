use crate::models::UNKNOWN;

/// Prompt used by [`super::TextGenerator::probe`].
pub const PROBE_PROMPT: &str = "Reply only with the word 'OK'";

/// Build the instruction asking the model for one game's metadata.
///
/// The requested keys are the ones persisted in the cache file, so the
/// model's object can be stored without renaming.
pub fn game_prompt(game_name: &str, platform: Option<&str>) -> String {
    let platform_info = platform
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(|value| format!(" on the {value} platform"))
        .unwrap_or_default();

    format!(
        r#"Please provide information about the game "{game_name}"{platform_info}.

Answer ONLY with a valid JSON object containing the following keys:
- "nome": game title
- "genero": main genre
- "desenvolvedor": lead developer
- "publicador": publisher
- "ano_lancamento": release year (year only)
- "descricao": short description (at most 200 characters)
- "metacritic_score": Metacritic score (0-100) or "{unknown}"
- "tempo_medio_conclusao": average completion time in hours
- "plataformas": list of platforms the game is available on
- "curiosidade": an interesting piece of trivia about the game

IMPORTANT:
1. If there is not enough information, use "{unknown}" for unknown fields
2. Format "tempo_medio_conclusao" as a number (e.g. 25.5)
3. Return "plataformas" as a list of strings

Example answer:
{{
    "nome": "The Witcher 3: Wild Hunt",
    "genero": "Action RPG",
    "desenvolvedor": "CD Projekt Red",
    "publicador": "CD Projekt",
    "ano_lancamento": 2015,
    "descricao": "Open-world RPG set in a dark fantasy universe.",
    "metacritic_score": 93,
    "tempo_medio_conclusao": 51.5,
    "plataformas": ["PC", "PlayStation 4", "Xbox One", "Nintendo Switch"],
    "curiosidade": "The game was planned with 3 endings but shipped with 36."
}}
"#,
        unknown = UNKNOWN,
    )
}
