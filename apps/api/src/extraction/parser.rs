//! Output parser: turns a model's free-text answer into an `ExtractedResume`.
//!
//! `OutputParser` is the seam: the evaluator only ever sees `ExtractedResume`,
//! so the line convention below can be replaced without touching scoring.
//!
//! Default: `PositionalOutputParser`
//!   line 1 → candidate name
//!   line 2 → professional intro
//!   first bracketed line onward → skills
//!
//! Alternative: `JsonOutputParser` for a structured JSON answer.

use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::errors::AppError;
use crate::extraction::models::ExtractedResume;

/// Parsers never fail on well-typed input; short or malformed text yields defaults.
pub trait OutputParser: Send + Sync {
    fn parse(&self, raw: &str) -> ExtractedResume;

    /// Short identifier for logs.
    fn name(&self) -> &'static str;
}

/// Parses a dynamically typed payload. A non-string payload is an input error,
/// unlike an empty string which parses to an empty record.
pub fn parse_value(parser: &dyn OutputParser, payload: &Value) -> Result<ExtractedResume, AppError> {
    match payload {
        Value::String(raw) => Ok(parser.parse(raw)),
        other => Err(AppError::InvalidInput(format!(
            "raw_text must be a string, got {}",
            json_kind(other)
        ))),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Which answer convention to expect from the model.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParserKind {
    #[default]
    Positional,
    Json,
}

impl ParserKind {
    pub fn build(self, skill_mode: SkillListMode) -> Arc<dyn OutputParser> {
        match self {
            ParserKind::Positional => Arc::new(PositionalOutputParser::new(skill_mode)),
            ParserKind::Json => Arc::new(JsonOutputParser),
        }
    }
}

impl FromStr for ParserKind {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "positional" => Ok(ParserKind::Positional),
            "json" => Ok(ParserKind::Json),
            other => Err(AppError::Config(format!(
                "Unknown output parser '{other}' (expected 'positional' or 'json')"
            ))),
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Positional parser
// ────────────────────────────────────────────────────────────────────────────

/// How the bracketed skills list is split.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkillListMode {
    /// Keeps the leading `[` on the first token and turns `[]` into `[""]`.
    /// Existing consumers depend on this shape.
    #[default]
    Legacy,
    /// Strips the brackets and drops empty tokens.
    Strict,
}

impl FromStr for SkillListMode {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "legacy" => Ok(SkillListMode::Legacy),
            "strict" => Ok(SkillListMode::Strict),
            other => Err(AppError::Config(format!(
                "Unknown skill list mode '{other}' (expected 'legacy' or 'strict')"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PositionalOutputParser {
    pub skill_mode: SkillListMode,
}

impl PositionalOutputParser {
    pub fn new(skill_mode: SkillListMode) -> Self {
        Self { skill_mode }
    }
}

impl OutputParser for PositionalOutputParser {
    fn parse(&self, raw: &str) -> ExtractedResume {
        let lines: Vec<&str> = raw
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .collect();

        let candidate_name = lines.first().map(|s| s.to_string()).unwrap_or_default();
        let professional_intro = lines.get(1).map(|s| s.to_string()).unwrap_or_default();
        let skills = match lines.get(2..) {
            Some(rest) if !rest.is_empty() => parse_skill_lines(rest, self.skill_mode),
            _ => Vec::new(),
        };

        ExtractedResume {
            candidate_name,
            professional_intro,
            skills,
        }
    }

    fn name(&self) -> &'static str {
        "positional"
    }
}

/// Starts at the first line holding a `[` (or the first remaining line) and
/// treats everything from there on as one list.
fn parse_skill_lines(lines: &[&str], mode: SkillListMode) -> Vec<String> {
    let start = lines.iter().position(|l| l.contains('[')).unwrap_or(0);
    let text = lines[start..].join(" ");
    split_skill_list(&text, mode)
}

fn split_skill_list(text: &str, mode: SkillListMode) -> Vec<String> {
    let Some(open) = text.find('[') else {
        return split_tokens(text, mode);
    };
    // Unterminated lists run to the end of the text.
    let close = text[open..]
        .find(']')
        .map(|i| open + i)
        .unwrap_or(text.len());
    let inner = &text[open + 1..close];

    match mode {
        SkillListMode::Legacy => {
            if inner.trim().is_empty() {
                return vec![String::new()];
            }
            split_tokens(&text[open..close], mode)
        }
        SkillListMode::Strict => split_tokens(inner, mode),
    }
}

fn split_tokens(segment: &str, mode: SkillListMode) -> Vec<String> {
    let tokens = segment.split(',').map(|t| t.trim().to_string());
    match mode {
        SkillListMode::Legacy => tokens.collect(),
        SkillListMode::Strict => tokens.filter(|t| !t.is_empty()).collect(),
    }
}

// ────────────────────────────────────────────────────────────────────────────
// JSON parser
// ────────────────────────────────────────────────────────────────────────────

/// Reads `{"candidate_name", "professional_intro", "skills"}` from the answer.
/// Wrong-typed fields are dropped; unparseable answers produce an empty record.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonOutputParser;

impl OutputParser for JsonOutputParser {
    fn parse(&self, raw: &str) -> ExtractedResume {
        let value: Value = match serde_json::from_str(strip_json_fences(raw)) {
            Ok(v) => v,
            Err(e) => {
                warn!("Model answer is not valid JSON, using empty record: {e}");
                return ExtractedResume::default();
            }
        };

        let text_field = |key: &str| {
            value
                .get(key)
                .and_then(Value::as_str)
                .map(|s| s.trim().to_string())
                .unwrap_or_default()
        };

        let skills = value
            .get("skills")
            .and_then(Value::as_array)
            .map(|arr| {
                arr.iter()
                    .filter_map(Value::as_str)
                    .map(|s| s.trim().to_string())
                    .collect()
            })
            .unwrap_or_default();

        ExtractedResume {
            candidate_name: text_field("candidate_name"),
            professional_intro: text_field("professional_intro"),
            skills,
        }
    }

    fn name(&self) -> &'static str {
        "json"
    }
}

/// Strips ```json ... ``` or ``` ... ``` code fences from model output.
fn strip_json_fences(text: &str) -> &str {
    let text = text.trim();
    let Some(stripped) = text
        .strip_prefix("```json")
        .or_else(|| text.strip_prefix("```"))
    else {
        return text;
    };
    let stripped = stripped.trim_start();
    stripped
        .strip_suffix("```")
        .map(str::trim)
        .unwrap_or(stripped)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn legacy() -> PositionalOutputParser {
        PositionalOutputParser::default()
    }

    fn strict() -> PositionalOutputParser {
        PositionalOutputParser::new(SkillListMode::Strict)
    }

    #[test]
    fn test_parses_name_and_skill_count() {
        let mock_output = "
    Ivo Reali Camargo
    I am a seasoned IT professional...
    [Python, AWS, Docker, Kubernetes]
    ";
        let parsed = legacy().parse(mock_output);
        assert_eq!(parsed.candidate_name, "Ivo Reali Camargo");
        assert_eq!(parsed.skills.len(), 4);
    }

    #[test]
    fn test_complete_input_keeps_leading_bracket() {
        let input = "
    Ivo Reali Camargo
    I am a seasoned IT professional...
    [Python, Docker, Kubernetes]
    ";
        let expected = ExtractedResume {
            candidate_name: "Ivo Reali Camargo".to_string(),
            professional_intro: "I am a seasoned IT professional...".to_string(),
            skills: vec![
                "[Python".to_string(),
                "Docker".to_string(),
                "Kubernetes".to_string(),
            ],
        };
        assert_eq!(legacy().parse(input), expected);
    }

    #[test]
    fn test_empty_brackets_yield_one_empty_skill() {
        let input = "
    Ivo
    I am a seasoned IT professional...
    []
    ";
        let parsed = legacy().parse(input);
        assert_eq!(parsed.candidate_name, "Ivo");
        assert_eq!(parsed.professional_intro, "I am a seasoned IT professional...");
        assert_eq!(parsed.skills, vec![String::new()]);
    }

    #[test]
    fn test_short_input_defaults() {
        assert_eq!(legacy().parse(""), ExtractedResume::default());
        assert_eq!(legacy().parse("\n   \n\t\n"), ExtractedResume::default());

        let one_line = legacy().parse("  Jane Doe  ");
        assert_eq!(one_line.candidate_name, "Jane Doe");
        assert!(one_line.professional_intro.is_empty());
        assert!(one_line.skills.is_empty());

        let two_lines = legacy().parse("Jane Doe\nBackend engineer");
        assert_eq!(two_lines.professional_intro, "Backend engineer");
        assert!(two_lines.skills.is_empty());
    }

    #[test]
    fn test_unterminated_bracket_is_best_effort() {
        let parsed = legacy().parse("Jane\nIntro\n[Rust, Go, SQL");
        assert_eq!(parsed.skills, vec!["[Rust", "Go", "SQL"]);

        let parsed = strict().parse("Jane\nIntro\n[Rust, Go, SQL");
        assert_eq!(parsed.skills, vec!["Rust", "Go", "SQL"]);
    }

    #[test]
    fn test_skills_without_brackets() {
        let parsed = legacy().parse("Jane\nIntro\nRust, Go , SQL");
        assert_eq!(parsed.skills, vec!["Rust", "Go", "SQL"]);
    }

    #[test]
    fn test_skills_start_at_first_bracketed_line() {
        let input = "Jane\nIntro\nSkills follow:\n[Rust, Go,\nSQL] and nothing else";
        let parsed = legacy().parse(input);
        assert_eq!(parsed.skills, vec!["[Rust", "Go", "SQL"]);
    }

    #[test]
    fn test_text_after_closing_bracket_ignored() {
        let parsed = strict().parse("Jane\nIntro\n[Rust, Go] (2 skills)");
        assert_eq!(parsed.skills, vec!["Rust", "Go"]);
    }

    #[test]
    fn test_strict_mode_fixes_quirks() {
        let parsed = strict().parse("Ivo\nIntro\n[Python, Docker, Kubernetes]");
        assert_eq!(parsed.skills, vec!["Python", "Docker", "Kubernetes"]);

        let parsed = strict().parse("Ivo\nIntro\n[]");
        assert!(parsed.skills.is_empty());

        let parsed = strict().parse("Ivo\nIntro\n[Python, , AWS,]");
        assert_eq!(parsed.skills, vec!["Python", "AWS"]);
    }

    #[test]
    fn test_skill_list_mode_from_str() {
        assert_eq!("legacy".parse::<SkillListMode>().unwrap(), SkillListMode::Legacy);
        assert_eq!(" STRICT ".parse::<SkillListMode>().unwrap(), SkillListMode::Strict);
        assert!(matches!(
            "loose".parse::<SkillListMode>(),
            Err(AppError::Config(_))
        ));
    }

    #[test]
    fn test_parser_kind_builds_matching_parser() {
        assert_eq!("json".parse::<ParserKind>().unwrap(), ParserKind::Json);
        assert!("yaml".parse::<ParserKind>().is_err());

        let parser = ParserKind::Positional.build(SkillListMode::Strict);
        assert_eq!(parser.name(), "positional");
        assert_eq!(parser.parse("A\nB\n[x]").skills, vec!["x"]);
        assert_eq!(ParserKind::Json.build(SkillListMode::Legacy).name(), "json");
    }

    #[test]
    fn test_parse_value_accepts_string() {
        let payload = json!("Jane\nIntro\n[Rust]");
        let parsed = parse_value(&legacy(), &payload).unwrap();
        assert_eq!(parsed.candidate_name, "Jane");
    }

    #[test]
    fn test_parse_value_empty_string_is_not_an_error() {
        let parsed = parse_value(&legacy(), &json!("")).unwrap();
        assert_eq!(parsed, ExtractedResume::default());
    }

    #[test]
    fn test_parse_value_rejects_non_string() {
        for payload in [json!(null), json!(42), json!(["a"]), json!({"raw": "x"})] {
            let result = parse_value(&legacy(), &payload);
            assert!(matches!(result, Err(AppError::InvalidInput(_))), "{payload}");
        }
    }

    #[test]
    fn test_json_parser_reads_fields() {
        let answer = r#"```json
{"candidate_name": " John Hui ", "professional_intro": "Engineer.", "skills": ["Rust", 7, "Go"]}
```"#;
        let parsed = JsonOutputParser.parse(answer);
        assert_eq!(parsed.candidate_name, "John Hui");
        assert_eq!(parsed.professional_intro, "Engineer.");
        assert_eq!(parsed.skills, vec!["Rust", "Go"]);
    }

    #[test]
    fn test_json_parser_tolerates_garbage() {
        assert_eq!(JsonOutputParser.parse("not json at all"), ExtractedResume::default());
        assert_eq!(
            JsonOutputParser.parse(r#"{"candidate_name": 5, "skills": "Rust"}"#),
            ExtractedResume::default()
        );
    }

    #[test]
    fn test_strip_json_fences_with_json_tag() {
        let input = "```json\n{\"key\": \"value\"}\n```";
        assert_eq!(strip_json_fences(input), "{\"key\": \"value\"}");
    }

    #[test]
    fn test_strip_json_fences_without_tag() {
        let input = "```\n{\"key\": \"value\"}\n```";
        assert_eq!(strip_json_fences(input), "{\"key\": \"value\"}");
    }

    #[test]
    fn test_strip_json_fences_no_fences() {
        let input = "{\"key\": \"value\"}";
        assert_eq!(strip_json_fences(input), "{\"key\": \"value\"}");
    }
}
