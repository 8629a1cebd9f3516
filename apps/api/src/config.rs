use std::path::PathBuf;

use crate::errors::AppError;
use crate::extraction::confidence::ScoringPolicy;
use crate::extraction::parser::{ParserKind, SkillListMode};

/// Application configuration loaded from environment variables.
/// Every setting has a default; invalid values fail at startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub rust_log: String,
    pub skill_list_mode: SkillListMode,
    pub output_parser: ParserKind,
    pub scoring_policy_path: Option<PathBuf>,
}

impl Config {
    pub fn from_env() -> Result<Self, AppError> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let skill_list_mode = match lookup("SKILL_LIST_MODE") {
            Some(v) => v.parse::<SkillListMode>()?,
            None => SkillListMode::default(),
        };
        let output_parser = match lookup("OUTPUT_PARSER") {
            Some(v) => v.parse::<ParserKind>()?,
            None => ParserKind::default(),
        };

        Ok(Config {
            rust_log: lookup("RUST_LOG").unwrap_or_else(|| "info".to_string()),
            skill_list_mode,
            output_parser,
            scoring_policy_path: lookup("SCORING_POLICY_PATH")
                .filter(|p| !p.trim().is_empty())
                .map(PathBuf::from),
        })
    }

    /// The configured scoring policy, or the built-in table when none is set.
    pub fn scoring_policy(&self) -> Result<ScoringPolicy, AppError> {
        match &self.scoring_policy_path {
            Some(path) => ScoringPolicy::load(path),
            None => Ok(ScoringPolicy::default()),
        }
    }
}
