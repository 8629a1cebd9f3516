//! Confidence evaluator: heuristic completeness score for an extraction record.
//!
//! Three independent contributions (name, intro, skill count) are summed,
//! clamped to 1.0 and rounded to two decimals. The point scheme lives in
//! `ScoringPolicy` so it can be audited and tuned without touching parsing.
//!
//! The evaluator is total: missing or wrong-typed fields contribute 0.0.

use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::AppError;
use crate::extraction::models::ExtractedResume;

/// One row of the skill table: counts in `min_count..=max_count` earn `points`.
/// `max_count = None` means unbounded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillTier {
    pub min_count: usize,
    pub max_count: Option<usize>,
    pub points: f64,
}

impl SkillTier {
    fn contains(&self, count: usize) -> bool {
        count >= self.min_count && self.max_count.is_none_or(|max| count <= max)
    }

    fn overlaps(&self, other: &SkillTier) -> bool {
        let self_max = self.max_count.unwrap_or(usize::MAX);
        let other_max = other.max_count.unwrap_or(usize::MAX);
        self.min_count <= other_max && other.min_count <= self_max
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringPolicy {
    /// Awarded when the trimmed name is longer than `name_min_chars_exclusive`.
    pub name_points: f64,
    pub name_min_chars_exclusive: usize,
    /// Awarded when the trimmed intro has at least `intro_min_chars`.
    pub intro_points: f64,
    pub intro_min_chars: usize,
    /// Checked in order; the first matching tier wins.
    pub skill_tiers: Vec<SkillTier>,
}

impl Default for ScoringPolicy {
    fn default() -> Self {
        Self {
            name_points: 0.33,
            name_min_chars_exclusive: 3,
            intro_points: 0.33,
            intro_min_chars: 50,
            skill_tiers: vec![
                SkillTier {
                    min_count: 7,
                    max_count: None,
                    points: 0.34,
                },
                SkillTier {
                    min_count: 4,
                    max_count: Some(6),
                    points: 0.30,
                },
                SkillTier {
                    min_count: 1,
                    max_count: Some(3),
                    points: 0.22,
                },
            ],
        }
    }
}

impl ScoringPolicy {
    /// Reads a policy from a JSON file and validates it.
    pub fn load(path: &Path) -> Result<Self, AppError> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!(
                "Cannot read scoring policy '{}': {e}",
                path.display()
            ))
        })?;
        let policy: ScoringPolicy = serde_json::from_str(&raw).map_err(|e| {
            AppError::Config(format!(
                "Invalid scoring policy '{}': {e}",
                path.display()
            ))
        })?;
        policy.validate()?;
        Ok(policy)
    }

    pub fn validate(&self) -> Result<(), AppError> {
        check_points("name_points", self.name_points)?;
        check_points("intro_points", self.intro_points)?;

        for (i, tier) in self.skill_tiers.iter().enumerate() {
            check_points(&format!("skill_tiers[{i}].points"), tier.points)?;
            if let Some(max) = tier.max_count {
                if max < tier.min_count {
                    return Err(AppError::Config(format!(
                        "skill_tiers[{i}]: max_count {max} is below min_count {}",
                        tier.min_count
                    )));
                }
            }
            for (j, other) in self.skill_tiers.iter().enumerate().skip(i + 1) {
                if tier.overlaps(other) {
                    return Err(AppError::Config(format!(
                        "skill_tiers[{i}] and skill_tiers[{j}] overlap"
                    )));
                }
            }
        }
        Ok(())
    }

    fn skill_points(&self, count: usize) -> f64 {
        self.skill_tiers
            .iter()
            .find(|t| t.contains(count))
            .map(|t| t.points)
            .unwrap_or(0.0)
    }
}

fn check_points(field: &str, points: f64) -> Result<(), AppError> {
    if points.is_finite() && (0.0..=1.0).contains(&points) {
        Ok(())
    } else {
        Err(AppError::Config(format!(
            "{field} must be within [0, 1], got {points}"
        )))
    }
}

/// Per-field contributions and the final score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceBreakdown {
    pub name: f64,
    pub intro: f64,
    pub skills: f64,
    pub total: f64,
}

pub fn calculate(record: &ExtractedResume, policy: &ScoringPolicy) -> f64 {
    breakdown(record, policy).total
}

/// Scores an arbitrary JSON payload. Never fails: absent keys, wrong types and
/// non-object payloads simply contribute nothing.
pub fn calculate_value(output: &Value, policy: &ScoringPolicy) -> f64 {
    breakdown_value(output, policy).total
}

pub fn breakdown(record: &ExtractedResume, policy: &ScoringPolicy) -> ConfidenceBreakdown {
    compute(
        Some(&record.candidate_name),
        Some(&record.professional_intro),
        Some(record.skills.len()),
        policy,
    )
}

pub fn breakdown_value(output: &Value, policy: &ScoringPolicy) -> ConfidenceBreakdown {
    compute(
        output.get("candidate_name").and_then(Value::as_str),
        output.get("professional_intro").and_then(Value::as_str),
        output
            .get("skills")
            .and_then(Value::as_array)
            .map(|skills| skills.len()),
        policy,
    )
}

fn compute(
    name: Option<&str>,
    intro: Option<&str>,
    skill_count: Option<usize>,
    policy: &ScoringPolicy,
) -> ConfidenceBreakdown {
    let name = match name {
        Some(n) if char_len(n) > policy.name_min_chars_exclusive => policy.name_points,
        _ => 0.0,
    };
    let intro = match intro {
        Some(i) if char_len(i) >= policy.intro_min_chars => policy.intro_points,
        _ => 0.0,
    };
    let skills = skill_count
        .map(|count| policy.skill_points(count))
        .unwrap_or(0.0);

    let total = round2((name + intro + skills).clamp(0.0, 1.0));

    ConfidenceBreakdown {
        name,
        intro,
        skills,
        total,
    }
}

fn char_len(text: &str) -> usize {
    text.trim().chars().count()
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
