use serde::{Deserialize, Serialize};

use crate::extraction::confidence::{calculate, ScoringPolicy};

/// Fields pulled out of a model answer. Carries no confidence until scored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractedResume {
    #[serde(default)]
    pub candidate_name: String,
    #[serde(default)]
    pub professional_intro: String,
    #[serde(default)]
    pub skills: Vec<String>,
}

/// The artifact handed back to callers. `confidence` is always present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredResume {
    #[serde(flatten)]
    pub extraction: ExtractedResume,
    pub confidence: f64,
}

impl ExtractedResume {
    /// Attaches the confidence score, consuming the partial record.
    pub fn score(self, policy: &ScoringPolicy) -> ScoredResume {
        let confidence = calculate(&self, policy);
        ScoredResume {
            extraction: self,
            confidence,
        }
    }
}
