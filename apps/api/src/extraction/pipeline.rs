//! Resume pipeline: document bytes → text → model answer → record → score.
//!
//! Text extraction and the model step are collaborators behind traits; the
//! pipeline only wires them to the parser and the evaluator.
//!
//! # spawn_blocking pattern
//! PDF decoding is CPU-bound and can panic on malformed input, so it runs on the
//! blocking pool and panics are caught and reported as extraction errors.

use std::sync::Arc;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde_json::Value;
use tracing::{debug, info};

use crate::errors::AppError;
use crate::extraction::confidence::{breakdown, calculate_value, ScoringPolicy};
use crate::extraction::models::ScoredResume;
use crate::extraction::parser::{parse_value, OutputParser};

// ────────────────────────────────────────────────────────────────────────────
// Collaborators
// ────────────────────────────────────────────────────────────────────────────

/// Turns an uploaded document into plain text.
pub trait TextExtractor: Send + Sync {
    fn extract(&self, content: &[u8]) -> Result<String, AppError>;
}

/// Produces the raw positional answer for a resume's text.
#[async_trait]
pub trait ResumeModel: Send + Sync {
    async fn answer(&self, resume_text: &str) -> Result<String, AppError>;
}

/// Extracts text from PDF bytes with `pdf-extract`.
#[derive(Debug, Clone, Copy, Default)]
pub struct PdfTextExtractor;

/// PDF headers may be preceded by junk, but must start within the first 1 KiB.
const PDF_HEADER_WINDOW: usize = 1024;

impl TextExtractor for PdfTextExtractor {
    fn extract(&self, content: &[u8]) -> Result<String, AppError> {
        let window = &content[..content.len().min(PDF_HEADER_WINDOW)];
        if !window.windows(5).any(|w| w == b"%PDF-") {
            return Err(AppError::Extraction(
                "No PDF header found - is this really a PDF?".to_string(),
            ));
        }

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            pdf_extract::extract_text_from_mem(content)
        }));

        match result {
            Ok(Ok(text)) => Ok(text),
            Ok(Err(e)) => Err(AppError::Extraction(format!("PDF extraction failed: {e}"))),
            Err(_) => Err(AppError::Extraction(
                "PDF extraction panicked (malformed PDF)".to_string(),
            )),
        }
    }
}

/// Decodes bytes as UTF-8, replacing invalid sequences.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainTextExtractor;

impl TextExtractor for PlainTextExtractor {
    fn extract(&self, content: &[u8]) -> Result<String, AppError> {
        Ok(String::from_utf8_lossy(content).into_owned())
    }
}

/// Hands the document text back unchanged. Stands in for a real model when the
/// upstream text already follows the positional convention.
#[derive(Debug, Clone, Copy, Default)]
pub struct VerbatimModel;

#[async_trait]
impl ResumeModel for VerbatimModel {
    async fn answer(&self, resume_text: &str) -> Result<String, AppError> {
        Ok(resume_text.to_string())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Pipeline
// ────────────────────────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct ResumePipeline {
    extractor: Arc<dyn TextExtractor>,
    model: Arc<dyn ResumeModel>,
    parser: Arc<dyn OutputParser>,
    policy: ScoringPolicy,
}

impl ResumePipeline {
    pub fn new(
        extractor: Arc<dyn TextExtractor>,
        model: Arc<dyn ResumeModel>,
        parser: Arc<dyn OutputParser>,
        policy: ScoringPolicy,
    ) -> Self {
        Self {
            extractor,
            model,
            parser,
            policy,
        }
    }

    pub fn policy(&self) -> &ScoringPolicy {
        &self.policy
    }

    /// Runs the whole flow over an uploaded document.
    pub async fn process(&self, content: Vec<u8>) -> Result<ScoredResume, AppError> {
        info!("Processing document ({} bytes)", content.len());

        let extractor = Arc::clone(&self.extractor);
        let resume_text = tokio::task::spawn_blocking(move || extractor.extract(&content))
            .await
            .map_err(|e| {
                AppError::Internal(anyhow::anyhow!("spawn_blocking failed in extraction: {e}"))
            })??;
        debug!("Extracted {} chars of resume text", resume_text.chars().count());

        let answer = self.model.answer(&resume_text).await?;
        debug!("Model answer: {} chars", answer.chars().count());

        Ok(self.score_answer(&answer))
    }

    /// Parses and scores a model answer directly.
    pub fn score_answer(&self, raw: &str) -> ScoredResume {
        let extraction = self.parser.parse(raw);
        let parts = breakdown(&extraction, &self.policy);
        info!(
            "Scored extraction via {} parser: confidence={} (name={}, intro={}, skills={}; {} skills)",
            self.parser.name(),
            parts.total,
            parts.name,
            parts.intro,
            parts.skills,
            extraction.skills.len()
        );
        extraction.score(&self.policy)
    }

    /// Handles a request body. `{"file": "<base64 document>"}` runs the whole
    /// flow; `{"raw_text": "..."}` scores a model answer directly.
    pub async fn process_request(&self, payload: &Value) -> Result<ScoredResume, AppError> {
        match (payload.get("file"), payload.get("raw_text")) {
            (Some(file), _) => {
                let content = decode_upload(file)?;
                self.process(content).await
            }
            (None, Some(_)) => self.score_payload(payload),
            (None, None) => Err(AppError::InvalidInput(
                "request must carry 'file' or 'raw_text'".to_string(),
            )),
        }
    }

    /// Scores a request body of the form `{"raw_text": "..."}`.
    pub fn score_payload(&self, payload: &Value) -> Result<ScoredResume, AppError> {
        let raw_text = payload.get("raw_text").unwrap_or(&Value::Null);
        let extraction = parse_value(self.parser.as_ref(), raw_text)?;
        Ok(extraction.score(&self.policy))
    }

    /// Scores an already extracted record of any shape and appends `confidence`
    /// to it. Only a non-object record is rejected.
    pub fn score_record(&self, mut record: Value) -> Result<Value, AppError> {
        let confidence = calculate_value(&record, &self.policy);
        let Some(fields) = record.as_object_mut() else {
            return Err(AppError::InvalidInput(
                "record must be a JSON object".to_string(),
            ));
        };
        fields.insert("confidence".to_string(), Value::from(confidence));
        info!("Scored record: confidence={confidence}");
        Ok(record)
    }
}

fn decode_upload(file: &Value) -> Result<Vec<u8>, AppError> {
    let encoded = file.as_str().ok_or_else(|| {
        AppError::InvalidInput("file must be a base64-encoded string".to_string())
    })?;
    STANDARD
        .decode(encoded.trim())
        .map_err(|e| AppError::InvalidInput(format!("file is not valid base64: {e}")))
}
