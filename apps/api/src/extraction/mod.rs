// Resume extraction: output parsing, confidence scoring, and the pipeline that
// connects them to text extraction and the model step.
// The parser and evaluator are pure; only the pipeline touches collaborators.

pub mod confidence;
pub mod models;
pub mod parser;
pub mod pipeline;
