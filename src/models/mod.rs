pub mod gemini;
pub mod insight;

pub use gemini::{
    Candidate, Content, FileState, FinishReason, GenerateContentRequest, GenerateContentResponse,
    GenerationConfig, Part, RemoteFile, SafetyRating, SafetySetting,
};
pub use insight::{GenerationOutcome, InsightOutcome};
