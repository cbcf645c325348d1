pub mod insight_service;
pub mod transcribe_service;

pub use insight_service::InsightService;
pub use transcribe_service::TranscribeService;
