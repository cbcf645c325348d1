pub mod gemini_client;
pub mod store_client;

pub use gemini_client::{GeminiClient, GenerativeApi};
pub use store_client::{ResultsStore, StoreClient};
