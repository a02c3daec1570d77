pub mod gemini;
pub mod media;

pub use gemini::{GeminiClient, GeminiSettings};
pub use media::ImagePayload;
