pub mod error;
pub mod gemini;
pub mod traits;
pub mod util;

pub use error::AiError;
pub use gemini::{Gemini, GeminiPromptBuilder, UploadedFile};
pub use traits::{Agent, MediaRef, PromptBuilder};
pub use util::strip_code_blocks;
