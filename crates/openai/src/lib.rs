// OpenAI Provider
//
// ContentGenerator implementation for OpenAI's chat completions API.
// Also works with OpenAI-compatible endpoints through `with_base_url`.

mod generator;
pub mod types;

pub use generator::{OpenAiGenerator, DEFAULT_BASE_URL, DEFAULT_MODEL};
