// Anthropic Claude Provider
//
// ContentGenerator implementation for Anthropic's Messages API.

mod generator;

pub use generator::{AnthropicGenerator, ANTHROPIC_VERSION, DEFAULT_API_URL, DEFAULT_MODEL};

#[cfg(test)]
mod tests;
