// LLM module

pub mod analyzer;
pub mod client;
pub mod fallback;
pub mod prompts;

pub use analyzer::ComplaintAnalyzer;
pub use client::{GeminiClient, LlmError, TextGenerator};
