//! Concrete provider backends

pub mod anthropic;
pub mod local;
pub mod openai;

pub use anthropic::AnthropicProvider;
pub use local::LocalProvider;
pub use openai::OpenAiProvider;
