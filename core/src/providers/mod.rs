pub mod anthropic;
pub mod factory;
pub mod mock;
pub mod openai;

pub use anthropic::AnthropicProvider;
pub use factory::create_provider;
pub use mock::{MockProvider, MockRequest};
pub use openai::OpenAIProvider;
