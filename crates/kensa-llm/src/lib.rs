pub mod factory;
pub mod http;
pub mod ollama;
pub mod openai;

pub use factory::create_chat_model;
pub use ollama::OllamaChatModel;
pub use openai::OpenAIChatModel;
