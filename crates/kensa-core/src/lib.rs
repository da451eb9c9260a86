pub mod config;
pub mod error;
pub mod message;
pub mod model;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::config::{Provider, Settings};
    pub use crate::error::{
        ConfigError, DatasetError, EvalError, KensaError, ModelError, Result,
    };
    pub use crate::message::{AIContent, Message, UsageMetadata};
    pub use crate::model::{CallOptions, ChatModel, ChatResult};
}
