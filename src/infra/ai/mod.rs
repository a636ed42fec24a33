pub mod chat_completion_client;

pub use chat_completion_client::{
    ChatCompletionClassifier, ClassifierOptions, DEFAULT_ENDPOINT, DEFAULT_MAX_TOKENS,
    DEFAULT_MODEL,
};
