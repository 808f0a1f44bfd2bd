mod settings;

pub use settings::{AgentConfig, CacheConfig, EmbeddingConfig, LlmConfig, LoggingConfig, Settings};
