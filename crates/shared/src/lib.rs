pub mod config;
pub(crate) mod config_env;
pub mod dispatch;
pub mod findings;
pub mod generate;
pub mod history;
pub mod models;
pub mod pipeline;
pub mod prompt;
pub mod redaction;
pub mod retrieval;
