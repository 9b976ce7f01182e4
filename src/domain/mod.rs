pub mod error;
pub mod llm_config;
pub mod schema;
pub mod selection;
pub mod workspace;

// Uploaded files and parsed tables
pub mod tabular;
