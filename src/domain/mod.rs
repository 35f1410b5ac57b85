pub mod completion;
pub mod db_config;
pub mod error;
pub mod llm_config;
pub mod policy;
pub mod prompt;
pub mod query_result;
pub mod schema;
