pub mod access_token_repo;
pub mod error;
pub mod memory_token_store;
pub mod token_store;
pub mod user_directory;
pub mod user_repo;
