pub mod characters;
pub mod config;
pub mod http;
pub mod model;
pub mod models_catalog;
pub mod prompt;
pub mod types;
