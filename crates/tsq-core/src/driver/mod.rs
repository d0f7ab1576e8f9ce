pub mod cache;
pub mod config;
pub mod filesystem;
pub mod pipeline;
