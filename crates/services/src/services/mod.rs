pub mod auto_post;
pub mod cache_budget;
pub mod config;
pub mod generation;
pub mod preview_store;
