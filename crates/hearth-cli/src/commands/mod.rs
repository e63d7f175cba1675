pub mod common;
pub mod config;
pub mod export;
pub mod member;
pub mod status;
pub mod sync;
pub mod task;
