//! Data models: configuration and workspace items.

pub mod config;
pub mod item;
