//! Shortener - URL shortener storage core
//!
//! This library provides the storage layer of a URL shortener service:
//! a conflict-detecting link registry with interchangeable backends,
//! batched soft deletion and sealed anonymous sessions.
//!
//! # Architecture
//! - `storage`: Storage facade, in-memory and SeaORM backends
//! - `auth`: Anonymous session tokens
//! - `services`: Shortener business layer
//! - `config`: Configuration management
//! - `system`: Logging and shutdown handling

pub mod auth;
pub mod config;
pub mod errors;
pub mod services;
pub mod storage;
pub mod system;
