// Tuiter - social engagement backend

// HTTP routers and handlers
pub mod api;

// Dependency wiring shared by handlers
pub mod app_state;

// Core types and primitives
pub mod core;

// Database, id generation and viewer context
pub mod infrastructure;

// Relationship store, counters, toggles and content CRUD
pub mod services;

// Common utilities
pub mod config;
pub mod error;

// Re-exports for convenience
pub use error::{AppError, AppResult};
