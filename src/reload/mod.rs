//! Reload Module
//!
//! Provides WebSocket-based live reload for development.
//!
//! # Modules
//!
//! - `message` - Hot reload message types (reload, css, error)
//! - `server` - WebSocket hub for client connections

pub mod message;
pub mod server;

pub use server::ReloadHub;
