// Public API for the console binary and for embedding sessions elsewhere

pub mod auth;
pub mod config;
pub mod console;
pub mod error;
pub mod models;
pub mod protocol;
pub mod session;
pub mod state;
pub mod transport;
pub mod voting;
