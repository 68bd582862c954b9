pub mod config;
pub mod sse;
pub mod state;
