//! Infrastructure layer - External dependency implementations.

pub mod clock;
pub mod config;
pub mod llm_narrative;
pub mod memory;
pub mod notifier;
pub mod ollama;
pub mod ports;
pub mod retry;
pub mod session_locks;
pub mod telemetry;
