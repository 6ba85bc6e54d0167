//! Agent orchestration.
//!
//! Covers prompt construction, the persisted conversation handle, agent
//! process spawning, and the runner the dispatcher drives.

pub mod chat_handle;
pub mod prompt;
pub mod runner;
pub mod spawner;
