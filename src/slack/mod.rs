//! Slack chat connection layer.

pub mod client;
pub mod events;
pub mod ts;
