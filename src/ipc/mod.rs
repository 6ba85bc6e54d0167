//! Record stream between the push listener process and the dispatcher.
//!
//! The listener writes one JSON object per line to its stdout; the
//! dispatcher spawns it and reads that pipe.

pub mod codec;
pub mod listener;
pub mod record;
