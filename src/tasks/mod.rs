//! Background Tasks Module
//!
//! Contains background tasks that run periodically during service operation.
//!
//! # Tasks
//! - Expiry sweep: removes expired-but-unread cache entries at a configured interval

mod sweep;

pub use sweep::spawn_sweep_task;
