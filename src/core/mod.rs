//! # Core Infrastructure Module
//!
//! Runtime building blocks of a rotation context: output buffers, immutable lookup
//! table generations, the worker pool with its per-worker handshake, thread
//! scheduling policy and per-frame timing.

pub mod buffer_pool;
pub mod frame_timing;
pub mod table_arena;
pub mod thread_policy;
pub mod worker_pool;
