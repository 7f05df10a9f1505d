//! Execution tests
//!
//! Parallelism, spawners and concurrency limits.

mod parallelism;
mod spawners;
