//! Boundary tests
//!
//! Very deep chains and long retry runs.

mod deep_chains;
