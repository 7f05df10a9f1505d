//! Result wiring tests
//!
//! Producer to consumer delivery, fan-out, fan-in and result blocks.

mod fan_in;
