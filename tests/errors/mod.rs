//! Error handling tests
//!
//! Failures travel as values: unchanged through transforms, aggregated by combines and
//! retried by policy.
