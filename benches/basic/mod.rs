pub mod execution;
pub mod scaling;
