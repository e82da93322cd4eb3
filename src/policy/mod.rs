//! Request plausibility checks.

pub mod validate;
