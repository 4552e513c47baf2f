//! API models

pub mod arsenal;
pub mod marathon;
pub mod plugin;
