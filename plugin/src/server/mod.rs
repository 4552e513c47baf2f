//! Local HTTP plugin host

pub mod handlers;
pub mod serve;
pub mod state;
