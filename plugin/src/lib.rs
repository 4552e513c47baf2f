//! CDS deployment plugins
//!
//! Deploy-and-poll plugins for remote deployment services (Arsenal and
//! Marathon), the retry engine and sub-deployment aggregator they share, and
//! a small local host that runs them.

pub mod app;
pub mod deploy;
pub mod errors;
pub mod filesys;
pub mod http;
pub mod interpolate;
pub mod job;
pub mod logs;
pub mod server;
pub mod utils;
