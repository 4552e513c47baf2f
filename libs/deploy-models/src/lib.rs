//! Wire models for the remote deployment services
//!
//! Shared by the plugin clients and the plugin host.

pub mod models;
