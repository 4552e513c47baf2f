//! Request-scoped job context
//!
//! Everything a plugin run needs from its caller (options, secrets and the
//! job log) travels in one `JobContext` value built per invocation.

pub mod context;
pub mod redact;
pub mod result;
pub mod sink;
