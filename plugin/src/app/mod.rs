//! Plugin host application

pub mod options;
pub mod run;
pub mod settings;
