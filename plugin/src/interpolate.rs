//! Template interpolation of job options
//!
//! Expressions are `.dotted.key` lookups into the flat option map, wrapped in
//! configurable delimiters. Unknown keys render as an empty string.

use std::collections::HashMap;

use regex::{Captures, Regex};

use crate::errors::PluginError;

/// Renders a template against a flat key/value map
pub trait Interpolate: Send + Sync {
    fn interpolate(
        &self,
        template: &str,
        vars: &HashMap<String, String>,
    ) -> Result<String, PluginError>;
}

/// Delimited `.key` template
#[derive(Debug, Clone)]
pub struct Template {
    open: &'static str,
    pattern: Regex,
}

impl Template {
    /// Template with custom delimiters
    pub fn new(open: &'static str, close: &'static str) -> Result<Self, PluginError> {
        let pattern = Regex::new(&format!(
            r"{}\s*\.([A-Za-z0-9_][A-Za-z0-9_.\-]*)\s*{}",
            regex::escape(open),
            regex::escape(close)
        ))
        .map_err(|e| PluginError::Interpolation(e.to_string()))?;
        Ok(Self { open, pattern })
    }

    /// `{{.key}}` templates
    pub fn curly() -> Result<Self, PluginError> {
        Self::new("{{", "}}")
    }

    /// `[[.key]]` templates, used where the text itself is a template
    pub fn square() -> Result<Self, PluginError> {
        Self::new("[[", "]]")
    }
}

impl Interpolate for Template {
    fn interpolate(
        &self,
        template: &str,
        vars: &HashMap<String, String>,
    ) -> Result<String, PluginError> {
        let rendered = self.pattern.replace_all(template, |caps: &Captures| {
            vars.get(&caps[1]).cloned().unwrap_or_default()
        });

        if let Some(pos) = rendered.find(self.open) {
            let snippet: String = rendered[pos..].chars().take(32).collect();
            return Err(PluginError::Interpolation(format!(
                "unresolved expression near '{}'",
                snippet
            )));
        }

        Ok(rendered.into_owned())
    }
}
