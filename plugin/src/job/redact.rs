//! Secret redaction for job log lines

use std::borrow::Cow;

use secrecy::{ExposeSecret, SecretString};

/// Secrets shorter than this are left alone, they would match too much.
pub const MIN_SECRET_LEN: usize = 6;

/// Replaces known secret values with a `**KEY**` marker
///
/// Only catches a secret appearing byte for byte in the line.
#[derive(Default)]
pub struct Redactor {
    secrets: Vec<(String, SecretString)>,
}

impl Redactor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a secret; values shorter than `MIN_SECRET_LEN` are ignored
    pub fn register(&mut self, name: impl Into<String>, value: SecretString) {
        if value.expose_secret().len() < MIN_SECRET_LEN {
            return;
        }
        self.secrets.push((name.into(), value));
        // longest first so a secret containing another one is masked whole
        self.secrets
            .sort_by(|a, b| b.1.expose_secret().len().cmp(&a.1.expose_secret().len()));
    }

    pub fn len(&self) -> usize {
        self.secrets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.secrets.is_empty()
    }

    /// Redact every registered secret from `line`
    pub fn redact<'a>(&self, line: &'a str) -> Cow<'a, str> {
        let mut out = Cow::Borrowed(line);
        for (name, value) in &self.secrets {
            let value = value.expose_secret();
            if out.contains(value) {
                out = Cow::Owned(out.replace(value, &format!("**{}**", name)));
            }
        }
        out
    }
}

impl std::fmt::Debug for Redactor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = self.secrets.iter().map(|(n, _)| n.as_str()).collect();
        f.debug_struct("Redactor").field("secrets", &names).finish()
    }
}
