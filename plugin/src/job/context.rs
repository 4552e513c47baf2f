//! Job context handed to every plugin run

use std::borrow::Cow;
use std::collections::HashMap;
use std::sync::Arc;

use secrecy::SecretString;
use tracing::debug;

use crate::job::redact::Redactor;
use crate::job::sink::{LineKind, LogSink};

/// Option key suffixes whose values are treated as secrets
const SECRET_SUFFIXES: &[&str] = &["token", "password", "secret"];

/// Capabilities a plugin run gets from its caller
pub trait JobContext: Send + Sync {
    /// Identifier of this run, attached to every log line
    fn run_id(&self) -> &str;

    /// Every option of the run
    fn options(&self) -> &HashMap<String, String>;

    /// Resolve a secret by key
    fn secret(&self, key: &str) -> Option<&SecretString>;

    /// Mask every known secret in `line`
    fn redact<'a>(&self, line: &'a str) -> Cow<'a, str>;

    /// Emit one line on the job log, redacted
    fn log(&self, kind: LineKind, line: &str);

    /// Get a single option
    fn option(&self, key: &str) -> Option<&str> {
        self.options().get(key).map(String::as_str)
    }

    fn info(&self, line: &str) {
        self.log(LineKind::Info, line)
    }

    fn warn(&self, line: &str) {
        self.log(LineKind::Warn, line)
    }

    fn error(&self, line: &str) {
        self.log(LineKind::Error, line)
    }

    fn success(&self, line: &str) {
        self.log(LineKind::Success, line)
    }
}

/// Job context of a single invocation
pub struct Job {
    run_id: String,
    options: HashMap<String, String>,
    secrets: HashMap<String, SecretString>,
    redactor: Redactor,
    sink: Arc<dyn LogSink>,
}

impl Job {
    /// Create a job from its options
    ///
    /// Options whose key ends with `token`, `password` or `secret` are
    /// registered as secrets.
    pub fn new(options: HashMap<String, String>, sink: Arc<dyn LogSink>) -> Self {
        let mut job = Self {
            run_id: uuid::Uuid::new_v4().to_string(),
            options,
            secrets: HashMap::new(),
            redactor: Redactor::new(),
            sink,
        };

        let detected: Vec<(String, String)> = job
            .options
            .iter()
            .filter(|(key, _)| is_secret_key(key))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        for (key, value) in detected {
            job.add_secret(key, value);
        }

        debug!(
            run_id = %job.run_id,
            options = job.options.len(),
            secrets = job.secrets.len(),
            "Job context created"
        );
        job
    }

    /// Register an extra secret
    pub fn with_secret(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.add_secret(key.into(), value.into());
        self
    }

    fn add_secret(&mut self, key: String, value: String) {
        self.redactor
            .register(key.clone(), SecretString::from(value.clone()));
        self.secrets.insert(key, SecretString::from(value));
    }
}

fn is_secret_key(key: &str) -> bool {
    let key = key.to_lowercase();
    SECRET_SUFFIXES.iter().any(|suffix| key.ends_with(suffix))
}

impl JobContext for Job {
    fn run_id(&self) -> &str {
        &self.run_id
    }

    fn options(&self) -> &HashMap<String, String> {
        &self.options
    }

    fn secret(&self, key: &str) -> Option<&SecretString> {
        self.secrets.get(key)
    }

    fn redact<'a>(&self, line: &'a str) -> Cow<'a, str> {
        self.redactor.redact(line)
    }

    fn log(&self, kind: LineKind, line: &str) {
        let line = self.redactor.redact(line);
        self.sink.send(&self.run_id, kind, &line);
    }
}

impl std::fmt::Debug for Job {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Job")
            .field("run_id", &self.run_id)
            .field("options", &self.options.len())
            .field("redactor", &self.redactor)
            .finish()
    }
}
