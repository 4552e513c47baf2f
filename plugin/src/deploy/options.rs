//! Typed plugin options parsed from the flat option map

use std::str::FromStr;
use std::time::Duration;

use secrecy::SecretString;

use crate::deploy::retry::RetryPolicy;
use crate::errors::PluginError;
use crate::job::context::JobContext;

/// Prefix of the deployment integration options
pub const INTEGRATION_PREFIX: &str = "cds.integration.deployment.";

/// Reads options off a job, warning and falling back on unparsable values
pub struct OptionReader<'a> {
    job: &'a dyn JobContext,
}

impl<'a> OptionReader<'a> {
    pub fn new(job: &'a dyn JobContext) -> Self {
        Self { job }
    }

    /// First non-empty value among `keys`
    pub fn string(&self, keys: &[&str]) -> Option<String> {
        keys.iter()
            .filter_map(|k| self.job.option(k))
            .map(str::trim)
            .find(|v| !v.is_empty())
            .map(str::to_string)
    }

    /// Required value, `Configuration` error when missing
    pub fn required(&self, keys: &[&str], what: &str) -> Result<String, PluginError> {
        self.string(keys)
            .ok_or_else(|| PluginError::Configuration(format!("missing {}", what)))
    }

    /// Required value held as a secret
    pub fn required_secret(&self, keys: &[&str], what: &str) -> Result<SecretString, PluginError> {
        self.required(keys, what).map(SecretString::from)
    }

    /// Parsed value, or `default` with a warning on the job log
    pub fn parse_or<T>(&self, keys: &[&str], default: T) -> T
    where
        T: FromStr + std::fmt::Debug,
        T::Err: std::fmt::Display,
    {
        let Some(raw) = self.string(keys) else {
            return default;
        };
        match raw.parse::<T>() {
            Ok(value) => value,
            Err(e) => {
                self.job.warn(&format!(
                    "Error parsing {}: {}. Default value {:?} will be used",
                    keys[0], e, default
                ));
                default
            }
        }
    }

    /// Boolean flag accepting the usual spellings
    pub fn flag_or(&self, keys: &[&str], default: bool) -> bool {
        let Some(raw) = self.string(keys) else {
            return default;
        };
        match raw.to_lowercase().as_str() {
            "1" | "t" | "true" | "yes" | "y" | "on" => true,
            "0" | "f" | "false" | "no" | "n" | "off" => false,
            _ => {
                self.job.warn(&format!(
                    "Error parsing {}: invalid boolean '{}'. Default value {} will be used",
                    keys[0], raw, default
                ));
                default
            }
        }
    }

    /// Whole seconds
    pub fn seconds_or(&self, keys: &[&str], default: Duration) -> Duration {
        Duration::from_secs(self.parse_or(keys, default.as_secs()))
    }
}

fn integration_key(suffix: &str) -> String {
    format!("{}{}", INTEGRATION_PREFIX, suffix)
}

/// Options of the Arsenal integration plugin
pub struct ArsenalOptions {
    pub application: String,
    pub host: String,
    pub deployment_token: SecretString,
    pub alternative_template: Option<String>,
    pub alternative_cleanup: bool,
    pub retry: RetryPolicy,
    pub insecure_skip_verify: bool,
}

impl ArsenalOptions {
    pub fn from_job(job: &dyn JobContext) -> Result<Self, PluginError> {
        let reader = OptionReader::new(job);
        let defaults = RetryPolicy::default();

        let host = reader.required(&[&integration_key("host")], "arsenal host")?;
        let deployment_token = reader.required_secret(
            &[
                &integration_key("deployment.token"),
                &integration_key("token"),
            ],
            "arsenal deployment token",
        )?;

        let per_attempt_timeout = reader
            .string(&[&integration_key("retry.timeout")])
            .map(|_| reader.seconds_or(&[&integration_key("retry.timeout")], Duration::ZERO))
            .filter(|d| !d.is_zero());

        Ok(Self {
            application: reader.string(&["cds.application"]).unwrap_or_default(),
            host,
            deployment_token,
            alternative_template: reader.string(&[&integration_key("alternative.config")]),
            alternative_cleanup: reader.flag_or(&[&integration_key("alternative.cleanup")], false),
            retry: RetryPolicy {
                max_retries: reader.parse_or(&[&integration_key("retry.max")], defaults.max_retries),
                delay: reader.seconds_or(&[&integration_key("retry.delay")], defaults.delay),
                per_attempt_timeout,
            },
            insecure_skip_verify: reader
                .flag_or(&[&integration_key("insecureSkipVerify")], false),
        })
    }
}

/// Options of the Marathon action plugin
pub struct MarathonOptions {
    pub url: String,
    pub user: Option<String>,
    pub password: Option<SecretString>,
    pub configuration: String,
    pub wait_for_deployment: bool,
    pub insecure_skip_verify: bool,
    pub timeout: Duration,
    pub poll_interval: Duration,
}

impl MarathonOptions {
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);
    pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);

    pub fn from_job(job: &dyn JobContext) -> Result<Self, PluginError> {
        let reader = OptionReader::new(job);

        let poll_ms = reader.parse_or(
            &["pollInterval"],
            Self::DEFAULT_POLL_INTERVAL.as_millis() as u64,
        );

        Ok(Self {
            url: reader.required(&["url"], "marathon url")?,
            user: reader.string(&["user"]),
            password: reader.string(&["password"]).map(SecretString::from),
            configuration: reader.required(&["configuration"], "marathon configuration file")?,
            wait_for_deployment: reader.flag_or(&["waitForDeployment"], true),
            insecure_skip_verify: reader.flag_or(&["insecureSkipVerify"], false),
            timeout: reader.seconds_or(&["timeout"], Self::DEFAULT_TIMEOUT),
            poll_interval: Duration::from_millis(poll_ms.max(1)),
        })
    }

    /// Poll policy of one deployment wait, bounded by the timeout
    pub fn poll_policy(&self) -> RetryPolicy {
        let polls = self.timeout.as_millis() / self.poll_interval.as_millis().max(1);
        let max_retries = u32::try_from(polls).unwrap_or(u32::MAX);
        RetryPolicy {
            max_retries,
            delay: self.poll_interval,
            per_attempt_timeout: None,
        }
    }
}
