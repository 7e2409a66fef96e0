//! Configuration validation.
//!
//! Checks a loaded [`DigitbotConfig`] for problems that would make the bot
//! fail at startup or on its first request.

use std::path::PathBuf;

use secrecy::{ExposeSecret, Secret};

use crate::{env_subst::has_unresolved, schema::DigitbotConfig};

/// Severity level for a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Error,
    Warning,
    Info,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Error => write!(f, "error"),
            Self::Warning => write!(f, "warning"),
            Self::Info => write!(f, "info"),
        }
    }
}

/// A single validation diagnostic.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub severity: Severity,
    /// Category: "credentials", "file-ref", "endpoint", "limits", "replies"
    pub category: &'static str,
    /// Dotted path, e.g. "line.channel_secret"
    pub path: String,
    pub message: String,
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} [{}] {}: {}",
            self.severity, self.category, self.path, self.message
        )
    }
}

/// Result of validating a configuration.
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub diagnostics: Vec<Diagnostic>,
    pub config_path: Option<PathBuf>,
}

impl ValidationResult {
    /// Returns `true` if any diagnostic is an error.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.severity == Severity::Error)
    }

    /// Count diagnostics by severity.
    #[must_use]
    pub fn count(&self, severity: Severity) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == severity)
            .count()
    }

    fn push(
        &mut self,
        severity: Severity,
        category: &'static str,
        path: &str,
        message: impl Into<String>,
    ) {
        self.diagnostics.push(Diagnostic {
            severity,
            category,
            path: path.to_string(),
            message: message.into(),
        });
    }
}

/// Validate a configuration.
///
/// `config_path` is only recorded on the result for reporting.
pub fn validate(config: &DigitbotConfig, config_path: Option<PathBuf>) -> ValidationResult {
    let mut result = ValidationResult {
        diagnostics: Vec::new(),
        config_path,
    };

    check_secret(
        &mut result,
        "line.channel_access_token",
        "LINE_CHANNEL_ACCESS_TOKEN",
        config.line.channel_access_token.as_ref(),
    );
    check_secret(
        &mut result,
        "line.channel_secret",
        "LINE_CHANNEL_SECRET",
        config.line.channel_secret.as_ref(),
    );

    for (path, url) in [
        ("line.api_base", &config.line.api_base),
        ("line.data_api_base", &config.line.data_api_base),
    ] {
        if !(url.starts_with("https://") || url.starts_with("http://")) {
            result.push(
                Severity::Error,
                "endpoint",
                path,
                format!("'{url}' is not an http(s) URL"),
            );
        } else if url.starts_with("http://") {
            result.push(
                Severity::Warning,
                "endpoint",
                path,
                "plain http endpoint; the access token is sent in clear text",
            );
        }
    }

    if config.line.max_content_bytes == 0 {
        result.push(
            Severity::Error,
            "limits",
            "line.max_content_bytes",
            "must be greater than zero",
        );
    }
    if config.line.timeout_secs == 0 {
        result.push(
            Severity::Error,
            "limits",
            "line.timeout_secs",
            "must be greater than zero",
        );
    }

    if !config.model.path.is_file() {
        result.push(
            Severity::Error,
            "file-ref",
            "model.path",
            format!("model file not found: {}", config.model.path.display()),
        );
    }

    if config.server.port == 0 {
        result.push(
            Severity::Warning,
            "limits",
            "server.port",
            "port 0 binds a random port the platform cannot be pointed at",
        );
    }

    for (path, text) in [
        ("replies.text_prompt", &config.replies.text_prompt),
        ("replies.result", &config.replies.result),
        ("replies.failure", &config.replies.failure),
    ] {
        if text.trim().is_empty() {
            result.push(
                Severity::Error,
                "replies",
                path,
                "reply text must not be empty",
            );
        }
    }
    if !config.replies.result.contains("{digit}") {
        result.push(
            Severity::Warning,
            "replies",
            "replies.result",
            "template has no {digit} placeholder",
        );
    }

    result
}

fn check_secret(
    result: &mut ValidationResult,
    path: &str,
    env_name: &str,
    secret: Option<&Secret<String>>,
) {
    match secret.map(ExposeSecret::expose_secret) {
        None => result.push(
            Severity::Error,
            "credentials",
            path,
            format!("missing; set {env_name} or {path}"),
        ),
        Some(value) if value.trim().is_empty() => {
            result.push(Severity::Error, "credentials", path, "value is empty")
        },
        Some(value) if has_unresolved(value) => result.push(
            Severity::Error,
            "credentials",
            path,
            "contains an unresolved ${...} placeholder",
        ),
        Some(_) => {},
    }
}
