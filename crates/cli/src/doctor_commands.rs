//! `digitbot doctor`: config validation, environment audit and a model load.
//!
//! Prints a structured report with `[ok]`, `[warn]`, `[fail]` or `[info]`
//! per item and exits non-zero when anything failed.

use std::time::Instant;

use anyhow::Result;

use {
    digitbot_classifier::{Classifier, OnnxClassifier},
    digitbot_config::{DigitbotConfig, Severity, ValidationResult},
    digitbot_media::ImageTensor,
};

use crate::Cli;

// ── ANSI helpers ────────────────────────────────────────────────────────────

const GREEN: &str = "\x1b[32m";
const RED: &str = "\x1b[31m";
const YELLOW: &str = "\x1b[33m";
const CYAN: &str = "\x1b[36m";
const BOLD: &str = "\x1b[1m";
const RESET: &str = "\x1b[0m";

/// Outcome of one check line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Status {
    Ok,
    Warn,
    Fail,
    Info,
}

impl Status {
    /// Label and color for the `[label]` prefix.
    fn style(self) -> (&'static str, &'static str) {
        match self {
            Self::Ok => ("ok", GREEN),
            Self::Warn => ("warn", YELLOW),
            Self::Fail => ("fail", RED),
            Self::Info => ("info", CYAN),
        }
    }
}

/// A titled group of check lines.
struct Section {
    title: String,
    items: Vec<(Status, String)>,
}

impl Section {
    fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            items: Vec::new(),
        }
    }

    fn push(&mut self, status: Status, message: impl Into<String>) {
        self.items.push((status, message.into()));
    }

    fn count(&self, status: Status) -> usize {
        self.items.iter().filter(|(s, _)| *s == status).count()
    }
}

/// Print every section and return `(failures, warnings)`.
fn print_report(sections: &[Section]) -> (usize, usize) {
    for section in sections {
        eprintln!("{BOLD}{}{RESET}", section.title);
        for (status, message) in &section.items {
            let (label, color) = status.style();
            eprintln!("  [{color}{label}{RESET}]  {message}");
        }
        eprintln!();
    }

    let total = |status: Status| -> usize { sections.iter().map(|s| s.count(status)).sum() };
    (total(Status::Fail), total(Status::Warn))
}

/// Environment variables the bot reads, and whether each is required.
const ENV_VARS: &[(&str, bool)] = &[
    ("LINE_CHANNEL_ACCESS_TOKEN", true),
    ("LINE_CHANNEL_SECRET", true),
    ("PORT", false),
    ("DIGITBOT_BIND", false),
    ("DIGITBOT_MODEL_PATH", false),
];

// ── Entry point ─────────────────────────────────────────────────────────────

pub async fn handle_doctor(cli: &Cli) -> Result<()> {
    eprintln!("{BOLD}digitbot doctor{RESET}");
    eprintln!("{BOLD}==============={RESET}\n");

    let loaded = cli.load_config()?;
    let validation = digitbot_config::validate(&loaded.config, loaded.path.clone());

    let mut sections = vec![
        check_config(&validation),
        check_environment(&loaded.config),
    ];

    let config = loaded.config.clone();
    sections.push(tokio::task::spawn_blocking(move || check_model(&config)).await?);

    let (errors, warnings) = print_report(&sections);
    eprintln!("{BOLD}Summary:{RESET} {errors} error(s), {warnings} warning(s)");

    if errors > 0 {
        std::process::exit(1);
    }
    Ok(())
}

// ── 1. Config validation ────────────────────────────────────────────────────

fn check_config(result: &ValidationResult) -> Section {
    let label = result
        .config_path
        .as_ref()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "defaults + environment".into());
    let mut section = Section::new(format!("Config ({label})"));

    for d in &result.diagnostics {
        let status = match d.severity {
            Severity::Error => Status::Fail,
            Severity::Warning => Status::Warn,
            Severity::Info => Status::Info,
        };
        section.push(status, format!("{}: {}", d.path, d.message));
    }
    if result.diagnostics.is_empty() {
        section.push(Status::Ok, "no issues found");
    }
    section
}

// ── 2. Environment ──────────────────────────────────────────────────────────

fn check_environment(config: &DigitbotConfig) -> Section {
    let mut section = Section::new("Environment");

    if std::path::Path::new(".env").is_file() {
        section.push(Status::Info, ".env file present in working directory");
    }
    for (name, required) in ENV_VARS {
        match std::env::var(name) {
            Ok(v) if !v.is_empty() => section.push(Status::Ok, format!("{name} is set")),
            _ if *required && config.line.has_credentials() => section.push(
                Status::Info,
                format!("{name} not set (provided by config file)"),
            ),
            _ if *required => section.push(Status::Warn, format!("{name} not set")),
            _ => section.push(Status::Info, format!("{name} not set (optional)")),
        }
    }
    section
}

// ── 3. Model ────────────────────────────────────────────────────────────────

fn check_model(config: &DigitbotConfig) -> Section {
    let path = &config.model.path;
    let mut section = Section::new(format!("Model ({})", path.display()));

    let started = Instant::now();
    match OnnxClassifier::load(&config.model) {
        Ok(classifier) => {
            section.push(
                Status::Ok,
                format!(
                    "loaded {} in {} ms",
                    classifier.describe(),
                    started.elapsed().as_millis()
                ),
            );
            match classifier.classify(&ImageTensor::zeros()) {
                Ok(p) => section.push(
                    Status::Ok,
                    format!("test inference ok (blank input -> {})", p.digit),
                ),
                Err(e) => section.push(Status::Fail, format!("test inference failed: {e}")),
            }
        },
        Err(e) => section.push(Status::Fail, e.to_string()),
    }
    section
}
