use {anyhow::Result, clap::Subcommand};

use digitbot_config::{DigitbotConfig, Severity};

use crate::Cli;

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Print the effective configuration (file, environment and flags merged)
    /// as TOML. Credentials are redacted.
    Show,
    /// Validate the configuration and report errors/warnings.
    Check,
    /// Print where config files are looked up.
    Path,
}

pub fn handle_config(cli: &Cli, action: &ConfigAction) -> Result<()> {
    match action {
        ConfigAction::Show => show(cli),
        ConfigAction::Check => check(cli),
        ConfigAction::Path => {
            println!("./digitbot.toml");
            if let Some(dir) = digitbot_config::config_dir() {
                println!("{}", dir.join("digitbot.toml").display());
            }
            Ok(())
        },
    }
}

/// ANSI color codes.
const RED: &str = "\x1b[31m";
const YELLOW: &str = "\x1b[33m";
const CYAN: &str = "\x1b[36m";
const BOLD: &str = "\x1b[1m";
const RESET: &str = "\x1b[0m";

fn show(cli: &Cli) -> Result<()> {
    let loaded = cli.load_config()?;
    match loaded.path {
        Some(ref path) => println!("# loaded from {}", path.display()),
        None => println!("# no config file found; defaults + environment"),
    }
    print!("{}", render(&loaded.config)?);
    Ok(())
}

fn render(config: &DigitbotConfig) -> Result<String> {
    Ok(toml::to_string_pretty(config)?)
}

fn check(cli: &Cli) -> Result<()> {
    let loaded = cli.load_config()?;
    let result = digitbot_config::validate(&loaded.config, loaded.path.clone());

    if let Some(ref path) = result.config_path {
        eprintln!("Checking {}\n", path.display());
    } else {
        eprintln!("No config file found; checking defaults and environment.\n");
    }

    for d in &result.diagnostics {
        let (color, label) = match d.severity {
            Severity::Error => (RED, "error"),
            Severity::Warning => (YELLOW, "warning"),
            Severity::Info => (CYAN, "info"),
        };
        eprintln!("  {BOLD}{color}{label}{RESET} {}: {}", d.path, d.message);
    }

    let errors = result.count(Severity::Error);
    let warnings = result.count(Severity::Warning);
    if !result.diagnostics.is_empty() {
        eprintln!();
    }
    if errors == 0 && warnings == 0 {
        eprintln!("No issues found.");
    } else {
        eprintln!("{errors} error(s), {warnings} warning(s)");
    }

    if errors > 0 {
        std::process::exit(1);
    }
    Ok(())
}
