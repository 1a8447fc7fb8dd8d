//! System health checks for MirrorKeep
//!
//! Preflight checks to verify the system is properly configured before the
//! daemon starts mirroring.

use crate::Config;
use std::path::Path;

/// Result of system health checks
#[derive(Debug, Clone)]
pub struct HealthCheck {
    /// Git installation status
    pub git: CheckResult,
    /// Credential set status
    pub credentials: CheckResult,
    /// Mirror store root status
    pub mirror_root: CheckResult,
    /// Schedule expression status
    pub schedule: CheckResult,
}

/// Result of an individual health check
#[derive(Debug, Clone)]
pub struct CheckResult {
    pub passed: bool,
    pub message: String,
    pub details: Option<String>,
    pub is_warning: bool,
}

impl CheckResult {
    fn ok(message: impl Into<String>) -> Self {
        Self {
            passed: true,
            message: message.into(),
            details: None,
            is_warning: false,
        }
    }

    fn ok_with_details(message: impl Into<String>, details: impl Into<String>) -> Self {
        Self {
            passed: true,
            message: message.into(),
            details: Some(details.into()),
            is_warning: false,
        }
    }

    fn error(message: impl Into<String>) -> Self {
        Self {
            passed: false,
            message: message.into(),
            details: None,
            is_warning: false,
        }
    }

    fn error_with_details(message: impl Into<String>, details: impl Into<String>) -> Self {
        Self {
            passed: false,
            message: message.into(),
            details: Some(details.into()),
            is_warning: false,
        }
    }

    fn warning_with_details(message: impl Into<String>, details: impl Into<String>) -> Self {
        Self {
            passed: true,
            message: message.into(),
            details: Some(details.into()),
            is_warning: true,
        }
    }
}

impl HealthCheck {
    /// Run all health checks
    pub fn run(config: &Config) -> Self {
        Self {
            git: Self::check_git(),
            credentials: Self::check_credentials(config),
            mirror_root: Self::check_mirror_root(config),
            schedule: Self::check_schedule(config),
        }
    }

    /// Check if all required checks passed (excludes warnings)
    pub fn all_passed(&self) -> bool {
        self.git.passed && self.credentials.passed && self.mirror_root.passed && self.schedule.passed
    }

    /// Get list of warnings
    pub fn warnings(&self) -> Vec<&CheckResult> {
        [&self.git, &self.credentials, &self.mirror_root, &self.schedule]
            .into_iter()
            .filter(|r| r.is_warning)
            .collect()
    }

    /// All checks with display names, in report order
    pub fn all_checks(&self) -> Vec<(&'static str, &CheckResult)> {
        vec![
            ("Git", &self.git),
            ("Credentials", &self.credentials),
            ("Mirror store", &self.mirror_root),
            ("Schedule", &self.schedule),
        ]
    }

    /// Check git installation
    fn check_git() -> CheckResult {
        match std::process::Command::new("git").arg("--version").output() {
            Ok(output) if output.status.success() => {
                let version = String::from_utf8_lossy(&output.stdout);
                CheckResult::ok_with_details("Git installed", version.trim().to_string())
            }
            Ok(_) => CheckResult::error("Git command failed"),
            Err(_) => CheckResult::error_with_details(
                "Git not found in PATH",
                "Install git: https://git-scm.com/downloads",
            ),
        }
    }

    /// Check the credential set parses into at least one account
    fn check_credentials(config: &Config) -> CheckResult {
        match config.accounts() {
            Ok(accounts) => {
                let names: Vec<&str> = accounts.iter().map(|a| a.username.as_str()).collect();
                CheckResult::ok_with_details(
                    format!("{} account(s) configured", accounts.len()),
                    names.join(", "),
                )
            }
            Err(e) => CheckResult::error_with_details(
                "No usable credentials",
                format!(
                    "{:#}\nSet `credentials` in the config file or the {} environment variable",
                    e,
                    crate::config::CREDENTIALS_ENV
                ),
            ),
        }
    }

    /// Check the schedule expression parses
    fn check_schedule(config: &Config) -> CheckResult {
        match crate::daemon::describe_schedule(&config.schedule) {
            Ok(cadence) => CheckResult::ok_with_details("Schedule valid", cadence),
            Err(e) => CheckResult::error_with_details(
                "Invalid schedule",
                format!("{:#}\nUse an interval like '30m', '6h' or '1d'", e),
            ),
        }
    }

    /// Check the mirror store root is usable
    fn check_mirror_root(config: &Config) -> CheckResult {
        let root = Path::new(&config.mirror_root);

        if !root.exists() {
            return CheckResult::warning_with_details(
                "Mirror root does not exist yet",
                format!("{} will be created on first clone", root.display()),
            );
        }

        if !root.is_dir() {
            return CheckResult::error_with_details(
                "Mirror root is not a directory",
                root.display().to_string(),
            );
        }

        // Probe writability the way a clone would
        let probe = root.join(".mirrorkeep-write-check");
        match std::fs::write(&probe, b"ok") {
            Ok(_) => {
                let _ = std::fs::remove_file(&probe);
                CheckResult::ok(format!("Mirror root writable: {}", root.display()))
            }
            Err(e) => CheckResult::error_with_details(
                format!("Mirror root not writable: {}", root.display()),
                e.to_string(),
            ),
        }
    }
}
