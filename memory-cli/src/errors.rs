//! Helpful error messages with suggestions for common CLI failures.

use anyhow::Result;
use colored::Colorize;

/// Adds a short list of suggested fixes to an error's display text.
pub trait EnhancedError<T> {
    fn context_with_help(self, msg: &str, help: &[&str]) -> Result<T>;
}

impl<T, E: std::error::Error + Send + Sync + 'static> EnhancedError<T> for Result<T, E> {
    fn context_with_help(self, msg: &str, help: &[&str]) -> Result<T> {
        self.map_err(|e| {
            let mut error_msg = format!("{}\n\n{}", msg.red().bold(), e);
            if !help.is_empty() {
                error_msg.push_str(&format!("\n\n{}", "Possible solutions:".yellow().bold()));
                for (i, h) in help.iter().enumerate() {
                    error_msg.push_str(&format!("\n  {}. {}", i + 1, h));
                }
            }
            anyhow::anyhow!(error_msg)
        })
    }
}

pub mod helpers {
    pub const WORKER_UNREACHABLE_HELP: &[&str] = &[
        "Check that the memory worker is running (`memory-worker`)",
        "Verify --worker-url, or KIRO_MEMORY_WORKER_URL, points at the right host:port",
        "Run `memory-cli health` to confirm connectivity",
    ];

    pub const RESTORE_REQUIRES_TOKEN_HELP: &[&str] = &[
        "Restore is an authenticated route; the CLI reads the worker token from <data-dir>/worker.token",
        "Make sure the CLI and worker share the same KIRO_MEMORY_DATA_DIR",
    ];
}
