//! Invocation of the Cascade Routing Tool and its log check.
use std::fs;
use std::path::Path;
use std::process::Command;

use tracing::{error, info};

use crate::config::CrtConfig;
use crate::error::{Result, StreamError};

/// Log line the tool writes when the input still contains unfilled sinks.
pub const UNDECLARED_SWALE_SENTINEL: &str = "CRT FOUND UNDECLARED SWALE HRUS";

/// Fail when any trimmed log line is the undeclared-swale sentinel.
pub fn check_crt_log(executable: &str, log_path: &Path, log: &str) -> Result<()> {
    if log.lines().any(|l| l.trim() == UNDECLARED_SWALE_SENTINEL) {
        error!("CRT found undeclared swale HRUs (sinks)");
        return Err(StreamError::ExternalToolFailure {
            executable: executable.to_string(),
            detail: format!(
                "found undeclared swale HRUs (sinks); all sinks must be filled before \
                 generating cascades, check {}",
                log_path.display()
            ),
        });
    }
    Ok(())
}

/// Run the tool in its workspace and check its log. Blocks until the tool exits.
///
/// Returns without doing anything when no executable is configured.
pub fn run_crt(crt: &CrtConfig) -> Result<()> {
    let Some(exe) = crt.executable.as_ref() else {
        info!("No CRT executable configured, skipping CRT");
        return Ok(());
    };
    let exe_name = exe.display().to_string();
    info!("Running CRT");

    let status = Command::new(exe)
        .args(&crt.args)
        .current_dir(&crt.workspace)
        .status()
        .map_err(|e| StreamError::io(exe, e))?;
    let log_path = crt.workspace.join(&crt.log_name);
    if !status.success() {
        return Err(StreamError::ExternalToolFailure {
            executable: exe_name,
            detail: format!("exited with {status}; check {}", log_path.display()),
        });
    }

    info!("Reading CRT {}", crt.log_name);
    let log = fs::read_to_string(&log_path).map_err(|e| StreamError::io(&log_path, e))?;
    check_crt_log(&exe_name, &log_path, &log)
}
