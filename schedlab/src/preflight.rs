//! Pre-flight checks for schedlab
//!
//! Validates system requirements before attempting to load eBPF programs.
//! Provides clear, actionable error messages when requirements aren't met.

#![allow(unsafe_code)] // geteuid() requires unsafe

use crate::domain::SetupError;

/// Check if running with sufficient privileges for eBPF
///
/// Probes only load for a privileged user; failing here early keeps the
/// message actionable instead of surfacing a raw EPERM from the load.
pub fn check_privileges() -> Result<(), SetupError> {
    if unsafe { libc::geteuid() } == 0 {
        return Ok(());
    }

    // Not root. CAP_BPF would also do on 5.8+, but capability checking
    // needs extra dependencies; require root for now.
    Err(SetupError::Load(
        "permission denied: schedlab requires root privileges to load eBPF programs \
         (run with: sudo schedlab ...)"
            .to_string(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_privilege_check_reports_load_failure() {
        // Whatever user runs the tests, a failure must map to the probe
        // load exit code.
        if let Err(err) = check_privileges() {
            assert_eq!(err.exit_code(), 2);
            assert!(err.to_string().contains("root"));
        }
    }
}
