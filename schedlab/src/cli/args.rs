//! CLI argument definitions

use clap::Parser;

use crate::output::Mode;

#[derive(Parser)]
#[command(
    name = "schedlab",
    about = "Observe kernel scheduler behavior per task",
    after_help = "\
EXAMPLES:
    sudo schedlab                                    Raw event stream
    sudo schedlab --mode latency --csv --csv-header  Wake->run latency as CSV
    sudo schedlab --mode starvation --wait-alert-ms 20
    sudo schedlab --mode fork --filter-pid 1234"
)]
pub struct Args {
    /// Analysis mode
    #[arg(long, value_enum, default_value_t = Mode::Stream)]
    pub mode: Mode,

    /// Only trace this task id (0 = trace everything)
    #[arg(long, default_value = "0")]
    pub filter_pid: u32,

    /// Wake->run latency alert threshold in milliseconds (0 = no alerts)
    #[arg(long, default_value = "5")]
    pub wait_alert_ms: u64,

    /// Machine-readable CSV output
    #[arg(long)]
    pub csv: bool,

    /// Print the mode-specific CSV header once before any data row
    #[arg(long, requires = "csv")]
    pub csv_header: bool,

    /// Stop after N seconds (0 = unlimited)
    #[arg(long, default_value = "0")]
    pub duration: u64,

    /// Suppress non-essential output
    #[arg(short, long)]
    pub quiet: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let args = Args::try_parse_from(["schedlab"]).unwrap();
        assert_eq!(args.mode, Mode::Stream);
        assert_eq!(args.filter_pid, 0);
        assert_eq!(args.wait_alert_ms, 5);
        assert!(!args.csv);
        assert!(!args.csv_header);
        assert_eq!(args.duration, 0);
    }

    #[test]
    fn test_mode_names() {
        let args =
            Args::try_parse_from(["schedlab", "--mode", "shortlong", "--filter-pid", "42"]).unwrap();
        assert_eq!(args.mode, Mode::Shortlong);
        assert_eq!(args.filter_pid, 42);
    }

    #[test]
    fn test_csv_header_requires_csv() {
        assert!(Args::try_parse_from(["schedlab", "--csv-header"]).is_err());
        assert!(Args::try_parse_from(["schedlab", "--csv", "--csv-header"]).is_ok());
    }

    #[test]
    fn test_unknown_mode_rejected() {
        assert!(Args::try_parse_from(["schedlab", "--mode", "flamegraph"]).is_err());
    }
}
