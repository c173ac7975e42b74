use std::io::{self, BufWriter};
use std::process::ExitCode;
use std::time::{Duration, Instant};

use clap::error::ErrorKind;
use clap::Parser;
use log::info;

use schedlab::cli::Args;
use schedlab::consumer::EventConsumer;
use schedlab::domain::RunError;
use schedlab::output::OutputFormat;
use schedlab::preflight;
use schedlab::probes::{
    attach_probes, init_ebpf_logger, load_probes, take_event_ring, write_config,
};

/// How long one poll waits for data before checking the stop conditions
const POLL_INTERVAL: Duration = Duration::from_millis(200);

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::init();

    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) => {
            // clap wants exit 2 for CLI errors; the interface contract says 1.
            // --help and --version still exit 0.
            let code =
                if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) {
                    0
                } else {
                    1
                };
            let _ = e.print();
            return ExitCode::from(code);
        }
    };

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("schedlab: {e}");
            ExitCode::from(e.exit_code())
        }
    }
}

async fn run(args: Args) -> Result<(), RunError> {
    preflight::check_privileges()?;

    if !args.quiet && !args.csv {
        println!("schedlab: mode={}, wait-alert={}ms, filter-pid={}", args.mode, args.wait_alert_ms, args.filter_pid);
    }

    let mut bpf = load_probes()?;
    init_ebpf_logger(&mut bpf);

    // The configuration record is fully written before any probe can fire.
    let wait_alert_ns = args.wait_alert_ms.saturating_mul(1_000_000);
    write_config(&mut bpf, wait_alert_ns, args.filter_pid)?;

    attach_probes(&mut bpf)?;

    let mut ring = take_event_ring(&mut bpf)?;

    let format = if args.csv { OutputFormat::Csv } else { OutputFormat::Human };
    let stdout = BufWriter::new(io::stdout());
    let mut consumer = EventConsumer::new(args.mode, format, args.csv_header, stdout)?;

    let started = Instant::now();
    let duration_limit =
        if args.duration > 0 { Some(Duration::from_secs(args.duration)) } else { None };

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        if let Some(limit) = duration_limit {
            if started.elapsed() >= limit {
                info!("duration limit reached ({}s)", args.duration);
                break;
            }
        }

        // Drain everything the probes submitted since the last pass, then
        // flush so a consumer piping the CSV sees rows promptly.
        while let Some(item) = ring.next() {
            let bytes: &[u8] = &item;
            consumer.consume_raw(bytes)?;
        }
        consumer.flush()?;

        tokio::select! {
            () = tokio::time::sleep(POLL_INTERVAL) => {}
            _ = &mut ctrl_c => {
                info!("interrupt received, shutting down");
                break;
            }
        }
    }

    // Teardown order: stop reading, detach probes, free maps. Records
    // submitted after the final drain are discarded with the ring.
    drop(ring);
    drop(bpf);

    consumer.flush()?;
    info!(
        "processed {} events across {} tasks ({} short reads)",
        consumer.event_count,
        consumer.table().len(),
        consumer.short_reads
    );

    if !args.quiet && !args.csv {
        println!("schedlab: processed {} events", consumer.event_count);
    }

    Ok(())
}
