//! # eBPF Program Loading and Attachment
//!
//! Loads compiled eBPF bytecode, writes the probe configuration, and
//! attaches the scheduler tracepoints. Each step maps to a distinct
//! [`SetupError`] variant so the process can exit with the code the
//! interface contract assigns to that failure.
//!
//! ## Attachment Points
//!
//! - **Tracepoint**: `sched/sched_wakeup` (task became runnable)
//! - **Tracepoint**: `sched/sched_switch` (context switches)
//! - **Tracepoint**: `sched/sched_process_exec`
//! - **Tracepoint**: `sched/sched_process_exit`
//! - **Tracepoint**: `sched/sched_process_fork`

use aya::{
    include_bytes_aligned,
    maps::{Array, MapData, RingBuf},
    programs::TracePoint,
    Ebpf,
};
use aya_log::EbpfLogger;
use log::{info, warn};
use schedlab_common::ProbeConfig;

use crate::domain::SetupError;

/// The five scheduler tracepoints, attached in this order
const TRACEPOINTS: [&str; 5] = [
    "sched_wakeup",
    "sched_switch",
    "sched_process_exec",
    "sched_process_exit",
    "sched_process_fork",
];

/// Load the eBPF program binary
///
/// Always uses the release build because debug builds with recent Rust
/// nightlies pull in formatting code (`LowerHex`) that's incompatible with
/// the BPF linker. The release build uses LTO to eliminate dead code.
pub fn load_probes() -> Result<Ebpf, SetupError> {
    Ebpf::load(include_bytes_aligned!(
        "../../../target/bpfel-unknown-none/release/schedlab"
    ))
    .map_err(|e| SetupError::Load(e.to_string()))
}

/// Initialize eBPF logger
pub fn init_ebpf_logger(bpf: &mut Ebpf) {
    if let Err(e) = EbpfLogger::init(bpf) {
        warn!("failed to initialize eBPF logger: {e}");
    }
}

/// Write the single-slot probe configuration
///
/// Must complete before any tracepoint is attached so no probe ever reads a
/// half-initialized record.
pub fn write_config(
    bpf: &mut Ebpf,
    wait_alert_ns: u64,
    filter_pid: u32,
) -> Result<(), SetupError> {
    let map = bpf
        .map_mut("CONFIG")
        .ok_or_else(|| SetupError::Config("CONFIG map not found".to_string()))?;
    let mut config: Array<_, ProbeConfig> =
        Array::try_from(map).map_err(|e| SetupError::Config(e.to_string()))?;

    let record = ProbeConfig { wait_alert_ns, filter_pid, _padding: 0 };
    config.set(0, record, 0).map_err(|e| SetupError::Config(e.to_string()))?;

    info!("probe config: wait_alert_ns={wait_alert_ns} filter_pid={filter_pid}");
    Ok(())
}

/// Attach all scheduler tracepoints
pub fn attach_probes(bpf: &mut Ebpf) -> Result<(), SetupError> {
    for name in TRACEPOINTS {
        attach_tracepoint(bpf, name)?;
    }
    Ok(())
}

fn attach_tracepoint(bpf: &mut Ebpf, name: &str) -> Result<(), SetupError> {
    let attach_err = |error: String| SetupError::Attach { tracepoint: name.to_string(), error };

    let program: &mut TracePoint = bpf
        .program_mut(name)
        .ok_or_else(|| attach_err("program not found".to_string()))?
        .try_into()
        .map_err(|e: aya::programs::ProgramError| attach_err(e.to_string()))?;
    program.load().map_err(|e| attach_err(e.to_string()))?;
    program.attach("sched", name).map_err(|e| attach_err(e.to_string()))?;

    info!("attached tracepoint: sched/{name}");
    Ok(())
}

/// Take ownership of the event ring
///
/// Records flow from the probes into this ring; dropping it before the
/// `Ebpf` object discards anything produced after the final poll.
pub fn take_event_ring(bpf: &mut Ebpf) -> Result<RingBuf<MapData>, SetupError> {
    let map = bpf
        .take_map("EVENTS")
        .ok_or_else(|| SetupError::Ring("EVENTS map not found".to_string()))?;
    RingBuf::try_from(map).map_err(|e| SetupError::Ring(e.to_string()))
}
