//! # SchedLab - eBPF Kernel-Side Probes
//!
//! Five tracepoint programs that observe the Linux scheduler and derive
//! per-task timing metrics inside the kernel, where both endpoints of each
//! interval are visible without a user-space round trip.
//!
//! ## Programs
//!
//! - **`sched_wakeup`**: a task became runnable. Stamps the wake time so the
//!   next switch-in can compute wake->run latency.
//! - **`sched_switch`**: the scheduler picked a new task. Joins the wake and
//!   on-CPU stamps into `wait_ns`/`run_ns`, updates aggregates, and emits a
//!   switch record (preceded by a `WAITLONG` alert when the configured
//!   threshold is crossed).
//! - **`sched_process_exec`**: records the first exec timestamp per process.
//! - **`sched_process_exit`**: drops timing stamps for the exiting leader;
//!   the aggregate survives so userspace can summarize the task.
//! - **`sched_process_fork`**: reports (parent, child) pairs.
//!
//! ## Maps
//!
//! - **`EVENTS` (RingBuf, 512 KiB)**: event stream to userspace. A failed
//!   reservation drops the record; there is no error channel from a probe.
//! - **`WAKE_AT` / `ON_CPU_AT` (HashMap<pid, ns>)**: per-task timing stamps.
//!   Per-key insert/lookup/delete are atomic.
//! - **`TASK_STATS` (HashMap<pid, TaskStats>)**: cumulative counters.
//!   Read-modify-write here is lossy under cross-CPU contention; strict
//!   accuracy would need per-task locks in the probe path.
//! - **`CONFIG` (Array<ProbeConfig>, 1 entry)**: written once by userspace
//!   before attach, read on every firing.
//!
//! Tracepoint arguments are read through the `#[repr(C)]` structs in
//! `schedlab-common`, which mirror the layouts published under
//! `/sys/kernel/debug/tracing/events/sched/*/format`.
//!
//! Handlers run on the CPU where the scheduler event fired, cannot block,
//! and must stay within the verifier's stack and instruction limits.

#![no_std]
#![no_main]
#![allow(unused_unsafe)]

use aya_ebpf::{
    helpers::{
        bpf_get_current_comm, bpf_get_current_pid_tgid, bpf_get_smp_processor_id,
        bpf_ktime_get_ns,
    },
    macros::{map, tracepoint},
    maps::{Array, HashMap, RingBuf},
    programs::TracePointContext,
    EbpfContext,
};
use schedlab_common::{
    EventRecord, ProbeConfig, SchedExitArgs, SchedForkArgs, SchedSwitchArgs, SchedWakeupArgs,
    TaskStats, EVENT_EXEC, EVENT_EXIT, EVENT_FORK, EVENT_SWITCH, EVENT_WAITLONG, EVENT_WAKE,
    RING_BYTE_SIZE, STATE_MAP_ENTRIES, TASK_COMM_LEN,
};

// ============================================================================
// eBPF Maps - Shared data structures between kernel and userspace
// ============================================================================

/// Ring buffer carrying one `EventRecord` per probe firing
#[map]
static EVENTS: RingBuf = RingBuf::with_byte_size(RING_BYTE_SIZE, 0);

/// Map: task id -> timestamp of the last wake without a switch-in yet
///
/// Written by `sched_wakeup` (unconditional overwrite), consumed by
/// `sched_switch` when the task is chosen to run, deleted on exit.
/// Absence means "no outstanding wake recorded".
#[map]
static WAKE_AT: HashMap<u32, u64> = HashMap::with_max_entries(STATE_MAP_ENTRIES, 0);

/// Map: task id -> timestamp the task last went on CPU
///
/// Overwritten on every switch-in, deleted on exit.
#[map]
static ON_CPU_AT: HashMap<u32, u64> = HashMap::with_max_entries(STATE_MAP_ENTRIES, 0);

/// Map: task id -> cumulative counters
///
/// Entries persist past exit; userspace reads the stream-derived mirror for
/// its summaries, this map keeps probe-local totals.
#[map]
static TASK_STATS: HashMap<u32, TaskStats> = HashMap::with_max_entries(STATE_MAP_ENTRIES, 0);

/// Single-slot configuration record, fully written before attach
#[map]
static CONFIG: Array<ProbeConfig> = Array::with_max_entries(1, 0);

// ============================================================================
// eBPF Program Hooks
// ============================================================================

/// Hook: sched/sched_wakeup tracepoint
#[tracepoint]
pub fn sched_wakeup(ctx: TracePointContext) -> u32 {
    match try_sched_wakeup(&ctx) {
        Ok(()) => 0,
        Err(_) => 1,
    }
}

fn try_sched_wakeup(ctx: &TracePointContext) -> Result<(), i64> {
    let args: *const SchedWakeupArgs = ctx.as_ptr() as *const SchedWakeupArgs;
    let pid = unsafe { (*args).pid as u32 };
    let now = unsafe { bpf_ktime_get_ns() };

    let cfg = config();
    if cfg.filter_pid != 0 && cfg.filter_pid != pid {
        return Ok(());
    }

    // Unconditional overwrite: an earlier unconsumed wake is replaced.
    unsafe {
        let _ = WAKE_AT.insert(&pid, &now, 0);
    }
    bump_wakeups(pid);

    let comm = unsafe { (*args).comm };
    emit_basic(EVENT_WAKE, now, pid, comm)
}

/// Hook: sched/sched_switch tracepoint
#[tracepoint]
pub fn sched_switch(ctx: TracePointContext) -> u32 {
    match try_sched_switch(&ctx) {
        Ok(()) => 0,
        Err(_) => 1,
    }
}

fn try_sched_switch(ctx: &TracePointContext) -> Result<(), i64> {
    let args: *const SchedSwitchArgs = ctx.as_ptr() as *const SchedSwitchArgs;
    let prev_pid = unsafe { (*args).prev_pid as u32 };
    let next_pid = unsafe { (*args).next_pid as u32 };
    let now = unsafe { bpf_ktime_get_ns() };

    let cfg = config();
    if cfg.filter_pid != 0 && cfg.filter_pid != prev_pid && cfg.filter_pid != next_pid {
        return Ok(());
    }

    // Run slice of the task leaving the CPU. pid 0 is the idle task and
    // carries no timing state.
    let mut run_ns = 0u64;
    if prev_pid != 0 {
        if let Some(started) = unsafe { ON_CPU_AT.get(&prev_pid).copied() } {
            run_ns = now.saturating_sub(started);
        }
    }

    // Wake->run latency of the task entering the CPU. The wake stamp is
    // consumed here so a later switch-in cannot reuse it.
    let mut wait_ns = 0u64;
    if next_pid != 0 {
        if let Some(woken) = unsafe { WAKE_AT.get(&next_pid).copied() } {
            wait_ns = now.saturating_sub(woken);
            unsafe {
                let _ = WAKE_AT.remove(&next_pid);
            }
        }
        unsafe {
            let _ = ON_CPU_AT.insert(&next_pid, &now, 0);
        }
    }

    if prev_pid != 0 {
        charge_run(prev_pid, run_ns);
    }
    if next_pid != 0 {
        charge_wait(next_pid, wait_ns);
    }

    let cpu = unsafe { bpf_get_smp_processor_id() };
    let prev_comm = unsafe { (*args).prev_comm };
    let next_comm = unsafe { (*args).next_comm };

    // The alert precedes its switch record so downstream can attribute both
    // to the same instant. Its loss must not suppress the switch itself.
    if cfg.wait_alert_ns != 0 && next_pid != 0 && wait_ns >= cfg.wait_alert_ns {
        let _ = emit_basic(EVENT_WAITLONG, now, next_pid, next_comm);
    }

    let event = EventRecord {
        ts_ns: now,
        run_ns,
        wait_ns,
        kind: EVENT_SWITCH,
        pid: next_pid,
        prev_pid,
        next_pid,
        prev_cpu: cpu,
        next_cpu: cpu,
        comm: next_comm,
        prev_comm,
        next_comm,
    };
    output(&event)
}

/// Hook: sched/sched_process_exec tracepoint
#[tracepoint]
pub fn sched_process_exec(ctx: TracePointContext) -> u32 {
    match try_sched_process_exec(&ctx) {
        Ok(()) => 0,
        Err(_) => 1,
    }
}

fn try_sched_process_exec(_ctx: &TracePointContext) -> Result<(), i64> {
    // Process-scoped lifecycle: record against the thread-group leader.
    let tgid = (unsafe { bpf_get_current_pid_tgid() } >> 32) as u32;
    let now = unsafe { bpf_ktime_get_ns() };

    let cfg = config();
    if cfg.filter_pid != 0 && cfg.filter_pid != tgid {
        return Ok(());
    }

    let mut stats = unsafe { TASK_STATS.get(&tgid).copied().unwrap_or_default() };
    if stats.first_exec_ns == 0 {
        stats.first_exec_ns = now;
    }
    unsafe {
        let _ = TASK_STATS.insert(&tgid, &stats, 0);
    }

    // The tracepoint fires after the image switch, so this is the new comm.
    let comm = bpf_get_current_comm().unwrap_or([0u8; TASK_COMM_LEN]);
    emit_basic(EVENT_EXEC, now, tgid, comm)
}

/// Hook: sched/sched_process_exit tracepoint
#[tracepoint]
pub fn sched_process_exit(ctx: TracePointContext) -> u32 {
    match try_sched_process_exit(&ctx) {
        Ok(()) => 0,
        Err(_) => 1,
    }
}

fn try_sched_process_exit(ctx: &TracePointContext) -> Result<(), i64> {
    let pid_tgid = unsafe { bpf_get_current_pid_tgid() };
    let tid = pid_tgid as u32;
    let tgid = (pid_tgid >> 32) as u32;

    // Per-process lifetime accounting only: non-leader threads are ignored.
    if tid != tgid {
        return Ok(());
    }

    let now = unsafe { bpf_ktime_get_ns() };

    let cfg = config();
    if cfg.filter_pid != 0 && cfg.filter_pid != tid {
        return Ok(());
    }

    // Drop timing stamps; the aggregate stays so userspace can still
    // summarize the task when this event arrives.
    unsafe {
        let _ = WAKE_AT.remove(&tid);
        let _ = ON_CPU_AT.remove(&tid);
    }

    let args: *const SchedExitArgs = ctx.as_ptr() as *const SchedExitArgs;
    let comm = unsafe { (*args).comm };
    emit_basic(EVENT_EXIT, now, tid, comm)
}

/// Hook: sched/sched_process_fork tracepoint
#[tracepoint]
pub fn sched_process_fork(ctx: TracePointContext) -> u32 {
    match try_sched_process_fork(&ctx) {
        Ok(()) => 0,
        Err(_) => 1,
    }
}

fn try_sched_process_fork(ctx: &TracePointContext) -> Result<(), i64> {
    let args: *const SchedForkArgs = ctx.as_ptr() as *const SchedForkArgs;
    let parent_pid = unsafe { (*args).parent_pid as u32 };
    let child_pid = unsafe { (*args).child_pid as u32 };
    let now = unsafe { bpf_ktime_get_ns() };

    let cfg = config();
    if cfg.filter_pid != 0 && cfg.filter_pid != parent_pid {
        return Ok(());
    }

    let parent_comm = unsafe { (*args).parent_comm };
    let child_comm = unsafe { (*args).child_comm };

    // No state-table writes: the child gets its own stamps once it wakes.
    let event = EventRecord {
        ts_ns: now,
        run_ns: 0,
        wait_ns: 0,
        kind: EVENT_FORK,
        pid: parent_pid,
        prev_pid: parent_pid,
        next_pid: child_pid,
        prev_cpu: 0,
        next_cpu: 0,
        comm: parent_comm,
        prev_comm: parent_comm,
        next_comm: child_comm,
    };
    output(&event)
}

// ============================================================================
// Helpers
// ============================================================================

fn config() -> ProbeConfig {
    CONFIG.get(0).copied().unwrap_or_default()
}

/// Send an event without switch payload to userspace
fn emit_basic(kind: u32, ts_ns: u64, pid: u32, comm: [u8; TASK_COMM_LEN]) -> Result<(), i64> {
    let event = EventRecord {
        ts_ns,
        run_ns: 0,
        wait_ns: 0,
        kind,
        pid,
        prev_pid: 0,
        next_pid: 0,
        prev_cpu: 0,
        next_cpu: 0,
        comm,
        prev_comm: [0u8; TASK_COMM_LEN],
        next_comm: [0u8; TASK_COMM_LEN],
    };
    output(&event)
}

/// Reserve ring space and submit; a full ring drops the record
fn output(event: &EventRecord) -> Result<(), i64> {
    unsafe { EVENTS.output(event, 0).map_err(|_| 1i64) }
}

// The TASK_STATS updates below are get/insert read-modify-write: two CPUs
// updating the same task concurrently can lose one increment. Accepted
// observer-effect cost; counters never decrease.

fn bump_wakeups(pid: u32) {
    let mut stats = unsafe { TASK_STATS.get(&pid).copied().unwrap_or_default() };
    stats.wakeups += 1;
    unsafe {
        let _ = TASK_STATS.insert(&pid, &stats, 0);
    }
}

fn charge_run(pid: u32, run_ns: u64) {
    let mut stats = unsafe { TASK_STATS.get(&pid).copied().unwrap_or_default() };
    stats.total_run_ns += run_ns;
    stats.switches += 1;
    unsafe {
        let _ = TASK_STATS.insert(&pid, &stats, 0);
    }
}

fn charge_wait(pid: u32, wait_ns: u64) {
    let mut stats = unsafe { TASK_STATS.get(&pid).copied().unwrap_or_default() };
    stats.total_wait_ns += wait_ns;
    stats.switches += 1;
    unsafe {
        let _ = TASK_STATS.insert(&pid, &stats, 0);
    }
}

#[cfg(all(not(test), target_os = "none"))]
#[panic_handler]
fn panic(_info: &core::panic::PanicInfo) -> ! {
    unsafe { core::hint::unreachable_unchecked() }
}
