#![no_std]

// Shared data structures between eBPF and userspace

/// Event kinds carried in [`EventRecord::kind`]
pub const EVENT_WAKE: u32 = 1; // task became runnable
pub const EVENT_SWITCH: u32 = 2; // scheduler picked a new task
pub const EVENT_EXEC: u32 = 3; // process called exec
pub const EVENT_EXIT: u32 = 4; // thread-group leader exited
pub const EVENT_FORK: u32 = 5; // process created a child
pub const EVENT_WAITLONG: u32 = 6; // wake->run latency crossed the alert threshold

/// Length of a kernel task command string (TASK_COMM_LEN)
pub const TASK_COMM_LEN: usize = 16;

/// Ring buffer capacity shared between kernel and userspace
pub const RING_BYTE_SIZE: u32 = 512 * 1024;

/// Capacity of the per-task timing state maps
pub const STATE_MAP_ENTRIES: u32 = 131_072;

/// Event sent from eBPF to userspace
///
/// One fixed-size record per probe firing. The `prev_*`/`next_*`/`run_ns`/
/// `wait_ns` payload is meaningful only for `EVENT_SWITCH`; `EVENT_FORK`
/// carries the parent in `prev_pid`/`prev_comm` and the child in
/// `next_pid`/`next_comm`. Field order keeps the struct free of implicit
/// padding (96 bytes).
#[repr(C)]
#[derive(Clone, Copy, Default)]
pub struct EventRecord {
    pub ts_ns: u64,   // Timestamp in nanoseconds (bpf_ktime_get_ns)
    pub run_ns: u64,  // On-CPU slice of the task leaving the CPU (switch only)
    pub wait_ns: u64, // Wake->run latency of the task entering the CPU (switch only)
    pub kind: u32,    // Event kind (see constants above)
    pub pid: u32,     // Primary task id for this event
    pub prev_pid: u32,
    pub next_pid: u32,
    pub prev_cpu: u32,
    pub next_cpu: u32,
    pub comm: [u8; TASK_COMM_LEN], // Primary task name, NUL-padded
    pub prev_comm: [u8; TASK_COMM_LEN],
    pub next_comm: [u8; TASK_COMM_LEN],
}

/// Per-task cumulative counters maintained by the probes
///
/// Read-modify-write on an entry is not atomic across CPUs; a small fraction
/// of updates may be lost under contention. Counters only ever grow.
#[repr(C)]
#[derive(Clone, Copy, Default)]
pub struct TaskStats {
    pub total_run_ns: u64,  // Cumulative on-CPU time
    pub total_wait_ns: u64, // Cumulative wake->run wait time
    pub switches: u64,      // Switches with this task on either side
    pub wakeups: u64,       // Wakeups observed
    pub first_exec_ns: u64, // First exec timestamp (0 = not seen)
}

/// Probe configuration, written once by userspace before attach
///
/// Lives in a one-entry array map so every firing reads a single slot.
/// A zero value disables the corresponding knob.
#[repr(C)]
#[derive(Clone, Copy, Default)]
pub struct ProbeConfig {
    pub wait_alert_ns: u64, // Emit EVENT_WAITLONG when wait_ns >= this (0 = off)
    pub filter_pid: u32,    // Only trace this task id (0 = trace everything)
    #[allow(clippy::pub_underscore_fields)]
    pub _padding: u32,
}

/// Tracepoint arguments for `sched_wakeup`
/// Layout from `/sys/kernel/debug/tracing/events/sched/sched_wakeup/format`
#[repr(C)]
pub struct SchedWakeupArgs {
    #[allow(clippy::pub_underscore_fields)]
    pub __unused__: u64,
    pub comm: [u8; TASK_COMM_LEN],
    pub pid: i32,
    pub prio: i32,
    pub target_cpu: i32,
}

/// Tracepoint arguments for `sched_switch`
/// Layout from `/sys/kernel/debug/tracing/events/sched/sched_switch/format`
#[repr(C)]
pub struct SchedSwitchArgs {
    #[allow(clippy::pub_underscore_fields)]
    pub __unused__: u64,
    pub prev_comm: [u8; TASK_COMM_LEN],
    pub prev_pid: i32,
    pub prev_prio: i32,
    pub prev_state: i64,
    pub next_comm: [u8; TASK_COMM_LEN],
    pub next_pid: i32,
    pub next_prio: i32,
}

/// Tracepoint arguments for `sched_process_fork`
/// Layout from `/sys/kernel/debug/tracing/events/sched/sched_process_fork/format`
#[repr(C)]
pub struct SchedForkArgs {
    #[allow(clippy::pub_underscore_fields)]
    pub __unused__: u64,
    pub parent_comm: [u8; TASK_COMM_LEN],
    pub parent_pid: i32,
    pub child_comm: [u8; TASK_COMM_LEN],
    pub child_pid: i32,
}

/// Tracepoint arguments for `sched_process_exit`
/// Layout from `/sys/kernel/debug/tracing/events/sched/sched_process_exit/format`
#[repr(C)]
pub struct SchedExitArgs {
    #[allow(clippy::pub_underscore_fields)]
    pub __unused__: u64,
    pub comm: [u8; TASK_COMM_LEN],
    pub pid: i32,
    pub prio: i32,
}

#[cfg(feature = "user")]
use aya::Pod;

// These unsafe impls are required for eBPF <-> userspace communication
// Pod trait ensures types can be safely transmitted as plain bytes
#[cfg(feature = "user")]
#[allow(unsafe_code)]
unsafe impl Pod for EventRecord {}

#[cfg(feature = "user")]
#[allow(unsafe_code)]
unsafe impl Pod for TaskStats {}

#[cfg(feature = "user")]
#[allow(unsafe_code)]
unsafe impl Pod for ProbeConfig {}
