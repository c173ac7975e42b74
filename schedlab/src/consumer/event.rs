//! Decoding ring-buffer bytes into typed events
//!
//! The wire format is the flat `EventRecord` from `schedlab-common`; only
//! switch and fork records populate the payload fields. This module lifts
//! each record into the [`Event`] sum type so the rest of the consumer works
//! with real variants instead of a discriminant and a field soup. Fork gets
//! its own payload: on the wire it travels in the `prev_*`/`next_*` slots,
//! but nothing past this point should read a parent pid out of a field
//! called `prev_pid`.

use schedlab_common::{
    EventRecord, EVENT_EXEC, EVENT_EXIT, EVENT_FORK, EVENT_SWITCH, EVENT_WAITLONG, EVENT_WAKE,
    TASK_COMM_LEN,
};

/// Both sides of a context switch plus the derived timings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwitchInfo {
    pub prev_pid: u32,
    pub prev_comm: String,
    pub next_pid: u32,
    pub next_comm: String,
    /// On-CPU slice of the task leaving the CPU (0 when no stamp existed)
    pub run_ns: u64,
    /// Wake->run latency of the task entering the CPU (0 when no wake seen)
    pub wait_ns: u64,
    pub prev_cpu: u32,
    pub next_cpu: u32,
}

/// A process creation pair
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForkInfo {
    pub parent_pid: u32,
    pub parent_comm: String,
    pub child_pid: u32,
    pub child_comm: String,
}

/// A decoded scheduler event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// A task became runnable
    Wake { ts_ns: u64, pid: u32, comm: String },
    /// The scheduler picked a new task on some CPU
    Switch { ts_ns: u64, info: SwitchInfo },
    /// A process called exec (thread-group leader id)
    Exec { ts_ns: u64, pid: u32, comm: String },
    /// A thread-group leader exited
    Exit { ts_ns: u64, pid: u32, comm: String },
    /// A wake->run latency crossed the configured alert threshold
    WaitAlert { ts_ns: u64, pid: u32, comm: String },
    /// A process created a child
    Fork { ts_ns: u64, info: ForkInfo },
}

impl Event {
    /// Decode a wire record; `None` for an unknown kind
    #[must_use]
    pub fn decode(record: &EventRecord) -> Option<Event> {
        let ts_ns = record.ts_ns;
        let pid = record.pid;
        let comm = comm_to_string(&record.comm);

        match record.kind {
            EVENT_WAKE => Some(Event::Wake { ts_ns, pid, comm }),
            EVENT_SWITCH => Some(Event::Switch {
                ts_ns,
                info: SwitchInfo {
                    prev_pid: record.prev_pid,
                    prev_comm: comm_to_string(&record.prev_comm),
                    next_pid: record.next_pid,
                    next_comm: comm_to_string(&record.next_comm),
                    run_ns: record.run_ns,
                    wait_ns: record.wait_ns,
                    prev_cpu: record.prev_cpu,
                    next_cpu: record.next_cpu,
                },
            }),
            EVENT_EXEC => Some(Event::Exec { ts_ns, pid, comm }),
            EVENT_EXIT => Some(Event::Exit { ts_ns, pid, comm }),
            EVENT_WAITLONG => Some(Event::WaitAlert { ts_ns, pid, comm }),
            EVENT_FORK => Some(Event::Fork {
                ts_ns,
                info: ForkInfo {
                    parent_pid: record.prev_pid,
                    parent_comm: comm_to_string(&record.prev_comm),
                    child_pid: record.next_pid,
                    child_comm: comm_to_string(&record.next_comm),
                },
            }),
            _ => None,
        }
    }

    /// Timestamp of this event
    #[must_use]
    pub fn ts_ns(&self) -> u64 {
        match self {
            Event::Wake { ts_ns, .. }
            | Event::Switch { ts_ns, .. }
            | Event::Exec { ts_ns, .. }
            | Event::Exit { ts_ns, .. }
            | Event::WaitAlert { ts_ns, .. }
            | Event::Fork { ts_ns, .. } => *ts_ns,
        }
    }
}

/// Read a wire record out of a raw ring-buffer item
///
/// Returns `None` when the item is shorter than a record.
#[must_use]
pub fn record_from_bytes(bytes: &[u8]) -> Option<EventRecord> {
    if bytes.len() < std::mem::size_of::<EventRecord>() {
        return None;
    }
    // SAFETY: length checked above, and the probes only ever write valid
    // EventRecord bytes into the ring.
    #[allow(unsafe_code)]
    let record = unsafe { std::ptr::read_unaligned(bytes.as_ptr().cast::<EventRecord>()) };
    Some(record)
}

/// Task name decoded from a NUL-padded kernel comm field
#[must_use]
pub fn comm_to_string(comm: &[u8; TASK_COMM_LEN]) -> String {
    let len = comm.iter().position(|&b| b == 0).unwrap_or(TASK_COMM_LEN);
    String::from_utf8_lossy(&comm[..len]).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn comm(name: &str) -> [u8; TASK_COMM_LEN] {
        let mut buf = [0u8; TASK_COMM_LEN];
        buf[..name.len()].copy_from_slice(name.as_bytes());
        buf
    }

    #[test]
    fn test_comm_trims_at_nul() {
        assert_eq!(comm_to_string(&comm("stress-ng")), "stress-ng");
        assert_eq!(comm_to_string(&[0u8; TASK_COMM_LEN]), "");
        // No NUL at all: take the full field
        assert_eq!(comm_to_string(&[b'a'; TASK_COMM_LEN]), "a".repeat(TASK_COMM_LEN));
    }

    #[test]
    fn test_decode_wake() {
        let record = EventRecord {
            ts_ns: 1000,
            kind: EVENT_WAKE,
            pid: 42,
            comm: comm("worker"),
            ..EventRecord::default()
        };
        let event = Event::decode(&record).unwrap();
        assert_eq!(event, Event::Wake { ts_ns: 1000, pid: 42, comm: "worker".to_string() });
        assert_eq!(event.ts_ns(), 1000);
    }

    #[test]
    fn test_decode_switch_payload() {
        let record = EventRecord {
            ts_ns: 2000,
            run_ns: 150,
            wait_ns: 75,
            kind: EVENT_SWITCH,
            pid: 2,
            prev_pid: 1,
            next_pid: 2,
            prev_cpu: 3,
            next_cpu: 3,
            comm: comm("b"),
            prev_comm: comm("a"),
            next_comm: comm("b"),
        };
        match Event::decode(&record).unwrap() {
            Event::Switch { ts_ns, info } => {
                assert_eq!(ts_ns, 2000);
                assert_eq!(info.prev_pid, 1);
                assert_eq!(info.next_pid, 2);
                assert_eq!(info.prev_comm, "a");
                assert_eq!(info.next_comm, "b");
                assert_eq!(info.run_ns, 150);
                assert_eq!(info.wait_ns, 75);
                assert_eq!(info.prev_cpu, 3);
            }
            other => panic!("expected switch, got {other:?}"),
        }
    }

    #[test]
    fn test_decode_fork_has_parent_child_names() {
        let record = EventRecord {
            ts_ns: 3000,
            kind: EVENT_FORK,
            pid: 10,
            prev_pid: 10,
            next_pid: 11,
            comm: comm("parent"),
            prev_comm: comm("parent"),
            next_comm: comm("child"),
            ..EventRecord::default()
        };
        match Event::decode(&record).unwrap() {
            Event::Fork { info, .. } => {
                assert_eq!(info.parent_pid, 10);
                assert_eq!(info.child_pid, 11);
                assert_eq!(info.parent_comm, "parent");
                assert_eq!(info.child_comm, "child");
            }
            other => panic!("expected fork, got {other:?}"),
        }
    }

    #[test]
    fn test_decode_unknown_kind() {
        let record = EventRecord { kind: 99, ..EventRecord::default() };
        assert!(Event::decode(&record).is_none());
    }

    #[test]
    fn test_record_from_short_bytes() {
        let bytes = [0u8; 10];
        assert!(record_from_bytes(&bytes).is_none());
    }

    #[test]
    fn test_record_roundtrip_through_bytes() {
        let record = EventRecord {
            ts_ns: 7,
            kind: EVENT_EXIT,
            pid: 5,
            comm: comm("sh"),
            ..EventRecord::default()
        };
        // SAFETY: EventRecord is repr(C) plain data; reading it as bytes is
        // exactly what the ring transport does.
        #[allow(unsafe_code)]
        let bytes = unsafe {
            std::slice::from_raw_parts(
                std::ptr::from_ref(&record).cast::<u8>(),
                std::mem::size_of::<EventRecord>(),
            )
        };
        let back = record_from_bytes(bytes).unwrap();
        assert_eq!(back.ts_ns, 7);
        assert_eq!(back.kind, EVENT_EXIT);
        assert_eq!(back.pid, 5);
        assert_eq!(comm_to_string(&back.comm), "sh");
    }
}
