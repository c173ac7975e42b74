//! Row rendering for each projection
//!
//! One function per mode, returning `None` for event kinds the mode ignores.
//! CSV columns follow the fixed schemas in the interface contract; the human
//! form favors readable units over alignment.

// Time conversions intentionally lose precision for display purposes
#![allow(clippy::cast_precision_loss)]

use crate::consumer::aggregate::AggregateTable;
use crate::consumer::event::Event;
use crate::domain::{Nanos, Timestamp};

use super::{Mode, OutputFormat};

/// Render one event under the active projection
///
/// Returns the finished row without a trailing newline, or `None` when this
/// mode does not react to the event kind.
#[must_use]
pub fn render(
    mode: Mode,
    format: OutputFormat,
    event: &Event,
    table: &AggregateTable,
) -> Option<String> {
    match mode {
        Mode::Stream => Some(stream_row(format, event)),
        Mode::Latency => latency_row(format, event),
        Mode::Fairness => fairness_row(format, event, table),
        Mode::Ctx => ctx_row(format, event),
        Mode::Timeline => timeline_row(format, event),
        Mode::Shortlong => shortlong_row(format, event, table),
        Mode::Starvation => starvation_row(format, event),
        Mode::Fork => fork_row(format, event),
    }
}

fn kind_label(event: &Event) -> &'static str {
    match event {
        Event::Wake { .. } => "wake",
        Event::Switch { .. } => "switch",
        Event::Exec { .. } => "exec",
        Event::Exit { .. } => "exit",
        Event::WaitAlert { .. } => "waitlong",
        Event::Fork { .. } => "fork",
    }
}

fn stream_row(format: OutputFormat, event: &Event) -> String {
    match (format, event) {
        (OutputFormat::Csv, Event::Switch { ts_ns, info }) => format!(
            "{},switch,{},{},{},{},{},{}",
            ts_ns, info.next_pid, info.next_comm, info.prev_pid, info.next_pid, info.run_ns,
            info.wait_ns
        ),
        // Non-switch events leave the payload columns empty.
        (OutputFormat::Csv, Event::Fork { ts_ns, info }) => {
            format!("{},fork,{},{},,,,", ts_ns, info.parent_pid, info.parent_comm)
        }
        (
            OutputFormat::Csv,
            Event::Wake { ts_ns, pid, comm }
            | Event::Exec { ts_ns, pid, comm }
            | Event::Exit { ts_ns, pid, comm }
            | Event::WaitAlert { ts_ns, pid, comm },
        ) => {
            format!("{},{},{},{},,,,", ts_ns, kind_label(event), pid, comm)
        }
        (OutputFormat::Human, Event::Switch { ts_ns, info }) => format!(
            "[{}] SWITCH   {}({}) -> {}({}) run={} wait={} cpu {}->{}",
            Timestamp(*ts_ns),
            info.prev_pid,
            info.prev_comm,
            info.next_pid,
            info.next_comm,
            Nanos(info.run_ns),
            Nanos(info.wait_ns),
            info.prev_cpu,
            info.next_cpu
        ),
        (OutputFormat::Human, Event::Fork { ts_ns, info }) => format!(
            "[{}] FORK     parent={}({}) child={}({})",
            Timestamp(*ts_ns),
            info.parent_pid,
            info.parent_comm,
            info.child_pid,
            info.child_comm
        ),
        (
            OutputFormat::Human,
            Event::Wake { ts_ns, pid, comm }
            | Event::Exec { ts_ns, pid, comm }
            | Event::Exit { ts_ns, pid, comm }
            | Event::WaitAlert { ts_ns, pid, comm },
        ) => {
            let label = match event {
                Event::Wake { .. } => "WAKE",
                Event::Exec { .. } => "EXEC",
                Event::Exit { .. } => "EXIT",
                _ => "WAITLONG",
            };
            format!("[{}] {:<8} pid={} ({})", Timestamp(*ts_ns), label, pid, comm)
        }
    }
}

fn latency_row(format: OutputFormat, event: &Event) -> Option<String> {
    let Event::Switch { ts_ns, info } = event else {
        return None;
    };
    Some(match format {
        OutputFormat::Csv => format!("{},{},{}", ts_ns, info.next_pid, info.wait_ns),
        OutputFormat::Human => format!(
            "[{}] pid={} ({}) latency={}",
            Timestamp(*ts_ns),
            info.next_pid,
            info.next_comm,
            Nanos(info.wait_ns)
        ),
    })
}

fn fairness_row(format: OutputFormat, event: &Event, table: &AggregateTable) -> Option<String> {
    let Event::Switch { info, .. } = event else {
        return None;
    };
    if info.next_pid == 0 {
        return None;
    }
    // The aggregate exists: the table is updated before the projection runs.
    let task = table.get(info.next_pid)?;
    Some(match format {
        OutputFormat::Csv => format!(
            "{},{:.3},{:.3},{}",
            info.next_pid,
            Nanos(task.total_run_ns).as_millis(),
            Nanos(task.total_wait_ns).as_millis(),
            task.switches
        ),
        OutputFormat::Human => format!(
            "pid={} ({}) run={:.3}ms wait={:.3}ms switches={}",
            info.next_pid,
            task.comm,
            Nanos(task.total_run_ns).as_millis(),
            Nanos(task.total_wait_ns).as_millis(),
            task.switches
        ),
    })
}

fn ctx_row(format: OutputFormat, event: &Event) -> Option<String> {
    let Event::Switch { ts_ns, info } = event else {
        return None;
    };
    Some(match format {
        OutputFormat::Csv => {
            format!("{},{},{},{}", ts_ns, info.prev_pid, info.next_pid, info.run_ns)
        }
        OutputFormat::Human => format!(
            "[{}] {}({}) -> {}({}) run={}",
            Timestamp(*ts_ns),
            info.prev_pid,
            info.prev_comm,
            info.next_pid,
            info.next_comm,
            Nanos(info.run_ns)
        ),
    })
}

fn timeline_row(format: OutputFormat, event: &Event) -> Option<String> {
    match event {
        Event::Switch { ts_ns, info } => Some(match format {
            OutputFormat::Csv => {
                format!("{},{},switch,{},{}", ts_ns, info.next_pid, info.wait_ns, info.run_ns)
            }
            OutputFormat::Human => format!(
                "[{}] switch   pid={} wait={} run_prev={}",
                Timestamp(*ts_ns),
                info.next_pid,
                Nanos(info.wait_ns),
                Nanos(info.run_ns)
            ),
        }),
        Event::Wake { ts_ns, pid, .. }
        | Event::Exec { ts_ns, pid, .. }
        | Event::Exit { ts_ns, pid, .. } => {
            let label = kind_label(event);
            Some(match format {
                OutputFormat::Csv => format!("{ts_ns},{pid},{label},,"),
                OutputFormat::Human => {
                    format!("[{}] {:<8} pid={}", Timestamp(*ts_ns), label, pid)
                }
            })
        }
        Event::WaitAlert { .. } | Event::Fork { .. } => None,
    }
}

fn shortlong_row(format: OutputFormat, event: &Event, table: &AggregateTable) -> Option<String> {
    let Event::Exit { pid, comm, .. } = event else {
        return None;
    };
    let task = table.get(*pid)?;
    let lifetime_ms = Nanos(task.lifetime_ns()).as_millis();
    Some(match format {
        OutputFormat::Csv => {
            format!("{},{:.3},{},{}", pid, lifetime_ms, task.wakeups, task.switches)
        }
        OutputFormat::Human => format!(
            "pid={pid} ({comm}) lifetime={lifetime_ms:.3}ms wakes={} switches={}",
            task.wakeups, task.switches
        ),
    })
}

fn starvation_row(format: OutputFormat, event: &Event) -> Option<String> {
    let Event::WaitAlert { ts_ns, pid, comm } = event else {
        return None;
    };
    Some(match format {
        OutputFormat::Csv => format!("{ts_ns},{pid},wait_alert"),
        OutputFormat::Human => {
            format!("[{}] wait_alert pid={} ({})", Timestamp(*ts_ns), pid, comm)
        }
    })
}

fn fork_row(format: OutputFormat, event: &Event) -> Option<String> {
    let Event::Fork { ts_ns, info } = event else {
        return None;
    };
    Some(match format {
        OutputFormat::Csv => format!("{},{},{}", ts_ns, info.parent_pid, info.child_pid),
        OutputFormat::Human => format!(
            "[{}] parent={}({}) -> child={}({})",
            Timestamp(*ts_ns),
            info.parent_pid,
            info.parent_comm,
            info.child_pid,
            info.child_comm
        ),
    })
}
