//! Stream-derived per-task aggregates
//!
//! The probes keep their own counters in a kernel map, but ring overflow can
//! drop records, so the consumer folds the stream it actually received into
//! this table and treats it as authoritative for all mode output.

use std::collections::HashMap;

use super::event::Event;

/// Cumulative counters for one task id
#[derive(Debug, Clone, Default)]
pub struct TaskAggregate {
    /// Most recently observed task name
    pub comm: String,
    /// Cumulative on-CPU time
    pub total_run_ns: u64,
    /// Cumulative wake->run wait time
    pub total_wait_ns: u64,
    /// Switches with this task on either side
    pub switches: u64,
    /// Wakeups observed
    pub wakeups: u64,
    /// First observed exec (0 = the task exec'd before attach)
    pub first_exec_ns: u64,
    /// First event of any kind for this task
    pub first_seen_ns: u64,
    /// Most recent event for this task
    pub last_seen_ns: u64,
}

impl TaskAggregate {
    /// Lifetime from exec to the most recent event
    ///
    /// Tasks that exec'd before attach have no exec timestamp; their first
    /// sighting stands in so an exit summary always has a value.
    #[must_use]
    pub fn lifetime_ns(&self) -> u64 {
        let born = if self.first_exec_ns != 0 { self.first_exec_ns } else { self.first_seen_ns };
        self.last_seen_ns.saturating_sub(born)
    }
}

/// Task-id-keyed aggregate table
///
/// Allocation is unbounded across a run and entries are never evicted, so an
/// exit event can always find the task it summarizes. Aggregates are keyed
/// by raw kernel id; id reuse within one run conflates the successive tasks.
#[derive(Debug, Default)]
pub struct AggregateTable {
    tasks: HashMap<u32, TaskAggregate>,
}

impl AggregateTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn get(&self, pid: u32) -> Option<&TaskAggregate> {
        self.tasks.get(&pid)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Fold one event into the table
    pub fn apply(&mut self, event: &Event) {
        match event {
            Event::Wake { ts_ns, pid, comm } => {
                self.touch(*pid, comm, *ts_ns).wakeups += 1;
            }
            Event::Switch { ts_ns, info } => {
                // pid 0 is the idle task: no aggregate on either side.
                if info.prev_pid != 0 {
                    let task = self.touch(info.prev_pid, &info.prev_comm, *ts_ns);
                    task.total_run_ns += info.run_ns;
                    task.switches += 1;
                }
                if info.next_pid != 0 {
                    let task = self.touch(info.next_pid, &info.next_comm, *ts_ns);
                    task.total_wait_ns += info.wait_ns;
                    task.switches += 1;
                }
            }
            Event::Exec { ts_ns, pid, comm } => {
                let task = self.touch(*pid, comm, *ts_ns);
                if task.first_exec_ns == 0 {
                    task.first_exec_ns = *ts_ns;
                }
            }
            Event::Exit { ts_ns, pid, comm } | Event::WaitAlert { ts_ns, pid, comm } => {
                self.touch(*pid, comm, *ts_ns);
            }
            Event::Fork { ts_ns, info } => {
                // Parent bookkeeping only; the child enters the table
                // through its own wake and switch events.
                self.touch(info.parent_pid, &info.parent_comm, *ts_ns);
            }
        }
    }

    fn touch(&mut self, pid: u32, comm: &str, ts_ns: u64) -> &mut TaskAggregate {
        let task = self.tasks.entry(pid).or_default();
        if task.first_seen_ns == 0 {
            task.first_seen_ns = ts_ns;
        }
        task.last_seen_ns = task.last_seen_ns.max(ts_ns);
        if !comm.is_empty() {
            comm.clone_into(&mut task.comm);
        }
        task
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consumer::event::SwitchInfo;

    fn switch(ts_ns: u64, prev: u32, next: u32, run_ns: u64, wait_ns: u64) -> Event {
        Event::Switch {
            ts_ns,
            info: SwitchInfo {
                prev_pid: prev,
                prev_comm: format!("task{prev}"),
                next_pid: next,
                next_comm: format!("task{next}"),
                run_ns,
                wait_ns,
                prev_cpu: 0,
                next_cpu: 0,
            },
        }
    }

    #[test]
    fn test_switch_charges_both_sides() {
        let mut table = AggregateTable::new();
        table.apply(&switch(100, 1, 2, 40, 15));

        let prev = table.get(1).unwrap();
        assert_eq!(prev.total_run_ns, 40);
        assert_eq!(prev.total_wait_ns, 0);
        assert_eq!(prev.switches, 1);

        let next = table.get(2).unwrap();
        assert_eq!(next.total_wait_ns, 15);
        assert_eq!(next.total_run_ns, 0);
        assert_eq!(next.switches, 1);
    }

    #[test]
    fn test_idle_task_gets_no_aggregate() {
        let mut table = AggregateTable::new();
        table.apply(&switch(100, 0, 2, 0, 5));
        table.apply(&switch(200, 2, 0, 50, 0));

        assert!(table.get(0).is_none());
        let task = table.get(2).unwrap();
        assert_eq!(task.total_run_ns, 50);
        assert_eq!(task.total_wait_ns, 5);
        assert_eq!(task.switches, 2);
    }

    #[test]
    fn test_wakeups_accumulate() {
        let mut table = AggregateTable::new();
        for ts in [10, 20, 30] {
            table.apply(&Event::Wake { ts_ns: ts, pid: 7, comm: "w".to_string() });
        }
        assert_eq!(table.get(7).unwrap().wakeups, 3);
    }

    #[test]
    fn test_first_exec_is_sticky() {
        let mut table = AggregateTable::new();
        table.apply(&Event::Exec { ts_ns: 500, pid: 3, comm: "a".to_string() });
        table.apply(&Event::Exec { ts_ns: 900, pid: 3, comm: "b".to_string() });

        let task = table.get(3).unwrap();
        assert_eq!(task.first_exec_ns, 500);
        // Latest name wins
        assert_eq!(task.comm, "b");
    }

    #[test]
    fn test_exit_keeps_the_entry() {
        let mut table = AggregateTable::new();
        table.apply(&Event::Exec { ts_ns: 100, pid: 4, comm: "job".to_string() });
        table.apply(&switch(150, 4, 0, 30, 0));
        table.apply(&Event::Exit { ts_ns: 2100, pid: 4, comm: "job".to_string() });

        let task = table.get(4).expect("exit must not evict the aggregate");
        assert_eq!(task.lifetime_ns(), 2000);
        assert_eq!(task.switches, 1);
    }

    #[test]
    fn test_lifetime_falls_back_to_first_sighting() {
        let mut table = AggregateTable::new();
        // No exec observed: the task predates attach.
        table.apply(&Event::Wake { ts_ns: 300, pid: 9, comm: "old".to_string() });
        table.apply(&Event::Exit { ts_ns: 800, pid: 9, comm: "old".to_string() });

        assert_eq!(table.get(9).unwrap().lifetime_ns(), 500);
    }

    #[test]
    fn test_fork_touches_parent_only() {
        use crate::consumer::event::ForkInfo;

        let mut table = AggregateTable::new();
        table.apply(&Event::Fork {
            ts_ns: 50,
            info: ForkInfo {
                parent_pid: 1,
                parent_comm: "init".to_string(),
                child_pid: 2,
                child_comm: "init".to_string(),
            },
        });

        assert!(table.get(1).is_some());
        assert!(table.get(2).is_none());
    }
}
