//! User-space event consumption
//!
//! Takes raw ring-buffer items, decodes them, folds them into the aggregate
//! table, and hands each event to the active projection. The table is
//! updated before the projection runs so modes that read running totals
//! (fairness, shortlong) always see the current event included.

pub mod aggregate;
pub mod event;

pub use aggregate::{AggregateTable, TaskAggregate};
pub use event::{Event, ForkInfo, SwitchInfo};

use std::io::{self, Write};

use log::warn;

use crate::output::{render, Mode, OutputFormat};

/// Consumes decoded events and drives one projection
pub struct EventConsumer<W: Write> {
    mode: Mode,
    format: OutputFormat,
    table: AggregateTable,
    out: W,

    /// Events decoded and processed
    pub event_count: u64,
    /// Ring items shorter than a wire record (dropped)
    pub short_reads: u64,
}

impl<W: Write> EventConsumer<W> {
    /// Create a consumer, emitting the mode-keyed CSV header when requested
    ///
    /// The header is written eagerly so it precedes every data row even if
    /// the run ends before any event arrives.
    pub fn new(mode: Mode, format: OutputFormat, csv_header: bool, mut out: W) -> io::Result<Self> {
        if csv_header && format == OutputFormat::Csv {
            writeln!(out, "{}", mode.csv_header())?;
        }
        Ok(Self {
            mode,
            format,
            table: AggregateTable::new(),
            out,
            event_count: 0,
            short_reads: 0,
        })
    }

    /// Decode and process one raw ring-buffer item
    pub fn consume_raw(&mut self, bytes: &[u8]) -> io::Result<()> {
        let Some(record) = event::record_from_bytes(bytes) else {
            self.short_reads += 1;
            warn!("received incomplete event ({} bytes)", bytes.len());
            return Ok(());
        };
        let Some(decoded) = Event::decode(&record) else {
            warn!("unknown event kind: {}", record.kind);
            return Ok(());
        };
        self.process(&decoded)
    }

    /// Process one decoded event: aggregate first, projection second
    pub fn process(&mut self, event: &Event) -> io::Result<()> {
        self.event_count += 1;
        self.table.apply(event);
        if let Some(row) = render(self.mode, self.format, event, &self.table) {
            writeln!(self.out, "{row}")?;
        }
        Ok(())
    }

    /// Flush buffered rows to the sink
    pub fn flush(&mut self) -> io::Result<()> {
        self.out.flush()
    }

    /// The stream-derived aggregate table
    #[must_use]
    pub fn table(&self) -> &AggregateTable {
        &self.table
    }

    /// Give back the sink (used by tests to inspect the output)
    pub fn into_inner(self) -> W {
        self.out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use schedlab_common::{EventRecord, EVENT_WAKE};

    fn consumer(mode: Mode, header: bool) -> EventConsumer<Vec<u8>> {
        EventConsumer::new(mode, OutputFormat::Csv, header, Vec::new()).unwrap()
    }

    #[test]
    fn test_header_written_once_before_rows() {
        let mut c = consumer(Mode::Latency, true);
        c.process(&Event::Wake { ts_ns: 1, pid: 2, comm: "w".to_string() }).unwrap();
        let out = String::from_utf8(c.into_inner()).unwrap();
        // Wake produces no latency row, but the header is already there.
        assert_eq!(out, "ts_ns,pid,latency_ns\n");
    }

    #[test]
    fn test_no_header_by_default() {
        let c = consumer(Mode::Latency, false);
        assert!(c.into_inner().is_empty());
    }

    #[test]
    fn test_header_suppressed_for_human_format() {
        let c = EventConsumer::new(Mode::Latency, OutputFormat::Human, true, Vec::new()).unwrap();
        assert!(c.into_inner().is_empty());
    }

    #[test]
    fn test_short_item_is_counted_not_fatal() {
        let mut c = consumer(Mode::Stream, false);
        c.consume_raw(&[0u8; 4]).unwrap();
        assert_eq!(c.short_reads, 1);
        assert_eq!(c.event_count, 0);
    }

    #[test]
    fn test_unknown_kind_is_skipped() {
        let mut c = consumer(Mode::Stream, false);
        let record = EventRecord { kind: 250, ..EventRecord::default() };
        // SAFETY: plain repr(C) data viewed as bytes, as on the ring.
        #[allow(unsafe_code)]
        let bytes = unsafe {
            std::slice::from_raw_parts(
                std::ptr::from_ref(&record).cast::<u8>(),
                std::mem::size_of::<EventRecord>(),
            )
        };
        c.consume_raw(bytes).unwrap();
        assert_eq!(c.event_count, 0);
        assert!(c.into_inner().is_empty());
    }

    #[test]
    fn test_events_update_table_and_count() {
        let mut c = consumer(Mode::Stream, false);
        let mut record = EventRecord { ts_ns: 10, kind: EVENT_WAKE, pid: 9, ..EventRecord::default() };
        record.comm[..3].copy_from_slice(b"cat");
        // SAFETY: as above.
        #[allow(unsafe_code)]
        let bytes = unsafe {
            std::slice::from_raw_parts(
                std::ptr::from_ref(&record).cast::<u8>(),
                std::mem::size_of::<EventRecord>(),
            )
        };
        c.consume_raw(bytes).unwrap();
        assert_eq!(c.event_count, 1);
        assert_eq!(c.table().get(9).unwrap().wakeups, 1);
    }
}
