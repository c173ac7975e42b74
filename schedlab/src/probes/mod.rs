//! Probe lifecycle: load, configure, attach, and hand over the event ring

pub mod ebpf_setup;

pub use ebpf_setup::{
    attach_probes, init_ebpf_logger, load_probes, take_event_ring, write_config,
};
