// Expose modules for testing
pub mod cli;
pub mod consumer;
pub mod domain;
pub mod output;
pub mod preflight;
pub mod probes;
