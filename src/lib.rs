//! WireGraph: connectivity resolution for wiring-harness wirelists.
//!
//! Indexes a flat list of wire records and answers, for any start connector,
//! which real connectors sit on the same circuit once solder joints and
//! inline splices are looked through. Queries run directly against an
//! [`engine::EngineState`] or through the message-passing
//! [`engine::worker::WorkerHandle`].

pub mod config;
pub mod engine;
pub mod error;
pub mod graph;
pub mod observability;
pub mod types;
