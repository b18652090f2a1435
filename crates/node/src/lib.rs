//! Chord node: configuration, logging and an in-process ring runner on top of `chord-core`.
//!
//! - [Config](crate::config::Config) describes a ring in YAML: identifier width, members and the
//!   keys to resolve.
//! - [RingSimulation](crate::simulation::RingSimulation) builds that ring member by member and
//!   checks it against the brute force oracle after each join.
//! - [init_logging](crate::logging::init_logging) installs the `tracing` subscriber used by the
//!   `chord` binary.
pub mod config;
pub mod error;
pub mod logging;
pub mod simulation;
#[cfg(test)]
mod tests;
pub mod util;
