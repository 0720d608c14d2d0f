//! Core types for the bday ecosystem.
//!
//! This crate provides everything that does not talk to the network:
//! - `Event` and related types for birthday events
//! - `reconcile` for the four-way diff between file and remote events
//! - `reader` for the plain-text birthday file format
//! - `config` for settings shared by the CLI and the provider

pub mod config;
pub mod error;
pub mod event;
pub mod reader;
pub mod reconcile;
pub mod remote;
pub mod zodiac;

pub use config::{Config, EventSettings};
pub use error::{BdayError, BdayResult};
pub use event::{Event, EventSource, Signature, SortKey, UNKNOWN_YEAR};
pub use reconcile::{compare, DuplicatePolicy, Reconciliation};
pub use remote::RemoteEvent;
pub use zodiac::Zodiac;
