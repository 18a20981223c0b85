//! The replica harness: verifies inbound protocol messages, buffers them
//! until the state machine is ready, and broadcasts the resulting actions.
//! The [`Coordinator`] multiplexes ticks and messages across the replicas
//! of many shards.

#![forbid(unsafe_code)]
#![deny(unused_crate_dependencies, trivial_casts, trivial_numeric_casts)]
#![warn(
    rustdoc::broken_intra_doc_links,
    rustdoc::private_intra_doc_links,
    variant_size_differences
)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::panic))]

pub mod coordinator;
pub mod replica;

pub use coordinator::{Coordinator, NUM_HISTORICAL_SHARDS};
pub use replica::Replica;
