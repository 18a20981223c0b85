//! The per-shard state machine: consumes [`Transition`]s, drives the
//! Propose → PreVote → PreCommit → Commit phases of each height, and emits
//! [`Action`]s for the harness to broadcast.

#![forbid(unsafe_code)]
#![deny(unused_crate_dependencies, trivial_casts, trivial_numeric_casts)]
#![warn(
    rustdoc::broken_intra_doc_links,
    rustdoc::private_intra_doc_links,
    variant_size_differences
)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::panic))]

pub mod action;
pub mod buffer;
pub mod machine;
pub mod transition;

pub use action::Action;
pub use buffer::TransitionBuffer;
pub use machine::{Machine, Phase, State};
pub use transition::Transition;
