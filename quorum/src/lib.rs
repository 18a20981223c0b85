//! Vote aggregation: build polkas out of pre-votes and commits out of
//! pre-commits, wherever +2/3 of a shard agrees.

#![forbid(unsafe_code)]
#![deny(unused_crate_dependencies, trivial_casts, trivial_numeric_casts)]
#![warn(
    rustdoc::broken_intra_doc_links,
    rustdoc::private_intra_doc_links,
    variant_size_differences
)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::panic))]

pub mod commit;
pub mod polka;

pub use commit::CommitBuilder;
pub use polka::PolkaBuilder;
