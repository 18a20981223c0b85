//! Common datatypes and interfaces for the Cinnabar consensus engine.

#![forbid(unsafe_code)]
#![deny(unused_crate_dependencies, trivial_casts, trivial_numeric_casts)]
#![warn(
    rustdoc::broken_intra_doc_links,
    rustdoc::private_intra_doc_links,
    variant_size_differences
)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::panic))]

mod block;
mod commit;
mod dispatch;
mod hash;
mod height;
mod message;
mod polka;
mod pool;
mod precommit;
mod prevote;
mod propose;
mod round;
mod shard;
mod sig;
mod time;
mod timeouts;
mod transaction;
mod wire;

pub use block::*;
pub use commit::*;
pub use dispatch::*;
pub use hash::*;
pub use height::*;
pub use message::*;
pub use polka::*;
pub use pool::*;
pub use precommit::*;
pub use prevote::*;
pub use propose::*;
pub use round::*;
pub use shard::*;
pub use sig::*;
pub use time::*;
pub use timeouts::*;
pub use transaction::*;
pub use wire::*;
