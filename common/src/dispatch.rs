use crate::{Hash, Message};

/// The network layer, as seen by a replica: broadcasts signed protocol
/// messages to the peers of a shard.
pub trait Dispatcher {
    /// One-way and non-blocking. Implementations must not call back into
    /// the replica synchronously.
    fn dispatch(&self, shard_hash: Hash, message: Message);
}
