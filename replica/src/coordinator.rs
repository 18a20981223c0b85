use std::collections::{BTreeMap, VecDeque};

use tracing::debug;

use cinnabar_common::{
    Commit, Dispatcher, Hash, Shard, SignedPreCommit, SignedPreVote, SignedPropose, SignerVerifier,
    Timeouts, Timestamp, TxPool,
};
use cinnabar_state::{Machine, Transition, TransitionBuffer};

use crate::Replica;

/// Number of previous shards retained for verifying cross-shard proofs.
pub const NUM_HISTORICAL_SHARDS: usize = 3;

/// Maps shard identifiers to replicas and fans ticks and inbound protocol
/// messages out to them. Shards live from [`Coordinator::begin_shard`] to
/// [`Coordinator::drop_shard`].
pub struct Coordinator<D, S, P> {
    signer: S,
    dispatcher: D,
    timeouts: Timeouts,
    replicas: BTreeMap<Hash, Replica<D, S, P>>,
    historical: VecDeque<Shard>,
    historical_limit: usize,
}

impl<D, S, P> Coordinator<D, S, P>
where
    D: Dispatcher + Clone,
    S: SignerVerifier + Clone,
    P: TxPool,
{
    pub fn new(signer: S, dispatcher: D) -> Self {
        Self::with_timeouts(signer, dispatcher, Timeouts::default())
    }

    pub fn with_timeouts(signer: S, dispatcher: D, timeouts: Timeouts) -> Self {
        Self {
            signer,
            dispatcher,
            timeouts,
            replicas: BTreeMap::new(),
            historical: VecDeque::new(),
            historical_limit: NUM_HISTORICAL_SHARDS,
        }
    }

    /// Override how many previous shards are retained.
    pub fn with_historical_limit(mut self, limit: usize) -> Self {
        self.historical_limit = limit;
        self.historical.truncate(limit);
        self
    }

    /// Start a replica for `shard`, drawing proposals from `pool` on top of
    /// `head` (`None` for a fresh chain). A second begin for the same shard
    /// is ignored.
    pub fn begin_shard(&mut self, shard: Shard, previous_shard: Shard, head: Option<Commit>, pool: P) {
        if self.replicas.contains_key(&shard.hash) {
            debug!(shard = %shard.hash, "Shard already running, ignoring");
            return;
        }

        let machine = Machine::new(
            self.signer.clone(),
            shard.clone(),
            pool,
            head,
            self.timeouts,
        );
        let buffer = TransitionBuffer::new(shard.size());
        let mut replica = Replica::new(
            self.dispatcher.clone(),
            machine,
            buffer,
            shard.clone(),
            previous_shard.clone(),
        );

        self.retain(previous_shard);
        replica.init();
        self.replicas.insert(shard.hash, replica);
    }

    /// Mark a shard as ending: its replica will only pre-vote for
    /// end-of-shard blocks from now on.
    pub fn end_shard(&mut self, shard_hash: Hash) {
        if let Some(replica) = self.replicas.get_mut(&shard_hash) {
            replica.mark_ending();
        }
    }

    /// Remove a shard's replica entirely.
    pub fn drop_shard(&mut self, shard_hash: Hash) {
        self.replicas.remove(&shard_hash);
    }

    /// Fast-forward one shard from an externally provided commit proof.
    pub fn sync(&mut self, shard_hash: Hash, commit: &Commit) -> bool {
        match self.replicas.get_mut(&shard_hash) {
            Some(replica) => replica.sync(commit),
            None => false,
        }
    }

    /// Fan one wall-clock instant out to every replica.
    pub fn accept_tick(&mut self, time: Timestamp) {
        for replica in self.replicas.values_mut() {
            replica.transition(Transition::Ticked(time));
        }
    }

    pub fn accept_propose(&mut self, shard_hash: Hash, propose: SignedPropose) {
        if let Some(replica) = self.replicas.get_mut(&shard_hash) {
            replica.transition(Transition::Proposed(propose));
        }
    }

    pub fn accept_pre_vote(&mut self, shard_hash: Hash, pre_vote: SignedPreVote) {
        if let Some(replica) = self.replicas.get_mut(&shard_hash) {
            replica.transition(Transition::PreVoted(pre_vote));
        }
    }

    pub fn accept_pre_commit(&mut self, shard_hash: Hash, pre_commit: SignedPreCommit) {
        if let Some(replica) = self.replicas.get_mut(&shard_hash) {
            replica.transition(Transition::PreCommitted(pre_commit));
        }
    }

    pub fn replica(&self, shard_hash: &Hash) -> Option<&Replica<D, S, P>> {
        self.replicas.get(shard_hash)
    }

    /// A retained previous shard, if it has not aged out.
    pub fn historical_shard(&self, shard_hash: &Hash) -> Option<&Shard> {
        self.historical.iter().find(|shard| shard.hash == *shard_hash)
    }

    fn retain(&mut self, shard: Shard) {
        if self.historical.iter().any(|s| s.hash == shard.hash) {
            return;
        }
        self.historical.push_back(shard);
        while self.historical.len() > self.historical_limit {
            self.historical.pop_front();
        }
    }
}
