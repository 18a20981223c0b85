use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

use tracing::debug;

use cinnabar_common::{Hash, Height, Polka, Round, Signatory, SignedPreVote};

/// Collects signed pre-votes by (height, round, signatory) and builds a
/// [`Polka`] wherever some round holds enough agreeing votes.
#[derive(Clone, Debug, Default)]
pub struct PolkaBuilder {
    pre_votes: BTreeMap<Height, BTreeMap<Round, BTreeMap<Signatory, SignedPreVote>>>,
}

impl PolkaBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a pre-vote. Returns true iff it is novel for its
    /// (height, round, signatory); a duplicate leaves the builder unchanged.
    ///
    /// Panics if the pre-vote's block height disagrees with the pre-vote
    /// height. The harness filters such messages before they get here; one
    /// slipping through is a caller bug, not an adversary.
    pub fn insert(&mut self, pre_vote: SignedPreVote) -> bool {
        if let Some(block) = &pre_vote.pre_vote.block {
            assert!(
                block.height == pre_vote.pre_vote.height,
                "pre-vote height ({}) must equal its block height ({})",
                pre_vote.pre_vote.height,
                block.height,
            );
        }

        let slot = self
            .pre_votes
            .entry(pre_vote.pre_vote.height)
            .or_default()
            .entry(pre_vote.pre_vote.round)
            .or_default();

        match slot.entry(pre_vote.signatory) {
            Entry::Vacant(entry) => {
                entry.insert(pre_vote);
                true
            }
            Entry::Occupied(_) => {
                debug!(signatory = %pre_vote.signatory, "Duplicate pre-vote, ignoring");
                false
            }
        }
    }

    /// Scan every round recorded at `height`.
    ///
    /// The first value is a polka when some round holds at least `threshold`
    /// pre-votes for one block or for nil. Among quorate rounds the highest
    /// wins; within one round a block quorum beats a nil quorum.
    ///
    /// The second value is the highest round at `height` whose total vote
    /// count reaches `threshold`, whether or not those votes agree on a
    /// target; it lets the state machine skip ahead to a round where the
    /// rest of the shard is already active. When a polka is returned, the
    /// round is the polka's round.
    pub fn polka(&self, height: Height, threshold: usize) -> (Option<Polka>, Option<Round>) {
        assert!(threshold > 0, "consensus threshold must be positive");

        let Some(by_round) = self.pre_votes.get(&height) else {
            return (None, None);
        };

        let mut polka: Option<Polka> = None;
        let mut latest_round = None;

        for (&round, pre_votes) in by_round {
            if pre_votes.len() < threshold {
                continue;
            }
            latest_round = Some(round);

            let mut tally: BTreeMap<Hash, usize> = BTreeMap::new();
            let mut nil_votes = 0;
            for pre_vote in pre_votes.values() {
                match &pre_vote.pre_vote.block {
                    Some(block) => *tally.entry(block.header).or_insert(0) += 1,
                    None => nil_votes += 1,
                }
            }

            let quorate_header = tally
                .iter()
                .find(|(_, votes)| **votes >= threshold)
                .map(|(header, _)| *header);

            if let Some(header) = quorate_header {
                polka = Some(block_polka(height, round, header, pre_votes));
            } else if nil_votes >= threshold {
                polka = Some(nil_polka(height, round, pre_votes));
            }
        }

        match polka {
            Some(polka) => {
                let round = polka.round;
                (Some(polka), Some(round))
            }
            None => (None, latest_round),
        }
    }

    /// Evict every entry strictly below `from_height`.
    pub fn drop_below(&mut self, from_height: Height) {
        self.pre_votes = self.pre_votes.split_off(&from_height);
    }
}

fn block_polka(
    height: Height,
    round: Round,
    header: Hash,
    pre_votes: &BTreeMap<Signatory, SignedPreVote>,
) -> Polka {
    let mut block = None;
    let mut signatures = Vec::new();
    let mut signatories = Vec::new();

    // Signatory order in the map fixes the signature order, so the same
    // vote set always encodes to the same bytes.
    for (signatory, pre_vote) in pre_votes {
        match &pre_vote.pre_vote.block {
            Some(b) if b.header == header => {
                if block.is_none() {
                    block = Some(b.clone());
                }
                signatures.push(pre_vote.signature);
                signatories.push(*signatory);
            }
            _ => {}
        }
    }

    Polka {
        block,
        height,
        round,
        signatures,
        signatories,
    }
}

fn nil_polka(
    height: Height,
    round: Round,
    pre_votes: &BTreeMap<Signatory, SignedPreVote>,
) -> Polka {
    let mut signatures = Vec::new();
    let mut signatories = Vec::new();

    for (signatory, pre_vote) in pre_votes {
        if pre_vote.pre_vote.block.is_none() {
            signatures.push(pre_vote.signature);
            signatories.push(*signatory);
        }
    }

    Polka {
        block: None,
        height,
        round,
        signatures,
        signatories,
    }
}
