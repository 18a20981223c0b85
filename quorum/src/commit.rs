use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

use tracing::debug;

use cinnabar_common::{Commit, Hash, Height, Polka, Round, Signatory, SignedPreCommit};

/// Collects signed pre-commits by (height, round, signatory) and builds a
/// [`Commit`] wherever some round holds enough agreeing votes.
#[derive(Clone, Debug, Default)]
pub struct CommitBuilder {
    pre_commits: BTreeMap<Height, BTreeMap<Round, BTreeMap<Signatory, SignedPreCommit>>>,
}

impl CommitBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a pre-commit. Returns true iff it is novel for its
    /// (height, round, signatory); a duplicate leaves the builder unchanged.
    ///
    /// Panics if the pre-commit's block height disagrees with its polka
    /// height. The harness filters such messages before they get here; one
    /// slipping through is a caller bug, not an adversary.
    pub fn insert(&mut self, pre_commit: SignedPreCommit) -> bool {
        let polka = &pre_commit.pre_commit.polka;
        if let Some(block) = &polka.block {
            assert!(
                block.height == polka.height,
                "pre-commit height ({}) must equal its block height ({})",
                polka.height,
                block.height,
            );
        }

        let slot = self
            .pre_commits
            .entry(polka.height)
            .or_default()
            .entry(polka.round)
            .or_default();

        match slot.entry(pre_commit.signatory) {
            Entry::Vacant(entry) => {
                entry.insert(pre_commit);
                true
            }
            Entry::Occupied(_) => {
                debug!(signatory = %pre_commit.signatory, "Duplicate pre-commit, ignoring");
                false
            }
        }
    }

    /// Scan every round recorded at `height`.
    ///
    /// The first value is a commit when some round holds at least
    /// `threshold` pre-commits for one block or for nil. Among quorate
    /// rounds the highest wins; within one round a block quorum beats a nil
    /// quorum. A commit for a block carries only the votes that chose that
    /// exact header; a commit for nil carries only the nil votes.
    ///
    /// The second value is the highest round at `height` whose total vote
    /// count reaches `threshold`, regardless of agreement. When a commit is
    /// returned, the round is the commit's round.
    pub fn commit(&self, height: Height, threshold: usize) -> (Option<Commit>, Option<Round>) {
        assert!(threshold > 0, "consensus threshold must be positive");

        let Some(by_round) = self.pre_commits.get(&height) else {
            return (None, None);
        };

        let mut commit: Option<Commit> = None;
        let mut latest_round = None;

        for (&round, pre_commits) in by_round {
            if pre_commits.len() < threshold {
                continue;
            }
            latest_round = Some(round);

            let mut tally: BTreeMap<Hash, usize> = BTreeMap::new();
            let mut nil_votes = 0;
            for pre_commit in pre_commits.values() {
                match &pre_commit.pre_commit.polka.block {
                    Some(block) => *tally.entry(block.header).or_insert(0) += 1,
                    None => nil_votes += 1,
                }
            }

            let quorate_header = tally
                .iter()
                .find(|(_, votes)| **votes >= threshold)
                .map(|(header, _)| *header);

            if let Some(header) = quorate_header {
                commit = block_commit(header, pre_commits).or(commit);
            } else if nil_votes >= threshold {
                commit = Some(nil_commit(height, round, pre_commits));
            }
        }

        match commit {
            Some(commit) => {
                let round = commit.round();
                (Some(commit), Some(round))
            }
            None => (None, latest_round),
        }
    }

    /// Evict every entry strictly below `from_height`.
    pub fn drop_below(&mut self, from_height: Height) {
        self.pre_commits = self.pre_commits.split_off(&from_height);
    }
}

fn block_commit(
    header: Hash,
    pre_commits: &BTreeMap<Signatory, SignedPreCommit>,
) -> Option<Commit> {
    let mut polka = None;
    let mut signatures = Vec::new();
    let mut signatories = Vec::new();

    // Signatory order in the map fixes the signature order, so the same
    // vote set always encodes to the same bytes. Any matching pre-commit's
    // polka serves as the proof; the first in signatory order is taken.
    for (signatory, pre_commit) in pre_commits {
        match &pre_commit.pre_commit.polka.block {
            Some(block) if block.header == header => {
                if polka.is_none() {
                    polka = Some(pre_commit.pre_commit.polka.clone());
                }
                signatures.push(pre_commit.signature);
                signatories.push(*signatory);
            }
            _ => {}
        }
    }

    Some(Commit {
        polka: polka?,
        signatures,
        signatories,
    })
}

fn nil_commit(
    height: Height,
    round: Round,
    pre_commits: &BTreeMap<Signatory, SignedPreCommit>,
) -> Commit {
    let mut signatures = Vec::new();
    let mut signatories = Vec::new();

    for (signatory, pre_commit) in pre_commits {
        if pre_commit.pre_commit.polka.block.is_none() {
            signatures.push(pre_commit.signature);
            signatories.push(*signatory);
        }
    }

    Commit {
        polka: Polka::nil(height, round),
        signatures,
        signatories,
    }
}
