use core::fmt;

use cinnabar_common::{Commit, SignedPreCommit, SignedPreVote, SignedPropose};

/// An output of the state machine. The harness broadcasts the message
/// variants through the dispatcher, in the order they were produced.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Action {
    /// We are the proposer and built a block for the new round.
    Propose(SignedPropose),

    /// Our pre-vote for the current round.
    PreVote(SignedPreVote),

    /// Our pre-commit for the current round.
    PreCommit(SignedPreCommit),

    /// A +2/3 quorum finalized this height (or closed the round, for nil).
    Commit(Commit),

    /// The shard hit a programming-error invariant and must stop.
    Halt,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Propose(propose) => write!(f, "Propose({propose})"),
            Action::PreVote(pre_vote) => write!(f, "PreVote({pre_vote})"),
            Action::PreCommit(pre_commit) => write!(f, "PreCommit({pre_commit})"),
            Action::Commit(commit) => write!(f, "Commit({commit})"),
            Action::Halt => write!(f, "Halt"),
        }
    }
}
