use core::fmt;

use cinnabar_common::{Height, SignedPreCommit, SignedPreVote, SignedPropose, Timestamp};

/// An input to the state machine.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Transition {
    /// Wall-clock progress. Ageless: delivered immediately, never buffered.
    Ticked(Timestamp),

    /// A signed proposal was received.
    Proposed(SignedPropose),

    /// A signed pre-vote was received.
    PreVoted(SignedPreVote),

    /// A signed pre-commit was received.
    PreCommitted(SignedPreCommit),
}

impl Transition {
    /// The height this transition is effective at; `None` for ticks.
    pub fn height(&self) -> Option<Height> {
        match self {
            Transition::Ticked(_) => None,
            Transition::Proposed(propose) => Some(propose.propose.block.height),
            Transition::PreVoted(pre_vote) => Some(pre_vote.pre_vote.height),
            Transition::PreCommitted(pre_commit) => Some(pre_commit.pre_commit.polka.height),
        }
    }
}

impl fmt::Display for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Transition::Ticked(time) => write!(f, "Ticked({time})"),
            Transition::Proposed(propose) => write!(f, "Proposed({propose})"),
            Transition::PreVoted(pre_vote) => write!(f, "PreVoted({pre_vote})"),
            Transition::PreCommitted(pre_commit) => write!(f, "PreCommitted({pre_commit})"),
        }
    }
}
