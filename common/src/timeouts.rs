use core::fmt;
use core::time::Duration;

use crate::Round;

/// The phase a timeout is for.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum TimeoutKind {
    /// Waiting for the proposer's block.
    Propose,

    /// Waiting for +2/3 pre-votes.
    PreVote,

    /// Waiting for +2/3 pre-commits.
    PreCommit,
}

impl fmt::Display for TimeoutKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimeoutKind::Propose => write!(f, "propose"),
            TimeoutKind::PreVote => write!(f, "pre-vote"),
            TimeoutKind::PreCommit => write!(f, "pre-commit"),
        }
    }
}

/// Timeout schedule for the three phases of a round.
///
/// Each phase waits `base * growth_factor^round` before giving up on the
/// phase, so later rounds leave slower validators progressively more time.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Timeouts {
    /// How long we wait for a proposal before pre-voting nil.
    pub propose_base: Duration,

    /// How long we wait for a polka before pre-committing nil.
    pub prevote_base: Duration,

    /// How long we wait for a commit before skipping to the next round.
    pub precommit_base: Duration,

    /// Multiplier applied once per round to each base.
    pub growth_factor: u32,
}

impl Timeouts {
    /// The deadline offset for `kind` at `round`.
    pub fn duration(&self, kind: TimeoutKind, round: Round) -> Duration {
        let base = match kind {
            TimeoutKind::Propose => self.propose_base,
            TimeoutKind::PreVote => self.prevote_base,
            TimeoutKind::PreCommit => self.precommit_base,
        };

        // Saturate rather than wrap: a shard stuck for dozens of rounds
        // should wait long, not overflow.
        let exponent = round.as_u64().min(u32::MAX as u64) as u32;
        base.saturating_mul(self.growth_factor.saturating_pow(exponent))
    }
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            propose_base: Duration::from_secs(3),
            prevote_base: Duration::from_secs(1),
            precommit_base: Duration::from_secs(1),
            growth_factor: 2,
        }
    }
}
