use tracing::{debug, error, info, warn};

use cinnabar_common::{
    Block, Commit, Hash, Height, Polka, PreCommit, PreVote, Propose, Round, Shard, Signatory,
    SignedPreCommit, SignedPreVote, SignedPropose, SignerVerifier, TimeoutKind, Timeouts,
    Timestamp, TxPool,
};
use cinnabar_quorum::{CommitBuilder, PolkaBuilder};

use crate::{Action, Transition};

/// Maximum number of transactions drained from the pool into one proposed
/// block.
pub const MAX_BLOCK_TRANSACTIONS: usize = 64;

/// The phase of the current round.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Phase {
    /// Awaiting a valid proposal from the round's proposer.
    WaitingForPropose,

    /// Awaiting +2/3 pre-votes.
    WaitingForPolka,

    /// Awaiting +2/3 pre-commits.
    WaitingForCommit,
}

impl Phase {
    fn timeout_kind(&self) -> TimeoutKind {
        match self {
            Phase::WaitingForPropose => TimeoutKind::Propose,
            Phase::WaitingForPolka => TimeoutKind::PreVote,
            Phase::WaitingForCommit => TimeoutKind::PreCommit,
        }
    }
}

/// Where the machine is within its shard's chain.
///
/// The deadline is `None` until the first tick observed after entering the
/// phase: the machine never reads the clock, so deadlines are armed from
/// ticks alone.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct State {
    pub phase: Phase,
    pub height: Height,
    pub round: Round,
    pub deadline: Option<Timestamp>,
}

/// The replica state machine for one shard.
///
/// Consumes [`Transition`]s for its current height and emits the
/// [`Action`]s the harness must broadcast. All adversarial or stale input
/// is absorbed without effect; only a structurally impossible message (a
/// harness bug) halts the shard.
#[derive(Clone, Debug)]
pub struct Machine<S, P> {
    state: State,
    polka_builder: PolkaBuilder,
    commit_builder: CommitBuilder,
    signer: S,
    shard: Shard,
    pool: P,
    head: Option<Commit>,
    timeouts: Timeouts,
    last_tick: Option<Timestamp>,
    ending: bool,
    halted: bool,
}

impl<S, P> Machine<S, P>
where
    S: SignerVerifier,
    P: TxPool,
{
    /// A machine at the height following `head` (height 1 when there is no
    /// head), waiting for the first proposal. No actions are emitted until
    /// [`Machine::init`].
    pub fn new(signer: S, shard: Shard, pool: P, head: Option<Commit>, timeouts: Timeouts) -> Self {
        let height = head
            .as_ref()
            .map(|commit| commit.height().increment())
            .unwrap_or_else(|| Height::new(1));

        Self {
            state: State {
                phase: Phase::WaitingForPropose,
                height,
                round: Round::INITIAL,
                deadline: None,
            },
            polka_builder: PolkaBuilder::new(),
            commit_builder: CommitBuilder::new(),
            signer,
            shard,
            pool,
            head,
            timeouts,
            last_tick: None,
            ending: false,
            halted: false,
        }
    }

    pub fn state(&self) -> &State {
        &self.state
    }

    pub fn height(&self) -> Height {
        self.state.height
    }

    pub fn round(&self) -> Round {
        self.state.round
    }

    pub fn phase(&self) -> Phase {
        self.state.phase
    }

    pub fn head(&self) -> Option<&Commit> {
        self.head.as_ref()
    }

    pub fn shard(&self) -> &Shard {
        &self.shard
    }

    pub fn signer(&self) -> &S {
        &self.signer
    }

    pub fn is_halted(&self) -> bool {
        self.halted
    }

    /// Restrict pre-votes to end-of-shard blocks: once ending, only an
    /// empty proposed block earns a block pre-vote.
    pub fn mark_ending(&mut self) {
        self.ending = true;
    }

    /// Enter the first round of the current height. Emits our proposal if
    /// we are its proposer.
    pub fn init(&mut self) -> Vec<Action> {
        let mut actions = Vec::new();
        if !self.halted {
            self.enter_propose(self.state.height, self.state.round, &mut actions);
        }
        actions
    }

    /// Apply one transition and return the resulting actions, in emission
    /// order.
    pub fn transition(&mut self, transition: Transition) -> Vec<Action> {
        let mut actions = Vec::new();

        if self.halted {
            return actions;
        }

        if !structurally_sound(&transition) {
            // The harness filters these before they reach us. Seeing one
            // means the caller is broken, and a broken caller cannot be
            // trusted to keep the shard safe.
            error!(%transition, "Structurally impossible transition, halting shard");
            self.halted = true;
            actions.push(Action::Halt);
            return actions;
        }

        match transition {
            Transition::Ticked(time) => self.ticked(time, &mut actions),
            Transition::Proposed(propose) => self.proposed(propose, &mut actions),
            Transition::PreVoted(pre_vote) => self.pre_voted(pre_vote, &mut actions),
            Transition::PreCommitted(pre_commit) => self.pre_committed(pre_commit, &mut actions),
        }

        actions
    }

    /// Apply an externally provided commit to fast-forward past the current
    /// height. Returns whether the commit was applied.
    pub fn sync(&mut self, commit: &Commit) -> bool {
        if self.halted {
            return false;
        }

        if commit.polka.block.is_none() {
            debug!("Nil commit carries no head to adopt, not syncing");
            return false;
        }

        if commit.height() < self.state.height {
            debug!(
                commit.height = %commit.height(),
                height = %self.state.height,
                "Commit below current height, not syncing"
            );
            return false;
        }

        if let Err(err) = commit.verify(&self.signer, &self.shard) {
            warn!(%err, "Sync commit failed verification, dropping");
            return false;
        }

        let next_height = commit.height().increment();
        info!(height = %next_height, "Synced ahead");

        self.head = Some(commit.clone());
        self.polka_builder.drop_below(next_height);
        self.commit_builder.drop_below(next_height);
        self.enter(Phase::WaitingForPropose, next_height, Round::INITIAL);

        true
    }

    fn ticked(&mut self, time: Timestamp, actions: &mut Vec<Action>) {
        if let Some(last_tick) = self.last_tick {
            if time < last_tick {
                debug!(%time, %last_tick, "Tick from the past, dropping");
                return;
            }
        }
        self.last_tick = Some(time);

        let deadline = match self.state.deadline {
            Some(deadline) => deadline,
            None => {
                // First tick since entering the phase arms its deadline.
                let kind = self.state.phase.timeout_kind();
                let deadline = time + self.timeouts.duration(kind, self.state.round);
                self.state.deadline = Some(deadline);
                return;
            }
        };

        if time < deadline {
            return;
        }

        match self.state.phase {
            Phase::WaitingForPropose => {
                debug!(
                    height = %self.state.height,
                    round = %self.state.round,
                    "Propose timed out, pre-voting nil"
                );
                let action = self.signed_pre_vote(None);
                self.enter(Phase::WaitingForPolka, self.state.height, self.state.round);
                actions.extend(action);
            }
            Phase::WaitingForPolka => {
                debug!(
                    height = %self.state.height,
                    round = %self.state.round,
                    "Pre-vote timed out, pre-committing nil"
                );
                let polka = Polka::nil(self.state.height, self.state.round);
                let action = self.signed_pre_commit(polka);
                self.enter(Phase::WaitingForCommit, self.state.height, self.state.round);
                actions.extend(action);
            }
            Phase::WaitingForCommit => {
                debug!(
                    height = %self.state.height,
                    round = %self.state.round,
                    "Pre-commit timed out, moving to the next round"
                );
                let round = self.state.round.increment();
                self.enter_propose(self.state.height, round, actions);
            }
        }
    }

    fn proposed(&mut self, signed: SignedPropose, actions: &mut Vec<Action>) {
        let height = self.state.height;
        let propose = &signed.propose;
        let block = &propose.block;

        if block.height != height {
            debug!(block.height = %block.height, %height, "Proposal for wrong height, dropping");
            return;
        }

        let round = propose.round;
        if round < self.state.round {
            debug!(%round, current = %self.state.round, "Proposal for a past round, dropping");
            return;
        }
        if round == self.state.round && self.state.phase != Phase::WaitingForPropose {
            debug!(%round, "Already pre-voted this round, dropping proposal");
            return;
        }

        if block.round != round {
            warn!(
                %round,
                block.round = %block.round,
                "Proposal round disagrees with its block, dropping"
            );
            return;
        }

        if self.shard.proposer(height, round).copied() != Some(signed.signatory) {
            warn!(
                signatory = %signed.signatory,
                %height,
                %round,
                "Proposal from unexpected proposer, dropping"
            );
            return;
        }

        if let Some(head_header) = self.head_header() {
            if block.parent_header != head_header {
                warn!(
                    parent = %block.parent_header,
                    head = %head_header,
                    "Proposal does not extend our head, dropping"
                );
                return;
            }
        }

        // A proposal from a future round of this height pulls us forward.
        if round > self.state.round {
            debug!(from = %self.state.round, to = %round, "Proposal from a future round, following");
            self.enter(Phase::WaitingForPropose, height, round);
        }

        let vote = if self.acceptable(block, signed.signatory) {
            Some(block.clone())
        } else {
            None
        };

        if let Some(action) = self.signed_pre_vote(vote) {
            self.enter(Phase::WaitingForPolka, height, round);
            actions.push(action);
        }
    }

    fn pre_voted(&mut self, signed: SignedPreVote, actions: &mut Vec<Action>) {
        if signed.pre_vote.height != self.state.height {
            debug!(
                vote.height = %signed.pre_vote.height,
                height = %self.state.height,
                "Pre-vote for another height, ignoring"
            );
            return;
        }

        if !self.polka_builder.insert(signed) {
            return;
        }

        let (polka, latest_round) = self
            .polka_builder
            .polka(self.state.height, self.shard.threshold());

        if let Some(polka) = polka {
            let round = polka.round;
            let actionable = round > self.state.round
                || (round == self.state.round && self.state.phase != Phase::WaitingForCommit);

            if actionable {
                info!(
                    height = %self.state.height,
                    %round,
                    nil = polka.block.is_none(),
                    "Polka formed, pre-committing"
                );
                if let Some(action) = self.signed_pre_commit(polka) {
                    self.enter(Phase::WaitingForCommit, self.state.height, round);
                    actions.push(action);
                }
                return;
            }
        }

        self.maybe_skip_round(latest_round, actions);
    }

    fn pre_committed(&mut self, signed: SignedPreCommit, actions: &mut Vec<Action>) {
        if signed.pre_commit.polka.height != self.state.height {
            debug!(
                vote.height = %signed.pre_commit.polka.height,
                height = %self.state.height,
                "Pre-commit for another height, ignoring"
            );
            return;
        }

        if !self.commit_builder.insert(signed) {
            return;
        }

        let (commit, latest_round) = self
            .commit_builder
            .commit(self.state.height, self.shard.threshold());

        if let Some(commit) = commit {
            if commit.polka.block.is_some() {
                self.commit(commit, actions);
                return;
            }

            // A nil commit closes the round without finalizing the height.
            if commit.round() >= self.state.round {
                info!(
                    height = %self.state.height,
                    round = %commit.round(),
                    "Nil commit, moving to the next round"
                );
                let round = commit.round().increment();
                actions.push(Action::Commit(commit));
                self.enter_propose(self.state.height, round, actions);
                return;
            }
        }

        self.maybe_skip_round(latest_round, actions);
    }

    /// Finalize the height `commit` proves and start the next one.
    fn commit(&mut self, commit: Commit, actions: &mut Vec<Action>) {
        info!(height = %commit.height(), round = %commit.round(), "Committed");

        actions.push(Action::Commit(commit.clone()));

        let next_height = commit.height().increment();
        self.head = Some(commit);
        self.polka_builder.drop_below(next_height);
        self.commit_builder.drop_below(next_height);
        self.enter_propose(next_height, Round::INITIAL, actions);
    }

    /// Jump to `round` on evidence that a supermajority is already there.
    fn maybe_skip_round(&mut self, latest_round: Option<Round>, actions: &mut Vec<Action>) {
        let Some(round) = latest_round else { return };
        if round <= self.state.round {
            return;
        }

        info!(
            height = %self.state.height,
            from = %self.state.round,
            to = %round,
            "Supermajority active at a future round, skipping ahead"
        );
        self.enter_propose(self.state.height, round, actions);
    }

    /// Enter `WaitingForPropose` at (height, round), proposing if it is our
    /// turn.
    fn enter_propose(&mut self, height: Height, round: Round, actions: &mut Vec<Action>) {
        self.enter(Phase::WaitingForPropose, height, round);

        if self.shard.proposer(height, round).copied() == Some(self.signer.signatory()) {
            self.propose(height, round, actions);
        }
    }

    /// Build, sign, and emit our proposal for (height, round), then accept
    /// it ourselves: the dispatcher is not relied on to echo our own
    /// messages back.
    fn propose(&mut self, height: Height, round: Round, actions: &mut Vec<Action>) {
        let transactions = if self.ending {
            // The end-of-shard marker is the empty block.
            Vec::new()
        } else {
            self.pool.drain(MAX_BLOCK_TRANSACTIONS)
        };

        let block = Block::new(
            self.head_header().unwrap_or_else(Hash::zero),
            height,
            round,
            self.last_tick.unwrap_or_default(),
            self.signer.signatory(),
            transactions,
        );

        // A trusted genesis head carries no quorum; peers verify only real
        // commit proofs.
        let last_commit = self
            .head
            .clone()
            .filter(|commit| !commit.signatures.is_empty());

        let propose = Propose::new(block.clone(), round, last_commit);
        match propose.sign(&self.signer) {
            Ok(signed) => {
                info!(%height, %round, header = %block.header, "Proposing");
                actions.push(Action::Propose(signed));

                if let Some(action) = self.signed_pre_vote(Some(block)) {
                    self.enter(Phase::WaitingForPolka, height, round);
                    actions.push(action);
                }
            }
            Err(err) => {
                // Without our signature we cannot lead this round; fall
                // through to the propose timeout.
                warn!(%err, %height, %round, "Failed to sign proposal");
            }
        }
    }

    /// Whether a proposed block earns our block pre-vote, as opposed to a
    /// nil pre-vote.
    fn acceptable(&self, block: &Block, proposer: Signatory) -> bool {
        if block.proposer != proposer {
            debug!(header = %block.header, "Block names a different proposer, pre-voting nil");
            return false;
        }

        if block.computed_header() != block.header {
            debug!(header = %block.header, "Block header does not match its contents, pre-voting nil");
            return false;
        }

        if self.ending && !block.transactions.is_empty() {
            debug!(header = %block.header, "Shard is ending, pre-voting nil on non-empty block");
            return false;
        }

        true
    }

    /// Sign a pre-vote for (block?, current height, current round). `None`
    /// when signing fails, in which case the caller must leave the state
    /// alone and let the timeout carry us.
    fn signed_pre_vote(&mut self, block: Option<Block>) -> Option<Action> {
        let pre_vote = PreVote::new(block, self.state.height, self.state.round);
        match pre_vote.sign(&self.signer) {
            Ok(signed) => Some(Action::PreVote(signed)),
            Err(err) => {
                warn!(%err, "Failed to sign pre-vote");
                None
            }
        }
    }

    /// Sign a pre-commit wrapping `polka`. `None` when signing fails.
    fn signed_pre_commit(&mut self, polka: Polka) -> Option<Action> {
        let pre_commit = PreCommit::new(polka);
        match pre_commit.sign(&self.signer) {
            Ok(signed) => Some(Action::PreCommit(signed)),
            Err(err) => {
                warn!(%err, "Failed to sign pre-commit");
                None
            }
        }
    }

    fn enter(&mut self, phase: Phase, height: Height, round: Round) {
        let kind = phase.timeout_kind();
        let deadline = self
            .last_tick
            .map(|tick| tick + self.timeouts.duration(kind, round));

        self.state = State {
            phase,
            height,
            round,
            deadline,
        };
    }

    fn head_header(&self) -> Option<Hash> {
        self.head
            .as_ref()
            .and_then(|commit| commit.polka.block.as_ref())
            .map(|block| block.header)
    }
}

/// I1: a message's inner block height must agree with the message height.
/// Anything else is a harness bug, not an adversary.
fn structurally_sound(transition: &Transition) -> bool {
    match transition {
        Transition::Ticked(_) | Transition::Proposed(_) => true,
        Transition::PreVoted(signed) => signed
            .pre_vote
            .block
            .as_ref()
            .map_or(true, |block| block.height == signed.pre_vote.height),
        Transition::PreCommitted(signed) => {
            let polka = &signed.pre_commit.polka;
            polka
                .block
                .as_ref()
                .map_or(true, |block| block.height == polka.height)
        }
    }
}
