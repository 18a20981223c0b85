use tracing::warn;

use cinnabar_common::{
    Commit, Dispatcher, Hash, Message, Shard, Signatory, Signature, SignedPreCommit, SignedPreVote,
    SignedPropose, SignerVerifier, TxPool,
};
use cinnabar_state::{Action, Machine, Transition, TransitionBuffer};

/// Owns one shard's state machine and transition buffer, verifies inbound
/// messages, and hands emitted actions to the dispatcher.
///
/// All mutation happens on the caller's thread of control; a call to
/// [`Replica::transition`] runs synchronously end-to-end: verify → enqueue
/// → drain → apply → dispatch.
#[derive(Clone, Debug)]
pub struct Replica<D, S, P> {
    dispatcher: D,
    machine: Machine<S, P>,
    buffer: TransitionBuffer,
    shard: Shard,
    previous_shard: Shard,
}

impl<D, S, P> Replica<D, S, P>
where
    D: Dispatcher,
    S: SignerVerifier,
    P: TxPool,
{
    pub fn new(
        dispatcher: D,
        machine: Machine<S, P>,
        buffer: TransitionBuffer,
        shard: Shard,
        previous_shard: Shard,
    ) -> Self {
        Self {
            dispatcher,
            machine,
            buffer,
            shard,
            previous_shard,
        }
    }

    pub fn machine(&self) -> &Machine<S, P> {
        &self.machine
    }

    /// Start the first round: if this replica is the initial proposer, its
    /// proposal goes out here.
    pub fn init(&mut self) {
        let actions = self.machine.init();
        self.dispatch_all(actions);
    }

    /// Feed one transition through the replica. Ticks are delivered to the
    /// machine immediately; messages are verified, buffered, and drained in
    /// height order.
    pub fn transition(&mut self, transition: Transition) {
        if matches!(transition, Transition::Ticked(_)) {
            let actions = self.machine.transition(transition);
            self.dispatch_all(actions);
            self.drain();
            return;
        }

        if !self.verify(&transition) {
            return;
        }

        self.buffer.enqueue(transition, self.machine.height());
        self.drain();
    }

    /// Fast-forward from an externally provided commit proof.
    pub fn sync(&mut self, commit: &Commit) -> bool {
        let synced = self.machine.sync(commit);
        if synced {
            self.buffer.drop_below(self.machine.height());
        }
        synced
    }

    /// Only pre-vote for end-of-shard blocks from now on.
    pub fn mark_ending(&mut self) {
        self.machine.mark_ending();
    }

    fn drain(&mut self) {
        while let Some(transition) = self.buffer.dequeue(self.machine.height()) {
            let height_before = self.machine.height();
            let actions = self.machine.transition(transition);
            self.dispatch_all(actions);

            if self.machine.height() > height_before {
                self.buffer.drop_below(self.machine.height());
            }
        }
    }

    fn dispatch_all(&mut self, actions: Vec<Action>) {
        for action in actions {
            let message = match action {
                Action::Propose(propose) => Message::Propose(propose),
                Action::PreVote(pre_vote) => Message::PreVote(pre_vote),
                Action::PreCommit(pre_commit) => Message::PreCommit(pre_commit),
                Action::Commit(commit) => Message::Commit(commit),
                Action::Halt => {
                    warn!(shard = %self.shard.hash, "Replica halted");
                    continue;
                }
            };
            self.dispatcher.dispatch(self.shard.hash, message);
        }
    }

    /// Adversarial and stale input stops here, silently: the machine only
    /// ever sees messages from shard members, with valid signatures and
    /// structurally consistent contents.
    fn verify(&self, transition: &Transition) -> bool {
        match transition {
            Transition::Ticked(_) => true,
            Transition::Proposed(signed) => self.verify_propose(signed),
            Transition::PreVoted(signed) => self.verify_pre_vote(signed),
            Transition::PreCommitted(signed) => self.verify_pre_commit(signed),
        }
    }

    fn verify_propose(&self, signed: &SignedPropose) -> bool {
        if !self.shard.contains(&signed.signatory) {
            warn!(signatory = %signed.signatory, "Proposal from outside the shard, dropping");
            return false;
        }

        if !self.verify_signature(&signed.propose.sign_hash(), &signed.signature, &signed.signatory)
        {
            return false;
        }

        // The parent proof must verify against this shard or, across a
        // shard handover, the previous one.
        if let Some(last_commit) = &signed.propose.last_commit {
            let verifier = self.machine.signer();
            if last_commit.verify(verifier, &self.shard).is_err()
                && last_commit.verify(verifier, &self.previous_shard).is_err()
            {
                warn!(
                    signatory = %signed.signatory,
                    "Proposal carries an unverifiable parent commit, dropping"
                );
                return false;
            }
        }

        true
    }

    fn verify_pre_vote(&self, signed: &SignedPreVote) -> bool {
        if let Some(block) = &signed.pre_vote.block {
            if block.height != signed.pre_vote.height {
                warn!(
                    signatory = %signed.signatory,
                    "Pre-vote height disagrees with its block, dropping"
                );
                return false;
            }
        }

        if !self.shard.contains(&signed.signatory) {
            warn!(signatory = %signed.signatory, "Pre-vote from outside the shard, dropping");
            return false;
        }

        self.verify_signature(
            &signed.pre_vote.sign_hash(),
            &signed.signature,
            &signed.signatory,
        )
    }

    fn verify_pre_commit(&self, signed: &SignedPreCommit) -> bool {
        let polka = &signed.pre_commit.polka;
        if let Some(block) = &polka.block {
            if block.height != polka.height {
                warn!(
                    signatory = %signed.signatory,
                    "Pre-commit height disagrees with its block, dropping"
                );
                return false;
            }
        }

        if !self.shard.contains(&signed.signatory) {
            warn!(signatory = %signed.signatory, "Pre-commit from outside the shard, dropping");
            return false;
        }

        if !self.verify_signature(
            &signed.pre_commit.sign_hash(),
            &signed.signature,
            &signed.signatory,
        ) {
            return false;
        }

        // The wrapped polka must itself be a genuine +2/3 pre-vote proof
        // (or the degenerate nil polka of a timed-out round).
        if let Err(err) = polka.verify(self.machine.signer(), &self.shard) {
            warn!(signatory = %signed.signatory, %err, "Pre-commit wraps a bad polka, dropping");
            return false;
        }

        true
    }

    fn verify_signature(&self, hash: &Hash, signature: &Signature, signatory: &Signatory) -> bool {
        match self.machine.signer().verify(hash, signature) {
            Ok(recovered) if recovered == *signatory => true,
            _ => {
                warn!(%signatory, "Bad signature, dropping");
                false
            }
        }
    }
}
