use rand::rngs::StdRng;
use rand::SeedableRng;

use cinnabar_common::{Hash, Height, Message, Round, Signer, Timeouts, Wire};
use cinnabar_replica::Replica;
use cinnabar_state::{Machine, Transition, TransitionBuffer};
use cinnabar_test::{
    genesis, make_block, make_polka, make_shard, make_signers, random_signature,
    signed_pre_commit, signed_pre_vote, signed_propose, transaction, MemPool, RecordingDispatcher,
    TestSigner,
};

const SHARD_HASH: Hash = Hash::new([9; 32]);
const PREVIOUS_HASH: Hash = Hash::new([8; 32]);

fn replica_for(
    us: usize,
) -> (
    Replica<RecordingDispatcher, TestSigner, MemPool>,
    Vec<TestSigner>,
    RecordingDispatcher,
) {
    let signers = make_signers(4, 7);
    let shard = make_shard(SHARD_HASH, &signers);
    let previous = make_shard(PREVIOUS_HASH, &signers);
    let dispatcher = RecordingDispatcher::new();

    let machine = Machine::new(
        signers[us].clone(),
        shard.clone(),
        MemPool::default(),
        Some(genesis(signers[0].signatory())),
        Timeouts::default(),
    );
    let buffer = TransitionBuffer::new(shard.size());
    let replica = Replica::new(dispatcher.clone(), machine, buffer, shard, previous);

    (replica, signers, dispatcher)
}

fn parent_header(signers: &[TestSigner]) -> Hash {
    genesis(signers[0].signatory())
        .polka
        .block
        .expect("genesis block")
        .header
}

#[test]
fn drops_messages_with_bad_signatures() {
    let (mut replica, signers, dispatcher) = replica_for(0);
    replica.init();

    let mut tampered = signed_pre_vote(&signers[1], None, Height::new(1), Round::new(0));
    tampered.signature = random_signature(&mut StdRng::seed_from_u64(1));

    replica.transition(Transition::PreVoted(tampered));

    assert!(dispatcher.is_empty());
}

#[test]
fn drops_messages_from_outside_the_shard() {
    let (mut replica, _, dispatcher) = replica_for(0);
    replica.init();

    let stranger = TestSigner::from_seed(999);
    let vote = signed_pre_vote(&stranger, None, Height::new(1), Round::new(0));
    replica.transition(Transition::PreVoted(vote));

    assert!(dispatcher.is_empty());
}

#[test]
fn drops_pre_commits_wrapping_forged_polkas() {
    let (mut replica, signers, dispatcher) = replica_for(0);
    replica.init();

    let block = make_block(
        parent_header(&signers),
        Height::new(1),
        Round::new(0),
        &signers[1],
        Vec::new(),
    );
    // A "quorum" of one is not a polka.
    let forged = make_polka(
        Some(block),
        Height::new(1),
        Round::new(0),
        &[&signers[1]],
    );
    replica.transition(Transition::PreCommitted(signed_pre_commit(
        &signers[1],
        forged,
    )));

    assert!(dispatcher.is_empty());
}

#[test_log::test]
fn buffers_future_height_votes_until_the_height_is_reached() {
    let (mut replica, signers, dispatcher) = replica_for(0);
    replica.init();

    let peers = [&signers[1], &signers[2], &signers[3]];

    // Walk height 1 up to our pre-commit.
    let block_1 = make_block(
        parent_header(&signers),
        Height::new(1),
        Round::new(0),
        &signers[1],
        vec![transaction(1)],
    );
    replica.transition(Transition::Proposed(signed_propose(
        &signers[1],
        block_1.clone(),
        None,
    )));
    for peer in peers {
        replica.transition(Transition::PreVoted(signed_pre_vote(
            peer,
            Some(block_1.clone()),
            Height::new(1),
            Round::new(0),
        )));
    }
    dispatcher.take();

    // Height-2 votes arrive early and are held back.
    let block_2 = make_block(
        block_1.header,
        Height::new(2),
        Round::new(0),
        &signers[2],
        vec![transaction(2)],
    );
    for peer in peers {
        replica.transition(Transition::PreVoted(signed_pre_vote(
            peer,
            Some(block_2.clone()),
            Height::new(2),
            Round::new(0),
        )));
    }
    assert!(dispatcher.is_empty(), "future votes must not act early");

    // Committing height 1 releases them: the commit is followed by our
    // height-2 pre-commit, from the buffered polka.
    let polka_1 = make_polka(Some(block_1), Height::new(1), Round::new(0), &peers);
    for peer in peers {
        replica.transition(Transition::PreCommitted(signed_pre_commit(
            peer,
            polka_1.clone(),
        )));
    }

    let messages = dispatcher.take();
    assert_eq!(messages.len(), 2);
    let Message::Commit(commit) = &messages[0].1 else {
        panic!("expected a commit, got {messages:?}");
    };
    assert_eq!(commit.height(), Height::new(1));
    let Message::PreCommit(pre_commit) = &messages[1].1 else {
        panic!("expected a pre-commit, got {messages:?}");
    };
    assert_eq!(pre_commit.pre_commit.polka.height, Height::new(2));
    assert_eq!(
        pre_commit.pre_commit.polka.block.as_ref(),
        Some(&block_2)
    );

    assert_eq!(replica.machine().height(), Height::new(2));
}

#[test]
fn identical_streams_dispatch_byte_identical_messages() {
    let (mut left, signers, left_dispatcher) = replica_for(1);
    let (mut right, _, right_dispatcher) = replica_for(1);

    left.init();
    right.init();

    let transitions = [
        Transition::Ticked(cinnabar_common::Timestamp::from_millis(50)),
        Transition::PreVoted(signed_pre_vote(
            &signers[2],
            None,
            Height::new(1),
            Round::new(0),
        )),
        Transition::PreVoted(signed_pre_vote(
            &signers[3],
            None,
            Height::new(1),
            Round::new(0),
        )),
    ];
    for transition in transitions {
        left.transition(transition.clone());
        right.transition(transition);
    }

    let left_bytes: Vec<Vec<u8>> = left_dispatcher
        .take()
        .into_iter()
        .map(|(_, message)| message.to_bytes())
        .collect();
    let right_bytes: Vec<Vec<u8>> = right_dispatcher
        .take()
        .into_iter()
        .map(|(_, message)| message.to_bytes())
        .collect();

    assert!(!left_bytes.is_empty());
    assert_eq!(left_bytes, right_bytes);
}
