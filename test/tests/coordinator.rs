use cinnabar_common::{Hash, Height, Message, Round, Signer, Timestamp};
use cinnabar_replica::Coordinator;
use cinnabar_test::{
    genesis, make_block, make_commit, make_polka, make_shard, make_signers, signed_pre_commit,
    signed_pre_vote, signed_propose, transaction, MemPool, RecordingDispatcher, TestSigner,
};

const SHARD_HASH: Hash = Hash::new([9; 32]);
const PREVIOUS_HASH: Hash = Hash::new([8; 32]);

fn coordinator_for(
    us: usize,
) -> (
    Coordinator<RecordingDispatcher, TestSigner, MemPool>,
    Vec<TestSigner>,
    RecordingDispatcher,
) {
    let signers = make_signers(4, 7);
    let dispatcher = RecordingDispatcher::new();
    let coordinator = Coordinator::new(signers[us].clone(), dispatcher.clone());
    (coordinator, signers, dispatcher)
}

fn begin(
    coordinator: &mut Coordinator<RecordingDispatcher, TestSigner, MemPool>,
    signers: &[TestSigner],
    shard_hash: Hash,
    previous_hash: Hash,
) {
    coordinator.begin_shard(
        make_shard(shard_hash, signers),
        make_shard(previous_hash, signers),
        Some(genesis(signers[0].signatory())),
        MemPool::default(),
    );
}

fn parent_header(signers: &[TestSigner]) -> Hash {
    genesis(signers[0].signatory())
        .polka
        .block
        .expect("genesis block")
        .header
}

#[test]
fn begin_shard_emits_the_initial_proposal_when_leading() {
    let (mut coordinator, signers, dispatcher) = coordinator_for(1);
    begin(&mut coordinator, &signers, SHARD_HASH, PREVIOUS_HASH);

    let messages = dispatcher.take();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].0, SHARD_HASH);
    assert!(matches!(messages[0].1, Message::Propose(_)));
    assert!(matches!(messages[1].1, Message::PreVote(_)));
}

#[test]
fn begin_shard_twice_is_ignored() {
    let (mut coordinator, signers, dispatcher) = coordinator_for(1);
    begin(&mut coordinator, &signers, SHARD_HASH, PREVIOUS_HASH);
    dispatcher.take();

    begin(&mut coordinator, &signers, SHARD_HASH, PREVIOUS_HASH);
    assert!(dispatcher.is_empty());
}

#[test]
fn routes_a_full_height_to_a_commit() {
    let (mut coordinator, signers, dispatcher) = coordinator_for(0);
    begin(&mut coordinator, &signers, SHARD_HASH, PREVIOUS_HASH);

    let peers = [&signers[1], &signers[2], &signers[3]];
    let block = make_block(
        parent_header(&signers),
        Height::new(1),
        Round::new(0),
        &signers[1],
        vec![transaction(1)],
    );

    coordinator.accept_propose(
        SHARD_HASH,
        signed_propose(&signers[1], block.clone(), None),
    );
    for peer in peers {
        coordinator.accept_pre_vote(
            SHARD_HASH,
            signed_pre_vote(peer, Some(block.clone()), Height::new(1), Round::new(0)),
        );
    }
    let polka = make_polka(Some(block.clone()), Height::new(1), Round::new(0), &peers);
    for peer in peers {
        coordinator.accept_pre_commit(SHARD_HASH, signed_pre_commit(peer, polka.clone()));
    }

    let committed = dispatcher
        .take()
        .into_iter()
        .any(|(_, message)| matches!(message, Message::Commit(commit) if commit.height() == Height::new(1)));
    assert!(committed);

    let replica = coordinator.replica(&SHARD_HASH).expect("replica");
    assert_eq!(replica.machine().height(), Height::new(2));
}

#[test]
fn ticks_fan_out_to_every_shard() {
    let (mut coordinator, signers, dispatcher) = coordinator_for(0);
    let other_hash = Hash::new([10; 32]);
    begin(&mut coordinator, &signers, SHARD_HASH, PREVIOUS_HASH);
    begin(&mut coordinator, &signers, other_hash, PREVIOUS_HASH);

    coordinator.accept_tick(Timestamp::from_millis(0));
    assert!(dispatcher.is_empty());

    coordinator.accept_tick(Timestamp::from_millis(4_000));
    let messages = dispatcher.take();

    let mut shards: Vec<Hash> = messages
        .iter()
        .filter(|(_, message)| matches!(message, Message::PreVote(v) if v.pre_vote.block.is_none()))
        .map(|(shard_hash, _)| *shard_hash)
        .collect();
    shards.sort();
    assert_eq!(shards, vec![SHARD_HASH, other_hash]);
}

#[test]
fn end_shard_restricts_pre_votes_to_empty_blocks() {
    let (mut coordinator, signers, dispatcher) = coordinator_for(0);
    begin(&mut coordinator, &signers, SHARD_HASH, PREVIOUS_HASH);
    coordinator.end_shard(SHARD_HASH);

    let block = make_block(
        parent_header(&signers),
        Height::new(1),
        Round::new(0),
        &signers[1],
        vec![transaction(1)],
    );
    coordinator.accept_propose(SHARD_HASH, signed_propose(&signers[1], block, None));

    let messages = dispatcher.take();
    assert_eq!(messages.len(), 1);
    let Message::PreVote(pre_vote) = &messages[0].1 else {
        panic!("expected a pre-vote, got {messages:?}");
    };
    assert_eq!(pre_vote.pre_vote.block, None);
}

#[test]
fn drop_shard_stops_routing() {
    let (mut coordinator, signers, dispatcher) = coordinator_for(0);
    begin(&mut coordinator, &signers, SHARD_HASH, PREVIOUS_HASH);
    coordinator.drop_shard(SHARD_HASH);

    let block = make_block(
        parent_header(&signers),
        Height::new(1),
        Round::new(0),
        &signers[1],
        Vec::new(),
    );
    coordinator.accept_propose(SHARD_HASH, signed_propose(&signers[1], block, None));

    assert!(dispatcher.is_empty());
    assert!(coordinator.replica(&SHARD_HASH).is_none());
}

#[test]
fn sync_routes_to_the_right_shard() {
    let (mut coordinator, signers, _) = coordinator_for(0);
    begin(&mut coordinator, &signers, SHARD_HASH, PREVIOUS_HASH);

    let block = make_block(
        Hash::new([3; 32]),
        Height::new(10),
        Round::new(0),
        &signers[1],
        Vec::new(),
    );
    let commit = make_commit(
        Some(block),
        Height::new(10),
        Round::new(0),
        &[&signers[1], &signers[2], &signers[3]],
    );

    assert!(!coordinator.sync(Hash::new([99; 32]), &commit));
    assert!(coordinator.sync(SHARD_HASH, &commit));

    let replica = coordinator.replica(&SHARD_HASH).expect("replica");
    assert_eq!(replica.machine().height(), Height::new(11));
}

#[test]
fn only_the_last_three_previous_shards_are_retained() {
    let (mut coordinator, signers, _) = coordinator_for(0);

    for i in 0..5u8 {
        begin(
            &mut coordinator,
            &signers,
            Hash::new([100 + i; 32]),
            Hash::new([200 + i; 32]),
        );
    }

    assert!(coordinator.historical_shard(&Hash::new([200; 32])).is_none());
    assert!(coordinator.historical_shard(&Hash::new([201; 32])).is_none());
    for i in 2..5u8 {
        assert!(
            coordinator.historical_shard(&Hash::new([200 + i; 32])).is_some(),
            "previous shard {i} should be retained"
        );
    }
}
