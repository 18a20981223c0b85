use core::fmt;
use std::io;

use byteorder::{ReadBytesExt, WriteBytesExt};

use crate::wire::Wire;
use crate::{Commit, SignedPreCommit, SignedPreVote, SignedPropose};

/// A protocol message addressed to the validators of one shard.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Message {
    Propose(SignedPropose),
    PreVote(SignedPreVote),
    PreCommit(SignedPreCommit),
    Commit(Commit),
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Message::Propose(propose) => propose.fmt(f),
            Message::PreVote(pre_vote) => pre_vote.fmt(f),
            Message::PreCommit(pre_commit) => pre_commit.fmt(f),
            Message::Commit(commit) => commit.fmt(f),
        }
    }
}

impl Wire for Message {
    fn write_to<W: io::Write>(&self, w: &mut W) -> io::Result<()> {
        match self {
            Message::Propose(propose) => {
                w.write_u8(0)?;
                propose.write_to(w)
            }
            Message::PreVote(pre_vote) => {
                w.write_u8(1)?;
                pre_vote.write_to(w)
            }
            Message::PreCommit(pre_commit) => {
                w.write_u8(2)?;
                pre_commit.write_to(w)
            }
            Message::Commit(commit) => {
                w.write_u8(3)?;
                commit.write_to(w)
            }
        }
    }

    fn read_from<R: io::Read>(r: &mut R) -> io::Result<Self> {
        match r.read_u8()? {
            0 => SignedPropose::read_from(r).map(Message::Propose),
            1 => SignedPreVote::read_from(r).map(Message::PreVote),
            2 => SignedPreCommit::read_from(r).map(Message::PreCommit),
            3 => Commit::read_from(r).map(Message::Commit),
            tag => Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("invalid message tag: {tag}"),
            )),
        }
    }
}
