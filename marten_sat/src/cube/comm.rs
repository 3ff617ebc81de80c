/*!
The tag-dispatched message layer between root and workers.

# Messages

| Tag             | Direction     | Payload                                        |
|-----------------|---------------|------------------------------------------------|
| `REQUEST_CUBES` | worker → root | empty                                          |
| `SEND_CUBES`    | root → worker | framed failed-cube prefix, then the batch      |
| `RETURN_FAILED` | worker → root | failed cubes as a sentinel-terminated stream   |
| `ACK_FAILED`    | root → worker | empty                                          |

Sending is nonblocking: a message is placed on the [Outbox] and the call returns.
The transport behind the outbox is external --- in-process engines use the provided
[ChannelOutbox], a cluster deployment would post to its communication layer.
Inbound messages are delivered synchronously on the event thread through the cube
engine, which acquires the worker's state mutex before mutating worker state.

# Framing of `SEND_CUBES`

A batch carries the failed cubes its destination has not yet seen, so workers keep
pruning against everything the root knows.
The payload is `[n, failed…, batch…]` where `n` counts the failed cubes and both
sections are sentinel-terminated cube streams.
*/

use std::sync::Arc;

use crate::{
    misc::log::targets::{self},
    structures::{serialize_cubes, unserialize_cubes, Cube, Lit},
    types::err::{self},
};

/// The rank of a process, as assigned by the transport.
pub type Rank = i32;

/// The tags of the cube exchange protocol.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MessageTag {
    /// A worker is out of cubes and requests a batch.
    RequestCubes,

    /// The root hands a batch of cubes (and fresh failed cubes) to a worker.
    SendCubes,

    /// A worker returns the failed cubes it discovered.
    ReturnFailed,

    /// The root acknowledges returned failed cubes.
    AckFailed,
}

impl MessageTag {
    /// The wire code of the tag.
    pub fn code(&self) -> i32 {
        match self {
            Self::RequestCubes => 1,
            Self::SendCubes => 2,
            Self::ReturnFailed => 3,
            Self::AckFailed => 4,
        }
    }

    /// The tag with the given wire code, if any.
    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            1 => Some(Self::RequestCubes),
            2 => Some(Self::SendCubes),
            3 => Some(Self::ReturnFailed),
            4 => Some(Self::AckFailed),
            _ => None,
        }
    }
}

impl std::fmt::Display for MessageTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::RequestCubes => write!(f, "REQUEST_CUBES"),
            Self::SendCubes => write!(f, "SEND_CUBES"),
            Self::ReturnFailed => write!(f, "RETURN_FAILED"),
            Self::AckFailed => write!(f, "ACK_FAILED"),
        }
    }
}

/// A message of the cube exchange protocol, addressed to a job.
#[derive(Clone, Debug)]
pub struct JobMessage {
    /// The job the message belongs to.
    pub job_id: i32,

    /// The wire code of the tag.
    pub tag: i32,

    /// The payload, an integer vector.
    pub payload: Vec<Lit>,
}

/// An addressed message, as handed to the transport.
#[derive(Clone, Debug)]
pub struct Envelope {
    pub source: Rank,
    pub destination: Rank,
    pub message: JobMessage,
}

/// The sending side of the transport, as seen by a job.
///
/// Posting must not block; delivery order between a fixed pair of ranks is expected
/// to match posting order.
pub trait Outbox: Send + Sync {
    fn post(&self, envelope: Envelope);
}

/// An outbox backed by an unbounded crossbeam channel, for in-process transports.
pub struct ChannelOutbox {
    sender: crossbeam::channel::Sender<Envelope>,
}

impl ChannelOutbox {
    /// A fresh outbox and the receiving end of its channel.
    pub fn new() -> (Self, crossbeam::channel::Receiver<Envelope>) {
        let (sender, receiver) = crossbeam::channel::unbounded();
        (ChannelOutbox { sender }, receiver)
    }
}

impl Outbox for ChannelOutbox {
    fn post(&self, envelope: Envelope) {
        let destination = envelope.destination;
        if self.sender.send(envelope).is_err() {
            log::warn!(target: targets::COMM, "Message to {destination} dropped: transport closed");
        }
    }
}

/// The communicator of one cube engine: builds and posts protocol messages.
#[derive(Clone)]
pub struct CubeCommunicator {
    job_id: i32,
    self_rank: Rank,
    root_rank: Rank,
    outbox: Arc<dyn Outbox>,
}

impl CubeCommunicator {
    pub fn new(job_id: i32, self_rank: Rank, root_rank: Rank, outbox: Arc<dyn Outbox>) -> Self {
        CubeCommunicator {
            job_id,
            self_rank,
            root_rank,
            outbox,
        }
    }

    fn post(&self, destination: Rank, tag: MessageTag, payload: Vec<Lit>) {
        log::trace!(target: targets::COMM, "Job #{} : {} to {}", self.job_id, tag, destination);

        self.outbox.post(Envelope {
            source: self.self_rank,
            destination,
            message: JobMessage {
                job_id: self.job_id,
                tag: tag.code(),
                payload,
            },
        });
    }

    /// Requests a batch of cubes from the root.
    pub fn request_cubes(&self) {
        self.post(self.root_rank, MessageTag::RequestCubes, Vec::new());
    }

    /// Hands a batch of cubes to a worker, prefixed with fresh failed cubes.
    pub fn send_cubes(&self, destination: Rank, fresh_failed: &[Cube], batch: &[Cube]) {
        let mut payload = vec![fresh_failed.len() as Lit];
        payload.extend(serialize_cubes(fresh_failed));
        payload.extend(serialize_cubes(batch));

        self.post(destination, MessageTag::SendCubes, payload);
    }

    /// Returns failed cubes to the root.
    pub fn return_failed_cubes(&self, failed: &[Cube]) {
        self.post(self.root_rank, MessageTag::ReturnFailed, serialize_cubes(failed));
    }

    /// Acknowledges returned failed cubes.
    pub fn ack_failed(&self, destination: Rank) {
        self.post(destination, MessageTag::AckFailed, Vec::new());
    }
}

/// Splits a `SEND_CUBES` payload into its failed-cube prefix and the batch.
pub fn unframe_send_cubes(payload: &[Lit]) -> Result<(Vec<Cube>, Vec<Cube>), err::ProtocolError> {
    let Some((count, stream)) = payload.split_first() else {
        return Err(err::ProtocolError::MalformedPayload(MessageTag::SendCubes));
    };

    if *count < 0 {
        return Err(err::ProtocolError::MalformedPayload(MessageTag::SendCubes));
    }

    let mut cubes = unserialize_cubes(stream);
    let failed_count = *count as usize;

    if failed_count > cubes.len() {
        return Err(err::ProtocolError::MalformedPayload(MessageTag::SendCubes));
    }

    let batch = cubes.split_off(failed_count);
    Ok((cubes, batch))
}

#[cfg(test)]
mod framing_tests {
    use super::*;

    #[test]
    fn send_cubes_round_trip() {
        let failed = vec![Cube::new(vec![1])];
        let batch = vec![Cube::new(vec![-1, 2]), Cube::new(vec![-1, -2])];

        let mut payload = vec![failed.len() as Lit];
        payload.extend(serialize_cubes(&failed));
        payload.extend(serialize_cubes(&batch));

        let (failed_out, batch_out) = unframe_send_cubes(&payload).unwrap();
        assert_eq!(failed_out, failed);
        assert_eq!(batch_out, batch);
    }

    #[test]
    fn empty_payload_is_malformed() {
        assert!(unframe_send_cubes(&[]).is_err());
    }

    #[test]
    fn overlong_prefix_is_malformed() {
        assert!(unframe_send_cubes(&[2, 1, 0]).is_err());
    }
}
