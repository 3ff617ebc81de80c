/*!
Error types used in the library.

- Some of these are externally expected --- e.g. a malformed description payload is a
  submission problem, reported to the registry and recovered from.
- Others are internally expected --- e.g. protocol errors are used by the communicator
  to decide that a message should be warned about and dropped.

Illegal lifecycle transitions are *not* errors: they are programmer mistakes, guarded
by assertions which name the source and target state.

Names of the error enums --- for the most part --- overlap with corresponding structs.
*/
//  As such, throughout the library err::{self} is often used to prefix use of the types with `err::`.

use crate::cube::comm::MessageTag;
use crate::cube::worker::WorkerState;

/// A union of varied error kinds.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// An error while reading a job description.
    Description(DescriptionError),

    /// An error in the cube exchange protocol.
    Protocol(ProtocolError),
}

/// Noted errors while reading a serialized job description.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DescriptionError {
    /// The payload contained no literals.
    EmptyPayload,

    /// The payload ended inside a header field.
    TruncatedHeader,

    /// The final clause of the payload was not terminated by the sentinel.
    UnterminatedClause,
}

impl From<DescriptionError> for ErrorKind {
    fn from(e: DescriptionError) -> Self {
        ErrorKind::Description(e)
    }
}

/// Noted errors in the cube exchange protocol.
///
/// These are recovered from by dropping the offending message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ProtocolError {
    /// The tag of a message was not part of the protocol.
    UnknownTag(i32),

    /// A message arrived whose tag is not expected in the worker's current state.
    UnexpectedMessage(MessageTag, WorkerState),

    /// A root-only message arrived at a non-root engine, or conversely.
    WrongSide(MessageTag),

    /// The payload of a message could not be unframed.
    MalformedPayload(MessageTag),
}

impl From<ProtocolError> for ErrorKind {
    fn from(e: ProtocolError) -> Self {
        ErrorKind::Protocol(e)
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Description(e) => write!(f, "description: {e:?}"),
            Self::Protocol(e) => write!(f, "protocol: {e:?}"),
        }
    }
}
