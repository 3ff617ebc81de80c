//! Structures shared across the engine --- literals, cubes, and their wire form.
//!
//! Literals use the integer representation throughout: the magnitude of a [Lit] names an
//! atom and the sign gives its polarity, with `0` reserved as a stream sentinel.
//! This matches the form literals take on the wire and in solver calls, and avoids a
//! translation layer at every seam of the protocol.

mod cube;
pub use cube::{unserialize_cubes, serialize_cubes, Cube};

/// A literal in integer form.
///
/// Non-zero, with the sign of the integer indicating polarity.
pub type Lit = i32;

/// The sentinel used to terminate a clause or a cube in a flat literal stream.
pub const STREAM_END: Lit = 0;
