//! Types which are used throughout the library, in particular errors.

pub mod err;
