use crate::{KEYBYTES, OUTBYTES};

/// The ways a caller can misuse a [`State`](crate::State) or a
/// [`Params`](crate::Params). None of these are transient: retrying the same
/// call gives the same error, and the state is left exactly as it was.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error("digest length must be between 1 and {OUTBYTES} bytes, got {0}")]
    InvalidOutputLength(usize),
    #[error("key length must be between 1 and {KEYBYTES} bytes, got {0}")]
    InvalidKeyLength(usize),
    #[error("output buffer is {actual} bytes, but the digest is {expected} bytes")]
    OutputTooShort { expected: usize, actual: usize },
    #[error("the hash state has already been finalized")]
    AlreadySealed,
    #[error("parameter {name} is out of range")]
    InvalidParameter { name: &'static str },
}
