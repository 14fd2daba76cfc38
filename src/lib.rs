//! An implementation of the BLAKE2b hash function, with a portable backend
//! and an AVX2 backend selected at runtime.
//!
//! ```
//! # fn main() -> Result<(), blake2b_stream::Error> {
//! let mut state = blake2b_stream::State::new(32)?;
//! state.update(b"foo")?.update(b"bar")?;
//! let hash = state.finalize()?;
//! assert_eq!(hash, blake2b_stream::hash(32, b"foobar", None)?);
//! # Ok(())
//! # }
//! ```
//!
//! Keyed hashing, salts, personalization and the other fields of the BLAKE2b
//! parameter block are set through [`Params`].

#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
mod avx2;
mod error;
// This module is pub for benchmarks. Callers don't need it.
#[doc(hidden)]
pub mod platform;
mod portable;

pub use error::Error;

use arrayref::{array_mut_ref, array_ref, mut_array_refs};
use arrayvec::{ArrayString, ArrayVec};
use core::cmp;
use core::fmt;
use platform::Platform;
use zeroize::Zeroize;

/// The number of bytes in one compressed block, 128.
pub const BLOCKBYTES: usize = 128;

/// The maximum (and default) number of bytes in a hash, 64.
pub const OUTBYTES: usize = 64;

/// The maximum number of bytes in a key, 64.
pub const KEYBYTES: usize = 64;

/// The maximum number of bytes in a salt, 16.
pub const SALTBYTES: usize = 16;

/// The maximum number of bytes in a personalization string, 16.
pub const PERSONALBYTES: usize = 16;

const IV: [u64; 8] = [
    0x6A09E667F3BCC908,
    0xBB67AE8584CAA73B,
    0x3C6EF372FE94F82B,
    0xA54FF53A5F1D36F1,
    0x510E527FADE682D1,
    0x9B05688C2B3E6C1F,
    0x1F83D9ABFB41BD6B,
    0x5BE0CD19137E2179,
];

// Rounds 10 and 11 repeat the schedules of rounds 0 and 1.
const SIGMA: [[usize; 16]; 12] = [
    [0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15],
    [14, 10, 4, 8, 9, 15, 13, 6, 1, 12, 0, 2, 11, 7, 5, 3],
    [11, 8, 12, 0, 5, 2, 15, 13, 10, 14, 3, 6, 7, 1, 9, 4],
    [7, 9, 3, 1, 13, 12, 11, 14, 2, 6, 5, 10, 4, 0, 15, 8],
    [9, 0, 5, 7, 2, 4, 10, 15, 14, 1, 11, 12, 6, 8, 3, 13],
    [2, 12, 6, 10, 0, 11, 8, 3, 4, 13, 7, 5, 15, 14, 1, 9],
    [12, 5, 1, 15, 14, 13, 4, 10, 0, 7, 6, 3, 9, 2, 8, 11],
    [13, 11, 7, 14, 12, 1, 3, 9, 5, 0, 15, 4, 8, 6, 2, 10],
    [6, 15, 14, 9, 11, 3, 0, 8, 12, 2, 13, 7, 1, 4, 10, 5],
    [10, 2, 8, 4, 7, 6, 1, 5, 15, 11, 9, 14, 3, 12, 13, 0],
    [0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15],
    [14, 10, 4, 8, 9, 15, 13, 6, 1, 12, 0, 2, 11, 7, 5, 3],
];

// The finalization flag words are either all zeros or all ones.
const FLAG_SET: u64 = !0;

/// Compute the BLAKE2b hash of `input` in one call, with a digest of
/// `digest_length` bytes and an optional key.
///
/// A key of `Some(&[])` is an error, same as [`State::new_keyed`]. Use `None`
/// for unkeyed hashing.
pub fn hash(digest_length: usize, input: &[u8], key: Option<&[u8]>) -> Result<Hash, Error> {
    let mut state = new_state(digest_length, key)?;
    state.absorb(input);
    Ok(state.seal())
}

/// Like [`hash`], but writes the digest into the first `digest_length` bytes
/// of `out`. `out` is left untouched on error.
pub fn hash_into(
    out: &mut [u8],
    digest_length: usize,
    input: &[u8],
    key: Option<&[u8]>,
) -> Result<(), Error> {
    let mut state = new_state(digest_length, key)?;
    if out.len() < digest_length {
        return Err(Error::OutputTooShort {
            expected: digest_length,
            actual: out.len(),
        });
    }
    state.absorb(input);
    state.finalize_into(out)
}

fn new_state(digest_length: usize, key: Option<&[u8]>) -> Result<State, Error> {
    match key {
        Some(key) => State::new_keyed(digest_length, key),
        None => State::new(digest_length),
    }
}

/// BLAKE2b-512, unkeyed, in one call.
pub fn blake2b_512(input: &[u8]) -> Hash {
    let mut state = Params::new().to_state();
    state.absorb(input);
    state.seal()
}

/// BLAKE2b-256, unkeyed, in one call.
pub fn blake2b_256(input: &[u8]) -> Hash {
    let mut params = Params::new();
    params.digest_length = 32;
    let mut state = params.to_state();
    state.absorb(input);
    state.seal()
}

/// A finished BLAKE2b digest, between 1 and [`OUTBYTES`] bytes long.
///
/// Equality checks run in constant time (for digests of equal length), so a
/// `Hash` can be compared directly when BLAKE2b is used as a MAC.
#[derive(Clone)]
pub struct Hash {
    bytes: ArrayVec<u8, OUTBYTES>,
}

impl Hash {
    /// The digest bytes, `len()` of them.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// The digest length the state was created with, from 1 to [`OUTBYTES`].
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Always false, since a digest is at least one byte.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// The digest as lowercase hex. The maximum length is known in advance,
    /// so this doesn't allocate.
    pub fn to_hex(&self) -> ArrayString<{ 2 * OUTBYTES }> {
        let mut s = ArrayString::new();
        let table = b"0123456789abcdef";
        for &b in self.bytes.iter() {
            s.push(table[(b >> 4) as usize] as char);
            s.push(table[(b & 0xf) as usize] as char);
        }
        s
    }
}

impl AsRef<[u8]> for Hash {
    fn as_ref(&self) -> &[u8] {
        &self.bytes
    }
}

/// This implementation is constant-time, if the two hashes are the same
/// length.
impl PartialEq for Hash {
    fn eq(&self, other: &Hash) -> bool {
        constant_time_eq::constant_time_eq(&self.bytes, &other.bytes)
    }
}

/// This implementation is constant-time, if the lengths match.
impl PartialEq<[u8]> for Hash {
    fn eq(&self, other: &[u8]) -> bool {
        constant_time_eq::constant_time_eq(&self.bytes, other)
    }
}

impl Eq for Hash {}

impl fmt::Debug for Hash {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Hash(0x{})", self.to_hex())
    }
}

/// A builder for [`State`] covering every field of the BLAKE2b parameter
/// block.
///
/// Apart from `digest_length` and `key`, all of these parameters are just
/// associated data for the hash: they domain-separate hashes used for
/// different purposes. The tree fields (`fanout`, `max_depth`,
/// `max_leaf_length`, `node_offset`, `node_depth`, `inner_hash_length`,
/// `last_node`) only change the output; this crate doesn't implement any tree
/// mode on top of them. The defaults describe ordinary sequential hashing.
///
/// The key is kept in a padded block until the `Params` is dropped, at which
/// point it's zeroed.
#[derive(Clone)]
pub struct Params {
    digest_length: u8,
    key_length: u8,
    fanout: u8,
    max_depth: u8,
    max_leaf_length: u32,
    node_offset: u64,
    node_depth: u8,
    inner_hash_length: u8,
    salt: [u8; SALTBYTES],
    personal: [u8; PERSONALBYTES],
    key_block: [u8; BLOCKBYTES],
    last_node: bool,
}

impl Params {
    /// Default parameters: a 64-byte digest, no key, sequential mode.
    pub fn new() -> Self {
        Self {
            digest_length: OUTBYTES as u8,
            key_length: 0,
            fanout: 1,
            max_depth: 1,
            max_leaf_length: 0,
            node_offset: 0,
            node_depth: 0,
            inner_hash_length: 0,
            salt: [0; SALTBYTES],
            personal: [0; PERSONALBYTES],
            key_block: [0; BLOCKBYTES],
            last_node: false,
        }
    }

    /// From 1 to [`OUTBYTES`]. The digest length is part of the parameter
    /// block, so a shorter digest isn't a prefix of a longer one.
    pub fn digest_length(&mut self, length: usize) -> Result<&mut Self, Error> {
        if length == 0 || length > OUTBYTES {
            return Err(Error::InvalidOutputLength(length));
        }
        self.digest_length = length as u8;
        Ok(self)
    }

    /// Use a secret key, so that BLAKE2b acts as a MAC. At most
    /// [`KEYBYTES`] bytes. An empty key here means no key at all.
    pub fn key(&mut self, key: &[u8]) -> Result<&mut Self, Error> {
        if key.len() > KEYBYTES {
            return Err(Error::InvalidKeyLength(key.len()));
        }
        self.key_block.zeroize();
        self.key_block[..key.len()].copy_from_slice(key);
        self.key_length = key.len() as u8;
        Ok(self)
    }

    /// At most [`SALTBYTES`] bytes. Shorter salts are padded with zeros.
    pub fn salt(&mut self, salt: &[u8]) -> Result<&mut Self, Error> {
        if salt.len() > SALTBYTES {
            return Err(Error::InvalidParameter { name: "salt" });
        }
        self.salt = [0; SALTBYTES];
        self.salt[..salt.len()].copy_from_slice(salt);
        Ok(self)
    }

    /// At most [`PERSONALBYTES`] bytes. Shorter personalizations are padded
    /// with zeros.
    pub fn personal(&mut self, personal: &[u8]) -> Result<&mut Self, Error> {
        if personal.len() > PERSONALBYTES {
            return Err(Error::InvalidParameter { name: "personal" });
        }
        self.personal = [0; PERSONALBYTES];
        self.personal[..personal.len()].copy_from_slice(personal);
        Ok(self)
    }

    /// From 0 (meaning unlimited) to 255. The default is 1, sequential.
    pub fn fanout(&mut self, fanout: u8) -> &mut Self {
        self.fanout = fanout;
        self
    }

    /// From 1 (the default, sequential) to 255 (unlimited).
    pub fn max_depth(&mut self, depth: u8) -> Result<&mut Self, Error> {
        if depth == 0 {
            return Err(Error::InvalidParameter { name: "max_depth" });
        }
        self.max_depth = depth;
        Ok(self)
    }

    /// 0 (the default) means unlimited or sequential.
    pub fn max_leaf_length(&mut self, length: u32) -> &mut Self {
        self.max_leaf_length = length;
        self
    }

    /// From 0 (the default) to 2^64 - 1.
    pub fn node_offset(&mut self, offset: u64) -> &mut Self {
        self.node_offset = offset;
        self
    }

    /// 0 (the default) means a leaf, or sequential mode.
    pub fn node_depth(&mut self, depth: u8) -> &mut Self {
        self.node_depth = depth;
        self
    }

    /// From 0 (the default, sequential) to [`OUTBYTES`].
    pub fn inner_hash_length(&mut self, length: usize) -> Result<&mut Self, Error> {
        if length > OUTBYTES {
            return Err(Error::InvalidParameter {
                name: "inner_hash_length",
            });
        }
        self.inner_hash_length = length as u8;
        Ok(self)
    }

    /// Marks the last node of a layer. This sets the second finalization
    /// flag on the last block.
    pub fn last_node(&mut self, last_node: bool) -> &mut Self {
        self.last_node = last_node;
        self
    }

    /// The 64-byte serialized parameter block.
    fn to_bytes(&self) -> [u8; 64] {
        let mut bytes = [0; 64];
        {
            let (
                digest_length,
                key_length,
                fanout,
                depth,
                leaf_length,
                node_offset,
                node_depth,
                inner_length,
                _reserved,
                salt,
                personal,
            ) = mut_array_refs!(&mut bytes, 1, 1, 1, 1, 4, 8, 1, 1, 14, 16, 16);
            digest_length[0] = self.digest_length;
            key_length[0] = self.key_length;
            fanout[0] = self.fanout;
            depth[0] = self.max_depth;
            *leaf_length = self.max_leaf_length.to_le_bytes();
            *node_offset = self.node_offset.to_le_bytes();
            node_depth[0] = self.node_depth;
            inner_length[0] = self.inner_hash_length;
            *salt = self.salt;
            *personal = self.personal;
        }
        bytes
    }

    fn init_words(&self) -> [u64; 8] {
        let bytes = self.to_bytes();
        let mut h = IV;
        for (i, word) in h.iter_mut().enumerate() {
            *word ^= u64::from_le_bytes(*array_ref!(bytes, 8 * i, 8));
        }
        h
    }

    /// Build a fresh [`State`] from these parameters. If a key is set, it's
    /// fed in as a full padded block before any input.
    pub fn to_state(&self) -> State {
        let platform = Platform::detect();
        tracing::trace!(
            digest_length = self.digest_length,
            keyed = self.key_length > 0,
            ?platform,
            "new blake2b state"
        );
        let mut state = State {
            h: self.init_words(),
            buf: [0; BLOCKBYTES],
            buflen: 0,
            count: 0,
            outlen: self.digest_length,
            last_node: self.last_node,
            sealed: false,
            platform,
        };
        if self.key_length > 0 {
            state.absorb(&self.key_block);
        }
        state
    }
}

impl Default for Params {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Params {
    fn drop(&mut self) {
        self.key_block.zeroize();
    }
}

// Don't derive(Debug), because the key is secret.
impl fmt::Debug for Params {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let key = if self.key_length == 0 {
            "<none>"
        } else {
            "<redacted>"
        };
        write!(
            f,
            "Params {{ digest_length: {}, fanout: {}, max_depth: {}, max_leaf_length: {}, \
             node_offset: {}, node_depth: {}, inner_hash_length: {}, last_node: {}, key={} }}",
            self.digest_length,
            self.fanout,
            self.max_depth,
            self.max_leaf_length,
            self.node_offset,
            self.node_depth,
            self.inner_hash_length,
            self.last_node,
            key,
        )
    }
}

/// An incremental BLAKE2b hash state.
///
/// `update` can be called any number of times. `finalize` (or
/// `finalize_into`) can be called once; after that the state is sealed and
/// both calls return [`Error::AlreadySealed`]. To hash something else, replace
/// the state with a new one.
///
/// The chaining value and the block buffer (which can hold key material) are
/// zeroed on drop.
#[derive(Clone)]
pub struct State {
    h: [u64; 8],
    buf: [u8; BLOCKBYTES],
    buflen: usize,
    count: u128,
    outlen: u8,
    last_node: bool,
    sealed: bool,
    platform: Platform,
}

impl State {
    /// An unkeyed state with a `digest_length`-byte output and default
    /// values for all the other parameters. Use [`Params`] for the rest.
    pub fn new(digest_length: usize) -> Result<Self, Error> {
        let mut params = Params::new();
        params.digest_length(digest_length)?;
        Ok(params.to_state())
    }

    /// A keyed state. The key must be between 1 and [`KEYBYTES`] bytes.
    ///
    /// The padded copy of the key is zeroed before this returns, whether or
    /// not it succeeds.
    pub fn new_keyed(digest_length: usize, key: &[u8]) -> Result<Self, Error> {
        if key.is_empty() {
            return Err(Error::InvalidKeyLength(0));
        }
        let mut params = Params::new();
        params.digest_length(digest_length)?.key(key)?;
        Ok(params.to_state())
    }

    /// The number of bytes this state will write out.
    pub fn digest_length(&self) -> usize {
        self.outlen as usize
    }

    /// The number of bytes absorbed so far, including the key block for a
    /// keyed state.
    pub fn count(&self) -> u128 {
        self.count + self.buflen as u128
    }

    fn fill_buf(&mut self, input: &mut &[u8]) {
        let take = cmp::min(BLOCKBYTES - self.buflen, input.len());
        self.buf[self.buflen..][..take].copy_from_slice(&input[..take]);
        self.buflen += take;
        *input = &input[take..];
    }

    // The last block has to be compressed with the finalization flag set, so
    // a full buffer is only compressed once we know more input follows. That
    // means the buffer is never empty after a non-empty update.
    fn absorb(&mut self, mut input: &[u8]) {
        if self.buflen > 0 {
            self.fill_buf(&mut input);
            if !input.is_empty() {
                debug_assert_eq!(self.buflen, BLOCKBYTES);
                self.count += BLOCKBYTES as u128;
                self.platform
                    .compress(&mut self.h, &self.buf, self.count, 0, 0);
                // The first buffered block of a keyed state is the key.
                self.buf.zeroize();
                self.buflen = 0;
            }
        }

        // Compress whole blocks directly from the input when possible, but
        // always leave at least one byte for the buffer.
        while input.len() > BLOCKBYTES {
            debug_assert_eq!(self.buflen, 0);
            self.count += BLOCKBYTES as u128;
            self.platform.compress(
                &mut self.h,
                array_ref!(input, 0, BLOCKBYTES),
                self.count,
                0,
                0,
            );
            input = &input[BLOCKBYTES..];
        }

        self.fill_buf(&mut input);
        debug_assert!(input.is_empty());
    }

    /// Add input to the hash. Returns [`Error::AlreadySealed`] if the state
    /// has been finalized.
    pub fn update(&mut self, input: &[u8]) -> Result<&mut Self, Error> {
        if self.sealed {
            tracing::trace!(len = input.len(), "update rejected, state is sealed");
            return Err(Error::AlreadySealed);
        }
        self.absorb(input);
        Ok(self)
    }

    // Compress the last block and return the full chaining value as bytes.
    // Callers check `sealed` first.
    fn seal(&mut self) -> Hash {
        debug_assert!(!self.sealed);
        self.count += self.buflen as u128;
        self.buf[self.buflen..].fill(0);
        let last_node = if self.last_node { FLAG_SET } else { 0 };
        self.platform
            .compress(&mut self.h, &self.buf, self.count, FLAG_SET, last_node);
        self.buf.zeroize();
        self.buflen = 0;
        self.sealed = true;
        tracing::trace!(count = self.count, outlen = self.outlen, "sealed blake2b state");

        let mut bytes = [0; OUTBYTES];
        for (i, word) in self.h.iter().enumerate() {
            *array_mut_ref!(bytes, 8 * i, 8) = word.to_le_bytes();
        }
        let mut bytes = ArrayVec::from(bytes);
        bytes.truncate(self.outlen as usize);
        Hash { bytes }
    }

    /// Finish the hash and return it. This seals the state.
    pub fn finalize(&mut self) -> Result<Hash, Error> {
        if self.sealed {
            return Err(Error::AlreadySealed);
        }
        Ok(self.seal())
    }

    /// Finish the hash and write it to the first
    /// [`digest_length`](State::digest_length) bytes of `out`. This seals the
    /// state. If `out` is too short, neither `out` nor the state is modified.
    pub fn finalize_into(&mut self, out: &mut [u8]) -> Result<(), Error> {
        if self.sealed {
            return Err(Error::AlreadySealed);
        }
        let outlen = self.outlen as usize;
        if out.len() < outlen {
            return Err(Error::OutputTooShort {
                expected: outlen,
                actual: out.len(),
            });
        }
        let hash = self.seal();
        out[..outlen].copy_from_slice(hash.as_bytes());
        Ok(())
    }
}

impl Drop for State {
    fn drop(&mut self) {
        self.h.zeroize();
        self.buf.zeroize();
    }
}

// Don't derive(Debug), because the state may be secret.
impl fmt::Debug for State {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "State {{ outlen: {}, count: {}, sealed: {}, platform: {:?} }}",
            self.outlen,
            self.count(),
            self.sealed,
            self.platform,
        )
    }
}

#[cfg(feature = "std")]
impl std::io::Write for State {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.update(buf).map_err(std::io::Error::other)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}
