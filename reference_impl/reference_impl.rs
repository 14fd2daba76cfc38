//! A minimal BLAKE2b, written for clarity rather than speed. The tests use it
//! as an independent check on the optimized crate.

use core::cmp::min;

pub const OUT_LEN: usize = 64;
pub const KEY_LEN: usize = 64;
pub const BLOCK_LEN: usize = 128;
const ROUNDS: usize = 12;

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

const MSG_SCHEDULE: [[usize; 16]; 10] = [
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
];

// The mixing function, G, which mixes either a column or a diagonal.
fn g(state: &mut [u64; 16], a: usize, b: usize, c: usize, d: usize, mx: u64, my: u64) {
    state[a] = state[a].wrapping_add(state[b]).wrapping_add(mx);
    state[d] = (state[d] ^ state[a]).rotate_right(32);
    state[c] = state[c].wrapping_add(state[d]);
    state[b] = (state[b] ^ state[c]).rotate_right(24);
    state[a] = state[a].wrapping_add(state[b]).wrapping_add(my);
    state[d] = (state[d] ^ state[a]).rotate_right(16);
    state[c] = state[c].wrapping_add(state[d]);
    state[b] = (state[b] ^ state[c]).rotate_right(63);
}

fn round(state: &mut [u64; 16], m: &[u64; 16], schedule: &[usize; 16]) {
    // Mix the columns.
    g(state, 0, 4, 8, 12, m[schedule[0]], m[schedule[1]]);
    g(state, 1, 5, 9, 13, m[schedule[2]], m[schedule[3]]);
    g(state, 2, 6, 10, 14, m[schedule[4]], m[schedule[5]]);
    g(state, 3, 7, 11, 15, m[schedule[6]], m[schedule[7]]);
    // Mix the diagonals.
    g(state, 0, 5, 10, 15, m[schedule[8]], m[schedule[9]]);
    g(state, 1, 6, 11, 12, m[schedule[10]], m[schedule[11]]);
    g(state, 2, 7, 8, 13, m[schedule[12]], m[schedule[13]]);
    g(state, 3, 4, 9, 14, m[schedule[14]], m[schedule[15]]);
}

/// Compress one block. The flags are 0 or `!0`, and `count` includes this
/// block.
pub fn compress(
    chaining_value: &mut [u64; 8],
    block: &[u8; BLOCK_LEN],
    count: u128,
    last_block: u64,
    last_node: u64,
) {
    let mut block_words = [0; 16];
    words_from_little_endian_bytes(block, &mut block_words);
    let mut state = [0; 16];
    state[..8].copy_from_slice(&chaining_value[..]);
    state[8..].copy_from_slice(&IV);
    state[12] ^= count as u64;
    state[13] ^= (count >> 64) as u64;
    state[14] ^= last_block;
    state[15] ^= last_node;

    for r in 0..ROUNDS {
        round(&mut state, &block_words, &MSG_SCHEDULE[r % 10]);
    }

    for i in 0..8 {
        chaining_value[i] ^= state[i] ^ state[i + 8];
    }
}

fn words_from_little_endian_bytes(bytes: &[u8], words: &mut [u64]) {
    debug_assert_eq!(bytes.len(), 8 * words.len());
    for (eight_bytes, word) in bytes.chunks_exact(8).zip(words) {
        *word = u64::from_le_bytes(eight_bytes.try_into().unwrap());
    }
}

/// An incremental hasher that can accept any number of writes.
pub struct Hasher {
    chaining_value: [u64; 8],
    block: [u8; BLOCK_LEN],
    block_len: usize,
    count: u128,
    out_len: usize,
}

impl Hasher {
    fn new_internal(out_len: usize, key_len: usize) -> Self {
        assert!(1 <= out_len && out_len <= OUT_LEN);
        assert!(key_len <= KEY_LEN);
        let mut chaining_value = IV;
        // digest_length, key_length, fanout = 1, depth = 1
        chaining_value[0] ^= 0x01010000 ^ ((key_len as u64) << 8) ^ out_len as u64;
        Self {
            chaining_value,
            block: [0; BLOCK_LEN],
            block_len: 0,
            count: 0,
            out_len,
        }
    }

    /// Construct a new `Hasher` for the regular hash function.
    pub fn new(out_len: usize) -> Self {
        Self::new_internal(out_len, 0)
    }

    /// Construct a new `Hasher` for the keyed hash function.
    pub fn new_keyed(out_len: usize, key: &[u8]) -> Self {
        let mut hasher = Self::new_internal(out_len, key.len());
        if !key.is_empty() {
            let mut key_block = [0; BLOCK_LEN];
            key_block[..key.len()].copy_from_slice(key);
            hasher.update(&key_block);
        }
        hasher
    }

    /// Add input to the hash state. This can be called any number of times.
    pub fn update(&mut self, mut input: &[u8]) {
        while !input.is_empty() {
            // If the block buffer is full, compress it. More input follows, so
            // it isn't the last block.
            if self.block_len == BLOCK_LEN {
                self.count += BLOCK_LEN as u128;
                compress(&mut self.chaining_value, &self.block, self.count, 0, 0);
                self.block = [0; BLOCK_LEN];
                self.block_len = 0;
            }
            let want = BLOCK_LEN - self.block_len;
            let take = min(want, input.len());
            self.block[self.block_len..][..take].copy_from_slice(&input[..take]);
            self.block_len += take;
            input = &input[take..];
        }
    }

    /// Finalize the hash and write the output to `out_slice`, which must be
    /// at least as long as the output length.
    pub fn finalize(&self, out_slice: &mut [u8]) {
        let mut chaining_value = self.chaining_value;
        let mut block = self.block;
        block[self.block_len..].fill(0);
        let count = self.count + self.block_len as u128;
        compress(&mut chaining_value, &block, count, !0, 0);
        let mut out = [0; OUT_LEN];
        for (word, out_word) in chaining_value.iter().zip(out.chunks_exact_mut(8)) {
            out_word.copy_from_slice(&word.to_le_bytes());
        }
        out_slice[..self.out_len].copy_from_slice(&out[..self.out_len]);
    }
}
