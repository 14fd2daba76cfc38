use crate::{BLOCKBYTES, IV, SIGMA};
use arrayref::array_refs;

#[inline(always)]
pub(crate) fn words_from_block(bytes: &[u8; BLOCKBYTES]) -> [u64; 16] {
    let refs = array_refs!(bytes, 8, 8, 8, 8, 8, 8, 8, 8, 8, 8, 8, 8, 8, 8, 8, 8);
    [
        u64::from_le_bytes(*refs.0),
        u64::from_le_bytes(*refs.1),
        u64::from_le_bytes(*refs.2),
        u64::from_le_bytes(*refs.3),
        u64::from_le_bytes(*refs.4),
        u64::from_le_bytes(*refs.5),
        u64::from_le_bytes(*refs.6),
        u64::from_le_bytes(*refs.7),
        u64::from_le_bytes(*refs.8),
        u64::from_le_bytes(*refs.9),
        u64::from_le_bytes(*refs.10),
        u64::from_le_bytes(*refs.11),
        u64::from_le_bytes(*refs.12),
        u64::from_le_bytes(*refs.13),
        u64::from_le_bytes(*refs.14),
        u64::from_le_bytes(*refs.15),
    ]
}

#[inline(always)]
fn g(v: &mut [u64; 16], a: usize, b: usize, c: usize, d: usize, x: u64, y: u64) {
    v[a] = v[a].wrapping_add(v[b]).wrapping_add(x);
    v[d] = (v[d] ^ v[a]).rotate_right(32);
    v[c] = v[c].wrapping_add(v[d]);
    v[b] = (v[b] ^ v[c]).rotate_right(24);
    v[a] = v[a].wrapping_add(v[b]).wrapping_add(y);
    v[d] = (v[d] ^ v[a]).rotate_right(16);
    v[c] = v[c].wrapping_add(v[d]);
    v[b] = (v[b] ^ v[c]).rotate_right(63);
}

#[inline(always)]
fn round(v: &mut [u64; 16], m: &[u64; 16], r: usize) {
    // Select the message schedule based on the round.
    let s = &SIGMA[r];

    // Mix the columns.
    g(v, 0, 4, 8, 12, m[s[0]], m[s[1]]);
    g(v, 1, 5, 9, 13, m[s[2]], m[s[3]]);
    g(v, 2, 6, 10, 14, m[s[4]], m[s[5]]);
    g(v, 3, 7, 11, 15, m[s[6]], m[s[7]]);

    // Mix the diagonals.
    g(v, 0, 5, 10, 15, m[s[8]], m[s[9]]);
    g(v, 1, 6, 11, 12, m[s[10]], m[s[11]]);
    g(v, 2, 7, 8, 13, m[s[12]], m[s[13]]);
    g(v, 3, 4, 9, 14, m[s[14]], m[s[15]]);
}

/// The BLAKE2b compression function, in safe scalar code. Every other backend
/// has to match this bit for bit.
pub fn compress(
    h: &mut [u64; 8],
    block: &[u8; BLOCKBYTES],
    count: u128,
    last_block: u64,
    last_node: u64,
) {
    let m = words_from_block(block);
    let mut v = [
        h[0],
        h[1],
        h[2],
        h[3],
        h[4],
        h[5],
        h[6],
        h[7],
        IV[0],
        IV[1],
        IV[2],
        IV[3],
        IV[4] ^ count as u64,
        IV[5] ^ (count >> 64) as u64,
        IV[6] ^ last_block,
        IV[7] ^ last_node,
    ];

    round(&mut v, &m, 0);
    round(&mut v, &m, 1);
    round(&mut v, &m, 2);
    round(&mut v, &m, 3);
    round(&mut v, &m, 4);
    round(&mut v, &m, 5);
    round(&mut v, &m, 6);
    round(&mut v, &m, 7);
    round(&mut v, &m, 8);
    round(&mut v, &m, 9);
    round(&mut v, &m, 10);
    round(&mut v, &m, 11);

    for i in 0..8 {
        h[i] ^= v[i] ^ v[i + 8];
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{BLOCKBYTES, FLAG_SET};

    #[test]
    fn test_words_from_block_little_endian() {
        let mut block = [0; BLOCKBYTES];
        crate::test::paint_test_input(&mut block);
        let words = words_from_block(&block);
        assert_eq!(words[0], 0x0706050403020100);
        assert_eq!(words[15], 0x7f7e7d7c7b7a7978);
    }

    // The empty message with a 64-byte digest is a single compression of the
    // zero block, straight from the parameterized IV.
    #[test]
    fn test_compress_empty_message() {
        let mut h = IV;
        h[0] ^= 0x01010000 ^ 64;
        compress(&mut h, &[0; BLOCKBYTES], 0, FLAG_SET, 0);
        let mut out = [0; 64];
        for (word, chunk) in h.iter().zip(out.chunks_exact_mut(8)) {
            chunk.copy_from_slice(&word.to_le_bytes());
        }
        assert_eq!(
            "786a02f742015903c6c6fd852552d272912f4740e15847618a86e217f71f5419\
             d25e1031afee585313896444934eb04b903a685b1448b755d56f701afe9be2ce",
            hex::encode(&out[..]),
        );
    }

    #[test]
    fn test_flags_change_output() {
        let mut block = [0; BLOCKBYTES];
        crate::test::paint_test_input(&mut block);
        let mut outputs = [IV; 4];
        compress(&mut outputs[0], &block, 128, 0, 0);
        compress(&mut outputs[1], &block, 128, FLAG_SET, 0);
        compress(&mut outputs[2], &block, 128, FLAG_SET, FLAG_SET);
        compress(&mut outputs[3], &block, 128 + (1 << 64), 0, 0);
        for i in 0..outputs.len() {
            for j in i + 1..outputs.len() {
                assert_ne!(outputs[i], outputs[j], "{} {}", i, j);
            }
        }
    }
}
