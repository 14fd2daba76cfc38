#[cfg(target_arch = "x86")]
use core::arch::x86::*;
#[cfg(target_arch = "x86_64")]
use core::arch::x86_64::*;

use crate::portable::words_from_block;
use crate::{BLOCKBYTES, IV, SIGMA};

#[inline(always)]
unsafe fn loadu(src: *const u64) -> __m256i {
    // This is an unaligned load, so the pointer cast is allowed.
    _mm256_loadu_si256(src as *const __m256i)
}

#[inline(always)]
unsafe fn storeu(src: __m256i, dest: *mut u64) {
    // This is an unaligned store, so the pointer cast is allowed.
    _mm256_storeu_si256(dest as *mut __m256i, src)
}

#[inline(always)]
unsafe fn add(a: __m256i, b: __m256i) -> __m256i {
    _mm256_add_epi64(a, b)
}

#[inline(always)]
unsafe fn xor(a: __m256i, b: __m256i) -> __m256i {
    _mm256_xor_si256(a, b)
}

#[inline(always)]
unsafe fn set4(a: u64, b: u64, c: u64, d: u64) -> __m256i {
    _mm256_setr_epi64x(a as i64, b as i64, c as i64, d as i64)
}

// Adapted from https://github.com/rust-lang-nursery/stdsimd/pull/479.
macro_rules! _MM_SHUFFLE {
    ($z:expr, $y:expr, $x:expr, $w:expr) => {
        ($z << 6) | ($y << 4) | ($x << 2) | $w
    };
}

// Swapping the 32-bit halves of each word is a rotation by 32.
#[inline(always)]
unsafe fn rot32(x: __m256i) -> __m256i {
    _mm256_shuffle_epi32(x, _MM_SHUFFLE!(2, 3, 0, 1))
}

#[inline(always)]
unsafe fn rot24(x: __m256i) -> __m256i {
    _mm256_shuffle_epi8(
        x,
        _mm256_setr_epi8(
            3, 4, 5, 6, 7, 0, 1, 2, 11, 12, 13, 14, 15, 8, 9, 10, 3, 4, 5, 6, 7, 0, 1, 2, 11, 12,
            13, 14, 15, 8, 9, 10,
        ),
    )
}

#[inline(always)]
unsafe fn rot16(x: __m256i) -> __m256i {
    _mm256_shuffle_epi8(
        x,
        _mm256_setr_epi8(
            2, 3, 4, 5, 6, 7, 0, 1, 10, 11, 12, 13, 14, 15, 8, 9, 2, 3, 4, 5, 6, 7, 0, 1, 10, 11,
            12, 13, 14, 15, 8, 9,
        ),
    )
}

// Rotating right by 63 is rotating left by 1, and x + x is x << 1.
#[inline(always)]
unsafe fn rot63(x: __m256i) -> __m256i {
    _mm256_or_si256(_mm256_srli_epi64(x, 63), add(x, x))
}

#[inline(always)]
unsafe fn g1(a: &mut __m256i, b: &mut __m256i, c: &mut __m256i, d: &mut __m256i, m: __m256i) {
    *a = add(add(*a, m), *b);
    *d = rot32(xor(*d, *a));
    *c = add(*c, *d);
    *b = rot24(xor(*b, *c));
}

#[inline(always)]
unsafe fn g2(a: &mut __m256i, b: &mut __m256i, c: &mut __m256i, d: &mut __m256i, m: __m256i) {
    *a = add(add(*a, m), *b);
    *d = rot16(xor(*d, *a));
    *c = add(*c, *d);
    *b = rot63(xor(*b, *c));
}

// Lane i of each row moves so that the four lanes line up along the
// diagonals: (a0, b1, c2, d3), (a1, b2, c3, d0), and so on.
#[inline(always)]
unsafe fn diagonalize(b: &mut __m256i, c: &mut __m256i, d: &mut __m256i) {
    *b = _mm256_permute4x64_epi64(*b, _MM_SHUFFLE!(0, 3, 2, 1));
    *c = _mm256_permute4x64_epi64(*c, _MM_SHUFFLE!(1, 0, 3, 2));
    *d = _mm256_permute4x64_epi64(*d, _MM_SHUFFLE!(2, 1, 0, 3));
}

#[inline(always)]
unsafe fn undiagonalize(b: &mut __m256i, c: &mut __m256i, d: &mut __m256i) {
    *b = _mm256_permute4x64_epi64(*b, _MM_SHUFFLE!(2, 1, 0, 3));
    *c = _mm256_permute4x64_epi64(*c, _MM_SHUFFLE!(1, 0, 3, 2));
    *d = _mm256_permute4x64_epi64(*d, _MM_SHUFFLE!(0, 3, 2, 1));
}

#[inline(always)]
unsafe fn round(
    a: &mut __m256i,
    b: &mut __m256i,
    c: &mut __m256i,
    d: &mut __m256i,
    m: &[u64; 16],
    r: usize,
) {
    let s = &SIGMA[r];
    g1(a, b, c, d, set4(m[s[0]], m[s[2]], m[s[4]], m[s[6]]));
    g2(a, b, c, d, set4(m[s[1]], m[s[3]], m[s[5]], m[s[7]]));
    diagonalize(b, c, d);
    g1(a, b, c, d, set4(m[s[8]], m[s[10]], m[s[12]], m[s[14]]));
    g2(a, b, c, d, set4(m[s[9]], m[s[11]], m[s[13]], m[s[15]]));
    undiagonalize(b, c, d);
}

#[target_feature(enable = "avx2")]
pub unsafe fn compress(
    h: &mut [u64; 8],
    block: &[u8; BLOCKBYTES],
    count: u128,
    last_block: u64,
    last_node: u64,
) {
    let m = words_from_block(block);
    let a = &mut loadu(h.as_ptr());
    let b = &mut loadu(h.as_ptr().add(4));
    let c = &mut loadu(IV.as_ptr());
    let d = &mut xor(
        loadu(IV.as_ptr().add(4)),
        set4(count as u64, (count >> 64) as u64, last_block, last_node),
    );
    let h_low = *a;
    let h_high = *b;

    round(a, b, c, d, &m, 0);
    round(a, b, c, d, &m, 1);
    round(a, b, c, d, &m, 2);
    round(a, b, c, d, &m, 3);
    round(a, b, c, d, &m, 4);
    round(a, b, c, d, &m, 5);
    round(a, b, c, d, &m, 6);
    round(a, b, c, d, &m, 7);
    round(a, b, c, d, &m, 8);
    round(a, b, c, d, &m, 9);
    round(a, b, c, d, &m, 10);
    round(a, b, c, d, &m, 11);

    storeu(xor(xor(*a, *c), h_low), h.as_mut_ptr());
    storeu(xor(xor(*b, *d), h_high), h.as_mut_ptr().add(4));
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_compress() {
        if !crate::platform::avx2_detected() {
            return;
        }
        crate::test::test_compress_vs_portable(compress);
    }

    #[test]
    fn test_rotations() {
        if !crate::platform::avx2_detected() {
            return;
        }
        let words = [
            0x0123456789abcdef,
            0xfedcba9876543210,
            0x8000000000000001,
            0x00000000ffffffff,
        ];
        let mut out = [0u64; 4];
        unsafe {
            let x = loadu(words.as_ptr());
            storeu(rot32(x), out.as_mut_ptr());
            assert_eq!(out, words.map(|w| w.rotate_right(32)));
            storeu(rot24(x), out.as_mut_ptr());
            assert_eq!(out, words.map(|w| w.rotate_right(24)));
            storeu(rot16(x), out.as_mut_ptr());
            assert_eq!(out, words.map(|w| w.rotate_right(16)));
            storeu(rot63(x), out.as_mut_ptr());
            assert_eq!(out, words.map(|w| w.rotate_right(63)));
        }
    }
}
