use crate::{portable, BLOCKBYTES};

#[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
use crate::avx2;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Platform {
    Portable,
    #[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
    AVX2,
}

impl Platform {
    #[allow(unreachable_code)]
    pub fn detect() -> Self {
        #[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
        {
            if avx2_detected() {
                tracing::trace!("using the AVX2 compression backend");
                return Platform::AVX2;
            }
        }
        tracing::trace!("using the portable compression backend");
        Platform::Portable
    }

    pub fn portable() -> Self {
        Platform::Portable
    }

    #[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
    pub fn avx2() -> Option<Self> {
        if avx2_detected() {
            Some(Platform::AVX2)
        } else {
            None
        }
    }

    /// Compress one block into `h`. `count` includes the block itself, and the
    /// two flags are either 0 or all ones.
    pub fn compress(
        &self,
        h: &mut [u64; 8],
        block: &[u8; BLOCKBYTES],
        count: u128,
        last_block: u64,
        last_node: u64,
    ) {
        match self {
            Platform::Portable => portable::compress(h, block, count, last_block, last_node),
            // Safe because detect() checked for platform support.
            #[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
            Platform::AVX2 => unsafe { avx2::compress(h, block, count, last_block, last_node) },
        }
    }
}

cfg_if::cfg_if! {
    if #[cfg(all(
        feature = "no_avx2",
        any(target_arch = "x86", target_arch = "x86_64")
    ))] {
        #[inline(always)]
        pub fn avx2_detected() -> bool {
            false
        }
    } else if #[cfg(any(target_arch = "x86", target_arch = "x86_64"))] {
        #[inline(always)]
        #[allow(unreachable_code)]
        pub fn avx2_detected() -> bool {
            // Static check, e.g. for building with target-cpu=native.
            #[cfg(target_feature = "avx2")]
            {
                return true;
            }
            // Dynamic check, if std is enabled.
            #[cfg(feature = "std")]
            {
                if is_x86_feature_detected!("avx2") {
                    return true;
                }
            }
            false
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_detect_is_stable() {
        assert_eq!(Platform::detect(), Platform::detect());
    }

    #[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
    #[test]
    fn test_detect_prefers_avx2() {
        match Platform::avx2() {
            Some(avx2) => assert_eq!(Platform::detect(), avx2),
            None => assert_eq!(Platform::detect(), Platform::portable()),
        }
    }

    #[cfg(feature = "no_avx2")]
    #[test]
    fn test_no_avx2_forces_portable() {
        assert_eq!(Platform::detect(), Platform::Portable);
    }
}
