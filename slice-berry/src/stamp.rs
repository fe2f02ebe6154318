//! 修改时间戳.

use std::sync::atomic::{AtomicU64, Ordering};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

static CLOCK: AtomicU64 = AtomicU64::new(0);

/// 全进程单调递增的修改时间戳. 后取得的时间戳严格大于先取得的.
///
/// 只用于比较新旧, 与墙上时钟无关.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ModifiedTime(u64);

impl ModifiedTime {
    /// 取一个新的时间戳.
    #[inline]
    pub fn now() -> Self {
        Self(CLOCK.fetch_add(1, Ordering::Relaxed) + 1)
    }
}

impl Default for ModifiedTime {
    #[inline]
    fn default() -> Self {
        Self::now()
    }
}

#[cfg(test)]
mod tests {
    use super::ModifiedTime;

    #[test]
    fn test_monotonic() {
        let a = ModifiedTime::now();
        let b = ModifiedTime::now();
        assert_ne!(a, b);
        assert!(a < b);
    }
}
