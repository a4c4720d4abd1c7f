//! Configuration for reading layouts from untrusted buffers.

use core::ops::{Bound, RangeBounds};

/// Configuration for limiting the range of a value.
///
/// This is used to limit the element count of length-prefixed and open-ended arrays.
///
/// # Examples
///
/// ```
/// use binlayout_codec::RangeCfg;
///
/// // Limit lengths to 0..=1024 (type inferred as usize)
/// let cfg = RangeCfg::new(0..=1024);
/// assert!(cfg.contains(&500));
/// assert!(!cfg.contains(&2000));
///
/// // Allow any length >= 1
/// let cfg_min = RangeCfg::from(1..);
/// assert!(cfg_min.contains(&1));
/// assert!(!cfg_min.contains(&0));
/// ```
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct RangeCfg<T: Copy + PartialOrd> {
    /// The lower bound of the range.
    start: Bound<T>,

    /// The upper bound of the range.
    end: Bound<T>,
}

impl<T: Copy + PartialOrd> From<core::ops::Range<T>> for RangeCfg<T> {
    fn from(r: core::ops::Range<T>) -> Self {
        Self::new(r)
    }
}

impl<T: Copy + PartialOrd> From<core::ops::RangeInclusive<T>> for RangeCfg<T> {
    fn from(r: core::ops::RangeInclusive<T>) -> Self {
        Self::new(r)
    }
}

impl<T: Copy + PartialOrd> From<core::ops::RangeFrom<T>> for RangeCfg<T> {
    fn from(r: core::ops::RangeFrom<T>) -> Self {
        Self::new(r)
    }
}

impl<T: Copy + PartialOrd> From<core::ops::RangeTo<T>> for RangeCfg<T> {
    fn from(r: core::ops::RangeTo<T>) -> Self {
        Self::new(r)
    }
}

impl<T: Copy + PartialOrd> From<core::ops::RangeToInclusive<T>> for RangeCfg<T> {
    fn from(r: core::ops::RangeToInclusive<T>) -> Self {
        Self::new(r)
    }
}

impl<T: Copy + PartialOrd> From<core::ops::RangeFull> for RangeCfg<T> {
    fn from(_: core::ops::RangeFull) -> Self {
        Self::new(..)
    }
}

impl<T: Copy + PartialOrd> RangeCfg<T> {
    /// Creates a new `RangeCfg` from any type implementing `RangeBounds<T>`.
    ///
    /// # Examples
    ///
    /// ```
    /// use binlayout_codec::RangeCfg;
    ///
    /// let cfg = RangeCfg::new(0..=1024);
    /// assert!(cfg.contains(&500));
    /// ```
    pub fn new(r: impl RangeBounds<T>) -> Self {
        RangeCfg {
            start: r.start_bound().cloned(),
            end: r.end_bound().cloned(),
        }
    }

    /// Creates a `RangeCfg` that only accepts exactly `value`.
    pub fn exact(value: T) -> Self {
        Self {
            start: Bound::Included(value),
            end: Bound::Included(value),
        }
    }

    /// Returns true if the value is within this range.
    pub fn contains(&self, value: &T) -> bool {
        // Exclude by start bound
        match &self.start {
            Bound::Included(s) if value < s => return false,
            Bound::Excluded(s) if value <= s => return false,
            _ => {}
        }

        // Exclude by end bound
        match &self.end {
            Bound::Included(e) if value > e => return false,
            Bound::Excluded(e) if value >= e => return false,
            _ => {}
        }

        // If not excluded by either bound, the value is within the range
        true
    }
}

impl<T: Copy + PartialOrd> RangeBounds<T> for RangeCfg<T> {
    fn start_bound(&self) -> Bound<&T> {
        self.start.as_ref()
    }

    fn end_bound(&self) -> Bound<&T> {
        self.end.as_ref()
    }
}

/// Configuration for [crate::deserialize_cfg].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ReadCfg {
    /// Fail with [crate::Error::ExtraData] if bytes remain after the layout was read.
    pub consume_all: bool,

    /// Allowed element count of arrays whose length is not fixed by the layout.
    pub array_len: RangeCfg<usize>,
}

impl ReadCfg {
    /// Configuration that allows trailing bytes.
    pub fn partial() -> Self {
        Self {
            consume_all: false,
            ..Self::default()
        }
    }

    /// Limits the element count of arrays whose length is not fixed by the layout.
    pub fn with_array_len(mut self, range: impl Into<RangeCfg<usize>>) -> Self {
        self.array_len = range.into();
        self
    }
}

impl Default for ReadCfg {
    fn default() -> Self {
        Self {
            consume_all: true,
            array_len: RangeCfg::from(..),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::ops::Bound::{Excluded, Included, Unbounded};

    #[test]
    fn test_range_cfg_from() {
        let cfg: RangeCfg<usize> = (..).into();
        assert_eq!((cfg.start, cfg.end), (Unbounded, Unbounded));

        let cfg: RangeCfg<usize> = (5..10).into();
        assert_eq!((cfg.start, cfg.end), (Included(5), Excluded(10)));

        let cfg: RangeCfg<usize> = (..=10).into();
        assert_eq!((cfg.start, cfg.end), (Unbounded, Included(10)));

        assert_eq!(RangeCfg::exact(3usize), RangeCfg::from(3..=3));
    }

    #[test]
    fn test_range_cfg_contains() {
        let cfg: RangeCfg<usize> = (5..10).into();
        assert!(!cfg.contains(&4));
        assert!(cfg.contains(&5));
        assert!(cfg.contains(&9));
        assert!(!cfg.contains(&10));

        let cfg: RangeCfg<usize> = (..=10).into();
        assert!(cfg.contains(&0));
        assert!(cfg.contains(&10));
        assert!(!cfg.contains(&11));

        // Empty ranges contain nothing
        let cfg: RangeCfg<usize> = (5..5).into();
        assert!(!cfg.contains(&5));
    }

    #[test]
    fn test_read_cfg() {
        let cfg = ReadCfg::default();
        assert!(cfg.consume_all);
        assert!(cfg.array_len.contains(&usize::MAX));

        let cfg = ReadCfg::partial().with_array_len(..=16);
        assert!(!cfg.consume_all);
        assert!(cfg.array_len.contains(&16));
        assert!(!cfg.array_len.contains(&17));
    }
}
