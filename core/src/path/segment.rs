use bitflags::bitflags;

bitflags! {
    /// Per-row segment type, read by the shader to pick joint and cap logic.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct SegmentFlags: u8 {
        /// First segment of an open path.
        const START = 1 << 0;
        /// Last segment of an open path.
        const END = 1 << 1;
        /// Segment joining the last point of a loop back to its first.
        const LOOP_CLOSING = 1 << 2;
        /// Padding row between two paths. Must not be drawn.
        const GAP = 1 << 3;
    }
}

impl SegmentFlags {
    /// Flags for segment `index` of a path with `count` segments.
    pub fn for_segment(index: usize, count: usize, closed: bool) -> Self {
        let last = index + 1 == count;
        match (closed, index == 0, last) {
            (true, _, true) => Self::LOOP_CLOSING,
            (true, _, false) => Self::empty(),
            (false, first, last) => {
                let mut flags = Self::empty();
                flags.set(Self::START, first);
                flags.set(Self::END, last);
                flags
            }
        }
    }

    /// Whether the row is a real segment.
    pub fn is_drawable(self) -> bool {
        !self.contains(Self::GAP)
    }
}

/// One drawable row: the four neighbouring points and the type flags.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SegmentRecord {
    pub left: [f32; 3],
    pub start: [f32; 3],
    pub end: [f32; 3],
    pub right: [f32; 3],
    pub flags: SegmentFlags,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::single_open(0, 1, false, SegmentFlags::START | SegmentFlags::END)]
    #[case::open_first(0, 4, false, SegmentFlags::START)]
    #[case::open_middle(2, 4, false, SegmentFlags::empty())]
    #[case::open_last(3, 4, false, SegmentFlags::END)]
    #[case::loop_first(0, 5, true, SegmentFlags::empty())]
    #[case::loop_closing(4, 5, true, SegmentFlags::LOOP_CLOSING)]
    fn test_flags_for_segment(
        #[case] index: usize,
        #[case] count: usize,
        #[case] closed: bool,
        #[case] expected: SegmentFlags,
    ) {
        assert_eq!(SegmentFlags::for_segment(index, count, closed), expected);
    }

    #[test]
    fn test_gap_is_not_drawable() {
        assert!(!SegmentFlags::GAP.is_drawable());
        assert!(SegmentFlags::START.is_drawable());
        assert_eq!(SegmentFlags::GAP.bits(), 8);
    }
}
