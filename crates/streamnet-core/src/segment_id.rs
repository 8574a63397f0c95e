//! Stream/lake segment identifiers.
//!
//! The cell table encodes segments as signed integers: positive for stream
//! segments, negative for lake segments, zero for "no segment". Inside the
//! crate the sign is carried as a variant instead, and converted back only
//! when values are written to the table or exported.
use std::cmp::Ordering;
use std::fmt;
use std::num::NonZeroU32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SegmentId {
    Stream(NonZeroU32),
    Lake(NonZeroU32),
}

impl SegmentId {
    /// Decode a signed table value. Returns `None` for 0 and for `i32::MIN`,
    /// which has no positive counterpart.
    pub fn from_raw(raw: i32) -> Option<Self> {
        if raw == i32::MIN {
            return None;
        }
        let magnitude = NonZeroU32::new(raw.unsigned_abs())?;
        Some(if raw > 0 {
            SegmentId::Stream(magnitude)
        } else {
            SegmentId::Lake(magnitude)
        })
    }

    pub fn to_raw(self) -> i32 {
        match self {
            SegmentId::Stream(n) => n.get() as i32,
            SegmentId::Lake(n) => -(n.get() as i32),
        }
    }

    pub fn is_stream(self) -> bool {
        matches!(self, SegmentId::Stream(_))
    }

    pub fn is_lake(self) -> bool {
        matches!(self, SegmentId::Lake(_))
    }

    /// Segment number without the stream/lake tag.
    pub fn number(self) -> u32 {
        match self {
            SegmentId::Stream(n) | SegmentId::Lake(n) => n.get(),
        }
    }
}

// Ordered by the signed value so iteration matches a sorted list of raw ids.
impl Ord for SegmentId {
    fn cmp(&self, other: &Self) -> Ordering {
        self.to_raw().cmp(&other.to_raw())
    }
}

impl PartialOrd for SegmentId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for SegmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_raw())
    }
}

/// Where a segment discharges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Downstream {
    Segment(SegmentId),
    /// Flow leaves the modelled domain.
    Exit,
}

impl Downstream {
    /// Table encoding, with `exit_seg` standing in for [`Downstream::Exit`].
    pub fn to_raw(self, exit_seg: i32) -> i32 {
        match self {
            Downstream::Segment(id) => id.to_raw(),
            Downstream::Exit => exit_seg,
        }
    }

    pub fn segment(self) -> Option<SegmentId> {
        match self {
            Downstream::Segment(id) => Some(id),
            Downstream::Exit => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_sign_selects_kind() {
        assert_eq!(SegmentId::from_raw(0), None);
        let s = SegmentId::from_raw(12).unwrap();
        let l = SegmentId::from_raw(-3).unwrap();
        assert!(s.is_stream());
        assert!(l.is_lake());
        assert_eq!(s.to_raw(), 12);
        assert_eq!(l.to_raw(), -3);
        assert_eq!(l.number(), 3);
    }

    #[test]
    fn extreme_values_round_trip() {
        assert_eq!(SegmentId::from_raw(i32::MIN), None);
        for raw in [i32::MAX, -i32::MAX, 1, -1] {
            assert_eq!(SegmentId::from_raw(raw).map(|s| s.to_raw()), Some(raw));
        }
    }

    #[test]
    fn lakes_sort_before_streams() {
        let mut ids: Vec<SegmentId> = [4, -1, 2, -7]
            .into_iter()
            .filter_map(SegmentId::from_raw)
            .collect();
        ids.sort();
        let raw: Vec<i32> = ids.iter().map(|s| s.to_raw()).collect();
        assert_eq!(raw, vec![-7, -1, 2, 4]);
    }

    #[test]
    fn exit_uses_configured_sentinel() {
        assert_eq!(Downstream::Exit.to_raw(0), 0);
        assert_eq!(Downstream::Exit.to_raw(9999), 9999);
        let d = Downstream::Segment(SegmentId::from_raw(-2).unwrap());
        assert_eq!(d.to_raw(0), -2);
    }
}
