//! Safety information shared by all worker threads: points whose final
//! ownership is proven before the search starts. The solver producing it is
//! a pluggable capability; the default proves nothing, leaving every point
//! contested.

use crate::board::{Board, Point};

/// A set of board points.
#[derive(Clone, Debug, Default)]
pub struct PointSet {
    bits: Vec<bool>,
}

impl PointSet {
    pub fn new(area: usize) -> Self {
        PointSet {
            bits: vec![false; area],
        }
    }

    pub fn contains(&self, p: Point) -> bool {
        self.bits.get(p).copied().unwrap_or(false)
    }

    pub fn insert(&mut self, p: Point) {
        self.bits[p] = true;
    }

    pub fn len(&self) -> usize {
        self.bits.iter().filter(|&&b| b).count()
    }

    pub fn is_empty(&self) -> bool {
        !self.bits.iter().any(|&b| b)
    }
}

/// One point set per color.
#[derive(Clone, Debug, Default)]
pub struct BwSet {
    pub black: PointSet,
    pub white: PointSet,
}

impl BwSet {
    pub fn new(area: usize) -> Self {
        BwSet {
            black: PointSet::new(area),
            white: PointSet::new(area),
        }
    }

    pub fn one_contains(&self, p: Point) -> bool {
        self.black.contains(p) || self.white.contains(p)
    }
}

/// Read-only safety data built once per search by the controller and shared
/// with every thread state behind an `Arc`. All writes happen before the
/// workers are released.
#[derive(Clone, Debug)]
pub struct SafetyInfo {
    /// Points proven to belong to each color.
    pub safe: BwSet,
    /// Union of both safe sets, indexed per point.
    pub all_safe: PointSet,
}

impl SafetyInfo {
    /// Safety information proving nothing: every point is contested.
    pub fn empty(area: usize) -> Self {
        SafetyInfo {
            safe: BwSet::new(area),
            all_safe: PointSet::new(area),
        }
    }

    pub fn from_safe_sets(area: usize, safe: BwSet) -> Self {
        let mut all_safe = PointSet::new(area);
        for p in 0..area {
            if safe.one_contains(p) {
                all_safe.insert(p);
            }
        }
        SafetyInfo { safe, all_safe }
    }
}

/// Capability that proves points safe before a search. Disabled by default;
/// the controller treats an absent solver as "nothing proven".
pub trait SafetySolver: Send + Sync {
    fn find_safe_points(&self, bd: &Board) -> BwSet;
}

/// The default solver: proves nothing safe.
pub struct NoSafetySolver;

impl SafetySolver for NoSafetySolver {
    fn find_safe_points(&self, bd: &Board) -> BwSet {
        BwSet::new(bd.area())
    }
}
