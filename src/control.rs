//! Signal phase definitions used by the learning controller.

use crate::segment::SegmentId;
use serde::Deserialize;
use smallvec::SmallVec;

/// The lights which are green in a phase, by registration index.
pub type Phase = SmallVec<[usize; 4]>;

/// Maps each controller action to a phase.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(transparent)]
pub struct PhasePlan {
    phases: Vec<Phase>,
}

/// Pairs of segments whose movements cross, and so must never be green together.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(transparent)]
pub struct ConflictTable {
    pairs: Vec<(SegmentId, SegmentId)>,
}

impl PhasePlan {
    pub fn new(phases: Vec<Phase>) -> Self {
        Self { phases }
    }

    /// The standard four-way plan: north-south green, east-west green,
    /// then a protected left turn phase.
    pub fn four_way() -> Self {
        Self::new(vec![
            Phase::from_slice(&[0, 1]),
            Phase::from_slice(&[2, 3]),
            Phase::from_slice(&[4, 5]),
        ])
    }

    /// The phase selected by `action`, if there is one.
    pub fn phase(&self, action: usize) -> Option<&Phase> {
        self.phases.get(action)
    }

    pub fn len(&self) -> usize {
        self.phases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.phases.is_empty()
    }
}

impl Default for PhasePlan {
    fn default() -> Self {
        Self::four_way()
    }
}

impl ConflictTable {
    pub fn new(pairs: Vec<(SegmentId, SegmentId)>) -> Self {
        Self { pairs }
    }

    /// The crossings of the standard four-way intersection: the two straight
    /// through crossings and the left turn across oncoming traffic.
    pub fn four_way() -> Self {
        Self::new(vec![(0, 2), (1, 3), (0, 1)])
    }

    /// Whether traffic leaving the two segments conflicts, in either order.
    pub fn conflicts(&self, a: SegmentId, b: SegmentId) -> bool {
        self.pairs
            .iter()
            .any(|pair| *pair == (a, b) || *pair == (b, a))
    }
}

impl Default for ConflictTable {
    fn default() -> Self {
        Self::four_way()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn conflicts_are_symmetric() {
        let table = ConflictTable::four_way();
        assert!(table.conflicts(0, 2));
        assert!(table.conflicts(2, 0));
        assert!(table.conflicts(1, 0));
        assert!(!table.conflicts(0, 3));
        assert!(!table.conflicts(2, 2));
    }

    #[test]
    fn four_way_phases() {
        let plan = PhasePlan::four_way();
        assert_eq!(plan.len(), 3);
        assert_eq!(plan.phase(1).map(|p| p.as_slice()), Some(&[2, 3][..]));
        assert_eq!(plan.phase(3), None);
    }
}
