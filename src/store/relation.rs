//! Pairwise links between regions.

use serde::{Deserialize, Serialize};

use crate::geom::RegionId;

/// Which way a relation points.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    #[default]
    Right,
    Left,
    Bi,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Relation {
    pub from: RegionId,
    pub to: RegionId,
    pub direction: Direction,
    pub labels: Vec<String>,
}

/// All relations of an annotation.
#[derive(Clone, Debug, Default)]
pub struct RelationStore {
    relations: Vec<Relation>,
}

impl RelationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Links two regions. Self-links and duplicates are refused.
    pub fn add(&mut self, from: RegionId, to: RegionId) -> bool {
        if from == to || self.find(from, to).is_some() {
            return false;
        }
        self.relations.push(Relation {
            from,
            to,
            direction: Direction::Right,
            labels: Vec::new(),
        });
        true
    }

    pub fn find(&self, from: RegionId, to: RegionId) -> Option<&Relation> {
        self.relations.iter().find(|r| r.from == from && r.to == to)
    }

    pub fn find_mut(&mut self, from: RegionId, to: RegionId) -> Option<&mut Relation> {
        self.relations.iter_mut().find(|r| r.from == from && r.to == to)
    }

    pub fn remove(&mut self, from: RegionId, to: RegionId) -> Option<Relation> {
        let idx = self.relations.iter().position(|r| r.from == from && r.to == to)?;
        Some(self.relations.remove(idx))
    }

    /// Drops every relation touching `region`; returns how many went.
    pub fn remove_region(&mut self, region: RegionId) -> usize {
        let before = self.relations.len();
        self.relations.retain(|r| r.from != region && r.to != region);
        before - self.relations.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Relation> {
        self.relations.iter()
    }

    pub fn len(&self) -> usize {
        self.relations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.relations.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn refuses_self_and_duplicate_links() {
        let (a, b) = (RegionId::new(1), RegionId::new(2));
        let mut store = RelationStore::new();
        assert!(!store.add(a, a));
        assert!(store.add(a, b));
        assert!(!store.add(a, b));
        assert!(store.add(b, a));
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn removing_a_region_drops_its_edges() {
        let (a, b, c) = (RegionId::new(1), RegionId::new(2), RegionId::new(3));
        let mut store = RelationStore::new();
        store.add(a, b);
        store.add(c, a);
        store.add(b, c);
        assert_eq!(store.remove_region(a), 2);
        assert_eq!(store.iter().count(), 1);
    }
}
