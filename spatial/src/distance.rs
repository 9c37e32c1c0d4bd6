use room_core::SourceId;
use std::collections::HashMap;

/// Per-tick distances from the listener to every source, in input order.
///
/// Iteration order is the order of the source sequence the map was built
/// from. Focus consumers break ties by taking the first match, so the order
/// is part of the contract, not an accident of the container.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DistanceMap {
    entries: Vec<(SourceId, f32)>,
    index: HashMap<SourceId, usize>,
}

impl DistanceMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
            index: HashMap::with_capacity(capacity),
        }
    }

    /// Record `distance` for `id`.
    ///
    /// A repeated id keeps its first position and takes the newer value.
    pub fn insert(&mut self, id: SourceId, distance: f32) {
        match self.index.get(&id) {
            Some(&slot) => self.entries[slot].1 = distance,
            None => {
                self.index.insert(id.clone(), self.entries.len());
                self.entries.push((id, distance));
            }
        }
    }

    pub fn get(&self, id: &SourceId) -> Option<f32> {
        self.index.get(id).map(|&slot| self.entries[slot].1)
    }

    pub fn contains(&self, id: &SourceId) -> bool {
        self.index.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&SourceId, f32)> + '_ {
        self.entries.iter().map(|(id, d)| (id, *d))
    }

    pub fn keys(&self) -> impl Iterator<Item = &SourceId> + '_ {
        self.entries.iter().map(|(id, _)| id)
    }

    /// Smallest distance in the map, if any.
    pub fn min_distance(&self) -> Option<f32> {
        self.entries.iter().map(|(_, d)| *d).reduce(f32::min)
    }

    /// First id, in input order, whose distance is within `threshold`.
    pub fn first_within(&self, threshold: f32) -> Option<&SourceId> {
        self.entries
            .iter()
            .find(|(_, d)| *d <= threshold)
            .map(|(id, _)| id)
    }
}

impl<'a> IntoIterator for &'a DistanceMap {
    type Item = &'a (SourceId, f32);
    type IntoIter = std::slice::Iter<'a, (SourceId, f32)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}
