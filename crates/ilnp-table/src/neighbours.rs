//! Tracks this node's one-hop link-local neighbours and the time since each last refreshed its
//! link with a HELLO.
//!
//! Grounded on `control.py::NeighbourLinks`. A neighbour is added on its first HELLO and removed
//! once its age reaches `2 x KEEPALIVE_INTERVAL`.

use std::collections::HashMap;

#[derive(Debug, Default, Clone)]
pub struct NeighbourLinks {
    age_by_neighbour: HashMap<u64, u32>,
}

impl NeighbourLinks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, neighbour_id: u64) -> bool {
        self.age_by_neighbour.contains_key(&neighbour_id)
    }

    pub fn age_of(&self, neighbour_id: u64) -> Option<u32> {
        self.age_by_neighbour.get(&neighbour_id).copied()
    }

    pub fn add(&mut self, neighbour_id: u64) {
        self.age_by_neighbour.insert(neighbour_id, 0);
    }

    pub fn refresh(&mut self, neighbour_id: u64) {
        self.age_by_neighbour.insert(neighbour_id, 0);
    }

    pub fn age_all(&mut self, interval_secs: u32) {
        for age in self.age_by_neighbour.values_mut() {
            *age += interval_secs;
        }
    }

    /// Removes and returns every neighbour whose age has reached `max_age_secs`.
    pub fn pop_expired(&mut self, max_age_secs: u32) -> Vec<u64> {
        let expired: Vec<u64> = self.age_by_neighbour.iter().filter(|(_, &age)| age >= max_age_secs).map(|(&id, _)| id).collect();
        for id in &expired {
            self.age_by_neighbour.remove(id);
        }
        expired
    }

    pub fn ids(&self) -> impl Iterator<Item = u64> + '_ {
        self.age_by_neighbour.keys().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn refreshing_resets_age() {
        let mut links = NeighbourLinks::new();
        links.add(1);
        links.age_all(20);
        assert_eq!(links.age_of(1), Some(20));
        links.refresh(1);
        assert_eq!(links.age_of(1), Some(0));
    }

    #[test]
    fn pops_only_expired_neighbours() {
        let mut links = NeighbourLinks::new();
        links.add(1);
        links.add(2);
        links.age_all(40);
        links.refresh(2);

        let expired = links.pop_expired(40);
        assert_eq!(expired, vec![1]);
        assert!(!links.contains(1));
        assert!(links.contains(2));
    }
}
