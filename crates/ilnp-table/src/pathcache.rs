//! Remembers, for each destination locator reached via reactive route discovery, the shortest
//! path found and a second path chosen to be maximally disjoint from the first — a ready backup
//! if a link on the main path breaks.
//!
//! Grounded on `interzone.py::PathCache`/`choose_best_backup`/`get_difference_counts`.

use std::collections::HashMap;

fn shared_and_distinct_hop_counts(path_one: &[u64], path_two: &[u64]) -> (usize, usize) {
    let mut shared = 0;
    let mut distinct = 0;
    for hop in path_one {
        if path_two.contains(hop) {
            shared += 1;
        } else {
            distinct += 1;
        }
    }
    (shared, distinct)
}

/// Of `candidate_a` and `candidate_b`, picks whichever shares fewer locators with `main_path`;
/// ties are broken by preferring the shorter path.
fn choose_best_backup(main_path: &[u64], candidate_a: Vec<u64>, candidate_b: Vec<u64>) -> Vec<u64> {
    let (shared_a, _) = shared_and_distinct_hop_counts(main_path, &candidate_a);
    let (shared_b, _) = shared_and_distinct_hop_counts(main_path, &candidate_b);

    if shared_a == shared_b {
        if candidate_a.len() < candidate_b.len() {
            candidate_a
        } else {
            candidate_b
        }
    } else if shared_a < shared_b {
        candidate_a
    } else {
        candidate_b
    }
}

#[derive(Debug, Default, Clone)]
pub struct PathCache {
    destination_to_paths: HashMap<u64, (Vec<u64>, Vec<u64>)>,
}

impl PathCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, destination_locator: u64) -> bool {
        self.destination_to_paths.contains_key(&destination_locator)
    }

    /// Records a newly discovered path to `destination_locator`, replacing the main path if
    /// `path` is shorter and recomputing the backup's disjointness against whichever path ends
    /// up as main.
    pub fn record_path(&mut self, destination_locator: u64, path: Vec<u64>) {
        match self.destination_to_paths.remove(&destination_locator) {
            None => {
                self.destination_to_paths.insert(destination_locator, (path.clone(), path));
            }
            Some((main_path, backup_path)) => {
                let (new_main, new_backup) = if path.len() < main_path.len() {
                    let backup = choose_best_backup(&path, main_path, backup_path);
                    (path, backup)
                } else {
                    let backup = choose_best_backup(&main_path, backup_path, path);
                    (main_path, backup)
                };
                self.destination_to_paths.insert(destination_locator, (new_main, new_backup));
            }
        }
    }

    pub fn main_path(&self, destination_locator: u64) -> Option<&[u64]> {
        self.destination_to_paths.get(&destination_locator).map(|(main, _)| main.as_slice())
    }

    pub fn paths(&self) -> impl Iterator<Item = (u64, &Vec<u64>)> {
        self.destination_to_paths.iter().map(|(locator, (main, _))| (*locator, main))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_recorded_path_is_both_main_and_backup() {
        let mut cache = PathCache::new();
        cache.record_path(99, vec![1, 2, 99]);
        assert_eq!(cache.main_path(99), Some([1, 2, 99].as_slice()));
    }

    #[test]
    fn shorter_path_replaces_main() {
        let mut cache = PathCache::new();
        cache.record_path(99, vec![1, 2, 3, 99]);
        cache.record_path(99, vec![5, 99]);
        assert_eq!(cache.main_path(99), Some([5, 99].as_slice()));
    }

    #[test]
    fn backup_prefers_disjoint_path() {
        let mut cache = PathCache::new();
        cache.record_path(99, vec![1, 2, 99]);
        // Same length as main, shares nothing -> becomes backup.
        cache.record_path(99, vec![7, 8, 99]);

        assert_eq!(cache.main_path(99), Some([1, 2, 99].as_slice()));
        let (_, backup) = cache.destination_to_paths.get(&99).unwrap();
        assert_eq!(backup, &vec![7, 8, 99]);
    }
}
