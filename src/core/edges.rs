//! Triangular coupling table: one `{weight, phase}` entry per unordered node pair.

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct EdgeParams {
    pub weight: f64,
    /// Phase bias (rad) the pair settles at.
    pub phase: f64,
}

/// Upper-triangular storage indexed by `[min(i, j)][max(i, j)]`.
///
/// Entries are laid out row-major: `(0,1), (0,2), .., (0,n-1), (1,2), ..`.
#[derive(Clone, Debug, PartialEq)]
pub struct EdgeTable {
    nodes: usize,
    entries: Vec<EdgeParams>,
}

impl EdgeTable {
    pub fn pair_count(nodes: usize) -> usize {
        nodes * nodes.saturating_sub(1) / 2
    }

    /// Returns `None` when `entries` does not cover exactly every pair.
    pub fn from_entries(nodes: usize, entries: Vec<EdgeParams>) -> Option<Self> {
        (entries.len() == Self::pair_count(nodes)).then_some(Self { nodes, entries })
    }

    pub fn uniform(nodes: usize, edge: EdgeParams) -> Self {
        Self {
            nodes,
            entries: vec![edge; Self::pair_count(nodes)],
        }
    }

    pub fn nodes(&self) -> usize {
        self.nodes
    }

    #[inline]
    fn slot(&self, lo: usize, hi: usize) -> usize {
        lo * self.nodes - lo * (lo + 1) / 2 + (hi - lo - 1)
    }

    /// Canonical entry for the pair; identical for `(i, j)` and `(j, i)`.
    pub fn get(&self, i: usize, j: usize) -> Option<EdgeParams> {
        if i == j || i >= self.nodes || j >= self.nodes {
            return None;
        }
        let (lo, hi) = if i < j { (i, j) } else { (j, i) };
        self.entries.get(self.slot(lo, hi)).copied()
    }

    pub fn set(&mut self, i: usize, j: usize, edge: EdgeParams) -> bool {
        if i == j || i >= self.nodes || j >= self.nodes {
            return false;
        }
        let (lo, hi) = if i < j { (i, j) } else { (j, i) };
        let slot = self.slot(lo, hi);
        self.entries[slot] = edge;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn numbered(nodes: usize) -> EdgeTable {
        let entries = (0..EdgeTable::pair_count(nodes))
            .map(|k| EdgeParams {
                weight: k as f64,
                phase: -(k as f64),
            })
            .collect();
        EdgeTable::from_entries(nodes, entries).unwrap()
    }

    #[test]
    fn row_major_upper_triangle_layout() {
        let table = numbered(4);
        let order = [(0, 1), (0, 2), (0, 3), (1, 2), (1, 3), (2, 3)];
        for (k, (i, j)) in order.into_iter().enumerate() {
            assert_eq!(table.get(i, j).unwrap().weight, k as f64, "pair ({i},{j})");
        }
    }

    #[test]
    fn lookup_is_symmetric() {
        let table = numbered(6);
        for i in 0..6 {
            for j in 0..6 {
                assert_eq!(table.get(i, j), table.get(j, i));
            }
        }
    }

    #[test]
    fn diagonal_and_out_of_range_are_absent() {
        let table = numbered(3);
        assert!(table.get(1, 1).is_none());
        assert!(table.get(0, 3).is_none());
    }

    #[test]
    fn wrong_entry_count_is_rejected() {
        assert!(EdgeTable::from_entries(4, vec![EdgeParams::default(); 5]).is_none());
        assert!(EdgeTable::from_entries(1, Vec::new()).is_some());
    }

    #[test]
    fn set_writes_the_shared_entry() {
        let mut table = EdgeTable::uniform(3, EdgeParams::default());
        let edge = EdgeParams {
            weight: 0.4,
            phase: 1.0,
        };
        assert!(table.set(2, 0, edge));
        assert_eq!(table.get(0, 2), Some(edge));
        assert!(!table.set(1, 1, edge));
    }
}
