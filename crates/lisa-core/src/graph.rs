use serde::{Deserialize, Serialize};

use crate::error::{LisaError, Result};

/// Read-only adjacency lists: `neighbors[i]` holds the units adjacent to `i`
/// in the order the graph builder produced them. An empty list marks an
/// isolate.
///
/// Invariants (checked by [`NeighborGraph::new`]): no self loops, no
/// duplicates, every index in `[0, n)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Vec<usize>>", into = "Vec<Vec<usize>>")]
pub struct NeighborGraph {
    neighbors: Vec<Vec<usize>>,
}

impl NeighborGraph {
    /// Validate and wrap adjacency lists produced by an external builder.
    pub fn new(neighbors: Vec<Vec<usize>>) -> Result<Self> {
        let n = neighbors.len();
        for (i, row) in neighbors.iter().enumerate() {
            let mut seen = vec![false; n];
            for &j in row {
                if j >= n {
                    return Err(LisaError::InvalidNeighborGraph {
                        unit: i,
                        reason: format!("neighbor index {j} out of range for {n} units"),
                    });
                }
                if j == i {
                    return Err(LisaError::InvalidNeighborGraph {
                        unit: i,
                        reason: "unit lists itself as a neighbor".into(),
                    });
                }
                if seen[j] {
                    return Err(LisaError::InvalidNeighborGraph {
                        unit: i,
                        reason: format!("neighbor {j} listed more than once"),
                    });
                }
                seen[j] = true;
            }
        }
        Ok(Self { neighbors })
    }

    /// Number of units.
    #[inline]
    pub fn len(&self) -> usize {
        self.neighbors.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.neighbors.is_empty()
    }

    /// Neighbors of unit `i`.
    #[inline]
    pub fn neighbors(&self, i: usize) -> &[usize] {
        &self.neighbors[i]
    }

    /// Number of neighbors of unit `i`.
    #[inline]
    pub fn cardinality(&self, i: usize) -> usize {
        self.neighbors[i].len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &[usize]> + '_ {
        self.neighbors.iter().map(Vec::as_slice)
    }

    /// Indices of units with no neighbors, ascending.
    pub fn isolates(&self) -> Vec<usize> {
        self.iter()
            .enumerate()
            .filter(|(_, row)| row.is_empty())
            .map(|(i, _)| i)
            .collect()
    }
}

impl TryFrom<Vec<Vec<usize>>> for NeighborGraph {
    type Error = LisaError;

    fn try_from(neighbors: Vec<Vec<usize>>) -> Result<Self> {
        Self::new(neighbors)
    }
}

impl From<NeighborGraph> for Vec<Vec<usize>> {
    fn from(graph: NeighborGraph) -> Self {
        graph.neighbors
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Path graph 0 – 1 – … – (n−1); endpoints have one neighbor.
    pub(crate) fn line_graph(n: usize) -> NeighborGraph {
        let rows = (0..n)
            .map(|i| {
                let mut row = Vec::with_capacity(2);
                if i > 0 {
                    row.push(i - 1);
                }
                if i + 1 < n {
                    row.push(i + 1);
                }
                row
            })
            .collect();
        NeighborGraph::new(rows).unwrap()
    }

    /// Rook contiguity on a `side × side` lattice, row-major.
    pub(crate) fn rook_lattice(side: usize) -> NeighborGraph {
        let mut rows = Vec::with_capacity(side * side);
        for r in 0..side {
            for c in 0..side {
                let mut row = Vec::with_capacity(4);
                if r > 0 { row.push((r - 1) * side + c); }
                if c > 0 { row.push(r * side + c - 1); }
                if c + 1 < side { row.push(r * side + c + 1); }
                if r + 1 < side { row.push((r + 1) * side + c); }
                rows.push(row);
            }
        }
        NeighborGraph::new(rows).unwrap()
    }

    #[test]
    fn line_graph_endpoints_have_one_neighbor() {
        let nb = line_graph(5);
        assert_eq!(nb.neighbors(0), &[1]);
        assert_eq!(nb.neighbors(2), &[1, 3]);
        assert_eq!(nb.neighbors(4), &[3]);
        assert!(nb.isolates().is_empty());
    }

    #[test]
    fn rejects_self_loop() {
        let err = NeighborGraph::new(vec![vec![1], vec![1]]).unwrap_err();
        assert!(matches!(err, LisaError::InvalidNeighborGraph { unit: 1, .. }));
    }

    #[test]
    fn rejects_duplicate_and_out_of_range() {
        let err = NeighborGraph::new(vec![vec![1, 1], vec![0]]).unwrap_err();
        assert!(matches!(err, LisaError::InvalidNeighborGraph { unit: 0, .. }));

        let err = NeighborGraph::new(vec![vec![1], vec![5]]).unwrap_err();
        assert!(matches!(err, LisaError::InvalidNeighborGraph { unit: 1, .. }));
    }

    #[test]
    fn isolates_are_listed_in_order() {
        let nb = NeighborGraph::new(vec![vec![], vec![2], vec![1], vec![]]).unwrap();
        assert_eq!(nb.isolates(), vec![0, 3]);
    }

    #[test]
    fn deserializes_through_validation() {
        let nb: NeighborGraph = serde_json::from_str("[[1],[0,2],[1]]").unwrap();
        assert_eq!(nb.len(), 3);
        assert!(serde_json::from_str::<NeighborGraph>("[[0]]").is_err());
    }
}
