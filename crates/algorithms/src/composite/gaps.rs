//! Gap connectivity analysis
//!
//! Labels connected components of a gap mask and gates spatial filling on
//! component size: only small gaps are eligible, large persistent gaps are
//! left alone.

use ndarray::Array2;
use std::collections::VecDeque;

const OFFSETS_4: [(isize, isize); 4] = [(-1, 0), (0, -1), (0, 1), (1, 0)];
const OFFSETS_8: [(isize, isize); 8] = [
    (-1, -1),
    (-1, 0),
    (-1, 1),
    (0, -1),
    (0, 1),
    (1, -1),
    (1, 0),
    (1, 1),
];

/// Pixel adjacency for component labeling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Connectivity {
    Four,
    #[default]
    Eight,
}

impl Connectivity {
    fn offsets(self) -> &'static [(isize, isize)] {
        match self {
            Connectivity::Four => &OFFSETS_4,
            Connectivity::Eight => &OFFSETS_8,
        }
    }
}

/// Result of component labeling: per-pixel labels and per-component sizes
#[derive(Debug, Clone)]
pub struct ComponentLabels {
    /// 0 = background; component k covers pixels labeled k
    pub labels: Array2<u32>,
    /// sizes[k - 1] = pixel count of component k
    pub sizes: Vec<usize>,
}

impl ComponentLabels {
    /// Size of the component containing (row, col), if any
    pub fn component_size(&self, row: usize, col: usize) -> Option<usize> {
        match self.labels[(row, col)] {
            0 => None,
            k => Some(self.sizes[(k - 1) as usize]),
        }
    }
}

/// Label the connected components of `true` pixels in a boolean mask.
///
/// Breadth-first flood fill; labels are assigned in row-major discovery
/// order starting at 1.
pub fn connected_components(mask: &Array2<bool>, connectivity: Connectivity) -> ComponentLabels {
    let (rows, cols) = mask.dim();
    let mut labels = Array2::<u32>::zeros((rows, cols));
    let mut sizes = Vec::new();
    let mut queue: VecDeque<(usize, usize)> = VecDeque::new();
    let offsets = connectivity.offsets();

    for row in 0..rows {
        for col in 0..cols {
            if !mask[(row, col)] || labels[(row, col)] != 0 {
                continue;
            }

            let label = sizes.len() as u32 + 1;
            let mut size = 0usize;
            labels[(row, col)] = label;
            queue.push_back((row, col));

            while let Some((r, c)) = queue.pop_front() {
                size += 1;
                for &(dr, dc) in offsets {
                    let nr = r as isize + dr;
                    let nc = c as isize + dc;
                    if nr < 0 || nc < 0 || nr >= rows as isize || nc >= cols as isize {
                        continue;
                    }
                    let (nr, nc) = (nr as usize, nc as usize);
                    if mask[(nr, nc)] && labels[(nr, nc)] == 0 {
                        labels[(nr, nc)] = label;
                        queue.push_back((nr, nc));
                    }
                }
            }

            sizes.push(size);
        }
    }

    ComponentLabels { labels, sizes }
}

/// Restrict a gap mask to components of at most `max_size` pixels
pub fn small_gap_mask(
    mask: &Array2<bool>,
    connectivity: Connectivity,
    max_size: usize,
) -> Array2<bool> {
    let components = connected_components(mask, connectivity);
    let (rows, cols) = mask.dim();
    let mut small = Array2::from_elem((rows, cols), false);

    for row in 0..rows {
        for col in 0..cols {
            if let Some(size) = components.component_size(row, col) {
                if size <= max_size {
                    small[(row, col)] = true;
                }
            }
        }
    }

    small
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mask_from(rows: usize, cols: usize, marked: &[(usize, usize)]) -> Array2<bool> {
        let mut mask = Array2::from_elem((rows, cols), false);
        for &(r, c) in marked {
            mask[(r, c)] = true;
        }
        mask
    }

    #[test]
    fn test_single_component() {
        let mask = mask_from(5, 5, &[(1, 1), (1, 2), (2, 1)]);
        let result = connected_components(&mask, Connectivity::Eight);
        assert_eq!(result.sizes, vec![3]);
        assert_eq!(result.component_size(1, 2), Some(3));
        assert_eq!(result.component_size(0, 0), None);
    }

    #[test]
    fn test_diagonal_connectivity() {
        let mask = mask_from(4, 4, &[(0, 0), (1, 1), (2, 2)]);

        // Diagonal chain: one 8-connected component, three 4-connected ones
        let eight = connected_components(&mask, Connectivity::Eight);
        assert_eq!(eight.sizes, vec![3]);

        let four = connected_components(&mask, Connectivity::Four);
        assert_eq!(four.sizes, vec![1, 1, 1]);
    }

    #[test]
    fn test_two_components() {
        let mask = mask_from(5, 5, &[(0, 0), (0, 1), (4, 4)]);
        let result = connected_components(&mask, Connectivity::Eight);
        assert_eq!(result.sizes.len(), 2);
        assert_ne!(result.labels[(0, 0)], result.labels[(4, 4)]);
    }

    #[test]
    fn test_small_gap_gating() {
        // One 2-pixel gap and one 5-pixel gap; gate at 4
        let mut marked = vec![(0, 0), (0, 1)];
        for c in 0..5 {
            marked.push((4, c));
        }
        let mask = mask_from(6, 6, &marked);

        let small = small_gap_mask(&mask, Connectivity::Eight, 4);
        assert!(small[(0, 0)]);
        assert!(small[(0, 1)]);
        for c in 0..5 {
            assert!(!small[(4, c)], "large component leaked at col {}", c);
        }
    }

    #[test]
    fn test_gate_boundary_inclusive() {
        // Component of exactly max_size is eligible; one pixel more is not
        let marked: Vec<(usize, usize)> = (0..4).map(|c| (0, c)).collect();
        let mask = mask_from(3, 8, &marked);
        let small = small_gap_mask(&mask, Connectivity::Eight, 4);
        assert!(small[(0, 0)]);

        let marked: Vec<(usize, usize)> = (0..5).map(|c| (0, c)).collect();
        let mask = mask_from(3, 8, &marked);
        let small = small_gap_mask(&mask, Connectivity::Eight, 4);
        assert!(!small[(0, 0)]);
    }
}
