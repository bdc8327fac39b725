/*
 * Copyright (c) 2022 Frank Fischer <frank-fischer@shadow-soft.de>
 *
 * This program is free software: you can redistribute it and/or
 * modify it under the terms of the GNU General Public License as
 * published by the Free Software Foundation, either version 3 of the
 * License, or (at your option) any later version.
 *
 * This program is distributed in the hope that it will be useful, but
 * WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the GNU
 * General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with this program.  If not, see  <http://www.gnu.org/licenses/>
 */

//! The Hungarian method as a sequence of maximum matching problems.
//!
//! The zero cells of the reduced matrix are the edges of a bipartite graph
//! between rows and columns. A maximum matching in this graph is grown by
//! augmenting paths found by breadth-first search. If the search gets stuck
//! the labeled rows and columns define a vertex cover, and the matrix is
//! modified to create a new zero edge.
//!
//! # Example
//!
//! ```
//! use rs_transport::assignment::{hungarian_graph_steps, GraphStep};
//!
//! let costs = vec![vec![4.0, 1.0, 3.0], vec![2.0, 0.0, 5.0], vec![3.0, 2.0, 2.0]];
//! let steps = hungarian_graph_steps(&costs);
//!
//! match steps.last() {
//!     Some(GraphStep::Done(sol)) => {
//!         assert_eq!(sol.assignment, vec![1, 0, 2]);
//!         assert_eq!(sol.total, 5.0);
//!     }
//!     _ => panic!("Hungarian method did not finish"),
//! }
//! ```

use super::{assignment_cost, minimum, reduce_columns, reduce_rows, zero_cells, AssignmentStep, Reduction, Solution};
use crate::transport::Cell;

use either::Either::{self, Left, Right};
use num_traits::NumAssign;
use std::collections::VecDeque;
use std::fmt::Debug;

#[cfg(feature = "serialize")]
use serde_derive::{Deserialize, Serialize};

/// The label of a row or column vertex in the augmenting path search.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub struct Label {
    /// The vertex the label has been assigned from (`None` for the root).
    ///
    /// A column is labeled from a row, a row from a column.
    pub via: Option<usize>,
    /// The position in the labeling sequence, the root has order 0.
    pub order: usize,
}

/// A step of the matching based Hungarian method.
#[derive(Clone, PartialEq, Debug)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub enum GraphStep<F> {
    /// The matrix after reducing all columns or rows.
    Reduction {
        kind: Reduction,
        minima: Vec<F>,
        matrix: Vec<Vec<F>>,
    },
    /// The edges of the zero graph (row-major).
    ZeroGraph { edges: Vec<Cell> },
    /// The initial greedy matching.
    Matching { matching: Vec<Cell> },
    /// An augmenting path search from an unmatched row.
    Search {
        root: usize,
        row_labels: Vec<Option<Label>>,
        column_labels: Vec<Option<Label>>,
        /// The unmatched column reached by the search.
        path_end: Option<usize>,
    },
    /// An augmentation along a path.
    Augment {
        /// The edges of the path starting at the root row.
        path: Vec<Cell>,
        matching: Vec<Cell>,
    },
    /// A modification of the matrix.
    ///
    /// `h` has been subtracted from all cells in labeled rows and unlabeled
    /// columns and added to all cells in unlabeled rows and labeled columns.
    Modify {
        h: F,
        labeled_rows: Vec<usize>,
        labeled_columns: Vec<usize>,
        matrix: Vec<Vec<F>>,
    },
    /// A perfect matching has been found.
    Done(Solution<F>),
}

impl<F> AssignmentStep<F> for GraphStep<F> {
    fn solution(&self) -> Option<&Solution<F>> {
        match self {
            GraphStep::Done(sol) => Some(sol),
            _ => None,
        }
    }
}

/// Matching based Hungarian method.
pub struct HungarianGraph<'a, F> {
    costs: &'a [Vec<F>],
    /// The maximal number of augmentations and modifications.
    pub max_iterations: usize,
}

/// The current state of the method.
struct State<F> {
    matrix: Vec<Vec<F>>,
    row_match: Vec<Option<usize>>,
    col_match: Vec<Option<usize>>,
}

/// The phases of the method.
enum Phase {
    /// Stop if the matching is perfect.
    Check,
    /// Search an augmenting path from the first unmatched row.
    Search,
    /// Augment along the path ending in the given column.
    Augment(Search, usize),
    /// Modify the matrix w.r.t. the labels of a failed search.
    Modify(Search),
}

/// The result of an augmenting path search.
struct Search {
    root: usize,
    row_labels: Vec<Option<Label>>,
    column_labels: Vec<Option<Label>>,
    path_end: Option<usize>,
}

impl<F> State<F>
where
    F: NumAssign + PartialOrd + Copy,
{
    fn n(&self) -> usize {
        self.matrix.len()
    }

    fn matching(&self) -> Vec<Cell> {
        self.row_match
            .iter()
            .enumerate()
            .filter_map(|(i, &j)| j.map(|j| (i, j)))
            .collect()
    }

    fn is_perfect(&self) -> bool {
        self.row_match.iter().all(Option::is_some)
    }

    /// Greedy matching: the first unmatched row of each column.
    fn init_matching(&mut self) {
        let n = self.n();
        for j in 0..n {
            if let Some(i) = (0..n).find(|&i| self.row_match[i].is_none() && self.matrix[i][j].is_zero()) {
                self.row_match[i] = Some(j);
                self.col_match[j] = Some(i);
            }
        }
    }

    /// Breadth-first search for an augmenting path from the first unmatched
    /// row.
    ///
    /// Rows are left via unmatched zero edges, columns via their matching
    /// edge. The search stops at the first unmatched column.
    fn search(&self) -> Option<Search> {
        let n = self.n();
        let root = self.row_match.iter().position(Option::is_none)?;
        let mut row_labels: Vec<Option<Label>> = vec![None; n];
        let mut column_labels: Vec<Option<Label>> = vec![None; n];
        let mut order = 0;
        let mut path_end = None;

        row_labels[root] = Some(Label { via: None, order });
        let mut queue: VecDeque<Either<usize, usize>> = VecDeque::new();
        queue.push_back(Left(root));

        'search: while let Some(node) = queue.pop_front() {
            match node {
                Left(i) => {
                    for j in 0..n {
                        if column_labels[j].is_none() && self.row_match[i] != Some(j) && self.matrix[i][j].is_zero() {
                            order += 1;
                            column_labels[j] = Some(Label { via: Some(i), order });
                            if self.col_match[j].is_none() {
                                path_end = Some(j);
                                break 'search;
                            }
                            queue.push_back(Right(j));
                        }
                    }
                }
                Right(j) => {
                    if let Some(i) = self.col_match[j] {
                        if row_labels[i].is_none() {
                            order += 1;
                            row_labels[i] = Some(Label { via: Some(j), order });
                            queue.push_back(Left(i));
                        }
                    }
                }
            }
        }

        Some(Search {
            root,
            row_labels,
            column_labels,
            path_end,
        })
    }

    /// Augment the matching along the labels ending in column `end`.
    ///
    /// Returns the path from the root row.
    fn augment(&mut self, search: &Search, end: usize) -> Vec<Cell> {
        let mut path = Vec::new();
        let mut j = end;
        while let Some(i) = search.column_labels[j].and_then(|l| l.via) {
            let prev = self.row_match[i];
            self.row_match[i] = Some(j);
            self.col_match[j] = Some(i);
            path.push((i, j));
            match prev {
                Some(pj) if i != search.root => {
                    path.push((i, pj));
                    j = pj;
                }
                _ => break,
            }
        }
        path.reverse();
        path
    }

    /// Modify the matrix w.r.t. the cover given by the labels.
    fn modify(&mut self, search: &Search) -> Option<F> {
        let n = self.n();
        let rows: Vec<bool> = search.row_labels.iter().map(Option::is_some).collect();
        let cols: Vec<bool> = search.column_labels.iter().map(Option::is_some).collect();

        let mut candidates = Vec::new();
        for i in (0..n).filter(|&i| rows[i]) {
            candidates.extend((0..n).filter(|&j| !cols[j]).map(|j| self.matrix[i][j]));
        }
        let h = minimum(candidates)?;

        for i in 0..n {
            for j in 0..n {
                if rows[i] && !cols[j] {
                    self.matrix[i][j] -= h;
                } else if !rows[i] && cols[j] {
                    self.matrix[i][j] += h;
                }
            }
        }
        Some(h)
    }
}

impl<'a, F> HungarianGraph<'a, F>
where
    F: NumAssign + PartialOrd + Copy + Debug,
{
    /// Create a new instance for a square cost matrix.
    pub fn new(costs: &'a [Vec<F>]) -> Self {
        HungarianGraph {
            costs,
            max_iterations: super::MAX_ITERATIONS,
        }
    }

    /// Run the method and return all steps.
    ///
    /// The last step is [`GraphStep::Done`] unless the iteration limit has
    /// been reached.
    pub fn steps(&self) -> Vec<GraphStep<F>> {
        let n = self.costs.len();
        let mut steps = Vec::new();

        let (matrix, minima) = reduce_columns(self.costs);
        steps.push(GraphStep::Reduction {
            kind: Reduction::Columns,
            minima,
            matrix: matrix.clone(),
        });
        let (matrix, minima) = reduce_rows(&matrix);
        steps.push(GraphStep::Reduction {
            kind: Reduction::Rows,
            minima,
            matrix: matrix.clone(),
        });
        steps.push(GraphStep::ZeroGraph {
            edges: zero_cells(&matrix),
        });

        let mut state = State {
            matrix,
            row_match: vec![None; n],
            col_match: vec![None; n],
        };
        state.init_matching();
        steps.push(GraphStep::Matching {
            matching: state.matching(),
        });

        let mut niter = 0;
        let mut phase = Phase::Check;
        loop {
            phase = match phase {
                Phase::Check => {
                    if state.is_perfect() {
                        let assignment: Vec<usize> = state.row_match.iter().filter_map(|&j| j).collect();
                        let total = assignment_cost(self.costs, &assignment);
                        log::debug!("Optimal assignment {:?} with cost {:?}", assignment, total);
                        steps.push(GraphStep::Done(Solution { assignment, total }));
                        break;
                    }
                    if niter >= self.max_iterations {
                        log::warn!("Hungarian method stopped after {} iterations", niter);
                        break;
                    }
                    niter += 1;
                    Phase::Search
                }
                Phase::Search => {
                    let search = match state.search() {
                        Some(search) => search,
                        None => break,
                    };
                    steps.push(GraphStep::Search {
                        root: search.root,
                        row_labels: search.row_labels.clone(),
                        column_labels: search.column_labels.clone(),
                        path_end: search.path_end,
                    });
                    match search.path_end {
                        Some(end) => Phase::Augment(search, end),
                        None => Phase::Modify(search),
                    }
                }
                Phase::Augment(search, end) => {
                    let path = state.augment(&search, end);
                    log::debug!("Augmenting path {:?}", path);
                    steps.push(GraphStep::Augment {
                        path,
                        matching: state.matching(),
                    });
                    Phase::Check
                }
                Phase::Modify(search) => {
                    let h = match state.modify(&search) {
                        Some(h) => h,
                        None => break,
                    };
                    log::debug!("No augmenting path from row {}, modify by h = {:?}", search.root, h);
                    steps.push(GraphStep::Modify {
                        h,
                        labeled_rows: (0..n).filter(|&i| search.row_labels[i].is_some()).collect(),
                        labeled_columns: (0..n).filter(|&j| search.column_labels[j].is_some()).collect(),
                        matrix: state.matrix.clone(),
                    });
                    steps.push(GraphStep::ZeroGraph {
                        edges: zero_cells(&state.matrix),
                    });
                    Phase::Check
                }
            };
        }

        steps
    }
}

/// Solve an assignment problem with the matching based Hungarian method.
pub fn hungarian_graph_steps<F>(costs: &[Vec<F>]) -> Vec<GraphStep<F>>
where
    F: NumAssign + PartialOrd + Copy + Debug,
{
    HungarianGraph::new(costs).steps()
}

#[cfg(test)]
mod tests {
    use super::{hungarian_graph_steps, GraphStep, HungarianGraph, Label};
    use crate::assignment::{brute_force, solution, Reduction};

    fn costs() -> Vec<Vec<i32>> {
        vec![
            vec![5, 7, 6, 9, 5],
            vec![8, 7, 6, 2, 7],
            vec![8, 9, 13, 10, 10],
            vec![5, 7, 6, 7, 9],
            vec![6, 7, 8, 5, 9],
        ]
    }

    #[test]
    fn test_trace() {
        let steps = hungarian_graph_steps(&costs());
        assert_eq!(steps.len(), 12);

        match &steps[0] {
            GraphStep::Reduction { kind, minima, .. } => {
                assert_eq!(*kind, Reduction::Columns);
                assert_eq!(minima, &vec![5, 7, 6, 2, 5]);
            }
            s => panic!("unexpected step {:?}", s),
        }
        match &steps[3] {
            GraphStep::Matching { matching } => assert_eq!(matching, &vec![(0, 0), (1, 1), (3, 2)]),
            s => panic!("unexpected step {:?}", s),
        }
        match &steps[4] {
            GraphStep::Search {
                root,
                row_labels,
                path_end,
                ..
            } => {
                assert_eq!(*root, 2);
                assert_eq!(*path_end, Some(3));
                assert_eq!(row_labels[1], Some(Label { via: Some(1), order: 2 }));
            }
            s => panic!("unexpected step {:?}", s),
        }
        match &steps[5] {
            GraphStep::Augment { path, matching } => {
                assert_eq!(path, &vec![(2, 1), (1, 1), (1, 3)]);
                assert_eq!(matching, &vec![(0, 0), (1, 3), (2, 1), (3, 2)]);
            }
            s => panic!("unexpected step {:?}", s),
        }
        match &steps[7] {
            GraphStep::Modify {
                h,
                labeled_rows,
                labeled_columns,
                matrix,
            } => {
                assert_eq!(*h, 1);
                assert_eq!(labeled_rows, &vec![2, 4]);
                assert_eq!(labeled_columns, &vec![1]);
                assert_eq!(matrix[2], vec![0, 0, 4, 5, 2]);
                assert_eq!(matrix[0], vec![0, 1, 0, 7, 0]);
            }
            s => panic!("unexpected step {:?}", s),
        }
        match &steps[10] {
            GraphStep::Augment { path, .. } => assert_eq!(path, &vec![(4, 0), (0, 0), (0, 4)]),
            s => panic!("unexpected step {:?}", s),
        }

        let sol = solution(&steps).unwrap();
        assert_eq!(sol.assignment, vec![4, 3, 1, 2, 0]);
        assert_eq!(sol.total, 28);
    }

    #[test]
    fn test_against_brute_force() {
        let matrices = vec![
            vec![vec![1, 1], vec![1, 1]],
            vec![vec![0, 0, 0], vec![0, 0, 0], vec![0, 0, 0]],
            vec![vec![9, 2, 7, 8], vec![6, 4, 3, 7], vec![5, 8, 1, 8], vec![7, 6, 9, 4]],
            vec![vec![3, 3, 3, 1], vec![3, 3, 1, 3], vec![3, 1, 3, 3], vec![1, 3, 3, 3]],
        ];
        for costs in matrices {
            let steps = hungarian_graph_steps(&costs);
            assert_eq!(solution(&steps).map(|s| s.total), Some(brute_force(&costs).0));
        }
    }

    #[test]
    fn test_trivial() {
        let steps = hungarian_graph_steps::<f64>(&[]);
        assert_eq!(solution(&steps).map(|s| s.assignment.len()), Some(0));

        let steps = hungarian_graph_steps(&[vec![7.5]]);
        assert_eq!(solution(&steps).map(|s| s.total), Some(7.5));
    }

    #[test]
    fn test_iteration_limit() {
        let costs = costs();
        let mut hungarian = HungarianGraph::new(&costs);
        hungarian.max_iterations = 2;
        let steps = hungarian.steps();
        assert!(solution(&steps).is_none());
        match steps.last() {
            Some(GraphStep::ZeroGraph { .. }) => (),
            s => panic!("unexpected step {:?}", s),
        }
    }
}
