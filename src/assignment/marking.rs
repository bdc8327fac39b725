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

//! The Hungarian method with marked zeros.
//!
//! After reducing the matrix a set of *independent* zeros (no two in the
//! same row or column) is chosen greedily. Then the following phases are
//! repeated until there are `n` independent zeros:
//!
//! - **A0**: mark all columns containing an independent zero.
//! - **A1**: find an unmarked zero in an unmarked row and column and mark it
//!   *dependent*. If its row contains an independent zero, mark the row and
//!   unmark the column of that independent zero. Otherwise continue with A2.
//!   If there is no such zero, continue with A3.
//! - **A2**: starting at the last dependent zero, alternately take the
//!   independent zero in the same column and the dependent zero in the same
//!   row. Exchange independent and dependent zeros along this chain, clear
//!   all other dependent marks and continue with A0.
//! - **A3**: let `h` be the minimal entry in unmarked rows and columns.
//!   Subtract `h` from all unmarked cells, add it to all doubly marked cells
//!   and continue with A1.
//!
//! # Example
//!
//! ```
//! use rs_transport::assignment::{hungarian_marking_steps, assignment, total};
//!
//! let costs = vec![vec![4.0, 1.0, 3.0], vec![2.0, 0.0, 5.0], vec![3.0, 2.0, 2.0]];
//! let steps = hungarian_marking_steps(&costs);
//!
//! assert_eq!(assignment(&steps), Some(&[1, 0, 2][..]));
//! assert_eq!(total(&steps), Some(5.0));
//! ```

use super::{assignment_cost, reduce_columns, reduce_rows, AssignmentStep, Reduction, Solution};
use crate::transport::Cell;

use num_traits::NumAssign;
use std::fmt::Debug;

#[cfg(feature = "serialize")]
use serde_derive::{Deserialize, Serialize};

/// The mark of a cell.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub enum Mark {
    Unmarked,
    Independent,
    Dependent,
}

impl Default for Mark {
    fn default() -> Self {
        Mark::Unmarked
    }
}

/// A step of the marking Hungarian method.
#[derive(Clone, PartialEq, Debug)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub enum MarkingStep<F> {
    /// The matrix after reducing all columns or rows.
    Reduction {
        kind: Reduction,
        minima: Vec<F>,
        matrix: Vec<Vec<F>>,
    },
    /// The initial independent zeros.
    InitialZeros { marks: Vec<Vec<Mark>> },
    /// Phase A0: columns with independent zeros have been marked.
    MarkColumns {
        marked_columns: Vec<bool>,
        independent: usize,
    },
    /// Phase A1: the zero `cell` became dependent, the mark of column
    /// `column` has been moved to the row of `cell`.
    Transfer {
        cell: Cell,
        column: usize,
        marks: Vec<Vec<Mark>>,
        marked_rows: Vec<bool>,
        marked_columns: Vec<bool>,
    },
    /// Phase A1: the dependent zero `cell` has no independent zero in its
    /// row, it starts a chain.
    ChainStart { cell: Cell, marks: Vec<Vec<Mark>> },
    /// Phase A2: marks have been exchanged along the chain.
    Exchange { chain: Vec<Cell>, marks: Vec<Vec<Mark>> },
    /// Phase A3: the matrix has been modified by `h`.
    Modify {
        h: F,
        marked_rows: Vec<bool>,
        marked_columns: Vec<bool>,
        matrix: Vec<Vec<F>>,
    },
    /// `n` independent zeros have been found.
    Done(Solution<F>),
}

impl<F> AssignmentStep<F> for MarkingStep<F> {
    fn solution(&self) -> Option<&Solution<F>> {
        match self {
            MarkingStep::Done(sol) => Some(sol),
            _ => None,
        }
    }
}

/// The phases of the method.
#[derive(Clone, Copy, Debug)]
enum Phase {
    MarkColumns,
    Transfer,
    Exchange(Cell),
    Modify,
}

/// Marking Hungarian method.
pub struct HungarianMarking<'a, F> {
    costs: &'a [Vec<F>],
    /// The maximal number of exchanges and modifications.
    pub max_iterations: usize,
}

struct State<F> {
    matrix: Vec<Vec<F>>,
    marks: Vec<Vec<Mark>>,
    rows: Vec<bool>,
    cols: Vec<bool>,
}

impl<F> State<F>
where
    F: NumAssign + PartialOrd + Copy,
{
    fn n(&self) -> usize {
        self.matrix.len()
    }

    /// Greedy row-major choice of independent zeros.
    fn init_marks(&mut self) {
        let n = self.n();
        let mut used = vec![false; n];
        for i in 0..n {
            if let Some(j) = (0..n).find(|&j| !used[j] && self.matrix[i][j].is_zero()) {
                self.marks[i][j] = Mark::Independent;
                used[j] = true;
            }
        }
    }

    fn num_independent(&self) -> usize {
        self.marks.iter().flatten().filter(|&&m| m == Mark::Independent).count()
    }

    fn find_in_row(&self, i: usize, mark: Mark) -> Option<usize> {
        self.marks[i].iter().position(|&m| m == mark)
    }

    fn find_in_column(&self, j: usize, mark: Mark) -> Option<usize> {
        self.marks.iter().position(|row| row[j] == mark)
    }

    /// A0: mark all columns with an independent zero, unmark all rows.
    fn mark_columns(&mut self) {
        let n = self.n();
        for i in 0..n {
            self.rows[i] = false;
        }
        for j in 0..n {
            self.cols[j] = self.find_in_column(j, Mark::Independent).is_some();
        }
    }

    /// Return the first unmarked zero in an unmarked row and column.
    fn find_free_zero(&self) -> Option<Cell> {
        let n = self.n();
        (0..n)
            .filter(|&i| !self.rows[i])
            .flat_map(|i| (0..n).map(move |j| (i, j)))
            .find(|&(i, j)| !self.cols[j] && self.marks[i][j] == Mark::Unmarked && self.matrix[i][j].is_zero())
    }

    /// A2: build the chain starting at the dependent zero `start` and
    /// exchange marks along it.
    fn exchange(&mut self, start: Cell) -> Vec<Cell> {
        let mut chain = vec![start];
        let (_, mut j) = start;
        while let Some(i) = self.find_in_column(j, Mark::Independent) {
            chain.push((i, j));
            match self.find_in_row(i, Mark::Dependent) {
                Some(k) => {
                    chain.push((i, k));
                    j = k;
                }
                None => break,
            }
        }

        for &(i, j) in &chain {
            self.marks[i][j] = match self.marks[i][j] {
                Mark::Dependent => Mark::Independent,
                _ => Mark::Unmarked,
            };
        }
        for m in self.marks.iter_mut().flatten() {
            if *m == Mark::Dependent {
                *m = Mark::Unmarked;
            }
        }
        chain
    }

    /// A3: modify the matrix by the smallest uncovered entry.
    fn modify(&mut self) -> Option<F> {
        let n = self.n();
        let mut h: Option<F> = None;
        for i in (0..n).filter(|&i| !self.rows[i]) {
            for j in (0..n).filter(|&j| !self.cols[j]) {
                let x = self.matrix[i][j];
                if h.map(|h| x < h).unwrap_or(true) {
                    h = Some(x);
                }
            }
        }
        let h = h?;

        for i in 0..n {
            for j in 0..n {
                if !self.rows[i] && !self.cols[j] {
                    self.matrix[i][j] -= h;
                } else if self.rows[i] && self.cols[j] {
                    self.matrix[i][j] += h;
                }
            }
        }
        Some(h)
    }

    fn assignment(&self) -> Vec<usize> {
        (0..self.n())
            .filter_map(|i| self.find_in_row(i, Mark::Independent))
            .collect()
    }
}

impl<'a, F> HungarianMarking<'a, F>
where
    F: NumAssign + PartialOrd + Copy + Debug,
{
    /// Create a new instance for a square cost matrix.
    pub fn new(costs: &'a [Vec<F>]) -> Self {
        HungarianMarking {
            costs,
            max_iterations: super::MAX_ITERATIONS,
        }
    }

    /// Run the method and return all steps.
    ///
    /// The last step is [`MarkingStep::Done`] unless the iteration limit has
    /// been reached.
    pub fn steps(&self) -> Vec<MarkingStep<F>> {
        let n = self.costs.len();
        let mut steps = Vec::new();

        let (matrix, minima) = reduce_columns(self.costs);
        steps.push(MarkingStep::Reduction {
            kind: Reduction::Columns,
            minima,
            matrix: matrix.clone(),
        });
        let (matrix, minima) = reduce_rows(&matrix);
        steps.push(MarkingStep::Reduction {
            kind: Reduction::Rows,
            minima,
            matrix: matrix.clone(),
        });

        let mut state = State {
            matrix,
            marks: vec![vec![Mark::Unmarked; n]; n],
            rows: vec![false; n],
            cols: vec![false; n],
        };
        state.init_marks();
        steps.push(MarkingStep::InitialZeros {
            marks: state.marks.clone(),
        });

        let mut niter = 0;
        let mut phase = Phase::MarkColumns;
        loop {
            match phase {
                Phase::MarkColumns => {
                    state.mark_columns();
                    let independent = state.num_independent();
                    steps.push(MarkingStep::MarkColumns {
                        marked_columns: state.cols.clone(),
                        independent,
                    });
                    if independent == n {
                        let assignment = state.assignment();
                        let total = assignment_cost(self.costs, &assignment);
                        log::debug!("Optimal assignment {:?} with cost {:?}", assignment, total);
                        steps.push(MarkingStep::Done(Solution { assignment, total }));
                        break;
                    }
                    phase = Phase::Transfer;
                }
                Phase::Transfer => match state.find_free_zero() {
                    Some((i, j)) => {
                        state.marks[i][j] = Mark::Dependent;
                        match state.find_in_row(i, Mark::Independent) {
                            Some(k) => {
                                state.rows[i] = true;
                                state.cols[k] = false;
                                steps.push(MarkingStep::Transfer {
                                    cell: (i, j),
                                    column: k,
                                    marks: state.marks.clone(),
                                    marked_rows: state.rows.clone(),
                                    marked_columns: state.cols.clone(),
                                });
                            }
                            None => {
                                steps.push(MarkingStep::ChainStart {
                                    cell: (i, j),
                                    marks: state.marks.clone(),
                                });
                                phase = Phase::Exchange((i, j));
                            }
                        }
                    }
                    None => phase = Phase::Modify,
                },
                Phase::Exchange(start) => {
                    if niter >= self.max_iterations {
                        log::warn!("Hungarian method stopped after {} iterations", niter);
                        break;
                    }
                    niter += 1;
                    let chain = state.exchange(start);
                    log::debug!("Exchange marks along {:?}", chain);
                    steps.push(MarkingStep::Exchange {
                        chain,
                        marks: state.marks.clone(),
                    });
                    phase = Phase::MarkColumns;
                }
                Phase::Modify => {
                    if niter >= self.max_iterations {
                        log::warn!("Hungarian method stopped after {} iterations", niter);
                        break;
                    }
                    niter += 1;
                    let h = match state.modify() {
                        Some(h) => h,
                        None => break,
                    };
                    log::debug!("No free zero, modify by h = {:?}", h);
                    steps.push(MarkingStep::Modify {
                        h,
                        marked_rows: state.rows.clone(),
                        marked_columns: state.cols.clone(),
                        matrix: state.matrix.clone(),
                    });
                    phase = Phase::Transfer;
                }
            }
        }

        steps
    }
}

/// Solve an assignment problem with the marking Hungarian method.
pub fn hungarian_marking_steps<F>(costs: &[Vec<F>]) -> Vec<MarkingStep<F>>
where
    F: NumAssign + PartialOrd + Copy + Debug,
{
    HungarianMarking::new(costs).steps()
}

#[cfg(test)]
mod tests {
    use super::{hungarian_marking_steps, HungarianMarking, Mark, MarkingStep};
    use crate::assignment::{assignment, brute_force, solution, total};

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
        let steps = hungarian_marking_steps(&costs());

        match &steps[2] {
            MarkingStep::InitialZeros { marks } => {
                let zeros: Vec<_> = (0..5)
                    .flat_map(|i| (0..5).map(move |j| (i, j)))
                    .filter(|&(i, j)| marks[i][j] == Mark::Independent)
                    .collect();
                assert_eq!(zeros, vec![(0, 0), (1, 1), (3, 2)]);
            }
            s => panic!("unexpected step {:?}", s),
        }

        let transfers: Vec<_> = steps
            .iter()
            .filter_map(|s| match s {
                MarkingStep::Transfer { cell, column, .. } => Some((*cell, *column)),
                _ => None,
            })
            .collect();
        assert_eq!(
            transfers,
            vec![
                ((0, 4), 0),
                ((1, 3), 1),
                ((0, 4), 0),
                ((3, 0), 2),
                ((1, 2), 3),
                ((2, 0), 1)
            ]
        );

        let chains: Vec<_> = steps
            .iter()
            .filter_map(|s| match s {
                MarkingStep::Exchange { chain, .. } => Some(chain.clone()),
                _ => None,
            })
            .collect();
        assert_eq!(chains, vec![vec![(2, 1), (1, 1), (1, 3)], vec![(4, 0), (0, 0), (0, 4)]]);

        let modify = steps.iter().find_map(|s| match s {
            MarkingStep::Modify {
                h,
                marked_rows,
                marked_columns,
                matrix,
            } => Some((*h, marked_rows.clone(), marked_columns.clone(), matrix.clone())),
            _ => None,
        });
        let (h, rows, cols, matrix) = modify.unwrap();
        assert_eq!(h, 1);
        assert_eq!(rows, vec![true, true, false, true, false]);
        assert_eq!(cols, vec![false, true, false, false, false]);
        assert_eq!(matrix[4], vec![0, 0, 1, 2, 3]);

        assert_eq!(assignment(&steps), Some(&[4, 3, 1, 2, 0][..]));
        assert_eq!(total(&steps), Some(28));
    }

    #[test]
    fn test_exchange_clears_dependent_marks() {
        let steps = hungarian_marking_steps(&costs());
        for s in &steps {
            if let MarkingStep::Exchange { marks, .. } = s {
                assert!(marks.iter().flatten().all(|&m| m != Mark::Dependent));
            }
        }
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
            let steps = hungarian_marking_steps(&costs);
            assert_eq!(total(&steps), Some(brute_force(&costs).0));
        }
    }

    #[test]
    fn test_iteration_limit() {
        let costs = costs();
        let mut hungarian = HungarianMarking::new(&costs);
        hungarian.max_iterations = 1;
        let steps = hungarian.steps();
        assert!(solution(&steps).is_none());
        assert!(steps.iter().any(|s| matches!(s, MarkingStep::Exchange { .. })));
        assert!(!steps.iter().any(|s| matches!(s, MarkingStep::Modify { .. })));
    }
}
