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

//! The assignment problem.
//!
//! Given a square cost matrix `c`, find a permutation `p` minimizing
//! `Σ c[i][p[i]]`. This module contains two versions of the Hungarian
//! method, each producing a trace of steps:
//!
//! - [`graph`]: augmenting paths in the bipartite graph of zero cells,
//! - [`marking`]: independent and dependent zeros with line marks.
//!
//! Both start by reducing columns and then rows of the cost matrix. They
//! may take different intermediate steps but end with an optimal
//! assignment.
//!
//! # Example
//!
//! ```
//! use rs_transport::assignment::{hungarian_graph_steps, hungarian_marking_steps, solution};
//!
//! let costs = vec![
//!     vec![5, 7, 6, 9, 5],
//!     vec![8, 7, 6, 2, 7],
//!     vec![8, 9, 13, 10, 10],
//!     vec![5, 7, 6, 7, 9],
//!     vec![6, 7, 8, 5, 9],
//! ];
//!
//! let g = hungarian_graph_steps(&costs);
//! let m = hungarian_marking_steps(&costs);
//!
//! assert_eq!(solution(&g).map(|s| s.total), Some(28));
//! assert_eq!(solution(&m).map(|s| s.total), Some(28));
//! ```

pub mod graph;
pub mod marking;

pub use self::graph::{hungarian_graph_steps, GraphStep, HungarianGraph, Label};
pub use self::marking::{hungarian_marking_steps, HungarianMarking, Mark, MarkingStep};

use crate::transport::Cell;
use num_traits::{Num, NumAssign};

#[cfg(feature = "serialize")]
use serde_derive::{Deserialize, Serialize};

/// The default iteration limit of both Hungarian methods.
pub const MAX_ITERATIONS: usize = 100;

/// The kind of a reduction.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub enum Reduction {
    /// The minimum of each column has been subtracted.
    Columns,
    /// The minimum of each row has been subtracted.
    Rows,
}

/// An optimal assignment.
#[derive(Clone, PartialEq, Debug)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub struct Solution<F> {
    /// `assignment[i]` is the column assigned to row `i`.
    pub assignment: Vec<usize>,
    /// The total cost w.r.t. the original cost matrix.
    pub total: F,
}

/// A step of a Hungarian method.
pub trait AssignmentStep<F> {
    /// Return the solution if this is the final step.
    fn solution(&self) -> Option<&Solution<F>>;
}

/// Return the solution of a complete trace.
///
/// Returns `None` if the trace has been truncated.
pub fn solution<'a, F, S>(steps: &'a [S]) -> Option<&'a Solution<F>>
where
    F: 'a,
    S: AssignmentStep<F>,
{
    steps.last().and_then(|s| s.solution())
}

/// Return the assignment of a complete trace.
pub fn assignment<'a, F, S>(steps: &'a [S]) -> Option<&'a [usize]>
where
    F: 'a,
    S: AssignmentStep<F>,
{
    solution(steps).map(|s| &s.assignment[..])
}

/// Return the total cost of a complete trace.
pub fn total<'a, F, S>(steps: &'a [S]) -> Option<F>
where
    F: Copy + 'a,
    S: AssignmentStep<F>,
{
    solution(steps).map(|s| s.total)
}

fn minimum<F, I>(values: I) -> Option<F>
where
    F: PartialOrd + Copy,
    I: IntoIterator<Item = F>,
{
    values.into_iter().fold(None, |min, x| match min {
        Some(m) if m <= x => Some(m),
        _ => Some(x),
    })
}

/// Subtract the minimum of each column.
///
/// Returns the reduced matrix and the column minima.
pub fn reduce_columns<F>(matrix: &[Vec<F>]) -> (Vec<Vec<F>>, Vec<F>)
where
    F: NumAssign + PartialOrd + Copy,
{
    let n = matrix.first().map(|row| row.len()).unwrap_or(0);
    let minima: Vec<F> = (0..n)
        .map(|j| minimum(matrix.iter().map(|row| row[j])).unwrap_or_else(F::zero))
        .collect();
    let reduced = matrix
        .iter()
        .map(|row| row.iter().zip(&minima).map(|(&x, &m)| x - m).collect())
        .collect();
    (reduced, minima)
}

/// Subtract the minimum of each row.
///
/// Returns the reduced matrix and the row minima.
pub fn reduce_rows<F>(matrix: &[Vec<F>]) -> (Vec<Vec<F>>, Vec<F>)
where
    F: NumAssign + PartialOrd + Copy,
{
    let minima: Vec<F> = matrix
        .iter()
        .map(|row| minimum(row.iter().cloned()).unwrap_or_else(F::zero))
        .collect();
    let reduced = matrix
        .iter()
        .zip(&minima)
        .map(|(row, &m)| row.iter().map(|&x| x - m).collect())
        .collect();
    (reduced, minima)
}

/// Return all zero cells in row-major order.
pub fn zero_cells<F>(matrix: &[Vec<F>]) -> Vec<Cell>
where
    F: Num + Copy,
{
    matrix
        .iter()
        .enumerate()
        .flat_map(|(i, row)| {
            row.iter()
                .enumerate()
                .filter(|(_, x)| x.is_zero())
                .map(move |(j, _)| (i, j))
        })
        .collect()
}

/// Return the cost `Σ c[i][assignment[i]]`.
pub fn assignment_cost<F>(costs: &[Vec<F>], assignment: &[usize]) -> F
where
    F: NumAssign + Copy,
{
    let mut total = F::zero();
    for (row, &j) in costs.iter().zip(assignment) {
        total += row[j];
    }
    total
}

/// Solve the assignment problem by enumerating all permutations.
///
/// Only useful for small matrices.
pub fn brute_force<F>(costs: &[Vec<F>]) -> (F, Vec<usize>)
where
    F: NumAssign + PartialOrd + Copy,
{
    let n = costs.len();
    let mut perm: Vec<usize> = (0..n).collect();
    let mut best = (assignment_cost(costs, &perm), perm.clone());

    // Heap's algorithm
    let mut c = vec![0; n];
    let mut i = 1;
    while i < n {
        if c[i] < i {
            if i % 2 == 0 {
                perm.swap(0, i);
            } else {
                perm.swap(c[i], i);
            }
            let cost = assignment_cost(costs, &perm);
            if cost < best.0 {
                best = (cost, perm.clone());
            }
            c[i] += 1;
            i = 1;
        } else {
            c[i] = 0;
            i += 1;
        }
    }

    best
}

#[cfg(test)]
mod tests {
    use super::{assignment, assignment_cost, brute_force, reduce_columns, reduce_rows, total, zero_cells};
    use super::{hungarian_graph_steps, hungarian_marking_steps};

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
    fn test_reduce() {
        let (m, cmin) = reduce_columns(&costs());
        assert_eq!(cmin, vec![5, 7, 6, 2, 5]);
        let (m, rmin) = reduce_rows(&m);
        assert_eq!(rmin, vec![0, 0, 2, 0, 0]);
        assert_eq!(
            m,
            vec![
                vec![0, 0, 0, 7, 0],
                vec![3, 0, 0, 0, 2],
                vec![1, 0, 5, 6, 3],
                vec![0, 0, 0, 5, 4],
                vec![1, 0, 2, 3, 4],
            ]
        );
        assert_eq!(zero_cells(&m).len(), 12);
        assert_eq!(zero_cells(&m)[..4], [(0, 0), (0, 1), (0, 2), (0, 4)]);
    }

    #[test]
    fn test_brute_force() {
        let (total, perm) = brute_force(&costs());
        assert_eq!(total, 28);
        assert_eq!(assignment_cost(&costs(), &perm), 28);

        let (total, perm) = brute_force::<f64>(&[]);
        assert_eq!(total, 0.0);
        assert!(perm.is_empty());

        let (total, perm) = brute_force(&[vec![4, 1], vec![2, 8]]);
        assert_eq!(total, 3);
        assert_eq!(perm, vec![1, 0]);
    }

    #[test]
    fn test_trace_accessors() {
        let g = hungarian_graph_steps(&costs());
        let p = assignment(&g).unwrap();
        assert_eq!(assignment_cost(&costs(), p), 28);
        assert_eq!(total(&g), Some(28));

        let m = hungarian_marking_steps(&costs());
        assert_eq!(assignment(&m), Some(&[4, 3, 1, 2, 0][..]));
        assert_eq!(total(&m), Some(28));

        // a truncated trace has no solution
        assert_eq!(assignment(&g[..1]), None);
        assert_eq!(total(&m[..2]), None);
    }
}
