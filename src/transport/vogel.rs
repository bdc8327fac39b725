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

//! Vogel's approximation method.
//!
//! Each step of the method computes a *penalty* for every row and column
//! that still has supply or demand left: the difference between the two
//! smallest available costs of that line (or the cost itself if only one
//! cell is available). The line with the largest penalty is selected and the
//! cheapest available cell of this line receives as much as possible.
//!
//! Ties are broken as follows:
//!
//! - among lines with the largest penalty, the one with the smallest
//!   available cost wins, then rows before columns, then smaller indices,
//! - among equally cheap cells of the selected line, the one whose crossing
//!   line has the larger penalty wins, then the smaller index.
//!
//! # Example
//!
//! ```
//! use rs_transport::transport::{vogel_steps, Line};
//!
//! let costs = vec![vec![10, 7, 6, 8], vec![5, 6, 5, 4], vec![8, 7, 6, 7]];
//! let steps = vogel_steps(&costs, &[31, 48, 38], &[22, 34, 41, 20]);
//!
//! assert_eq!(steps.len(), 6);
//! assert_eq!(steps[0].line, Line::Column(3));
//! assert_eq!(steps[0].cell, (1, 3));
//! assert_eq!(steps[0].placed, 20);
//!
//! let last = steps.last().unwrap();
//! assert!(last.supplies_left.iter().all(|&s| s == 0));
//! assert!(last.demands_left.iter().all(|&d| d == 0));
//! assert_eq!(last.total_cost, 668);
//! ```

use super::balance::{balance, Balanced};
use super::{Cell, Line};

use num_traits::NumAssign;
use std::fmt::Debug;

#[cfg(feature = "serialize")]
use serde_derive::{Deserialize, Serialize};

/// The default iteration limit.
pub const MAX_ITERATIONS: usize = 10_000;

/// A cell of the allocation matrix.
#[derive(Clone, Copy, PartialEq, Debug)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub struct AllocCell<F> {
    /// The quantity shipped.
    pub quantity: F,
    /// The penalty that selected this cell (if it has been selected).
    pub penalty_used: Option<F>,
}

/// One step of Vogel's method.
#[derive(Clone, PartialEq, Debug)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub struct VamStep<F> {
    /// The number of the step, starting at 1.
    pub index: usize,
    /// The cell that received a shipment.
    pub cell: Cell,
    /// The line selected by its penalty.
    pub line: Line,
    /// The quantity shipped in this step.
    pub placed: F,
    /// The penalty of the selected line.
    pub penalty: F,
    /// The penalties of all rows, `None` for exhausted rows.
    pub row_penalties: Vec<Option<F>>,
    /// The penalties of all columns, `None` for exhausted columns.
    pub column_penalties: Vec<Option<F>>,
    /// The allocation after this step.
    pub allocation: Vec<Vec<AllocCell<F>>>,
    /// The remaining supplies after this step.
    pub supplies_left: Vec<F>,
    /// The remaining demands after this step.
    pub demands_left: Vec<F>,
    /// The cost of the allocation after this step.
    pub total_cost: F,
}

/// Vogel's approximation method on a (balanced) transportation problem.
pub struct Vogel<F> {
    problem: Balanced<F>,
    /// The maximal number of steps. A trace hitting this limit is
    /// truncated.
    pub max_iterations: usize,
}

/// The penalty of a line with the given available costs.
fn penalty<F, I>(costs: I) -> Option<F>
where
    F: NumAssign + PartialOrd + Copy,
    I: IntoIterator<Item = F>,
{
    let mut first: Option<F> = None;
    let mut second: Option<F> = None;
    for c in costs {
        match first {
            Some(a) if c < a => {
                second = first;
                first = Some(c);
            }
            Some(_) => match second {
                Some(b) if b <= c => (),
                _ => second = Some(c),
            },
            None => first = Some(c),
        }
    }
    match (first, second) {
        (Some(a), Some(b)) => Some(b - a),
        (Some(a), None) => Some(a),
        _ => None,
    }
}

/// The minimum of an iterator of partially ordered values.
fn minimum<F, I>(values: I) -> Option<F>
where
    F: PartialOrd + Copy,
    I: IntoIterator<Item = F>,
{
    values
        .into_iter()
        .fold(None, |min, x| match min {
            Some(m) if m <= x => Some(m),
            _ => Some(x),
        })
}

/// The working state of one run.
struct VamState<'a, F> {
    costs: &'a [Vec<F>],
    supplies: Vec<F>,
    demands: Vec<F>,
    alloc: Vec<Vec<AllocCell<F>>>,
    total: F,
}

impl<'a, F> VamState<'a, F>
where
    F: NumAssign + PartialOrd + Copy + Debug,
{
    fn new(problem: &'a Balanced<F>) -> Self {
        let empty = AllocCell {
            quantity: F::zero(),
            penalty_used: None,
        };
        VamState {
            costs: &problem.costs,
            supplies: problem.supplies.clone(),
            demands: problem.demands.clone(),
            alloc: vec![vec![empty; problem.demands.len()]; problem.supplies.len()],
            total: F::zero(),
        }
    }

    fn is_done(&self) -> bool {
        !self.supplies.iter().any(|&s| s > F::zero()) || !self.demands.iter().any(|&d| d > F::zero())
    }

    fn open_rows(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.supplies.len()).filter(move |&i| self.supplies[i] > F::zero())
    }

    fn open_columns(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.demands.len()).filter(move |&j| self.demands[j] > F::zero())
    }

    fn row_costs(&self, i: usize) -> impl Iterator<Item = F> + '_ {
        self.open_columns().map(move |j| self.costs[i][j])
    }

    fn column_costs(&self, j: usize) -> impl Iterator<Item = F> + '_ {
        self.open_rows().map(move |i| self.costs[i][j])
    }

    fn row_penalties(&self) -> Vec<Option<F>> {
        (0..self.supplies.len())
            .map(|i| {
                if self.supplies[i] > F::zero() {
                    penalty(self.row_costs(i))
                } else {
                    None
                }
            })
            .collect()
    }

    fn column_penalties(&self) -> Vec<Option<F>> {
        (0..self.demands.len())
            .map(|j| {
                if self.demands[j] > F::zero() {
                    penalty(self.column_costs(j))
                } else {
                    None
                }
            })
            .collect()
    }

    /// Select the line with the maximal penalty.
    ///
    /// Returns the line and its penalty.
    fn select_line(&self, row_pen: &[Option<F>], col_pen: &[Option<F>]) -> Option<(Line, F)> {
        let best = row_pen
            .iter()
            .chain(col_pen)
            .flatten()
            .fold(None, |best: Option<F>, &p| match best {
                Some(b) if b >= p => Some(b),
                _ => Some(p),
            })?;

        let rows = (0..row_pen.len())
            .filter(|&i| row_pen[i] == Some(best))
            .filter_map(|i| minimum(self.row_costs(i)).map(|c| (Line::Row(i), c)));
        let cols = (0..col_pen.len())
            .filter(|&j| col_pen[j] == Some(best))
            .filter_map(|j| minimum(self.column_costs(j)).map(|c| (Line::Column(j), c)));

        // The first candidate with the smallest cost, rows come first.
        let mut chosen: Option<(Line, F)> = None;
        for (line, c) in rows.chain(cols) {
            match chosen {
                Some((_, min)) if min <= c => (),
                _ => chosen = Some((line, c)),
            }
        }

        chosen.map(|(line, _)| (line, best))
    }

    /// Select the cheapest available cell on a line.
    ///
    /// Equally cheap cells are ordered by the penalty of the crossing line.
    fn select_cell(&self, line: Line, row_pen: &[Option<F>], col_pen: &[Option<F>]) -> Option<Cell> {
        let (candidates, crossing): (Vec<usize>, &[Option<F>]) = match line {
            Line::Row(i) => {
                let min = minimum(self.row_costs(i))?;
                (self.open_columns().filter(|&j| self.costs[i][j] == min).collect(), col_pen)
            }
            Line::Column(j) => {
                let min = minimum(self.column_costs(j))?;
                (self.open_rows().filter(|&i| self.costs[i][j] == min).collect(), row_pen)
            }
        };

        let mut best = *candidates.first()?;
        for &k in &candidates[1..] {
            if crossing[k] > crossing[best] {
                best = k;
            }
        }

        Some(match line {
            Line::Row(i) => (i, best),
            Line::Column(j) => (best, j),
        })
    }

    /// Ship as much as possible into a cell. Returns the shipped quantity.
    fn allocate(&mut self, (i, j): Cell, penalty: F) -> F {
        let placed = if self.supplies[i] < self.demands[j] {
            self.supplies[i]
        } else {
            self.demands[j]
        };
        let cell = &mut self.alloc[i][j];
        cell.quantity += placed;
        cell.penalty_used = Some(penalty);
        self.supplies[i] -= placed;
        self.demands[j] -= placed;
        self.total += placed * self.costs[i][j];
        placed
    }
}

impl<F> Vogel<F>
where
    F: NumAssign + PartialOrd + Copy + Debug,
{
    /// Create the method for a (possibly unbalanced) problem.
    ///
    /// The problem is balanced with [`balance`] first, all steps refer to
    /// the balanced problem.
    pub fn new(costs: &[Vec<F>], supplies: &[F], demands: &[F]) -> Self {
        Vogel {
            problem: balance(costs, supplies, demands),
            max_iterations: MAX_ITERATIONS,
        }
    }

    /// Return the balanced problem.
    pub fn problem(&self) -> &Balanced<F> {
        &self.problem
    }

    /// Return the balanced problem, consuming the method.
    pub fn into_problem(self) -> Balanced<F> {
        self.problem
    }

    /// Compute all steps.
    pub fn steps(&self) -> Vec<VamStep<F>> {
        let mut state = VamState::new(&self.problem);
        let mut steps = Vec::new();

        while !state.is_done() {
            if steps.len() >= self.max_iterations {
                log::warn!("Vogel's method stopped after {} steps", steps.len());
                break;
            }

            let row_pen = state.row_penalties();
            let col_pen = state.column_penalties();
            log::trace!("row penalties: {:?}, column penalties: {:?}", row_pen, col_pen);

            let (line, pen) = match state.select_line(&row_pen, &col_pen) {
                Some(sel) => sel,
                None => break,
            };
            let cell = match state.select_cell(line, &row_pen, &col_pen) {
                Some(cell) => cell,
                None => break,
            };
            let placed = state.allocate(cell, pen);
            log::debug!(
                "VAM step {}: {:?} (penalty {:?}) ships {:?} to {:?}",
                steps.len() + 1,
                line,
                pen,
                placed,
                cell
            );

            steps.push(VamStep {
                index: steps.len() + 1,
                cell,
                line,
                placed,
                penalty: pen,
                row_penalties: row_pen,
                column_penalties: col_pen,
                allocation: state.alloc.clone(),
                supplies_left: state.supplies.clone(),
                demands_left: state.demands.clone(),
                total_cost: state.total,
            });
        }

        steps
    }
}

/// Compute the steps of Vogel's method with default settings.
///
/// The problem is balanced first.
pub fn vogel_steps<F>(costs: &[Vec<F>], supplies: &[F], demands: &[F]) -> Vec<VamStep<F>>
where
    F: NumAssign + PartialOrd + Copy + Debug,
{
    Vogel::new(costs, supplies, demands).steps()
}

/// Return the shipped quantities after the last step.
///
/// For an empty trace this is the zero matrix of the problem's size.
pub fn final_allocation<F>(problem: &Balanced<F>, steps: &[VamStep<F>]) -> Vec<Vec<F>>
where
    F: NumAssign + Copy,
{
    match steps.last() {
        Some(step) => step
            .allocation
            .iter()
            .map(|row| row.iter().map(|c| c.quantity).collect())
            .collect(),
        None => vec![vec![F::zero(); problem.demands.len()]; problem.supplies.len()],
    }
}
