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

//! The transportation problem.
//!
//! A transportation problem consists of `m` suppliers with supplies
//! `a_1, …, a_m`, `n` consumers with demands `b_1, …, b_n` and a cost
//! matrix `c` where `c[i][j]` is the cost of shipping one unit from
//! supplier `i` to consumer `j`.
//!
//! The problem is solved in two stages, each producing a trace of steps:
//!
//! 1. [`vogel`] computes an initial basic feasible solution with Vogel's
//!    approximation method (after [`balance`]-ing the problem),
//! 2. [`potentials`] improves the solution with the method of potentials
//!    (MODI) until it is optimal. The initial solution is completed to a
//!    spanning tree and perturbed by [`basis::complete_basis`] first, so
//!    degenerate solutions need no special treatment.
//!
//! # Example
//!
//! ```
//! use rs_transport::transport::solve_transport;
//!
//! let costs = vec![
//!     vec![10.0, 7.0, 6.0, 8.0],
//!     vec![5.0, 6.0, 5.0, 4.0],
//!     vec![8.0, 7.0, 6.0, 7.0],
//! ];
//! let trace = solve_transport(&costs, &[31.0, 48.0, 38.0], &[22.0, 34.0, 41.0, 20.0]);
//!
//! assert_eq!(trace.vam.len(), 6);
//! assert_eq!(trace.vam.last().map(|s| s.total_cost), Some(668.0));
//! // Vogel's solution is already optimal here
//! assert_eq!(trace.potentials.len(), 1);
//! assert!(trace.potentials[0].entering.is_none());
//! ```

pub mod balance;
pub mod basis;
pub mod potentials;
pub mod vogel;

pub use self::balance::{balance, Balanced};
pub use self::potentials::{potentials_iteration, potentials_steps, Potentials, PotentialsSnapshot, PotentialsState};
pub use self::vogel::{vogel_steps, VamStep, Vogel};

use crate::epsilon::EpsilonValue;
use num_traits::NumAssign;

#[cfg(feature = "serialize")]
use serde_derive::{Deserialize, Serialize};

/// A cell `(row, column)` of a cost or allocation matrix.
pub type Cell = (usize, usize);

/// A row or a column of a matrix.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub enum Line {
    Row(usize),
    Column(usize),
}

/// Return the total cost `Σ c[i][j]·x[i][j]` of a plan.
pub fn total_cost<F>(costs: &[Vec<F>], quantities: &[Vec<F>]) -> F
where
    F: NumAssign + Copy,
{
    let mut total = F::zero();
    for (crow, xrow) in costs.iter().zip(quantities) {
        for (&c, &x) in crow.iter().zip(xrow) {
            total += c * x;
        }
    }
    total
}

/// Return the total cost of a perturbed plan.
pub fn total_epsilon_cost(costs: &[Vec<f64>], alloc: &[Vec<EpsilonValue>]) -> EpsilonValue {
    costs
        .iter()
        .zip(alloc)
        .flat_map(|(crow, xrow)| crow.iter().zip(xrow).map(|(&c, &x)| x * c))
        .sum()
}

/// Lift a plain plan to perturbed values.
pub fn to_epsilon_allocation(quantities: &[Vec<f64>]) -> Vec<Vec<EpsilonValue>> {
    quantities
        .iter()
        .map(|row| row.iter().map(|&x| EpsilonValue::from(x)).collect())
        .collect()
}

/// The complete trace of solving a transportation problem.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub struct TransportTrace {
    /// The balanced problem that has been solved.
    pub problem: Balanced<f64>,
    /// The steps of Vogel's method.
    pub vam: Vec<VamStep<f64>>,
    /// Cells that were added to complete a degenerate basis.
    pub perturbed: Vec<Cell>,
    /// The perturbed supplies, the row sums of every plan of the potentials stage.
    pub supplies: Vec<EpsilonValue>,
    /// The perturbed demands, the column sums of every plan of the potentials stage.
    pub demands: Vec<EpsilonValue>,
    /// The iterations of the method of potentials.
    pub potentials: Vec<PotentialsSnapshot>,
}

impl TransportTrace {
    /// Return the final (optimal, if the last snapshot is optimal) plan.
    pub fn final_allocation(&self) -> Vec<Vec<EpsilonValue>> {
        match self.potentials.last() {
            Some(snapshot) => snapshot.allocation_after().to_vec(),
            None => to_epsilon_allocation(&vogel::final_allocation(&self.problem, &self.vam)),
        }
    }
}

/// Solve a transportation problem: Vogel's method followed by the method
/// of potentials, both with default settings.
pub fn solve_transport(costs: &[Vec<f64>], supplies: &[f64], demands: &[f64]) -> TransportTrace {
    let vogel = Vogel::new(costs, supplies, demands);
    let vam = vogel.steps();
    let problem = vogel.into_problem();

    let initial = to_epsilon_allocation(&vogel::final_allocation(&problem, &vam));
    let (supplies, demands) = basis::perturb(&problem.supplies, &problem.demands);
    let (perturbed, potentials) = if problem.costs.is_empty() || problem.demands.is_empty() {
        (vec![], vec![])
    } else {
        let (initial, perturbed) = basis::complete_basis(&problem.costs, &initial);
        (perturbed, Potentials::new().solve(&problem.costs, &initial))
    };

    TransportTrace {
        problem,
        vam,
        perturbed,
        supplies,
        demands,
        potentials,
    }
}
