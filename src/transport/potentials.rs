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

//! The method of potentials (MODI).
//!
//! Each iteration starts from a basic feasible plan and
//!
//! 1. computes potentials `u` (suppliers) and `v` (consumers) with
//!    `u[0] = 0` and `v[j] = u[i] + c[i][j]` for every basic cell,
//! 2. computes the reduced costs `δ[i][j] = c[i][j] - (v[j] - u[i])`,
//! 3. selects the non-basic cell with the most negative reduced cost as
//!    entering cell (the plan is optimal if there is none),
//! 4. finds the unique cycle through the entering cell and the basis,
//!    alternately marked `+` and `-` starting with `+` at the entering cell,
//! 5. shifts `θ`, the smallest allocation of a `-` cell, along the cycle.
//!
//! Allocations are [`EpsilonValue`]s. Plans completed by
//! [`complete_basis`](super::basis::complete_basis) carry a perturbation
//! under which `θ` is attained by exactly one `-` cell, so every pivot
//! exchanges one basic cell and keeps all supplies and demands. In other
//! plans several `-` cells may drop to zero at once. The first of them (in
//! cycle order) is reported as leaving cell and the basis loses the others.
//!
//! # Example
//!
//! ```
//! use rs_transport::transport::{potentials_steps, to_epsilon_allocation, PotentialsState};
//!
//! let costs = vec![
//!     vec![10.0, 7.0, 6.0, 8.0],
//!     vec![5.0, 6.0, 5.0, 4.0],
//!     vec![8.0, 7.0, 6.0, 7.0],
//! ];
//! // north-west corner rule
//! let alloc = to_epsilon_allocation(&[
//!     vec![22.0, 9.0, 0.0, 0.0],
//!     vec![0.0, 25.0, 23.0, 0.0],
//!     vec![0.0, 0.0, 18.0, 20.0],
//! ]);
//!
//! let steps = potentials_steps(&costs, &alloc);
//! assert_eq!(steps.len(), 3);
//! assert_eq!(steps[0].entering, Some((1, 0)));
//! assert_eq!(steps[0].total_cost_before.base, 796.0);
//! assert_eq!(steps[1].total_cost_before.base, 708.0);
//! assert_eq!(steps[2].state(), PotentialsState::Optimal);
//! assert_eq!(steps[2].total_cost_before.base, 668.0);
//! ```

use super::{total_epsilon_cost, Cell};
use crate::epsilon::EpsilonValue;

use either::Either::{self, Left, Right};
use std::collections::{HashMap, VecDeque};

#[cfg(feature = "serialize")]
use serde_derive::{Deserialize, Serialize};

/// The default iteration limit.
pub const MAX_ITERATIONS: usize = 100;

/// The default tolerance for treating values as zero.
pub const TOLERANCE: f64 = 1e-9;

/// A node of the basis graph: `Left(i)` is supplier `i`, `Right(j)` is
/// consumer `j`.
type Node = Either<usize, usize>;

/// The sign of a cell on the cycle.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub enum Sign {
    Plus,
    Minus,
}

/// The outcome of one iteration.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum PotentialsState {
    /// No cell has a negative reduced cost, the plan is optimal.
    Optimal,
    /// The plan has been improved by a pivot.
    Improved,
    /// There is an entering cell but no cycle through the basis.
    ///
    /// This happens for degenerate (disconnected) bases only.
    Stuck,
}

/// A pivot along a cycle.
#[derive(Clone, PartialEq, Debug)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub struct Pivot {
    /// The cycle starting at the entering cell.
    pub cycle: Vec<(Cell, Sign)>,
    /// The quantity shifted along the cycle.
    pub theta: EpsilonValue,
    /// The cell leaving the basis.
    pub leaving: Option<Cell>,
    /// The plan after the pivot.
    pub allocation: Vec<Vec<EpsilonValue>>,
    /// The cost of the plan after the pivot.
    pub total_cost: EpsilonValue,
}

/// One iteration of the method of potentials.
#[derive(Clone, PartialEq, Debug)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub struct PotentialsSnapshot {
    /// The potentials of the suppliers.
    pub u: Vec<f64>,
    /// The potentials of the consumers.
    pub v: Vec<f64>,
    /// The reduced costs `c[i][j] - (v[j] - u[i])`.
    pub reduced_costs: Vec<Vec<f64>>,
    /// The entering cell, `None` if the plan is optimal.
    pub entering: Option<Cell>,
    /// The plan at the start of the iteration.
    pub allocation_before: Vec<Vec<EpsilonValue>>,
    /// The cost of the plan at the start of the iteration.
    pub total_cost_before: EpsilonValue,
    /// The pivot, `None` if optimal or stuck.
    pub pivot: Option<Pivot>,
}

impl PotentialsSnapshot {
    pub fn state(&self) -> PotentialsState {
        match (&self.entering, &self.pivot) {
            (None, _) => PotentialsState::Optimal,
            (Some(_), Some(_)) => PotentialsState::Improved,
            (Some(_), None) => PotentialsState::Stuck,
        }
    }

    /// Return the cycle, if any.
    pub fn cycle(&self) -> Option<&[(Cell, Sign)]> {
        self.pivot.as_ref().map(|p| &p.cycle[..])
    }

    /// Return the sign of a cell on the cycle.
    pub fn sign(&self, cell: Cell) -> Option<Sign> {
        self.cycle()?.iter().find(|&&(c, _)| c == cell).map(|&(_, s)| s)
    }

    /// Return `θ`, if a pivot has been done.
    pub fn theta(&self) -> Option<EpsilonValue> {
        self.pivot.as_ref().map(|p| p.theta)
    }

    /// Return the plan at the end of the iteration.
    pub fn allocation_after(&self) -> &[Vec<EpsilonValue>] {
        match &self.pivot {
            Some(p) => &p.allocation,
            None => &self.allocation_before,
        }
    }

    /// Return the cost at the end of the iteration.
    pub fn total_cost_after(&self) -> EpsilonValue {
        self.pivot.as_ref().map(|p| p.total_cost).unwrap_or(self.total_cost_before)
    }
}

/// The method of potentials.
pub struct Potentials {
    /// The maximal number of iterations of [`Potentials::solve`].
    pub max_iterations: usize,
    /// Components of allocations below this value are set to zero after a
    /// pivot, reduced costs must be below `-tolerance` to be improving.
    pub tolerance: f64,
}

impl Default for Potentials {
    fn default() -> Self {
        Potentials {
            max_iterations: MAX_ITERATIONS,
            tolerance: TOLERANCE,
        }
    }
}

impl Potentials {
    pub fn new() -> Self {
        Self::default()
    }

    /// Perform one iteration starting from the plan `alloc`.
    pub fn iterate(&self, costs: &[Vec<f64>], alloc: &[Vec<EpsilonValue>]) -> PotentialsSnapshot {
        let (u, v) = compute_potentials(costs, alloc);
        let reduced_costs: Vec<Vec<f64>> = costs
            .iter()
            .enumerate()
            .map(|(i, row)| row.iter().enumerate().map(|(j, &c)| c - (v[j] - u[i])).collect())
            .collect();
        log::trace!("potentials u: {:?}, v: {:?}", u, v);

        let entering = self.find_entering(alloc, &reduced_costs);
        let total_cost_before = total_epsilon_cost(costs, alloc);

        let pivot = entering.and_then(|cell| {
            log::debug!("entering cell {:?} with δ = {}", cell, reduced_costs[cell.0][cell.1]);
            let pivot = find_cycle(alloc, cell).and_then(|cycle| self.pivot(costs, alloc, cycle));
            if pivot.is_none() {
                log::warn!("no cycle through entering cell {:?}, basis is degenerate", cell);
            }
            pivot
        });

        PotentialsSnapshot {
            u,
            v,
            reduced_costs,
            entering,
            allocation_before: alloc.to_vec(),
            total_cost_before,
            pivot,
        }
    }

    /// Iterate until the plan is optimal, stuck or the iteration limit is
    /// reached.
    pub fn solve(&self, costs: &[Vec<f64>], alloc: &[Vec<EpsilonValue>]) -> Vec<PotentialsSnapshot> {
        let mut steps: Vec<PotentialsSnapshot> = Vec::new();
        let mut current = alloc.to_vec();
        loop {
            if steps.len() >= self.max_iterations {
                log::warn!("method of potentials stopped after {} iterations", steps.len());
                break;
            }
            let snapshot = self.iterate(costs, &current);
            let next = snapshot.pivot.as_ref().map(|p| p.allocation.clone());
            steps.push(snapshot);
            match next {
                Some(alloc) => current = alloc,
                None => break,
            }
        }
        steps
    }

    /// Return the non-basic cell with the most negative reduced cost.
    fn find_entering(&self, alloc: &[Vec<EpsilonValue>], reduced_costs: &[Vec<f64>]) -> Option<Cell> {
        let mut min_cost = -self.tolerance;
        let mut min_cell = None;
        for (i, row) in reduced_costs.iter().enumerate() {
            for (j, &d) in row.iter().enumerate() {
                if d < min_cost && !alloc[i][j].is_basic() {
                    min_cost = d;
                    min_cell = Some((i, j));
                }
            }
        }
        min_cell
    }

    /// Shift `θ` along the cycle.
    fn pivot(&self, costs: &[Vec<f64>], alloc: &[Vec<EpsilonValue>], cycle: Vec<(Cell, Sign)>) -> Option<Pivot> {
        let theta = cycle
            .iter()
            .filter(|&&(_, s)| s == Sign::Minus)
            .map(|&((i, j), _)| alloc[i][j])
            .fold(None, |min: Option<EpsilonValue>, x| match min {
                Some(m) if m <= x => Some(m),
                _ => Some(x),
            })?;

        let mut allocation = alloc.to_vec();
        let mut leaving = None;
        for &((i, j), sign) in &cycle {
            let x = match sign {
                Sign::Plus => allocation[i][j] + theta,
                Sign::Minus => allocation[i][j] - theta,
            }
            .clamp_small(self.tolerance);
            allocation[i][j] = x;
            if sign == Sign::Minus && x.is_zero() {
                match leaving {
                    None => leaving = Some((i, j)),
                    Some(_) => log::warn!("Cell {:?} drops to zero as well, the basis becomes degenerate", (i, j)),
                }
            }
        }
        log::debug!("θ = {}, leaving cell {:?}", theta, leaving);

        let total_cost = total_epsilon_cost(costs, &allocation);
        Some(Pivot {
            cycle,
            theta,
            leaving,
            allocation,
            total_cost,
        })
    }
}

/// Compute the potentials by a breadth-first search in the basis graph.
///
/// Potentials of nodes not connected to supplier 0 are set to 0.
fn compute_potentials(costs: &[Vec<f64>], alloc: &[Vec<EpsilonValue>]) -> (Vec<f64>, Vec<f64>) {
    let m = alloc.len();
    let n = alloc.first().map(|row| row.len()).unwrap_or(0);
    let mut u = vec![None; m];
    let mut v = vec![None; n];
    let mut queue = VecDeque::new();

    if m > 0 {
        u[0] = Some(0.0);
        queue.push_back(Left(0));
    }

    while let Some(node) = queue.pop_front() {
        match node {
            Left(i) => {
                if let Some(ui) = u[i] {
                    for j in 0..n {
                        if v[j].is_none() && alloc[i][j].is_basic() {
                            v[j] = Some(ui + costs[i][j]);
                            queue.push_back(Right(j));
                        }
                    }
                }
            }
            Right(j) => {
                if let Some(vj) = v[j] {
                    for i in 0..m {
                        if u[i].is_none() && alloc[i][j].is_basic() {
                            u[i] = Some(vj - costs[i][j]);
                            queue.push_back(Left(i));
                        }
                    }
                }
            }
        }
    }

    let unreached = u.iter().chain(&v).filter(|p| p.is_none()).count();
    if unreached > 0 {
        log::warn!("basis graph is not connected, {} potentials default to 0", unreached);
    }

    (
        u.into_iter().map(|p| p.unwrap_or(0.0)).collect(),
        v.into_iter().map(|p| p.unwrap_or(0.0)).collect(),
    )
}

/// Find the cycle through the entering cell and the basis.
///
/// The cycle leaves the entering cell along its column, then alternates
/// between rows and columns. This is a breadth-first search in the basis
/// graph from the entering cell's consumer to its supplier.
fn find_cycle(alloc: &[Vec<EpsilonValue>], entering: Cell) -> Option<Vec<(Cell, Sign)>> {
    let m = alloc.len();
    let n = alloc.first().map(|row| row.len()).unwrap_or(0);
    let src: Node = Right(entering.1);
    let snk: Node = Left(entering.0);

    let mut pred: HashMap<Node, (Node, Cell)> = HashMap::new();
    let mut queue = VecDeque::new();
    queue.push_back(src);
    while let Some(node) = queue.pop_front() {
        if node == snk {
            break;
        }
        let neighs: Vec<(Node, Cell)> = match node {
            Right(j) => (0..m)
                .filter(|&i| alloc[i][j].is_basic())
                .map(|i| (Left(i), (i, j)))
                .collect(),
            Left(i) => (0..n)
                .filter(|&j| alloc[i][j].is_basic())
                .map(|j| (Right(j), (i, j)))
                .collect(),
        };
        for (next, cell) in neighs {
            if next != src && !pred.contains_key(&next) {
                pred.insert(next, (node, cell));
                queue.push_back(next);
            }
        }
    }

    let mut path = Vec::new();
    let mut node = snk;
    while node != src {
        let &(prev, cell) = pred.get(&node)?;
        path.push(cell);
        node = prev;
    }
    path.reverse();

    let mut cycle = Vec::with_capacity(path.len() + 1);
    cycle.push((entering, Sign::Plus));
    for (k, cell) in path.into_iter().enumerate() {
        cycle.push((cell, if k % 2 == 0 { Sign::Minus } else { Sign::Plus }));
    }
    Some(cycle)
}

/// Perform one iteration with default settings.
pub fn potentials_iteration(costs: &[Vec<f64>], alloc: &[Vec<EpsilonValue>]) -> PotentialsSnapshot {
    Potentials::new().iterate(costs, alloc)
}

/// Iterate with default settings until the plan is optimal.
pub fn potentials_steps(costs: &[Vec<f64>], alloc: &[Vec<EpsilonValue>]) -> Vec<PotentialsSnapshot> {
    Potentials::new().solve(costs, alloc)
}

#[cfg(test)]
mod tests {
    use super::{find_cycle, potentials_iteration, potentials_steps, Potentials, PotentialsState, Sign};
    use crate::epsilon::EpsilonValue;
    use crate::transport::basis::complete_basis;
    use crate::transport::to_epsilon_allocation;

    fn costs() -> Vec<Vec<f64>> {
        vec![
            vec![10.0, 7.0, 6.0, 8.0],
            vec![5.0, 6.0, 5.0, 4.0],
            vec![8.0, 7.0, 6.0, 7.0],
        ]
    }

    fn north_west() -> Vec<Vec<EpsilonValue>> {
        to_epsilon_allocation(&[
            vec![22.0, 9.0, 0.0, 0.0],
            vec![0.0, 25.0, 23.0, 0.0],
            vec![0.0, 0.0, 18.0, 20.0],
        ])
    }

    #[test]
    fn test_iteration() {
        let s = potentials_iteration(&costs(), &north_west());
        assert_eq!(s.u, vec![0.0, 1.0, 0.0]);
        assert_eq!(s.v, vec![10.0, 7.0, 6.0, 7.0]);
        assert_eq!(s.reduced_costs[1][0], -4.0);
        for &(i, j) in [(0, 0), (0, 1), (1, 1), (1, 2), (2, 2), (2, 3)].iter() {
            assert_eq!(s.reduced_costs[i][j], 0.0);
        }
        assert_eq!(s.entering, Some((1, 0)));
        assert_eq!(s.state(), PotentialsState::Improved);

        let pivot = s.pivot.as_ref().unwrap();
        assert_eq!(
            pivot.cycle,
            vec![
                ((1, 0), Sign::Plus),
                ((0, 0), Sign::Minus),
                ((0, 1), Sign::Plus),
                ((1, 1), Sign::Minus)
            ]
        );
        assert_eq!(s.sign((0, 1)), Some(Sign::Plus));
        assert_eq!(s.sign((2, 2)), None);
        assert_eq!(pivot.theta, EpsilonValue::from(22.0));
        assert_eq!(pivot.leaving, Some((0, 0)));
        assert_eq!(s.total_cost_before, EpsilonValue::from(796.0));
        assert_eq!(s.total_cost_after(), EpsilonValue::from(708.0));
        assert_eq!(
            pivot.allocation,
            to_epsilon_allocation(&[
                vec![0.0, 31.0, 0.0, 0.0],
                vec![22.0, 3.0, 23.0, 0.0],
                vec![0.0, 0.0, 18.0, 20.0],
            ])
        );
        // the snapshot keeps the plan it started from
        assert_eq!(s.allocation_before, north_west());
    }

    #[test]
    fn test_solve() {
        let steps = potentials_steps(&costs(), &north_west());
        let states: Vec<_> = steps.iter().map(|s| s.state()).collect();
        assert_eq!(
            states,
            vec![PotentialsState::Improved, PotentialsState::Improved, PotentialsState::Optimal]
        );
        assert_eq!(steps[1].entering, Some((1, 3)));
        assert_eq!(steps[1].theta(), Some(EpsilonValue::from(20.0)));
        for s in &steps {
            assert!(s.total_cost_after() <= s.total_cost_before);
        }
        let last = steps.last().unwrap();
        assert_eq!(last.total_cost_after(), EpsilonValue::from(668.0));
        assert_eq!(last.v, vec![6.0, 7.0, 6.0, 5.0]);
        assert!(last.reduced_costs.iter().flatten().all(|&d| d >= 0.0));
    }

    #[test]
    fn test_degenerate_pivot() {
        let costs = vec![vec![3.0, 1.0], vec![1.0, 3.0]];
        let (alloc, added) = complete_basis(&costs, &to_epsilon_allocation(&[vec![5.0, 0.0], vec![0.0, 5.0]]));
        assert_eq!(added, vec![(0, 1)]);

        let steps = potentials_steps(&costs, &alloc);
        assert_eq!(steps.len(), 2);
        assert_eq!(steps[0].u, vec![0.0, -2.0]);
        assert_eq!(steps[0].entering, Some((1, 0)));
        let pivot = steps[0].pivot.as_ref().unwrap();
        // without the perturbation both `-` cells would drop to zero
        assert_eq!(pivot.theta, EpsilonValue::new(5.0, 1.0));
        assert_eq!(pivot.leaving, Some((0, 0)));
        assert_eq!(
            pivot.allocation,
            vec![
                vec![EpsilonValue::default(), EpsilonValue::new(5.0, 2.0)],
                vec![EpsilonValue::new(5.0, 1.0), EpsilonValue::epsilon(1.0)],
            ]
        );
        assert_eq!(steps[0].total_cost_before, EpsilonValue::new(30.0, 10.0));
        assert_eq!(pivot.total_cost, EpsilonValue::new(10.0, 6.0));
        assert_eq!(steps[1].state(), PotentialsState::Optimal);
        assert_eq!(steps[1].v, vec![-1.0, 1.0]);
    }

    #[test]
    fn test_tied_leaving_cells() {
        // not perturbed: both `-` cells reach zero in the same pivot
        let costs = vec![vec![3.0, 1.0], vec![1.0, 3.0]];
        let mut alloc = to_epsilon_allocation(&[vec![5.0, 0.0], vec![0.0, 5.0]]);
        alloc[0][1] = EpsilonValue::epsilon(1.0);

        let s = potentials_iteration(&costs, &alloc);
        let pivot = s.pivot.as_ref().unwrap();
        assert_eq!(pivot.theta, EpsilonValue::from(5.0));
        assert_eq!(pivot.leaving, Some((0, 0)));
        // no flow is created, supplies and demands are kept
        assert_eq!(
            pivot.allocation,
            vec![
                vec![EpsilonValue::default(), EpsilonValue::new(5.0, 1.0)],
                vec![EpsilonValue::from(5.0), EpsilonValue::default()],
            ]
        );
        assert_eq!(s.total_cost_before, EpsilonValue::new(30.0, 1.0));
        assert_eq!(pivot.total_cost, EpsilonValue::new(10.0, 1.0));
    }

    #[test]
    fn test_stuck() {
        // two basic cells only, the basis graph is not connected
        let costs = vec![vec![2.0, 5.0], vec![1.0, 9.0]];
        let alloc = to_epsilon_allocation(&[vec![5.0, 0.0], vec![0.0, 7.0]]);

        let steps = potentials_steps(&costs, &alloc);
        assert_eq!(steps.len(), 1);
        let s = &steps[0];
        assert_eq!(s.u, vec![0.0, 0.0]);
        assert_eq!(s.v, vec![2.0, 0.0]);
        assert_eq!(s.entering, Some((1, 0)));
        assert_eq!(s.state(), PotentialsState::Stuck);
        assert!(s.cycle().is_none());
        assert!(s.theta().is_none());
        assert_eq!(s.allocation_after(), &alloc[..]);
        assert!(find_cycle(&alloc, (1, 0)).is_none());
    }

    #[test]
    fn test_iteration_limit() {
        let mut potentials = Potentials::new();
        potentials.max_iterations = 1;
        let steps = potentials.solve(&costs(), &north_west());
        assert_eq!(steps.len(), 1);
        assert_eq!(steps[0].state(), PotentialsState::Improved);
    }
}
