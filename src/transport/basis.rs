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

//! The basis of a transportation plan.
//!
//! The basic cells of a plan are the cells with non-zero (possibly
//! infinitesimal) allocation. Seen as edges between the `m` supplier nodes
//! and the `n` consumer nodes they should form a spanning tree, i.e. there
//! should be exactly `m + n - 1` of them and they must not contain a cycle.
//!
//! A plan with fewer basic cells is *degenerate*, and the method of
//! potentials may run into pivots where several cells drop to zero at once.
//! [`complete_basis`] avoids both by perturbing the problem once: every
//! supply `a[i]` becomes `a[i] + n·ε`, every demand `b[j]` becomes
//! `b[j] + ε` except the last one, which becomes `b[n-1] + (m·n - n + 1)·ε`
//! (see [`perturb`]). For this perturbation no cell of any spanning tree
//! carries an allocation of exactly zero, so `θ` is always attained by a
//! single cell.
//!
//! # Example
//!
//! ```
//! use rs_transport::transport::basis::complete_basis;
//! use rs_transport::transport::to_epsilon_allocation;
//! use rs_transport::epsilon::EpsilonValue;
//!
//! let costs = vec![vec![1.0, 3.0], vec![2.0, 1.0]];
//! let alloc = to_epsilon_allocation(&[vec![5.0, 0.0], vec![0.0, 7.0]]);
//! let (alloc, added) = complete_basis(&costs, &alloc);
//!
//! assert_eq!(added, vec![(0, 1)]);
//! assert_eq!(alloc[0][1], EpsilonValue::epsilon(1.0));
//! assert_eq!(alloc[0][0], EpsilonValue::new(5.0, 1.0));
//! assert_eq!(alloc[1][1], EpsilonValue::new(7.0, 2.0));
//! ```

use super::Cell;
use crate::epsilon::EpsilonValue;

use std::collections::VecDeque;

/// Return all basic cells in row-major order.
pub fn basis_cells(alloc: &[Vec<EpsilonValue>]) -> Vec<Cell> {
    alloc
        .iter()
        .enumerate()
        .flat_map(|(i, row)| {
            row.iter()
                .enumerate()
                .filter(|(_, x)| x.is_basic())
                .map(move |(j, _)| (i, j))
        })
        .collect()
}

/// Union-Find data-structure over supplier and consumer nodes.
#[derive(Clone, Copy)]
enum Component {
    /// The root element with the tree's depth.
    Root(usize),
    /// An inner node with the parent node.
    Node(usize),
}

/// Return the root node and the tree's depth of node `u`.
fn find_root(comps: &[Component], u: usize) -> (usize, usize) {
    let mut v = u;
    loop {
        match comps[v] {
            Component::Node(parent) => v = parent,
            Component::Root(depth) => return (v, depth),
        }
    }
}

/// Join the components of `u` and `v`.
///
/// Returns `false` if both are already in the same component.
fn union(comps: &mut [Component], u: usize, v: usize) -> bool {
    let (uroot, udepth) = find_root(comps, u);
    let (vroot, vdepth) = find_root(comps, v);
    if uroot == vroot {
        return false;
    }
    if udepth < vdepth {
        comps[uroot] = Component::Node(vroot);
    } else {
        comps[vroot] = Component::Node(uroot);
        if udepth == vdepth {
            comps[uroot] = Component::Root(udepth + 1);
        }
    }
    true
}

/// The coefficients of `ε` added to the supplies and demands of an
/// `m × n` problem.
fn perturbation(m: usize, n: usize) -> (Vec<f64>, Vec<f64>) {
    let rows = vec![n as f64; m];
    let mut cols = vec![1.0; n];
    if let Some(last) = cols.last_mut() {
        *last = (m * n + 1).saturating_sub(n) as f64;
    }
    (rows, cols)
}

/// Return the perturbed supplies and demands.
///
/// These are the row and column sums of every plan produced by
/// [`complete_basis`] and of every pivot starting from it.
pub fn perturb(supplies: &[f64], demands: &[f64]) -> (Vec<EpsilonValue>, Vec<EpsilonValue>) {
    let (rows, cols) = perturbation(supplies.len(), demands.len());
    (
        supplies.iter().zip(rows).map(|(&a, e)| EpsilonValue::new(a, e)).collect(),
        demands.iter().zip(cols).map(|(&b, e)| EpsilonValue::new(b, e)).collect(),
    )
}

/// Compute the `ε` coefficients of the cells of a spanning tree.
///
/// Leaves are removed one by one, the cell at a leaf carries the leaf's
/// remaining excess (supply for suppliers, negative demand for consumers).
fn epsilon_flows(m: usize, n: usize, tree: &[Cell]) -> Vec<(Cell, f64)> {
    let (rows, cols) = perturbation(m, n);
    let mut excess: Vec<f64> = rows.into_iter().chain(cols.into_iter().map(|b| -b)).collect();
    let mut degree = vec![0; m + n];
    for &(i, j) in tree {
        degree[i] += 1;
        degree[m + j] += 1;
    }

    let mut removed = vec![false; tree.len()];
    let mut flows = Vec::with_capacity(tree.len());
    let mut leaves: VecDeque<usize> = (0..m + n).filter(|&u| degree[u] == 1).collect();
    while let Some(u) = leaves.pop_front() {
        if degree[u] != 1 {
            continue;
        }
        let k = match (0..tree.len()).find(|&k| !removed[k] && (tree[k].0 == u || m + tree[k].1 == u)) {
            Some(k) => k,
            None => continue,
        };
        removed[k] = true;
        let (i, j) = tree[k];
        let (flow, v) = if u < m { (excess[u], m + j) } else { (-excess[u], i) };
        excess[v] += excess[u];
        excess[u] = 0.0;
        degree[u] -= 1;
        degree[v] -= 1;
        if degree[v] == 1 {
            leaves.push_back(v);
        }
        flows.push(((i, j), flow));
    }
    flows
}

/// Complete and perturb a basic plan.
///
/// The cells with non-zero base allocation must not contain a cycle.
/// They are extended to a spanning tree by growing it from the last
/// consumer: in each round the cheapest cell (row-major for equal costs)
/// that may join the tree is added. A cell may join if it
///
/// - connects a supplier outside the tree (together with all cells of its
///   component) to a consumer of the tree that has not been added as a
///   leaf, or
/// - connects a consumer without any basic cell to a supplier of the tree.
///   Such a consumer stays a leaf.
///
/// The `ε` coefficients of all tree cells are then set to the flows of the
/// perturbation of [`perturb`], the base allocations are kept. The
/// resulting plan is non-negative and has exactly `m + n - 1` basic cells.
///
/// Returns the completed plan and the cells added to the tree. A plan
/// whose basic cells contain a cycle is returned unchanged.
pub fn complete_basis(costs: &[Vec<f64>], alloc: &[Vec<EpsilonValue>]) -> (Vec<Vec<EpsilonValue>>, Vec<Cell>) {
    let m = alloc.len();
    let n = alloc.first().map(|row| row.len()).unwrap_or(0);
    let mut alloc = alloc.to_vec();
    let mut added = Vec::new();
    if m == 0 || n == 0 {
        return (alloc, added);
    }

    // nodes 0..m are suppliers, nodes m..m+n are consumers
    let mut comps = vec![Component::Root(0); m + n];
    let mut tree = Vec::with_capacity(m + n - 1);
    for i in 0..m {
        for j in 0..n {
            if alloc[i][j].base == 0.0 {
                continue;
            }
            if !union(&mut comps, i, m + j) {
                log::warn!("Plan is not basic, cell {:?} closes a cycle", (i, j));
                return (alloc, added);
            }
            tree.push((i, j));
        }
    }

    let comp: Vec<usize> = (0..m + n).map(|u| find_root(&comps, u).0).collect();
    let mut with_supplier = vec![false; m + n];
    for i in 0..m {
        with_supplier[comp[i]] = true;
    }
    let root = comp[m + n - 1];
    let mut in_tree: Vec<bool> = comp.iter().map(|&c| c == root).collect();
    let mut leaf = vec![false; n];

    while in_tree.iter().any(|&t| !t) {
        // the cheapest joining cell and whether it adds a supplier
        let mut best: Option<(Cell, bool)> = None;
        for i in 0..m {
            for j in 0..n {
                if alloc[i][j].base != 0.0 {
                    continue;
                }
                let supplier = !in_tree[i] && in_tree[m + j] && !leaf[j];
                let consumer = in_tree[i] && !in_tree[m + j] && !with_supplier[comp[m + j]];
                if (supplier || consumer) && best.map_or(true, |((k, l), _)| costs[i][j] < costs[k][l]) {
                    best = Some(((i, j), supplier));
                }
            }
        }

        let ((i, j), supplier) = match best {
            Some(best) => best,
            None => {
                log::warn!("No cell can extend the basis");
                break;
            }
        };
        if supplier {
            for u in 0..m + n {
                if comp[u] == comp[i] {
                    in_tree[u] = true;
                }
            }
        } else {
            in_tree[m + j] = true;
            leaf[j] = true;
        }
        tree.push((i, j));
        added.push((i, j));
    }

    for x in alloc.iter_mut().flatten() {
        x.epsilon = 0.0;
    }
    for ((i, j), flow) in epsilon_flows(m, n, &tree) {
        alloc[i][j].epsilon = flow;
    }

    if !added.is_empty() {
        log::debug!("Degenerate basis completed with {:?}", added);
    }
    log::trace!("Perturbed plan {:?}", alloc);

    (alloc, added)
}

#[cfg(test)]
mod tests {
    use super::{basis_cells, complete_basis, perturb};
    use crate::epsilon::EpsilonValue;
    use crate::transport::to_epsilon_allocation;

    /// Assert that the row and column sums are the perturbed supplies and demands.
    fn assert_perturbed(alloc: &[Vec<EpsilonValue>], supplies: &[f64], demands: &[f64]) {
        let (a, b) = perturb(supplies, demands);
        for (i, row) in alloc.iter().enumerate() {
            assert_eq!(row.iter().copied().sum::<EpsilonValue>(), a[i], "row {}", i);
        }
        for j in 0..demands.len() {
            assert_eq!(alloc.iter().map(|row| row[j]).sum::<EpsilonValue>(), b[j], "column {}", j);
        }
        assert!(alloc.iter().flatten().all(|&x| x >= EpsilonValue::default()));
        assert_eq!(basis_cells(alloc).len(), supplies.len() + demands.len() - 1);
    }

    #[test]
    fn test_basis_cells() {
        let mut alloc = to_epsilon_allocation(&[vec![0.0, 31.0], vec![22.0, 0.0]]);
        alloc[1][1] = EpsilonValue::epsilon(-1.0);
        assert_eq!(basis_cells(&alloc), vec![(0, 1), (1, 0), (1, 1)]);
    }

    #[test]
    fn test_perturb() {
        let (a, b) = perturb(&[3.0, 4.0], &[2.0, 1.0, 4.0]);
        assert_eq!(a, vec![EpsilonValue::new(3.0, 3.0), EpsilonValue::new(4.0, 3.0)]);
        assert_eq!(
            b,
            vec![EpsilonValue::new(2.0, 1.0), EpsilonValue::new(1.0, 1.0), EpsilonValue::new(4.0, 4.0)]
        );
    }

    #[test]
    fn test_non_degenerate() {
        let costs = vec![vec![1.0, 2.0], vec![3.0, 4.0]];
        let alloc = to_epsilon_allocation(&[vec![5.0, 2.0], vec![0.0, 4.0]]);
        let (completed, added) = complete_basis(&costs, &alloc);
        assert!(added.is_empty());
        assert_eq!(
            completed,
            vec![
                vec![EpsilonValue::new(5.0, 1.0), EpsilonValue::new(2.0, 1.0)],
                vec![EpsilonValue::default(), EpsilonValue::new(4.0, 2.0)],
            ]
        );
        assert_perturbed(&completed, &[7.0, 4.0], &[5.0, 6.0]);
    }

    #[test]
    fn test_degenerate() {
        // Vogel's solution of a problem with a dummy consumer.
        let costs = vec![
            vec![10.0, 7.0, 6.0, 8.0, 0.0],
            vec![5.0, 6.0, 5.0, 4.0, 0.0],
            vec![8.0, 7.0, 6.0, 7.0, 0.0],
        ];
        let alloc = to_epsilon_allocation(&[
            vec![0.0, 20.0, 40.0, 0.0, 10.0],
            vec![0.0, 0.0, 0.0, 20.0, 0.0],
            vec![60.0, 20.0, 0.0, 0.0, 0.0],
        ]);
        let (completed, added) = complete_basis(&costs, &alloc);
        assert_eq!(added, vec![(1, 4)]);
        assert_eq!(completed[1][4], EpsilonValue::epsilon(4.0));
        assert_eq!(completed[0][1], EpsilonValue::new(20.0, -3.0));
        assert_perturbed(&completed, &[70.0, 20.0, 80.0], &[60.0, 40.0, 40.0, 20.0, 10.0]);
    }

    #[test]
    fn test_empty_plan() {
        let costs = vec![vec![2.0, 1.0], vec![1.0, 3.0]];
        let alloc = to_epsilon_allocation(&[vec![0.0, 0.0], vec![0.0, 0.0]]);
        let (completed, added) = complete_basis(&costs, &alloc);
        // (1,0) is never allowed: consumer 0 joins as a leaf first
        assert_eq!(added, vec![(0, 1), (0, 0), (1, 1)]);
        assert_eq!(completed[1][0], EpsilonValue::default());
        assert_eq!(completed[1][1], EpsilonValue::epsilon(2.0));
        assert_perturbed(&completed, &[0.0, 0.0], &[0.0, 0.0]);
    }

    #[test]
    fn test_cycle() {
        let costs = vec![vec![1.0, 1.0], vec![1.0, 1.0]];
        let alloc = to_epsilon_allocation(&[vec![1.0, 2.0], vec![3.0, 4.0]]);
        let (completed, added) = complete_basis(&costs, &alloc);
        assert!(added.is_empty());
        assert_eq!(completed, alloc);
    }
}
