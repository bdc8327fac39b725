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

//! Balancing of transportation problems.
//!
//! # Example
//!
//! ```
//! use rs_transport::transport::balance;
//!
//! let costs = vec![vec![1, 2], vec![3, 4]];
//! let p = balance(&costs, &[10, 5], &[4, 3]);
//!
//! assert!(p.added_consumer);
//! assert_eq!(p.demands, vec![4, 3, 8]);
//! assert_eq!(p.costs, vec![vec![1, 2, 0], vec![3, 4, 0]]);
//! ```

use num_traits::Num;

#[cfg(feature = "serialize")]
use serde_derive::{Deserialize, Serialize};

/// A balanced transportation problem.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub struct Balanced<F> {
    pub costs: Vec<Vec<F>>,
    pub supplies: Vec<F>,
    pub demands: Vec<F>,
    /// A dummy supplier (last row) has been added.
    pub added_supplier: bool,
    /// A dummy consumer (last column) has been added.
    pub added_consumer: bool,
}

fn sum<F>(values: &[F]) -> F
where
    F: Num + Copy,
{
    values.iter().fold(F::zero(), |acc, &x| acc + x)
}

/// Balance a transportation problem.
///
/// If the total supply exceeds the total demand, a dummy consumer receiving
/// the surplus is appended, if the total demand exceeds the total supply, a
/// dummy supplier delivering the deficit is appended. Dummy routes have zero
/// cost. A balanced problem is returned unchanged (but copied).
pub fn balance<F>(costs: &[Vec<F>], supplies: &[F], demands: &[F]) -> Balanced<F>
where
    F: Num + PartialOrd + Copy,
{
    let total_supply = sum(supplies);
    let total_demand = sum(demands);

    let mut p = Balanced {
        costs: costs.to_vec(),
        supplies: supplies.to_vec(),
        demands: demands.to_vec(),
        added_supplier: false,
        added_consumer: false,
    };

    if total_supply > total_demand {
        p.demands.push(total_supply - total_demand);
        for row in &mut p.costs {
            row.push(F::zero());
        }
        p.added_consumer = true;
    } else if total_demand > total_supply {
        p.supplies.push(total_demand - total_supply);
        p.costs.push(vec![F::zero(); p.demands.len()]);
        p.added_supplier = true;
    }

    p
}
