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

use rs_transport::assignment::{self, GraphStep, MarkingStep};
use rs_transport::transport::{solve_transport, PotentialsState, TransportTrace};
use std::error::Error;
use std::fmt::Debug;
use std::result::Result;

use rustop::opts;

fn print_matrix<T: Debug>(m: &[Vec<T>]) {
    for row in m {
        println!("    {:?}", row);
    }
}

fn print_transport(trace: &TransportTrace) {
    let p = &trace.problem;
    println!("Suppliers           : {}", p.supplies.len());
    println!("Consumers           : {}", p.demands.len());
    println!("Dummy supplier      : {}", p.added_supplier);
    println!("Dummy consumer      : {}", p.added_consumer);

    println!();
    println!("Vogel's approximation method");
    for step in &trace.vam {
        println!(
            "  {:>3}: {:?} penalty {} -> ship {} to {:?}, cost {}",
            step.index, step.line, step.penalty, step.placed, step.cell, step.total_cost
        );
    }
    if !trace.perturbed.is_empty() {
        println!("  basis completed with {:?}", trace.perturbed);
    }

    println!();
    println!("Method of potentials");
    for (k, s) in trace.potentials.iter().enumerate() {
        println!("  iteration {}: {:?}, cost {}", k + 1, s.state(), s.total_cost_before);
        println!("    u = {:?}", s.u);
        println!("    v = {:?}", s.v);
        if let Some(pivot) = &s.pivot {
            let cycle: Vec<String> = pivot.cycle.iter().map(|(c, sign)| format!("{:?}{:?}", c, sign)).collect();
            println!("    entering {:?}, θ = {}, cycle {}", s.entering, pivot.theta, cycle.join(" "));
        }
    }

    println!();
    match trace.potentials.last().map(|s| s.state()) {
        Some(PotentialsState::Stuck) => println!("Solution state      : stuck (degenerate basis)"),
        Some(PotentialsState::Improved) => println!("Solution state      : iteration limit reached"),
        _ => println!("Solution state      : optimal"),
    }
    println!("Plan:");
    let plan: Vec<Vec<String>> = trace
        .final_allocation()
        .iter()
        .map(|row| row.iter().map(|x| x.to_string()).collect())
        .collect();
    print_matrix(&plan);
}

fn print_hungarian(costs: &[Vec<i64>], marking: bool) {
    if marking {
        let steps = assignment::hungarian_marking_steps(costs);
        for step in &steps {
            match step {
                MarkingStep::Reduction { kind, minima, .. } => println!("  reduce {:?} by {:?}", kind, minima),
                MarkingStep::InitialZeros { .. } => println!("  initial independent zeros"),
                MarkingStep::MarkColumns { independent, .. } => println!("  A0: {} independent zeros", independent),
                MarkingStep::Transfer { cell, column, .. } => println!("  A1: {:?} dependent, column {} -> row", cell, column),
                MarkingStep::ChainStart { cell, .. } => println!("  A1: chain starts at {:?}", cell),
                MarkingStep::Exchange { chain, .. } => println!("  A2: exchange along {:?}", chain),
                MarkingStep::Modify { h, matrix, .. } => {
                    println!("  A3: h = {}", h);
                    print_matrix(matrix);
                }
                MarkingStep::Done(sol) => println!("Assignment {:?} with cost {}", sol.assignment, sol.total),
            }
        }
    } else {
        let steps = assignment::hungarian_graph_steps(costs);
        for step in &steps {
            match step {
                GraphStep::Reduction { kind, minima, .. } => println!("  reduce {:?} by {:?}", kind, minima),
                GraphStep::ZeroGraph { edges } => println!("  zero graph with {} edges", edges.len()),
                GraphStep::Matching { matching } => println!("  initial matching {:?}", matching),
                GraphStep::Search { root, path_end, .. } => println!("  search from row {}: {:?}", root, path_end),
                GraphStep::Augment { path, .. } => println!("  augment along {:?}", path),
                GraphStep::Modify { h, matrix, .. } => {
                    println!("  modify by h = {}", h);
                    print_matrix(matrix);
                }
                GraphStep::Done(sol) => println!("Assignment {:?} with cost {}", sol.assignment, sol.total),
            }
        }
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    let (args, _) = opts! {
        synopsis "Print the steps of transportation and assignment algorithms.";
        opt hungarian:bool, desc:"Solve the default assignment problem";
        opt marking:bool, desc:"Use the marking version of the Hungarian method";
        opt unbalanced:bool, desc:"Use the unbalanced transportation problem";
    }
    .parse_or_exit();

    if args.hungarian || args.marking {
        let costs = vec![
            vec![5, 7, 6, 9, 5],
            vec![8, 7, 6, 2, 7],
            vec![8, 9, 13, 10, 10],
            vec![5, 7, 6, 7, 9],
            vec![6, 7, 8, 5, 9],
        ];
        print_hungarian(&costs, args.marking);
        return Ok(());
    }

    let costs = vec![
        vec![10.0, 7.0, 6.0, 8.0],
        vec![5.0, 6.0, 5.0, 4.0],
        vec![8.0, 7.0, 6.0, 7.0],
    ];
    let trace = if args.unbalanced {
        solve_transport(&costs, &[70.0, 20.0, 80.0], &[60.0, 40.0, 40.0, 20.0])
    } else {
        solve_transport(&costs, &[31.0, 48.0, 38.0], &[22.0, 34.0, 41.0, 20.0])
    };
    print_transport(&trace);

    Ok(())
}
