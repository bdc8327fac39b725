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

use rs_transport::assignment::{
    assignment_cost, brute_force, hungarian_graph_steps, hungarian_marking_steps, solution, GraphStep, MarkingStep,
};

struct Lcg(u64);

impl Lcg {
    fn next(&mut self, bound: u64) -> u64 {
        self.0 = self
            .0
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1_442_695_040_888_963_407);
        (self.0 >> 33) % bound
    }

    fn matrix(&mut self, n: usize) -> Vec<Vec<i64>> {
        // small ranges produce many ties and degenerate zero graphs
        let range = [3, 9, 30][self.next(3) as usize];
        (0..n)
            .map(|_| (0..n).map(|_| self.next(range) as i64).collect())
            .collect()
    }
}

fn is_permutation(p: &[usize]) -> bool {
    let mut seen = vec![false; p.len()];
    p.iter().all(|&j| j < p.len() && !std::mem::replace(&mut seen[j], true))
}

#[test]
fn test_default_scenario() {
    let costs = vec![
        vec![5, 7, 6, 9, 5],
        vec![8, 7, 6, 2, 7],
        vec![8, 9, 13, 10, 10],
        vec![5, 7, 6, 7, 9],
        vec![6, 7, 8, 5, 9],
    ];
    let g = hungarian_graph_steps(&costs);
    let m = hungarian_marking_steps(&costs);
    let gsol = solution(&g).unwrap();
    let msol = solution(&m).unwrap();
    assert_eq!(gsol.total, 28);
    assert_eq!(msol.total, 28);
    assert_eq!(gsol.total, brute_force(&costs).0);
}

#[test]
fn test_against_brute_force() {
    let mut rng = Lcg(17);
    for _ in 0..500 {
        let n = 1 + rng.next(4) as usize;
        let costs = rng.matrix(n);
        let (best, _) = brute_force(&costs);

        for sol in vec![
            solution(&hungarian_graph_steps(&costs)).cloned(),
            solution(&hungarian_marking_steps(&costs)).cloned(),
        ] {
            let sol = sol.unwrap();
            assert!(is_permutation(&sol.assignment));
            assert_eq!(sol.total, best);
            assert_eq!(assignment_cost(&costs, &sol.assignment), best);
        }
    }
}

#[test]
fn test_floating_point() {
    let mut rng = Lcg(99);
    for _ in 0..100 {
        let n = 2 + rng.next(3) as usize;
        let costs: Vec<Vec<f64>> = rng
            .matrix(n)
            .into_iter()
            .map(|row| row.into_iter().map(|x| x as f64 * 0.5).collect())
            .collect();
        let (best, _) = brute_force(&costs);
        assert_eq!(solution(&hungarian_graph_steps(&costs)).map(|s| s.total), Some(best));
        assert_eq!(solution(&hungarian_marking_steps(&costs)).map(|s| s.total), Some(best));
    }
}

#[test]
fn test_reductions_first() {
    let mut rng = Lcg(5);
    let costs = rng.matrix(4);

    let g = hungarian_graph_steps(&costs);
    assert!(matches!(g[0], GraphStep::Reduction { .. }));
    assert!(matches!(g[1], GraphStep::Reduction { .. }));

    let m = hungarian_marking_steps(&costs);
    assert!(matches!(m[0], MarkingStep::Reduction { .. }));
    assert!(matches!(m[1], MarkingStep::Reduction { .. }));

    // every modification keeps the matrix non-negative
    for s in &g {
        if let GraphStep::Modify { matrix, .. } = s {
            assert!(matrix.iter().flatten().all(|&x| x >= 0));
        }
    }
    for s in &m {
        if let MarkingStep::Modify { matrix, .. } = s {
            assert!(matrix.iter().flatten().all(|&x| x >= 0));
        }
    }
}
