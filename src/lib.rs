// Copyright (c) 2022 Frank Fischer <frank-fischer@shadow-soft.de>
//
// This program is free software: you can redistribute it and/or
// modify it under the terms of the GNU General Public License as
// published by the Free Software Foundation, either version 3 of the
// License, or (at your option) any later version.
//
// This program is distributed in the hope that it will be useful, but
// WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the GNU
// General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program.  If not, see  <http://www.gnu.org/licenses/>
//

#![forbid(unsafe_code)]

//! Step-by-step algorithms for transportation and assignment problems.
//!
//! Every algorithm returns the complete sequence of its intermediate states
//! instead of only the final answer, so that each table of a hand
//! computation can be reconstructed.
//!
//! - [`transport`]: balancing, Vogel's approximation method and the method
//!   of potentials (MODI) with `ε`-perturbation of degenerate plans,
//! - [`assignment`]: two versions of the Hungarian method,
//! - [`epsilon`]: values `a + bε` with an infinitesimal `ε`.
//!
//! The library does not install a logger. Decisions are reported via the
//! [`log`](https://docs.rs/log) facade.

pub mod epsilon;
pub use self::epsilon::EpsilonValue;

// # Algorithms

pub mod assignment;
pub mod transport;

pub use self::assignment::{hungarian_graph_steps, hungarian_marking_steps};
pub use self::transport::{balance, potentials_steps, solve_transport, vogel_steps};
