/*
 * Copyright (C) 2024 Open Source Robotics Foundation
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 * You may obtain a copy of the License at
 *
 *     http://www.apache.org/licenses/LICENSE-2.0
 *
 * Unless required by applicable law or agreed to in writing, software
 * distributed under the License is distributed on an "AS IS" BASIS,
 * WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 * See the License for the specific language governing permissions and
 * limitations under the License.
 *
*/

use crate::error::ThisError;
use smallvec::SmallVec;

pub mod grid;
pub use grid::{Cell, GridSpace, GridSpaceError, OccupancyMap, Point, Vector};

/// A state space is an implicitly defined graph over discrete nodes: it
/// supplies connectivity, a distance metric, and a store of named per-node
/// scalar variables that planners use as scratch space for a run.
///
/// A state space serves at most one planning run at a time. The variable
/// store belongs exclusively to the active run: [`create_variables`] must be
/// called before the first run (and invalidates any prior run's variables),
/// while [`reset_variables`] zeroes the fields at the start of each new run
/// on a reused space.
///
/// [`create_variables`]: StateSpace::create_variables
/// [`reset_variables`]: StateSpace::reset_variables
pub trait StateSpace {
    /// Data structure that represents a node (state) within this space.
    /// Equality between nodes is structural, never referential.
    type Node: Clone + std::fmt::Debug;

    /// The error type that this space may produce from its variable store.
    type Error;

    /// Get all nodes reachable from `node` in one hop. The enumeration order
    /// must be deterministic: planners break cost ties by first-seen order.
    fn neighbours(&self, node: &Self::Node) -> SmallVec<[Self::Node; 8]>;

    /// The distance between two nodes. Must be non-negative and symmetric,
    /// and must satisfy the triangle inequality so that it can serve as both
    /// an edge cost and an admissible heuristic.
    fn distance(&self, a: &Self::Node, b: &Self::Node) -> f64;

    /// Check whether two nodes denote the same state.
    fn same_node(&self, a: &Self::Node, b: &Self::Node) -> bool;

    /// Check whether `node` is inside the domain and unoccupied.
    fn valid_node(&self, node: &Self::Node) -> bool;

    /// Allocate a fresh zero-initialized scalar field for each name, sized to
    /// the domain. Any variables from a previous run are discarded.
    fn create_variables(&mut self, names: &[&str]);

    /// Zero all allocated fields without reallocating them.
    fn reset_variables(&mut self);

    /// Read the value of the named variable at `node`.
    fn get_variable(&self, name: &str, node: &Self::Node) -> Result<f64, Self::Error>;

    /// Write the value of the named variable at `node`. Writes to the
    /// designated highlight variable are additionally reported to the
    /// space's observer, if it has one.
    fn set_variable(&mut self, name: &str, node: &Self::Node, value: f64)
        -> Result<(), Self::Error>;

    /// Designate the variable whose writes should be reported to an observer.
    fn highlight_variable(&mut self, _name: &str) {}

    /// Report a finished path, ordered from start to goal, to an observer.
    fn trace_solution(&mut self, _path: &[Self::Node]) {}
}

/// The additional capabilities a sampling-based planner needs from a state
/// space: drawing uniform random free nodes and steering between states.
pub trait SampledSpace: StateSpace {
    /// Sample a node uniformly from the free subset of the domain, by
    /// rejection: draw over the full domain, resample while occupied.
    ///
    /// The free subset must be nonempty or this will never return. Planners
    /// guarantee that by validating their start node before sampling.
    fn random_node(&mut self) -> Self::Node;

    /// Move from `from` towards `towards` by at most `delta_q`: if the
    /// distance between them exceeds `delta_q`, advance `delta_q` along the
    /// unit direction vector; otherwise arrive at `towards` exactly. The
    /// result is snapped to a domain coordinate and may be occupied or out of
    /// bounds; callers are responsible for validating it.
    fn steer(&self, from: &Self::Node, towards: &Self::Node, delta_q: f64) -> Self::Node;
}

/// A planning run was requested with an endpoint that the domain provider
/// should never have produced.
#[derive(ThisError, Debug, Clone, PartialEq, Eq)]
pub enum PreconditionError<N: std::fmt::Debug> {
    #[error("start node {0:?} is occupied or out of bounds")]
    BlockedStart(N),
    #[error("goal node {0:?} is occupied or out of bounds")]
    BlockedGoal(N),
}

/// Validate the endpoints of a planning run before it begins.
pub(crate) fn check_endpoints<S: StateSpace>(
    space: &S,
    start: &S::Node,
    goal: &S::Node,
) -> Result<(), PreconditionError<S::Node>> {
    if !space.valid_node(start) {
        return Err(PreconditionError::BlockedStart(start.clone()));
    }

    if !space.valid_node(goal) {
        return Err(PreconditionError::BlockedGoal(goal.clone()));
    }

    Ok(())
}
