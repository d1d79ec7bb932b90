/*
 * Copyright (C) 2023 Open Source Robotics Foundation
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

pub mod a_star;
pub use a_star::AStar;

pub mod rrt;
pub use rrt::{Rrt, RrtConfig};

pub mod tree;

pub mod path;
pub use path::Path;

/// The status of a search after a step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchStatus<Solution> {
    /// The search made progress but has not terminated yet.
    Incomplete,
    /// The search proved that no solution exists.
    Impossible,
    /// The search spent its whole budget without finding a solution. Unlike
    /// [`SearchStatus::Impossible`] this is not a proof of infeasibility.
    Exhausted,
    /// The search found a solution.
    Solved(Solution),
}

impl<S> SearchStatus<S> {
    pub fn incomplete(&self) -> bool {
        matches!(self, SearchStatus::Incomplete)
    }

    pub fn impossible(&self) -> bool {
        matches!(self, SearchStatus::Impossible)
    }

    pub fn exhausted(&self) -> bool {
        matches!(self, SearchStatus::Exhausted)
    }

    pub fn solved(&self) -> bool {
        matches!(self, SearchStatus::Solved(_))
    }

    /// Whether the search has reached a terminal state.
    pub fn terminal(&self) -> bool {
        !self.incomplete()
    }

    pub fn solution(self) -> Option<S> {
        match self {
            Self::Solved(solution) => Some(solution),
            _ => None,
        }
    }

    /// If the status contains a solution, apply a function to that solution.
    pub fn map<U, F: FnOnce(S) -> U>(self, op: F) -> SearchStatus<U> {
        match self {
            SearchStatus::Solved(solution) => SearchStatus::Solved(op(solution)),
            SearchStatus::Incomplete => SearchStatus::Incomplete,
            SearchStatus::Impossible => SearchStatus::Impossible,
            SearchStatus::Exhausted => SearchStatus::Exhausted,
        }
    }
}

impl<S> From<S> for SearchStatus<S> {
    fn from(value: S) -> Self {
        SearchStatus::Solved(value)
    }
}

/// The basic structure every planning algorithm shares.
///
/// Algorithms in this crate own their state space for the duration of their
/// runs, which is why [`Coherent::initialize`] and [`Solvable::step`] take
/// `&mut self`: the space's per-run variable store (and, for sampling-based
/// algorithms, its random source) belongs to the active run.
pub trait Algorithm {
    /// The `Memory` type tracks the progress of each search.
    type Memory;
}

/// The `Coherent` trait determines when user input is coherent (usable) for
/// the algorithm. An algorithm may support multiple (Start, Goal)
/// combinations, so this trait can be implemented for any combination the
/// algorithm is able to solve for.
pub trait Coherent<Start, Goal>: Algorithm {
    type InitError;

    /// Begin a new run. Any previous run's scratch state in the underlying
    /// state space is reset.
    fn initialize(&mut self, start: Start, goal: &Goal) -> Result<Self::Memory, Self::InitError>;
}

/// An algorithm that can make incremental progress towards a goal.
pub trait Solvable<Goal>: Algorithm {
    /// The `Solution` type is what the algorithm will return once it has
    /// found a valid solution.
    type Solution;

    /// A `StepError` will be returned when an issue is encountered during a
    /// step of the algorithm.
    type StepError;

    /// Take one step in the search. The same memory instance must be passed
    /// in with each iteration of the same run.
    fn step(
        &mut self,
        memory: &mut Self::Memory,
        goal: &Goal,
    ) -> Result<SearchStatus<Self::Solution>, Self::StepError>;
}

/// The `Measure` trait can be implemented by `Algorithm::Memory` types to
/// provide an indication of how large their current memory footprint or level
/// of effort is. This may be used to halt search efforts that have grown
/// excessively large.
pub trait Measure {
    /// How "big" is the current memory footprint or level of effort. The
    /// exact meaning of this value may vary between algorithms.
    fn size(&self) -> usize;
}

/// Implemented by `Algorithm::Memory` types whose frontier has a meaningful
/// length, e.g. the number of nodes waiting to be expanded.
pub trait QueueLength {
    fn queue_length(&self) -> usize;
}
