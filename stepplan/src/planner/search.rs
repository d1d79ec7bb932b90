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

use crate::{
    algorithm::{SearchStatus, Solvable},
    planner::halt::Halt,
};
use anyhow;

/// Search manages the progress of one planning run.
///
/// A terminal outcome is latched: once a step has returned anything other
/// than [`SearchStatus::Incomplete`], every further call to [`Search::step`]
/// or [`Search::solve`] is a no-op that repeats the same status without
/// touching the algorithm or its memory.
pub struct Search<Algo: Solvable<Goal>, Goal, Halting> {
    /// Storage container for the progress of the search algorithm
    memory: Algo::Memory,

    /// The object which determines the search pattern
    algorithm: Algo,

    /// The goal that the search is trying to reach
    goal: Goal,

    /// The options that moderate the progress of the solving
    halting: Halting,

    /// The terminal status of the run, once one has been reached
    terminal: Option<SearchStatus<Algo::Solution>>,
}

impl<Algo: Solvable<Goal>, Goal, Halting> Search<Algo, Goal, Halting> {
    pub fn new(memory: Algo::Memory, algorithm: Algo, goal: Goal, halting: Halting) -> Self {
        Self {
            memory,
            algorithm,
            goal,
            halting,
            terminal: None,
        }
    }

    /// Attempt to solve the problem. This runs [`Search::step`] until a
    /// solution is found, the halting behavior interrupts the effort, or the
    /// algorithm determines that the problem cannot be solved.
    pub fn solve(&mut self) -> Result<SearchStatus<Algo::Solution>, Algo::StepError>
    where
        Algo::Solution: Clone,
        Halting: Halt<Algo::Memory>,
    {
        loop {
            if self.halting.halt(&self.memory) {
                return Ok(SearchStatus::Incomplete);
            }

            let status = self.step()?;
            if let SearchStatus::Incomplete = status {
                continue;
            }

            return Ok(status);
        }
    }

    /// Advance the run by a single bounded unit of work.
    pub fn step(&mut self) -> Result<SearchStatus<Algo::Solution>, Algo::StepError>
    where
        Algo::Solution: Clone,
    {
        if let Some(status) = &self.terminal {
            return Ok(status.clone());
        }

        let status = self.algorithm.step(&mut self.memory, &self.goal)?;
        if status.terminal() {
            self.terminal = Some(status.clone());
        }

        Ok(status)
    }

    /// Whether the run has reached a terminal state.
    pub fn finished(&self) -> bool {
        self.terminal.is_some()
    }

    pub fn memory(&self) -> &Algo::Memory {
        &self.memory
    }

    pub fn memory_mut(&mut self) -> &mut Algo::Memory {
        &mut self.memory
    }

    pub fn algorithm(&self) -> &Algo {
        &self.algorithm
    }

    pub fn goal(&self) -> &Goal {
        &self.goal
    }

    /// Change the halting behavior for this search.
    pub fn with_halting<NewHalt>(self, halting: NewHalt) -> Search<Algo, Goal, NewHalt> {
        Search {
            memory: self.memory,
            algorithm: self.algorithm,
            goal: self.goal,
            halting,
            terminal: self.terminal,
        }
    }
}

/// The interface of a search whose algorithm has been abstracted away.
pub trait Interface<Solution> {
    fn solve(&mut self) -> anyhow::Result<SearchStatus<Solution>>;

    fn step(&mut self) -> anyhow::Result<SearchStatus<Solution>>;
}

impl<A, G, H> Interface<A::Solution> for Search<A, G, H>
where
    A: Solvable<G>,
    A::Solution: Clone,
    A::StepError: std::error::Error + Send + Sync + 'static,
    H: Halt<A::Memory>,
{
    fn solve(&mut self) -> anyhow::Result<SearchStatus<A::Solution>> {
        Search::solve(self).map_err(anyhow::Error::new)
    }

    fn step(&mut self) -> anyhow::Result<SearchStatus<A::Solution>> {
        Search::step(self).map_err(anyhow::Error::new)
    }
}

/// A search with its algorithm hidden behind [`Interface`]. This is useful
/// for a driver that keeps a collection of searches which produce the same
/// kind of solution but run different algorithms, e.g. a visualizer that lets
/// the user pick between best-first and sampling-based planning.
pub struct AbstractSearch<Solution> {
    implementation: Box<dyn Interface<Solution>>,
}

impl<A, G, H> From<Search<A, G, H>> for AbstractSearch<A::Solution>
where
    A: Solvable<G> + 'static,
    A::Solution: Clone,
    A::StepError: std::error::Error + Send + Sync + 'static,
    H: Halt<A::Memory> + 'static,
    G: 'static,
{
    fn from(value: Search<A, G, H>) -> Self {
        AbstractSearch {
            implementation: Box::new(value),
        }
    }
}

impl<Solution> Interface<Solution> for AbstractSearch<Solution> {
    fn solve(&mut self) -> anyhow::Result<SearchStatus<Solution>> {
        self.implementation.solve()
    }

    fn step(&mut self) -> anyhow::Result<SearchStatus<Solution>> {
        self.implementation.step()
    }
}
