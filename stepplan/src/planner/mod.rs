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

pub mod search;
pub use search::{AbstractSearch, Search};

pub mod halt;
pub use halt::Halt;

use crate::algorithm::{Coherent, Solvable};

/// The Planner spawns [`Search`] instances to find plans using its provided
/// algorithm.
///
/// `Planner::plan(start, goal)` begins a run and returns a [`Search`] which
/// manages the run's progress; the caller advances it one step at a time or
/// drives it to completion with `solve`. The Planner can also be given
/// default halting behavior which is handed to every `Search` it spawns.
#[derive(Debug, Clone)]
pub struct Planner<Algo, Halting = ()> {
    /// The object which determines the search pattern
    algorithm: Algo,

    /// The default halting behavior for spawned searches
    default_halting: Halting,
}

impl<Algo> Planner<Algo, ()> {
    /// Construct a new planner that has no halting behavior.
    pub fn new(algorithm: Algo) -> Self {
        Self {
            algorithm,
            default_halting: (),
        }
    }
}

impl<Algo, Halting> Planner<Algo, Halting> {
    pub fn new_haltable(algorithm: Algo, halting: Halting) -> Self {
        Self {
            algorithm,
            default_halting: halting,
        }
    }

    /// Consume this Planner and create a new Planner with a different default
    /// Halting value.
    pub fn with_halting<NewHalting>(self, halting: NewHalting) -> Planner<Algo, NewHalting> {
        Planner {
            algorithm: self.algorithm,
            default_halting: halting,
        }
    }

    pub fn algorithm(&self) -> &Algo {
        &self.algorithm
    }

    /// Begin planning from the start conditions to the goal conditions.
    ///
    /// This requires the Algorithm and Halting to be clonable, because the
    /// spawned search takes its own copy of both. To produce a single search
    /// from an algorithm that cannot be cloned, use [`Planner::into_search`].
    pub fn plan<Start, Goal>(
        &self,
        start: Start,
        goal: Goal,
    ) -> Result<Search<Algo, Goal, Halting>, Algo::InitError>
    where
        Algo: Coherent<Start, Goal> + Solvable<Goal> + Clone,
        Halting: Clone,
    {
        let mut algorithm = self.algorithm.clone();
        let memory = algorithm.initialize(start, &goal)?;

        Ok(Search::new(
            memory,
            algorithm,
            goal,
            self.default_halting.clone(),
        ))
    }

    /// Convert the planner into a single [`Search`] instance. This can be
    /// used for algorithms that don't implement the [`Clone`] trait.
    ///
    /// To produce multiple searches, use [`Planner::plan`] instead.
    pub fn into_search<Start, Goal>(
        mut self,
        start: Start,
        goal: Goal,
    ) -> Result<Search<Algo, Goal, Halting>, Algo::InitError>
    where
        Algo: Coherent<Start, Goal> + Solvable<Goal>,
    {
        let memory = self.algorithm.initialize(start, &goal)?;

        Ok(Search::new(memory, self.algorithm, goal, self.default_halting))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        algorithm::{Algorithm, Measure, SearchStatus},
        error::NoError,
        planner::halt::StepLimit,
    };
    use std::sync::Arc;

    struct CountingNode {
        value: u64,
        cost: u64,
        parent: Option<Arc<Self>>,
    }

    #[derive(Debug, Clone, PartialEq)]
    struct CountingSolution {
        cost: u64,
        sequence: Vec<u64>,
    }

    impl From<Arc<CountingNode>> for CountingSolution {
        fn from(value: Arc<CountingNode>) -> Self {
            let cost = value.cost;
            let mut sequence = Vec::new();
            let mut gather = Some(value);
            while let Some(next) = gather {
                sequence.push(next.value);
                gather = next.parent.clone();
            }
            sequence.reverse();

            CountingSolution { cost, sequence }
        }
    }

    struct CountingMemory {
        queue: Vec<Arc<CountingNode>>,
    }

    impl Measure for CountingMemory {
        fn size(&self) -> usize {
            self.queue.len()
        }
    }

    #[derive(Default, Debug, Clone)]
    struct CountingAlgorithm;

    impl Algorithm for CountingAlgorithm {
        type Memory = CountingMemory;
    }

    impl Coherent<u64, u64> for CountingAlgorithm {
        type InitError = NoError;

        fn initialize(&mut self, start: u64, _: &u64) -> Result<Self::Memory, Self::InitError> {
            let queue = vec![Arc::new(CountingNode {
                value: start,
                cost: 0,
                parent: None,
            })];

            Ok(CountingMemory { queue })
        }
    }

    impl Solvable<u64> for CountingAlgorithm {
        type Solution = CountingSolution;
        type StepError = NoError;

        fn step(
            &mut self,
            memory: &mut Self::Memory,
            goal: &u64,
        ) -> Result<SearchStatus<Self::Solution>, Self::StepError> {
            let top = match memory.queue.pop() {
                Some(top) => top,
                None => return Ok(SearchStatus::Impossible),
            };

            if top.value == *goal {
                return Ok(SearchStatus::Solved(top.into()));
            }

            if top.value > *goal {
                return Ok(SearchStatus::Impossible);
            }

            memory.queue.push(Arc::new(CountingNode {
                value: top.value + 1,
                cost: top.cost + 1,
                parent: Some(top),
            }));
            Ok(SearchStatus::Incomplete)
        }
    }

    #[test]
    fn test_plan_solves_to_completion() {
        let planner = Planner::new(CountingAlgorithm);
        let mut search = planner.plan(0u64, 5u64).unwrap();

        let status = search.solve().unwrap();
        let solution = status.solution().expect("expected a solution");
        assert_eq!(solution.sequence, vec![0, 1, 2, 3, 4, 5]);
        assert_eq!(solution.cost, 5);
    }

    #[test]
    fn test_unreachable_goal_is_impossible() {
        let planner = Planner::new(CountingAlgorithm);
        let mut search = planner.into_search(7u64, 5u64).unwrap();

        assert!(search.solve().unwrap().impossible());
    }

    #[test]
    fn test_step_limit_interrupts_solve() {
        let planner = Planner::new_haltable(CountingAlgorithm, StepLimit::new(Some(3)));
        let mut search = planner.plan(0u64, 100u64).unwrap();

        assert!(search.solve().unwrap().incomplete());
        assert_eq!(search.memory().queue.len(), 1);
    }

    #[test]
    fn test_grid_search_through_the_planner() {
        use crate::{
            algorithm::AStar,
            space::{Cell, GridSpace, OccupancyMap},
        };

        let space = GridSpace::new(OccupancyMap::new(5, 5));
        let planner = Planner::new(AStar::new(space));
        let mut search = planner.plan(Cell::new(0, 0), Cell::new(4, 4)).unwrap();

        let status = search.solve().unwrap();
        let path = status.solution().expect("expected a solution");
        assert_eq!(path.nodes.len(), 5);

        assert!(search.finished());
        assert!(search.step().unwrap().solved());
    }

    #[test]
    fn test_abstract_searches_can_mix_algorithms() {
        use crate::{
            algorithm::{AStar, Path, Rrt, RrtConfig},
            planner::search::Interface,
            space::{Cell, GridSpace, OccupancyMap},
        };

        let goal = Cell::new(3, 3);
        let a_star = Planner::new(AStar::new(GridSpace::new(OccupancyMap::new(4, 4))))
            .into_search(Cell::new(0, 0), goal)
            .unwrap();
        let rrt = Planner::new(
            Rrt::new(
                GridSpace::seeded(OccupancyMap::new(4, 4), 41),
                RrtConfig {
                    max_vertices: 60,
                    delta_q: 6.0,
                },
            )
            .unwrap(),
        )
        .into_search(Cell::new(0, 0), goal)
        .unwrap();

        let mut searches: Vec<AbstractSearch<Path<Cell>>> = vec![a_star.into(), rrt.into()];
        for search in &mut searches {
            let status = search.solve().unwrap();
            let path = status.solution().expect("expected a solution");
            assert_eq!(path.goal(), Some(&goal));
        }
    }

    #[test]
    fn test_tree_growth_through_the_planner() {
        use crate::{
            algorithm::{Rrt, RrtConfig},
            space::{Cell, GridSpace, OccupancyMap},
        };

        let space = GridSpace::seeded(OccupancyMap::new(4, 4), 29);
        let rrt = Rrt::new(
            space,
            RrtConfig {
                max_vertices: 40,
                delta_q: 6.0,
            },
        )
        .unwrap();

        let mut search = Planner::new(rrt)
            .into_search(Cell::new(0, 0), Cell::new(3, 3))
            .unwrap();
        let status = search.solve().unwrap();
        let path = status.solution().expect("expected a solution");
        assert_eq!(path.goal(), Some(&Cell::new(3, 3)));
    }

    #[test]
    fn test_terminal_status_is_latched() {
        let planner = Planner::new(CountingAlgorithm);
        let mut search = planner.plan(0u64, 2u64).unwrap();

        let first = search.solve().unwrap();
        assert!(first.solved());

        // Any further stepping is a no-op that repeats the outcome and
        // leaves the memory untouched.
        let queue_len = search.memory().queue.len();
        let again = search.step().unwrap();
        assert_eq!(first, again);
        assert_eq!(search.memory().queue.len(), queue_len);
        assert!(search.solve().unwrap().solved());
    }
}
