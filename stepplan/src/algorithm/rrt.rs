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

use crate::{
    algorithm::{
        tree::{Tree, TreeError},
        Algorithm, Coherent, Measure, Path, SearchStatus, Solvable,
    },
    error::ThisError,
    space::{check_endpoints, PreconditionError, SampledSpace, StateSpace},
};
use log::debug;

const VAR_VISITED: &str = "visited";

/// The parameters of an RRT search, fixed when the algorithm is constructed.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RrtConfig {
    /// How many vertices the tree may grow, beyond the root, before the
    /// search gives up. Spending this budget is a soft failure: it does not
    /// prove that no path exists.
    pub max_vertices: usize,
    /// The steering step size: the farthest the tree will extend towards a
    /// sample in one step, and the proximity at which the goal counts as
    /// reached.
    pub delta_q: f64,
}

/// An incremental rapidly-exploring random tree planner over a
/// [`SampledSpace`].
///
/// Each [`Solvable::step`] grows the tree by exactly one vertex: sample a
/// random free node, steer from the nearest existing vertex towards it by at
/// most `delta_q`, and attach the result. Samples whose steered state is
/// occupied or out of bounds are discarded and redrawn within the same step,
/// so the caller-visible step budget only counts successful insertions.
#[derive(Debug, Clone)]
pub struct Rrt<S> {
    space: S,
    config: RrtConfig,
}

impl<S: SampledSpace> Rrt<S> {
    pub fn new(mut space: S, config: RrtConfig) -> Result<Self, RrtConfigError> {
        if config.max_vertices == 0 {
            return Err(RrtConfigError::InvalidBudget(config.max_vertices));
        }
        if !(config.delta_q > 0.0) {
            return Err(RrtConfigError::InvalidStepSize(config.delta_q));
        }

        space.create_variables(&[VAR_VISITED]);
        space.highlight_variable(VAR_VISITED);
        Ok(Self { space, config })
    }

    pub fn space(&self) -> &S {
        &self.space
    }

    pub fn config(&self) -> &RrtConfig {
        &self.config
    }

    /// Take the state space back from this algorithm, ending its runs.
    pub fn into_space(self) -> S {
        self.space
    }

    fn space_err(err: S::Error) -> RrtError<S::Node, S::Error> {
        RrtError::Space(err)
    }

    fn tree_err(err: TreeError) -> RrtError<S::Node, S::Error> {
        RrtError::Tree(err)
    }

    fn reconstruct(
        &mut self,
        memory: &Memory<S::Node>,
        from: usize,
        goal: &S::Node,
    ) -> Result<Path<S::Node>, RrtError<S::Node, S::Error>> {
        let mut nodes = memory.tree.retrace(from).map_err(Self::tree_err)?;
        let mut total_cost: f64 = nodes
            .windows(2)
            .map(|pair| self.space.distance(&pair[0], &pair[1]))
            .sum();

        // The final hop is the goal itself, unless the tree already landed
        // exactly on it.
        let append_goal = match nodes.last() {
            Some(last) if !self.space.same_node(last, goal) => {
                total_cost += self.space.distance(last, goal);
                true
            }
            _ => false,
        };
        if append_goal {
            nodes.push(goal.clone());
        }

        debug!(
            "reached the goal with {} vertices after {} insertions",
            memory.tree.size(),
            memory.iterations,
        );
        self.space.trace_solution(&nodes);
        Ok(Path::new(nodes, total_cost))
    }
}

/// The progress record of one RRT run.
#[derive(Debug, Clone)]
pub struct Memory<N> {
    /// The tree grown so far, rooted at the start.
    pub tree: Tree<N>,
    /// How many vertices have been inserted; always `tree.size() - 1`.
    pub iterations: usize,
}

impl<N> Measure for Memory<N> {
    fn size(&self) -> usize {
        self.tree.size()
    }
}

impl<S: SampledSpace> Algorithm for Rrt<S> {
    type Memory = Memory<S::Node>;
}

impl<S: SampledSpace> Coherent<S::Node, S::Node> for Rrt<S> {
    type InitError = RrtError<S::Node, S::Error>;

    fn initialize(
        &mut self,
        start: S::Node,
        goal: &S::Node,
    ) -> Result<Self::Memory, Self::InitError> {
        // A free start also guarantees that the free subset is nonempty, so
        // rejection sampling in random_node() will terminate.
        check_endpoints(&self.space, &start, goal).map_err(RrtError::Precondition)?;
        self.space.reset_variables();

        debug!("growing a tree from {start:?} towards {goal:?}");

        Ok(Memory {
            tree: Tree::new(start),
            iterations: 0,
        })
    }
}

impl<S: SampledSpace> Solvable<S::Node> for Rrt<S> {
    type Solution = Path<S::Node>;
    type StepError = RrtError<S::Node, S::Error>;

    fn step(
        &mut self,
        memory: &mut Self::Memory,
        goal: &S::Node,
    ) -> Result<SearchStatus<Self::Solution>, Self::StepError> {
        if memory.iterations >= self.config.max_vertices {
            return Ok(SearchStatus::Exhausted);
        }

        // Resample until steering lands on a valid state. This loop stays
        // inside a single step and does not consume the vertex budget.
        let (nearest_id, new_state) = loop {
            let sample = self.space.random_node();
            let nearest_id = memory.tree.nearest(&self.space, &sample);
            let nearest = memory
                .tree
                .get(nearest_id)
                .map_err(Self::tree_err)?
                .state()
                .clone();
            let new_state = self.space.steer(&nearest, &sample, self.config.delta_q);
            if self.space.valid_node(&new_state) {
                break (nearest_id, new_state);
            }
        };

        let new_id = memory
            .tree
            .push_child(new_state.clone(), nearest_id)
            .map_err(Self::tree_err)?;
        self.space
            .set_variable(VAR_VISITED, &new_state, 1.0)
            .map_err(Self::space_err)?;
        memory.iterations += 1;

        if memory.iterations >= self.config.max_vertices {
            debug!(
                "vertex budget of {} spent without reaching the goal",
                self.config.max_vertices,
            );
            return Ok(SearchStatus::Exhausted);
        }

        if self.space.distance(&new_state, goal) < self.config.delta_q {
            let path = self.reconstruct(memory, new_id, goal)?;
            return Ok(SearchStatus::Solved(path));
        }

        Ok(SearchStatus::Incomplete)
    }
}

#[derive(ThisError, Debug, Clone, PartialEq)]
pub enum RrtConfigError {
    #[error("max_vertices must be at least 1, got {0}")]
    InvalidBudget(usize),
    #[error("delta_q must be greater than 0.0, got {0}")]
    InvalidStepSize(f64),
}

#[derive(ThisError, Debug)]
pub enum RrtError<N: std::fmt::Debug, E> {
    #[error("an error occurred in the state space:\n{0}")]
    Space(E),
    #[error("an error occurred in the search tree:\n{0}")]
    Tree(TreeError),
    #[error("the run was requested with unusable endpoints:\n{0}")]
    Precondition(PreconditionError<N>),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        space::{Cell, GridSpace, OccupancyMap, StateSpace},
        trace::RecordingTrace,
    };

    fn assert_tree_invariants<N>(memory: &Memory<N>) {
        assert_eq!(memory.tree.size(), memory.iterations + 1);
        for (id, vertex) in memory.tree.vertices().enumerate() {
            match vertex.parent() {
                None => assert_eq!(id, 0, "only the root may lack a parent"),
                Some(parent) => {
                    assert!(parent < id, "parents must be inserted before children")
                }
            }
        }
    }

    #[test]
    fn test_single_vertex_budget_exhausts_immediately() {
        let space = GridSpace::seeded(OccupancyMap::new(4, 4), 13);
        let mut rrt = Rrt::new(
            space,
            RrtConfig {
                max_vertices: 1,
                delta_q: 1.5,
            },
        )
        .unwrap();
        let goal = Cell::new(3, 3);
        let mut memory = rrt.initialize(Cell::new(0, 0), &goal).unwrap();

        assert!(rrt.step(&mut memory, &goal).unwrap().exhausted());
        assert_eq!(memory.tree.size(), 2);
        assert_tree_invariants(&memory);

        // Exhaustion is sticky and grows nothing further.
        assert!(rrt.step(&mut memory, &goal).unwrap().exhausted());
        assert_eq!(memory.tree.size(), 2);
    }

    #[test]
    fn test_goal_within_reach_succeeds_on_the_first_step() {
        // Every cell of the domain is within delta_q of every other, so the
        // first insertion must finish the search no matter what is sampled.
        let space = GridSpace::seeded(OccupancyMap::new(3, 3), 5);
        let mut rrt = Rrt::new(
            space,
            RrtConfig {
                max_vertices: 50,
                delta_q: 10.0,
            },
        )
        .unwrap();
        let start = Cell::new(0, 0);
        let goal = Cell::new(2, 2);
        let mut memory = rrt.initialize(start, &goal).unwrap();

        let status = rrt.step(&mut memory, &goal).unwrap();
        let path = status.solution().expect("expected a solution");

        assert_eq!(path.start(), Some(&start));
        assert_eq!(path.goal(), Some(&goal));
        assert!(path.nodes.len() == 2 || path.nodes.len() == 3);
        assert_tree_invariants(&memory);
    }

    #[test]
    fn test_tree_invariants_hold_through_a_whole_run() {
        let occupancy = OccupancyMap::new(6, 6).with_occupied([
            Cell::new(2, 2),
            Cell::new(2, 3),
            Cell::new(3, 2),
        ]);
        let space = GridSpace::seeded(occupancy, 21);
        let mut rrt = Rrt::new(
            space,
            RrtConfig {
                max_vertices: 20,
                delta_q: 1.5,
            },
        )
        .unwrap();
        let goal = Cell::new(5, 5);
        let mut memory = rrt.initialize(Cell::new(0, 0), &goal).unwrap();

        for _ in 0..20 {
            let status = rrt.step(&mut memory, &goal).unwrap();
            assert_tree_invariants(&memory);
            for vertex in memory.tree.vertices() {
                assert!(rrt.space().valid_node(vertex.state()));
            }
            if status.terminal() {
                return;
            }
        }
        panic!("search did not terminate within its budget");
    }

    #[test]
    fn test_walled_off_goal_spends_the_whole_budget() {
        // The goal's whole neighbourhood is occupied and delta_q is too small
        // to count any cell beyond the wall as "reached", so the run must
        // end in exhaustion.
        let ring = [
            Cell::new(4, 4),
            Cell::new(4, 5),
            Cell::new(4, 6),
            Cell::new(5, 4),
            Cell::new(5, 6),
            Cell::new(6, 4),
            Cell::new(6, 5),
            Cell::new(6, 6),
        ];
        let occupancy = OccupancyMap::new(7, 7).with_occupied(ring);
        let space = GridSpace::seeded(occupancy, 3);
        let mut rrt = Rrt::new(
            space,
            RrtConfig {
                max_vertices: 10,
                delta_q: 1.0,
            },
        )
        .unwrap();
        let goal = Cell::new(5, 5);
        let mut memory = rrt.initialize(Cell::new(0, 0), &goal).unwrap();

        for _ in 0..9 {
            assert!(rrt.step(&mut memory, &goal).unwrap().incomplete());
        }
        assert!(rrt.step(&mut memory, &goal).unwrap().exhausted());
        assert_eq!(memory.iterations, 10);
        assert_tree_invariants(&memory);
    }

    #[test]
    fn test_degenerate_configs_are_rejected() {
        let config = RrtConfig {
            max_vertices: 0,
            delta_q: 1.0,
        };
        let result = Rrt::new(GridSpace::new(OccupancyMap::new(3, 3)), config);
        assert!(matches!(result, Err(RrtConfigError::InvalidBudget(0))));

        let config = RrtConfig {
            max_vertices: 5,
            delta_q: 0.0,
        };
        let result = Rrt::new(GridSpace::new(OccupancyMap::new(3, 3)), config);
        assert!(matches!(result, Err(RrtConfigError::InvalidStepSize(_))));
    }

    #[test]
    fn test_blocked_start_is_rejected() {
        let occupancy = OccupancyMap::new(3, 3).with_occupied([Cell::new(1, 1)]);
        let mut rrt = Rrt::new(
            GridSpace::seeded(occupancy, 11),
            RrtConfig {
                max_vertices: 5,
                delta_q: 1.0,
            },
        )
        .unwrap();

        match rrt.initialize(Cell::new(1, 1), &Cell::new(2, 2)) {
            Err(RrtError::Precondition(PreconditionError::BlockedStart(cell))) => {
                assert_eq!(cell, Cell::new(1, 1));
            }
            other => panic!("expected a blocked start, got {other:?}"),
        }
    }

    #[test]
    fn test_observer_sees_every_insertion() {
        let space =
            GridSpace::seeded(OccupancyMap::new(5, 5), 17).with_trace(RecordingTrace::default());
        let mut rrt = Rrt::new(
            space,
            RrtConfig {
                max_vertices: 6,
                delta_q: 1.5,
            },
        )
        .unwrap();
        let goal = Cell::new(4, 4);
        let mut memory = rrt.initialize(Cell::new(0, 0), &goal).unwrap();

        let mut steps = 0;
        loop {
            steps += 1;
            if rrt.step(&mut memory, &goal).unwrap().terminal() {
                break;
            }
        }
        assert!(steps <= 6);

        let trace = rrt.into_space().into_trace();
        assert_eq!(trace.updates.len(), memory.iterations);
        assert!(trace.updates.iter().all(|(_, value)| *value == 1.0));
    }
}
