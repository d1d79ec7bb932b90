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
        Algorithm, Coherent, Measure, Path, QueueLength, SearchStatus, Solvable,
    },
    error::ThisError,
    space::{check_endpoints, PreconditionError, StateSpace},
};
use log::debug;
use std::{collections::HashMap, hash::Hash};

const VAR_G: &str = "g";
const VAR_H: &str = "h";
const VAR_F: &str = "f";
const VAR_CHECKED: &str = "checked";

/// An incremental best-first search over a [`StateSpace`].
///
/// The algorithm takes exclusive ownership of its state space: the space's
/// per-node variables ("g", "h", "f", "checked") are the scratch storage of
/// the active run. Each [`Solvable::step`] performs exactly one expansion
/// (select the pending node with the lowest "f", remove it, and either finish
/// or discover its neighbours), so a caller can pause after any step and
/// resume later.
///
/// Ties on "f" are broken in favor of the node encountered first while
/// scanning the open set, which is deterministic because the space's
/// neighbour enumeration order is.
#[derive(Debug, Clone)]
pub struct AStar<S> {
    space: S,
}

impl<S: StateSpace> AStar<S> {
    pub fn new(mut space: S) -> Self {
        space.create_variables(&[VAR_G, VAR_H, VAR_F, VAR_CHECKED]);
        space.highlight_variable(VAR_G);
        Self { space }
    }

    pub fn space(&self) -> &S {
        &self.space
    }

    /// Take the state space back from this algorithm, ending its runs.
    pub fn into_space(self) -> S {
        self.space
    }

    fn space_err(err: S::Error) -> AStarError<S::Node, S::Error> {
        AStarError::Space(err)
    }

    fn tree_err(err: TreeError) -> AStarError<S::Node, S::Error> {
        AStarError::Tree(err)
    }

    /// Write the cost variables of a node, keeping `f = g + h`.
    fn set_costs(
        &mut self,
        node: &S::Node,
        g: f64,
        h: f64,
    ) -> Result<(), AStarError<S::Node, S::Error>> {
        self.space
            .set_variable(VAR_G, node, g)
            .map_err(Self::space_err)?;
        self.space
            .set_variable(VAR_F, node, g + h)
            .map_err(Self::space_err)?;
        Ok(())
    }

    /// Select and remove the open node with the lowest "f", finishing the
    /// search if the open set is empty or the selection is the goal.
    fn choose_top(
        &mut self,
        memory: &mut Memory<S::Node>,
        goal: &S::Node,
    ) -> Result<Flow<(usize, S::Node), S::Node>, AStarError<S::Node, S::Error>> {
        let mut best_position = None;
        let mut best_f = 0.0;
        for (position, id) in memory.open.iter().enumerate() {
            let state = memory.tree.get(*id).map_err(Self::tree_err)?.state();
            let f = self
                .space
                .get_variable(VAR_F, state)
                .map_err(Self::space_err)?;
            if best_position.is_none() || f < best_f {
                best_position = Some(position);
                best_f = f;
            }
        }

        let Some(position) = best_position else {
            debug!("open set exhausted after {} expansions: no path", memory.iterations);
            return Ok(Flow::Return(SearchStatus::Impossible));
        };

        // Order-preserving removal; swapping the tail in would perturb the
        // first-encountered tie-break of later scans.
        let top_id = memory.open.remove(position);
        let top = memory
            .tree
            .get(top_id)
            .map_err(Self::tree_err)?
            .state()
            .clone();

        if self.space.same_node(&top, goal) {
            let path = self.reconstruct(memory, top_id, goal)?;
            return Ok(Flow::Return(SearchStatus::Solved(path)));
        }

        Ok(Flow::Proceed((top_id, top)))
    }

    /// Discover or relax every neighbour of a freshly expanded node.
    fn expand_from(
        &mut self,
        memory: &mut Memory<S::Node>,
        parent_id: usize,
        parent: &S::Node,
        goal: &S::Node,
    ) -> Result<(), AStarError<S::Node, S::Error>>
    where
        S::Node: Eq + Hash,
    {
        let parent_g = self
            .space
            .get_variable(VAR_G, parent)
            .map_err(Self::space_err)?;

        for neighbour in self.space.neighbours(parent) {
            let tentative_g = parent_g + self.space.distance(parent, &neighbour);

            let checked = self
                .space
                .get_variable(VAR_CHECKED, &neighbour)
                .map_err(Self::space_err)?;
            if checked == 0.0 {
                self.space
                    .set_variable(VAR_CHECKED, &neighbour, 1.0)
                    .map_err(Self::space_err)?;
                let h = self.space.distance(&neighbour, goal);
                self.space
                    .set_variable(VAR_H, &neighbour, h)
                    .map_err(Self::space_err)?;
                self.set_costs(&neighbour, tentative_g, h)?;

                let id = memory
                    .tree
                    .push_child(neighbour.clone(), parent_id)
                    .map_err(Self::tree_err)?;
                memory.open.push(id);
                memory.index.insert(neighbour, id);
            } else {
                let prior_g = self
                    .space
                    .get_variable(VAR_G, &neighbour)
                    .map_err(Self::space_err)?;
                if tentative_g < prior_g {
                    let h = self
                        .space
                        .get_variable(VAR_H, &neighbour)
                        .map_err(Self::space_err)?;
                    self.set_costs(&neighbour, tentative_g, h)?;

                    // Every checked node has a vertex in the arena, so the
                    // parent record follows the improved cost.
                    if let Some(id) = memory.index.get(&neighbour) {
                        memory
                            .tree
                            .reparent(*id, parent_id)
                            .map_err(Self::tree_err)?;
                    }
                }
            }
        }

        Ok(())
    }

    fn reconstruct(
        &mut self,
        memory: &Memory<S::Node>,
        goal_id: usize,
        goal: &S::Node,
    ) -> Result<Path<S::Node>, AStarError<S::Node, S::Error>> {
        let nodes = memory.tree.retrace(goal_id).map_err(Self::tree_err)?;
        let total_cost = self
            .space
            .get_variable(VAR_G, goal)
            .map_err(Self::space_err)?;

        debug!(
            "found a path of {} nodes with cost {total_cost} after {} expansions",
            nodes.len(),
            memory.iterations,
        );
        self.space.trace_solution(&nodes);
        Ok(Path::new(nodes, total_cost))
    }
}

/// The progress record of one A* run.
#[derive(Debug, Clone)]
pub struct Memory<N> {
    /// Arena indices of the nodes that have been discovered but not yet
    /// expanded. Unordered; the scan in each step finds the minimum "f".
    pub open: Vec<usize>,
    /// Parent records of every discovered node, rooted at the start.
    pub tree: Tree<N>,
    /// Node to arena index, for relaxing nodes that are already discovered.
    pub index: HashMap<N, usize>,
    /// How many steps this run has performed.
    pub iterations: usize,
}

impl<N> Measure for Memory<N> {
    fn size(&self) -> usize {
        self.tree.size()
    }
}

impl<N> QueueLength for Memory<N> {
    fn queue_length(&self) -> usize {
        self.open.len()
    }
}

impl<S: StateSpace> Algorithm for AStar<S> {
    type Memory = Memory<S::Node>;
}

impl<S: StateSpace> Coherent<S::Node, S::Node> for AStar<S>
where
    S::Node: Eq + Hash,
{
    type InitError = AStarError<S::Node, S::Error>;

    fn initialize(
        &mut self,
        start: S::Node,
        goal: &S::Node,
    ) -> Result<Self::Memory, Self::InitError> {
        check_endpoints(&self.space, &start, goal).map_err(AStarError::Precondition)?;
        self.space.reset_variables();

        debug!("starting a search from {start:?} to {goal:?}");

        let h = self.space.distance(&start, goal);
        self.space
            .set_variable(VAR_H, &start, h)
            .map_err(Self::space_err)?;
        self.set_costs(&start, 0.0, h)?;
        // The start is already discovered; without this it could re-enter the
        // open set as a neighbour of its own neighbours.
        self.space
            .set_variable(VAR_CHECKED, &start, 1.0)
            .map_err(Self::space_err)?;

        let tree = Tree::new(start.clone());
        let mut index = HashMap::new();
        index.insert(start, 0);

        Ok(Memory {
            open: vec![0],
            tree,
            index,
            iterations: 0,
        })
    }
}

impl<S: StateSpace> Solvable<S::Node> for AStar<S>
where
    S::Node: Eq + Hash,
{
    type Solution = Path<S::Node>;
    type StepError = AStarError<S::Node, S::Error>;

    fn step(
        &mut self,
        memory: &mut Self::Memory,
        goal: &S::Node,
    ) -> Result<SearchStatus<Self::Solution>, Self::StepError> {
        memory.iterations += 1;

        let (top_id, top) = match self.choose_top(memory, goal)? {
            Flow::Proceed(r) => r,
            Flow::Return(r) => return Ok(r),
        };

        self.expand_from(memory, top_id, &top, goal)?;

        Ok(SearchStatus::Incomplete)
    }
}

#[derive(ThisError, Debug)]
pub enum AStarError<N: std::fmt::Debug, E> {
    #[error("an error occurred in the state space:\n{0}")]
    Space(E),
    #[error("an error occurred in the search tree:\n{0}")]
    Tree(TreeError),
    #[error("the run was requested with unusable endpoints:\n{0}")]
    Precondition(PreconditionError<N>),
}

/// Control flow return value for the functions that constitute step().
enum Flow<T, N> {
    Proceed(T),
    Return(SearchStatus<Path<N>>),
}
