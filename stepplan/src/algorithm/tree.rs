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

use crate::{error::ThisError, space::StateSpace};

/// One vertex of a search tree: a state plus the arena index of its parent.
/// Only the root has no parent. Child relationships are implied by the parent
/// links and are not stored.
#[derive(Debug, Clone)]
pub struct Vertex<N> {
    state: N,
    parent: Option<usize>,
}

impl<N> Vertex<N> {
    pub fn state(&self) -> &N {
        &self.state
    }

    pub fn parent(&self) -> Option<usize> {
        self.parent
    }
}

/// A data structure for storing, managing, and growing a rooted search tree.
///
/// Vertices live in a contiguous memory arena and refer to each other by
/// index, so the tree can grow and be rewired during a search without any
/// ownership cycles. The arena is append-only: a vertex can only be attached
/// to a parent that already exists, which keeps the structure connected and
/// acyclic by construction.
#[derive(Debug, Clone)]
pub struct Tree<N> {
    arena: Vec<Vertex<N>>,
}

impl<N> Tree<N> {
    /// Create a new tree containing only the given root state.
    pub fn new(root: N) -> Self {
        Self {
            arena: vec![Vertex {
                state: root,
                parent: None,
            }],
        }
    }

    /// Attach a new vertex under an existing parent. Returns the index of the
    /// new vertex.
    pub fn push_child(&mut self, state: N, parent: usize) -> Result<usize, TreeError> {
        if parent >= self.arena.len() {
            return Err(TreeError::BrokenReference(parent));
        }

        let id = self.arena.len();
        self.arena.push(Vertex {
            state,
            parent: Some(parent),
        });
        Ok(id)
    }

    /// Move an existing vertex under a different parent. The caller is
    /// responsible for only rewiring towards strictly cheaper parents, which
    /// keeps the tree acyclic.
    pub fn reparent(&mut self, id: usize, new_parent: usize) -> Result<(), TreeError> {
        if new_parent >= self.arena.len() {
            return Err(TreeError::BrokenReference(new_parent));
        }

        let vertex = self
            .arena
            .get_mut(id)
            .ok_or(TreeError::BrokenReference(id))?;
        vertex.parent = Some(new_parent);
        Ok(())
    }

    pub fn get(&self, id: usize) -> Result<&Vertex<N>, TreeError> {
        self.arena.get(id).ok_or(TreeError::BrokenReference(id))
    }

    pub fn size(&self) -> usize {
        self.arena.len()
    }

    pub fn vertices(&self) -> impl Iterator<Item = &Vertex<N>> {
        self.arena.iter()
    }

    /// Find the vertex nearest to `target` by linear scan. Distance ties are
    /// broken in favor of the vertex that was inserted first.
    pub fn nearest<S: StateSpace<Node = N>>(&self, space: &S, target: &N) -> usize {
        let mut best = 0;
        let mut best_distance = space.distance(self.arena[0].state(), target);
        for (id, vertex) in self.arena.iter().enumerate().skip(1) {
            let distance = space.distance(vertex.state(), target);
            if distance < best_distance {
                best_distance = distance;
                best = id;
            }
        }

        best
    }

    /// Walk the parent links from `from` back to the root, then reverse,
    /// yielding the state sequence from the root to `from` inclusive.
    pub fn retrace(&self, from: usize) -> Result<Vec<N>, TreeError>
    where
        N: Clone,
    {
        let mut sequence = Vec::new();
        let mut next = Some(from);
        while let Some(id) = next {
            let vertex = self.get(id)?;
            sequence.push(vertex.state().clone());
            next = vertex.parent();
        }

        sequence.reverse();
        Ok(sequence)
    }
}

#[derive(ThisError, Debug, Clone, PartialEq, Eq)]
pub enum TreeError {
    #[error(
        "A vertex [{0}] is referenced but does not exist in the search memory. \
        This is a critical implementation error, please report this to the \
        stepplan developers."
    )]
    BrokenReference(usize),
}
