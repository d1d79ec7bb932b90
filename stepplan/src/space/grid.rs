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
    error::ThisError,
    space::{SampledSpace, StateSpace},
    trace::{NoTrace, Trace},
};
use rand::{rngs::SmallRng, Rng, SeedableRng};
use smallvec::SmallVec;
use std::collections::HashMap;

pub type Point = nalgebra::geometry::Point2<f64>;
pub type Vector = nalgebra::Vector2<f64>;

/// A discrete coordinate in a 2D grid domain. Cells are plain values that are
/// copied freely; no component owns them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Cell {
    pub x: i64,
    pub y: i64,
}

impl Cell {
    /// Make a new cell from a pair of indices.
    pub fn new(x: i64, y: i64) -> Self {
        Self { x, y }
    }

    /// Get a new cell that is the same as this one, but shifted in x and y by
    /// the given values.
    pub fn shifted(&self, x: i64, y: i64) -> Self {
        Self {
            x: self.x + x,
            y: self.y + y,
        }
    }

    /// Interpret the cell indices as a lattice point in the plane.
    pub fn to_point(&self) -> Point {
        Point::new(self.x as f64, self.y as f64)
    }

    /// Get the cell whose lattice point is nearest to `p`.
    pub fn from_point(p: Point) -> Self {
        Self {
            x: p.x.round() as i64,
            y: p.y.round() as i64,
        }
    }
}

/// A dense occupancy snapshot over a bounded grid. The map is handed to a
/// [`GridSpace`] by value when a run begins, so the collaborator that
/// generated it cannot mutate it while planning is underway.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct OccupancyMap {
    width: i64,
    height: i64,
    occupied: Vec<bool>,
}

impl OccupancyMap {
    /// Create a new map of the given dimensions where every cell is free.
    pub fn new(width: i64, height: i64) -> Self {
        assert!(width > 0 && height > 0, "degenerate occupancy map {width}x{height}");
        Self {
            width,
            height,
            occupied: vec![false; (width * height) as usize],
        }
    }

    /// Mark a collection of cells as occupied.
    pub fn with_occupied(mut self, cells: impl IntoIterator<Item = Cell>) -> Self {
        for cell in cells {
            self.set_occupied(cell, true);
        }
        self
    }

    pub fn width(&self) -> i64 {
        self.width
    }

    pub fn height(&self) -> i64 {
        self.height
    }

    /// Check whether a cell lies inside the domain bounds.
    pub fn in_bounds(&self, cell: &Cell) -> bool {
        0 <= cell.x && cell.x < self.width && 0 <= cell.y && cell.y < self.height
    }

    /// Check whether an in-bounds cell is occupied. Out-of-bounds cells
    /// report as unoccupied; use [`OccupancyMap::is_free`] for validity.
    pub fn is_occupied(&self, cell: &Cell) -> bool {
        self.index_of(cell).is_some_and(|i| self.occupied[i])
    }

    /// Check whether a cell is inside the domain and unoccupied.
    pub fn is_free(&self, cell: &Cell) -> bool {
        self.index_of(cell).is_some_and(|i| !self.occupied[i])
    }

    /// Change the occupancy value of one cell. Out-of-bounds cells are
    /// ignored.
    pub fn set_occupied(&mut self, cell: Cell, occupied: bool) {
        if let Some(i) = self.index_of(&cell) {
            self.occupied[i] = occupied;
        }
    }

    /// The flattened index of an in-bounds cell.
    pub(crate) fn index_of(&self, cell: &Cell) -> Option<usize> {
        if !self.in_bounds(cell) {
            return None;
        }

        Some((cell.y * self.width + cell.x) as usize)
    }

    pub(crate) fn len(&self) -> usize {
        self.occupied.len()
    }
}

/// The variable store of a [`GridSpace`] was used incorrectly.
#[derive(ThisError, Debug, Clone, PartialEq, Eq)]
pub enum GridSpaceError {
    #[error("no variable named \"{0}\" has been created for this space")]
    UnknownVariable(String),
    #[error("cell {0:?} lies outside the domain")]
    OutOfBounds(Cell),
}

/// Fixed enumeration order of the 8 grid-adjacent offsets. Planners break
/// cost ties by first-seen order, so this order is part of the contract.
const OFFSETS: [(i64, i64); 8] = [
    (-1, -1),
    (-1, 0),
    (-1, 1),
    (0, -1),
    (0, 1),
    (1, -1),
    (1, 0),
    (1, 1),
];

/// The simplest kind of state space: a bounded 2D grid defined by an
/// occupancy map, where each cell connects to its 8 neighbours unless the
/// neighbour is occupied or out of bounds.
///
/// Per-node planner variables are stored as one dense `f64` field per name,
/// indexed by flattened cell coordinate. An optional [`Trace`] observer
/// receives every write to the designated highlight variable as well as the
/// final path of a successful run.
#[derive(Debug, Clone)]
pub struct GridSpace<T: Trace<Cell> = NoTrace> {
    occupancy: OccupancyMap,
    variables: HashMap<String, Vec<f64>>,
    highlight: Option<String>,
    rng: SmallRng,
    trace: T,
}

impl GridSpace<NoTrace> {
    /// Create a space over the given occupancy snapshot, with an OS-seeded
    /// random source.
    pub fn new(occupancy: OccupancyMap) -> Self {
        Self::with_rng(occupancy, SmallRng::from_os_rng())
    }

    /// Create a space whose random sampling is deterministic for a seed.
    pub fn seeded(occupancy: OccupancyMap, seed: u64) -> Self {
        Self::with_rng(occupancy, SmallRng::seed_from_u64(seed))
    }

    fn with_rng(occupancy: OccupancyMap, rng: SmallRng) -> Self {
        Self {
            occupancy,
            variables: HashMap::new(),
            highlight: None,
            rng,
            trace: NoTrace,
        }
    }
}

impl<T: Trace<Cell>> GridSpace<T> {
    /// Attach an observer, replacing any previous one. Existing variables and
    /// the highlight designation are preserved.
    pub fn with_trace<T2: Trace<Cell>>(self, trace: T2) -> GridSpace<T2> {
        GridSpace {
            occupancy: self.occupancy,
            variables: self.variables,
            highlight: self.highlight,
            rng: self.rng,
            trace,
        }
    }

    pub fn trace(&self) -> &T {
        &self.trace
    }

    /// Take the observer from this space, discarding the space.
    pub fn into_trace(self) -> T {
        self.trace
    }

    /// Get a reference to the underlying occupancy snapshot.
    pub fn occupancy(&self) -> &OccupancyMap {
        &self.occupancy
    }
}

impl<T: Trace<Cell>> StateSpace for GridSpace<T> {
    type Node = Cell;
    type Error = GridSpaceError;

    fn neighbours(&self, node: &Cell) -> SmallVec<[Cell; 8]> {
        OFFSETS
            .iter()
            .map(|(x, y)| node.shifted(*x, *y))
            .filter(|cell| self.occupancy.is_free(cell))
            .collect()
    }

    fn distance(&self, a: &Cell, b: &Cell) -> f64 {
        (a.to_point() - b.to_point()).norm()
    }

    fn same_node(&self, a: &Cell, b: &Cell) -> bool {
        a == b
    }

    fn valid_node(&self, node: &Cell) -> bool {
        self.occupancy.is_free(node)
    }

    fn create_variables(&mut self, names: &[&str]) {
        self.variables = names
            .iter()
            .map(|name| (name.to_string(), vec![0.0; self.occupancy.len()]))
            .collect();
    }

    fn reset_variables(&mut self) {
        for field in self.variables.values_mut() {
            field.fill(0.0);
        }
    }

    fn get_variable(&self, name: &str, node: &Cell) -> Result<f64, GridSpaceError> {
        let field = self
            .variables
            .get(name)
            .ok_or_else(|| GridSpaceError::UnknownVariable(name.to_owned()))?;
        let index = self
            .occupancy
            .index_of(node)
            .ok_or(GridSpaceError::OutOfBounds(*node))?;

        Ok(field[index])
    }

    fn set_variable(&mut self, name: &str, node: &Cell, value: f64) -> Result<(), GridSpaceError> {
        let field = self
            .variables
            .get_mut(name)
            .ok_or_else(|| GridSpaceError::UnknownVariable(name.to_owned()))?;
        let index = self
            .occupancy
            .index_of(node)
            .ok_or(GridSpaceError::OutOfBounds(*node))?;
        field[index] = value;

        if self.highlight.as_deref() == Some(name) {
            self.trace.updated(node, value);
        }

        Ok(())
    }

    fn highlight_variable(&mut self, name: &str) {
        self.highlight = Some(name.to_owned());
    }

    fn trace_solution(&mut self, path: &[Cell]) {
        self.trace.solved(path);
    }
}

impl<T: Trace<Cell>> SampledSpace for GridSpace<T> {
    fn random_node(&mut self) -> Cell {
        loop {
            let cell = Cell::new(
                self.rng.random_range(0..self.occupancy.width()),
                self.rng.random_range(0..self.occupancy.height()),
            );

            if self.occupancy.is_free(&cell) {
                return cell;
            }
        }
    }

    fn steer(&self, from: &Cell, towards: &Cell, delta_q: f64) -> Cell {
        let from_p = from.to_point();
        let direction: Vector = towards.to_point() - from_p;
        let distance = direction.norm();
        if distance <= delta_q {
            return *towards;
        }

        Cell::from_point(from_p + direction / distance * delta_q)
    }
}
