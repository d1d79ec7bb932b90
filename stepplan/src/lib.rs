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

//! Incremental path planning over discretized state spaces.
//!
//! Planning algorithms in this crate are steppable state machines: each call
//! to [`planner::Search::step`] performs one bounded unit of work and returns
//! control to the caller, so a renderer, test harness, or batch driver can
//! observe intermediate state between steps and decide its own pacing.

pub mod space;

pub mod algorithm;

pub mod planner;
pub use planner::Planner;

pub mod trace;
pub use trace::Trace;

pub mod error;

pub mod prelude {
    pub use super::algorithm::{
        a_star::AStar,
        path::Path,
        rrt::{Rrt, RrtConfig},
        Coherent, SearchStatus, Solvable,
    };
    pub use super::planner::{halt::StepLimit, Planner, Search};
    pub use super::space::{Cell, GridSpace, OccupancyMap, SampledSpace, StateSpace};
    pub use super::trace::{NoTrace, RecordingTrace, Trace};
}
