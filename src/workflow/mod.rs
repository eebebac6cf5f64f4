// SPDX-License-Identifier: MIT

pub mod checkpoint;
pub mod config;
pub mod graph;
pub mod loader;
pub mod mutator;
pub mod node;
pub mod registry;
pub mod state;
