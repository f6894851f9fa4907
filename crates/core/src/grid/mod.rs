//! Spatial addressing, neighbourhoods and spread weights

pub mod addressing;
pub mod neighbours;
pub mod wind_weighting;

pub use addressing::{vertex_planar_position, vertex_to_world, world_to_vertex};
pub use neighbours::{neighbours, step, GridStep, Neighbour, NEIGHBOUR_OFFSETS};
pub use wind_weighting::{weigh, weighted_neighbours, WeightedNeighbour};
