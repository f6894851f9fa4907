//! Core types and utilities

pub mod color;
pub mod position;
pub mod vertex;
pub mod vertex_grid;
pub mod wind;

pub use color::VertexColor;
pub use position::*;
pub use vertex::{CellId, FireVertex};
pub use vertex_grid::{VertexGrid, VERTS_PER_CELL};
pub use wind::WindSample;
