//! Graph layer: node classification, adjacency index, orientation and
//! same-circuit traversal.

pub mod classify;
pub mod index;
pub mod orientation;
pub mod traversal;
