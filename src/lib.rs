//! Two-dimensional robot world simulator with synthesized first-person camera pictures and
//! interchangeable vector and raster drawing backends.

pub mod backend;
pub mod domain;
