pub mod aggregate;
pub mod cell_catalog;
pub mod cell_geometry;
pub mod dataset;
pub mod error;
pub mod map_state;
pub mod map_template;
