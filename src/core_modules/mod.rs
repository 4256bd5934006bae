pub mod linker;
pub mod matcher;
pub mod particle;
pub mod spatial_grid;
pub mod statistics;
