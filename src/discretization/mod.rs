pub mod field;
pub mod kernel;
pub mod lattice;
pub mod velocity_set;
