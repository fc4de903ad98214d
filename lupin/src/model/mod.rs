pub mod conjugate;
pub mod design_matrix;

pub use conjugate::*;
pub use design_matrix::*;
