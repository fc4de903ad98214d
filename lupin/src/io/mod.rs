pub mod common_io;
pub mod tables;

pub use common_io::*;
pub use tables::*;
