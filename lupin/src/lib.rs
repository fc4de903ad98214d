pub mod io;
pub mod model;
pub mod recovery;
pub mod simulation;
