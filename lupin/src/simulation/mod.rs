pub mod trial;
pub mod truncated_normal;

pub use trial::*;
pub use truncated_normal::*;
