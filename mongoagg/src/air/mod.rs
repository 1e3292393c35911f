mod builders;
mod definitions;

pub use builders::*;
pub use definitions::*;
