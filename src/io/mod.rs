pub mod input;
pub mod output;
pub mod posteriors;
pub mod symbols;

pub use input::*;
pub use output::*;
pub use posteriors::*;
pub use symbols::*;
