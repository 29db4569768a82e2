pub mod frame;
pub mod nbest;
pub mod run;
pub mod span;

pub use frame::*;
pub use nbest::*;
pub use run::*;
pub use span::*;
