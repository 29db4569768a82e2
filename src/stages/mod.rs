pub mod stage0_collapse;
pub mod stage1_segment;
pub mod stage2_aggregate;

pub use stage0_collapse::*;
pub use stage1_segment::*;
pub use stage2_aggregate::*;
