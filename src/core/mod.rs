pub mod clock;
pub mod cpg;
pub mod edges;
pub mod neural;
pub mod phase;
pub mod scaler;
