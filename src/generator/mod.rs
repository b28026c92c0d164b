pub mod analysis;
pub mod context;
pub mod score;
pub mod workflow;
pub mod writing;
