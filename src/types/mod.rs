pub mod analysis;
pub mod article;
