pub mod keywords;
pub mod token_estimator;
