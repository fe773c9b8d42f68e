pub mod analytics;
pub mod composer;
