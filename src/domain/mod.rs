pub mod chart;
pub mod model;
pub mod options;
pub mod params;
pub mod regroup;
