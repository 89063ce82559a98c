pub mod booster;
pub mod dataset;
pub mod feature_registry;
pub mod forecast;
pub mod model;
