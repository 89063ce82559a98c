pub mod feature_extractor;
pub mod label_builder;
pub mod model_store;
pub mod predictor;
pub mod trainer;

pub use model_store::{ModelState, ModelStore, ModelStoreConfig};
pub use trainer::{GradientBoostingTrainer, Trainer, TrainerConfig};
