pub mod file_model_repository;

pub use file_model_repository::FileModelRepository;
