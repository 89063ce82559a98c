// Feature extraction, training, model registry and prediction
pub mod ml;

// Serving facade used by the CLI
pub mod forecast_service;
