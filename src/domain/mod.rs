// Price history and ticker symbols
pub mod market;

// Features, labels, models and forecasts
pub mod ml;

// Port interfaces
pub mod ports;

// Domain-specific error types
pub mod errors;
