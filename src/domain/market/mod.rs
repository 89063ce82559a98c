// Daily price history
pub mod price_series;

// Ticker symbol normalization
pub mod ticker;
