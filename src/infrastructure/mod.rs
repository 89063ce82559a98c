pub mod csv_provider;
pub mod http_client_factory;
pub mod mock;
pub mod persistence;
pub mod repositories;
pub mod tiingo;

pub use csv_provider::CsvClosesProvider;
pub use mock::MockClosesProvider;
pub use persistence::FileModelRepository;
pub use repositories::InMemoryModelRepository;
pub use tiingo::TiingoClosesProvider;
