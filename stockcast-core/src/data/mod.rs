//! Data ingestion: provider payloads, normalization, persistence and sync.

pub mod alpha_vantage;
pub mod circuit_breaker;
pub mod fixture;
pub mod normalize;
pub mod parquet_store;
pub mod provider;
pub mod store;
pub mod sync;

pub use alpha_vantage::AlphaVantageSource;
pub use circuit_breaker::CircuitBreaker;
pub use fixture::JsonFileSource;
pub use normalize::{normalize, Normalized, Normalizer, ParseError};
pub use parquet_store::{ParquetStore, StoreMeta, StoreStatus};
pub use provider::{DailyPayload, DataError, PriceSource, RawQuote, RawSeries};
pub use store::{BarStore, MemoryStore, StoreError};
pub use sync::{compute_delta, sync, SyncReport};
