// Service exports
pub mod dataset;
pub mod geocoder;
pub mod openai;

pub use dataset::{load_store, DatasetError};
pub use geocoder::{GeocodeError, GeocoderClient};
pub use openai::{LlmError, OpenAiClient};
