pub mod address;
pub mod cache;
pub mod collector;
pub mod file;
pub mod http;
pub mod traits;
pub mod types;

pub use address::Address;
pub use cache::{fingerprint, SnapshotCache};
pub use collector::Collector;
pub use file::FileSource;
pub use http::HttpSource;
pub use traits::ObservationSource;
pub use types::{PropertyQuery, DEFAULT_SOURCES};
