pub mod catalog_builder;
pub mod detection_cache;
pub mod download_service;
pub mod error;
pub mod matcher;
pub mod selector;
pub mod session;
pub mod ttl_cache;
pub mod url_detector;

pub use catalog_builder::CatalogBuilder;
pub use detection_cache::DetectionCache;
pub use download_service::{Delivered, DownloadService, UrlOutcome};
pub use error::ServiceError;
pub use session::SessionStore;
pub use ttl_cache::TtlCache;
pub use url_detector::UrlDetector;
