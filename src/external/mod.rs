pub mod delivery;
pub mod fetcher;

pub use delivery::{DeliveryError, DeliveryTransport, LocalDelivery, DEFAULT_MAX_FILE_SIZE};
pub use fetcher::{FetchError, FetchSelection, FetchedMedia, MediaFetcher, ProbeResult, YtDlpFetcher};
