pub mod cache;
pub mod format;
pub mod quality;
pub mod settings;

pub use cache::{CacheEntry, CacheStats};
pub use format::{FormatCatalog, FormatEntry, RawFormat};
pub use quality::{MediaKind, QualityTier};
pub use settings::{SettingsError, SettingsUpdate, UserSettings};
