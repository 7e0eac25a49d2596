pub mod errors;
pub mod profile;
pub mod settings;
pub mod store;
pub mod validate;

// re‑export ergonomic entry points
pub use errors::{ProfileField, StorageError, ValidationError, ValidationErrors};
pub use profile::{Profile, ProfileInput};
pub use settings::{FileSettings, MemorySettings, SettingsBackend};
pub use store::{find, remove, upsert, ProfileStore, PROFILES_KEY};
pub use validate::{is_dotted_quad, validate};
