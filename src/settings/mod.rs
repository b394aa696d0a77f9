//! Persisted engine settings.
//!
//! The settings document (`settings.json` in the base directory) records the
//! known mount points, the component probing paths and the activated
//! components. [`SettingsLoader`] owns it for the duration of a session and
//! also provides access to the template cache documents stored beside it.

mod loader;
mod store;

pub use loader::SettingsLoader;
pub use store::SettingsStore;
