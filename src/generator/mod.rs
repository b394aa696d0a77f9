//! Generator capability.
//!
//! A generator knows one template authoring format. During a scan it extracts
//! template descriptors and localization locators from a mounted root; later
//! it loads a full [`Template`] from the config entry a descriptor points at.

mod json;

pub use json::{JSON_TEMPLATE_GENERATOR_ID, JsonTemplateGenerator};

use crate::mount::{MountEntry, MountPoint};
use crate::template::{LocalizationLocator, Template, TemplateInfo};
use anyhow::Result;
use uuid::Uuid;

/// Extracts and loads templates of one authoring format.
pub trait Generator: Send + Sync {
    /// Stable id recorded in [`TemplateInfo::generator_id`].
    fn id(&self) -> Uuid;

    /// Templates and localization locators found anywhere below `root`.
    ///
    /// Individual malformed templates are skipped; an error means the root as a
    /// whole could not be examined.
    fn get_templates_and_langpacks(
        &self,
        root: &dyn MountPoint,
    ) -> Result<(Vec<TemplateInfo>, Vec<LocalizationLocator>)>;

    /// Loads the template whose config is `config`.
    ///
    /// Returns `Ok(None)` if `config` is not a template this generator understands.
    fn try_get_template_from_config(
        &self,
        config: &MountEntry<'_>,
        locale_config: Option<&MountEntry<'_>>,
        host_config: Option<&MountEntry<'_>>,
    ) -> Result<Option<Template>>;
}
