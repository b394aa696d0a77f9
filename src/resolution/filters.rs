//! Match predicates over cached templates.
//!
//! A blank input disables its predicate: it reports no result for any template.

use super::{FilteredTemplateInfo, MatchInfo, MatchKind, MatchLocation};
use crate::template::TemplateInfo;
use std::collections::HashSet;

/// A predicate over one template facet.
pub type TemplateFilter = Box<dyn Fn(&TemplateInfo) -> Option<MatchInfo> + Send + Sync>;

fn non_blank(input: &str) -> Option<String> {
    let trimmed = input.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_lowercase())
}

/// Name or short name: exact on equality, partial on substring.
pub fn name_filter(input: &str) -> TemplateFilter {
    let needle = non_blank(input);
    Box::new(move |template| {
        let needle = needle.as_deref()?;
        let name = template.name.to_lowercase();
        let short_name = template.short_name.to_lowercase();

        let found = if name == needle {
            (MatchLocation::Name, MatchKind::Exact)
        } else if !short_name.is_empty() && short_name == needle {
            (MatchLocation::ShortName, MatchKind::Exact)
        } else if name.contains(needle) {
            (MatchLocation::Name, MatchKind::Partial)
        } else if short_name.contains(needle) {
            (MatchLocation::ShortName, MatchKind::Partial)
        } else {
            (MatchLocation::Name, MatchKind::Mismatch)
        };
        Some(MatchInfo::new(found.0, found.1))
    })
}

/// Classifications: exact on equality, partial on substring, otherwise no result.
///
/// Used beside [`name_filter`] with the same input, so a miss here must not
/// veto a name match.
pub fn classification_filter(input: &str) -> TemplateFilter {
    let needle = non_blank(input);
    Box::new(move |template| {
        let needle = needle.as_deref()?;
        let classifications: Vec<String> =
            template.classifications.iter().map(|c| c.to_lowercase()).collect();

        if classifications.iter().any(|c| c == needle) {
            Some(MatchInfo::new(MatchLocation::Classification, MatchKind::Exact))
        } else if classifications.iter().any(|c| c.contains(needle)) {
            Some(MatchInfo::new(MatchLocation::Classification, MatchKind::Partial))
        } else {
            None
        }
    })
}

fn language_match(template: &TemplateInfo, language: &str) -> MatchKind {
    if template.languages().iter().any(|l| l.eq_ignore_ascii_case(language)) {
        MatchKind::Exact
    } else {
        MatchKind::Mismatch
    }
}

/// Explicitly requested language.
pub fn language_filter(language: &str) -> TemplateFilter {
    let language = language.trim().to_string();
    Box::new(move |template| {
        (!language.is_empty())
            .then(|| MatchInfo::new(MatchLocation::Language, language_match(template, &language)))
    })
}

/// The host's default language, used for ranking only.
pub fn default_language_filter(language: &str) -> TemplateFilter {
    let language = language.trim().to_string();
    Box::new(move |template| {
        (!language.is_empty()).then(|| {
            MatchInfo::new(MatchLocation::DefaultLanguage, language_match(template, &language))
        })
    })
}

/// The `type` tag (project, item, ...).
pub fn context_filter(kind: &str) -> TemplateFilter {
    let kind = kind.trim().to_string();
    Box::new(move |template| {
        if kind.is_empty() {
            return None;
        }
        let matched = template.template_type().is_some_and(|t| t.eq_ignore_ascii_case(&kind));
        let result = if matched {
            MatchKind::Exact
        } else {
            MatchKind::Mismatch
        };
        Some(MatchInfo::new(MatchLocation::Context, result))
    })
}

/// A template parameter supplied on the command line.
///
/// Exact if the template declares the parameter and, for choice parameters,
/// `value` is one of the choices. A missing value only requires the declaration.
pub fn parameter_filter(name: &str, value: Option<&str>) -> TemplateFilter {
    let name = name.trim().to_string();
    let value = value.map(str::to_string);
    Box::new(move |template| {
        if name.is_empty() {
            return None;
        }

        let valid = match (template.tag(&name), value.as_deref()) {
            (Some(tag), Some(value)) => tag.has_choice(value),
            (Some(_), None) => true,
            (None, _) => template.cache_parameter(&name).is_some(),
        };
        let kind = if valid {
            MatchKind::Exact
        } else {
            MatchKind::Mismatch
        };
        Some(MatchInfo {
            location: MatchLocation::OtherParameter,
            kind,
            input_parameter_name: Some(name.clone()),
        })
    })
}

/// Applies `filters` to every template.
pub fn evaluate(template: &TemplateInfo, filters: &[TemplateFilter]) -> FilteredTemplateInfo {
    let results = filters.iter().filter_map(|filter| filter(template)).collect();
    FilteredTemplateInfo::new(template.clone(), results)
}

/// Templates that match, or that partially match unless `exact_only`.
///
/// The first template of each identity wins; input order is preserved.
pub fn filter_templates(
    templates: &[TemplateInfo],
    exact_only: bool,
    filters: &[TemplateFilter],
) -> Vec<FilteredTemplateInfo> {
    let mut seen = HashSet::new();
    templates
        .iter()
        .map(|template| evaluate(template, filters))
        .filter(|info| info.is_match() || (!exact_only && info.is_partial_match()))
        .filter(|info| seen.insert(info.info.identity.clone()))
        .collect()
}
