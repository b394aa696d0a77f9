//! User guidance for queries that did not resolve to one template.

use super::{FilteredTemplateInfo, TemplateListResolutionResult};
use crate::template::TemplateInfo;
use std::collections::BTreeMap;
use strsim::levenshtein;

/// Maximum Levenshtein distance for a suggestion, as a percentage of the input length.
const SIMILARITY_THRESHOLD_PERCENT: usize = 50;

const MAX_SUGGESTIONS: usize = 3;

/// Short names and names close to `input`, closest first.
pub fn suggest_similar_names(input: &str, templates: &[TemplateInfo]) -> Vec<String> {
    let target = input.trim().to_lowercase();
    if target.is_empty() {
        return Vec::new();
    }

    let mut candidates: Vec<&str> = templates
        .iter()
        .flat_map(|t| [t.short_name.as_str(), t.name.as_str()])
        .filter(|c| !c.is_empty())
        .collect();
    candidates.sort_unstable();
    candidates.dedup();

    let mut scored: Vec<_> =
        candidates.into_iter().map(|c| (c, levenshtein(&target, &c.to_lowercase()))).collect();
    scored.sort_by_key(|(_, distance)| *distance);

    scored
        .into_iter()
        .filter(|(_, distance)| *distance <= target.chars().count() * SIMILARITY_THRESHOLD_PERCENT / 100)
        .take(MAX_SUGGESTIONS)
        .map(|(c, _)| c.to_string())
        .collect()
}

/// Candidate group identities with the short names and languages in each.
pub fn ambiguous_groups(templates: &[FilteredTemplateInfo]) -> BTreeMap<String, Vec<String>> {
    let mut groups: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for template in templates {
        let languages = template.info.languages().join(", ");
        let entry = if languages.is_empty() {
            template.info.short_name.clone()
        } else {
            format!("{} [{}]", template.info.short_name, languages)
        };

        let members = groups.entry(template.group_identity().to_string()).or_default();
        if !members.contains(&entry) {
            members.push(entry);
        }
    }
    groups
}

/// Explains why `result` did not resolve, or `None` if it resolved to one group.
pub fn resolution_help(
    input: Option<&str>,
    result: &TemplateListResolutionResult,
    all_templates: &[TemplateInfo],
) -> Option<String> {
    if result.try_get_unambiguous_template_group_to_use().is_some() {
        return None;
    }

    let name = input.map(str::trim).filter(|n| !n.is_empty());
    if result.core_matched_templates().is_empty() {
        let mut message = match name {
            Some(name) => format!("No templates match '{name}'."),
            None => "No templates match the given filters.".to_string(),
        };
        let suggestions = name.map(|n| suggest_similar_names(n, all_templates)).unwrap_or_default();
        if !suggestions.is_empty() {
            message.push_str(&format!("\nDid you mean: {}?", suggestions.join(", ")));
        }
        return Some(message);
    }

    let mut message = String::from("Unable to determine the desired template from the input. Candidate groups:");
    for (group, members) in ambiguous_groups(result.core_matched_templates()) {
        message.push_str(&format!("\n  {group}: {}", members.join(", ")));
    }
    message.push_str("\nNarrow the query with a full short name, a language or a type.");
    Some(message)
}
