//! Narrowing query matches to one template group or one template.

use super::filters::{
    TemplateFilter, classification_filter, context_filter, default_language_filter, evaluate,
    language_filter, name_filter, parameter_filter,
};
use super::{
    FilteredTemplateInfo, MatchKind, MatchLocation, are_all_templates_same_group_identity, by_precedence,
    find_highest_precedence_template_if_all_same_group_identity,
};
use crate::template::TemplateInfo;
use std::cell::OnceCell;
use std::cmp::Ordering;
use std::collections::HashSet;
use tracing::debug;

/// What the user asked for.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TemplateQuery {
    /// Name, short name or classification fragment
    pub name: Option<String>,
    /// Explicitly requested language
    pub language: Option<String>,
    /// Required `type` tag
    pub type_filter: Option<String>,
    /// Parameters given on the command line, with optional values
    pub parameters: Vec<(String, Option<String>)>,
    /// The host's default language
    pub default_language: Option<String>,
    pub suppress_default_language_filter: bool,
}

impl TemplateQuery {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    fn has_name(&self) -> bool {
        self.name.as_deref().is_some_and(|n| !n.trim().is_empty())
    }

    fn has_language(&self) -> bool {
        self.language.as_deref().is_some_and(|l| !l.trim().is_empty())
    }

    /// Predicates of this query, in evaluation order.
    pub fn filters(&self) -> Vec<TemplateFilter> {
        let mut filters = Vec::new();
        if let Some(name) = self.name.as_deref() {
            filters.push(name_filter(name));
            filters.push(classification_filter(name));
        }
        if let Some(language) = self.language.as_deref() {
            filters.push(language_filter(language));
        }
        if let Some(kind) = self.type_filter.as_deref() {
            filters.push(context_filter(kind));
        }
        for (name, value) in &self.parameters {
            filters.push(parameter_filter(name, value.as_deref()));
        }
        if !self.has_language()
            && !self.suppress_default_language_filter
            && let Some(default) = self.default_language.as_deref()
        {
            filters.push(default_language_filter(default));
        }
        filters
    }
}

/// Outcome of singular-invokable resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SingularInvokableMatchStatus {
    SingleMatch,
    NoMatch,
    /// Invokable candidates span several groups
    AmbiguousChoice,
}

/// Runs queries over a template list.
pub struct TemplateListResolver;

impl TemplateListResolver {
    /// Evaluates `query` against every template.
    ///
    /// Core matches are the templates that match, or partially match, when
    /// context is ignored. Without a name they are every template with no
    /// mismatch outside context. Templates in context are those the `type`
    /// filter accepts.
    pub fn perform_core_template_query(
        templates: &[TemplateInfo],
        query: &TemplateQuery,
    ) -> TemplateListResolutionResult {
        let filters = query.filters();
        let context = query.type_filter.as_deref().map(context_filter);
        let has_name = query.has_name();

        let mut seen = HashSet::new();
        let mut core = Vec::new();
        let mut in_context = Vec::new();

        for template in templates {
            if !seen.insert(template.identity.as_str()) {
                continue;
            }

            let filtered = evaluate(template, &filters);
            let is_core = if has_name {
                filtered.is_match_except_context() || filtered.is_partial_match_except_context()
            } else {
                !filtered
                    .match_disposition
                    .iter()
                    .any(|m| m.location != MatchLocation::Context && m.kind == MatchKind::Mismatch)
            };
            if is_core {
                core.push(filtered);
            }

            let accepted = context
                .as_ref()
                .and_then(|filter| filter(template))
                .is_none_or(|m| m.kind != MatchKind::Mismatch);
            if accepted {
                in_context.push(FilteredTemplateInfo::new(template.clone(), Vec::new()));
            }
        }

        debug!("Query {:?}: {} core matches, {} in context", query.name, core.len(), in_context.len());
        TemplateListResolutionResult::new(query, core, in_context)
    }
}

/// Matches of one query and the ways to narrow them.
#[derive(Debug)]
pub struct TemplateListResolutionResult {
    has_template_name: bool,
    has_user_input_language: bool,
    suppress_default_language_filter: bool,
    core_matched_templates: Vec<FilteredTemplateInfo>,
    all_templates_in_context: Vec<FilteredTemplateInfo>,
    best_template_match_list: OnceCell<(Vec<FilteredTemplateInfo>, bool)>,
}

impl TemplateListResolutionResult {
    pub fn new(
        query: &TemplateQuery,
        core_matched_templates: Vec<FilteredTemplateInfo>,
        all_templates_in_context: Vec<FilteredTemplateInfo>,
    ) -> Self {
        Self {
            has_template_name: query.has_name(),
            has_user_input_language: query.has_language(),
            suppress_default_language_filter: query.suppress_default_language_filter,
            core_matched_templates,
            all_templates_in_context,
            best_template_match_list: OnceCell::new(),
        }
    }

    pub fn core_matched_templates(&self) -> &[FilteredTemplateInfo] {
        &self.core_matched_templates
    }

    pub fn all_templates_in_context(&self) -> &[FilteredTemplateInfo] {
        &self.all_templates_in_context
    }

    /// Core matches satisfying `predicate`, or `None` if there are none.
    pub fn try_get_core_matched_templates_with_disposition<P>(
        &self,
        predicate: P,
    ) -> Option<Vec<&FilteredTemplateInfo>>
    where
        P: Fn(&FilteredTemplateInfo) -> bool,
    {
        let matching: Vec<_> = self.core_matched_templates.iter().filter(|t| predicate(*t)).collect();
        (!matching.is_empty()).then_some(matching)
    }

    /// The single template group the core matches point at.
    ///
    /// Tried in order: a lone candidate, the candidates matching the default
    /// language (unless a language was requested or the default-language
    /// filter is suppressed), the candidates without a parameter mismatch,
    /// and finally all candidates. Each step only succeeds when its set is
    /// non-empty and within one group.
    pub fn try_get_unambiguous_template_group_to_use(&self) -> Option<Vec<&FilteredTemplateInfo>> {
        let core = &self.core_matched_templates;
        match core.len() {
            0 => return None,
            1 => return Some(core.iter().collect()),
            _ => {}
        }

        if !self.has_user_input_language && !self.suppress_default_language_filter {
            let default_language: Vec<_> = core.iter().filter(|t| t.has_default_language_match()).collect();
            if are_all_templates_same_group_identity(default_language.iter().copied()) {
                let without_mismatch: Vec<_> =
                    default_language.iter().copied().filter(|t| !t.has_parameter_mismatch()).collect();
                return Some(if without_mismatch.is_empty() {
                    default_language
                } else {
                    without_mismatch
                });
            }
        }

        let parameter_filtered: Vec<_> = core.iter().filter(|t| !t.has_parameter_mismatch()).collect();
        if are_all_templates_same_group_identity(parameter_filtered.iter().copied()) {
            return Some(parameter_filtered);
        }

        if are_all_templates_same_group_identity(core) {
            return Some(core.iter().collect());
        }

        None
    }

    /// Every invokable core match, or `None` if there are none.
    pub fn try_get_all_invokable_templates(&self) -> Option<Vec<&FilteredTemplateInfo>> {
        self.try_get_core_matched_templates_with_disposition(FilteredTemplateInfo::is_invokable_match)
    }

    /// The one template to invoke, ordered by precedence within a group.
    pub fn singular_invokable_match(&self) -> (Option<&FilteredTemplateInfo>, SingularInvokableMatchStatus) {
        self.singular_invokable_match_with(by_precedence)
    }

    /// The one template to invoke, with `order` picking the winner of a group.
    pub fn singular_invokable_match_with<F>(
        &self,
        order: F,
    ) -> (Option<&FilteredTemplateInfo>, SingularInvokableMatchStatus)
    where
        F: Fn(&TemplateInfo, &TemplateInfo) -> Ordering,
    {
        let invokable: Vec<_> = self.core_matched_templates.iter().filter(|t| t.is_invokable_match()).collect();

        if let [single] = invokable.as_slice() {
            return (Some(*single), SingularInvokableMatchStatus::SingleMatch);
        }
        if let Some(highest) = find_highest_precedence_template_if_all_same_group_identity(&invokable, order) {
            return (Some(highest), SingularInvokableMatchStatus::SingleMatch);
        }

        let status = if invokable.is_empty() {
            SingularInvokableMatchStatus::NoMatch
        } else {
            SingularInvokableMatchStatus::AmbiguousChoice
        };
        (None, status)
    }

    /// The best list to show the user.
    ///
    /// First non-empty of: the unambiguous group, all invokable matches (only
    /// for a named query), exact matches, exact matches outside context,
    /// partial matches, partial matches outside context. Otherwise every
    /// template in context, and [`Self::using_context_matches`] is set.
    pub fn best_template_match_list(&self) -> &[FilteredTemplateInfo] {
        &self.best().0
    }

    pub fn using_context_matches(&self) -> bool {
        self.best().1
    }

    fn best(&self) -> &(Vec<FilteredTemplateInfo>, bool) {
        self.best_template_match_list.get_or_init(|| {
            let found = self
                .try_get_unambiguous_template_group_to_use()
                .or_else(|| self.has_template_name.then(|| self.try_get_all_invokable_templates()).flatten())
                .or_else(|| self.try_get_core_matched_templates_with_disposition(FilteredTemplateInfo::is_match))
                .or_else(|| {
                    self.try_get_core_matched_templates_with_disposition(FilteredTemplateInfo::is_match_except_context)
                })
                .or_else(|| {
                    self.try_get_core_matched_templates_with_disposition(FilteredTemplateInfo::is_partial_match)
                })
                .or_else(|| {
                    self.try_get_core_matched_templates_with_disposition(
                        FilteredTemplateInfo::is_partial_match_except_context,
                    )
                });

            match found {
                Some(list) => (list.into_iter().cloned().collect(), false),
                None => (self.all_templates_in_context.clone(), true),
            }
        })
    }
}
