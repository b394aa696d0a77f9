//! Template matching and disambiguation.
//!
//! Every query is a set of predicates ([`filters`]). Each predicate inspects
//! one facet of a template and reports an optional [`MatchInfo`]. The results
//! of one template form its disposition, summarized by the `is_*` methods of
//! [`FilteredTemplateInfo`].
//!
//! [`TemplateListResolutionResult`] narrows the matches of a query down to a
//! single template group, and from there to a single invokable template.

pub mod filters;
pub mod help;
mod result;

pub use filters::{TemplateFilter, filter_templates};
pub use result::{
    SingularInvokableMatchStatus, TemplateListResolutionResult, TemplateListResolver, TemplateQuery,
};

use crate::template::TemplateInfo;
use std::cmp::Ordering;

/// How well a facet matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MatchKind {
    Exact,
    Partial,
    Mismatch,
}

/// The facet a predicate tested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MatchLocation {
    Name,
    ShortName,
    Classification,
    Language,
    DefaultLanguage,
    Context,
    OtherParameter,
}

/// Result of one predicate on one template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchInfo {
    pub location: MatchLocation,
    pub kind: MatchKind,
    /// Parameter name, for [`MatchLocation::OtherParameter`]
    pub input_parameter_name: Option<String>,
}

impl MatchInfo {
    pub fn new(location: MatchLocation, kind: MatchKind) -> Self {
        Self {
            location,
            kind,
            input_parameter_name: None,
        }
    }
}

/// A template together with the predicate results of one query.
///
/// Default-language results are kept apart: they rank candidates but never
/// decide whether a template matches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilteredTemplateInfo {
    pub info: TemplateInfo,
    pub match_disposition: Vec<MatchInfo>,
    pub disposition_of_defaults: Vec<MatchInfo>,
}

fn is_match_of<'m>(mut results: impl Iterator<Item = &'m MatchInfo> + Clone) -> bool {
    !results.clone().any(|m| m.kind == MatchKind::Mismatch) && results.any(|m| m.kind == MatchKind::Exact)
}

fn is_partial_match_of<'m>(results: impl Iterator<Item = &'m MatchInfo> + Clone) -> bool {
    let mut saw_partial = false;
    for result in results {
        match result.kind {
            MatchKind::Exact | MatchKind::Mismatch => return false,
            MatchKind::Partial => saw_partial = true,
        }
    }
    saw_partial
}

impl FilteredTemplateInfo {
    pub fn new(info: TemplateInfo, results: Vec<MatchInfo>) -> Self {
        let (disposition_of_defaults, match_disposition): (Vec<_>, Vec<_>) =
            results.into_iter().partition(|m| m.location == MatchLocation::DefaultLanguage);
        Self {
            info,
            match_disposition,
            disposition_of_defaults,
        }
    }

    fn outside_context(&self) -> impl Iterator<Item = &MatchInfo> + Clone {
        self.match_disposition.iter().filter(|m| m.location != MatchLocation::Context)
    }

    /// No mismatch and at least one exact result.
    pub fn is_match(&self) -> bool {
        is_match_of(self.match_disposition.iter())
    }

    /// Only partial results.
    pub fn is_partial_match(&self) -> bool {
        is_partial_match_of(self.match_disposition.iter())
    }

    pub fn is_match_except_context(&self) -> bool {
        is_match_of(self.outside_context())
    }

    pub fn is_partial_match_except_context(&self) -> bool {
        is_partial_match_of(self.outside_context())
    }

    /// A match that can be invoked as is: nothing partial, no parameter mismatch.
    pub fn is_invokable_match(&self) -> bool {
        self.is_match()
            && !self.match_disposition.iter().any(|m| m.kind == MatchKind::Partial)
            && !self.has_parameter_mismatch()
    }

    pub fn has_mismatch(&self) -> bool {
        self.match_disposition.iter().any(|m| m.kind == MatchKind::Mismatch)
    }

    pub fn has_parameter_mismatch(&self) -> bool {
        self.match_disposition
            .iter()
            .any(|m| m.location == MatchLocation::OtherParameter && m.kind == MatchKind::Mismatch)
    }

    pub fn has_default_language_match(&self) -> bool {
        self.disposition_of_defaults
            .iter()
            .any(|m| m.location == MatchLocation::DefaultLanguage && m.kind == MatchKind::Exact)
    }

    pub fn group_identity(&self) -> &str {
        self.info.effective_group_identity()
    }
}

/// `true` if `templates` is non-empty and every member has the same group identity.
pub fn are_all_templates_same_group_identity<'t, I>(templates: I) -> bool
where
    I: IntoIterator<Item = &'t FilteredTemplateInfo>,
{
    let mut iter = templates.into_iter();
    let Some(first) = iter.next() else {
        return false;
    };
    let group = first.group_identity();
    iter.all(|t| t.group_identity() == group)
}

/// Highest member under `order` if all templates share one group.
pub fn find_highest_precedence_template_if_all_same_group_identity<'t, F>(
    templates: &[&'t FilteredTemplateInfo],
    order: F,
) -> Option<&'t FilteredTemplateInfo>
where
    F: Fn(&TemplateInfo, &TemplateInfo) -> Ordering,
{
    if !are_all_templates_same_group_identity(templates.iter().copied()) {
        return None;
    }
    templates.iter().copied().max_by(|a, b| order(&a.info, &b.info))
}

/// Default total order: higher precedence wins.
pub fn by_precedence(a: &TemplateInfo, b: &TemplateInfo) -> Ordering {
    a.precedence.cmp(&b.precedence)
}
