//! Statistics scopes: the levels of the hierarchy that carry a snapshot.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Aggregation level of a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatsScope {
    Translation,
    Component,
    Category,
    ProjectLanguage,
    Project,
}

impl StatsScope {
    /// Leaf scopes are computed from units rather than from child snapshots.
    pub fn is_leaf(&self) -> bool {
        matches!(self, StatsScope::Translation)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StatsScope::Translation => "translation",
            StatsScope::Component => "component",
            StatsScope::Category => "category",
            StatsScope::ProjectLanguage => "project-language",
            StatsScope::Project => "project",
        }
    }
}

/// Identity of one scope instance.
///
/// Every variant but `ProjectLanguage` is keyed by the owning entity id; the
/// per-language rollup of a project is keyed by the project and the language
/// code of its translations.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "scope", rename_all = "snake_case")]
pub enum ScopeId {
    Translation { id: u64 },
    Component { id: u64 },
    Category { id: u64 },
    ProjectLanguage { project: u64, language: String },
    Project { id: u64 },
}

impl ScopeId {
    pub fn translation(id: u64) -> Self {
        ScopeId::Translation { id }
    }

    pub fn component(id: u64) -> Self {
        ScopeId::Component { id }
    }

    pub fn category(id: u64) -> Self {
        ScopeId::Category { id }
    }

    pub fn project(id: u64) -> Self {
        ScopeId::Project { id }
    }

    pub fn project_language(project: u64, language: impl Into<String>) -> Self {
        ScopeId::ProjectLanguage {
            project,
            language: language.into(),
        }
    }

    pub fn scope(&self) -> StatsScope {
        match self {
            ScopeId::Translation { .. } => StatsScope::Translation,
            ScopeId::Component { .. } => StatsScope::Component,
            ScopeId::Category { .. } => StatsScope::Category,
            ScopeId::ProjectLanguage { .. } => StatsScope::ProjectLanguage,
            ScopeId::Project { .. } => StatsScope::Project,
        }
    }
}

impl fmt::Display for ScopeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScopeId::Translation { id }
            | ScopeId::Component { id }
            | ScopeId::Category { id }
            | ScopeId::Project { id } => write!(f, "{}:{}", self.scope().as_str(), id),
            ScopeId::ProjectLanguage { project, language } => {
                write!(f, "{}:{}:{}", self.scope().as_str(), project, language)
            }
        }
    }
}
