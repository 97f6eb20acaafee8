//! Catalog of projects, categories, components, translations and their strings.
//!
//! The catalog is the data the statistics are computed from. It knows the
//! hierarchy edges, so it also answers which scopes feed a parent snapshot
//! and which scopes sit above a given one.

use crate::error::{Result, StatsError};
use crate::scope::ScopeId;
use anyhow::Context;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

/// Translation state of a single string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitState {
    Empty,
    Fuzzy,
    Translated,
    Approved,
    ReadOnly,
}

impl UnitState {
    /// Approved and read-only strings count as translated.
    pub fn is_translated(&self) -> bool {
        matches!(
            self,
            UnitState::Translated | UnitState::Approved | UnitState::ReadOnly
        )
    }
}

/// One translatable string of a translation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Unit {
    pub id: u64,
    pub source: String,
    pub state: UnitState,

    /// Raw quality-check results, one JSON object per failing check
    #[serde(default)]
    pub checks: Vec<serde_json::Value>,

    #[serde(default)]
    pub suggestions: u32,
    #[serde(default)]
    pub comments: u32,
    #[serde(default)]
    pub changed_at: Option<DateTime<Utc>>,
}

impl Unit {
    pub fn new(id: u64, source: impl Into<String>, state: UnitState) -> Self {
        Self {
            id,
            source: source.into(),
            state,
            checks: Vec::new(),
            suggestions: 0,
            comments: 0,
            changed_at: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: u64,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub id: u64,
    pub name: String,
    pub project: u64,
    #[serde(default)]
    pub parent: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Component {
    pub id: u64,
    pub name: String,
    pub project: u64,
    #[serde(default)]
    pub category: Option<u64>,
}

/// A component translated into one language.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Translation {
    pub id: u64,
    pub component: u64,
    pub language: String,
    #[serde(default)]
    pub units: Vec<Unit>,
}

/// On-disk layout of a catalog: flat entity lists, parents before children.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct CatalogFile {
    #[serde(default)]
    pub projects: Vec<Project>,
    #[serde(default)]
    pub categories: Vec<Category>,
    #[serde(default)]
    pub components: Vec<Component>,
    #[serde(default)]
    pub translations: Vec<Translation>,
}

/// Child ids keyed by parent id. Empty sets are never kept.
type Index<K> = BTreeMap<K, BTreeSet<u64>>;

fn link<K: Ord>(index: &mut Index<K>, key: K, id: u64) {
    index.entry(key).or_default().insert(id);
}

fn unlink<K: Ord>(index: &mut Index<K>, key: &K, id: u64) {
    if let Some(ids) = index.get_mut(key) {
        ids.remove(&id);
        if ids.is_empty() {
            index.remove(key);
        }
    }
}

fn linked<'a, K: Ord>(index: &'a Index<K>, key: &K) -> impl Iterator<Item = u64> + 'a {
    index.get(key).into_iter().flatten().copied()
}

/// In-memory entity hierarchy.
///
/// Alongside the entity maps the catalog keeps child-id indices for every
/// edge, so hierarchy queries never scan unrelated entities.
#[derive(Debug, Default)]
pub struct Catalog {
    projects: BTreeMap<u64, Project>,
    categories: BTreeMap<u64, Category>,
    components: BTreeMap<u64, Component>,
    translations: BTreeMap<u64, Translation>,

    project_categories: Index<u64>,
    project_components: Index<u64>,
    subcategories: Index<u64>,
    category_components: Index<u64>,
    component_translations: Index<u64>,
    /// (project, language) -> translations
    language_translations: Index<(u64, String)>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a catalog from its file layout, validating every edge.
    ///
    /// Categories may be listed in any order; their parent links are
    /// attached once all of them exist so that cycles are still rejected.
    pub fn from_file_layout(file: CatalogFile) -> Result<Self> {
        let mut catalog = Catalog::new();

        for project in file.projects {
            catalog.add_project(project)?;
        }

        let mut parents = Vec::new();
        for mut category in file.categories {
            parents.push((category.id, category.parent.take()));
            catalog.add_category(category)?;
        }
        for (category, parent) in parents {
            catalog.set_category_parent(category, parent)?;
        }

        for component in file.components {
            catalog.add_component(component)?;
        }
        for translation in file.translations {
            catalog.add_translation(translation)?;
        }

        Ok(catalog)
    }

    /// Load a catalog from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read catalog file {}", path.display()))?;
        let file: CatalogFile = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse catalog file {}", path.display()))?;

        Ok(Self::from_file_layout(file)?)
    }

    // ==================== Mutations ====================

    pub fn add_project(&mut self, project: Project) -> Result<()> {
        if self.projects.contains_key(&project.id) {
            return Err(StatsError::DuplicateId {
                kind: "project",
                id: project.id,
            });
        }
        self.projects.insert(project.id, project);
        Ok(())
    }

    pub fn add_category(&mut self, category: Category) -> Result<()> {
        if self.categories.contains_key(&category.id) {
            return Err(StatsError::DuplicateId {
                kind: "category",
                id: category.id,
            });
        }
        self.require_project(category.project)?;

        let (id, project, parent) = (category.id, category.project, category.parent);
        self.categories.insert(id, Category {
            parent: None,
            ..category
        });
        link(&mut self.project_categories, project, id);

        if let Err(e) = self.set_category_parent(id, parent) {
            self.categories.remove(&id);
            unlink(&mut self.project_categories, &project, id);
            return Err(e);
        }
        Ok(())
    }

    /// Nest `category` under `parent` (or detach it with `None`).
    ///
    /// Rejected when the parent lives in another project or when the new
    /// edge would close a cycle; the catalog is left untouched in that case.
    /// Returns the previous parent.
    pub fn set_category_parent(&mut self, category: u64, parent: Option<u64>) -> Result<Option<u64>> {
        let current = self.require_category(category)?;
        let (project, previous) = (current.project, current.parent);

        if let Some(parent_id) = parent {
            let parent_category = self.require_category(parent_id)?;
            if parent_category.project != project {
                return Err(StatsError::ProjectMismatch {
                    category: parent_id,
                    expected: parent_category.project,
                    found: project,
                });
            }

            let mut cursor = Some(parent_id);
            while let Some(current) = cursor {
                if current == category {
                    return Err(StatsError::CategoryCycle {
                        category,
                        parent: parent_id,
                    });
                }
                cursor = self.categories.get(&current).and_then(|c| c.parent);
            }
        }

        if let Some(old) = previous {
            unlink(&mut self.subcategories, &old, category);
        }
        if let Some(new) = parent {
            link(&mut self.subcategories, new, category);
        }
        if let Some(entry) = self.categories.get_mut(&category) {
            entry.parent = parent;
        }
        Ok(previous)
    }

    pub fn add_component(&mut self, component: Component) -> Result<()> {
        if self.components.contains_key(&component.id) {
            return Err(StatsError::DuplicateId {
                kind: "component",
                id: component.id,
            });
        }
        self.require_project(component.project)?;
        if let Some(category_id) = component.category {
            let category = self.require_category(category_id)?;
            if category.project != component.project {
                return Err(StatsError::ProjectMismatch {
                    category: category_id,
                    expected: category.project,
                    found: component.project,
                });
            }
            link(&mut self.category_components, category_id, component.id);
        }
        link(&mut self.project_components, component.project, component.id);
        self.components.insert(component.id, component);
        Ok(())
    }

    pub fn add_translation(&mut self, translation: Translation) -> Result<()> {
        if self.translations.contains_key(&translation.id) {
            return Err(StatsError::DuplicateId {
                kind: "translation",
                id: translation.id,
            });
        }
        let project = self.require_component(translation.component)?.project;

        link(&mut self.component_translations, translation.component, translation.id);
        link(
            &mut self.language_translations,
            (project, translation.language.clone()),
            translation.id,
        );
        self.translations.insert(translation.id, translation);
        Ok(())
    }

    /// Remove the entity behind `scope` together with everything it
    /// contains, returning the scopes that no longer exist.
    ///
    /// Removing a project-language rollup removes every translation of that
    /// language in the project.
    pub fn remove(&mut self, scope: &ScopeId) -> Result<Vec<ScopeId>> {
        let removed = self.subtree(scope)?;

        for entry in &removed {
            match entry {
                ScopeId::Translation { id } => self.remove_translation(*id),
                ScopeId::Component { id } => self.remove_component(*id),
                ScopeId::Category { id } => self.remove_category(*id),
                ScopeId::Project { id } => {
                    self.projects.remove(id);
                }
                ScopeId::ProjectLanguage { .. } => {}
            }
        }
        Ok(removed)
    }

    fn remove_translation(&mut self, id: u64) {
        let Some(translation) = self.translations.remove(&id) else {
            return;
        };
        unlink(&mut self.component_translations, &translation.component, id);
        if let Some(project) = self.project_of_component(translation.component) {
            unlink(&mut self.language_translations, &(project, translation.language), id);
        }
    }

    fn remove_component(&mut self, id: u64) {
        let translations: Vec<u64> = linked(&self.component_translations, &id).collect();
        for translation in translations {
            self.remove_translation(translation);
        }
        if let Some(component) = self.components.remove(&id) {
            unlink(&mut self.project_components, &component.project, id);
            if let Some(category) = component.category {
                unlink(&mut self.category_components, &category, id);
            }
        }
    }

    fn remove_category(&mut self, id: u64) {
        if let Some(category) = self.categories.remove(&id) {
            unlink(&mut self.project_categories, &category.project, id);
            if let Some(parent) = category.parent {
                unlink(&mut self.subcategories, &parent, id);
            }
        }
    }

    /// Mutable access to the strings of a translation.
    pub fn units_mut(&mut self, translation: u64) -> Result<&mut Vec<Unit>> {
        self.translations
            .get_mut(&translation)
            .map(|t| &mut t.units)
            .ok_or(StatsError::UnknownScope(ScopeId::translation(translation)))
    }

    /// Change the state of one string, stamping its change time.
    ///
    /// Returns `false` when the translation has no string with that id.
    pub fn set_unit_state(&mut self, translation: u64, unit: u64, state: UnitState) -> Result<bool> {
        let units = self.units_mut(translation)?;
        match units.iter_mut().find(|u| u.id == unit) {
            Some(found) => {
                found.state = state;
                found.changed_at = Some(Utc::now());
                Ok(true)
            }
            None => Ok(false),
        }
    }

    // ==================== Queries ====================

    pub fn project(&self, id: u64) -> Option<&Project> {
        self.projects.get(&id)
    }

    pub fn translation(&self, id: u64) -> Option<&Translation> {
        self.translations.get(&id)
    }

    pub fn project_ids(&self) -> Vec<u64> {
        self.projects.keys().copied().collect()
    }

    pub fn components_of_project(&self, project: u64) -> Vec<u64> {
        linked(&self.project_components, &project).collect()
    }

    pub fn translations_of_component(&self, component: u64) -> Vec<u64> {
        linked(&self.component_translations, &component).collect()
    }

    pub fn categories_of_project(&self, project: u64) -> Vec<u64> {
        linked(&self.project_categories, &project).collect()
    }

    /// Language codes that have at least one translation in the project.
    pub fn languages_of_project(&self, project: u64) -> Vec<String> {
        self.language_translations
            .range((project, String::new())..)
            .take_while(|((owner, _), _)| *owner == project)
            .map(|((_, language), _)| language.clone())
            .collect()
    }

    /// Categories enclosing `category`, innermost first, excluding itself.
    fn category_ancestors(&self, category: u64) -> Vec<u64> {
        let mut chain = Vec::new();
        let mut cursor = self.categories.get(&category).and_then(|c| c.parent);
        while let Some(current) = cursor {
            chain.push(current);
            cursor = self.categories.get(&current).and_then(|c| c.parent);
        }
        chain
    }

    /// Nesting depth of a category; top-level categories have depth 0.
    pub fn category_depth(&self, category: u64) -> usize {
        self.category_ancestors(category).len()
    }

    fn project_of_component(&self, component: u64) -> Option<u64> {
        self.components.get(&component).map(|c| c.project)
    }

    /// Whether the scope names an existing entity.
    pub fn contains(&self, scope: &ScopeId) -> bool {
        match scope {
            ScopeId::Translation { id } => self.translations.contains_key(id),
            ScopeId::Component { id } => self.components.contains_key(id),
            ScopeId::Category { id } => self.categories.contains_key(id),
            ScopeId::Project { id } => self.projects.contains_key(id),
            ScopeId::ProjectLanguage { project, language } => self
                .language_translations
                .contains_key(&(*project, language.clone())),
        }
    }

    /// Scopes whose snapshots are summed into `scope`.
    ///
    /// A translation has no child scopes. A category sums its direct
    /// components and its direct child categories, so each component is
    /// counted exactly once along the chain.
    pub fn children(&self, scope: &ScopeId) -> Result<Vec<ScopeId>> {
        if !self.contains(scope) {
            return Err(StatsError::UnknownScope(scope.clone()));
        }

        let children = match scope {
            ScopeId::Translation { .. } => Vec::new(),
            ScopeId::Component { id } => linked(&self.component_translations, id)
                .map(ScopeId::translation)
                .collect(),
            ScopeId::Category { id } => linked(&self.subcategories, id)
                .map(ScopeId::category)
                .chain(linked(&self.category_components, id).map(ScopeId::component))
                .collect(),
            ScopeId::ProjectLanguage { project, language } => {
                linked(&self.language_translations, &(*project, language.clone()))
                    .map(ScopeId::translation)
                    .collect()
            }
            ScopeId::Project { id } => linked(&self.project_components, id)
                .map(ScopeId::component)
                .collect(),
        };
        Ok(children)
    }

    /// `scope` followed by every scope it contains, parents before children.
    ///
    /// Unlike `children`, this follows ownership: a project owns its
    /// categories and language rollups as well as its components.
    pub fn subtree(&self, scope: &ScopeId) -> Result<Vec<ScopeId>> {
        if !self.contains(scope) {
            return Err(StatsError::UnknownScope(scope.clone()));
        }

        let mut subtree = vec![scope.clone()];
        match scope {
            ScopeId::Translation { .. } => {}
            ScopeId::Component { id } => {
                subtree.extend(linked(&self.component_translations, id).map(ScopeId::translation));
            }
            ScopeId::Category { id } => {
                let mut pending = vec![*id];
                while let Some(category) = pending.pop() {
                    for component in linked(&self.category_components, &category) {
                        subtree.push(ScopeId::component(component));
                        subtree.extend(
                            linked(&self.component_translations, &component).map(ScopeId::translation),
                        );
                    }
                    for nested in linked(&self.subcategories, &category) {
                        subtree.push(ScopeId::category(nested));
                        pending.push(nested);
                    }
                }
            }
            ScopeId::ProjectLanguage { .. } => {
                subtree.extend(self.children(scope)?);
            }
            ScopeId::Project { id } => {
                subtree.extend(
                    self.languages_of_project(*id)
                        .into_iter()
                        .map(|language| ScopeId::project_language(*id, language)),
                );
                subtree.extend(linked(&self.project_categories, id).map(ScopeId::category));
                for component in linked(&self.project_components, id) {
                    subtree.push(ScopeId::component(component));
                    subtree.extend(
                        linked(&self.component_translations, &component).map(ScopeId::translation),
                    );
                }
            }
        }
        Ok(subtree)
    }

    /// Scopes that aggregate `scope`, ordered so every scope comes after
    /// all of its own children in the list.
    ///
    /// For a translation: its component, the component's categories
    /// innermost first, the project-language rollup, then the project.
    /// Project and project-language scopes have no ancestors.
    pub fn ancestors(&self, scope: &ScopeId) -> Result<Vec<ScopeId>> {
        let not_found = || StatsError::UnknownScope(scope.clone());

        let mut ancestors = Vec::new();
        match scope {
            ScopeId::Translation { id } => {
                let translation = self.translations.get(id).ok_or_else(not_found)?;
                let component = self
                    .components
                    .get(&translation.component)
                    .ok_or_else(not_found)?;

                ancestors.push(ScopeId::component(component.id));
                if let Some(category) = component.category {
                    ancestors.push(ScopeId::category(category));
                    ancestors.extend(self.category_ancestors(category).into_iter().map(ScopeId::category));
                }
                ancestors.push(ScopeId::project_language(
                    component.project,
                    translation.language.clone(),
                ));
                ancestors.push(ScopeId::project(component.project));
            }
            ScopeId::Component { id } => {
                let component = self.components.get(id).ok_or_else(not_found)?;
                if let Some(category) = component.category {
                    ancestors.push(ScopeId::category(category));
                    ancestors.extend(self.category_ancestors(category).into_iter().map(ScopeId::category));
                }
                // Language rollups read the same translations the component does
                let languages: BTreeSet<&str> = linked(&self.component_translations, id)
                    .filter_map(|t| self.translations.get(&t))
                    .map(|t| t.language.as_str())
                    .collect();
                ancestors.extend(
                    languages
                        .into_iter()
                        .map(|language| ScopeId::project_language(component.project, language)),
                );
                ancestors.push(ScopeId::project(component.project));
            }
            ScopeId::Category { id } => {
                let category = self.categories.get(id).ok_or_else(not_found)?;
                ancestors.extend(self.category_ancestors(*id).into_iter().map(ScopeId::category));
                ancestors.push(ScopeId::project(category.project));
            }
            ScopeId::ProjectLanguage { .. } | ScopeId::Project { .. } => {
                if !self.contains(scope) {
                    return Err(not_found());
                }
            }
        }
        Ok(ancestors)
    }

    fn require_project(&self, id: u64) -> Result<&Project> {
        self.projects
            .get(&id)
            .ok_or(StatsError::UnknownScope(ScopeId::project(id)))
    }

    fn require_category(&self, id: u64) -> Result<&Category> {
        self.categories
            .get(&id)
            .ok_or(StatsError::UnknownScope(ScopeId::category(id)))
    }

    fn require_component(&self, id: u64) -> Result<&Component> {
        self.components
            .get(&id)
            .ok_or(StatsError::UnknownScope(ScopeId::component(id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn project(id: u64) -> Project {
        Project {
            id,
            name: format!("project-{}", id),
        }
    }

    fn category(id: u64, project: u64, parent: Option<u64>) -> Category {
        Category {
            id,
            name: format!("category-{}", id),
            project,
            parent,
        }
    }

    fn component(id: u64, project: u64, category: Option<u64>) -> Component {
        Component {
            id,
            name: format!("component-{}", id),
            project,
            category,
        }
    }

    fn translation(id: u64, component: u64, language: &str) -> Translation {
        Translation {
            id,
            component,
            language: language.to_string(),
            units: vec![Unit::new(1, "Hello world", UnitState::Empty)],
        }
    }

    /// project 1 > category 10 > category 11 > component 100 > translations 1000 (cs), 1001 (de)
    fn nested_catalog() -> Catalog {
        let mut catalog = Catalog::new();
        catalog.add_project(project(1)).unwrap();
        catalog.add_category(category(10, 1, None)).unwrap();
        catalog.add_category(category(11, 1, Some(10))).unwrap();
        catalog.add_component(component(100, 1, Some(11))).unwrap();
        catalog.add_translation(translation(1000, 100, "cs")).unwrap();
        catalog.add_translation(translation(1001, 100, "de")).unwrap();
        catalog
    }

    // ==================== Hierarchy Tests ====================

    #[test]
    fn test_translation_ancestors_child_before_parent() {
        let catalog = nested_catalog();
        let ancestors = catalog.ancestors(&ScopeId::translation(1000)).unwrap();

        assert_eq!(
            ancestors,
            vec![
                ScopeId::component(100),
                ScopeId::category(11),
                ScopeId::category(10),
                ScopeId::project_language(1, "cs"),
                ScopeId::project(1),
            ]
        );
    }

    #[test]
    fn test_component_ancestors_include_its_languages() {
        let catalog = nested_catalog();
        let ancestors = catalog.ancestors(&ScopeId::component(100)).unwrap();

        assert_eq!(
            ancestors,
            vec![
                ScopeId::category(11),
                ScopeId::category(10),
                ScopeId::project_language(1, "cs"),
                ScopeId::project_language(1, "de"),
                ScopeId::project(1),
            ]
        );
    }

    #[test]
    fn test_project_has_no_ancestors() {
        let catalog = nested_catalog();
        assert!(catalog.ancestors(&ScopeId::project(1)).unwrap().is_empty());
    }

    #[test]
    fn test_children_of_each_scope() {
        let catalog = nested_catalog();

        assert_eq!(
            catalog.children(&ScopeId::component(100)).unwrap(),
            vec![ScopeId::translation(1000), ScopeId::translation(1001)]
        );
        assert_eq!(
            catalog.children(&ScopeId::category(10)).unwrap(),
            vec![ScopeId::category(11)]
        );
        assert_eq!(
            catalog.children(&ScopeId::category(11)).unwrap(),
            vec![ScopeId::component(100)]
        );
        assert_eq!(
            catalog.children(&ScopeId::project(1)).unwrap(),
            vec![ScopeId::component(100)]
        );
        assert_eq!(
            catalog.children(&ScopeId::project_language(1, "de")).unwrap(),
            vec![ScopeId::translation(1001)]
        );
        assert!(catalog.children(&ScopeId::translation(1000)).unwrap().is_empty());
    }

    #[test]
    fn test_unknown_scope_is_error() {
        let catalog = nested_catalog();

        assert!(matches!(
            catalog.children(&ScopeId::component(999)),
            Err(StatsError::UnknownScope(_))
        ));
        assert!(matches!(
            catalog.ancestors(&ScopeId::translation(999)),
            Err(StatsError::UnknownScope(_))
        ));
        assert!(!catalog.contains(&ScopeId::project_language(1, "fr")));
    }

    #[test]
    fn test_languages_of_project_sorted_and_unique() {
        let mut catalog = nested_catalog();
        catalog.add_component(component(101, 1, None)).unwrap();
        catalog.add_translation(translation(1002, 101, "cs")).unwrap();

        assert_eq!(catalog.languages_of_project(1), vec!["cs", "de"]);
    }

    // ==================== Category Nesting Tests ====================

    #[test]
    fn test_category_cycle_rejected() {
        let mut catalog = nested_catalog();

        let result = catalog.set_category_parent(10, Some(11));
        assert!(matches!(
            result,
            Err(StatsError::CategoryCycle {
                category: 10,
                parent: 11
            })
        ));

        // Existing nesting is untouched
        assert_eq!(catalog.category_depth(11), 1);
        assert_eq!(catalog.category_depth(10), 0);
    }

    #[test]
    fn test_category_self_parent_rejected() {
        let mut catalog = nested_catalog();
        assert!(matches!(
            catalog.set_category_parent(11, Some(11)),
            Err(StatsError::CategoryCycle { .. })
        ));
    }

    #[test]
    fn test_category_cross_project_parent_rejected() {
        let mut catalog = nested_catalog();
        catalog.add_project(project(2)).unwrap();

        let result = catalog.add_category(category(20, 2, Some(10)));
        assert!(matches!(result, Err(StatsError::ProjectMismatch { .. })));
        assert!(!catalog.contains(&ScopeId::category(20)));
    }

    #[test]
    fn test_category_detach() {
        let mut catalog = nested_catalog();
        catalog.set_category_parent(11, None).unwrap();
        assert_eq!(catalog.category_depth(11), 0);
    }

    #[test]
    fn test_file_layout_rejects_cycle_in_any_order() {
        let file = CatalogFile {
            projects: vec![project(1)],
            categories: vec![category(10, 1, Some(11)), category(11, 1, Some(10))],
            components: Vec::new(),
            translations: Vec::new(),
        };

        assert!(matches!(
            Catalog::from_file_layout(file),
            Err(StatsError::CategoryCycle { .. })
        ));
    }

    #[test]
    fn test_file_layout_accepts_child_listed_before_parent() {
        let file = CatalogFile {
            projects: vec![project(1)],
            categories: vec![category(11, 1, Some(10)), category(10, 1, None)],
            components: vec![component(100, 1, Some(11))],
            translations: vec![translation(1000, 100, "cs")],
        };

        let catalog = Catalog::from_file_layout(file).unwrap();
        assert_eq!(catalog.category_depth(11), 1);
    }

    #[test]
    fn test_set_category_parent_moves_child_index() {
        let mut catalog = nested_catalog();
        catalog.add_category(category(12, 1, None)).unwrap();

        let previous = catalog.set_category_parent(11, Some(12)).unwrap();
        assert_eq!(previous, Some(10));
        assert!(catalog.children(&ScopeId::category(10)).unwrap().is_empty());
        assert_eq!(
            catalog.children(&ScopeId::category(12)).unwrap(),
            vec![ScopeId::category(11)]
        );
    }

    // ==================== Removal Tests ====================

    #[test]
    fn test_remove_component_takes_its_translations() {
        let mut catalog = nested_catalog();
        catalog.add_component(component(101, 1, None)).unwrap();
        catalog.add_translation(translation(1002, 101, "cs")).unwrap();

        let removed = catalog.remove(&ScopeId::component(100)).unwrap();
        assert_eq!(
            removed,
            vec![
                ScopeId::component(100),
                ScopeId::translation(1000),
                ScopeId::translation(1001),
            ]
        );

        assert!(catalog.translation(1000).is_none());
        assert!(catalog.children(&ScopeId::category(11)).unwrap().is_empty());
        assert_eq!(catalog.components_of_project(1), vec![101]);
        // "de" only lived in the removed component
        assert_eq!(catalog.languages_of_project(1), vec!["cs"]);
        assert!(!catalog.contains(&ScopeId::project_language(1, "de")));
    }

    #[test]
    fn test_remove_category_takes_nested_content() {
        let mut catalog = nested_catalog();
        catalog.add_component(component(101, 1, Some(10))).unwrap();
        catalog.add_component(component(102, 1, None)).unwrap();

        let removed = catalog.remove(&ScopeId::category(10)).unwrap();
        assert!(removed.contains(&ScopeId::category(11)));
        assert!(removed.contains(&ScopeId::component(100)));
        assert!(removed.contains(&ScopeId::component(101)));
        assert!(removed.contains(&ScopeId::translation(1001)));

        assert!(catalog.categories_of_project(1).is_empty());
        assert_eq!(catalog.components_of_project(1), vec![102]);
        assert!(catalog.languages_of_project(1).is_empty());
    }

    #[test]
    fn test_remove_project_language_takes_its_translations() {
        let mut catalog = nested_catalog();

        let removed = catalog.remove(&ScopeId::project_language(1, "cs")).unwrap();
        assert_eq!(
            removed,
            vec![
                ScopeId::project_language(1, "cs"),
                ScopeId::translation(1000),
            ]
        );
        assert_eq!(catalog.translations_of_component(100), vec![1001]);
    }

    #[test]
    fn test_remove_project_clears_everything() {
        let mut catalog = nested_catalog();
        catalog.add_project(project(2)).unwrap();

        let removed = catalog.remove(&ScopeId::project(1)).unwrap();
        assert_eq!(removed.len(), 8);
        assert!(removed.contains(&ScopeId::project_language(1, "de")));

        assert_eq!(catalog.project_ids(), vec![2]);
        assert!(!catalog.contains(&ScopeId::category(10)));
        assert!(!catalog.contains(&ScopeId::translation(1001)));
        assert!(catalog.remove(&ScopeId::project(1)).is_err());
    }

    // ==================== Registration Tests ====================

    #[test]
    fn test_duplicate_ids_rejected() {
        let mut catalog = nested_catalog();
        assert!(matches!(
            catalog.add_project(project(1)),
            Err(StatsError::DuplicateId { kind: "project", id: 1 })
        ));
        assert!(matches!(
            catalog.add_translation(translation(1000, 100, "fr")),
            Err(StatsError::DuplicateId { .. })
        ));
    }

    #[test]
    fn test_translation_requires_component() {
        let mut catalog = nested_catalog();
        assert!(catalog.add_translation(translation(2000, 555, "cs")).is_err());
    }

    #[test]
    fn test_set_unit_state_stamps_change() {
        let mut catalog = nested_catalog();

        assert!(catalog.set_unit_state(1000, 1, UnitState::Translated).unwrap());
        let unit = &catalog.translation(1000).unwrap().units[0];
        assert_eq!(unit.state, UnitState::Translated);
        assert!(unit.changed_at.is_some());

        assert!(!catalog.set_unit_state(1000, 42, UnitState::Fuzzy).unwrap());
        assert!(catalog.set_unit_state(4242, 1, UnitState::Fuzzy).is_err());
    }

    #[test]
    fn test_unit_state_translated_flavours() {
        assert!(UnitState::Translated.is_translated());
        assert!(UnitState::Approved.is_translated());
        assert!(UnitState::ReadOnly.is_translated());
        assert!(!UnitState::Fuzzy.is_translated());
        assert!(!UnitState::Empty.is_translated());
    }

    #[test]
    fn test_catalog_file_parses_minimal_json() {
        let json = r#"{
            "projects": [{"id": 1, "name": "Demo"}],
            "components": [{"id": 2, "name": "UI", "project": 1}],
            "translations": [{
                "id": 3, "component": 2, "language": "cs",
                "units": [{"id": 1, "source": "Save file", "state": "fuzzy"}]
            }]
        }"#;

        let file: CatalogFile = serde_json::from_str(json).expect("parse");
        let catalog = Catalog::from_file_layout(file).expect("build");
        assert_eq!(catalog.translation(3).unwrap().units[0].state, UnitState::Fuzzy);
    }
}
