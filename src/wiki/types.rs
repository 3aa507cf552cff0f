//! Wiki data model
//!
//! Sections and related pages refer to pages by id. Lookups go through
//! [`StructureIndex`], so there are no owning back-references and cycles in
//! `related_pages` are harmless.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

use crate::constants::cache::SCHEMA_VERSION;
use crate::snapshot::RepoSnapshot;
use crate::types::RepoIdentity;

/// Page importance as assigned at structure-generation time
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Default)]
#[serde(rename_all = "lowercase")]
pub enum Importance {
    Low,
    #[default]
    Medium,
    High,
}

impl Importance {
    pub fn as_str(&self) -> &'static str {
        match self {
            Importance::High => "high",
            Importance::Medium => "medium",
            Importance::Low => "low",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "high" => Importance::High,
            "low" => Importance::Low,
            _ => Importance::Medium,
        }
    }
}

impl std::fmt::Display for Importance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One generated document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WikiPage {
    /// Stable slug; assigned once, never recomputed
    pub id: String,
    pub title: String,
    /// Markdown body, empty until generated
    #[serde(default)]
    pub content: String,
    /// Repository files this page depends on
    #[serde(default)]
    pub file_paths: Vec<String>,
    #[serde(default)]
    pub importance: Importance,
    /// Non-owning references; may form cycles
    #[serde(default)]
    pub related_pages: Vec<String>,
}

impl WikiPage {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            content: String::new(),
            file_paths: Vec::new(),
            importance: Importance::default(),
            related_pages: Vec::new(),
        }
    }

    pub fn with_files<I, S>(mut self, files: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.file_paths = files.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = content.into();
        self
    }

    pub fn with_importance(mut self, importance: Importance) -> Self {
        self.importance = importance;
        self
    }

    pub fn with_related<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.related_pages = ids.into_iter().map(Into::into).collect();
        self
    }

    pub fn is_generated(&self) -> bool {
        !self.content.trim().is_empty()
    }
}

/// Grouping of pages in the table of contents
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WikiSection {
    pub id: String,
    pub title: String,
    /// Page ids
    #[serde(default)]
    pub pages: Vec<String>,
    /// Section ids
    #[serde(default)]
    pub subsections: Vec<String>,
}

/// Generated table of contents
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WikiStructureModel {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub pages: Vec<WikiPage>,
    #[serde(default)]
    pub sections: Vec<WikiSection>,
    #[serde(default)]
    pub root_sections: Vec<String>,
}

impl WikiStructureModel {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            description: String::new(),
            pages: Vec::new(),
            sections: Vec::new(),
            root_sections: Vec::new(),
        }
    }

    pub fn page(&self, id: &str) -> Option<&WikiPage> {
        self.pages.iter().find(|p| p.id == id)
    }

    pub fn page_ids(&self) -> impl Iterator<Item = &str> {
        self.pages.iter().map(|p| p.id.as_str())
    }

    /// Build the id lookup table for this structure
    pub fn index(&self) -> StructureIndex<'_> {
        StructureIndex::new(self)
    }
}

/// Explicit id → object lookup over a structure
pub struct StructureIndex<'a> {
    pages: HashMap<&'a str, &'a WikiPage>,
    sections: HashMap<&'a str, &'a WikiSection>,
    page_sections: HashMap<&'a str, Vec<&'a str>>,
}

impl<'a> StructureIndex<'a> {
    pub fn new(structure: &'a WikiStructureModel) -> Self {
        let pages = structure
            .pages
            .iter()
            .map(|p| (p.id.as_str(), p))
            .collect();
        let sections = structure
            .sections
            .iter()
            .map(|s| (s.id.as_str(), s))
            .collect();
        let mut page_sections: HashMap<&str, Vec<&str>> = HashMap::new();
        for section in &structure.sections {
            for page_id in &section.pages {
                page_sections
                    .entry(page_id.as_str())
                    .or_default()
                    .push(section.id.as_str());
            }
        }
        Self {
            pages,
            sections,
            page_sections,
        }
    }

    pub fn page(&self, id: &str) -> Option<&'a WikiPage> {
        self.pages.get(id).copied()
    }

    pub fn section(&self, id: &str) -> Option<&'a WikiSection> {
        self.sections.get(id).copied()
    }

    /// Sections listing the page (zero or more)
    pub fn sections_of(&self, page_id: &str) -> &[&'a str] {
        self.page_sections
            .get(page_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Related pages that actually exist in the structure
    pub fn related(&self, page_id: &str) -> Vec<&'a WikiPage> {
        self.page(page_id)
            .map(|p| {
                p.related_pages
                    .iter()
                    .filter_map(|id| self.page(id))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Page ids in table-of-contents order: root sections depth-first, then
    /// pages not reachable from any section.
    pub fn ordered_page_ids(&self, structure: &'a WikiStructureModel) -> Vec<&'a str> {
        let mut ordered = Vec::new();
        let mut seen = std::collections::HashSet::new();
        let mut visited_sections = std::collections::HashSet::new();
        let mut stack: Vec<&str> = structure
            .root_sections
            .iter()
            .rev()
            .map(String::as_str)
            .collect();

        while let Some(section_id) = stack.pop() {
            if !visited_sections.insert(section_id) {
                continue;
            }
            let Some(section) = self.section(section_id) else {
                continue;
            };
            for page_id in &section.pages {
                if self.pages.contains_key(page_id.as_str()) && seen.insert(page_id.as_str()) {
                    ordered.push(page_id.as_str());
                }
            }
            for sub in section.subsections.iter().rev() {
                stack.push(sub.as_str());
            }
        }

        for page in &structure.pages {
            if seen.insert(page.id.as_str()) {
                ordered.push(page.id.as_str());
            }
        }
        ordered
    }
}

/// The persisted unit: structure, generated pages and the snapshot they
/// were produced from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WikiCacheData {
    pub repo: RepoIdentity,
    pub language: String,
    pub version: u32,
    pub structure: WikiStructureModel,
    pub generated_pages: BTreeMap<String, WikiPage>,
    #[serde(default)]
    pub snapshot: Option<RepoSnapshot>,
    pub generated_at: DateTime<Utc>,
}

impl WikiCacheData {
    /// Fresh cache data at the current schema version
    pub fn new(repo: RepoIdentity, language: impl Into<String>, structure: WikiStructureModel) -> Self {
        Self {
            repo,
            language: language.into(),
            version: SCHEMA_VERSION,
            structure,
            generated_pages: BTreeMap::new(),
            snapshot: None,
            generated_at: Utc::now(),
        }
    }

    pub fn with_snapshot(mut self, snapshot: RepoSnapshot) -> Self {
        self.snapshot = Some(snapshot);
        self
    }

    /// Insert or replace a generated page
    pub fn upsert_page(&mut self, page: WikiPage) {
        self.generated_pages.insert(page.id.clone(), page);
    }

    /// Page as it should be displayed: generated content if present,
    /// otherwise the structure's placeholder.
    pub fn page(&self, id: &str) -> Option<&WikiPage> {
        self.generated_pages
            .get(id)
            .or_else(|| self.structure.page(id))
    }

    /// Store regenerated pages and record the snapshot they reflect.
    ///
    /// Pages not in `pages` keep their previous content.
    pub fn apply_regenerated<I>(&mut self, pages: I, snapshot: RepoSnapshot)
    where
        I: IntoIterator<Item = WikiPage>,
    {
        for page in pages {
            self.upsert_page(page);
        }
        self.snapshot = Some(snapshot);
        self.generated_at = Utc::now();
    }

    /// Explicitly remove a page from the structure, its sections, related
    /// links and generated content. Change detection never calls this.
    pub fn remove_page(&mut self, id: &str) -> bool {
        let before = self.structure.pages.len();
        self.structure.pages.retain(|p| p.id != id);
        let removed = self.structure.pages.len() != before || self.generated_pages.contains_key(id);

        for section in &mut self.structure.sections {
            section.pages.retain(|p| p != id);
        }
        for page in &mut self.structure.pages {
            page.related_pages.retain(|p| p != id);
        }
        for page in self.generated_pages.values_mut() {
            page.related_pages.retain(|p| p != id);
        }
        self.generated_pages.remove(id);
        removed
    }

    /// Pages from the structure that have no generated content yet
    pub fn missing_pages(&self) -> Vec<&str> {
        self.structure
            .page_ids()
            .filter(|id| {
                self.generated_pages
                    .get(*id)
                    .is_none_or(|p| !p.is_generated())
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RepoType;

    fn structure() -> WikiStructureModel {
        let mut s = WikiStructureModel::new("wiki", "Demo");
        s.pages = vec![
            WikiPage::new("overview", "Overview").with_related(["arch"]),
            WikiPage::new("arch", "Architecture").with_related(["overview"]),
            WikiPage::new("orphan", "Orphan"),
        ];
        s.sections = vec![
            WikiSection {
                id: "intro".into(),
                title: "Intro".into(),
                pages: vec!["overview".into()],
                subsections: vec!["design".into()],
            },
            WikiSection {
                id: "design".into(),
                title: "Design".into(),
                pages: vec!["arch".into(), "overview".into()],
                subsections: vec![],
            },
        ];
        s.root_sections = vec!["intro".into()];
        s
    }

    #[test]
    fn test_index_lookups() {
        let s = structure();
        let index = s.index();
        assert_eq!(index.page("arch").unwrap().title, "Architecture");
        assert_eq!(index.sections_of("overview"), &["intro", "design"]);
        assert!(index.sections_of("orphan").is_empty());
        assert_eq!(index.related("overview")[0].id, "arch");
    }

    #[test]
    fn test_ordered_page_ids_handles_cycles() {
        let mut s = structure();
        s.sections[1].subsections.push("intro".into());
        let index = s.index();
        assert_eq!(index.ordered_page_ids(&s), vec!["overview", "arch", "orphan"]);
    }

    #[test]
    fn test_remove_page_is_explicit_and_complete() {
        let repo = RepoIdentity::new("o", "r", RepoType::Github);
        let mut data = WikiCacheData::new(repo, "en", structure());
        data.upsert_page(WikiPage::new("arch", "Architecture").with_content("body"));

        assert!(data.remove_page("arch"));
        assert!(data.structure.page("arch").is_none());
        assert!(!data.generated_pages.contains_key("arch"));
        assert!(data.structure.sections[1].pages.iter().all(|p| p != "arch"));
        assert!(data.structure.page("overview").unwrap().related_pages.is_empty());
        assert!(!data.remove_page("arch"));
    }

    #[test]
    fn test_missing_pages() {
        let repo = RepoIdentity::new("o", "r", RepoType::Github);
        let mut data = WikiCacheData::new(repo, "en", structure());
        data.upsert_page(WikiPage::new("overview", "Overview").with_content("# hi"));
        assert_eq!(data.missing_pages(), vec!["arch", "orphan"]);
    }

    #[test]
    fn test_importance_parse() {
        assert_eq!(Importance::parse("HIGH"), Importance::High);
        assert_eq!(Importance::parse("whatever"), Importance::Medium);
    }
}
