//! Example queries shipped with the tool and queries bookmarked by the user.

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SavedQuery {
    pub name: String,
    pub query: String,
    pub description: Option<String>,
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub last_used: Option<DateTime<Utc>>,
    #[serde(default)]
    pub is_builtin: bool,
}

impl SavedQuery {
    pub fn bookmark(name: impl Into<String>, query: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            query: query.into(),
            description: None,
            tags: Vec::new(),
            created_at: Utc::now(),
            last_used: None,
            is_builtin: false,
        }
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t.eq_ignore_ascii_case(tag))
    }
}

/// Groups the `examples` command lists, in display order.
pub const EXAMPLE_GROUPS: [(&str, &str); 3] = [
    ("commit", "Commit Queries"),
    ("diff", "Diff Queries"),
    ("content", "Diff Content Queries"),
];

pub fn load_bookmarks() -> Result<Vec<SavedQuery>> {
    load_bookmarks_from(&bookmark_path()?)
}

pub fn load_bookmarks_from(path: &Path) -> Result<Vec<SavedQuery>> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let data = std::fs::read_to_string(path)?;
    let bookmarks: Vec<SavedQuery> = serde_json::from_str(&data)?;
    Ok(bookmarks)
}

pub fn save_bookmarks(bookmarks: &[SavedQuery]) -> Result<()> {
    save_bookmarks_to(&bookmark_path()?, bookmarks)
}

pub fn save_bookmarks_to(path: &Path, bookmarks: &[SavedQuery]) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    // Only save non-builtin bookmarks
    let user_bookmarks: Vec<&SavedQuery> = bookmarks.iter().filter(|b| !b.is_builtin).collect();
    let data = serde_json::to_string_pretty(&user_bookmarks)?;
    std::fs::write(path, data)?;
    Ok(())
}

/// Add `bookmark`, replacing any user bookmark with the same name
/// (case-insensitive). Returns true when an existing one was replaced.
pub fn upsert_bookmark(bookmarks: &mut Vec<SavedQuery>, bookmark: SavedQuery) -> bool {
    match bookmarks
        .iter_mut()
        .find(|b| !b.is_builtin && b.name.eq_ignore_ascii_case(&bookmark.name))
    {
        Some(existing) => {
            *existing = bookmark;
            true
        }
        None => {
            bookmarks.push(bookmark);
            false
        }
    }
}

fn bookmark_path() -> Result<PathBuf> {
    let config_dir = dirs::config_dir()
        .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;
    Ok(config_dir.join("gitlinq").join("bookmarks.json"))
}

fn example(query: &str, description: &str, tag: &str, now: DateTime<Utc>) -> SavedQuery {
    SavedQuery {
        name: description.to_string(),
        query: query.to_string(),
        description: Some(description.to_string()),
        tags: vec![tag.to_string()],
        created_at: now,
        last_used: None,
        is_builtin: true,
    }
}

pub fn built_in_snippets() -> Vec<SavedQuery> {
    let now = Utc::now();
    let commit = |q: &str, d: &str| example(q, d, "commit", now);
    let diff = |q: &str, d: &str| example(q, d, "diff", now);
    let content = |q: &str, d: &str| example(q, d, "content", now);
    vec![
        commit("Commits", "Get all commits"),
        commit("Commits.Take(10)", "Get the first 10 commits"),
        commit("Commits.Skip(5).Take(10)", "Pagination: skip 5, take 10"),
        commit("Commits.First()", "Get the most recent commit"),
        commit("Commits.Count()", "Count total commits"),
        commit(
            "Commits.Where(c => c.Message.Contains(\"fix\"))",
            "Find commits with 'fix' in message",
        ),
        commit(
            "Commits.Where(c => c.AuthorName.Contains(\"Alice\"))",
            "Find commits by author",
        ),
        commit(
            "Commits.Where(c => c.Message.StartsWith(\"feat\"))",
            "Find commits starting with 'feat'",
        ),
        commit(
            "Commits.First(c => c.Message.Contains(\"bug\"))",
            "Find first commit mentioning 'bug'",
        ),
        commit(
            "Commits.Any(c => c.Message.Contains(\"hotfix\"))",
            "Check if any hotfix commits exist",
        ),
        commit(
            "Commits.Count(c => c.AuthorName.Contains(\"Bob\"))",
            "Count commits by Bob",
        ),
        diff(
            "Commits.Where(c => c.Diff.FilesChanged > 5)",
            "Commits that changed more than 5 files",
        ),
        diff(
            "Commits.Where(c => c.Diff.TotalLinesAdded > 100)",
            "Commits with more than 100 lines added",
        ),
        diff(
            "Commits.Where(c => c.Diff.Files.Any(f => f.Path.Contains(\".rs\")))",
            "Commits that modified Rust files",
        ),
        diff(
            "Commits.First().Diff.Files",
            "Get files changed in the most recent commit",
        ),
        diff(
            "Commits.Where(c => c.Diff.Files.Any(f => f.Status == \"Added\"))",
            "Commits that added new files",
        ),
        content(
            "Commits.Where(c => c.Diff.Files.Any(f => f.AddedContains(\"TODO\")))",
            "Find commits that added 'TODO'",
        ),
        content(
            "Commits.Where(c => c.Diff.Files.Any(f => f.DeletedContains(\"bug\")))",
            "Find commits that removed 'bug'",
        ),
        content(
            "Commits.Where(c => c.Diff.Files.Any(f => f.ContentContains(\"password\")))",
            "Find commits that touched 'password'",
        ),
        content(
            "Commits.First().Diff.Files.First().AddedContent",
            "View added lines in most recent file change",
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{compile_query, run_query};
    use crate::model::fixtures;

    #[test]
    fn test_built_in_snippets_are_marked_builtin() {
        let snippets = built_in_snippets();
        assert_eq!(snippets.len(), 20);
        for snippet in snippets {
            assert!(snippet.is_builtin);
            assert!(snippet.description.is_some());
            assert_eq!(snippet.tags.len(), 1);
        }
    }

    #[test]
    fn test_every_group_has_examples() {
        let snippets = built_in_snippets();
        for (tag, _) in EXAMPLE_GROUPS {
            assert!(snippets.iter().any(|s| s.has_tag(tag)), "no examples for {}", tag);
        }
    }

    #[test]
    fn test_built_in_snippets_compile() {
        let root = fixtures::root();
        for snippet in built_in_snippets() {
            assert!(
                compile_query(&snippet.query, &root).is_ok(),
                "example does not compile: {}",
                snippet.query
            );
        }
    }

    #[test]
    fn test_examples_against_known_commits() {
        let root = fixtures::root();
        let count = |q: &str| run_query(q, &root).unwrap();
        assert_eq!(count("Commits.Count(c => c.AuthorName.Contains(\"Bob\"))").as_i64(), Some(2));
        assert_eq!(count("Commits.Any(c => c.Message.Contains(\"hotfix\"))").as_bool(), Some(false));
        let todo = count("Commits.Where(c => c.Diff.Files.Any(f => f.AddedContains(\"TODO\")))");
        assert_eq!(todo.as_sequence().map(|s| s.len()), Some(1));
    }

    #[test]
    fn test_saved_query_default_builtin() {
        let json = r#"{"name":"Test","query":"Commits.Count()","description":null,"tags":[],"created_at":"2024-01-01T00:00:00Z","last_used":null}"#;
        let query: SavedQuery = serde_json::from_str(json).unwrap();
        assert!(!query.is_builtin);
    }

    #[test]
    fn test_save_skips_builtins() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bookmarks.json");
        let mut bookmarks = built_in_snippets();
        bookmarks.push(SavedQuery::bookmark("fixes", "Commits.Where(c => c.Message.Contains(\"fix\"))"));
        save_bookmarks_to(&path, &bookmarks).unwrap();

        let loaded = load_bookmarks_from(&path).unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].name, "fixes");
        assert!(!loaded[0].is_builtin);
    }

    #[test]
    fn test_upsert_replaces_by_name() {
        let mut bookmarks = vec![SavedQuery::bookmark("recent", "Commits.Take(5)")];
        assert!(upsert_bookmark(&mut bookmarks, SavedQuery::bookmark("RECENT", "Commits.Take(3)")));
        assert_eq!(bookmarks.len(), 1);
        assert_eq!(bookmarks[0].query, "Commits.Take(3)");
        assert!(!upsert_bookmark(&mut bookmarks, SavedQuery::bookmark("count", "Commits.Count()")));
        assert_eq!(bookmarks.len(), 2);
    }

    #[test]
    fn test_load_missing_bookmarks_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_bookmarks_from(&dir.path().join("none.json")).unwrap().is_empty());
    }
}
