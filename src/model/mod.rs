//! Records exposed to queries: commits, their diffs and changed files.

mod commit;
mod diff;

pub use commit::{commit_type, CommitInfo};
pub use diff::{
    diff_type, file_change_type, ChangeStatus, DiffData, DiffLine, FileChange, LineKind,
    MatchedLine,
};

#[cfg(test)]
pub(crate) mod fixtures {
    use std::rc::Rc;

    use chrono::{DateTime, FixedOffset, TimeZone};

    use super::*;
    use crate::engine::RootSource;

    pub fn date(day: u32) -> DateTime<FixedOffset> {
        FixedOffset::east_opt(0)
            .and_then(|tz| tz.with_ymd_and_hms(2025, 1, day, 10, 0, 0).single())
            .unwrap()
    }

    pub fn commit(sha: &str, author: &str, message: &str, day: u32) -> CommitInfo {
        commit_with_files(sha, author, message, day, Vec::new())
    }

    pub fn commit_with_files(
        sha: &str,
        author: &str,
        message: &str,
        day: u32,
        files: Vec<FileChange>,
    ) -> CommitInfo {
        let email = format!("{}@example.com", author.to_lowercase());
        CommitInfo {
            sha: sha.to_string(),
            message: message.to_string(),
            author_name: author.to_string(),
            author_email: email.clone(),
            author_when: date(day),
            committer_name: author.to_string(),
            committer_email: email,
            committer_when: date(day),
            diff: Rc::new(DiffData::new(files)),
        }
    }

    /// Five commits, newest last, with small diffs.
    pub fn five_commits() -> Vec<CommitInfo> {
        vec![
            commit_with_files(
                "abc1234",
                "Alice",
                "Initial commit",
                1,
                vec![
                    FileChange::new("README.md", ChangeStatus::Added)
                        .with_lines(vec![DiffLine::added("# Project")]),
                    FileChange::new("src/main.rs", ChangeStatus::Added).with_lines(vec![
                        DiffLine::added("fn main() {"),
                        DiffLine::added("}"),
                    ]),
                ],
            ),
            commit_with_files(
                "def5678",
                "Bob",
                "Add feature X",
                2,
                vec![FileChange::new("src/feature.rs", ChangeStatus::Added).with_lines(vec![
                    DiffLine::added("pub fn feature_x() {}"),
                    DiffLine::added("// TODO: handle errors"),
                ])],
            ),
            commit_with_files(
                "ghi9012",
                "Alice",
                "Fix bug in feature X",
                3,
                vec![FileChange::new("src/feature.rs", ChangeStatus::Modified).with_lines(vec![
                    DiffLine::context("pub fn feature_x() {}"),
                    DiffLine::deleted("// TODO: handle errors"),
                    DiffLine::added("// errors handled"),
                ])],
            ),
            commit_with_files(
                "jkl3456",
                "Charlie",
                "Update documentation",
                4,
                vec![FileChange::new("docs/guide.md", ChangeStatus::Renamed)
                    .with_old_path("README.md")],
            ),
            commit_with_files(
                "mno7890",
                "Bob",
                "Fix critical bug",
                5,
                vec![
                    FileChange::new("src/main.rs", ChangeStatus::Modified).with_lines(vec![
                        DiffLine::deleted("}"),
                        DiffLine::added("    run();"),
                        DiffLine::added("}"),
                    ]),
                    FileChange::new("assets/logo.png", ChangeStatus::Added).binary(),
                    FileChange::new("old.txt", ChangeStatus::Deleted)
                        .with_lines(vec![DiffLine::deleted("obsolete")]),
                ],
            ),
        ]
    }

    pub fn root() -> RootSource {
        RootSource::from_commits("Commits", five_commits())
    }

    pub fn empty_root() -> RootSource {
        RootSource::from_commits("Commits", Vec::new())
    }
}
