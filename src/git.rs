use anyhow::{bail, Context, Result};
use chrono::{DateTime, FixedOffset};
use std::path::{Path, PathBuf};
use std::process::Command;
use std::rc::Rc;
use std::time::Instant;
use tracing::debug;

use crate::model::{ChangeStatus, CommitInfo, DiffData, DiffLine, FileChange};

const RECORD_SEPARATOR: char = '\x1e';
const FIELD_SEPARATOR: char = '\x1f';

/// sha, author name/email/date, committer name/email/date, raw body.
const LOG_FORMAT: &str = "%x1e%H%x1f%an%x1f%ae%x1f%aI%x1f%cn%x1f%ce%x1f%cI%x1f%B%x1f";
const HEADER_FIELDS: usize = 8;

/// Walk up from `start` to the first directory containing a `.git` entry.
pub fn find_git_root(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .find(|dir| dir.join(".git").exists())
        .map(Path::to_path_buf)
}

/// Reads commit history by running the `git` executable.
#[derive(Debug, Clone)]
pub struct GitService {
    root: PathBuf,
}

impl GitService {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Open the repository containing `start`.
    pub fn discover(start: &Path) -> Result<Self> {
        match find_git_root(start) {
            Some(root) => Ok(Self::new(root)),
            None => bail!("Not inside a Git repository: {}", start.display()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Commits reachable from HEAD, newest first, with their patches.
    pub fn commits(&self, max_count: Option<usize>) -> Result<Vec<CommitInfo>> {
        let started = Instant::now();
        let mut command = Command::new("git");
        command
            .arg("-C")
            .arg(&self.root)
            .args(["-c", "core.quotePath=false"])
            .args([
                "log",
                "--patch",
                "--no-color",
                "--no-ext-diff",
                "-M",
                "--root",
                "--diff-merges=first-parent",
            ])
            .arg(format!("--pretty=format:{}", LOG_FORMAT));
        if let Some(n) = max_count {
            command.arg(format!("--max-count={}", n));
        }

        let output = command
            .output()
            .context("Failed to run git. Is it installed and on PATH?")?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            // An empty repository has no HEAD to log from.
            if stderr.contains("does not have any commits") {
                return Ok(Vec::new());
            }
            bail!("git log failed: {}", stderr.trim());
        }

        let text = String::from_utf8_lossy(&output.stdout);
        let commits = parse_log(&text)?;
        debug!(
            repo = %self.root.display(),
            commits = commits.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "loaded git history"
        );
        Ok(commits)
    }
}

/// Parse the output of `git log --patch` produced with [`LOG_FORMAT`].
pub fn parse_log(text: &str) -> Result<Vec<CommitInfo>> {
    text.split(RECORD_SEPARATOR)
        .filter(|record| !record.trim().is_empty())
        .map(parse_record)
        .collect()
}

fn parse_record(record: &str) -> Result<CommitInfo> {
    let fields: Vec<&str> = record.splitn(HEADER_FIELDS + 1, FIELD_SEPARATOR).collect();
    if fields.len() < HEADER_FIELDS {
        bail!(
            "Malformed git log record ({} fields): {:?}",
            fields.len(),
            record.chars().take(80).collect::<String>()
        );
    }
    let sha = fields[0].trim().to_string();
    let patch = fields.get(HEADER_FIELDS).copied().unwrap_or("");

    Ok(CommitInfo {
        author_name: fields[1].to_string(),
        author_email: fields[2].to_string(),
        author_when: parse_date(fields[3], &sha)?,
        committer_name: fields[4].to_string(),
        committer_email: fields[5].to_string(),
        committer_when: parse_date(fields[6], &sha)?,
        message: fields[7].trim_end().to_string(),
        diff: Rc::new(DiffData::new(parse_patch(patch))),
        sha,
    })
}

fn parse_date(text: &str, sha: &str) -> Result<DateTime<FixedOffset>> {
    DateTime::parse_from_rfc3339(text.trim())
        .with_context(|| format!("Invalid date {:?} in commit {}", text, sha))
}

/// Split a multi-file patch into per-file changes.
pub fn parse_patch(patch: &str) -> Vec<FileChange> {
    let mut files = Vec::new();
    let mut current: Option<FileChange> = None;
    let mut in_hunk = false;
    let mut old_mode: Option<&str> = None;

    for line in patch.lines() {
        if let Some(rest) = line.strip_prefix("diff --git ") {
            files.extend(current.take());
            current = Some(FileChange::new(path_from_diff_header(rest), ChangeStatus::Modified));
            in_hunk = false;
            old_mode = None;
            continue;
        }
        let Some(file) = current.as_mut() else {
            continue;
        };

        if in_hunk {
            match line.as_bytes().first() {
                Some(b'+') => file.lines.push(DiffLine::added(&line[1..])),
                Some(b'-') => file.lines.push(DiffLine::deleted(&line[1..])),
                Some(b' ') => file.lines.push(DiffLine::context(&line[1..])),
                Some(b'@') if line.starts_with("@@") => {}
                // "\ No newline at end of file" and blank separators
                _ => {}
            }
            continue;
        }

        if line.starts_with("@@") {
            in_hunk = true;
        } else if line.starts_with("new file mode") {
            file.status = ChangeStatus::Added;
        } else if line.starts_with("deleted file mode") {
            file.status = ChangeStatus::Deleted;
        } else if let Some(old) = line.strip_prefix("rename from ") {
            file.old_path = Some(unquote(old));
            file.status = ChangeStatus::Renamed;
        } else if let Some(new) = line.strip_prefix("rename to ") {
            file.path = unquote(new);
        } else if let Some(old) = line.strip_prefix("copy from ") {
            file.old_path = Some(unquote(old));
            file.status = ChangeStatus::Copied;
        } else if let Some(new) = line.strip_prefix("copy to ") {
            file.path = unquote(new);
        } else if let Some(mode) = line.strip_prefix("old mode ") {
            old_mode = Some(mode.trim());
        } else if let Some(mode) = line.strip_prefix("new mode ") {
            if old_mode.is_some_and(|old| file_kind(old) != file_kind(mode.trim())) {
                file.status = ChangeStatus::TypeChanged;
            }
        } else if line.starts_with("Binary files ") || line.starts_with("GIT binary patch") {
            file.is_binary = true;
        } else if let Some(path) = line.strip_prefix("+++ ") {
            if let Some(path) = strip_side_prefix(path, "b/") {
                file.path = path;
            }
        }
    }
    files.extend(current);
    files
}

/// The object type part of a git file mode (`100644` → `100`, `120000` → `120`).
fn file_kind(mode: &str) -> &str {
    mode.get(..3).unwrap_or(mode)
}

fn unquote(path: &str) -> String {
    let path = path.trim();
    path.strip_prefix('"')
        .and_then(|p| p.strip_suffix('"'))
        .unwrap_or(path)
        .to_string()
}

fn strip_side_prefix(path: &str, prefix: &str) -> Option<String> {
    let path = unquote(path);
    if path == "/dev/null" {
        return None;
    }
    Some(path.strip_prefix(prefix).unwrap_or(&path).to_string())
}

/// `a/old b/new` → `new`. Later `rename to` or `+++` lines refine it.
fn path_from_diff_header(rest: &str) -> String {
    let rest = rest.trim();
    match rest.rfind(" b/") {
        Some(pos) => unquote(&rest[pos + 3..]),
        None => match rest.rfind(" \"b/") {
            Some(pos) => unquote(&format!("\"{}", &rest[pos + 4..])),
            None => unquote(rest),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PATCH: &str = "\
diff --git a/src/main.rs b/src/main.rs
index 1111111..2222222 100644
--- a/src/main.rs
+++ b/src/main.rs
@@ -1,3 +1,4 @@
 fn main() {
-    println!(\"hello\");
+    // TODO: greet properly
+    println!(\"hello, world\");
 }
diff --git a/notes.txt b/notes.txt
new file mode 100644
index 0000000..3333333
--- /dev/null
+++ b/notes.txt
@@ -0,0 +1 @@
+--- not a header
diff --git a/old.txt b/old.txt
deleted file mode 100644
index 4444444..0000000
--- a/old.txt
+++ /dev/null
@@ -1 +0,0 @@
-bye
\\ No newline at end of file
diff --git a/a.md b/docs/a.md
similarity index 95%
rename from a.md
rename to docs/a.md
diff --git a/logo.png b/logo.png
new file mode 100644
index 0000000..5555555
Binary files /dev/null and b/logo.png differ
";

    fn log_record(sha: &str, message: &str, patch: &str) -> String {
        format!(
            "\x1e{sha}\x1fAlice\x1falice@example.com\x1f2025-01-02T03:04:05+01:00\x1fBob\x1fbob@example.com\x1f2025-01-02T04:00:00+01:00\x1f{message}\x1f{patch}"
        )
    }

    #[test]
    fn test_parse_patch_files() {
        let files = parse_patch(PATCH);
        assert_eq!(files.len(), 5);

        assert_eq!(files[0].path, "src/main.rs");
        assert_eq!(files[0].status, ChangeStatus::Modified);
        assert_eq!(files[0].lines_added(), 2);
        assert_eq!(files[0].lines_deleted(), 1);
        assert!(files[0].added_contains("todo"));

        assert_eq!(files[1].status, ChangeStatus::Added);
        assert_eq!(files[1].added_content().collect::<Vec<_>>(), vec!["--- not a header"]);

        assert_eq!(files[2].status, ChangeStatus::Deleted);
        assert_eq!(files[2].path, "old.txt");
        assert_eq!(files[2].deleted_content().collect::<Vec<_>>(), vec!["bye"]);

        assert_eq!(files[3].status, ChangeStatus::Renamed);
        assert_eq!(files[3].path, "docs/a.md");
        assert_eq!(files[3].old_path.as_deref(), Some("a.md"));

        assert!(files[4].is_binary);
        assert_eq!(files[4].lines_added(), 0);
    }

    #[test]
    fn test_type_change_from_modes() {
        let patch = "\
diff --git a/link b/link
old mode 100644
new mode 120000
";
        assert_eq!(parse_patch(patch)[0].status, ChangeStatus::TypeChanged);

        let patch = "\
diff --git a/run.sh b/run.sh
old mode 100644
new mode 100755
";
        assert_eq!(parse_patch(patch)[0].status, ChangeStatus::Modified);
    }

    #[test]
    fn test_parse_log_records() {
        let text = format!(
            "{}\n{}",
            log_record("aaaa", "Second\n\nBody text\n", PATCH),
            log_record("bbbb", "First\n", "")
        );
        let commits = parse_log(&text).unwrap();
        assert_eq!(commits.len(), 2);
        assert_eq!(commits[0].sha, "aaaa");
        assert_eq!(commits[0].message, "Second\n\nBody text");
        assert_eq!(commits[0].message_short(), "Second");
        assert_eq!(commits[0].author_name, "Alice");
        assert_eq!(commits[0].committer_email, "bob@example.com");
        assert_eq!(commits[0].author_when.to_rfc3339(), "2025-01-02T03:04:05+01:00");
        assert_eq!(commits[0].diff.files_changed(), 5);
        assert_eq!(commits[1].diff.files_changed(), 0);
    }

    #[test]
    fn test_parse_log_rejects_bad_date() {
        let text = "\x1eabc\x1fA\x1fa@x\x1fyesterday\x1fB\x1fb@x\x1f2025-01-01T00:00:00Z\x1fmsg\x1f";
        let err = parse_log(text).unwrap_err();
        assert!(err.to_string().contains("Invalid date"));
    }

    #[test]
    fn test_parse_log_empty_output() {
        assert!(parse_log("").unwrap().is_empty());
    }

    #[test]
    fn test_path_from_diff_header() {
        assert_eq!(path_from_diff_header("a/x.rs b/x.rs"), "x.rs");
        assert_eq!(path_from_diff_header("a/my file.rs b/my file.rs"), "my file.rs");
        assert_eq!(path_from_diff_header("\"a/q.rs\" \"b/q.rs\""), "q.rs");
    }

    #[test]
    fn test_find_git_root_walks_parents() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join(".git")).unwrap();
        let nested = dir.path().join("src").join("deep");
        std::fs::create_dir_all(&nested).unwrap();

        assert_eq!(find_git_root(&nested), Some(dir.path().to_path_buf()));
        assert_eq!(find_git_root(dir.path()), Some(dir.path().to_path_buf()));
    }

    #[test]
    fn test_discover_outside_repository() {
        let dir = tempfile::tempdir().unwrap();
        if find_git_root(dir.path()).is_some() {
            // The temp directory itself lives inside a checkout.
            return;
        }
        assert!(GitService::discover(dir.path()).is_err());
    }

    #[test]
    fn test_commits_from_real_repository() {
        if Command::new("git").arg("--version").output().is_err() {
            return;
        }
        let dir = tempfile::tempdir().unwrap();
        let git = |args: &[&str]| {
            let status = Command::new("git")
                .arg("-C")
                .arg(dir.path())
                .args([
                    "-c",
                    "user.name=Test User",
                    "-c",
                    "user.email=test@example.com",
                    "-c",
                    "commit.gpgsign=false",
                ])
                .args(args)
                .output()
                .unwrap();
            assert!(status.status.success(), "{:?}", status);
        };
        git(&["init", "-q"]);
        std::fs::write(dir.path().join("hello.txt"), "hello\n").unwrap();
        git(&["add", "hello.txt"]);
        git(&["commit", "-q", "-m", "Add hello"]);
        std::fs::write(dir.path().join("hello.txt"), "hello\nworld\n").unwrap();
        git(&["commit", "-q", "-am", "Add world"]);

        let service = GitService::new(dir.path());
        let commits = service.commits(None).unwrap();
        assert_eq!(commits.len(), 2);
        assert_eq!(commits[0].message, "Add world");
        assert_eq!(commits[0].author_name, "Test User");
        assert!(commits[0].diff.added_contains("WORLD"));
        assert_eq!(commits[1].diff.files[0].status, ChangeStatus::Added);

        assert_eq!(service.commits(Some(1)).unwrap().len(), 1);
    }
}
