use std::any::Any;
use std::rc::Rc;
use std::sync::OnceLock;

use chrono::{DateTime, FixedOffset};

use super::diff::{diff_type, DiffData};
use crate::engine::schema::{field, TypeInfo};
use crate::engine::value::{Record, Value, ValueType};

/// A commit as exposed to queries.
#[derive(Debug, Clone)]
pub struct CommitInfo {
    pub sha: String,
    pub message: String,
    pub author_name: String,
    pub author_email: String,
    pub author_when: DateTime<FixedOffset>,
    pub committer_name: String,
    pub committer_email: String,
    pub committer_when: DateTime<FixedOffset>,
    pub diff: Rc<DiffData>,
}

impl CommitInfo {
    /// First line of the message.
    pub fn message_short(&self) -> &str {
        self.message.lines().next().unwrap_or("").trim()
    }

    pub fn short_sha(&self) -> &str {
        let end = self
            .sha
            .char_indices()
            .nth(7)
            .map(|(i, _)| i)
            .unwrap_or(self.sha.len());
        &self.sha[..end]
    }
}

impl Record for CommitInfo {
    fn type_info(&self) -> &'static TypeInfo {
        commit_type()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

pub fn commit_type() -> &'static TypeInfo {
    static INFO: OnceLock<TypeInfo> = OnceLock::new();
    INFO.get_or_init(|| {
        TypeInfo::new("CommitInfo")
            .member("Sha", ValueType::Text, |v| {
                field(v, |c: &CommitInfo| Value::from(c.sha.as_str()))
            })
            .member("Message", ValueType::Text, |v| {
                field(v, |c: &CommitInfo| Value::from(c.message.as_str()))
            })
            .member("MessageShort", ValueType::Text, |v| {
                field(v, |c: &CommitInfo| Value::from(c.message_short()))
            })
            .member("AuthorName", ValueType::Text, |v| {
                field(v, |c: &CommitInfo| Value::from(c.author_name.as_str()))
            })
            .member("AuthorEmail", ValueType::Text, |v| {
                field(v, |c: &CommitInfo| Value::from(c.author_email.as_str()))
            })
            .member("AuthorWhen", ValueType::Timestamp, |v| {
                field(v, |c: &CommitInfo| Value::Timestamp(c.author_when))
            })
            .member("CommitterName", ValueType::Text, |v| {
                field(v, |c: &CommitInfo| Value::from(c.committer_name.as_str()))
            })
            .member("CommitterEmail", ValueType::Text, |v| {
                field(v, |c: &CommitInfo| Value::from(c.committer_email.as_str()))
            })
            .member("CommitterWhen", ValueType::Timestamp, |v| {
                field(v, |c: &CommitInfo| Value::Timestamp(c.committer_when))
            })
            .member("Diff", ValueType::Record(diff_type()), |v| {
                field(v, |c: &CommitInfo| Value::Record(c.diff.clone()))
            })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::fixtures;

    #[test]
    fn test_message_short_is_first_line() {
        let mut commit = fixtures::commit("abc1234", "Alice", "Subject line", 1);
        commit.message = "Subject line\n\nLonger body".to_string();
        assert_eq!(commit.message_short(), "Subject line");
    }

    #[test]
    fn test_short_sha() {
        let commit = fixtures::commit("0123456789abcdef", "Alice", "x", 1);
        assert_eq!(commit.short_sha(), "0123456");
        let commit = fixtures::commit("abc", "Alice", "x", 1);
        assert_eq!(commit.short_sha(), "abc");
    }

    #[test]
    fn test_members_resolve_through_registry() {
        let value = Value::Record(Rc::new(fixtures::commit("abc1234", "Alice", "Initial commit", 1)));
        let author = commit_type().find_member("authorname").unwrap();
        assert_eq!((author.get)(&value).as_str(), Some("Alice"));
        let diff = commit_type().find_member("Diff").unwrap();
        assert!(matches!((diff.get)(&value), Value::Record(_)));
    }
}
