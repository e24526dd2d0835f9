//! Flattening of query results into rows and columns.
//!
//! Records are expanded through their registered members. Nested records
//! contribute their own members under a dotted name (`Diff.FilesChanged`);
//! sequences stay as a single cell.

use unicode_width::UnicodeWidthStr;

use crate::engine::schema::{MemberInfo, TypeInfo};
use crate::engine::value::{Record, Value, ValueType};

const MAX_NESTING: usize = 2;

#[derive(Debug, Clone)]
pub struct ColumnInfo {
    pub name: String,
    pub max_width: usize,
    path: Vec<&'static MemberInfo>,
}

impl ColumnInfo {
    fn extract(&self, row: &Value) -> Value {
        let mut current = row.clone();
        for member in &self.path {
            if current.is_null() {
                return Value::Null;
            }
            current = (member.get)(&current);
        }
        current
    }
}

#[derive(Debug, Clone, Default)]
pub struct ResultTable {
    pub columns: Vec<ColumnInfo>,
    pub rows: Vec<Vec<Value>>,
}

impl ResultTable {
    /// Tabulate any value. Sequences give one row per element, a single
    /// record one row, and a scalar a one-cell `Value` table.
    pub fn from_value(value: &Value) -> Self {
        match value {
            Value::List(seq) => Self::from_rows(seq.element_type(), seq.items()),
            Value::Record(record) => Self::from_rows(
                &ValueType::Record(record.type_info()),
                std::slice::from_ref(value),
            ),
            other => Self::from_rows(&other.value_type(), std::slice::from_ref(value)),
        }
    }

    fn from_rows(element: &ValueType, items: &[Value]) -> Self {
        let mut columns = Vec::new();
        match element {
            ValueType::Record(info) => collect_columns(info, "", Vec::new(), 0, &mut columns),
            _ => columns.push(ColumnInfo {
                name: "Value".to_string(),
                max_width: 0,
                path: Vec::new(),
            }),
        }

        let rows: Vec<Vec<Value>> = items
            .iter()
            .map(|item| columns.iter().map(|c| c.extract(item)).collect())
            .collect();

        for column in columns.iter_mut() {
            column.max_width = UnicodeWidthStr::width(column.name.as_str());
        }
        for row in &rows {
            for (i, cell) in row.iter().enumerate() {
                let width = cell_width(cell);
                if width > columns[i].max_width {
                    columns[i].max_width = width;
                }
            }
        }

        Self { columns, rows }
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }
}

fn collect_columns(
    info: &'static TypeInfo,
    prefix: &str,
    path: Vec<&'static MemberInfo>,
    depth: usize,
    out: &mut Vec<ColumnInfo>,
) {
    for member in info.members() {
        let name = format!("{}{}", prefix, member.name);
        let mut member_path = path.clone();
        member_path.push(member);
        match &member.ty {
            ValueType::Record(nested) if depth < MAX_NESTING => {
                collect_columns(nested, &format!("{}.", name), member_path, depth + 1, out);
            }
            ValueType::Record(_) => {}
            _ => out.push(ColumnInfo {
                name,
                max_width: 0,
                path: member_path,
            }),
        }
    }
}

/// Plain-text rendering of one cell.
pub fn cell_text(value: &Value) -> String {
    match value {
        Value::List(seq) if *seq.element_type() == ValueType::Text => {
            let items: Vec<&str> = seq.iter().filter_map(Value::as_str).collect();
            items.join("; ")
        }
        other => other.display(),
    }
}

pub fn cell_width(value: &Value) -> usize {
    UnicodeWidthStr::width(cell_text(value).as_str())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::run_query;
    use crate::model::fixtures;

    fn table(query: &str) -> ResultTable {
        ResultTable::from_value(&run_query(query, &fixtures::root()).unwrap())
    }

    #[test]
    fn test_commit_columns_flatten_diff() {
        let t = table("Commits");
        let names = t.column_names();
        assert_eq!(names[0], "Sha");
        assert!(names.contains(&"AuthorWhen"));
        assert!(names.contains(&"Diff.FilesChanged"));
        assert!(names.contains(&"Diff.Files"));
        assert!(!names.contains(&"Diff"));
        assert_eq!(t.row_count(), 5);
    }

    #[test]
    fn test_scalar_sequence_has_value_column() {
        let t = table("Commits.Select(c => c.AuthorName)");
        assert_eq!(t.column_names(), vec!["Value"]);
        assert_eq!(t.rows[1][0].as_str(), Some("Bob"));
        assert_eq!(t.columns[0].max_width, "Charlie".len());
    }

    #[test]
    fn test_scalar_result_is_single_cell() {
        let t = table("Commits.Count()");
        assert_eq!(t.row_count(), 1);
        assert_eq!(t.rows[0][0].as_i64(), Some(5));
    }

    #[test]
    fn test_single_record_is_one_row() {
        let t = table("Commits.First()");
        assert_eq!(t.row_count(), 1);
        let sha = t.column_names().iter().position(|c| *c == "Sha").unwrap();
        assert_eq!(t.rows[0][sha].as_str(), Some("abc1234"));
    }

    #[test]
    fn test_null_record_row_is_all_null() {
        let t = table("Commits.FirstOrDefault(c => c.Sha == \"none\")");
        assert_eq!(t.row_count(), 1);
        assert!(t.rows[0].iter().all(Value::is_null));
    }

    #[test]
    fn test_text_list_cells_join_items() {
        let t = table("Commits.Select(c => c.Diff.Files.First().AddedContent)");
        assert_eq!(cell_text(&t.rows[0][0]), "# Project");
        assert_eq!(cell_text(&t.rows[1][0]), "pub fn feature_x() {}; // TODO: handle errors");
    }
}
