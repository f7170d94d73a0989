use anyhow::{Context, Result};
use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

use crate::model::field::FieldId;
use crate::model::issue::Issue;

pub const BACKUP_HEADER: [&str; 3] = ["issue_key", "source_values", "destination_values"];

/// Pre-change state of one issue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupRow {
    pub issue_key: String,
    pub source_values: Vec<String>,
    pub destination_values: Vec<String>,
}

impl BackupRow {
    pub fn from_issue(issue: &Issue, source: FieldId, destination: FieldId) -> Self {
        let values = |field: FieldId| -> Vec<String> {
            issue
                .select_options(field)
                .into_iter()
                .map(|o| o.value)
                .collect()
        };
        Self {
            issue_key: issue.key.clone(),
            source_values: values(source),
            destination_values: values(destination),
        }
    }
}

fn quote(value: &str) -> String {
    let delim = if value.contains('\'') && !value.contains('"') {
        '"'
    } else {
        '\''
    };
    let mut out = String::with_capacity(value.len() + 2);
    out.push(delim);
    for c in value.chars() {
        match c {
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c == '\\' || c == delim => {
                out.push('\\');
                out.push(c);
            }
            c if c.is_control() => out.push_str(&format!("\\x{:02x}", c as u32)),
            c => out.push(c),
        }
    }
    out.push(delim);
    out
}

/// Render values as a bracketed list, e.g. `['A', 'B']`.
pub fn render_values(values: &[String]) -> String {
    let items: Vec<String> = values.iter().map(|v| quote(v)).collect();
    format!("[{}]", items.join(", "))
}

/// Append-only CSV of issue state, flushed after every row so it survives
/// a run that dies half way.
pub struct BackupWriter<W: Write> {
    wtr: csv::Writer<W>,
}

impl BackupWriter<File> {
    /// Create or truncate the backup file and write its header.
    pub fn create(path: &Path) -> Result<Self> {
        let file = File::create(path)
            .with_context(|| format!("Failed to create backup file {}", path.display()))?;
        BackupWriter::new(file)
            .with_context(|| format!("Failed to write backup header to {}", path.display()))
    }
}

impl<W: Write> BackupWriter<W> {
    pub fn new(out: W) -> Result<Self, csv::Error> {
        let mut wtr = csv::Writer::from_writer(out);
        wtr.write_record(BACKUP_HEADER)?;
        wtr.flush()?;
        Ok(Self { wtr })
    }

    pub fn append(&mut self, row: &BackupRow) -> Result<(), csv::Error> {
        let destination = if row.destination_values.is_empty() {
            String::new()
        } else {
            render_values(&row.destination_values)
        };
        self.wtr.write_record([
            row.issue_key.as_str(),
            render_values(&row.source_values).as_str(),
            destination.as_str(),
        ])?;
        self.wtr.flush()?;
        Ok(())
    }

    pub fn into_inner(self) -> io::Result<W> {
        self.wtr.into_inner().map_err(|e| e.into_error())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracker::mock::multi_select_issue;

    const SRC: FieldId = FieldId(10112);
    const DST: FieldId = FieldId(10113);

    #[test]
    fn renders_values_as_bracketed_list() {
        assert_eq!(render_values(&[]), "[]");
        assert_eq!(
            render_values(&["A".to_string(), "B c".to_string()]),
            "['A', 'B c']"
        );
        assert_eq!(render_values(&["it's".to_string()]), "[\"it's\"]");
        assert_eq!(
            render_values(&["a\\b'\"".to_string()]),
            "['a\\\\b\\'\"']"
        );
    }

    #[test]
    fn escapes_control_characters() {
        assert_eq!(
            render_values(&["line one\nline two".to_string(), "a\tb\r".to_string()]),
            "['line one\\nline two', 'a\\tb\\r']"
        );
        assert_eq!(render_values(&["bell\u{7}".to_string()]), "['bell\\x07']");
        assert_eq!(render_values(&["caf\u{e9}".to_string()]), "['caf\u{e9}']");
    }

    #[test]
    fn row_reads_both_fields_from_issue() {
        let issue = multi_select_issue("OPS-1", SRC, &[("1", "A"), ("2", "B")], DST, &[("x", "A")]);
        let row = BackupRow::from_issue(&issue, SRC, DST);
        assert_eq!(row.issue_key, "OPS-1");
        assert_eq!(row.source_values, ["A", "B"]);
        assert_eq!(row.destination_values, ["A"]);
    }

    #[test]
    fn writes_header_then_one_line_per_row() {
        let mut backup = BackupWriter::new(Vec::new()).unwrap();
        backup
            .append(&BackupRow {
                issue_key: "OPS-1".into(),
                source_values: vec!["A".into(), "B".into()],
                destination_values: vec!["A".into()],
            })
            .unwrap();
        backup
            .append(&BackupRow {
                issue_key: "OPS-2".into(),
                source_values: vec!["C".into()],
                destination_values: vec![],
            })
            .unwrap();

        let text = String::from_utf8(backup.into_inner().unwrap()).unwrap();
        assert_eq!(
            text,
            "issue_key,source_values,destination_values\n\
             OPS-1,\"['A', 'B']\",['A']\n\
             OPS-2,['C'],\n"
        );
    }

    #[test]
    fn create_truncates_previous_backup() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("backup.csv");
        std::fs::write(&path, "old,run,data\nOPS-9,x,y\n").unwrap();

        let mut backup = BackupWriter::create(&path).unwrap();
        backup
            .append(&BackupRow {
                issue_key: "OPS-1".into(),
                source_values: vec!["A".into()],
                destination_values: vec![],
            })
            .unwrap();
        drop(backup);

        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(
            text,
            "issue_key,source_values,destination_values\nOPS-1,['A'],\n"
        );
    }
}
