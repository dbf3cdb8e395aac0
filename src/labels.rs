//! The table mapping class indices to gesture names.

use std::{collections::BTreeMap, fs, path::Path};

use crate::error::{Error, Result};

/// Maps class indices predicted by a classifier to human-readable gesture names.
///
/// Loaded once at startup from a text file with one `<index> <label>` record per line:
///
/// ```text
/// 0 A
/// 1 B
/// 2 Thank_you
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabelTable {
    labels: BTreeMap<u32, String>,
}

impl LabelTable {
    /// Reads and parses a label file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::load_impl(path.as_ref())
    }

    fn load_impl(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .map_err(|e| Error::config(path, format!("failed to read label file: {e}")))?;
        let table = Self::parse(&text).map_err(|e| match e {
            Error::Config { reason, .. } => Error::config(path, reason),
            e => e,
        })?;
        log::info!("loaded {} labels from '{}'", table.len(), path.display());
        Ok(table)
    }

    /// Parses the contents of a label file.
    ///
    /// Blank lines are skipped. Every other line must consist of exactly two whitespace-separated
    /// tokens: a non-negative integer index followed by the label. Labels therefore cannot contain
    /// spaces; multi-word gestures are written with underscores.
    pub fn parse(text: &str) -> Result<Self> {
        let mut labels = BTreeMap::new();
        for (lineno, line) in text.lines().enumerate().map(|(i, l)| (i + 1, l.trim())) {
            if line.is_empty() {
                continue;
            }

            let mut tokens = line.split_whitespace();
            let (index, label) = match (tokens.next(), tokens.next(), tokens.next()) {
                (Some(index), Some(label), None) => (index, label),
                _ => {
                    return Err(Error::config(
                        "<labels>",
                        format!("line {lineno}: expected `<index> <label>`, got {line:?}"),
                    ))
                }
            };
            let index: u32 = index.parse().map_err(|_| {
                Error::config(
                    "<labels>",
                    format!("line {lineno}: {index:?} is not a non-negative integer"),
                )
            })?;

            if labels.insert(index, label.to_string()).is_some() {
                return Err(Error::config(
                    "<labels>",
                    format!("line {lineno}: duplicate index {index}"),
                ));
            }
        }

        Ok(Self { labels })
    }

    /// Returns the label for class `index`, if there is one.
    pub fn get(&self, index: u32) -> Option<&str> {
        self.labels.get(&index).map(String::as_str)
    }

    /// Returns the label for class `index`.
    ///
    /// A missing label means the label file does not match the models, so this fails with
    /// [`Error::UnknownClass`].
    pub fn label(&self, index: u32) -> Result<&str> {
        self.get(index).ok_or(Error::UnknownClass(index))
    }

    pub fn contains(&self, index: u32) -> bool {
        self.labels.contains_key(&index)
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Iterates over all `(index, label)` pairs in ascending index order.
    pub fn iter(&self) -> impl Iterator<Item = (u32, &str)> + '_ {
        self.labels.iter().map(|(&i, l)| (i, l.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn parse_records() {
        let table = LabelTable::parse("0 A\n  1 B  \n\n2 Thank_you\n").unwrap();
        assert_eq!(table.len(), 3);
        assert_eq!(table.get(0), Some("A"));
        assert_eq!(table.get(1), Some("B"));
        assert_eq!(table.label(2).unwrap(), "Thank_you");
        assert_eq!(table.get(3), None);
        assert!(matches!(table.label(3), Err(Error::UnknownClass(3))));
    }

    #[test]
    fn parse_rejects_malformed_lines() {
        for text in ["0", "0 A B", "x A", "-1 A", "0 A\n0 B"] {
            match LabelTable::parse(text) {
                Err(Error::Config { .. }) => {}
                other => panic!("{text:?} parsed as {other:?}"),
            }
        }
    }

    #[test]
    fn load_reports_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "0 A").unwrap();
        writeln!(file, "oops").unwrap();

        match LabelTable::load(file.path()) {
            Err(Error::Config { path, reason }) => {
                assert_eq!(path, file.path());
                assert!(reason.contains("line 2"), "{reason}");
            }
            other => panic!("unexpected result {other:?}"),
        }

        let missing = file.path().with_extension("missing");
        assert!(matches!(
            LabelTable::load(missing),
            Err(Error::Config { .. })
        ));
    }

    #[test]
    fn iter_is_sorted() {
        let table = LabelTable::parse("5 F\n0 A\n").unwrap();
        assert_eq!(table.iter().collect::<Vec<_>>(), [(0, "A"), (5, "F")]);
    }
}
