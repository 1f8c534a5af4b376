//! Minimal INI reader for the shared credentials file format.
//!
//! Supports `[section]` headers, `key = value` pairs, and `#`/`;` comment
//! lines. Keys outside any section are rejected.

use std::collections::HashMap;

/// A malformed line in an INI document.
#[derive(Debug, thiserror::Error)]
#[error("line {line}: {message}")]
pub struct IniError {
    pub line: usize,
    pub message: String,
}

/// A parsed INI document: section name → key → value.
#[derive(Debug, Default)]
pub struct IniDocument {
    sections: HashMap<String, HashMap<String, String>>,
}

impl IniDocument {
    /// Parse INI text. The last occurrence of a duplicate key wins.
    pub fn parse(input: &str) -> Result<Self, IniError> {
        let mut doc = Self::default();
        let mut current: Option<String> = None;

        for (idx, raw) in input.lines().enumerate() {
            let line = raw.trim();
            let line_no = idx + 1;

            if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
                continue;
            }

            if let Some(rest) = line.strip_prefix('[') {
                let name = rest.strip_suffix(']').ok_or_else(|| IniError {
                    line: line_no,
                    message: "unterminated section header".into(),
                })?;
                let name = name.trim().to_string();
                if name.is_empty() {
                    return Err(IniError {
                        line: line_no,
                        message: "empty section name".into(),
                    });
                }
                doc.sections.entry(name.clone()).or_default();
                current = Some(name);
                continue;
            }

            let Some((key, value)) = line.split_once('=') else {
                return Err(IniError {
                    line: line_no,
                    message: "expected `key = value`".into(),
                });
            };

            let Some(section) = current.as_ref() else {
                return Err(IniError {
                    line: line_no,
                    message: "key outside of any section".into(),
                });
            };

            doc.sections
                .entry(section.clone())
                .or_default()
                .insert(key.trim().to_string(), value.trim().to_string());
        }

        Ok(doc)
    }

    /// Look up a whole section.
    pub fn section(&self, name: &str) -> Option<&HashMap<String, String>> {
        self.sections.get(name)
    }

    /// Look up a single value.
    pub fn get(&self, section: &str, key: &str) -> Option<&str> {
        self.sections.get(section)?.get(key).map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_sections_and_keys() {
        let doc = IniDocument::parse(
            "[default]\naws_access_key_id = A\n\n# comment\n[paapi]\n  aws_access_key_id=K  \n; other\n",
        )
        .unwrap();
        assert_eq!(doc.get("default", "aws_access_key_id"), Some("A"));
        assert_eq!(doc.get("paapi", "aws_access_key_id"), Some("K"));
        assert!(doc.get("paapi", "missing").is_none());
    }

    #[test]
    fn last_duplicate_wins() {
        let doc = IniDocument::parse("[p]\nk = 1\nk = 2\n").unwrap();
        assert_eq!(doc.get("p", "k"), Some("2"));
    }

    #[test]
    fn empty_section_is_present() {
        let doc = IniDocument::parse("[empty]\n").unwrap();
        assert!(doc.section("empty").is_some_and(|s| s.is_empty()));
    }

    #[test]
    fn rejects_malformed_lines() {
        let err = IniDocument::parse("[p]\njust-a-word\n").unwrap_err();
        assert_eq!(err.line, 2);

        let err = IniDocument::parse("k = v\n").unwrap_err();
        assert!(err.message.contains("outside"));

        let err = IniDocument::parse("[broken\n").unwrap_err();
        assert!(err.message.contains("unterminated"));
    }
}
