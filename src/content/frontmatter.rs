//! Front-matter parsing

use serde::{Deserialize, Deserializer};
use thiserror::Error;

/// The block delimiter, alone on its line
const DELIMITER: &str = "---";

/// Front matter that could not be decoded as key-value pairs
#[derive(Debug, Error)]
pub enum FrontMatterError {
    #[error("front matter decoding failed: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("front matter is not a key-value mapping")]
    NotAMapping,
}

/// Custom deserializer that accepts any YAML scalar and keeps its text form
fn scalar_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::{self, Visitor};
    use std::fmt;

    struct Scalar;

    impl<'de> Visitor<'de> for Scalar {
        type Value = String;

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            formatter.write_str("a string, number or boolean")
        }

        fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(value.to_string())
        }

        fn visit_string<E>(self, value: String) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(value)
        }

        fn visit_i64<E>(self, value: i64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(value.to_string())
        }

        fn visit_u64<E>(self, value: u64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(value.to_string())
        }

        fn visit_f64<E>(self, value: f64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(value.to_string())
        }

        fn visit_bool<E>(self, value: bool) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(value.to_string())
        }

        fn visit_none<E>(self) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(String::new())
        }

        fn visit_unit<E>(self) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(String::new())
        }
    }

    deserializer.deserialize_any(Scalar)
}

/// Front-matter data from a post
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct FrontMatter {
    #[serde(deserialize_with = "scalar_string")]
    pub title: String,
    /// Opaque; never parsed as a calendar date
    #[serde(deserialize_with = "scalar_string")]
    pub date: String,
}

impl FrontMatter {
    /// Split a document into its front-matter block (if any) and the body.
    ///
    /// The block must open on the first non-blank line with a bare `---`
    /// and close on the next bare `---` line. Without a closing delimiter the
    /// whole input is body.
    pub fn split(content: &str) -> (Option<&str>, &str) {
        let rest = content.trim_start();
        let Some(after_open) = rest
            .strip_prefix(DELIMITER)
            .and_then(|s| s.strip_prefix("\r\n").or_else(|| s.strip_prefix('\n')))
        else {
            return (None, content);
        };

        let mut offset = 0;
        for line in after_open.split_inclusive('\n') {
            if line.trim_end_matches(['\n', '\r']) == DELIMITER {
                let block = &after_open[..offset];
                let body = &after_open[offset + line.len()..];
                return (Some(block), body);
            }
            offset += line.len();
        }

        (None, content)
    }

    /// Decode the text between the delimiters.
    ///
    /// An empty block (or one holding only comments) yields empty metadata.
    pub fn from_yaml(block: &str) -> Result<Self, FrontMatterError> {
        let has_content = block.lines().any(|line| {
            let trimmed = line.trim();
            !trimmed.is_empty() && !trimmed.starts_with('#')
        });
        if !has_content {
            return Ok(Self::default());
        }

        let value: serde_yaml::Value = serde_yaml::from_str(block)?;
        if !value.is_mapping() {
            return Err(FrontMatterError::NotAMapping);
        }

        let title = verbatim_scalar(&value, block, "title");
        let date = verbatim_scalar(&value, block, "date");
        let mut fm: Self = serde_yaml::from_value(value)?;
        if let Some(title) = title {
            fm.title = title;
        }
        if let Some(date) = date {
            fm.date = date;
        }
        Ok(fm)
    }
}

/// The source text of `key` when YAML typed its value as a number or bool.
///
/// Parsing `2023.10` as a float and printing it back gives `2023.1`; the
/// author's text is kept instead. Only plain `key: value` lines at the top
/// level are recognised.
fn verbatim_scalar(value: &serde_yaml::Value, block: &str, key: &str) -> Option<String> {
    use serde_yaml::Value;

    if !matches!(value.get(key), Some(Value::Number(_) | Value::Bool(_))) {
        return None;
    }

    block.lines().find_map(|line| {
        let rest = line.strip_prefix(key)?.trim_start().strip_prefix(':')?;
        let text = match rest.find(" #") {
            Some(at) => &rest[..at],
            None => rest,
        };
        let text = text.trim();
        (!text.is_empty()).then(|| text.to_string())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_without_front_matter() {
        let (block, body) = FrontMatter::split("Hello, World!");
        assert!(block.is_none());
        assert_eq!(body, "Hello, World!");
    }

    #[test]
    fn test_split_with_front_matter() {
        let content = "---\ntitle: Test Title\ndate: 2024-05-17\n---\nHello, World!";
        let (block, body) = FrontMatter::split(content);
        assert_eq!(block, Some("title: Test Title\ndate: 2024-05-17\n"));
        assert_eq!(body, "Hello, World!");
    }

    #[test]
    fn test_split_skips_leading_blank_lines() {
        let content = "\n\n---\ntitle: Hi\n---\nBody\n";
        let (block, body) = FrontMatter::split(content);
        assert_eq!(block, Some("title: Hi\n"));
        assert_eq!(body, "Body\n");
    }

    #[test]
    fn test_split_crlf() {
        let content = "---\r\ntitle: Hi\r\n---\r\nBody";
        let (block, body) = FrontMatter::split(content);
        assert_eq!(block, Some("title: Hi\r\n"));
        assert_eq!(body, "Body");
    }

    #[test]
    fn test_split_unclosed_block_is_body() {
        let content = "---\ntitle: Hi\nno closing delimiter";
        let (block, body) = FrontMatter::split(content);
        assert!(block.is_none());
        assert_eq!(body, content);
    }

    #[test]
    fn test_split_requires_bare_delimiter() {
        let (block, _) = FrontMatter::split("--- title\n---\nBody");
        assert!(block.is_none());

        let (block, _) = FrontMatter::split("----\ntitle: x\n----\nBody");
        assert!(block.is_none());
    }

    #[test]
    fn test_split_empty_block() {
        let (block, body) = FrontMatter::split("---\n---\nBody");
        assert_eq!(block, Some(""));
        assert_eq!(body, "Body");
    }

    #[test]
    fn test_from_yaml_title_and_date() {
        let fm = FrontMatter::from_yaml("title: Hello, World!\ndate: 29.03.2024\n").unwrap();
        assert_eq!(fm.title, "Hello, World!");
        assert_eq!(fm.date, "29.03.2024");
    }

    #[test]
    fn test_from_yaml_scalars_become_strings() {
        let fm = FrontMatter::from_yaml("title: 42\ndate: 2024\n").unwrap();
        assert_eq!(fm.title, "42");
        assert_eq!(fm.date, "2024");

        let fm = FrontMatter::from_yaml("title: true\n").unwrap();
        assert_eq!(fm.title, "true");
        assert_eq!(fm.date, "");
    }

    #[test]
    fn test_from_yaml_keeps_number_text() {
        let fm = FrontMatter::from_yaml("title: 1e3\ndate: 2023.10\n").unwrap();
        assert_eq!(fm.title, "1e3");
        assert_eq!(fm.date, "2023.10");

        let fm = FrontMatter::from_yaml("title: Release\ndate: 0x1F # hex\n").unwrap();
        assert_eq!(fm.date, "0x1F");

        let fm = FrontMatter::from_yaml("title : True\ndate:   007\n").unwrap();
        assert_eq!(fm.title, "True");
        assert_eq!(fm.date, "007");
    }

    #[test]
    fn test_from_yaml_strings_not_rewritten() {
        let fm = FrontMatter::from_yaml("title: \"1.50\"\ndate: '2023.10'\n").unwrap();
        assert_eq!(fm.title, "1.50");
        assert_eq!(fm.date, "2023.10");

        // Nested keys with the same name are not mistaken for the top level
        let fm = FrontMatter::from_yaml("meta:\n  date: x\ndate: 1.0\n").unwrap();
        assert_eq!(fm.date, "1.0");
    }

    #[test]
    fn test_from_yaml_ignores_unknown_keys() {
        let fm = FrontMatter::from_yaml("title: Hi\ntags:\n  - rust\nlayout: post\n").unwrap();
        assert_eq!(fm.title, "Hi");
        assert_eq!(fm.date, "");
    }

    #[test]
    fn test_from_yaml_empty_and_comment_only() {
        assert_eq!(FrontMatter::from_yaml("").unwrap(), FrontMatter::default());
        assert_eq!(
            FrontMatter::from_yaml("  \n# draft\n").unwrap(),
            FrontMatter::default()
        );
    }

    #[test]
    fn test_from_yaml_malformed() {
        assert!(FrontMatter::from_yaml("title: [unclosed\n").is_err());
        assert!(matches!(
            FrontMatter::from_yaml("just some prose\n"),
            Err(FrontMatterError::NotAMapping)
        ));
        assert!(matches!(
            FrontMatter::from_yaml("- a\n- b\n"),
            Err(FrontMatterError::NotAMapping)
        ));
        assert!(FrontMatter::from_yaml("title:\n  nested: map\n").is_err());
    }
}
