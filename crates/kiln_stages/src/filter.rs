//! Token filter sets and glob filename mapping for the structured copy.

use std::collections::BTreeMap;

/// Replaces `<begin>KEY<end>` with a value, line by line.
///
/// Scanning resumes after each replacement, so values are never rescanned.
/// A delimited word that is not a known key is left as-is and scanning
/// continues one character after its begin delimiter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterSet {
    begin: String,
    end: String,
    tokens: BTreeMap<String, String>,
}

impl FilterSet {
    /// A filter set with the given delimiters and no tokens.
    pub fn new(begin: impl Into<String>, end: impl Into<String>) -> Self {
        Self {
            begin: begin.into(),
            end: end.into(),
            tokens: BTreeMap::new(),
        }
    }

    /// Adds a token.
    pub fn token(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tokens.insert(key.into(), value.into());
        self
    }

    /// Applies the filter to `text`. Tokens never span lines.
    pub fn apply(&self, text: &str) -> String {
        if self.begin.is_empty() || self.end.is_empty() || self.tokens.is_empty() {
            return text.to_string();
        }
        let mut out = String::with_capacity(text.len());
        for line in text.split_inclusive('\n') {
            self.apply_line(line, &mut out);
        }
        out
    }

    fn apply_line(&self, line: &str, out: &mut String) {
        let mut copied = 0;
        let mut next = line.find(&self.begin);
        while let Some(index) = next {
            // The key is at least one byte long.
            let key_start = index + self.begin.len();
            let search_from = key_start + 1;
            let end_index = match line
                .get(search_from..)
                .and_then(|rest| rest.find(&self.end))
            {
                Some(offset) => search_from + offset,
                None => break,
            };
            let key = &line[key_start..end_index];
            out.push_str(&line[copied..index]);
            match self.tokens.get(key) {
                Some(value) => {
                    out.push_str(value);
                    copied = end_index + self.end.len();
                }
                None => {
                    let first = self.begin.chars().next().map_or(1, char::len_utf8);
                    out.push_str(&self.begin[..first]);
                    copied = index + first;
                }
            }
            next = line[copied..].find(&self.begin).map(|i| copied + i);
        }
        out.push_str(&line[copied..]);
    }
}

/// Maps file names through a pattern with a single `*`.
///
/// `*Version.java.in` → `*Version.java` maps `Version.java.in` to
/// `Version.java`; names that do not match map to `None`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlobMapper {
    from_prefix: String,
    from_suffix: String,
    to_prefix: String,
    to_suffix: String,
}

impl GlobMapper {
    /// Builds a mapper. A pattern without `*` matches only itself.
    pub fn new(from: &str, to: &str) -> Self {
        let (from_prefix, from_suffix) = from.split_once('*').unwrap_or((from, ""));
        let (to_prefix, to_suffix) = to.split_once('*').unwrap_or((to, ""));
        Self {
            from_prefix: from_prefix.to_string(),
            from_suffix: from_suffix.to_string(),
            to_prefix: to_prefix.to_string(),
            to_suffix: to_suffix.to_string(),
        }
    }

    /// Maps `name`, or returns `None` if it does not match.
    pub fn map(&self, name: &str) -> Option<String> {
        if name.len() < self.from_prefix.len() + self.from_suffix.len() {
            return None;
        }
        let middle = name
            .strip_prefix(&self.from_prefix)?
            .strip_suffix(&self.from_suffix)?;
        Some(format!("{}{middle}{}", self.to_prefix, self.to_suffix))
    }
}
