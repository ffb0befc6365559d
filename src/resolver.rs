//! Fuzzy, case-insensitive name resolution.
//!
//! Every friend contributes patterns for its full name, its first name and
//! each nickname; every location contributes its full name. A pattern only
//! matches on word boundaries and never next to `*` markup, so `Grace` does
//! not match inside `Graceland` or `**Grace Hopper**`.

use crate::error::{FriendsError, Result};
use crate::types::{same_name, Friend, Location};
use regex::Regex;

/// A compiled, case-insensitive pattern for one name form
#[derive(Debug, Clone)]
pub struct NamePattern {
    key: String,
    regex: Regex,
}

impl NamePattern {
    /// Build a pattern that tolerates any run of whitespace between words
    pub fn new(name: &str) -> Self {
        let words: Vec<String> = name.split_whitespace().map(regex::escape).collect();
        let source = format!(r"(?i){}", words.join(r"\s+"));
        Self {
            key: name.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase(),
            // Every word is escaped, so the pattern is always valid
            regex: Regex::new(&source).unwrap(),
        }
    }

    /// Normalized form of the name this pattern was built from
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Find the first bounded match at or after `from`
    pub fn find_at(&self, text: &str, mut from: usize) -> Option<(usize, usize)> {
        while from <= text.len() {
            let m = self.regex.find_at(text, from)?;
            if is_bounded(text, m.start(), m.end()) {
                return Some((m.start(), m.end()));
            }
            from = m.start() + text[m.start()..].chars().next().map_or(1, char::len_utf8);
        }
        None
    }

    pub fn is_match(&self, text: &str) -> bool {
        self.find_at(text, 0).is_some()
    }

    /// Replace every bounded match with the output of `replace`
    pub fn replace_all(&self, text: &str, mut replace: impl FnMut(&str) -> String) -> String {
        let mut out = String::with_capacity(text.len());
        let mut last = 0;

        while let Some((start, end)) = self.find_at(text, last) {
            out.push_str(&text[last..start]);
            out.push_str(&replace(&text[start..end]));
            last = end;
        }

        out.push_str(&text[last..]);
        out
    }
}

fn is_bounded(text: &str, start: usize, end: usize) -> bool {
    let blocks = |c: char| c.is_alphabetic() || c == '*';
    let before = text[..start].chars().next_back();
    let after = text[end..].chars().next();
    !before.is_some_and(blocks) && !after.is_some_and(blocks)
}

/// Something that can be looked up by name
pub trait Named {
    const KIND: &'static str;

    fn name(&self) -> &str;

    fn name_patterns(&self) -> Vec<NamePattern>;
}

impl Named for Friend {
    const KIND: &'static str = "friend";

    fn name(&self) -> &str {
        &self.name
    }

    fn name_patterns(&self) -> Vec<NamePattern> {
        let mut patterns = vec![NamePattern::new(&self.name)];

        let words: Vec<&str> = self.name.split_whitespace().collect();
        if words.len() > 1 {
            patterns.push(NamePattern::new(words[0]));
        }

        patterns.extend(self.nicknames.iter().map(|n| NamePattern::new(n)));
        patterns
    }
}

impl Named for Location {
    const KIND: &'static str = "location";

    fn name(&self) -> &str {
        &self.name
    }

    fn name_patterns(&self) -> Vec<NamePattern> {
        vec![NamePattern::new(&self.name)]
    }
}

/// Patterns mapped to the indices of the records that own them,
/// longest pattern first
#[derive(Debug, Clone, Default)]
pub struct NameMap {
    entries: Vec<(NamePattern, Vec<usize>)>,
}

impl NameMap {
    pub fn build<T: Named>(things: &[T]) -> Self {
        let mut entries: Vec<(NamePattern, Vec<usize>)> = Vec::new();

        for (idx, thing) in things.iter().enumerate() {
            for pattern in thing.name_patterns() {
                match entries.iter_mut().find(|(p, _)| p.key() == pattern.key()) {
                    Some((_, owners)) => {
                        if !owners.contains(&idx) {
                            owners.push(idx);
                        }
                    }
                    None => entries.push((pattern, vec![idx])),
                }
            }
        }

        entries.sort_by(|a, b| b.0.key().chars().count().cmp(&a.0.key().chars().count()));
        Self { entries }
    }

    pub fn iter(&self) -> impl Iterator<Item = &(NamePattern, Vec<usize>)> {
        self.entries.iter()
    }

    /// Indices of every record with a pattern found in `query`, in record order
    pub fn matching(&self, query: &str) -> Vec<usize> {
        let mut found: Vec<usize> = self
            .entries
            .iter()
            .filter(|(pattern, _)| pattern.is_match(query))
            .flat_map(|(_, owners)| owners.iter().copied())
            .collect();
        found.sort_unstable();
        found.dedup();
        found
    }
}

/// Resolve `query` to exactly one record, returning its index
pub fn resolve<T: Named>(things: &[T], query: &str) -> Result<usize> {
    let matched = NameMap::build(things).matching(query);

    match matched.len() {
        1 => Ok(matched[0]),
        0 => Err(FriendsError::NotFound {
            kind: T::KIND,
            query: query.to_string(),
        }),
        _ => {
            let exact: Vec<usize> = matched
                .iter()
                .copied()
                .filter(|&i| same_name(things[i].name(), query.trim()))
                .collect();

            if exact.len() == 1 {
                return Ok(exact[0]);
            }

            Err(FriendsError::Ambiguous {
                kind: T::KIND,
                query: query.to_string(),
                names: matched.iter().map(|&i| things[i].name().to_string()).collect(),
            })
        }
    }
}
