use crate::error::{FriendsError, Result};
use chrono::NaiveDate;
use regex::{Captures, Regex};
use std::sync::LazyLock;

/// Date format used for activity lines
pub const DATE_FORMAT: &str = "%Y-%m-%d";

const RECORD_PREFIX: &str = "- ";
const NICKNAME_PREFIX: &str = "a.k.a. ";
const NICKNAME_SEPARATOR: &str = " a.k.a. ";

/// Characters that would break a friend or location line
const RESERVED_NAME_CHARS: &[char] = &['(', ')', '[', ']', '@', '*', '_', '\n', '\r'];

static FRIEND_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"^- (?P<name>[^()\[\]@]*[^()\[\]@\s])",
        r"(?:\s+\(a\.k\.a\. (?P<nicknames>[^)]*)\))?",
        r"(?:\s+\[(?P<location>[^\]]+)\])?",
        r"(?P<tags>(?:\s+@\S+)*)\s*$",
    ))
    .unwrap()
});
static LOCATION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^- (?P<name>\S(?:.*\S)?)\s*$").unwrap());
static ACTIVITY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:- )?(?P<date>\d{4}-\d{2}-\d{2}): ?(?P<description>.*)$").unwrap()
});

// Mentions embedded in activity descriptions
static FRIEND_MENTION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\*\*([^*]+)\*\*").unwrap());
static LOCATION_MENTION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(^|[^\w])_([^_\s][^_]*)_").unwrap());
static TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:^|[^\w@])(@\w[\w-]*(?::\w[\w-]*)*)").unwrap());

/// Check that a friend, location or nickname can be written to the file and read back
pub fn validate_name(name: &str) -> Result<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() || trimmed.contains(RESERVED_NAME_CHARS) || trimmed.contains(NICKNAME_PREFIX)
    {
        return Err(FriendsError::InvalidName(name.to_string()));
    }
    Ok(trimmed.to_string())
}

/// Names in mentions and lookups compare case-insensitively
pub fn same_name(a: &str, b: &str) -> bool {
    a.to_lowercase() == b.to_lowercase()
}

// A name read from the file must survive being written back
fn loaded_name(name: &str, kind: &'static str, line: &str) -> Result<String> {
    validate_name(name).map_err(|_| FriendsError::MalformedRecord {
        kind,
        text: line.to_string(),
    })
}

/// Extract every `@tag` from free text, in order of appearance, without duplicates
pub fn extract_tags(text: &str) -> Vec<String> {
    unique(TAG_RE.captures_iter(text).map(|c| c[1].to_string()))
}

/// Byte ranges of mention and tag markup already present in a description
pub fn markup_spans(text: &str) -> Vec<(usize, usize)> {
    let mut spans: Vec<(usize, usize)> = FRIEND_MENTION_RE
        .find_iter(text)
        .map(|m| (m.start(), m.end()))
        .collect();
    spans.extend(
        LOCATION_MENTION_RE
            .captures_iter(text)
            .filter_map(|c| c.get(2))
            .map(|m| (m.start() - 1, m.end() + 1)),
    );
    spans.extend(
        TAG_RE
            .captures_iter(text)
            .filter_map(|c| c.get(1))
            .map(|m| (m.start(), m.end())),
    );
    spans.sort_unstable();

    let mut merged: Vec<(usize, usize)> = Vec::new();
    for (start, end) in spans {
        match merged.last_mut() {
            Some(last) if start < last.1 => last.1 = last.1.max(end),
            _ => merged.push((start, end)),
        }
    }
    merged
}

fn unique(items: impl Iterator<Item = String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for item in items {
        if !out.contains(&item) {
            out.push(item);
        }
    }
    out
}

// =============================================================================
// Friend
// =============================================================================

/// A person being tracked
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Friend {
    pub name: String,
    pub nicknames: Vec<String>,
    pub location_name: Option<String>,
    pub tags: Vec<String>,
    /// Number of activities mentioning this friend, computed after load
    pub n_activities: usize,
}

impl Friend {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Serialize as a single `- ` prefixed line
    pub fn serialize(&self) -> String {
        format!("{}{}", RECORD_PREFIX, self.describe())
    }

    /// The line body without its prefix, used for verbose listings
    pub fn describe(&self) -> String {
        let mut out = self.name.clone();

        if !self.nicknames.is_empty() {
            let nicknames: Vec<String> = self
                .nicknames
                .iter()
                .map(|n| format!("{}{}", NICKNAME_PREFIX, n))
                .collect();
            out.push_str(&format!(" ({})", nicknames.join(" ")));
        }

        if let Some(location) = &self.location_name {
            out.push_str(&format!(" [{}]", location));
        }

        if !self.tags.is_empty() {
            out.push(' ');
            out.push_str(&self.tags.join(" "));
        }

        out
    }

    pub fn deserialize(line: &str) -> Result<Self> {
        let malformed = || FriendsError::MalformedRecord {
            kind: "friend",
            text: line.to_string(),
        };
        let caps = FRIEND_RE.captures(line).ok_or_else(malformed)?;

        let nicknames = match caps.name("nicknames") {
            Some(m) => m
                .as_str()
                .split(NICKNAME_SEPARATOR)
                .filter(|n| !n.trim().is_empty())
                .map(|n| loaded_name(n, "friend", line))
                .collect::<Result<Vec<_>>>()?,
            None => Vec::new(),
        };
        let location_name = caps
            .name("location")
            .map(|m| loaded_name(m.as_str(), "friend", line))
            .transpose()?;

        let tags: Vec<String> = caps
            .name("tags")
            .map(|m| m.as_str().split_whitespace().map(String::from).collect())
            .unwrap_or_default();
        if tags.iter().any(|t| t.len() < 2) {
            return Err(malformed());
        }

        Ok(Self {
            name: loaded_name(&caps["name"], "friend", line)?,
            nicknames,
            location_name,
            tags,
            n_activities: 0,
        })
    }

    pub fn add_nickname(&mut self, nickname: &str) -> Result<()> {
        let nickname = validate_name(nickname)?;
        if self.nicknames.contains(&nickname) {
            return Err(FriendsError::DuplicateEntity {
                kind: "nickname",
                name: nickname,
            });
        }
        self.nicknames.push(nickname);
        Ok(())
    }

    pub fn remove_nickname(&mut self, nickname: &str) -> Result<()> {
        let idx = self
            .nicknames
            .iter()
            .position(|n| n == nickname)
            .ok_or_else(|| FriendsError::MissingAnnotation {
                what: "nickname",
                value: nickname.to_string(),
                friend: self.name.clone(),
            })?;
        self.nicknames.remove(idx);
        Ok(())
    }

    pub fn add_tag(&mut self, tag: &str) -> Result<()> {
        if extract_tags(tag) != [tag] {
            return Err(FriendsError::InvalidName(tag.to_string()));
        }
        if self.has_tag(tag) {
            return Err(FriendsError::DuplicateEntity {
                kind: "tag",
                name: tag.to_string(),
            });
        }
        self.tags.push(tag.to_string());
        Ok(())
    }

    pub fn remove_tag(&mut self, tag: &str) -> Result<()> {
        let idx = self.tags.iter().position(|t| t == tag).ok_or_else(|| {
            FriendsError::MissingAnnotation {
                what: "tag",
                value: tag.to_string(),
                friend: self.name.clone(),
            }
        })?;
        self.tags.remove(idx);
        Ok(())
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }
}

// =============================================================================
// Location
// =============================================================================

/// A place where activities happen
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Location {
    pub name: String,
    pub n_activities: usize,
}

impl Location {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            n_activities: 0,
        }
    }

    pub fn serialize(&self) -> String {
        format!("{}{}", RECORD_PREFIX, self.name)
    }

    pub fn deserialize(line: &str) -> Result<Self> {
        let caps = LOCATION_RE
            .captures(line)
            .ok_or_else(|| FriendsError::MalformedRecord {
                kind: "location",
                text: line.to_string(),
            })?;
        Ok(Self::new(loaded_name(&caps["name"], "location", line)?))
    }
}

// =============================================================================
// Activity
// =============================================================================

/// A dated entry. Friends appear as `**Name**`, locations as `_Name_`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Activity {
    pub date: NaiveDate,
    pub description: String,
}

impl Activity {
    pub fn new(date: NaiveDate, description: impl Into<String>) -> Self {
        Self {
            date,
            description: description.into(),
        }
    }

    pub fn serialize(&self) -> String {
        format!("{}: {}", self.date.format(DATE_FORMAT), self.description)
    }

    pub fn deserialize(line: &str) -> Result<Self> {
        let malformed = || FriendsError::MalformedRecord {
            kind: "activity",
            text: line.to_string(),
        };
        let caps = ACTIVITY_RE.captures(line).ok_or_else(malformed)?;
        let date = NaiveDate::parse_from_str(&caps["date"], DATE_FORMAT).map_err(|_| malformed())?;

        Ok(Self::new(date, caps["description"].trim()))
    }

    pub fn friend_names(&self) -> Vec<String> {
        unique(
            FRIEND_MENTION_RE
                .captures_iter(&self.description)
                .map(|c| c[1].to_string()),
        )
    }

    pub fn location_names(&self) -> Vec<String> {
        unique(
            LOCATION_MENTION_RE
                .captures_iter(&self.description)
                .map(|c| c[2].to_string()),
        )
    }

    pub fn tags(&self) -> Vec<String> {
        extract_tags(&self.description)
    }

    pub fn includes_friend(&self, name: &str) -> bool {
        self.friend_names().iter().any(|n| same_name(n, name))
    }

    pub fn includes_location(&self, name: &str) -> bool {
        self.location_names().iter().any(|n| same_name(n, name))
    }

    pub fn includes_tag(&self, tag: &str) -> bool {
        self.tags().iter().any(|t| t == tag)
    }

    /// Rewrite `**old**` mentions in any case. Returns true if anything changed.
    pub fn rename_friend(&mut self, old: &str, new: &str) -> bool {
        let mut changed = false;
        let rewritten = FRIEND_MENTION_RE
            .replace_all(&self.description, |caps: &Captures| {
                if same_name(&caps[1], old) {
                    changed = true;
                    format!("**{}**", new)
                } else {
                    caps[0].to_string()
                }
            })
            .into_owned();
        self.description = rewritten;
        changed
    }

    /// Rewrite `_old_` mentions in any case. Returns true if anything changed.
    pub fn rename_location(&mut self, old: &str, new: &str) -> bool {
        let mut changed = false;
        let rewritten = LOCATION_MENTION_RE
            .replace_all(&self.description, |caps: &Captures| {
                if same_name(&caps[2], old) {
                    changed = true;
                    format!("{}_{}_", &caps[1], new)
                } else {
                    caps[0].to_string()
                }
            })
            .into_owned();
        self.description = rewritten;
        changed
    }
}

// =============================================================================
// Aggregates
// =============================================================================

/// Friends grouped by how often they have been seen
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Suggestions {
    pub distant: Vec<String>,
    pub moderate: Vec<String>,
    pub close: Vec<String>,
}

/// Statistics about the friends file
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Stats {
    pub total_activities: usize,
    pub total_friends: usize,
    pub total_locations: usize,
    pub total_tags: usize,
    pub elapsed_days: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, DATE_FORMAT).unwrap()
    }

    #[test]
    fn test_friend_round_trip() {
        let friend = Friend {
            name: "Grace Hopper".to_string(),
            nicknames: vec!["The Admiral".to_string(), "Amazing Grace".to_string()],
            location_name: Some("New York City".to_string()),
            tags: vec!["@navy".to_string(), "@science:cs".to_string()],
            n_activities: 0,
        };

        let line = friend.serialize();
        assert_eq!(
            line,
            "- Grace Hopper (a.k.a. The Admiral a.k.a. Amazing Grace) [New York City] @navy @science:cs"
        );
        assert_eq!(Friend::deserialize(&line).unwrap(), friend);
    }

    #[test]
    fn test_friend_partial_annotations() {
        let bare = Friend::new("Alan Turing");
        assert_eq!(bare.serialize(), "- Alan Turing");
        assert_eq!(Friend::deserialize(&bare.serialize()).unwrap(), bare);

        let mut tagged = Friend::new("Ada");
        tagged.add_tag("@math").unwrap();
        let parsed = Friend::deserialize(&tagged.serialize()).unwrap();
        assert_eq!(parsed.tags, vec!["@math"]);
        assert!(parsed.location_name.is_none());
        assert!(parsed.nicknames.is_empty());
    }

    #[test]
    fn test_friend_malformed() {
        let err = Friend::deserialize("Grace Hopper").unwrap_err();
        assert!(matches!(err, FriendsError::MalformedRecord { kind: "friend", .. }));
        assert!(Friend::deserialize("- ").is_err());
        assert!(Friend::deserialize("- Grace [Paris").is_err());
    }

    #[test]
    fn test_location_round_trip() {
        let location = Location::new("Marie's Diner");
        assert_eq!(location.serialize(), "- Marie's Diner");
        assert_eq!(Location::deserialize(&location.serialize()).unwrap(), location);
        assert!(Location::deserialize("Paris").is_err());
    }

    #[test]
    fn test_activity_round_trip() {
        let activity = Activity::new(
            date("2017-03-04"),
            "Lunch with **Grace Hopper** in _Paris_. @food",
        );
        let line = activity.serialize();
        assert_eq!(line, "2017-03-04: Lunch with **Grace Hopper** in _Paris_. @food");
        assert_eq!(Activity::deserialize(&line).unwrap(), activity);

        // A leading record prefix is tolerated on read
        assert_eq!(Activity::deserialize(&format!("- {}", line)).unwrap(), activity);
    }

    #[test]
    fn test_activity_malformed() {
        assert!(Activity::deserialize("Lunch with friends").is_err());
        assert!(Activity::deserialize("2017-13-45: bad date").is_err());
    }

    #[test]
    fn test_activity_mentions() {
        let activity = Activity::new(
            date("2017-03-04"),
            "**Grace Hopper** and **Alan Turing** at _Marie's Diner_ then _Paris_ @food @work:meeting **Grace Hopper** email@example.com @snake_case_tag",
        );
        assert_eq!(activity.friend_names(), vec!["Grace Hopper", "Alan Turing"]);
        assert_eq!(activity.location_names(), vec!["Marie's Diner", "Paris"]);
        assert_eq!(activity.tags(), vec!["@food", "@work:meeting", "@snake_case_tag"]);
        assert!(activity.includes_tag("@food"));
        assert!(!activity.includes_tag("@Food"));
    }

    #[test]
    fn test_activity_rename() {
        let mut activity = Activity::new(date("2017-03-04"), "**Grace** went to _Paris_");
        assert!(activity.rename_friend("Grace", "Grace Hopper"));
        assert!(activity.rename_location("Paris", "Lyon"));
        assert!(!activity.rename_friend("Alan", "Alan Turing"));
        assert_eq!(activity.description, "**Grace Hopper** went to _Lyon_");
    }

    #[test]
    fn test_nickname_and_tag_annotations() {
        let mut friend = Friend::new("Grace Hopper");
        friend.add_nickname("The Admiral").unwrap();
        assert!(matches!(
            friend.add_nickname("The Admiral"),
            Err(FriendsError::DuplicateEntity { .. })
        ));
        assert!(matches!(
            friend.remove_nickname("Gracie"),
            Err(FriendsError::MissingAnnotation { .. })
        ));
        friend.remove_nickname("The Admiral").unwrap();
        assert!(friend.nicknames.is_empty());

        friend.add_tag("@navy").unwrap();
        assert!(friend.add_tag("navy").is_err());
        assert!(matches!(
            friend.remove_tag("@army"),
            Err(FriendsError::MissingAnnotation { .. })
        ));
    }

    #[test]
    fn test_mentions_match_in_any_case() {
        let mut activity = Activity::new(date("2017-01-05"), "Lunch with **grace hopper** at _paris_");
        assert!(activity.includes_friend("Grace Hopper"));
        assert!(activity.includes_location("Paris"));

        assert!(activity.rename_friend("Grace Hopper", "Grace Brewster Hopper"));
        assert!(activity.rename_location("Paris", "Lyon"));
        assert_eq!(activity.description, "Lunch with **Grace Brewster Hopper** at _Lyon_");
    }

    #[test]
    fn test_unwritable_names_rejected_on_load() {
        assert!(matches!(
            Location::deserialize("- Cafe [Downtown]"),
            Err(FriendsError::MalformedRecord { kind: "location", .. })
        ));
        assert!(Location::deserialize("- Snake_Case").is_err());
        assert!(Location::deserialize("- **Bold**").is_err());
        assert!(Friend::deserialize("- Bob [Cafe_Downtown]").is_err());
        assert!(Friend::deserialize("- Bob (a.k.a. *Bobby*)").is_err());
        assert!(Friend::deserialize("- Snake_Case").is_err());
    }

    #[test]
    fn test_markup_spans() {
        let text = "**Grace** at _Paris_ @food";
        let spans = markup_spans(text);
        assert_eq!(spans, vec![(0, 9), (13, 20), (21, 26)]);
        assert_eq!(&text[13..20], "_Paris_");
    }

    #[test]
    fn test_validate_name() {
        assert_eq!(validate_name("  Grace Hopper ").unwrap(), "Grace Hopper");
        assert!(validate_name("").is_err());
        assert!(validate_name("Grace (Admiral)").is_err());
        assert!(validate_name("@grace").is_err());
    }
}
