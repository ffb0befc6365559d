pub mod activity;
pub mod config;
pub mod friend;
pub mod location;
pub mod report;

use crate::error::{FriendsError, Result};
use crate::introvert::{ActivityFilter, Introvert};
use crate::types::DATE_FORMAT;
use chrono::{Days, Local, Months, NaiveDate};
use clap::Args;
use colored::Colorize;
use regex::{Captures, Regex};
use std::path::Path;
use std::sync::LazyLock;

static AGO_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d+|a|an|one)\s+(day|week|month|year)s?\s+ago$").unwrap()
});
static MARKUP_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\*\*[^*]+\*\*)|((?:^|[^\w])_[^_\s][^_]*_)|((?:^|[^\w@])@\w[\w-]*(?::\w[\w-]*)*)").unwrap()
});

/// Extra date layouts accepted on the command line
const DATE_LAYOUTS: &[&str] = &[DATE_FORMAT, "%m/%d/%Y", "%B %d, %Y", "%B %d %Y", "%b %d, %Y", "%b %d %Y"];

/// Activity filters shared by `list activities` and `graph`
#[derive(Args, Debug, Default)]
pub struct FilterArgs {
    /// Only activities with this friend
    #[arg(long)]
    pub with: Option<String>,

    /// Only activities at this location
    #[arg(long = "in")]
    pub location: Option<String>,

    /// Only activities with this tag
    #[arg(long)]
    pub tagged: Option<String>,

    /// Only activities on or after this date
    #[arg(long)]
    pub since: Option<String>,

    /// Only activities on or before this date
    #[arg(long)]
    pub until: Option<String>,
}

impl FilterArgs {
    pub fn to_filter(&self) -> Result<ActivityFilter> {
        let today = today();
        Ok(ActivityFilter {
            with: clean(self.with.as_deref()),
            location: clean(self.location.as_deref()),
            tagged: self.tagged.as_deref().map(normalize_tag),
            since: self.since.as_deref().map(|s| parse_date(s, today)).transpose()?,
            until: self.until.as_deref().map(|s| parse_date(s, today)).transpose()?,
        })
    }
}

/// Open the friends file, run `command`, and write the file back only if it changed
pub fn with_introvert<T>(file: &Path, command: impl FnOnce(&mut Introvert) -> Result<T>) -> Result<T> {
    let mut intro = Introvert::open(file)?;
    let out = command(&mut intro)?;
    intro.save_if_dirty()?;
    Ok(out)
}

pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// Parse a date given on the command line, relative to `today`
pub fn parse_date(input: &str, today: NaiveDate) -> Result<NaiveDate> {
    let text = input.trim().to_lowercase();
    let invalid = || FriendsError::InvalidDate(input.trim().to_string());

    match text.as_str() {
        "today" | "now" => return Ok(today),
        "yesterday" => return today.checked_sub_days(Days::new(1)).ok_or_else(invalid),
        _ => {}
    }

    if let Some(caps) = AGO_RE.captures(&text) {
        let n: u32 = match &caps[1] {
            "a" | "an" | "one" => 1,
            digits => digits.parse().map_err(|_| invalid())?,
        };
        let date = match &caps[2] {
            "day" => today.checked_sub_days(Days::new(n.into())),
            "week" => today.checked_sub_days(Days::new(u64::from(n) * 7)),
            "month" => today.checked_sub_months(Months::new(n)),
            _ => today.checked_sub_months(Months::new(n * 12)),
        };
        return date.ok_or_else(invalid);
    }

    DATE_LAYOUTS
        .iter()
        .find_map(|layout| NaiveDate::parse_from_str(input.trim(), layout).ok())
        .ok_or_else(invalid)
}

/// Split `"<date>: <description>"`; without a recognizable date the whole text is the description
pub fn split_dated(text: &str, today: NaiveDate) -> (NaiveDate, String) {
    if let Some((head, rest)) = text.split_once(':') {
        if let Ok(date) = parse_date(head, today) {
            return (date, rest.trim().to_string());
        }
    }
    (today, text.trim().to_string())
}

/// Tags always carry a leading `@`
pub fn normalize_tag(tag: &str) -> String {
    let tag = tag.trim();
    if tag.starts_with('@') {
        tag.to_string()
    } else {
        format!("@{}", tag)
    }
}

fn clean(value: Option<&str>) -> Option<String> {
    value.map(str::trim).filter(|s| !s.is_empty()).map(String::from)
}

/// Colorize a serialized activity line for the terminal
pub fn paint_activity(line: &str) -> String {
    let (date, description) = line.split_once(": ").unwrap_or(("", line));
    let description = MARKUP_RE.replace_all(description, |caps: &Captures| {
        if let Some(m) = caps.get(1) {
            m.as_str().bold().magenta().to_string()
        } else if let Some(m) = caps.get(2) {
            paint_prefixed(m.as_str(), '_', |s| s.yellow().to_string())
        } else {
            paint_prefixed(&caps[3], '@', |s| s.cyan().to_string())
        }
    });

    if date.is_empty() {
        description.into_owned()
    } else {
        format!("{}: {}", date.green(), description)
    }
}

// Leave the boundary character that the pattern consumed uncolored
fn paint_prefixed(text: &str, marker: char, paint: impl Fn(&str) -> String) -> String {
    match text.find(marker) {
        Some(idx) => format!("{}{}", &text[..idx], paint(&text[idx..])),
        None => paint(text),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, DATE_FORMAT).unwrap()
    }

    #[test]
    fn test_parse_date() {
        let today = date("2017-03-10");

        assert_eq!(parse_date("today", today).unwrap(), today);
        assert_eq!(parse_date(" Yesterday ", today).unwrap(), date("2017-03-09"));
        assert_eq!(parse_date("3 days ago", today).unwrap(), date("2017-03-07"));
        assert_eq!(parse_date("a week ago", today).unwrap(), date("2017-03-03"));
        assert_eq!(parse_date("2 months ago", today).unwrap(), date("2017-01-10"));
        assert_eq!(parse_date("1 year ago", today).unwrap(), date("2016-03-10"));
        assert_eq!(parse_date("2016-12-25", today).unwrap(), date("2016-12-25"));
        assert_eq!(parse_date("12/25/2016", today).unwrap(), date("2016-12-25"));
        assert_eq!(parse_date("December 25, 2016", today).unwrap(), date("2016-12-25"));

        assert!(matches!(
            parse_date("someday", today),
            Err(FriendsError::InvalidDate(_))
        ));
    }

    #[test]
    fn test_split_dated() {
        let today = date("2017-03-10");

        assert_eq!(
            split_dated("yesterday: Lunch with Grace", today),
            (date("2017-03-09"), "Lunch with Grace".to_string())
        );
        assert_eq!(
            split_dated("2017-01-01: Party", today),
            (date("2017-01-01"), "Party".to_string())
        );
        assert_eq!(
            split_dated("Note: Grace says hi", today),
            (today, "Note: Grace says hi".to_string())
        );
    }

    #[test]
    fn test_normalize_tag() {
        assert_eq!(normalize_tag("food"), "@food");
        assert_eq!(normalize_tag(" @Food "), "@Food");
    }

    #[test]
    fn test_filter_args() {
        let args = FilterArgs {
            with: Some("  grace ".to_string()),
            location: Some("   ".to_string()),
            tagged: Some("food".to_string()),
            since: Some("2017-01-01".to_string()),
            until: None,
        };
        let filter = args.to_filter().unwrap();
        assert_eq!(filter.with.as_deref(), Some("grace"));
        assert!(filter.location.is_none());
        assert_eq!(filter.tagged.as_deref(), Some("@food"));
        assert_eq!(filter.since, Some(date("2017-01-01")));

        let bad = FilterArgs {
            until: Some("whenever".to_string()),
            ..Default::default()
        };
        assert!(bad.to_filter().is_err());
    }

    #[test]
    fn test_paint_activity_keeps_text() {
        colored::control::set_override(false);
        let line = "2017-01-01: **Grace Hopper** at _Paris_ @food";
        assert_eq!(paint_activity(line), line);
    }
}
