use crate::error::{FriendsError, Result};
use crate::resolver::{resolve, NameMap, Named};
use crate::store::FriendsFile;
use crate::types::{markup_spans, same_name, validate_name, Activity, Friend, Location, Stats, Suggestions};
use chrono::{Datelike, NaiveDate};
use regex::{Captures, Regex};
use std::cmp::Reverse;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::LazyLock;

// Placeholders used while highlighting a description
const HELD_OPEN: char = '\u{E000}';
const HELD_CLOSE: char = '\u{E001}';
const FRIEND_OPEN: char = '\u{E002}';
const FRIEND_CLOSE: char = '\u{E003}';

static HELD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\x{E000}(\d+)\x{E001}").unwrap());
static FRIEND_SLOT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\x{E002}(\d+)\x{E003}").unwrap());

/// Narrowing applied to activity listings and graphs. Unset fields are ignored.
#[derive(Debug, Clone, Default)]
pub struct ActivityFilter {
    pub with: Option<String>,
    pub location: Option<String>,
    pub tagged: Option<String>,
    pub since: Option<NaiveDate>,
    pub until: Option<NaiveDate>,
}

/// Where `list_tags` collects tags from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TagSource {
    Activities,
    Friends,
    #[default]
    Both,
}

impl FromStr for TagSource {
    type Err = FriendsError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "activities" => Ok(Self::Activities),
            "friends" => Ok(Self::Friends),
            "both" => Ok(Self::Both),
            other => Err(FriendsError::InvalidSelector(other.to_string())),
        }
    }
}

/// The in-memory friends file and every command that reads or changes it
pub struct Introvert {
    path: PathBuf,
    data: FriendsFile,
    dirty: bool,
}

impl Introvert {
    /// Load the friends file at `path` (empty if it does not exist)
    pub fn open(path: &Path) -> Result<Self> {
        let data = FriendsFile::load(path)?;
        Ok(Self::new(path.to_path_buf(), data))
    }

    pub fn new(path: PathBuf, data: FriendsFile) -> Self {
        Self {
            path,
            data,
            dirty: false,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    #[cfg(test)]
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Rewrite the file if anything changed. Returns whether it was written.
    pub fn save_if_dirty(&mut self) -> Result<bool> {
        if !self.dirty {
            log::debug!("No changes, leaving {} untouched", self.path.display());
            return Ok(false);
        }
        self.data.save(&self.path)?;
        self.dirty = false;
        Ok(true)
    }

    #[cfg(test)]
    pub fn activities(&self) -> &[Activity] {
        &self.data.activities
    }

    #[cfg(test)]
    pub fn friends(&self) -> &[Friend] {
        &self.data.friends
    }

    #[cfg(test)]
    pub fn locations(&self) -> &[Location] {
        &self.data.locations
    }

    /// Force a canonical rewrite of the file
    pub fn clean(&mut self) {
        self.dirty = true;
    }

    fn touched(&mut self) -> Result<()> {
        self.dirty = true;
        self.data.count_mentions()
    }

    // =========================================================================
    // Lookups
    // =========================================================================

    pub fn friend_with_name_in(&self, query: &str) -> Result<&Friend> {
        Ok(&self.data.friends[resolve(&self.data.friends, query)?])
    }

    pub fn location_with_name_in(&self, query: &str) -> Result<&Location> {
        Ok(&self.data.locations[resolve(&self.data.locations, query)?])
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    pub fn add_friend(&mut self, name: &str) -> Result<&Friend> {
        let name = validate_name(name)?;
        if self.data.friends.iter().any(|f| f.name == name) {
            return Err(FriendsError::DuplicateEntity {
                kind: Friend::KIND,
                name,
            });
        }

        self.data.friends.push(Friend::new(name));
        self.touched()?;
        Ok(&self.data.friends[self.data.friends.len() - 1])
    }

    pub fn add_location(&mut self, name: &str) -> Result<&Location> {
        let name = validate_name(name)?;
        if self.data.locations.iter().any(|l| l.name == name) {
            return Err(FriendsError::DuplicateEntity {
                kind: Location::KIND,
                name,
            });
        }

        self.data.locations.push(Location::new(name));
        self.touched()?;
        Ok(&self.data.locations[self.data.locations.len() - 1])
    }

    /// Add an activity in front of all others, highlighting the friends and
    /// locations its description mentions
    pub fn add_activity(&mut self, date: NaiveDate, description: &str) -> Result<&Activity> {
        let description = description.trim();
        if description.is_empty() || description.contains(['\n', '\r']) {
            return Err(FriendsError::MalformedRecord {
                kind: "activity",
                text: description.to_string(),
            });
        }

        let activity = Activity::new(date, self.highlight_description(description));
        self.data.activities.insert(0, activity);
        self.touched()?;
        Ok(&self.data.activities[0])
    }

    /// Returns the friend's previous name
    pub fn rename_friend(&mut self, query: &str, new_name: &str) -> Result<String> {
        let new_name = validate_name(new_name)?;
        let idx = resolve(&self.data.friends, query)?;
        if self.data.friends.iter().enumerate().any(|(i, f)| i != idx && f.name == new_name) {
            return Err(FriendsError::DuplicateEntity {
                kind: Friend::KIND,
                name: new_name,
            });
        }

        let old_name = std::mem::replace(&mut self.data.friends[idx].name, new_name.clone());
        let rewritten = self
            .data
            .activities
            .iter_mut()
            .filter_map(|a| a.rename_friend(&old_name, &new_name).then_some(()))
            .count();
        log::debug!("Renamed {} to {} in {} activities", old_name, new_name, rewritten);

        self.touched()?;
        Ok(old_name)
    }

    /// Returns the location's previous name
    pub fn rename_location(&mut self, query: &str, new_name: &str) -> Result<String> {
        let new_name = validate_name(new_name)?;
        let idx = resolve(&self.data.locations, query)?;
        if self.data.locations.iter().enumerate().any(|(i, l)| i != idx && l.name == new_name) {
            return Err(FriendsError::DuplicateEntity {
                kind: Location::KIND,
                name: new_name,
            });
        }

        let old_name = std::mem::replace(&mut self.data.locations[idx].name, new_name.clone());
        for friend in &mut self.data.friends {
            if friend.location_name.as_deref().is_some_and(|l| same_name(l, &old_name)) {
                friend.location_name = Some(new_name.clone());
            }
        }
        for activity in &mut self.data.activities {
            activity.rename_location(&old_name, &new_name);
        }

        self.touched()?;
        Ok(old_name)
    }

    /// Returns the resolved (friend, location) names
    pub fn set_location(&mut self, friend_query: &str, location_query: &str) -> Result<(String, String)> {
        let location = self.location_with_name_in(location_query)?.name.clone();
        let idx = resolve(&self.data.friends, friend_query)?;

        let friend = &mut self.data.friends[idx];
        friend.location_name = Some(location.clone());
        let friend_name = friend.name.clone();

        self.touched()?;
        Ok((friend_name, location))
    }

    /// Apply `edit` to the friend matching `query`, returning the friend's name
    fn edit_friend(&mut self, query: &str, edit: impl FnOnce(&mut Friend) -> Result<()>) -> Result<String> {
        let idx = resolve(&self.data.friends, query)?;
        let friend = &mut self.data.friends[idx];
        edit(friend)?;
        let name = friend.name.clone();

        self.touched()?;
        Ok(name)
    }

    pub fn add_nickname(&mut self, query: &str, nickname: &str) -> Result<String> {
        self.edit_friend(query, |f| f.add_nickname(nickname))
    }

    pub fn remove_nickname(&mut self, query: &str, nickname: &str) -> Result<String> {
        self.edit_friend(query, |f| f.remove_nickname(nickname.trim()))
    }

    pub fn add_tag(&mut self, query: &str, tag: &str) -> Result<String> {
        self.edit_friend(query, |f| f.add_tag(tag))
    }

    pub fn remove_tag(&mut self, query: &str, tag: &str) -> Result<String> {
        self.edit_friend(query, |f| f.remove_tag(tag))
    }

    // =========================================================================
    // Highlighting
    // =========================================================================

    /// Mark up every location (`_Name_`) and friend (`**Name**`) that `description`
    /// refers to. Existing markup and tags are left alone.
    pub fn highlight_description(&self, description: &str) -> String {
        let mut held: Vec<String> = Vec::new();
        let mut text = hold_spans(description, &markup_spans(description), &mut held);

        let locations = NameMap::build(&self.data.locations);
        for (pattern, owners) in locations.iter() {
            let markup = format!("_{}_", self.data.locations[owners[0]].name);
            text = pattern.replace_all(&text, |_| hold(&mut held, markup.clone()));
        }

        // Longest patterns claim their text first
        let mut candidates: Vec<Vec<usize>> = Vec::new();
        let friends = NameMap::build(&self.data.friends);
        for (pattern, owners) in friends.iter() {
            text = pattern.replace_all(&text, |_| {
                candidates.push(owners.clone());
                format!("{}{}{}", FRIEND_OPEN, candidates.len() - 1, FRIEND_CLOSE)
            });
        }

        let (definite, possible): (Vec<&Vec<usize>>, Vec<&Vec<usize>>) =
            candidates.iter().partition(|owners| owners.len() == 1);
        let definite: Vec<usize> = definite.into_iter().flatten().copied().collect();
        let possible: Vec<Vec<usize>> = possible.into_iter().cloned().collect();
        let scores = self.likelihood_scores(&definite, &possible);

        let chosen: Vec<String> = candidates
            .iter()
            .map(|owners| {
                let best = owners
                    .iter()
                    .copied()
                    .max_by(|&a, &b| {
                        let score = |i: usize| scores.get(&i).copied().unwrap_or(0);
                        score(a)
                            .cmp(&score(b))
                            .then(self.data.friends[a].n_activities.cmp(&self.data.friends[b].n_activities))
                            .then(b.cmp(&a))
                    })
                    .unwrap_or(owners[0]);
                format!("**{}**", self.data.friends[best].name)
            })
            .collect();

        let text = fill_slots(&FRIEND_SLOT_RE, &text, &chosen);
        fill_slots(&HELD_RE, &text, &held)
    }

    /// Estimate how likely each candidate friend is to be the one meant, by
    /// counting past activities that mention exactly a pair drawn from the
    /// confirmed matches and the candidates.
    ///
    /// Pairs already inside the confirmed set or inside one candidate group
    /// are skipped. Keys are friend indices.
    pub fn likelihood_scores(&self, matches: &[usize], possible_matches: &[Vec<usize>]) -> HashMap<usize, usize> {
        let mut pool: Vec<usize> = matches
            .iter()
            .chain(possible_matches.iter().flatten())
            .copied()
            .collect();
        pool.sort_unstable();
        pool.dedup();

        let mut pairs: Vec<(usize, usize)> = Vec::new();
        for (i, &a) in pool.iter().enumerate() {
            for &b in &pool[i + 1..] {
                let together = |group: &[usize]| group.contains(&a) && group.contains(&b);
                if together(matches) || possible_matches.iter().any(|g| together(g.as_slice())) {
                    continue;
                }
                pairs.push((a, b));
            }
        }

        let mut scores: HashMap<usize, usize> = HashMap::new();
        for activity in &self.data.activities {
            let names = activity.friend_names();
            for &(a, b) in &pairs {
                if names.contains(&self.data.friends[a].name) && names.contains(&self.data.friends[b].name) {
                    *scores.entry(a).or_default() += 1;
                    *scores.entry(b).or_default() += 1;
                }
            }
        }
        scores
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Activities in file order, narrowed by friend, location, tag, then date range
    pub fn filtered_activities(&self, filter: &ActivityFilter) -> Result<Vec<&Activity>> {
        let mut activities: Vec<&Activity> = self.data.activities.iter().collect();

        if let Some(query) = &filter.with {
            let name = &self.friend_with_name_in(query)?.name;
            activities.retain(|a| a.includes_friend(name));
        }
        if let Some(query) = &filter.location {
            let name = &self.location_with_name_in(query)?.name;
            activities.retain(|a| a.includes_location(name));
        }
        if let Some(tag) = &filter.tagged {
            activities.retain(|a| a.includes_tag(tag));
        }
        if let Some(since) = filter.since {
            activities.retain(|a| a.date >= since);
        }
        if let Some(until) = filter.until {
            activities.retain(|a| a.date <= until);
        }

        Ok(activities)
    }

    pub fn list_activities(&self, filter: &ActivityFilter, limit: Option<usize>) -> Result<Vec<String>> {
        Ok(self
            .filtered_activities(filter)?
            .into_iter()
            .take(limit.unwrap_or(usize::MAX))
            .map(Activity::serialize)
            .collect())
    }

    pub fn list_friends(&self, location: Option<&str>, tagged: Option<&str>, verbose: bool) -> Result<Vec<String>> {
        let mut friends: Vec<&Friend> = self.data.friends.iter().collect();

        if let Some(query) = location {
            let name = &self.location_with_name_in(query)?.name;
            friends.retain(|f| f.location_name.as_deref().is_some_and(|l| same_name(l, name)));
        }
        if let Some(tag) = tagged {
            friends.retain(|f| f.has_tag(tag));
        }

        Ok(friends
            .into_iter()
            .map(|f| if verbose { f.describe() } else { f.name.clone() })
            .collect())
    }

    pub fn list_locations(&self) -> Vec<String> {
        self.data.locations.iter().map(|l| l.name.clone()).collect()
    }

    /// Every distinct tag, sorted case-insensitively
    pub fn list_tags(&self, from: TagSource) -> Vec<String> {
        let mut tags: HashSet<String> = HashSet::new();

        if from != TagSource::Friends {
            tags.extend(self.data.activities.iter().flat_map(|a| a.tags()));
        }
        if from != TagSource::Activities {
            tags.extend(self.data.friends.iter().flat_map(|f| f.tags.iter().cloned()));
        }

        let mut tags: Vec<String> = tags.into_iter().collect();
        tags.sort_by(|a, b| a.to_lowercase().cmp(&b.to_lowercase()).then_with(|| a.cmp(b)));
        tags
    }

    pub fn list_favorite_friends(&self, limit: usize) -> Vec<String> {
        favorite_things(&self.data.friends, |f| f.n_activities, limit)
    }

    pub fn list_favorite_locations(&self, limit: usize) -> Vec<String> {
        favorite_things(&self.data.locations, |l| l.n_activities, limit)
    }

    /// Split friends into distant, moderate and close by how often they appear
    pub fn suggest(&self, location: Option<&str>) -> Result<Suggestions> {
        let mut friends: Vec<&Friend> = self.data.friends.iter().collect();
        if let Some(query) = location {
            let name = &self.location_with_name_in(query)?.name;
            friends.retain(|f| f.location_name.as_deref().is_some_and(|l| same_name(l, name)));
        }
        friends.sort_by_key(|f| f.n_activities);

        let n_distant = friends.iter().take_while(|f| f.n_activities < 2).count();
        let rest = friends.split_off(n_distant);
        let n_moderate = rest.len() * 3 / 4;

        let names = |list: &[&Friend]| list.iter().map(|f| f.name.clone()).collect::<Vec<_>>();
        Ok(Suggestions {
            distant: names(&friends[..]),
            moderate: names(&rest[..n_moderate]),
            close: names(&rest[n_moderate..]),
        })
    }

    /// Activity counts per month ("Jan 2017") from the earliest to the latest
    /// matching activity, oldest first, including empty months
    pub fn graph(&self, filter: &ActivityFilter) -> Result<Vec<(String, usize)>> {
        let activities = self.filtered_activities(filter)?;

        let first = activities.iter().map(|a| a.date).min();
        let last = activities.iter().map(|a| a.date).max();
        let (Some(first), Some(last)) = (first, last) else {
            return Ok(Vec::new());
        };

        let mut counts: HashMap<(i32, u32), usize> = HashMap::new();
        for activity in &activities {
            *counts.entry((activity.date.year(), activity.date.month())).or_default() += 1;
        }

        let mut months = Vec::new();
        let (mut year, mut month) = (first.year(), first.month());
        while (year, month) <= (last.year(), last.month()) {
            let label = NaiveDate::from_ymd_opt(year, month, 1)
                .map(|d| d.format("%b %Y").to_string())
                .unwrap_or_default();
            months.push((label, counts.get(&(year, month)).copied().unwrap_or(0)));

            if month == 12 {
                year += 1;
                month = 1;
            } else {
                month += 1;
            }
        }

        Ok(months)
    }

    pub fn stats(&self) -> Stats {
        let dates = self.data.activities.iter().map(|a| a.date);
        let elapsed_days = match (dates.clone().min(), dates.max()) {
            (Some(first), Some(last)) => (last - first).num_days(),
            _ => 0,
        };

        Stats {
            total_activities: self.data.activities.len(),
            total_friends: self.data.friends.len(),
            total_locations: self.data.locations.len(),
            total_tags: self.list_tags(TagSource::Both).len(),
            elapsed_days,
        }
    }
}

/// Rank things by activity count, padding names so the counts line up
fn favorite_things<T: Named>(things: &[T], count: impl Fn(&T) -> usize, limit: usize) -> Vec<String> {
    let mut ranked: Vec<&T> = things.iter().collect();
    ranked.sort_by_key(|t| Reverse(count(*t)));
    ranked.truncate(limit);

    let name_width = ranked.iter().map(|t| t.name().chars().count()).max().unwrap_or(0);
    let rank_width = ranked.len().to_string().len();

    ranked
        .into_iter()
        .enumerate()
        .map(|(i, thing)| {
            let n = count(thing);
            // Only the top entry spells out its unit
            let label = match (i, n) {
                (0, 1) => " activity",
                (0, _) => " activities",
                _ => "",
            };
            format!(
                "{:>rw$}. {:<nw$} ({}{})",
                i + 1,
                thing.name(),
                n,
                label,
                rw = rank_width,
                nw = name_width
            )
        })
        .collect()
}

fn hold(held: &mut Vec<String>, value: String) -> String {
    held.push(value);
    format!("{}{}{}", HELD_OPEN, held.len() - 1, HELD_CLOSE)
}

fn hold_spans(text: &str, spans: &[(usize, usize)], held: &mut Vec<String>) -> String {
    let mut out = String::with_capacity(text.len());
    let mut last = 0;
    for &(start, end) in spans {
        out.push_str(&text[last..start]);
        out.push_str(&hold(held, text[start..end].to_string()));
        last = end;
    }
    out.push_str(&text[last..]);
    out
}

fn fill_slots(re: &Regex, text: &str, values: &[String]) -> String {
    re.replace_all(text, |caps: &Captures| {
        caps[1]
            .parse::<usize>()
            .ok()
            .and_then(|i| values.get(i))
            .cloned()
            .unwrap_or_else(|| caps[0].to_string())
    })
    .into_owned()
}
