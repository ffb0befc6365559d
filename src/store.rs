use crate::error::{FriendsError, Result};
use crate::resolver::Named;
use crate::types::{same_name, Activity, Friend, Location};
use std::cmp::Reverse;
use std::fs;
use std::path::Path;

pub const ACTIVITIES_HEADER: &str = "### Activities:";
pub const FRIENDS_HEADER: &str = "### Friends:";
pub const LOCATIONS_HEADER: &str = "### Locations:";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Activities,
    Friends,
    Locations,
}

impl Section {
    fn expected_format(self) -> &'static str {
        match self {
            Section::Activities => "YYYY-MM-DD: Description",
            Section::Friends => "- Name (a.k.a. Nickname) [Location] @tag",
            Section::Locations => "- Name",
        }
    }
}

/// Section headers in file order
const SECTIONS: [(&str, Section); 3] = [
    (ACTIVITIES_HEADER, Section::Activities),
    (FRIENDS_HEADER, Section::Friends),
    (LOCATIONS_HEADER, Section::Locations),
];

/// The three record lists of a friends file
#[derive(Debug, Clone, Default)]
pub struct FriendsFile {
    pub activities: Vec<Activity>,
    pub friends: Vec<Friend>,
    pub locations: Vec<Location>,
}

impl FriendsFile {
    /// Load a file, or start empty if it does not exist yet
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::debug!("{} does not exist, starting empty", path.display());
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)?;
        let file = Self::parse(&content)?;
        log::debug!(
            "Loaded {} activities, {} friends, {} locations from {}",
            file.activities.len(),
            file.friends.len(),
            file.locations.len(),
            path.display()
        );
        Ok(file)
    }

    /// Parse file content and compute activity counts
    pub fn parse(content: &str) -> Result<Self> {
        let mut file = Self::default();
        let mut state: Option<Section> = None;

        for (idx, raw) in content.lines().enumerate() {
            let line_no = idx + 1;
            let line = raw.trim_end();

            if line.trim().is_empty() {
                state = None;
                continue;
            }

            if let Some((_, section)) = SECTIONS.iter().find(|(header, _)| *header == line) {
                state = Some(*section);
                continue;
            }

            let section = state.ok_or_else(|| FriendsError::Parse {
                line: line_no,
                message: format!("unrecognized header \"{}\"", line),
            })?;

            let parsed = match section {
                Section::Activities => Activity::deserialize(line).map(|a| file.activities.push(a)),
                Section::Friends => Friend::deserialize(line).map(|f| file.friends.push(f)),
                Section::Locations => Location::deserialize(line).map(|l| file.locations.push(l)),
            };

            parsed.map_err(|e| FriendsError::Parse {
                line: line_no,
                message: format!("expected \"{}\", {}", section.expected_format(), e),
            })?;
        }

        file.count_mentions()?;
        Ok(file)
    }

    /// Recompute `n_activities` for every friend and location from activity mentions.
    ///
    /// A mention matching no record is ignored; one matching several
    /// records (case-insensitively) is an error.
    pub fn count_mentions(&mut self) -> Result<()> {
        for friend in &mut self.friends {
            friend.n_activities = 0;
        }
        for location in &mut self.locations {
            location.n_activities = 0;
        }

        for activity in &self.activities {
            for name in activity.friend_names() {
                let idx = unique_named(&self.friends, &name)?;
                if let Some(i) = idx {
                    self.friends[i].n_activities += 1;
                }
            }

            for name in activity.location_names() {
                let idx = unique_named(&self.locations, &name)?;
                if let Some(i) = idx {
                    self.locations[i].n_activities += 1;
                }
            }
        }

        Ok(())
    }

    /// Render in canonical form: fixed section order, each list sorted
    pub fn render(&self) -> String {
        let mut activities: Vec<&Activity> = self.activities.iter().collect();
        activities.sort_by_key(|a| Reverse(a.date));

        let mut friends: Vec<&Friend> = self.friends.iter().collect();
        friends.sort_by(|a, b| a.name.cmp(&b.name));

        let mut locations: Vec<&Location> = self.locations.iter().collect();
        locations.sort_by(|a, b| a.name.cmp(&b.name));

        let sections = [
            (ACTIVITIES_HEADER, activities.iter().map(|a| a.serialize()).collect::<Vec<_>>()),
            (FRIENDS_HEADER, friends.iter().map(|f| f.serialize()).collect()),
            (LOCATIONS_HEADER, locations.iter().map(|l| l.serialize()).collect()),
        ];

        sections
            .iter()
            .map(|(header, lines)| {
                let mut block = String::from(*header);
                for line in lines {
                    block.push('\n');
                    block.push_str(line);
                }
                block
            })
            .collect::<Vec<_>>()
            .join("\n\n")
            + "\n"
    }

    /// Rewrite the whole file
    pub fn save(&self, path: &Path) -> Result<()> {
        fs::write(path, self.render())?;
        log::debug!("Wrote {}", path.display());
        Ok(())
    }
}

fn unique_named<T: Named>(things: &[T], name: &str) -> Result<Option<usize>> {
    let mut matches = things
        .iter()
        .enumerate()
        .filter(|(_, t)| same_name(t.name(), name))
        .map(|(i, _)| i);

    let first = matches.next();
    if matches.next().is_some() {
        return Err(FriendsError::InconsistentMention {
            kind: T::KIND,
            name: name.to_string(),
        });
    }
    Ok(first)
}
