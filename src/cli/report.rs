use super::{with_introvert, FilterArgs};
use crate::error::Result;
use crate::introvert::TagSource;
use colored::Colorize;
use std::path::Path;

/// Run the graph command - one bar per month, newest first
pub fn run_graph(file: &Path, filter: &FilterArgs) -> Result<()> {
    let filter = filter.to_filter()?;
    let months = with_introvert(file, |intro| intro.graph(&filter))?;

    if months.is_empty() {
        println!("No activities to graph.");
        return Ok(());
    }

    for (label, count) in months.iter().rev() {
        println!("{} |{}", label, "█".repeat(*count).red());
    }

    Ok(())
}

/// Run the suggest command
pub fn run_suggest(file: &Path, location: Option<&str>) -> Result<()> {
    let suggestions = with_introvert(file, |intro| intro.suggest(location.map(str::trim)))?;

    let groups = [
        ("Distant friends", &suggestions.distant),
        ("Moderate friends", &suggestions.moderate),
        ("Close friends", &suggestions.close),
    ];

    for (title, names) in groups {
        let listed = if names.is_empty() {
            "(none)".to_string()
        } else {
            names.join(", ")
        };
        println!("{}: {}", title.bold(), listed);
    }

    Ok(())
}

/// Run the list tags command
pub fn run_list_tags(file: &Path, from: TagSource) -> Result<()> {
    let tags = with_introvert(file, |intro| Ok(intro.list_tags(from)))?;

    if tags.is_empty() {
        println!("No tags yet.");
        return Ok(());
    }

    for tag in tags {
        println!("{}", tag.cyan());
    }

    Ok(())
}

/// Run the stats command
pub fn run_stats(file: &Path) -> Result<()> {
    let stats = with_introvert(file, |intro| Ok(intro.stats()))?;

    println!("Friends Statistics");
    println!("==================\n");

    println!("Total activities: {}", stats.total_activities);
    println!("Total friends:    {}", stats.total_friends);
    println!("Total locations:  {}", stats.total_locations);
    println!("Total tags:       {}", stats.total_tags);
    println!("Total time elapsed: {} day{}", stats.elapsed_days, if stats.elapsed_days == 1 { "" } else { "s" });

    Ok(())
}

/// Run the clean command - rewrite the file in canonical order
pub fn run_clean(file: &Path) -> Result<()> {
    let path = with_introvert(file, |intro| {
        intro.clean();
        Ok(intro.path().display().to_string())
    })?;
    println!("File cleaned: \"{}\"", path);
    Ok(())
}
