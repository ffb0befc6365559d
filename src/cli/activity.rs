use super::{paint_activity, split_dated, today, with_introvert, FilterArgs};
use crate::error::Result;
use colored::Colorize;
use std::path::Path;

/// Run the add activity command
pub fn run_add_activity(file: &Path, text: &str) -> Result<()> {
    let (date, description) = split_dated(text, today());
    let line = with_introvert(file, |intro| Ok(intro.add_activity(date, &description)?.serialize()))?;

    println!("{} {}", "Activity added:".bold(), paint_activity(&line));
    Ok(())
}

/// Run the list activities command
pub fn run_list_activities(file: &Path, filter: &FilterArgs, limit: usize) -> Result<()> {
    let filter = filter.to_filter()?;
    let lines = with_introvert(file, |intro| intro.list_activities(&filter, Some(limit)))?;

    if lines.is_empty() {
        println!("No activities found. Add one with: friends add activity \"...\"");
        return Ok(());
    }

    for line in lines {
        println!("{}", paint_activity(&line));
    }

    Ok(())
}
