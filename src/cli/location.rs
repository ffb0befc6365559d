use super::with_introvert;
use crate::error::Result;
use colored::Colorize;
use std::path::Path;

/// Run the add location command
pub fn run_add_location(file: &Path, name: &str) -> Result<()> {
    let name = with_introvert(file, |intro| Ok(intro.add_location(name)?.name.clone()))?;
    println!("Location added: \"{}\"", name.yellow());
    Ok(())
}

/// Run the rename location command
pub fn run_rename_location(file: &Path, query: &str, new_name: &str) -> Result<()> {
    let old = with_introvert(file, |intro| intro.rename_location(query, new_name))?;
    println!("Location renamed: \"{}\" -> \"{}\"", old, new_name.trim().yellow());
    Ok(())
}

/// Run the list locations command
pub fn run_list_locations(file: &Path) -> Result<()> {
    let locations = with_introvert(file, |intro| Ok(intro.list_locations()))?;

    if locations.is_empty() {
        println!("No locations yet. Add one with: friends add location \"...\"");
        return Ok(());
    }

    for location in locations {
        println!("{}", location);
    }

    Ok(())
}

/// Run the list favorite locations command
pub fn run_list_favorite_locations(file: &Path, limit: usize) -> Result<()> {
    let favorites = with_introvert(file, |intro| Ok(intro.list_favorite_locations(limit)))?;

    if favorites.is_empty() {
        println!("No locations yet.");
        return Ok(());
    }

    println!("{}\n", "Your favorite locations:".bold());
    for line in favorites {
        println!("  {}", line);
    }

    Ok(())
}
