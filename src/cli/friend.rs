use super::{normalize_tag, with_introvert};
use crate::error::Result;
use colored::Colorize;
use std::path::Path;

/// Run the add friend command
pub fn run_add_friend(file: &Path, name: &str) -> Result<()> {
    let name = with_introvert(file, |intro| Ok(intro.add_friend(name)?.name.clone()))?;
    println!("Friend added: \"{}\"", name.bold());
    Ok(())
}

/// Run the rename friend command
pub fn run_rename_friend(file: &Path, query: &str, new_name: &str) -> Result<()> {
    let old = with_introvert(file, |intro| intro.rename_friend(query, new_name))?;
    println!("Name changed: \"{}\" -> \"{}\"", old, new_name.trim().bold());
    Ok(())
}

/// Run the set location command
pub fn run_set_location(file: &Path, friend: &str, location: &str) -> Result<()> {
    let (friend, location) = with_introvert(file, |intro| intro.set_location(friend, location))?;
    println!("{}'s location set to: \"{}\"", friend.bold(), location.yellow());
    Ok(())
}

/// Run the add nickname command
pub fn run_add_nickname(file: &Path, friend: &str, nickname: &str) -> Result<()> {
    let name = with_introvert(file, |intro| intro.add_nickname(friend, nickname))?;
    println!("Nickname added: \"{}\" (a.k.a. \"{}\")", name.bold(), nickname.trim());
    Ok(())
}

/// Run the remove nickname command
pub fn run_remove_nickname(file: &Path, friend: &str, nickname: &str) -> Result<()> {
    let name = with_introvert(file, |intro| intro.remove_nickname(friend, nickname))?;
    println!("Nickname removed: \"{}\" from {}", nickname.trim(), name.bold());
    Ok(())
}

/// Run the add tag command
pub fn run_add_tag(file: &Path, friend: &str, tag: &str) -> Result<()> {
    let tag = normalize_tag(tag);
    let name = with_introvert(file, |intro| intro.add_tag(friend, &tag))?;
    println!("Tag added to {}: {}", name.bold(), tag.cyan());
    Ok(())
}

/// Run the remove tag command
pub fn run_remove_tag(file: &Path, friend: &str, tag: &str) -> Result<()> {
    let tag = normalize_tag(tag);
    let name = with_introvert(file, |intro| intro.remove_tag(friend, &tag))?;
    println!("Tag removed from {}: {}", name.bold(), tag.cyan());
    Ok(())
}

/// Run the list friends command
pub fn run_list_friends(
    file: &Path,
    location: Option<&str>,
    tagged: Option<&str>,
    verbose: bool,
) -> Result<()> {
    let tagged = tagged.map(normalize_tag);
    let friends = with_introvert(file, |intro| {
        intro.list_friends(location.map(str::trim), tagged.as_deref(), verbose)
    })?;

    if friends.is_empty() {
        println!("No friends found. Add one with: friends add friend \"...\"");
        return Ok(());
    }

    for friend in friends {
        println!("{}", friend);
    }

    Ok(())
}

/// Run the list favorite friends command
pub fn run_list_favorite_friends(file: &Path, limit: usize) -> Result<()> {
    let favorites = with_introvert(file, |intro| Ok(intro.list_favorite_friends(limit)))?;

    if favorites.is_empty() {
        println!("No friends yet.");
        return Ok(());
    }

    println!("{}\n", "Your favorite friends:".bold());
    for line in favorites {
        println!("  {}", line);
    }

    Ok(())
}
