use crate::config::{friends_file, global_config_file, GlobalConfig, CONFIG_KEYS};
use crate::error::{FriendsError, Result};

/// Run the config command
pub fn run_config(key: Option<&str>, value: Option<&str>, list_keys: bool) -> Result<()> {
    if list_keys {
        print_keys();
        return Ok(());
    }

    let mut config = GlobalConfig::load();

    match (key, value) {
        (None, None) => {
            // Show current config
            println!("Current configuration ({}):\n", global_config_file().display());
            for info in CONFIG_KEYS {
                let current = config.get(info.key)?.unwrap_or_else(|| "(not set)".to_string());
                println!("  {}: {}", info.key, current);
            }
            println!("\nFriends file in use: {}", friends_file(None, &config).display());
        }
        (Some(k), None) => match config.get(k)? {
            Some(v) => println!("{}: {}", k, v),
            None => println!("{}: (not set)", k),
        },
        (Some(k), Some(v)) => {
            config.set(k, v)?;
            config.save_to(&global_config_file())?;
            println!("Set {} = {}", k, v.trim());
        }
        (None, Some(_)) => {
            return Err(FriendsError::Config("Key required when setting a value".to_string()));
        }
    }

    Ok(())
}

fn print_keys() {
    println!("Available config keys:\n");
    println!("{:12} {}", "Key", "Description");
    println!("{}", "-".repeat(60));

    for info in CONFIG_KEYS {
        println!("{:12} {}", info.key, info.description);
    }

    println!("\nSet a key with: friends config <key> <value>");
}
