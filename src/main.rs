use clap::{Parser, Subcommand};
use cli::FilterArgs;
use config::GlobalConfig;

mod cli;
mod config;
mod error;
mod introvert;
mod resolver;
mod store;
mod types;

#[derive(Parser)]
#[command(name = "friends")]
#[command(version)]
#[command(about = "Spend time with the people you care about")]
struct Cli {
    /// Friends file to read and write
    #[arg(long, global = true)]
    filename: Option<String>,

    /// Print debug logs and full error details
    #[arg(long, global = true)]
    debug: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    colorless: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Add an activity, friend, location, nickname or tag
    #[command(subcommand)]
    Add(AddCommands),

    /// Remove a nickname or tag from a friend
    #[command(subcommand)]
    Remove(RemoveCommands),

    /// Rename a friend or location
    #[command(subcommand)]
    Rename(RenameCommands),

    /// Set a friend's location
    #[command(subcommand)]
    Set(SetCommands),

    /// List activities, friends, locations, tags or favorites
    #[command(subcommand)]
    List(ListCommands),

    /// Graph activities by month
    Graph {
        #[command(flatten)]
        filter: FilterArgs,
    },

    /// Suggest friends to get in touch with
    Suggest {
        /// Only suggest friends at this location
        #[arg(long = "in")]
        location: Option<String>,
    },

    /// Show statistics
    Stats,

    /// Rewrite the friends file in canonical order
    Clean,

    /// View or set global configuration
    Config {
        /// Config key
        key: Option<String>,

        /// Config value
        value: Option<String>,

        /// List available keys
        #[arg(long)]
        list_keys: bool,
    },
}

#[derive(Subcommand)]
enum AddCommands {
    /// Add an activity: "[date:] description"
    Activity {
        #[arg(required = true, num_args = 1..)]
        description: Vec<String>,
    },

    /// Add a friend
    Friend {
        #[arg(required = true, num_args = 1..)]
        name: Vec<String>,
    },

    /// Add a location
    Location {
        #[arg(required = true, num_args = 1..)]
        name: Vec<String>,
    },

    /// Add a nickname to a friend
    Nickname { friend: String, nickname: String },

    /// Add a tag to a friend
    Tag { friend: String, tag: String },
}

#[derive(Subcommand)]
enum RemoveCommands {
    /// Remove a nickname from a friend
    Nickname { friend: String, nickname: String },

    /// Remove a tag from a friend
    Tag { friend: String, tag: String },
}

#[derive(Subcommand)]
enum RenameCommands {
    /// Rename a friend, updating every activity that mentions them
    Friend { friend: String, new_name: String },

    /// Rename a location, updating friends and activities
    Location { location: String, new_name: String },
}

#[derive(Subcommand)]
enum SetCommands {
    /// Set where a friend lives
    Location { friend: String, location: String },
}

#[derive(Subcommand)]
enum ListCommands {
    /// List activities, most recently added first
    Activities {
        #[command(flatten)]
        filter: FilterArgs,

        /// Maximum results
        #[arg(short = 'n', long, default_value = "10")]
        limit: usize,
    },

    /// List friends
    Friends {
        /// Only friends at this location
        #[arg(long = "in")]
        location: Option<String>,

        /// Only friends with this tag
        #[arg(long)]
        tagged: Option<String>,

        /// Show nicknames, locations and tags
        #[arg(short, long)]
        verbose: bool,
    },

    /// List locations
    Locations,

    /// List tags
    Tags {
        /// Where to collect tags from
        #[arg(long, default_value = "both", value_parser = ["activities", "friends", "both"])]
        from: String,
    },

    /// List friends by number of activities
    FavoriteFriends {
        /// Maximum results
        #[arg(short = 'n', long, default_value = "10")]
        limit: usize,
    },

    /// List locations by number of activities
    FavoriteLocations {
        /// Maximum results
        #[arg(short = 'n', long, default_value = "10")]
        limit: usize,
    },
}

fn init_logging(debug: bool) {
    let default_level = if debug { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format_timestamp(None)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.debug);

    let config = GlobalConfig::load();
    if cli.colorless || !config.color_enabled() {
        colored::control::set_override(false);
    }

    let file = config::friends_file(cli.filename.as_deref(), &config);
    log::debug!("Using friends file {}", file.display());

    let result = match cli.command {
        Commands::Add(cmd) => match cmd {
            AddCommands::Activity { description } => {
                cli::activity::run_add_activity(&file, &description.join(" "))
            }
            AddCommands::Friend { name } => cli::friend::run_add_friend(&file, &name.join(" ")),
            AddCommands::Location { name } => cli::location::run_add_location(&file, &name.join(" ")),
            AddCommands::Nickname { friend, nickname } => {
                cli::friend::run_add_nickname(&file, &friend, &nickname)
            }
            AddCommands::Tag { friend, tag } => cli::friend::run_add_tag(&file, &friend, &tag),
        },
        Commands::Remove(cmd) => match cmd {
            RemoveCommands::Nickname { friend, nickname } => {
                cli::friend::run_remove_nickname(&file, &friend, &nickname)
            }
            RemoveCommands::Tag { friend, tag } => cli::friend::run_remove_tag(&file, &friend, &tag),
        },
        Commands::Rename(cmd) => match cmd {
            RenameCommands::Friend { friend, new_name } => {
                cli::friend::run_rename_friend(&file, &friend, &new_name)
            }
            RenameCommands::Location { location, new_name } => {
                cli::location::run_rename_location(&file, &location, &new_name)
            }
        },
        Commands::Set(SetCommands::Location { friend, location }) => {
            cli::friend::run_set_location(&file, &friend, &location)
        }
        Commands::List(cmd) => match cmd {
            ListCommands::Activities { filter, limit } => {
                cli::activity::run_list_activities(&file, &filter, limit)
            }
            ListCommands::Friends {
                location,
                tagged,
                verbose,
            } => cli::friend::run_list_friends(&file, location.as_deref(), tagged.as_deref(), verbose),
            ListCommands::Locations => cli::location::run_list_locations(&file),
            ListCommands::Tags { from } => match from.parse() {
                Ok(source) => cli::report::run_list_tags(&file, source),
                Err(e) => Err(e),
            },
            ListCommands::FavoriteFriends { limit } => cli::friend::run_list_favorite_friends(&file, limit),
            ListCommands::FavoriteLocations { limit } => {
                cli::location::run_list_favorite_locations(&file, limit)
            }
        },
        Commands::Graph { filter } => cli::report::run_graph(&file, &filter),
        Commands::Suggest { location } => cli::report::run_suggest(&file, location.as_deref()),
        Commands::Stats => cli::report::run_stats(&file),
        Commands::Clean => cli::report::run_clean(&file),
        Commands::Config { key, value, list_keys } => {
            cli::config::run_config(key.as_deref(), value.as_deref(), list_keys)
        }
    };

    if let Err(e) = result {
        if cli.debug {
            eprintln!("Error: {:#?}", e);
        } else {
            eprintln!("Error: {}", e);
        }
        std::process::exit(1);
    }
}
