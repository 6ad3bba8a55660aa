//! CLI help and command-name contract for logging and routing.

use crate::cli::parse::{AlbumCommands, Commands};

/// Command name string for log events (e.g. "album.list", "config").
pub fn command_name(command: &Commands) -> String {
    match command {
        Commands::Album { command } => format!("album.{}", album_command_name(command)),
        Commands::Config => "config".to_string(),
    }
}

pub fn album_command_name(command: &AlbumCommands) -> &'static str {
    match command {
        AlbumCommands::List => "list",
        AlbumCommands::Show { .. } => "show",
        AlbumCommands::Create { .. } => "create",
        AlbumCommands::Rename { .. } => "rename",
        AlbumCommands::Describe { .. } => "describe",
        AlbumCommands::Delete { .. } => "delete",
        AlbumCommands::Add { .. } => "add",
        AlbumCommands::Remove { .. } => "remove",
        AlbumCommands::Containing { .. } => "containing",
    }
}

/// Whether the command writes to the album store
pub fn is_mutating(command: &Commands) -> bool {
    matches!(
        command,
        Commands::Album {
            command: AlbumCommands::Create { .. }
                | AlbumCommands::Rename { .. }
                | AlbumCommands::Describe { .. }
                | AlbumCommands::Delete { .. }
                | AlbumCommands::Add { .. }
                | AlbumCommands::Remove { .. }
        }
    )
}
