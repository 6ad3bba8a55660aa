//! CLI domain: parse, route, help, output, and presentation only.
//! No domain orchestration; single route table dispatches to the album store.

mod help;
mod output;
mod parse;
mod presentation;
mod route;

pub use help::{album_command_name, command_name, is_mutating};
pub use output::{exit_code, map_error};
pub use parse::{AlbumCommands, Cli, Commands, OutputFormat};
pub use presentation::{
    format_album_deleted, format_album_json, format_album_list_json, format_album_list_text,
    format_album_text, format_containing_json, format_containing_text, format_timestamp, heading,
};
pub use route::RunContext;
