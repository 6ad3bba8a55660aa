//! CLI presentation: text and json formatters per command family.

mod album;
mod shared;

pub use album::{
    format_album_deleted, format_album_json, format_album_list_json, format_album_list_text,
    format_album_text, format_containing_json, format_containing_text,
};
pub use shared::{format_timestamp, heading};
