//! Album command presentation: list, show, mutation results, text/json.

use super::shared::{format_timestamp, heading, to_json};
use crate::album::Album;
use crate::error::GalleryError;
use comfy_table::presets::UTF8_BORDERS_ONLY;
use comfy_table::Table;
use owo_colors::OwoColorize;
use serde_json::json;

fn album_table(albums: &[Album]) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_BORDERS_ONLY);
    table.set_header(vec!["ID", "Name", "Assets", "Updated"]);
    for album in albums {
        table.add_row(vec![
            album.id.clone(),
            album.name.clone(),
            album.asset_ids.len().to_string(),
            format_timestamp(album.updated_at),
        ]);
    }
    table
}

pub fn format_album_list_text(albums: &[Album]) -> String {
    if albums.is_empty() {
        return "No albums.".to_string();
    }
    format!(
        "{}\n{}\n\nTotal: {} album(s)",
        heading("Albums"),
        album_table(albums),
        albums.len()
    )
}

pub fn format_album_list_json(albums: &[Album]) -> Result<String, GalleryError> {
    to_json(&json!({ "albums": albums, "total": albums.len() }))
}

pub fn format_album_text(album: &Album) -> String {
    let mut output = format!("{}\n", heading(&album.name));
    output.push_str(&format!("ID:          {}\n", album.id));
    if let Some(description) = &album.description {
        output.push_str(&format!("Description: {}\n", description));
    }
    output.push_str(&format!("Created:     {}\n", format_timestamp(album.created_at)));
    output.push_str(&format!("Updated:     {}\n", format_timestamp(album.updated_at)));
    if album.asset_ids.is_empty() {
        output.push_str("Assets:      (none)");
    } else {
        let ids: Vec<String> = album.asset_ids.iter().map(|id| id.to_string()).collect();
        output.push_str(&format!(
            "Assets ({}): {}",
            album.asset_ids.len(),
            ids.join(", ")
        ));
    }
    output
}

pub fn format_album_json(album: &Album) -> Result<String, GalleryError> {
    to_json(album)
}

pub fn format_album_deleted(id: &str, json_output: bool) -> Result<String, GalleryError> {
    if json_output {
        to_json(&json!({ "deleted": id }))
    } else {
        Ok(format!("{} album {}", "Deleted".green(), id))
    }
}

pub fn format_containing_text(asset_id: i64, albums: &[Album]) -> String {
    if albums.is_empty() {
        return format!("Asset {} is not in any album.", asset_id);
    }
    format!(
        "{}\n{}",
        heading(&format!("Albums containing asset {}", asset_id)),
        album_table(albums)
    )
}

pub fn format_containing_json(asset_id: i64, albums: &[Album]) -> Result<String, GalleryError> {
    let ids: Vec<&str> = albums.iter().map(|a| a.id.as_str()).collect();
    to_json(&json!({ "asset_id": asset_id, "albums": ids }))
}
