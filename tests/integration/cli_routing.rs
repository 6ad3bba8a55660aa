//! Integration tests for CLI parsing and routing against a sled album store

use clap::Parser;
use gallery_sync::cli::{map_error, AlbumCommands, Cli, Commands, OutputFormat, RunContext};
use gallery_sync::GalleryError;
use std::path::PathBuf;
use tempfile::TempDir;

/// Workspace with an explicit config file pointing the store inside it
fn workspace() -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("gallery.toml");
    std::fs::write(
        &config_path,
        format!(
            "[store]\npath = \"{}\"\n",
            temp_dir.path().join("albums").display()
        ),
    )
    .unwrap();
    (temp_dir, config_path)
}

fn context(temp_dir: &TempDir, config_path: &PathBuf) -> RunContext {
    RunContext::new(temp_dir.path().to_path_buf(), Some(config_path.clone())).unwrap()
}

fn album_cmd(command: AlbumCommands) -> Commands {
    Commands::Album { command }
}

#[test]
fn test_parse_album_commands() {
    let cli = Cli::try_parse_from([
        "gallery",
        "--format",
        "json",
        "album",
        "add",
        "album-1-abc",
        "3",
        "4",
    ])
    .unwrap();
    assert_eq!(cli.format, OutputFormat::Json);
    match cli.command {
        Commands::Album {
            command: AlbumCommands::Add { id, assets },
        } => {
            assert_eq!(id, "album-1-abc");
            assert_eq!(assets, vec![3, 4]);
        }
        _ => panic!("expected album add"),
    }

    assert!(Cli::try_parse_from(["gallery", "album", "add", "album-1-abc"]).is_err());
}

#[test]
fn test_album_lifecycle_through_routes() {
    let (temp_dir, config_path) = workspace();
    let ctx = context(&temp_dir, &config_path);

    let created = ctx
        .execute(
            &album_cmd(AlbumCommands::Create {
                name: "Road trip".to_string(),
                description: Some("2024".to_string()),
            }),
            OutputFormat::Json,
        )
        .unwrap();
    let created: serde_json::Value = serde_json::from_str(&created).unwrap();
    let id = created["id"].as_str().unwrap().to_string();
    assert_eq!(created["name"], "Road trip");

    ctx.execute(
        &album_cmd(AlbumCommands::Add {
            id: id.clone(),
            assets: vec![9, 8, 9],
        }),
        OutputFormat::Text,
    )
    .unwrap();
    ctx.execute(
        &album_cmd(AlbumCommands::Remove {
            id: id.clone(),
            assets: vec![9],
        }),
        OutputFormat::Text,
    )
    .unwrap();

    let shown = ctx
        .execute(&album_cmd(AlbumCommands::Show { id: id.clone() }), OutputFormat::Json)
        .unwrap();
    let shown: serde_json::Value = serde_json::from_str(&shown).unwrap();
    assert_eq!(shown["assetIds"], serde_json::json!([8]));
    assert_eq!(shown["description"], "2024");

    let containing = ctx
        .execute(&album_cmd(AlbumCommands::Containing { asset: 8 }), OutputFormat::Json)
        .unwrap();
    let containing: serde_json::Value = serde_json::from_str(&containing).unwrap();
    assert_eq!(containing["albums"], serde_json::json!([id.clone()]));

    let listed = ctx
        .execute(&album_cmd(AlbumCommands::List), OutputFormat::Text)
        .unwrap();
    assert!(listed.contains("Road trip"));

    ctx.execute(&album_cmd(AlbumCommands::Delete { id: id.clone() }), OutputFormat::Text)
        .unwrap();
    let err = ctx
        .execute(&album_cmd(AlbumCommands::Show { id: id.clone() }), OutputFormat::Text)
        .unwrap_err();
    assert!(matches!(err, GalleryError::NotFound(_)));
    assert!(map_error(&err).starts_with("Not found"));
}

#[test]
fn test_albums_persist_across_contexts() {
    let (temp_dir, config_path) = workspace();
    let id = {
        let ctx = context(&temp_dir, &config_path);
        let out = ctx
            .execute(
                &album_cmd(AlbumCommands::Create {
                    name: "Kept".to_string(),
                    description: None,
                }),
                OutputFormat::Json,
            )
            .unwrap();
        let value: serde_json::Value = serde_json::from_str(&out).unwrap();
        value["id"].as_str().unwrap().to_string()
    };

    let ctx = context(&temp_dir, &config_path);
    let renamed = ctx
        .execute(
            &album_cmd(AlbumCommands::Rename {
                id: id.clone(),
                name: "Kept forever".to_string(),
            }),
            OutputFormat::Json,
        )
        .unwrap();
    let renamed: serde_json::Value = serde_json::from_str(&renamed).unwrap();
    assert_eq!(renamed["name"], "Kept forever");

    let cleared = ctx
        .execute(
            &album_cmd(AlbumCommands::Describe { id, text: None }),
            OutputFormat::Json,
        )
        .unwrap();
    let cleared: serde_json::Value = serde_json::from_str(&cleared).unwrap();
    assert!(cleared.get("description").is_none());
}

#[test]
fn test_blank_album_name_is_validation_error() {
    let (temp_dir, config_path) = workspace();
    let ctx = context(&temp_dir, &config_path);
    let err = ctx
        .execute(
            &album_cmd(AlbumCommands::Create {
                name: "   ".to_string(),
                description: None,
            }),
            OutputFormat::Text,
        )
        .unwrap_err();
    assert!(matches!(err, GalleryError::Validation(_)));
}

#[test]
fn test_config_command_prints_effective_toml() {
    let (temp_dir, config_path) = workspace();
    let ctx = context(&temp_dir, &config_path);
    let out = ctx.execute(&Commands::Config, OutputFormat::Text).unwrap();
    assert!(out.contains("[server]"));
    assert!(out.contains("max_concurrency = 8"));
    assert!(out.contains("albums_key = \"gallery.albums.v2\""));
}

#[test]
fn test_invalid_config_refuses_to_start() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("gallery.toml");
    std::fs::write(&config_path, "[bulk]\nmax_concurrency = 0\n").unwrap();
    let err = RunContext::new(temp_dir.path().to_path_buf(), Some(config_path)).err();
    assert!(matches!(err, Some(GalleryError::ConfigError(_))));
}
