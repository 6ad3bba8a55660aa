//! Integration tests for Configuration System

use gallery_sync::album::DEFAULT_ALBUMS_KEY;
use gallery_sync::config::{ConfigLoader, ConfigValidationError, GalleryConfig};
use gallery_sync::GalleryOptions;
use std::path::PathBuf;
use std::sync::Mutex;
use tempfile::TempDir;

// Serializes tests that touch process-wide environment variables
static ENV_MUTEX: Mutex<()> = Mutex::new(());

struct EnvGuard {
    saved: Vec<(&'static str, Option<String>)>,
}

impl EnvGuard {
    fn set(vars: &[(&'static str, Option<&str>)]) -> Self {
        let saved = vars
            .iter()
            .map(|(name, _)| (*name, std::env::var(name).ok()))
            .collect();
        for (name, value) in vars {
            match value {
                Some(v) => std::env::set_var(name, v),
                None => std::env::remove_var(name),
            }
        }
        Self { saved }
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        for (name, value) in &self.saved {
            match value {
                Some(v) => std::env::set_var(name, v),
                None => std::env::remove_var(name),
            }
        }
    }
}

fn write_workspace_config(root: &std::path::Path, name: &str, body: &str) {
    let dir = root.join("config");
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join(name), body).unwrap();
}

#[test]
fn test_layering_precedence() {
    let _lock = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    let xdg = TempDir::new().unwrap();
    let workspace = TempDir::new().unwrap();
    let _env = EnvGuard::set(&[
        ("XDG_CONFIG_HOME", Some(xdg.path().to_str().unwrap())),
        ("GALLERY_ENV", Some("staging")),
        ("GALLERY__BULK__MAX_CONCURRENCY", Some("3")),
    ]);

    std::fs::create_dir_all(xdg.path().join("gallery")).unwrap();
    std::fs::write(
        xdg.path().join("gallery").join("config.toml"),
        "[server]\nbase_url = \"https://global.example\"\npage_size = 10\n\n[bulk]\nmax_concurrency = 12\n",
    )
    .unwrap();
    write_workspace_config(workspace.path(), "config.toml", "[server]\npage_size = 20\n");
    write_workspace_config(
        workspace.path(),
        "staging.toml",
        "[albums]\nprune_deleted_assets = true\n",
    );

    let config = ConfigLoader::load(workspace.path()).unwrap();
    assert_eq!(config.server.base_url, "https://global.example");
    assert_eq!(config.server.page_size, 20);
    assert_eq!(config.bulk.max_concurrency, 3);
    assert!(config.albums.prune_deleted_assets);
    assert_eq!(config.store.albums_key, DEFAULT_ALBUMS_KEY);

    let options = GalleryOptions::from_config(&config);
    assert_eq!(options.page_size, 20);
    assert_eq!(options.max_concurrency, 3);
    assert!(options.prune_deleted_assets);
}

#[test]
fn test_env_override_of_nested_string() {
    let _lock = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    let xdg = TempDir::new().unwrap();
    let workspace = TempDir::new().unwrap();
    let _env = EnvGuard::set(&[
        ("XDG_CONFIG_HOME", Some(xdg.path().to_str().unwrap())),
        ("GALLERY_ENV", None),
        ("GALLERY__BULK__MAX_CONCURRENCY", None),
        ("GALLERY__SERVER__BASE_URL", Some("http://10.0.0.2:9000")),
    ]);

    let config = ConfigLoader::load(workspace.path()).unwrap();
    assert_eq!(config.server.base_url, "http://10.0.0.2:9000");
    assert_eq!(config.server.timeout_secs, 30);
}

#[test]
fn test_validation_reports_every_violation() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("bad.toml");
    std::fs::write(
        &path,
        r#"
[server]
base_url = "ftp://nope"
page_size = 0

[bulk]
max_concurrency = 0
"#,
    )
    .unwrap();

    let config = ConfigLoader::load_from_file(&path).unwrap();
    let errors = config.validate().unwrap_err();
    assert_eq!(errors.len(), 3);
    assert!(errors
        .iter()
        .any(|e| matches!(e, ConfigValidationError::Bulk(_))));
}

#[test]
fn test_config_renders_as_toml_and_reloads() {
    let temp_dir = TempDir::new().unwrap();
    let mut config = GalleryConfig::default();
    config.store.path = PathBuf::from("/var/lib/gallery/albums");
    config.server.page_size = 64;

    let rendered = toml::to_string_pretty(&config).unwrap();
    let path = temp_dir.path().join("roundtrip.toml");
    std::fs::write(&path, rendered).unwrap();

    let reloaded = ConfigLoader::load_from_file(&path).unwrap();
    assert_eq!(reloaded.store.path, PathBuf::from("/var/lib/gallery/albums"));
    assert_eq!(reloaded.server.page_size, 64);
    assert!(reloaded.validate().is_ok());
}
