//! Layered configuration for the blog data layer.
//!
//! Values are resolved in order, later layers overriding earlier ones:
//!
//! 1. Built-in defaults ([`Config::default`]).
//! 2. A configuration file, either given explicitly or `config.toml` in the
//!    platform configuration directory (only if it exists).
//! 3. Environment variables prefixed with `BLOG_`, using `__` to separate
//!    nested keys (e.g. `BLOG_DATABASE__URL=sqlite://blog.db?mode=rwc`).

pub mod error;

use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use figment::Figment;
use figment::providers::{Env, Format, Json, Serialized, Toml, Yaml};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::instrument;

const ENV_PREFIX: &str = "BLOG_";
const DEFAULT_FILE_NAME: &str = "config.toml";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub database: DatabaseConfig,
    pub pagination: PaginationConfig,
}

/// Where the storage handle connects to, and how big its pool may grow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// SQLite connection URL, e.g. `sqlite://blog.db?mode=rwc` or `sqlite::memory:`.
    pub url: String,
    pub max_connections: u32,
    pub busy_timeout_ms: u64,
}
impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://blog.db?mode=rwc".to_string(),
            max_connections: 5,
            busy_timeout_ms: 1500,
        }
    }
}

/// Default page sizes for listing queries that don't specify their own limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PaginationConfig {
    pub posts: u32,
    pub posts_by_tag: u32,
    pub tags: u32,
}
impl Default for PaginationConfig {
    fn default() -> Self {
        Self { posts: 3, posts_by_tag: 5, tags: 5 }
    }
}

impl Config {
    /// Load, merge and validate configuration.
    ///
    /// An explicit `path` must exist; the implicit default location is
    /// silently skipped when missing.
    #[instrument(level = "debug")]
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config: Config = Self::figment(path)?.extract().or_raise(|| ErrorKind::Load)?;
        config.validate()?;
        Ok(config)
    }

    /// Build the provider stack without extracting it.
    pub fn figment(path: Option<&Path>) -> Result<Figment> {
        let figment = Figment::from(Serialized::defaults(Config::default()));
        let figment = match path {
            Some(path) => {
                if !path.is_file() {
                    exn::bail!(ErrorKind::NotFound(path.to_path_buf()));
                }
                merge_file(figment, path)?
            },
            None => match default_path().filter(|p| p.is_file()) {
                Some(path) => merge_file(figment, &path)?,
                None => figment,
            },
        };
        Ok(figment.merge(Env::prefixed(ENV_PREFIX).split("__")))
    }

    pub fn validate(&self) -> Result<()> {
        if self.database.url.trim().is_empty() {
            exn::bail!(ErrorKind::Invalid("database.url"));
        }
        if self.database.max_connections == 0 {
            exn::bail!(ErrorKind::Invalid("database.max_connections"));
        }
        let PaginationConfig { posts, posts_by_tag, tags } = self.pagination;
        if posts == 0 {
            exn::bail!(ErrorKind::Invalid("pagination.posts"));
        }
        if posts_by_tag == 0 {
            exn::bail!(ErrorKind::Invalid("pagination.posts_by_tag"));
        }
        if tags == 0 {
            exn::bail!(ErrorKind::Invalid("pagination.tags"));
        }
        Ok(())
    }
}

/// `config.toml` inside the platform-specific configuration directory.
pub fn default_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "blog").map(|dirs| dirs.config_dir().join(DEFAULT_FILE_NAME))
}

fn merge_file(figment: Figment, path: &Path) -> Result<Figment> {
    let extension = path.extension().and_then(|e| e.to_str()).map(str::to_ascii_lowercase);
    let figment = match extension.as_deref() {
        Some("toml") => figment.merge(Toml::file(path)),
        Some("yaml" | "yml") => figment.merge(Yaml::file(path)),
        Some("json") => figment.merge(Json::file(path)),
        _ => exn::bail!(ErrorKind::UnsupportedFormat(path.to_path_buf())),
    };
    tracing::debug!(path = %path.display(), "Merged configuration file");
    Ok(figment)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::io::Write;

    fn write_config(suffix: &str, contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_defaults_are_valid() {
        let config = Config::default();
        config.validate().unwrap();
        assert_eq!(config.pagination, PaginationConfig { posts: 3, posts_by_tag: 5, tags: 5 });
    }

    /// Runs `f` inside a jail whose working directory holds `file_name`.
    /// Jails are serialized, so `BLOG_*` variables set by one test never leak
    /// into another's `Config::load`.
    fn with_config_file(file_name: &str, contents: &str, f: impl FnOnce(&mut figment::Jail)) {
        figment::Jail::expect_with(|jail| {
            jail.create_file(file_name, contents)?;
            f(jail);
            Ok(())
        });
    }

    #[rstest]
    #[case("blog.toml", "[database]\nurl = \"sqlite::memory:\"\n\n[pagination]\ntags = 10\n")]
    #[case("blog.yaml", "database:\n  url: \"sqlite::memory:\"\npagination:\n  tags: 10\n")]
    #[case("blog.json", r#"{"database": {"url": "sqlite::memory:"}, "pagination": {"tags": 10}}"#)]
    fn test_file_overrides_defaults(#[case] file_name: &str, #[case] contents: &str) {
        with_config_file(file_name, contents, |_| {
            let config = Config::load(Some(Path::new(file_name))).unwrap();
            assert_eq!(config.database.url, "sqlite::memory:");
            assert_eq!(config.database.max_connections, 5);
            assert_eq!(config.pagination.tags, 10);
            assert_eq!(config.pagination.posts, 3);
        });
    }

    #[test]
    fn test_env_overrides_file() {
        with_config_file("blog.toml", "[pagination]\nposts = 4\ntags = 9\n", |jail| {
            jail.set_env("BLOG_PAGINATION__POSTS", "7");
            jail.set_env("BLOG_DATABASE__URL", "sqlite::memory:");
            let config = Config::load(Some(Path::new("blog.toml"))).unwrap();
            assert_eq!(config.pagination.posts, 7);
            assert_eq!(config.pagination.tags, 9);
            assert_eq!(config.database.url, "sqlite::memory:");
        });
    }

    #[test]
    fn test_env_is_validated() {
        with_config_file("blog.toml", "[pagination]\nposts = 4\n", |jail| {
            jail.set_env("BLOG_PAGINATION__POSTS", "0");
            let err = Config::load(Some(Path::new("blog.toml"))).unwrap_err();
            assert_eq!(*err, ErrorKind::Invalid("pagination.posts"));
        });
    }

    #[test]
    fn test_unsupported_extension() {
        let file = write_config(".ini", "url = nope");
        let err = Config::load(Some(file.path())).unwrap_err();
        assert!(matches!(&*err, ErrorKind::UnsupportedFormat(_)));
    }

    #[test]
    fn test_missing_explicit_file() {
        let err = Config::load(Some(Path::new("/definitely/not/here/blog.toml"))).unwrap_err();
        assert!(matches!(&*err, ErrorKind::NotFound(_)));
    }

    #[test]
    fn test_malformed_file() {
        with_config_file("blog.toml", "[pagination]\nposts = \"three\"\n", |_| {
            let err = Config::load(Some(Path::new("blog.toml"))).unwrap_err();
            assert_eq!(*err, ErrorKind::Load);
        });
    }

    #[rstest]
    #[case("[pagination]\nposts = 0\n", "pagination.posts")]
    #[case("[pagination]\nposts_by_tag = 0\n", "pagination.posts_by_tag")]
    #[case("[pagination]\ntags = 0\n", "pagination.tags")]
    #[case("[database]\nmax_connections = 0\n", "database.max_connections")]
    #[case("[database]\nurl = \"  \"\n", "database.url")]
    fn test_invalid_values(#[case] contents: &str, #[case] field: &'static str) {
        with_config_file("blog.toml", contents, |_| {
            let err = Config::load(Some(Path::new("blog.toml"))).unwrap_err();
            assert_eq!(*err, ErrorKind::Invalid(field));
        });
    }
}
