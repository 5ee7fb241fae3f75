//! Loads the platform configuration from `hostblog.yaml`.
//!
//! ```yaml
//! root_domain: example.com
//! aliases: [localhost]
//! scheme: https
//! protected_subdomains: [www, admin]
//! board_page_size: 2
//! data_directory: data
//! theme_directory: theme
//! bind: 127.0.0.1:8000
//! ```
//!
//! Only `root_domain` is required. Relative directories are resolved against
//! the directory holding the config file.

use crate::board::{Board, DEFAULT_PAGE_SIZE};
use crate::host::{normalize_host, Resolver};
use serde::Deserialize;
use std::fs::File;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use thiserror::Error;
use url::Url;

/// The name of the config file searched for by [`Config::from_directory`].
pub const CONFIG_FILE: &str = "hostblog.yaml";

const DEFAULT_PROTECTED_SUBDOMAINS: [&str; 12] = [
    "www", "api", "admin", "dashboard", "login", "signup", "mail", "blog", "help", "support",
    "status", "static",
];

#[derive(Deserialize)]
struct PageSize(usize);
impl Default for PageSize {
    fn default() -> Self {
        PageSize(DEFAULT_PAGE_SIZE)
    }
}

fn default_aliases() -> Vec<String> {
    vec!["localhost".to_owned()]
}

fn default_scheme() -> String {
    "https".to_owned()
}

fn default_protected_subdomains() -> Vec<String> {
    DEFAULT_PROTECTED_SUBDOMAINS
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_data_directory() -> PathBuf {
    PathBuf::from("data")
}

fn default_theme_directory() -> PathBuf {
    PathBuf::from("theme")
}

fn default_bind() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 8000))
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct Project {
    root_domain: String,

    #[serde(default = "default_aliases")]
    aliases: Vec<String>,

    #[serde(default = "default_scheme")]
    scheme: String,

    #[serde(default = "default_protected_subdomains")]
    protected_subdomains: Vec<String>,

    #[serde(default)]
    board_page_size: PageSize,

    #[serde(default = "default_data_directory")]
    data_directory: PathBuf,

    #[serde(default = "default_theme_directory")]
    theme_directory: PathBuf,

    #[serde(default = "default_bind")]
    bind: SocketAddr,
}

/// The validated platform configuration.
#[derive(Clone, Debug)]
pub struct Config {
    /// The platform's public domain, lowercase, without a port.
    pub root_domain: String,

    /// Host names treated exactly like `root_domain`.
    pub aliases: Vec<String>,

    /// `http` or `https`.
    pub scheme: String,

    pub protected_subdomains: Vec<String>,
    pub board_page_size: usize,
    pub data_directory: PathBuf,
    pub theme_directory: PathBuf,
    pub bind: SocketAddr,
}

impl Config {
    /// Searches `dir` and then each of its ancestors for [`CONFIG_FILE`] and
    /// loads the first one found.
    pub fn from_directory(dir: &Path) -> Result<Config> {
        let mut current = Some(dir);
        while let Some(dir) = current {
            let path = dir.join(CONFIG_FILE);
            if path.is_file() {
                return Config::from_project_file(&path);
            }
            current = dir.parent();
        }
        Err(Error::NotFound(dir.to_owned()))
    }

    /// Loads the config file at `path`.
    pub fn from_project_file(path: &Path) -> Result<Config> {
        let file = File::open(path).map_err(|err| Error::Open {
            path: path.to_owned(),
            err,
        })?;
        let project: Project = serde_yaml::from_reader(file)?;
        let base = path.parent().unwrap_or_else(|| Path::new("."));
        let config = Config::from_project(project, base)?;
        tracing::info!(path = %path.display(), root_domain = %config.root_domain, "loaded config");
        Ok(config)
    }

    /// Parses config from YAML text. Relative directories are resolved
    /// against `base`.
    pub fn from_yaml(yaml: &str, base: &Path) -> Result<Config> {
        Config::from_project(serde_yaml::from_str(yaml)?, base)
    }

    fn from_project(project: Project, base: &Path) -> Result<Config> {
        let root_domain = normalize_host(&project.root_domain);
        if root_domain.is_empty() {
            return Err(Error::EmptyRootDomain);
        }
        let scheme = project.scheme.to_lowercase();
        if scheme != "http" && scheme != "https" {
            return Err(Error::UnsupportedScheme(scheme));
        }
        if project.board_page_size.0 == 0 {
            return Err(Error::ZeroPageSize);
        }

        // The root must survive as the host of an absolute URL, which rules
        // out paths, userinfo, and stray characters.
        let root = format!("{}://{}/", scheme, root_domain);
        let parsed = Url::parse(&root).map_err(|err| Error::InvalidRootDomain {
            root_domain: root_domain.clone(),
            err: err.to_string(),
        })?;
        if parsed.host_str() != Some(root_domain.as_str()) {
            return Err(Error::InvalidRootDomain {
                root_domain,
                err: format!("parses as host {:?}", parsed.host_str()),
            });
        }

        Ok(Config {
            root_domain,
            aliases: project.aliases.iter().map(|a| normalize_host(a)).collect(),
            scheme,
            protected_subdomains: project
                .protected_subdomains
                .iter()
                .map(|s| s.trim().to_lowercase())
                .collect(),
            board_page_size: project.board_page_size.0,
            data_directory: base.join(project.data_directory),
            theme_directory: base.join(project.theme_directory),
            bind: project.bind,
        })
    }

    /// The host resolver for this configuration.
    pub fn resolver(&self) -> Resolver {
        Resolver::new(
            &self.root_domain,
            &self.aliases,
            &self.scheme,
            &self.protected_subdomains,
        )
    }

    /// The board for this configuration.
    pub fn board(&self) -> Board {
        Board::new(self.board_page_size)
    }
}

/// The result of a fallible configuration operation.
pub type Result<T> = std::result::Result<T, Error>;

/// Represents a problem loading or validating configuration.
#[derive(Debug, Error)]
pub enum Error {
    /// Returned when no config file exists in the directory or its ancestors.
    #[error("could not find `hostblog.yaml` in `{}` or any parent directory", .0.display())]
    NotFound(PathBuf),

    /// Returned when the config file can't be opened.
    #[error("opening config file `{}`: {err}", .path.display())]
    Open { path: PathBuf, err: std::io::Error },

    /// Returned when the config file isn't valid YAML for [`Config`].
    #[error("parsing config: {0}")]
    DeserializeYaml(#[from] serde_yaml::Error),

    #[error("`root_domain` must not be empty")]
    EmptyRootDomain,

    #[error("invalid `root_domain` `{root_domain}`: {err}")]
    InvalidRootDomain { root_domain: String, err: String },

    #[error("unsupported scheme `{0}`; wanted `http` or `https`")]
    UnsupportedScheme(String),

    #[error("`board_page_size` must be greater than zero")]
    ZeroPageSize,
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::host::HostClass;

    #[test]
    fn test_defaults() -> Result<()> {
        let config = Config::from_yaml("root_domain: Example.com", Path::new("/srv/blogs"))?;
        assert_eq!("example.com", config.root_domain);
        assert_eq!(vec!["localhost"], config.aliases);
        assert_eq!("https", config.scheme);
        assert!(config.protected_subdomains.contains(&"www".to_owned()));
        assert_eq!(DEFAULT_PAGE_SIZE, config.board_page_size);
        assert_eq!(Path::new("/srv/blogs/data"), config.data_directory);
        assert_eq!(Path::new("/srv/blogs/theme"), config.theme_directory);
        assert_eq!(default_bind(), config.bind);
        Ok(())
    }

    #[test]
    fn test_overrides() -> Result<()> {
        let config = Config::from_yaml(
            "root_domain: example.com\naliases: ['dev.test:8000']\nscheme: http\nprotected_subdomains: [Ops]\nboard_page_size: 25\ndata_directory: /var/data\nbind: 0.0.0.0:80\n",
            Path::new("/srv"),
        )?;
        assert_eq!(vec!["dev.test"], config.aliases);
        assert_eq!(vec!["ops"], config.protected_subdomains);
        assert_eq!(25, config.board().page_size());
        assert_eq!(Path::new("/var/data"), config.data_directory);
        assert_eq!(
            HostClass::Protected {
                redirect: "http://example.com".to_owned()
            },
            config.resolver().classify("ops.example.com")
        );
        Ok(())
    }

    #[test]
    fn test_validation() {
        let base = Path::new(".");
        assert!(matches!(
            Config::from_yaml("root_domain: ''", base),
            Err(Error::EmptyRootDomain)
        ));
        assert!(matches!(
            Config::from_yaml("root_domain: example.com\nscheme: ftp", base),
            Err(Error::UnsupportedScheme(_))
        ));
        assert!(matches!(
            Config::from_yaml("root_domain: example.com\nboard_page_size: 0", base),
            Err(Error::ZeroPageSize)
        ));
        assert!(matches!(
            Config::from_yaml("root_domain: example.com/blog", base),
            Err(Error::InvalidRootDomain { .. })
        ));
        assert!(matches!(
            Config::from_yaml("root_domain: example.com\nrooot: typo", base),
            Err(Error::DeserializeYaml(_))
        ));
    }

    #[test]
    fn test_from_directory_searches_parents() -> Result<()> {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE), "root_domain: example.com\n").unwrap();
        let nested = dir.path().join("a/b");
        std::fs::create_dir_all(&nested).unwrap();

        let config = Config::from_directory(&nested)?;
        assert_eq!("example.com", config.root_domain);
        assert_eq!(dir.path().join("data"), config.data_directory);
        Ok(())
    }

    #[test]
    fn test_from_directory_not_found() {
        let dir = tempfile::tempdir().unwrap();
        // Tempdirs usually live under /tmp, which shouldn't hold a config.
        match Config::from_directory(dir.path()) {
            Err(Error::NotFound(_)) | Ok(_) => {}
            Err(other) => panic!("unexpected error: {}", other),
        }
    }
}
