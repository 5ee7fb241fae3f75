//! The template collaborator. Routes hand a template name and a [`Value`] to
//! a [`Renderer`]; the bundled [`Theme`] renders Go-style templates with
//! [`gtmpl`].

use gtmpl::{Context, Template, Value};
use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// The platform landing page.
pub const LANDING: &str = "landing.html";

/// A blog's home page.
pub const HOME: &str = "home.html";

/// A blog's full post listing.
pub const POSTS: &str = "posts.html";

/// A single post or page.
pub const POST: &str = "post.html";

/// The platform-wide board.
pub const BOARD: &str = "board.html";

/// Rendered with status 404 for unknown blogs and posts.
pub const NOT_FOUND: &str = "404.html";

/// Every template a theme must provide.
pub const TEMPLATES: [&str; 6] = [LANDING, HOME, POSTS, POST, BOARD, NOT_FOUND];

/// Renders named templates.
pub trait Renderer: Send + Sync {
    fn render(&self, name: &str, value: Value) -> Result<String>;
}

/// A set of template sources keyed by file name. Each template is checked
/// for syntax errors when the theme is built and parsed again per render.
#[derive(Clone, Debug)]
pub struct Theme {
    templates: HashMap<String, String>,
}

impl Theme {
    /// Loads each of [`TEMPLATES`] from `directory`.
    pub fn load(directory: &Path) -> Result<Theme> {
        let mut sources = Vec::with_capacity(TEMPLATES.len());
        for name in TEMPLATES.iter() {
            let path = directory.join(name);
            let mut contents = String::new();
            File::open(&path)
                .and_then(|mut file| file.read_to_string(&mut contents))
                .map_err(|err| Error::OpenTemplateFile {
                    path: path.clone(),
                    err,
                })?;
            sources.push((name.to_string(), contents));
        }
        let theme = Theme::from_sources(sources)?;
        tracing::info!(directory = %directory.display(), "loaded theme");
        Ok(theme)
    }

    /// Builds a theme from `(name, source)` pairs.
    pub fn from_sources<I>(sources: I) -> Result<Theme>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut templates = HashMap::new();
        for (name, source) in sources {
            Template::default()
                .parse(source.as_str())
                .map_err(|err| Error::ParseTemplate {
                    name: name.clone(),
                    err,
                })?;
            templates.insert(name, source);
        }
        Ok(Theme { templates })
    }
}

impl Renderer for Theme {
    fn render(&self, name: &str, value: Value) -> Result<String> {
        let source = self
            .templates
            .get(name)
            .ok_or_else(|| Error::UnknownTemplate(name.to_owned()))?;
        let execute = |err: String| Error::Execute {
            name: name.to_owned(),
            err,
        };
        let mut template = Template::default();
        template.parse(source.as_str()).map_err(execute)?;
        let context = Context::from(value).map_err(execute)?;
        let mut out = Vec::new();
        template.execute(&mut out, &context).map_err(execute)?;
        String::from_utf8(out).map_err(|err| execute(err.to_string()))
    }
}

/// The result of a fallible rendering operation.
pub type Result<T> = std::result::Result<T, Error>;

/// Represents an error loading or executing templates.
#[derive(Debug, Error)]
pub enum Error {
    /// Returned for I/O problems while opening template files.
    #[error("opening template file `{}`: {err}", .path.display())]
    OpenTemplateFile { path: PathBuf, err: std::io::Error },

    /// Returned for syntax errors in a template.
    #[error("parsing template `{name}`: {err}")]
    ParseTemplate { name: String, err: String },

    /// Returned when a template fails while executing.
    #[error("executing template `{name}`: {err}")]
    Execute { name: String, err: String },

    /// Returned when asked for a template the theme doesn't have.
    #[error("unknown template `{0}`")]
    UnknownTemplate(String),
}
