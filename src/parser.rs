//! Loads a [`MemoryStore`] from a data directory. The directory is laid out
//! as follows:
//!
//! ```text
//! data/
//!   upvotes.yaml               # optional list of {blog, slug, voter}
//!   blogs/
//!     bear/
//!       index.md               # the blog: frontmatter + home page content
//!       posts/
//!         hello-world.md       # a post: frontmatter + body
//! ```
//!
//! The directory name under `blogs/` is the blog's subdomain. Blog and post
//! files both start with YAML frontmatter between `---` fences:
//!
//! ```md
//! ---
//! Title: Hello, world!
//! Date: 2021-04-16
//! Publish: true
//! ---
//! # Hello
//!
//! World
//! ```
//!
//! Blogs accept `Title`, `Domain`, and `Created`. Posts accept `Title`,
//! `Slug` (defaults to the slugified file name), `Date` (`YYYY-MM-DD` or RFC
//! 3339), `Publish`, and `Page`.

use crate::blog::Blog;
use crate::post::{Post, Upvote};
use crate::store::{self, MemoryStore};
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use serde::Deserialize;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use thiserror::Error;
use walkdir::WalkDir;

const MARKDOWN_EXTENSION: &str = "md";
const BLOG_FILE: &str = "index.md";
const POSTS_DIRECTORY: &str = "posts";
const UPVOTES_FILE: &str = "upvotes.yaml";

#[derive(Deserialize)]
struct BlogFrontmatter {
    #[serde(rename = "Title")]
    title: String,

    #[serde(default, rename = "Domain")]
    domain: Option<String>,

    #[serde(default, rename = "Created")]
    created: Option<String>,
}

#[derive(Deserialize)]
struct PostFrontmatter {
    #[serde(rename = "Title")]
    title: String,

    #[serde(default, rename = "Slug")]
    slug: Option<String>,

    #[serde(default, rename = "Date")]
    date: Option<String>,

    #[serde(default, rename = "Publish")]
    publish: bool,

    #[serde(default, rename = "Page")]
    page: bool,
}

/// Loads every blog, post, and upvote under `data_directory`. Blogs are
/// inserted before posts and posts before upvotes, so references are
/// checked regardless of file order.
pub fn load(data_directory: &Path) -> Result<MemoryStore> {
    let blogs_directory = data_directory.join("blogs");
    let mut blogs = Vec::new();
    let mut posts = Vec::new();

    for result in WalkDir::new(&blogs_directory)
        .min_depth(2)
        .max_depth(3)
        .sort_by(|a, b| a.file_name().cmp(b.file_name()))
    {
        let entry = result?;
        if !entry.file_type().is_file()
            || entry.path().extension().map_or(true, |ext| ext != MARKDOWN_EXTENSION)
        {
            continue;
        }

        // strip_prefix() should never fail; WalkDir yields paths below its root
        let relative = match entry.path().strip_prefix(&blogs_directory) {
            Ok(relative) => relative,
            Err(_) => continue,
        };
        let components: Vec<&str> = relative.iter().filter_map(|c| c.to_str()).collect();
        match components.as_slice() {
            [subdomain, BLOG_FILE] => blogs.push(annotate(entry.path(), || {
                parse_blog(subdomain, &read(entry.path())?)
            })?),
            [subdomain, POSTS_DIRECTORY, file_name] => posts.push(annotate(entry.path(), || {
                parse_post(subdomain, file_name, &read(entry.path())?)
            })?),
            _ => tracing::warn!(path = %entry.path().display(), "ignoring stray markdown file"),
        }
    }

    let mut store = MemoryStore::new();
    for blog in blogs {
        store.insert_blog(blog)?;
    }
    for post in posts {
        store.insert_post(post)?;
    }

    let upvotes_path = data_directory.join(UPVOTES_FILE);
    if upvotes_path.is_file() {
        let upvotes: Vec<Upvote> = annotate(&upvotes_path, || {
            Ok(serde_yaml::from_str(&read(&upvotes_path)?)?)
        })?;
        for upvote in upvotes {
            store.insert_upvote(upvote)?;
        }
    }

    tracing::info!(
        directory = %data_directory.display(),
        blogs = store.blog_count(),
        posts = store.post_count(),
        upvotes = store.upvote_count(),
        "loaded store"
    );
    Ok(store)
}

/// Parses a blog from the contents of its `index.md`.
pub fn parse_blog(subdomain: &str, input: &str) -> Result<Blog> {
    let (yaml, body) = split_frontmatter(input)?;
    let frontmatter: BlogFrontmatter = serde_yaml::from_str(yaml)?;
    Ok(Blog {
        subdomain: subdomain.to_lowercase(),
        domain: frontmatter.domain.map(|d| d.trim().to_lowercase()),
        title: frontmatter.title,
        content: body.trim_start().to_owned(),
        created: frontmatter.created.as_deref().map(parse_date).transpose()?,
    })
}

/// Parses a post from the contents of a file in a blog's `posts/` directory.
pub fn parse_post(subdomain: &str, file_name: &str, input: &str) -> Result<Post> {
    let (yaml, body) = split_frontmatter(input)?;
    let frontmatter: PostFrontmatter = serde_yaml::from_str(yaml)?;
    let stem = Path::new(file_name)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(file_name);
    Ok(Post {
        blog: subdomain.to_lowercase(),
        slug: frontmatter.slug.unwrap_or_else(|| slug::slugify(stem)),
        title: frontmatter.title,
        content: body.trim_start().to_owned(),
        publish: frontmatter.publish,
        is_page: frontmatter.page,
        published_date: frontmatter.date.as_deref().map(parse_date).transpose()?,
    })
}

/// Splits `input` into its YAML frontmatter and its body.
fn split_frontmatter(input: &str) -> Result<(&str, &str)> {
    const FENCE: &str = "---";
    if !input.starts_with(FENCE) {
        return Err(Error::FrontmatterMissingStartFence);
    }
    match input[FENCE.len()..].find(FENCE) {
        None => Err(Error::FrontmatterMissingEndFence),
        Some(offset) => {
            let yaml_stop = FENCE.len() + offset;
            Ok((&input[FENCE.len()..yaml_stop], &input[yaml_stop + FENCE.len()..]))
        }
    }
}

/// Parses `YYYY-MM-DD` (midnight UTC) or an RFC 3339 timestamp.
pub fn parse_date(input: &str) -> Result<DateTime<Utc>> {
    let input = input.trim();
    if let Ok(date) = DateTime::parse_from_rfc3339(input) {
        return Ok(date.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(input, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| Utc.from_utc_datetime(&naive))
        .ok_or_else(|| Error::InvalidDate(input.to_owned()))
}

fn read(path: &Path) -> Result<String> {
    let mut contents = String::new();
    File::open(path)?.read_to_string(&mut contents)?;
    Ok(contents)
}

fn annotate<T>(path: &Path, f: impl FnOnce() -> Result<T>) -> Result<T> {
    f().map_err(|e| Error::Annotated(path.display().to_string(), Box::new(e)))
}

/// The result of a fallible load operation.
pub type Result<T> = std::result::Result<T, Error>;

/// Represents an error loading the data directory.
#[derive(Debug, Error)]
pub enum Error {
    /// Returned when a source file is missing its starting frontmatter fence
    /// (`---`).
    #[error("file must begin with `---`")]
    FrontmatterMissingStartFence,

    /// Returned when the starting fence was found but the closing one was
    /// missing.
    #[error("missing closing `---`")]
    FrontmatterMissingEndFence,

    /// Returned when there was an error parsing YAML.
    #[error(transparent)]
    DeserializeYaml(#[from] serde_yaml::Error),

    /// Returned when a `Date` or `Created` field can't be parsed.
    #[error("invalid date `{0}`; wanted YYYY-MM-DD or RFC 3339")]
    InvalidDate(String),

    /// Returned for I/O errors.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Returned for WalkDir I/O errors.
    #[error(transparent)]
    WalkDir(#[from] walkdir::Error),

    /// Returned when records conflict, e.g. two posts share a slug.
    #[error(transparent)]
    Store(#[from] store::Error),

    /// An error with the path of the file that caused it.
    #[error("loading `{0}`: {1}")]
    Annotated(String, Box<Error>),
}
