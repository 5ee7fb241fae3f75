//! Support for creating a blog's Atom feed from its posts.

use crate::blog::Blog;
use crate::markdown;
use crate::post::{select_posts, Post};
use atom_syndication::{
    Content, Entry, Error as AtomError, Feed, FixedDateTime, Link, Person, WriteConfig,
};
use chrono::Utc;
use thiserror::Error;

/// The media type feeds are served with.
pub const MEDIA_TYPE: &str = "application/atom+xml";

// Feed readers get a placeholder rather than a real address.
const AUTHOR_EMAIL: &str = "hidden";

/// Creates the feed for `blog` from `posts`. Only published posts that aren't
/// pages are included, most recent first. `root` is the blog's canonical root
/// (see [`crate::host::Context::root`]) and prefixes every generated link.
///
/// Each entry's link points at `{root}/feed`, not at the post. The entry ID
/// is the one field that carries the post URL.
pub fn build_feed(blog: &Blog, root: &str, posts: &[Post]) -> Feed {
    let posts: Vec<Post> = select_posts(posts.iter().cloned(), false)
        .into_iter()
        .filter(|post| !post.is_page)
        .collect();

    let entries: Vec<Entry> = posts
        .iter()
        .map(|post| feed_entry(blog, root, post))
        .collect();

    Feed {
        id: format!("{}/", root),
        title: blog.title.as_str().into(),
        subtitle: Some(blog.meta_description().into()),
        updated: entries
            .iter()
            .map(|entry| entry.updated)
            .max()
            .unwrap_or_else(|| Utc::now().into()),
        authors: authors(blog),
        links: vec![
            link(format!("{}/feed/", root), "self"),
            link(root.to_owned(), "alternate"),
        ],
        entries,
        ..Feed::default()
    }
}

fn feed_entry(blog: &Blog, root: &str, post: &Post) -> Entry {
    let date: FixedDateTime = post.published_date.unwrap_or_else(Utc::now).into();
    Entry {
        id: format!("{}/{}", root, post.slug),
        title: post.title.as_str().into(),
        updated: date,
        published: Some(date),
        authors: authors(blog),
        links: vec![link(format!("{}/feed", root), "alternate")],
        content: Some(Content {
            value: Some(markdown::to_plain_text(&post.content)),
            content_type: Some("text".to_owned()),
            ..Content::default()
        }),
        ..Entry::default()
    }
}

fn authors(blog: &Blog) -> Vec<Person> {
    vec![Person {
        name: blog.subdomain.clone(),
        email: Some(AUTHOR_EMAIL.to_owned()),
        ..Person::default()
    }]
}

fn link(href: String, rel: &str) -> Link {
    Link {
        href,
        rel: rel.to_owned(),
        ..Link::default()
    }
}

/// Serializes `feed` as pretty-printed UTF-8 XML with a document declaration.
pub fn write_feed(feed: &Feed) -> Result<String> {
    let config = WriteConfig {
        write_document_declaration: true,
        indent_size: Some(2),
    };
    let bytes = feed.write_with_config(Vec::new(), config)?;
    Ok(String::from_utf8(bytes)?)
}

/// Builds and serializes in one step. See [`build_feed`] and [`write_feed`].
pub fn render_feed(blog: &Blog, root: &str, posts: &[Post]) -> Result<String> {
    write_feed(&build_feed(blog, root, posts))
}

/// The result of a fallible feed operation.
pub type Result<T> = std::result::Result<T, Error>;

/// Represents a problem serializing a feed.
#[derive(Debug, Error)]
pub enum Error {
    /// Returned when there is an Atom-related error.
    #[error(transparent)]
    Atom(#[from] AtomError),

    /// Returned when the serialized feed isn't valid UTF-8.
    #[error("feed is not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

#[cfg(test)]
mod test {
    use super::*;
    use chrono::{DateTime, TimeZone};

    fn day(d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2021, 4, d, 12, 0, 0).unwrap()
    }

    fn blog() -> Blog {
        Blog::new("bear", "Bear Blog").with_content(&format!("# Hello\n\n{}", "x".repeat(300)))
    }

    fn posts() -> Vec<Post> {
        vec![
            Post::new("bear", "first", "First")
                .published(day(1))
                .with_content("The **first** post."),
            Post::new("bear", "draft", "Draft").with_content("unfinished"),
            Post::new("bear", "about", "About").published(day(5)).page(),
            Post::new("bear", "second", "Second")
                .published(day(3))
                .with_content("Second [post](https://example.org)."),
        ]
    }

    fn parse(xml: &str) -> Feed {
        xml.parse::<Feed>().expect("feed should parse as Atom")
    }

    #[test]
    fn test_document_fields() -> Result<()> {
        let xml = render_feed(&blog(), "https://bear.example.com", &posts())?;
        assert!(xml.starts_with("<?xml"));
        let feed = parse(&xml);

        assert_eq!("https://bear.example.com/", feed.id);
        assert_eq!("Bear Blog", feed.title.value);
        let subtitle = &feed.subtitle.as_ref().unwrap().value;
        assert_eq!(160, subtitle.chars().count());
        assert!(subtitle.starts_with("Hello\nxxx"));

        let links: Vec<(&str, &str)> = feed
            .links
            .iter()
            .map(|l| (l.rel.as_str(), l.href.as_str()))
            .collect();
        assert_eq!(
            vec![
                ("self", "https://bear.example.com/feed/"),
                ("alternate", "https://bear.example.com"),
            ],
            links
        );
        assert_eq!("bear", feed.authors[0].name);
        assert_eq!(Some("hidden"), feed.authors[0].email.as_deref());
        assert_eq!(None, feed.authors[0].uri);
        assert_eq!(FixedDateTime::from(day(3)), feed.updated);
        Ok(())
    }

    #[test]
    fn test_entries_published_non_pages_newest_first() -> Result<()> {
        let feed = parse(&render_feed(&blog(), "https://bear.example.com", &posts())?);
        let ids: Vec<&str> = feed.entries.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(
            vec![
                "https://bear.example.com/second",
                "https://bear.example.com/first",
            ],
            ids
        );
        Ok(())
    }

    #[test]
    fn test_entry_fields() -> Result<()> {
        let feed = parse(&render_feed(&blog(), "fox.org", &posts())?);
        let entry = &feed.entries[1];
        assert_eq!("fox.org/first", entry.id);
        assert_eq!("First", entry.title.value);
        assert_eq!("fox.org/feed", entry.links[0].href);
        assert_eq!(
            Some("The first post."),
            entry.content.as_ref().and_then(|c| c.value.as_deref())
        );
        assert_eq!(Some(FixedDateTime::from(day(1))), entry.published);
        Ok(())
    }

    #[test]
    fn test_empty_feed() -> Result<()> {
        let feed = parse(&render_feed(&blog(), "https://bear.example.com", &[])?);
        assert!(feed.entries.is_empty());
        Ok(())
    }
}
