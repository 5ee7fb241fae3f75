//! Defines the [`Post`] and [`Upvote`] types along with the logic for picking
//! which of a blog's posts a request gets to see and in what order. See
//! [`select_posts`] for the visibility rules and [`newest_first`] for the
//! ordering.

use crate::markdown;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::cmp::Ordering;
use thiserror::Error;

/// A post or a page belonging to exactly one [`crate::blog::Blog`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Post {
    /// The subdomain of the owning blog.
    pub blog: String,

    /// Unique within the owning blog, not globally.
    pub slug: String,

    pub title: String,

    /// Markdown body.
    pub content: String,

    /// Unpublished posts are only visible in preview mode.
    pub publish: bool,

    /// Pages (e.g. "About") are listed in the navigation instead of the
    /// chronological listing and are left out of the feed.
    pub is_page: bool,

    /// `None` until the post has been published.
    pub published_date: Option<DateTime<Utc>>,
}

impl Post {
    pub fn new(blog: &str, slug: &str, title: &str) -> Post {
        Post {
            blog: blog.to_lowercase(),
            slug: slug.to_owned(),
            title: title.to_owned(),
            content: String::new(),
            publish: false,
            is_page: false,
            published_date: None,
        }
    }

    /// Marks the post published as of `date`.
    pub fn published(mut self, date: DateTime<Utc>) -> Post {
        self.publish = true;
        self.published_date = Some(date);
        self
    }

    pub fn page(mut self) -> Post {
        self.is_page = true;
        self
    }

    pub fn with_content(mut self, content: &str) -> Post {
        self.content = content.to_owned();
        self
    }

    pub fn key(&self) -> PostKey {
        PostKey {
            blog: self.blog.clone(),
            slug: self.slug.clone(),
        }
    }

    pub fn html(&self) -> String {
        markdown::to_html(&self.content)
    }

    pub fn plain_text(&self) -> String {
        markdown::to_plain_text(&self.content)
    }

    pub fn meta_description(&self) -> String {
        markdown::meta_description(&self.content)
    }
}

/// Identifies a post across the whole platform.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PostKey {
    pub blog: String,
    pub slug: String,
}

/// One vote for one post. Each record counts exactly once towards the post's
/// upvote count.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct Upvote {
    pub blog: String,
    pub slug: String,

    /// Opaque voter signal, e.g. a hashed address.
    #[serde(default)]
    pub voter: String,
}

impl Upvote {
    pub fn key(&self) -> PostKey {
        PostKey {
            blog: self.blog.clone(),
            slug: self.slug.clone(),
        }
    }
}

/// The reduced view of a post used to render site navigation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NavItem {
    pub title: String,
    pub slug: String,
    pub is_page: bool,
}

impl From<&Post> for NavItem {
    fn from(post: &Post) -> NavItem {
        NavItem {
            title: post.title.clone(),
            slug: post.slug.clone(),
            is_page: post.is_page,
        }
    }
}

/// Orders posts most recent first. Posts without a published date sort after
/// every dated post.
pub fn newest_first(a: &Post, b: &Post) -> Ordering {
    // `None < Some(_)`, so reversing the comparison puts undated posts last.
    b.published_date.cmp(&a.published_date)
}

/// Filters a blog's posts down to those the request may see and sorts them
/// with [`newest_first`]. Unpublished posts are only kept when
/// `include_unpublished` is set, which happens in preview mode. The sort is
/// stable, so re-selecting an already selected sequence leaves it unchanged.
pub fn select_posts<I>(posts: I, include_unpublished: bool) -> Vec<Post>
where
    I: IntoIterator<Item = Post>,
{
    let mut selected: Vec<Post> = posts
        .into_iter()
        .filter(|post| include_unpublished || post.publish)
        .collect();
    selected.sort_by(newest_first);
    selected
}

/// The navigation view of a selection: its pages, projected to [`NavItem`]s.
/// Navigation is built from the full selection, independent of whatever
/// subset of posts the current page lists. Only pages are kept, so
/// [`NavItem::is_page`] is always true here.
pub fn nav(posts: &[Post]) -> Vec<NavItem> {
    posts
        .iter()
        .filter(|post| post.is_page)
        .map(NavItem::from)
        .collect()
}

/// The chronological listing of a selection: everything that isn't a page,
/// in selection order.
pub fn listing(posts: &[Post]) -> Vec<&Post> {
    posts.iter().filter(|post| !post.is_page).collect()
}

/// Finds the post with exactly `slug` (case-sensitive) in a selection. Since
/// the lookup runs over an already filtered selection, unpublished posts are
/// only found in preview mode.
pub fn get_post<'a>(posts: &'a [Post], slug: &str) -> Result<&'a Post> {
    posts
        .iter()
        .find(|post| post.slug == slug)
        .ok_or_else(|| Error::PostNotFound(slug.to_owned()))
}

/// The result of a fallible post lookup.
pub type Result<T> = std::result::Result<T, Error>;

/// Represents a failed post lookup.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum Error {
    /// Returned when no visible post has the requested slug.
    #[error("no post with slug `{0}`")]
    PostNotFound(String),
}

#[cfg(test)]
mod test {
    use super::*;
    use chrono::TimeZone;

    fn day(d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2021, 4, d, 0, 0, 0).unwrap()
    }

    fn fixture() -> Vec<Post> {
        vec![
            Post::new("bear", "old", "Old").published(day(1)),
            Post::new("bear", "draft", "Draft"),
            Post::new("bear", "about", "About").published(day(2)).page(),
            Post::new("bear", "new", "New").published(day(9)),
            Post::new("bear", "hidden-page", "Hidden").page(),
        ]
    }

    fn slugs(posts: &[Post]) -> Vec<&str> {
        posts.iter().map(|p| p.slug.as_str()).collect()
    }

    #[test]
    fn test_select_published_only() {
        let selected = select_posts(fixture(), false);
        assert!(selected.iter().all(|p| p.publish));
        assert_eq!(vec!["new", "about", "old"], slugs(&selected));
    }

    #[test]
    fn test_select_preview_sorts_undated_last() {
        let selected = select_posts(fixture(), true);
        assert_eq!(
            vec!["new", "about", "old", "draft", "hidden-page"],
            slugs(&selected)
        );
    }

    #[test]
    fn test_select_is_idempotent() {
        for preview in [false, true] {
            let once = select_posts(fixture(), preview);
            let twice = select_posts(once.clone(), preview);
            assert_eq!(once, twice);
        }
    }

    #[test]
    fn test_nav_and_listing_split_pages() {
        let selected = select_posts(fixture(), false);
        assert_eq!(
            vec![NavItem {
                title: "About".to_owned(),
                slug: "about".to_owned(),
                is_page: true,
            }],
            nav(&selected)
        );
        let listed: Vec<&str> = listing(&selected).iter().map(|p| p.slug.as_str()).collect();
        assert_eq!(vec!["new", "old"], listed);
    }

    #[test]
    fn test_nav_keeps_only_pages() {
        let items = nav(&select_posts(fixture(), true));
        let slugs: Vec<&str> = items.iter().map(|i| i.slug.as_str()).collect();
        assert_eq!(vec!["about", "hidden-page"], slugs);
        assert!(items.iter().all(|i| i.is_page));
    }

    #[test]
    fn test_get_post() {
        let selected = select_posts(fixture(), false);
        assert_eq!("New", get_post(&selected, "new").unwrap().title);
    }

    #[test]
    fn test_get_post_missing() {
        let selected = select_posts(fixture(), true);
        assert_eq!(
            Err(Error::PostNotFound("missing".to_owned())),
            get_post(&selected, "missing")
        );
    }

    #[test]
    fn test_get_post_hides_drafts_outside_preview() {
        assert!(get_post(&select_posts(fixture(), false), "draft").is_err());
        assert!(get_post(&select_posts(fixture(), true), "draft").is_ok());
    }

    #[test]
    fn test_get_post_is_case_sensitive() {
        assert!(get_post(&select_posts(fixture(), false), "NEW").is_err());
    }
}
