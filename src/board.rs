//! The board: every post on the platform ranked by upvotes and served a page
//! at a time. Only reachable on the platform root.

use crate::blog::Blog;
use crate::post::{newest_first, Post, PostKey};
use crate::store::{self, Store};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::num::ParseIntError;
use thiserror::Error;

/// The number of posts per board page unless configured otherwise.
pub const DEFAULT_PAGE_SIZE: usize = 2;

/// A post on the board along with its blog and its upvote count.
#[derive(Clone, Debug, PartialEq)]
pub struct RankedPost {
    pub post: Post,
    pub blog: Blog,
    pub upvotes: usize,
}

/// One page of the board.
#[derive(Clone, Debug, PartialEq)]
pub struct BoardPage {
    pub posts: Vec<RankedPost>,

    /// The page to request to continue past this one.
    pub next_page: u64,

    /// The rank offset of the first post on this page.
    pub from: usize,
}

/// Ranks posts for the board. The page size is fixed at construction.
#[derive(Clone, Debug)]
pub struct Board {
    page_size: usize,
}

impl Default for Board {
    fn default() -> Self {
        Board::new(DEFAULT_PAGE_SIZE)
    }
}

impl Board {
    pub fn new(page_size: usize) -> Board {
        Board { page_size }
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Returns page `page` of the board: ranks `page * page_size` up to (but
    /// excluding) `(page + 1) * page_size`. Every post is eligible, published
    /// or not. The blogs of the returned posts are looked up before
    /// returning.
    pub fn rank<S: Store + ?Sized>(&self, store: &S, page: u64) -> Result<BoardPage> {
        let from = usize::try_from(page)
            .unwrap_or(usize::MAX)
            .saturating_mul(self.page_size);
        let to = from.saturating_add(self.page_size);

        let counts = store.upvote_counts()?;
        let ranked = rank_posts(store.all_posts()?, &counts);

        let mut blogs: HashMap<String, Blog> = HashMap::new();
        let mut posts = Vec::with_capacity(self.page_size);
        for (post, upvotes) in ranked.into_iter().take(to).skip(from) {
            let blog = match blogs.get(&post.blog) {
                Some(blog) => blog.clone(),
                None => {
                    let blog = store
                        .blog_by_subdomain(&post.blog)?
                        .ok_or_else(|| Error::MissingBlog(post.blog.clone()))?;
                    blogs.insert(post.blog.clone(), blog.clone());
                    blog
                }
            };
            posts.push(RankedPost {
                post,
                blog,
                upvotes,
            });
        }

        Ok(BoardPage {
            posts,
            next_page: page.saturating_add(1),
            from,
        })
    }
}

/// Orders posts by upvote count, most first, then by [`newest_first`]. Posts
/// that are still tied are ordered by blog and slug so that the ranking is
/// the same on every request.
pub fn rank_posts(posts: Vec<Post>, counts: &HashMap<PostKey, usize>) -> Vec<(Post, usize)> {
    let mut ranked: Vec<(Post, usize)> = posts
        .into_iter()
        .map(|post| {
            let upvotes = counts.get(&post.key()).copied().unwrap_or(0);
            (post, upvotes)
        })
        .collect();
    ranked.sort_by(|(a, a_votes), (b, b_votes)| {
        b_votes
            .cmp(a_votes)
            .then_with(|| newest_first(a, b))
            .then_with(|| by_key(a, b))
    });
    ranked
}

fn by_key(a: &Post, b: &Post) -> Ordering {
    (&a.blog, &a.slug).cmp(&(&b.blog, &b.slug))
}

/// Parses the board's `page` query parameter. A missing or empty parameter
/// means page 0; anything else must be a non-negative integer.
pub fn parse_page(input: Option<&str>) -> Result<u64> {
    match input {
        None | Some("") => Ok(0),
        Some(s) => s.parse::<u64>().map_err(|source| Error::InvalidPage {
            input: s.to_owned(),
            source,
        }),
    }
}

/// The result of a fallible board operation.
pub type Result<T> = std::result::Result<T, Error>;

/// Represents a problem producing a board page.
#[derive(Debug, Error)]
pub enum Error {
    /// Returned when the `page` parameter isn't a non-negative integer.
    #[error("invalid page `{input}`: {source}")]
    InvalidPage {
        input: String,
        #[source]
        source: ParseIntError,
    },

    /// Returned when a ranked post's blog is missing from the store.
    #[error("post belongs to unknown blog `{0}`")]
    MissingBlog(String),

    /// Returned when the store fails.
    #[error(transparent)]
    Store(#[from] store::Error),
}
