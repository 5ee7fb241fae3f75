//! The storage collaborator. The core only ever reads blogs, posts, and
//! upvotes through the [`Store`] trait; filtering beyond the coarse
//! [`PostFilter`] and all ordering happen in the core itself (see
//! [`crate::post`] and [`crate::board`]).

use crate::blog::Blog;
use crate::post::{Post, PostKey, Upvote};
use std::collections::{BTreeMap, HashMap, HashSet};
use thiserror::Error;

/// Read access to blogs, posts, and upvotes. Calls are synchronous from the
/// caller's point of view.
pub trait Store: Send + Sync {
    /// Looks up a blog by its subdomain label.
    fn blog_by_subdomain(&self, subdomain: &str) -> Result<Option<Blog>>;

    /// Looks up a blog by exact custom domain.
    fn blog_by_domain(&self, domain: &str) -> Result<Option<Blog>>;

    /// Returns the posts of one blog that pass `filter`, in no particular
    /// order.
    fn posts_for_blog(&self, subdomain: &str, filter: PostFilter) -> Result<Vec<Post>>;

    /// Returns every post on the platform, published or not.
    fn all_posts(&self) -> Result<Vec<Post>>;

    /// Returns the number of upvotes per post. Posts without upvotes may be
    /// absent from the map.
    fn upvote_counts(&self) -> Result<HashMap<PostKey, usize>>;
}

/// Coarse filter for [`Store::posts_for_blog`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PostFilter {
    /// Keep posts whose `publish` flag is false.
    pub include_unpublished: bool,

    /// Keep posts whose `is_page` flag is true.
    pub include_pages: bool,
}

impl PostFilter {
    /// Published posts and pages.
    pub fn published() -> PostFilter {
        PostFilter {
            include_unpublished: false,
            include_pages: true,
        }
    }

    /// Everything, as seen in preview mode.
    pub fn all() -> PostFilter {
        PostFilter {
            include_unpublished: true,
            include_pages: true,
        }
    }

    /// Published posts that aren't pages, as included in the feed.
    pub fn feed() -> PostFilter {
        PostFilter {
            include_unpublished: false,
            include_pages: false,
        }
    }

    /// Returns the filter appropriate for a request in or out of preview mode.
    pub fn for_preview(preview: bool) -> PostFilter {
        match preview {
            true => PostFilter::all(),
            false => PostFilter::published(),
        }
    }

    pub fn matches(&self, post: &Post) -> bool {
        (self.include_unpublished || post.publish) && (self.include_pages || !post.is_page)
    }
}

/// A [`Store`] held entirely in memory. Uniqueness of subdomains, custom
/// domains, and per-blog slugs is enforced on insert. Subdomains and domains
/// are stored lowercase.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    blogs: BTreeMap<String, Blog>,

    /// Custom domain to subdomain.
    domains: HashMap<String, String>,

    posts: Vec<Post>,
    keys: HashSet<PostKey>,
    upvotes: Vec<Upvote>,
}

impl MemoryStore {
    pub fn new() -> MemoryStore {
        MemoryStore::default()
    }

    pub fn insert_blog(&mut self, mut blog: Blog) -> Result<()> {
        blog.subdomain = blog.subdomain.to_lowercase();
        blog.domain = blog.domain.map(|d| d.to_lowercase());
        if self.blogs.contains_key(&blog.subdomain) {
            return Err(Error::DuplicateSubdomain(blog.subdomain));
        }
        if let Some(domain) = &blog.domain {
            if self.domains.contains_key(domain) {
                return Err(Error::DuplicateDomain(domain.clone()));
            }
            self.domains.insert(domain.clone(), blog.subdomain.clone());
        }
        self.blogs.insert(blog.subdomain.clone(), blog);
        Ok(())
    }

    pub fn insert_post(&mut self, mut post: Post) -> Result<()> {
        post.blog = post.blog.to_lowercase();
        if !self.blogs.contains_key(&post.blog) {
            return Err(Error::UnknownBlog(post.blog));
        }
        if !self.keys.insert(post.key()) {
            return Err(Error::DuplicateSlug {
                blog: post.blog,
                slug: post.slug,
            });
        }
        self.posts.push(post);
        Ok(())
    }

    pub fn insert_upvote(&mut self, mut upvote: Upvote) -> Result<()> {
        upvote.blog = upvote.blog.to_lowercase();
        if !self.keys.contains(&upvote.key()) {
            return Err(Error::UnknownPost {
                blog: upvote.blog,
                slug: upvote.slug,
            });
        }
        self.upvotes.push(upvote);
        Ok(())
    }

    pub fn blog_count(&self) -> usize {
        self.blogs.len()
    }

    pub fn post_count(&self) -> usize {
        self.posts.len()
    }

    pub fn upvote_count(&self) -> usize {
        self.upvotes.len()
    }
}

impl Store for MemoryStore {
    fn blog_by_subdomain(&self, subdomain: &str) -> Result<Option<Blog>> {
        Ok(self.blogs.get(&subdomain.to_lowercase()).cloned())
    }

    fn blog_by_domain(&self, domain: &str) -> Result<Option<Blog>> {
        Ok(self
            .domains
            .get(&domain.to_lowercase())
            .and_then(|subdomain| self.blogs.get(subdomain))
            .cloned())
    }

    fn posts_for_blog(&self, subdomain: &str, filter: PostFilter) -> Result<Vec<Post>> {
        let subdomain = subdomain.to_lowercase();
        Ok(self
            .posts
            .iter()
            .filter(|post| post.blog == subdomain && filter.matches(post))
            .cloned()
            .collect())
    }

    fn all_posts(&self) -> Result<Vec<Post>> {
        Ok(self.posts.clone())
    }

    fn upvote_counts(&self) -> Result<HashMap<PostKey, usize>> {
        let mut counts: HashMap<PostKey, usize> = HashMap::new();
        for upvote in &self.upvotes {
            *counts.entry(upvote.key()).or_insert(0) += 1;
        }
        Ok(counts)
    }
}

/// The result of a fallible store operation.
pub type Result<T> = std::result::Result<T, Error>;

/// Represents a problem inserting into or reading from a store.
#[derive(Debug, Error)]
pub enum Error {
    /// Returned when a second blog claims an existing subdomain.
    #[error("duplicate subdomain `{0}`")]
    DuplicateSubdomain(String),

    /// Returned when a second blog claims an existing custom domain.
    #[error("duplicate domain `{0}`")]
    DuplicateDomain(String),

    /// Returned when a blog already has a post with the same slug.
    #[error("duplicate slug `{slug}` in blog `{blog}`")]
    DuplicateSlug { blog: String, slug: String },

    /// Returned when a post refers to a blog that doesn't exist.
    #[error("unknown blog `{0}`")]
    UnknownBlog(String),

    /// Returned when an upvote refers to a post that doesn't exist.
    #[error("upvote for unknown post `{blog}/{slug}`")]
    UnknownPost { blog: String, slug: String },

    /// Returned by store backends that can fail at read time.
    #[error("store backend: {0}")]
    Backend(String),
}

#[cfg(test)]
mod test {
    use super::*;

    fn fixture() -> MemoryStore {
        let mut store = MemoryStore::new();
        store.insert_blog(Blog::new("Bear", "Bear")).unwrap();
        store
            .insert_blog(Blog::new("fox", "Fox").with_domain("Fox.Example.org"))
            .unwrap();
        store.insert_post(Post::new("bear", "a", "A")).unwrap();
        store.insert_post(Post::new("bear", "b", "B").page()).unwrap();
        store.insert_post(Post::new("fox", "a", "Fox A")).unwrap();
        store
    }

    #[test]
    fn test_lookups_are_case_insensitive() -> Result<()> {
        let store = fixture();
        assert_eq!("bear", store.blog_by_subdomain("BEAR")?.unwrap().subdomain);
        assert_eq!("fox", store.blog_by_domain("fox.example.org")?.unwrap().subdomain);
        assert!(store.blog_by_domain("example.org")?.is_none());
        Ok(())
    }

    #[test]
    fn test_duplicates_rejected() {
        let mut store = fixture();
        assert!(matches!(
            store.insert_blog(Blog::new("bear", "Again")),
            Err(Error::DuplicateSubdomain(_))
        ));
        assert!(matches!(
            store.insert_blog(Blog::new("wolf", "Wolf").with_domain("fox.example.org")),
            Err(Error::DuplicateDomain(_))
        ));
        assert!(matches!(
            store.insert_post(Post::new("bear", "a", "Again")),
            Err(Error::DuplicateSlug { .. })
        ));
        assert!(matches!(
            store.insert_post(Post::new("nobody", "a", "A")),
            Err(Error::UnknownBlog(_))
        ));
    }

    #[test]
    fn test_slugs_scoped_per_blog() -> Result<()> {
        let store = fixture();
        assert_eq!(1, store.posts_for_blog("fox", PostFilter::all())?.len());
        assert_eq!(2, store.posts_for_blog("bear", PostFilter::all())?.len());
        Ok(())
    }

    #[test]
    fn test_post_filter() -> Result<()> {
        let mut store = fixture();
        store.insert_post(
            Post::new("bear", "c", "C").published(chrono::Utc::now()),
        )?;
        let feed = store.posts_for_blog("bear", PostFilter::feed())?;
        assert_eq!(vec!["c"], feed.iter().map(|p| p.slug.as_str()).collect::<Vec<_>>());
        assert_eq!(1, store.posts_for_blog("bear", PostFilter::published())?.len());
        Ok(())
    }

    #[test]
    fn test_upvote_counts() -> Result<()> {
        let mut store = fixture();
        for voter in ["1", "2"] {
            store.insert_upvote(Upvote {
                blog: "bear".to_owned(),
                slug: "a".to_owned(),
                voter: voter.to_owned(),
            })?;
        }
        assert!(matches!(
            store.insert_upvote(Upvote {
                blog: "bear".to_owned(),
                slug: "zzz".to_owned(),
                voter: String::new(),
            }),
            Err(Error::UnknownPost { .. })
        ));
        let counts = store.upvote_counts()?;
        assert_eq!(Some(&2), counts.get(&Post::new("bear", "a", "").key()));
        assert_eq!(None, counts.get(&Post::new("fox", "a", "").key()));
        Ok(())
    }
}
