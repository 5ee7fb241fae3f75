//! Defines the [`Blog`] type, one tenant of the platform.

use crate::markdown;
use chrono::{DateTime, Utc};

/// A hosted blog. A blog is reached either through `{subdomain}.{root}` or
/// through its custom `domain`, never both for the same request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Blog {
    /// Lowercase label, unique among blogs.
    pub subdomain: String,

    /// Custom domain, unique among blogs when set.
    pub domain: Option<String>,

    pub title: String,

    /// Markdown body of the blog's home page.
    pub content: String,

    pub created: Option<DateTime<Utc>>,
}

impl Blog {
    pub fn new(subdomain: &str, title: &str) -> Blog {
        Blog {
            subdomain: subdomain.to_lowercase(),
            domain: None,
            title: title.to_owned(),
            content: String::new(),
            created: None,
        }
    }

    pub fn with_domain(mut self, domain: &str) -> Blog {
        self.domain = Some(domain.to_lowercase());
        self
    }

    pub fn with_content(mut self, content: &str) -> Blog {
        self.content = content.to_owned();
        self
    }

    /// The blog's home page content as HTML.
    pub fn html(&self) -> String {
        markdown::to_html(&self.content)
    }

    /// The first 160 characters of the blog's content as plain text. Used
    /// for the `<meta name="description">` tag and the feed subtitle.
    pub fn meta_description(&self) -> String {
        markdown::meta_description(&self.content)
    }
}
