//! Conversions from core types into template [`Value`]s. Templates see
//! objects with lowercase snake_case keys; optional fields become
//! [`Value::Nil`] so that `{{ if .field }}` works.
//!
//! Templates print values verbatim, so every string is HTML-escaped on the
//! way in.

use crate::blog::Blog;
use crate::board::RankedPost;
use crate::post::{NavItem, Post};
use chrono::{DateTime, Utc};
use gtmpl::Value;
use pulldown_cmark::escape::escape_html;
use std::collections::HashMap;

/// Builds a [`Value::Object`] one field at a time.
#[derive(Default)]
pub struct Object(HashMap<String, Value>);

impl Object {
    pub fn new() -> Object {
        Object::default()
    }

    pub fn with<V: Into<Value>>(mut self, key: &str, value: V) -> Object {
        self.0.insert(key.to_owned(), value.into());
        self
    }
}

impl From<Object> for Value {
    fn from(object: Object) -> Value {
        Value::Object(object.0)
    }
}

/// Converts a sequence of items into a [`Value::Array`].
pub fn array<'a, T: 'a, I>(items: I) -> Value
where
    I: IntoIterator<Item = &'a T>,
    &'a T: Into<Value>,
{
    Value::Array(items.into_iter().map(Into::into).collect())
}

/// An HTML-escaped string.
pub fn text(value: &str) -> Value {
    let mut escaped = String::with_capacity(value.len());
    // Writing into a String can't fail.
    let _ = escape_html(&mut escaped, value);
    Value::String(escaped)
}

fn optional_text(value: Option<&str>) -> Value {
    match value {
        Some(s) => text(s),
        None => Value::Nil,
    }
}

fn date(value: Option<&DateTime<Utc>>) -> Value {
    optional_text(value.map(|d| d.format("%Y-%m-%d").to_string()).as_deref())
}

impl From<&Blog> for Value {
    fn from(blog: &Blog) -> Value {
        Object::new()
            .with("subdomain", text(&blog.subdomain))
            .with("domain", optional_text(blog.domain.as_deref()))
            .with("title", text(&blog.title))
            .into()
    }
}

impl From<&Post> for Value {
    fn from(post: &Post) -> Value {
        Object::new()
            .with("slug", text(&post.slug))
            .with("title", text(&post.title))
            .with("publish", post.publish)
            .with("is_page", post.is_page)
            .with("published_date", date(post.published_date.as_ref()))
            .into()
    }
}

impl From<&NavItem> for Value {
    fn from(item: &NavItem) -> Value {
        Object::new()
            .with("slug", text(&item.slug))
            .with("title", text(&item.title))
            .with("is_page", item.is_page)
            .into()
    }
}

impl From<&RankedPost> for Value {
    fn from(ranked: &RankedPost) -> Value {
        Object::new()
            .with("post", &ranked.post)
            .with("blog", &ranked.blog)
            .with("upvotes", ranked.upvotes as u64)
            .into()
    }
}
