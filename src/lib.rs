//! The library code for the `hostblog` multi-tenant blog host. Every request
//! passes through the same three steps:
//!
//! 1. Resolving the request's `Host` header to a blog ([`crate::host`])
//! 2. Selecting and rendering that blog's posts ([`crate::post`],
//!    [`crate::markdown`], [`crate::feed`])
//! 3. Handing the prepared values to a template ([`crate::render`])
//!
//! Host resolution is the interesting step. A host is either the platform
//! root (or one of its aliases), a subdomain of the root, or a custom domain
//! that some blog has claimed. Subdomains in the protected set never reach
//! the store; they redirect to the platform root instead.
//!
//! The platform root also serves the board ([`crate::board`]): every post on
//! the platform ranked by upvotes, a page at a time.
//!
//! Blogs, posts, and upvotes come from a [`crate::store::Store`]. The bundled
//! [`crate::store::MemoryStore`] is filled from a data directory of Markdown
//! files by [`crate::parser`].

#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]

pub mod blog;
pub mod board;
pub mod config;
pub mod feed;
pub mod host;
pub mod markdown;
pub mod parser;
pub mod post;
pub mod render;
pub mod server;
pub mod store;
pub mod value;

mod textrenderer;
