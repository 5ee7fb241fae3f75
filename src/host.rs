//! Resolves a request's `Host` header to a blog.
//!
//! Every host falls into one of four classes ([`HostClass`]):
//!
//! 1. The platform root itself or one of its aliases (e.g. `localhost` during
//!    development). These serve the landing page and the board.
//! 2. A protected subdomain of the root (`www`, `admin`, ...). These never
//!    reach the store and redirect to the platform root instead.
//! 3. Any other subdomain of the root, which names a blog by its subdomain.
//! 4. Anything else, which names a blog by its custom domain.
//!
//! [`Resolver::resolve`] performs the lookup for the last two classes and
//! yields a [`Resolution`], which every route matches over.

use crate::blog::Blog;
use crate::store::{Result, Store};
use std::collections::HashSet;

/// The classification of a host, before any store lookup.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HostClass {
    PlatformRoot,

    /// A reserved subdomain; `redirect` is the base root it bounces to.
    Protected { redirect: String },

    /// A blog subdomain. `root` is the blog's canonical root URL.
    Subdomain { label: String, root: String },

    /// A custom domain, normalized (lowercase, no port).
    CustomDomain { domain: String },
}

/// The outcome of resolving a host.
#[derive(Clone, Debug, PartialEq)]
pub enum Resolution {
    PlatformRoot,

    /// Redirect to the given URL.
    Redirect(String),

    Tenant(Context),

    NotFound,
}

/// The per-request view of the resolved blog. Built fresh for each request
/// and dropped with the response.
#[derive(Clone, Debug, PartialEq)]
pub struct Context {
    pub blog: Blog,

    /// The base URL for links that point back at the blog. Never carries a
    /// port or a trailing path.
    pub root: String,

    /// Whether unpublished posts are visible.
    pub preview: bool,
}

impl Context {
    pub fn new(blog: Blog, root: String) -> Context {
        Context {
            blog,
            root,
            preview: false,
        }
    }

    pub fn with_preview(mut self, preview: bool) -> Context {
        self.preview = preview;
        self
    }
}

/// Classifies hosts against a platform root domain. See the module
/// documentation for the rules.
#[derive(Clone, Debug)]
pub struct Resolver {
    /// The root domain followed by its aliases, all lowercase.
    bases: Vec<String>,
    scheme: String,
    protected: HashSet<String>,
}

impl Resolver {
    /// Constructs a new resolver.
    ///
    /// * `root_domain` is the platform's public domain, e.g. `example.com`.
    /// * `aliases` are further host names treated exactly like the root,
    ///   e.g. `localhost`.
    /// * `scheme` prefixes generated root URLs, normally `https`.
    /// * `protected` lists subdomain labels that must never resolve to a blog.
    pub fn new<A, P>(root_domain: &str, aliases: A, scheme: &str, protected: P) -> Resolver
    where
        A: IntoIterator,
        A::Item: AsRef<str>,
        P: IntoIterator,
        P::Item: AsRef<str>,
    {
        let mut bases = vec![normalize_host(root_domain)];
        bases.extend(aliases.into_iter().map(|a| normalize_host(a.as_ref())));
        Resolver {
            bases,
            scheme: scheme.to_lowercase(),
            protected: protected
                .into_iter()
                .map(|p| p.as_ref().to_lowercase())
                .collect(),
        }
    }

    /// The URL of the platform root, e.g. `https://example.com`.
    pub fn platform_root(&self) -> String {
        self.base_root(&self.bases[0])
    }

    pub fn is_protected(&self, label: &str) -> bool {
        self.protected.contains(label)
    }

    /// Classifies `host` without touching the store. The host may carry a
    /// port and any casing; both are normalized away first.
    pub fn classify(&self, host: &str) -> HostClass {
        let host = normalize_host(host);

        if self.bases.iter().any(|base| *base == host) {
            return HostClass::PlatformRoot;
        }

        for base in &self.bases {
            let label = match host
                .strip_suffix(base.as_str())
                .and_then(|rest| rest.strip_suffix('.'))
            {
                Some(label) => label,
                None => continue,
            };
            if self.is_protected(label) {
                return HostClass::Protected {
                    redirect: self.base_root(base),
                };
            }
            return HostClass::Subdomain {
                label: label.to_owned(),
                root: self.tenant_root(label, base),
            };
        }

        HostClass::CustomDomain { domain: host }
    }

    /// Classifies `host` and looks up the blog it names, if any.
    pub fn resolve<S: Store + ?Sized>(&self, host: &str, store: &S) -> Result<Resolution> {
        let resolution = match self.classify(host) {
            HostClass::PlatformRoot => Resolution::PlatformRoot,
            HostClass::Protected { redirect } => Resolution::Redirect(redirect),
            HostClass::Subdomain { label, root } => match store.blog_by_subdomain(&label)? {
                Some(blog) => Resolution::Tenant(Context::new(blog, root)),
                None => Resolution::NotFound,
            },
            HostClass::CustomDomain { domain } => match store.blog_by_domain(&domain)? {
                Some(blog) => Resolution::Tenant(Context::new(blog, domain)),
                None => Resolution::NotFound,
            },
        };
        tracing::debug!(host, ?resolution, "resolved host");
        Ok(resolution)
    }

    fn base_root(&self, base: &str) -> String {
        format!("{}://{}", self.scheme, base)
    }

    fn tenant_root(&self, label: &str, base: &str) -> String {
        match label.is_empty() {
            true => self.base_root(base),
            false => format!("{}://{}.{}", self.scheme, label, base),
        }
    }
}

/// Lowercases `host` and strips any port and trailing dot. IPv6 literals keep
/// their brackets.
pub fn normalize_host(host: &str) -> String {
    let host = host.trim();
    let without_port = if host.starts_with('[') {
        match host.find(']') {
            Some(end) => &host[..=end],
            None => host,
        }
    } else {
        match host.rsplit_once(':') {
            Some((name, port)) if port.chars().all(|c| c.is_ascii_digit()) => name,
            _ => host,
        }
    };
    without_port.trim_end_matches('.').to_lowercase()
}
