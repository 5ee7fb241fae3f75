//! The request router. Every route resolves the request's host once with
//! [`Resolver::resolve`] and matches over the [`Resolution`]; the data each
//! route gathers is handed to a [`Renderer`] as a template [`Value`]. Only
//! the `content` field carries raw HTML; every other string is escaped with
//! [`text`].

use crate::board::{self, parse_page, Board, BoardPage};
use crate::feed;
use crate::host::{Context, Resolution, Resolver};
use crate::post::{self, get_post, listing, nav, select_posts, Post};
use crate::render::{self, Renderer};
use crate::store::{self, PostFilter, Store};
use crate::value::{array, text, Object};
use axum::extract::{FromRequestParts, Path, Query, State};
use axum::http::request::Parts;
use axum::http::{header, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use gtmpl::Value;
use std::collections::HashMap;
use std::convert::Infallible;
use std::sync::Arc;
use thiserror::Error;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

/// Everything a request needs, shared across requests. Holds no mutable
/// state.
pub struct App {
    resolver: Resolver,
    board: Board,
    store: Arc<dyn Store>,
    renderer: Arc<dyn Renderer>,
}

impl App {
    pub fn new(
        resolver: Resolver,
        board: Board,
        store: Arc<dyn Store>,
        renderer: Arc<dyn Renderer>,
    ) -> App {
        App {
            resolver,
            board,
            store,
            renderer,
        }
    }

    fn resolve(&self, host: &str, preview: bool) -> Result<Resolution> {
        Ok(match self.resolver.resolve(host, self.store.as_ref())? {
            Resolution::Tenant(ctx) => Resolution::Tenant(ctx.with_preview(preview)),
            other => other,
        })
    }

    /// Resolves the host for routes that only exist on blogs. The platform
    /// root bounces to its landing page.
    fn tenant(&self, host: &str, preview: bool) -> Result<Target> {
        match self.resolve(host, preview)? {
            Resolution::Tenant(ctx) => Ok(Target::Blog(ctx)),
            Resolution::PlatformRoot => Ok(Target::Redirect("/".to_owned())),
            Resolution::Redirect(url) => Ok(Target::Redirect(url)),
            Resolution::NotFound => Err(Error::NotFound),
        }
    }

    fn selection(&self, ctx: &Context) -> Result<Vec<Post>> {
        let posts = self
            .store
            .posts_for_blog(&ctx.blog.subdomain, PostFilter::for_preview(ctx.preview))?;
        Ok(select_posts(posts, ctx.preview))
    }

    fn blog_value(&self, ctx: &Context, posts: &[Post]) -> Object {
        Object::new()
            .with("blog", &ctx.blog)
            .with("root", text(&ctx.root))
            .with("preview", ctx.preview)
            .with("meta_description", text(&ctx.blog.meta_description()))
            .with("nav", array(&nav(posts)))
            .with("posts", array(listing(posts)))
    }

    /// The blog's home page, or the landing page on the platform root. Only
    /// published posts are listed.
    fn home(&self, host: &str) -> Result<Response> {
        let ctx = match self.resolve(host, false)? {
            Resolution::PlatformRoot => {
                let value = Object::new().with("root", text(&self.resolver.platform_root()));
                return self.page(render::LANDING, value.into());
            }
            Resolution::Redirect(url) => return Ok(redirect(&url)),
            Resolution::NotFound => return Err(Error::NotFound),
            Resolution::Tenant(ctx) => ctx,
        };
        let posts = self.selection(&ctx)?;
        let value = self
            .blog_value(&ctx, &posts)
            .with("content", ctx.blog.html());
        self.page(render::HOME, value.into())
    }

    /// The full listing of published posts.
    fn posts(&self, host: &str) -> Result<Response> {
        let ctx = match self.tenant(host, false)? {
            Target::Blog(ctx) => ctx,
            Target::Redirect(url) => return Ok(redirect(&url)),
        };
        let posts = self.selection(&ctx)?;
        self.page(render::POSTS, self.blog_value(&ctx, &posts).into())
    }

    fn post(&self, host: &str, slug: &str, preview: bool) -> Result<Response> {
        let ctx = match self.tenant(host, preview)? {
            Target::Blog(ctx) => ctx,
            Target::Redirect(url) => return Ok(redirect(&url)),
        };
        let posts = self.selection(&ctx)?;
        let post = get_post(&posts, slug)?;
        let value = self
            .blog_value(&ctx, &posts)
            .with("post", post)
            .with("content", post.html())
            .with("meta_description", text(&post.meta_description()));
        self.page(render::POST, value.into())
    }

    fn feed(&self, host: &str) -> Result<Response> {
        let ctx = match self.tenant(host, false)? {
            Target::Blog(ctx) => ctx,
            Target::Redirect(url) => return Ok(redirect(&url)),
        };
        let posts = self
            .store
            .posts_for_blog(&ctx.blog.subdomain, PostFilter::feed())?;
        let xml = feed::render_feed(&ctx.blog, &ctx.root, &posts)?;
        Ok(([(header::CONTENT_TYPE, feed::MEDIA_TYPE)], xml).into_response())
    }

    /// The board exists only on the platform root. Every other host,
    /// protected subdomains included, gets a 404.
    fn board(&self, host: &str, page: Option<&str>) -> Result<Response> {
        match self.resolve(host, false)? {
            Resolution::PlatformRoot => {}
            Resolution::Redirect(_) | Resolution::Tenant(_) | Resolution::NotFound => {
                return Err(Error::NotFound)
            }
        }
        let BoardPage {
            posts,
            next_page,
            from,
        } = self.board.rank(self.store.as_ref(), parse_page(page)?)?;
        let value = Object::new()
            .with("root", text(&self.resolver.platform_root()))
            .with("posts", array(&posts))
            .with("next_page", next_page)
            .with("from", from as u64);
        self.page(render::BOARD, value.into())
    }

    fn page(&self, name: &str, value: Value) -> Result<Response> {
        Ok(Html(self.renderer.render(name, value)?).into_response())
    }

    fn not_found(&self) -> Response {
        match self.renderer.render(render::NOT_FOUND, Object::new().into()) {
            Ok(body) => (StatusCode::NOT_FOUND, Html(body)).into_response(),
            Err(err) => {
                tracing::error!(%err, "rendering not found page");
                (StatusCode::NOT_FOUND, "not found").into_response()
            }
        }
    }

    /// Converts a route's outcome into a response. Absent blogs and absent
    /// posts look the same to the client.
    fn respond(&self, result: Result<Response>) -> Response {
        let err = match result {
            Ok(response) => return response,
            Err(err) => err,
        };
        match err {
            Error::NotFound | Error::Post(_) => {
                tracing::debug!(%err, "not found");
                self.not_found()
            }
            Error::Store(_) | Error::Board(board::Error::Store(_) | board::Error::MissingBlog(_)) => {
                tracing::error!(%err, "store failure");
                self.not_found()
            }
            Error::Board(board::Error::InvalidPage { .. }) => {
                tracing::warn!(%err, "bad request");
                (StatusCode::BAD_REQUEST, err.to_string()).into_response()
            }
            Error::Feed(_) | Error::Render(_) => {
                tracing::error!(%err, "internal error");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal server error").into_response()
            }
        }
    }
}

enum Target {
    Blog(Context),
    Redirect(String),
}

fn redirect(url: &str) -> Response {
    (StatusCode::FOUND, [(header::LOCATION, url.to_owned())]).into_response()
}

/// The host a request was sent to, from the `Host` header or, failing that,
/// the request URI. Empty when neither is present.
pub struct RequestHost(pub String);

impl<S> FromRequestParts<S> for RequestHost
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> std::result::Result<Self, Self::Rejection> {
        let host = parts
            .headers
            .get(header::HOST)
            .and_then(|value| value.to_str().ok())
            .or_else(|| parts.uri.host())
            .unwrap_or_default();
        Ok(RequestHost(host.to_owned()))
    }
}

type Params = Query<HashMap<String, String>>;

fn preview(params: &HashMap<String, String>) -> bool {
    params.get("preview").is_some_and(|value| !value.is_empty())
}

async fn home_handler(State(app): State<Arc<App>>, RequestHost(host): RequestHost) -> Response {
    app.respond(app.home(&host))
}

async fn posts_handler(State(app): State<Arc<App>>, RequestHost(host): RequestHost) -> Response {
    app.respond(app.posts(&host))
}

async fn post_handler(
    State(app): State<Arc<App>>,
    RequestHost(host): RequestHost,
    Path(slug): Path<String>,
    Query(params): Params,
) -> Response {
    app.respond(app.post(&host, &slug, preview(&params)))
}

async fn feed_handler(State(app): State<Arc<App>>, RequestHost(host): RequestHost) -> Response {
    app.respond(app.feed(&host))
}

async fn board_handler(
    State(app): State<Arc<App>>,
    RequestHost(host): RequestHost,
    Query(params): Params,
) -> Response {
    app.respond(app.board(&host, params.get("page").map(String::as_str)))
}

async fn fallback_handler(State(app): State<Arc<App>>) -> Response {
    app.not_found()
}

/// Builds the router. Each route is also reachable with a trailing slash.
pub fn router(app: App) -> Router {
    Router::new()
        .route("/", get(home_handler))
        .route("/posts", get(posts_handler))
        .route("/posts/", get(posts_handler))
        .route("/feed", get(feed_handler))
        .route("/feed/", get(feed_handler))
        .route("/board", get(board_handler))
        .route("/board/", get(board_handler))
        .route("/{slug}", get(post_handler))
        .route("/{slug}/", get(post_handler))
        .fallback(fallback_handler)
        .layer(TraceLayer::new_for_http())
        .with_state(Arc::new(app))
}

/// Serves `app` on `listener` until Ctrl-C.
pub async fn serve(listener: TcpListener, app: App) -> std::io::Result<()> {
    tracing::info!(addr = %listener.local_addr()?, "listening");
    axum::serve(listener, router(app))
        .with_graceful_shutdown(shutdown_signal())
        .await
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(%err, "installing Ctrl-C handler");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}

/// The result of a fallible route.
pub type Result<T> = std::result::Result<T, Error>;

/// Represents the ways a route can fail. See [`App::respond`] for the status
/// each maps to.
#[derive(Debug, Error)]
pub enum Error {
    /// Returned when the host names no blog or the route isn't served there.
    #[error("not found")]
    NotFound,

    #[error(transparent)]
    Store(#[from] store::Error),

    #[error(transparent)]
    Post(#[from] post::Error),

    #[error(transparent)]
    Board(#[from] board::Error),

    #[error(transparent)]
    Feed(#[from] feed::Error),

    #[error(transparent)]
    Render(#[from] render::Error),
}
