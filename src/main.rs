use anyhow::{anyhow, Context as _, Result};
use clap::{Parser, Subcommand};
use hostblog::config::Config;
use hostblog::feed;
use hostblog::host::Resolution;
use hostblog::parser;
use hostblog::render::Theme;
use hostblog::server::{self, App};
use hostblog::store::{MemoryStore, PostFilter, Store};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "hostblog")]
#[command(about = "Serves many blogs from one process", long_about = None)]
struct Cli {
    /// Directory to start searching for `hostblog.yaml` from.
    #[arg(short, long, global = true, default_value = ".")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve every blog over HTTP
    Serve {
        /// Overrides `bind` from the config file
        #[arg(short, long)]
        bind: Option<SocketAddr>,
    },
    /// Load the config, data, and theme, then exit
    Check,
    /// Print the Atom feed for the blog a host resolves to
    Feed {
        #[arg(long)]
        host: String,
    },
}

fn load(dir: &Path) -> Result<(Config, MemoryStore)> {
    let config = Config::from_directory(dir)?;
    let store = parser::load(&config.data_directory)
        .with_context(|| format!("loading `{}`", config.data_directory.display()))?;
    Ok((config, store))
}

async fn serve(dir: &Path, bind: Option<SocketAddr>) -> Result<()> {
    let (config, store) = load(dir)?;
    let theme = Theme::load(&config.theme_directory)?;
    let app = App::new(
        config.resolver(),
        config.board(),
        Arc::new(store),
        Arc::new(theme),
    );
    let addr = bind.unwrap_or(config.bind);
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding `{}`", addr))?;
    server::serve(listener, app).await?;
    Ok(())
}

fn check(dir: &Path) -> Result<()> {
    let (config, store) = load(dir)?;
    Theme::load(&config.theme_directory)?;
    tracing::info!(
        blogs = store.blog_count(),
        posts = store.post_count(),
        upvotes = store.upvote_count(),
        "everything loaded"
    );
    Ok(())
}

fn print_feed(dir: &Path, host: &str) -> Result<()> {
    let (config, store) = load(dir)?;
    let ctx = match config.resolver().resolve(host, &store)? {
        Resolution::Tenant(ctx) => ctx,
        other => return Err(anyhow!("host `{}` names no blog: {:?}", host, other)),
    };
    let posts = store.posts_for_blog(&ctx.blog.subdomain, PostFilter::feed())?;
    println!("{}", feed::render_feed(&ctx.blog, &ctx.root, &posts)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "hostblog=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Serve { bind } => serve(&cli.config, bind).await,
        Commands::Check => check(&cli.config),
        Commands::Feed { host } => print_feed(&cli.config, &host),
    }
}
