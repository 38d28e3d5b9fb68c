//! The `whatsdeployed` service and command line tool.

use api_client::ApiClient;
use camino::Utf8PathBuf;
use clap::{Parser, Subcommand};
use eyre::{Context as _, Result};
use http::Uri;
use octocat::GithubClient;
use tracing_subscriber::EnvFilter;
use whatsdeployed::badge::Badge;
use whatsdeployed::history::History;
use whatsdeployed::server::App;
use whatsdeployed::shortlink::{LongUrl, ShortLinks};
use whatsdeployed::source::{GithubSource, HttpRevisionFetcher};
use whatsdeployed::{Config, DeployRequest, Deployer, Scope};

#[derive(Debug, Parser)]
#[command(name = "whatsdeployed", version, about = "What's deployed where?")]
struct Cli {
    /// TOML configuration file.
    #[arg(short, long, env = "WHATSDEPLOYED_CONFIG", global = true)]
    config: Option<Utf8PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the HTTP service.
    Serve,

    /// Show which commits are deployed where.
    Show {
        /// A long URL (`/?owner=...&repo=...&name[]=...&url[]=...`) or a short link.
        view: String,

        /// Only show merge bot commits.
        #[arg(long)]
        bors: bool,

        /// Print the full report as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Create a short link for a long URL.
    Shorten {
        /// The long URL.
        url: String,
    },

    /// Print the long URL behind a short link.
    Lengthen {
        /// Short code, with or without `/s-`.
        code: String,
    },

    /// List recently used short links.
    History,
}

fn is_long_url(view: &str) -> bool {
    view.contains('=')
}

async fn target(links: &ShortLinks, view: &str) -> Result<LongUrl> {
    if is_long_url(view) {
        return Ok(LongUrl::parse(view)?);
    }
    match links.lengthen(view).await? {
        Some(link) => Ok(link.target),
        None => eyre::bail!("no short link {view:?}"),
    }
}

async fn serve(config: &Config) -> Result<()> {
    let app = App::from_config(config).wrap_err("building service")?;
    let addr = config.server.addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .wrap_err_with(|| format!("binding {addr}"))?;

    tracing::info!("whatsdeployed listening on http://{addr}");
    axum::serve(listener, app.router())
        .with_graceful_shutdown(async {
            if let Err(error) = tokio::signal::ctrl_c().await {
                tracing::error!(%error, "unable to listen for shutdown");
            }
            tracing::info!("shutting down");
        })
        .await?;
    Ok(())
}

async fn show(
    config: &Config,
    links: &ShortLinks,
    view: &str,
    bors: bool,
    json: bool,
) -> Result<()> {
    let target = target(links, view).await?;

    let github = GithubClient::new(&config.github)?;
    let revisions = HttpRevisionFetcher::new(
        ApiClient::new(Uri::from_static("http://localhost/"), ()).with_timeout(config.github.timeout()),
    );
    let deployer = Deployer::github(GithubSource::new(github), revisions);

    let mut request = DeployRequest::new(target.repository, target.deployments);
    request.per_page = config.per_page;
    request.bors_mode = bors;

    let scope = Scope::new();
    let report = deployer
        .load(&scope, &request)
        .await
        .wrap_err_with(|| format!("loading {}", request.repository))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    print!("{}", report.table);
    println!();
    print!("{}", report.summary);
    for group in &report.culprits {
        if group.culprits.is_empty() {
            continue;
        }
        println!();
        println!("Waiting for {}:", group.name);
        for culprit in &group.culprits {
            println!("  {} ({})", culprit.person.login, culprit.label());
        }
        for link in &group.links {
            println!("  via {link}");
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref()).wrap_err("loading configuration")?;
    let storage = config.storage.build();
    let links = ShortLinks::new(&storage);
    let history = History::new(&storage);

    match cli.command {
        Command::Serve => serve(&config).await?,
        Command::Show { view, bors, json } => show(&config, &links, &view, bors, json).await?,
        Command::Shorten { url } => {
            let target = LongUrl::parse(&url)?;
            let link = links.shorten(&target).await?;
            history.add(&link.path()).await?;

            let base = config.server.public_url.as_deref().unwrap_or_default();
            let badge = Badge::new(
                target.deployments.iter().map(|d| d.name.as_str()),
                format!("{}{}", base.trim_end_matches('/'), link.path()),
            );
            println!("{}", link.path());
            println!();
            println!("{}", badge.markdown());
            println!();
            println!("{}", badge.restructured_text());
        }
        Command::Lengthen { code } => match links.lengthen(&code).await? {
            Some(link) => {
                history.add(&link.path()).await?;
                println!("{}", link.long_url());
            }
            None => eyre::bail!("no short link {code:?}"),
        },
        Command::History => {
            let entries = history.entries().await?;
            for link in links.shortened(&entries.join(",")).await? {
                let names: Vec<_> = link
                    .target
                    .deployments
                    .iter()
                    .map(|d| d.name.as_str())
                    .collect();
                println!("{}  {}  {}", link.path(), link.target.repository, names.join(", "));
            }
        }
    }

    Ok(())
}
