//! Fetch a single commit from a repository using the Github API.
//!
//! ```sh
//! GITHUB_AUTH_TOKEN=... cargo run -p octocat --example fetch-commit -- mozilla kitsune main
//! ```

use api_client::Secret;
use eyre::Context as _;
use octocat::{GithubClient, GithubConfig};

#[tokio::main]
async fn main() -> eyre::Result<()> {
    tracing_subscriber::fmt::init();

    let mut args = std::env::args().skip(1);
    let (Some(owner), Some(repo), Some(sha)) = (args.next(), args.next(), args.next()) else {
        eyre::bail!("usage: fetch-commit <owner> <repo> <sha>");
    };

    let config = GithubConfig {
        token: Secret::from_env_opt("GITHUB_AUTH_TOKEN"),
        ..Default::default()
    };

    let client = GithubClient::new(&config)?;
    let commit = client
        .commit(&owner, &repo, &sha)
        .await
        .wrap_err_with(|| format!("fetching {owner}/{repo}@{sha}"))?;

    println!("{}", serde_json::to_string_pretty(&commit)?);

    Ok(())
}
