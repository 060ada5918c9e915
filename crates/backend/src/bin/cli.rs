use anyhow::Context;
use clap::{Parser, Subcommand};
use reqwest::{
    header::{self, HeaderMap},
    Client, Response,
};
use serde::Deserialize;
use shared_types::{Credentials, PublicSession};

#[derive(Parser)]
#[command(name = "session-cli")]
#[command(about = "CLI for signing in and inspecting sessions via the session gateway")]
#[command(
    long_about = "A command-line interface for the session gateway.\n\n\
    Signs in with a username and password, prints the issued session token,\n\
    and shows the public session a token resolves to."
)]
struct Cli {
    /// Gateway URL to connect to.
    ///
    /// The CLI will make HTTP requests to this server's auth endpoints.
    #[arg(
        short,
        long,
        default_value = "http://localhost:3000",
        env = "SESSION_GATEWAY_URL"
    )]
    base_url: String,

    /// Name of the session cookie set by the gateway.
    #[arg(long, default_value = "session_token", env = "SESSION_COOKIE_NAME")]
    cookie_name: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign in and print the session token
    ///
    /// Posts the credentials to the gateway, which verifies them against the
    /// backend login service. On success the session token is printed on the
    /// first line, followed by the public session.
    Login {
        /// Username (tenant name) to sign in with.
        #[arg(short, long)]
        username: String,

        /// Password for the username.
        #[arg(short, long, env = "SESSION_PASSWORD")]
        password: String,
    },

    /// Show the public session for a token
    ///
    /// Prints "No active session." when the token is invalid or expired.
    Session {
        /// Session token as printed by 'login'.
        #[arg(short, long, env = "SESSION_TOKEN")]
        token: String,
    },
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
    details: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let client = Client::new();
    let base_url = cli.base_url.trim_end_matches('/');

    match cli.command {
        Commands::Login { username, password } => {
            let response = client
                .post(format!("{}/api/auth/login", base_url))
                .json(&Credentials::new(username, password))
                .send()
                .await
                .context("Failed to reach the session gateway")?;

            let token = session_token(response.headers(), &cli.cookie_name);
            let session: PublicSession = read_json(response).await?;
            let token = token.context("Gateway did not set a session cookie")?;

            println!("{}", token);
            print_session(&session)?;
        }
        Commands::Session { token } => {
            let response = client
                .get(format!("{}/api/auth/session", base_url))
                .header(header::COOKIE, format!("{}={}", cli.cookie_name, token))
                .send()
                .await
                .context("Failed to reach the session gateway")?;

            let body: serde_json::Value = read_json(response).await?;
            if body.get("user").is_none() {
                println!("No active session.");
            } else {
                let session: PublicSession =
                    serde_json::from_value(body).context("Invalid session response")?;
                print_session(&session)?;
            }
        }
    }

    Ok(())
}

async fn read_json<T: serde::de::DeserializeOwned>(response: Response) -> anyhow::Result<T> {
    let status = response.status();
    if !status.is_success() {
        let body: ErrorBody = response
            .json()
            .await
            .with_context(|| format!("Gateway returned {}", status))?;
        match body.details {
            Some(details) => anyhow::bail!("{} ({})", body.error, details),
            None => anyhow::bail!("{}", body.error),
        }
    }
    response.json().await.context("Invalid gateway response")
}

fn session_token(headers: &HeaderMap, cookie_name: &str) -> Option<String> {
    headers
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .filter_map(|value| cookie::Cookie::parse(value.to_string()).ok())
        .find(|cookie| cookie.name() == cookie_name && !cookie.value().is_empty())
        .map(|cookie| cookie.value().to_string())
}

fn print_session(session: &PublicSession) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(session)?);
    Ok(())
}
