use std::sync::Arc;

use clap::{Parser, Subcommand, ValueEnum};
use serde_json::Value;
use storefront_client::config::get_configuration;
use storefront_client::models::{LoginCredentials, RequestBody};
use storefront_client::observability::init_tracing;
use storefront_client::services::{ApiClient, RecordingNavigator};
use storefront_client::{open_credential_store, Backends};

#[derive(ValueEnum, Clone, Copy, Debug, Default)]
enum Backend {
    #[default]
    Primary,
    Legacy,
    Secondary,
}

#[derive(Parser, Debug)]
#[command(
    name = "storefront-client",
    about = "Call the storefront APIs with the stored credentials"
)]
struct Args {
    /// Backend to send the request to
    #[arg(short, long, value_enum, default_value = "primary")]
    backend: Backend,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// GET a path, with optional key=value query parameters
    Get {
        path: String,
        #[arg(short, long = "param", value_parser = parse_key_value)]
        params: Vec<(String, String)>,
    },
    /// DELETE a path
    Delete { path: String },
    /// POST a JSON body
    Post {
        path: String,
        #[arg(long)]
        body: Option<String>,
    },
    /// PUT a JSON body
    Put {
        path: String,
        #[arg(long)]
        body: Option<String>,
    },
    /// PATCH a JSON body
    Patch {
        path: String,
        #[arg(long)]
        body: Option<String>,
    },
    /// Sign in and store the access token
    Login {
        #[arg(long, env = "STOREFRONT_EMAIL")]
        email: String,
        #[arg(long, env = "STOREFRONT_PASSWORD")]
        password: String,
        #[arg(long)]
        remember_me: bool,
    },
    /// Sign out and forget the stored credentials
    Logout,
    /// Show the signed-in user
    Whoami,
}

fn parse_key_value(s: &str) -> Result<(String, String), String> {
    s.split_once('=')
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .ok_or_else(|| format!("Expected key=value, got '{}'", s))
}

fn parse_body(body: Option<String>) -> anyhow::Result<RequestBody> {
    match body {
        Some(raw) => {
            let value: Value = serde_json::from_str(&raw)
                .map_err(|e| anyhow::anyhow!("Body is not valid JSON: {}", e))?;
            Ok(RequestBody::Json(value))
        }
        None => Ok(RequestBody::Empty),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let configuration = get_configuration().map_err(|e| {
        eprintln!("Failed to read configuration: {}", e);
        anyhow::anyhow!("Configuration error: {}", e)
    })?;

    init_tracing(&configuration.log_level);

    let store = open_credential_store(&configuration)?;
    let navigator = Arc::new(RecordingNavigator::new());
    let backends = Backends::from_settings(&configuration, store, navigator.clone())?;

    let client: &ApiClient = match args.backend {
        Backend::Primary => &backends.primary,
        Backend::Legacy => &backends.legacy,
        Backend::Secondary => &backends.secondary,
    };

    let result: anyhow::Result<Value> = match args.command {
        Command::Get { path, params } => {
            let params: Vec<(&str, &str)> = params
                .iter()
                .map(|(k, v)| (k.as_str(), v.as_str()))
                .collect();
            client.get(&path, &params).await.map_err(Into::into)
        }
        Command::Delete { path } => client.delete(&path, &[]).await.map_err(Into::into),
        Command::Post { path, body } => client
            .post(&path, parse_body(body)?)
            .await
            .map_err(Into::into),
        Command::Put { path, body } => client
            .put(&path, parse_body(body)?)
            .await
            .map_err(Into::into),
        Command::Patch { path, body } => client
            .patch(&path, parse_body(body)?)
            .await
            .map_err(Into::into),
        Command::Login {
            email,
            password,
            remember_me,
        } => {
            let credentials = LoginCredentials {
                email,
                password,
                remember_me,
            };
            backends
                .auth
                .login(&credentials)
                .await
                .map(|login| serde_json::json!({ "user": login.user.map(|u| u.name) }))
                .map_err(Into::into)
        }
        Command::Logout => backends
            .auth
            .logout()
            .await
            .map(|_| Value::Null)
            .map_err(Into::into),
        Command::Whoami => match backends.auth.current_user() {
            Ok(user) => serde_json::to_value(user).map_err(anyhow::Error::from),
            Err(e) => Err(e.into()),
        },
    };

    if let Some(location) = navigator.last_location() {
        eprintln!("Session ended. Sign in again at {}", location);
    }

    let value = result?;
    println!("{}", serde_json::to_string_pretty(&value)?);
    Ok(())
}
