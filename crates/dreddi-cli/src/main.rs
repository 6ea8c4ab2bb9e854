//! Command-line client for creating a promise against a running gateway.
//!
//! Usage:
//!   dreddi --title "Return the drill" --counterparty @kim --due-at 2030-01-01T10:00:00Z
//!
//! Environment variables:
//!   DREDDI_BASE_URL - gateway base URL (default: http://localhost:3000)
//!   SUPABASE_ACCESS_TOKEN - access token of the signed-in user

use anyhow::{Context, Result};
use clap::Parser;
use dreddi_platform::CreatePromiseRequest;
use serde_json::Value;
use tracing::{debug, info};

#[derive(Parser, Debug)]
#[command(name = "dreddi")]
#[command(about = "Create a promise and print the invite link")]
#[command(version)]
struct Args {
    /// What is being promised
    #[arg(long)]
    title: String,

    /// Counterparty email or @handle
    #[arg(long)]
    counterparty: String,

    #[arg(long)]
    details: Option<String>,

    /// RFC 3339 deadline, e.g. 2030-01-01T10:00:00Z
    #[arg(long)]
    due_at: Option<String>,

    /// Who keeps the promise: me or counterparty
    #[arg(long)]
    executor: Option<String>,

    /// private or public
    #[arg(long)]
    visibility: Option<String>,

    /// Makes the promise conditional on this text
    #[arg(long)]
    condition: Option<String>,

    /// Gateway base URL
    #[arg(long, env = "DREDDI_BASE_URL", default_value = "http://localhost:3000")]
    base_url: String,

    /// Access token of the signed-in user
    #[arg(long, env = "SUPABASE_ACCESS_TOKEN", hide_env_values = true)]
    token: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(std::env::var("RUST_LOG").unwrap_or_else(|_| "dreddi=warn".to_string()))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let created = create_promise(&args).await?;
    println!("{}", serde_json::to_string_pretty(&created)?);

    Ok(())
}

fn build_request(args: &Args) -> CreatePromiseRequest {
    CreatePromiseRequest {
        title: args.title.clone(),
        details: args.details.clone(),
        counterparty_contact: args.counterparty.clone(),
        due_at: args.due_at.clone(),
        executor: args.executor.clone(),
        visibility: args.visibility.clone(),
        condition: args.condition.clone(),
    }
}

fn create_endpoint(base_url: &str) -> String {
    format!("{}/api/promises/create", base_url.trim_end_matches('/'))
}

async fn create_promise(args: &Args) -> Result<Value> {
    let endpoint = create_endpoint(&args.base_url);
    debug!(%endpoint, "creating promise");

    let response = reqwest::Client::new()
        .post(&endpoint)
        .bearer_auth(&args.token)
        .json(&build_request(args))
        .send()
        .await
        .with_context(|| format!("failed to reach {endpoint}"))?;

    let status = response.status();
    let raw = response
        .text()
        .await
        .context("failed to read gateway response")?;

    if !status.is_success() {
        let message = serde_json::from_str::<Value>(&raw)
            .map(|body| error_message(&body))
            .unwrap_or(raw);
        anyhow::bail!("create failed ({status}): {message}");
    }

    let body: Value = serde_json::from_str(&raw).context("gateway returned a non-JSON body")?;

    info!(invite_url = ?body.get("inviteUrl"), "promise created");
    Ok(body)
}

fn error_message(body: &Value) -> String {
    body.get("error")
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| body.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(extra: &[&str]) -> Args {
        let mut argv = vec![
            "dreddi",
            "--title",
            "Return the drill",
            "--counterparty",
            "@kim",
            "--base-url",
            "http://gateway.test/",
            "--token",
            "abc",
        ];
        argv.extend_from_slice(extra);
        Args::try_parse_from(argv).expect("args")
    }

    #[test]
    fn optional_fields_stay_unset() {
        let request = build_request(&parse(&[]));
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({
                "title": "Return the drill",
                "details": null,
                "counterpartyContact": "@kim",
                "dueAt": null,
                "executor": null,
                "visibility": null,
            })
        );
    }

    #[test]
    fn flags_map_onto_request_fields() {
        let request = build_request(&parse(&[
            "--due-at",
            "2030-01-01T10:00:00Z",
            "--executor",
            "counterparty",
            "--visibility",
            "public",
            "--condition",
            "If it rains",
        ]));
        assert_eq!(request.due_at.as_deref(), Some("2030-01-01T10:00:00Z"));
        assert_eq!(request.executor.as_deref(), Some("counterparty"));
        assert_eq!(request.visibility.as_deref(), Some("public"));
        assert_eq!(request.condition.as_deref(), Some("If it rains"));
    }

    #[test]
    fn title_and_counterparty_are_required() {
        assert!(Args::try_parse_from(["dreddi", "--token", "abc", "--title", "x"]).is_err());
        assert!(Args::try_parse_from(["dreddi", "--token", "abc", "--counterparty", "@kim"]).is_err());
    }

    #[test]
    fn endpoint_ignores_trailing_slash() {
        assert_eq!(
            create_endpoint(&parse(&[]).base_url),
            "http://gateway.test/api/promises/create"
        );
    }

    #[test]
    fn error_message_prefers_error_field() {
        assert_eq!(error_message(&json!({ "error": "title is required" })), "title is required");
        assert_eq!(error_message(&json!({ "detail": 1 })), "{\"detail\":1}");
    }
}
