use anyhow::{bail, Context, Result};
use calc_models::{HealthReport, JsonRpcResponse};
use clap::{Parser, Subcommand};
use reqwest::Client;
use serde_json::{json, Value};
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "calc-cli")]
#[command(about = "CLI client for the Calculator MCP Server")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(long, env = "CALC_ENDPOINT", default_value = "http://localhost:8080")]
    endpoint: String,
}

#[derive(Subcommand)]
enum Commands {
    /// List the available tools
    Tools,
    /// Call a tool
    Call {
        /// Tool name
        name: String,
        /// Tool arguments (JSON object)
        #[arg(long, default_value = "{}")]
        args: String,
    },
    /// Evaluate a natural-language expression
    Eval {
        /// Expression, e.g. "what is 5 plus 3"
        #[arg(required = true, num_args = 1..)]
        expression: Vec<String>,
    },
    /// Check server health
    Health,
    /// Show connected SSE clients
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let client = Client::new();

    match cli.command {
        Commands::Tools => list_tools(&client, &cli.endpoint).await,
        Commands::Call { name, args } => {
            let arguments: Value =
                serde_json::from_str(&args).context("--args must be valid JSON")?;
            call_tool(&client, &cli.endpoint, &name, arguments).await
        }
        Commands::Eval { expression } => {
            let expression = expression.join(" ");
            call_tool(
                &client,
                &cli.endpoint,
                "parse_expression",
                json!({ "expression": expression }),
            )
            .await
        }
        Commands::Health => health(&client, &cli.endpoint).await,
        Commands::Status => sse_status(&client, &cli.endpoint).await,
    }
}

async fn rpc(client: &Client, endpoint: &str, method: &str, params: Value) -> Result<Value> {
    let request = json!({
        "jsonrpc": "2.0",
        "method": method,
        "params": params,
        "id": uuid::Uuid::new_v4().to_string(),
    });

    let response = client
        .post(format!("{endpoint}/mcp"))
        .json(&request)
        .send()
        .await?;
    let status = response.status();
    let body: JsonRpcResponse = response
        .json()
        .await
        .with_context(|| format!("unexpected response to {method} (HTTP {status})"))?;

    match (body.result, body.error) {
        (Some(result), None) => Ok(result),
        (_, Some(e)) => {
            error!("{} failed with code {}", method, e.code);
            bail!("{} (code {})", e.message, e.code)
        }
        (None, None) => bail!("empty response to {method}"),
    }
}

async fn list_tools(client: &Client, endpoint: &str) -> Result<()> {
    info!("Listing tools");

    let result = rpc(client, endpoint, "tools/list", json!({})).await?;
    println!("🧮 Tools:");
    for tool in result["tools"].as_array().into_iter().flatten() {
        println!(
            "   • {} - {}",
            tool["name"].as_str().unwrap_or("?"),
            tool["description"].as_str().unwrap_or("")
        );
    }

    Ok(())
}

async fn call_tool(client: &Client, endpoint: &str, name: &str, arguments: Value) -> Result<()> {
    info!("Calling tool: {}", name);

    let result = rpc(
        client,
        endpoint,
        "tools/call",
        json!({ "name": name, "arguments": arguments }),
    )
    .await?;

    if let Some(value) = result.get("result") {
        println!("✅ {value}");
    } else if let Some(message) = result.get("error").and_then(Value::as_str) {
        bail!("{name}: {message}");
    } else {
        println!("{result}");
    }

    Ok(())
}

async fn health(client: &Client, endpoint: &str) -> Result<()> {
    let response = client.get(format!("{endpoint}/health")).send().await?;

    if !response.status().is_success() {
        let error_text = response.text().await?;
        error!("Health check failed: {}", error_text);
        bail!(error_text);
    }

    let report: HealthReport = response.json().await?;
    println!("💚 {} {}: {}", report.server, report.version, report.status);
    println!("   Calculator engine: {}", report.services.calculator_engine);
    println!("   MCP protocol: {}", report.services.mcp_protocol);
    println!("   SSE transport: {}", report.services.sse_transport);

    Ok(())
}

async fn sse_status(client: &Client, endpoint: &str) -> Result<()> {
    let response = client.get(format!("{endpoint}/sse/status")).send().await?;

    if !response.status().is_success() {
        let error_text = response.text().await?;
        error!("Failed to get SSE status: {}", error_text);
        bail!(error_text);
    }

    let status: Value = response.json().await?;
    println!("📡 Active connections: {}", status["active_connections"]);
    for client_id in status["connected_clients"].as_array().into_iter().flatten() {
        println!("   • {}", client_id.as_str().unwrap_or("?"));
    }

    Ok(())
}
