use clap::{Parser, Subcommand};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::Method;
use serde_json::Value;

#[derive(Parser)]
#[command(name = "dispatch-cli")]
#[command(about = "Management CLI for the message dispatch service", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8081")]
    url: String,

    #[arg(short, long, env = "DISPATCH_ADMIN_KEY")]
    key: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check service status
    Status,
    /// Show queue counts
    Queue,
    /// Show the telemetry snapshot
    Telemetry {
        /// Window in milliseconds (defaults to the service's health window)
        #[arg(short, long)]
        window_ms: Option<u64>,
    },
    /// Show the health report
    Health,
    /// Look up a job by id
    Job { id: String },
    /// Stop handing jobs to workers
    Pause,
    /// Resume dispatching
    Resume,
    /// Subscribe a tenant's webhooks
    Subscribe { tenant: String },
    /// Remove a tenant's webhook subscription
    Unsubscribe { tenant: String },
    /// Check a tenant's webhook subscription
    Verify { tenant: String },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();

    let mut headers = HeaderMap::new();
    headers.insert(
        AUTHORIZATION,
        HeaderValue::from_str(&format!("Bearer {}", cli.key))?,
    );

    let (method, path) = match cli.command {
        Commands::Status => (Method::GET, "/admin/status".to_string()),
        Commands::Queue => (Method::GET, "/admin/queue".to_string()),
        Commands::Telemetry { window_ms } => match window_ms {
            Some(ms) => (Method::GET, format!("/admin/telemetry?window_ms={}", ms)),
            None => (Method::GET, "/admin/telemetry".to_string()),
        },
        Commands::Health => (Method::GET, "/admin/health".to_string()),
        Commands::Job { id } => (Method::GET, format!("/admin/jobs/{}", id)),
        Commands::Pause => (Method::POST, "/admin/queue/pause".to_string()),
        Commands::Resume => (Method::POST, "/admin/queue/resume".to_string()),
        Commands::Subscribe { tenant } => (Method::POST, format!("/admin/tenants/{}/subscription", tenant)),
        Commands::Unsubscribe { tenant } => (Method::DELETE, format!("/admin/tenants/{}/subscription", tenant)),
        Commands::Verify { tenant } => (Method::GET, format!("/admin/tenants/{}/subscription", tenant)),
    };

    let res = client
        .request(method, format!("{}{}", cli.url.trim_end_matches('/'), path))
        .headers(headers)
        .send()
        .await?;
    print_response(res).await?;

    Ok(())
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: Admin API returned status {}", status);
        if let Ok(text) = res.text().await {
            eprintln!("Response: {}", text);
        }
        return Ok(());
    }

    let json: Value = res.json().await?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
