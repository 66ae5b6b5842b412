//! ScanVault CLI: upload files for malware scanning and follow their status.
//!
//! Set SCANVAULT_TOKEN and SCANVAULT_API_URL (or API_URL). Uses Bearer auth.

use anyhow::Context;
use clap::{Parser, Subcommand};
use scanvault_api_client::poller::poll_interval_from_env;
use scanvault_api_client::{ApiClient, ScanCheckResponse, StatusPoller};
use scanvault_cli::{
    init_tracing, render_analysis, render_check, render_history, render_record, render_stats,
};
use serde::Serialize;
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "scanvault", about = "ScanVault malware scanning CLI")]
struct Cli {
    /// Print raw JSON responses
    #[arg(long, global = true)]
    json: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Upload a file for scanning
    Upload {
        /// Path to the file to upload
        file: std::path::PathBuf,
        /// Keep polling until the scan finishes
        #[arg(long)]
        watch: bool,
    },
    /// Check a scan's current status once
    Status {
        /// Scan UUID
        id: Uuid,
        /// Expected vendor analysis id
        #[arg(long)]
        reference: Option<String>,
    },
    /// Poll a scan until it finishes
    Watch {
        /// Scan UUID
        id: Uuid,
        /// Seconds between checks (defaults to SCANVAULT_POLL_INTERVAL_SECS or 5)
        #[arg(long)]
        interval: Option<u64>,
    },
    /// List past scans, newest first
    History {
        #[arg(long)]
        page: Option<u32>,
        #[arg(long)]
        per_page: Option<u32>,
    },
    /// Show a scan record with its vendor analysis
    Details {
        /// Scan UUID
        id: Uuid,
    },
    /// Dashboard statistics
    Stats,
    /// Register the current session user
    Register {
        /// Display name
        #[arg(long)]
        name: Option<String>,
    },
}

fn print_json(value: &impl Serialize) -> anyhow::Result<()> {
    let out = serde_json::to_string_pretty(value).context("Serialize response")?;
    println!("{}", out);
    Ok(())
}

async fn watch_scan(
    client: &ApiClient,
    scan_id: Uuid,
    interval: std::time::Duration,
    json: bool,
) -> anyhow::Result<ScanCheckResponse> {
    let handle = StatusPoller::start(client.clone(), scan_id, interval);
    let mut updates = handle.subscribe();

    let progress = async {
        let mut last = None;
        while updates.changed().await.is_ok() {
            let status = updates.borrow_and_update().as_ref().map(|r| r.status);
            if status != last && !json {
                if let Some(status) = status {
                    eprintln!("{}: {}", scan_id, scanvault_cli::describe_status(status));
                }
                last = status;
            }
        }
        // Closed channel: the terminal value is still waiting in `wait_terminal`.
        std::future::pending::<()>().await
    };

    let terminal = tokio::select! {
        result = handle.wait_terminal() => result,
        _ = progress => None,
        _ = tokio::signal::ctrl_c() => None,
    };

    terminal.ok_or_else(|| anyhow::anyhow!("Stopped watching scan {} before it finished", scan_id))
}

fn print_check(scan_id: Uuid, check: &ScanCheckResponse, json: bool) -> anyhow::Result<()> {
    if json {
        print_json(check)
    } else {
        print!("{}", render_check(&scan_id.to_string(), check));
        Ok(())
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    dotenvy::dotenv().ok();

    let client = ApiClient::from_env()
        .context("Failed to create API client. Set SCANVAULT_TOKEN and SCANVAULT_API_URL (or API_URL)")?;

    let cli = Cli::parse();
    let json = cli.json;

    match cli.command {
        Commands::Upload { file, watch } => {
            let path = file.to_string_lossy();
            let response = client.upload_file(&path).await?;
            if json {
                print_json(&response)?;
            } else {
                println!("Scan {} created: {}", response.scan_id, response.status);
            }
            if watch {
                let check =
                    watch_scan(&client, response.scan_id, poll_interval_from_env(), json).await?;
                print_check(response.scan_id, &check, json)?;
            }
        }
        Commands::Status { id, reference } => {
            let check = client.check_scan(id, reference.as_deref()).await?;
            print_check(id, &check, json)?;
        }
        Commands::Watch { id, interval } => {
            let interval = interval
                .filter(|s| *s > 0)
                .map(std::time::Duration::from_secs)
                .unwrap_or_else(poll_interval_from_env);
            let check = watch_scan(&client, id, interval, json).await?;
            print_check(id, &check, json)?;
        }
        Commands::History { page, per_page } => {
            let history = client.list_scans(page, per_page).await?;
            if json {
                print_json(&history)?;
            } else {
                print!("{}", render_history(&history));
            }
        }
        Commands::Details { id } => {
            let details = client.scan_details(id).await?;
            if json {
                print_json(&details)?;
            } else {
                println!("{}", render_record(&details.scan));
                match &details.analysis {
                    Some(analysis) => print!("{}", render_analysis(analysis)),
                    None => println!("No analysis available."),
                }
            }
        }
        Commands::Stats => {
            let stats = client.stats().await?;
            if json {
                print_json(&stats)?;
            } else {
                print!("{}", render_stats(&stats));
            }
        }
        Commands::Register { name } => {
            let user = client.upsert_me(name).await?;
            if json {
                print_json(&user)?;
            } else {
                println!("Registered {} ({})", user.email, user.id);
            }
        }
    }

    Ok(())
}
