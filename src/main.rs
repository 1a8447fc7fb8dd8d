use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use mirrorkeep::reconcile::ReconcileOutcome;
use mirrorkeep::{Config, Daemon, GitHubLister, HealthCheck, RepositoryLister, SyncEngine};

#[derive(Parser)]
#[command(name = "mirrorkeep")]
#[command(about = "Git repository mirror backup daemon")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Configuration file path (defaults to XDG config location)
    #[arg(short, long)]
    config: Option<std::path::PathBuf>,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the mirror daemon in the foreground (the default)
    Run,

    /// Run a single reconciliation pass and exit
    Sync,

    /// List the remote repositories of every configured account
    List,

    /// System health check and diagnostics
    Doctor,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = load_config(cli.config)?;

    init_logging(cli.verbose, &config.logging.level)?;
    info!("Starting MirrorKeep v{}", env!("CARGO_PKG_VERSION"));

    match cli.command {
        None | Some(Commands::Run) => cmd_run(config).await,
        Some(Commands::Sync) => cmd_sync(config).await,
        Some(Commands::List) => cmd_list(&config).await,
        Some(Commands::Doctor) => cmd_doctor(&config),
    }
}

/// Initialize logging based on verbosity level and configured default
fn init_logging(verbose: bool, config_level: &str) -> Result<()> {
    let default_level = if verbose { "debug" } else { config_level };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level.to_string()));

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    Ok(())
}

/// Load configuration from specified path or default location
fn load_config(config_path: Option<std::path::PathBuf>) -> Result<Config> {
    match config_path {
        Some(path) => Config::load(&path),
        None => {
            let default_path = Config::default_config_path()?;
            let first_run = !default_path.exists();

            let config = Config::load_or_default()?;

            // Printed here rather than logged: the subscriber is not
            // installed until after the config is loaded
            if first_run {
                println!(
                    "Created default configuration at {}",
                    default_path.display()
                );
            }

            Ok(config)
        }
    }
}

/// Run the daemon: immediate pass at startup, then on the schedule, forever
async fn cmd_run(config: Config) -> Result<()> {
    let health = HealthCheck::run(&config);
    if !health.all_passed() {
        print_health_report(&health);
        println!();
        println!("❌ Cannot start daemon - fix the errors above first");
        std::process::exit(1);
    }

    for warning in health.warnings() {
        println!("⚠️  {}", warning.message);
        if let Some(details) = &warning.details {
            println!("   {}", details);
        }
    }

    let daemon = Daemon::new(config)?;
    daemon.run().await
}

/// Run a single reconciliation pass
async fn cmd_sync(config: Config) -> Result<()> {
    let engine = SyncEngine::new(config)?;

    println!(
        "🔄 Reconciling mirrors for {} account(s)",
        engine.accounts().len()
    );

    let summary = engine.run_all().await;

    println!("\n🎉 Reconciliation Complete!");
    println!("   📊 Total repositories: {}", summary.total_repositories);
    println!("   📥 Created: {}", summary.created);
    println!("   🔄 Refreshed: {}", summary.refreshed);
    println!("   ✅ Up to date: {}", summary.up_to_date);
    println!("   ❌ Failed: {}", summary.failed);
    println!("   ⏱️  Duration: {:.2}s", summary.duration.as_secs_f64());

    if !summary.listing_failures.is_empty() {
        println!("\n⚠️  Accounts skipped:");
        for failure in &summary.listing_failures {
            println!("   ❌ {}: {:#}", failure.account(), failure);
        }
    }

    if summary.failed > 0 {
        println!("\n🔍 Failed repositories:");
        for result in &summary.results {
            if let ReconcileOutcome::Failed(error) = &result.outcome {
                println!("   ❌ {}: {:#}", result.full_name, error);
            }
        }
    }

    Ok(())
}

/// List remote repositories per configured account
async fn cmd_list(config: &Config) -> Result<()> {
    let accounts = config.accounts()?;
    let lister = GitHubLister::new();

    for account in &accounts {
        match lister.list_repositories(account).await {
            Ok(repositories) => {
                println!("📁 {} ({} repositories):", account.username, repositories.len());
                for repo in repositories {
                    println!("   {}", repo.full_name);
                }
            }
            Err(e) => {
                println!("❌ {}: {:#}", account.username, e);
            }
        }
        println!();
    }

    Ok(())
}

/// System health check and diagnostics
fn cmd_doctor(config: &Config) -> Result<()> {
    let health = HealthCheck::run(config);
    print_health_report(&health);
    Ok(())
}

/// Print health check report to stdout
fn print_health_report(health: &HealthCheck) {
    use mirrorkeep::health::CheckResult;

    fn print_check(name: &str, result: &CheckResult) {
        println!("{}:", name);
        let icon = if result.passed {
            if result.is_warning {
                "⚠️ "
            } else {
                "✅"
            }
        } else {
            "❌"
        };
        println!("  {} {}", icon, result.message);
        if let Some(details) = &result.details {
            for line in details.lines() {
                println!("     {}", line);
            }
        }
    }

    println!("🔍 MirrorKeep System Diagnostics");
    println!();

    for (name, result) in health.all_checks() {
        print_check(name, result);
        println!();
    }

    if health.all_passed() {
        println!("✅ All checks passed");
    } else {
        println!("❌ Some checks failed");
    }
}
