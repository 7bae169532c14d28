use clap::{Parser, Subcommand};
use std::io::{Read, Write};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use secure_media::models::{MediaConfig, SECRET_ENV};

#[derive(Parser)]
#[command(name = "secure-media")]
#[command(about = "Sign media URLs for the Nginx secure_link module")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the signed form of a single URL or path
    Sign {
        /// URL or path under the uploads directory
        url: String,

        /// Unix time to sign for (defaults to now)
        #[arg(long)]
        now: Option<i64>,
    },
    /// Sign every media link in a document
    Filter {
        /// Input file (defaults to stdin)
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Output file (defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Unix time to sign for (defaults to now)
        #[arg(long)]
        now: Option<i64>,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr so filtered documents on stdout stay clean
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "secure_media=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = MediaConfig::load()?;

    match cli.command {
        Some(Commands::Sign { url, now }) => run_sign_command(&config, &url, now),
        Some(Commands::Filter { input, output, now }) => {
            run_filter_command(&config, input, output, now)
        }
        None => {
            run_status_command(&config);
            Ok(())
        }
    }
}

fn now_or(now: Option<i64>) -> i64 {
    now.unwrap_or_else(|| chrono::Utc::now().timestamp())
}

/// Sign a single URL and print it
fn run_sign_command(config: &MediaConfig, url: &str, now: Option<i64>) -> anyhow::Result<()> {
    let signer = config.signer()?;
    let signed = signer
        .sign_url(url, now_or(now))
        .map_err(|e| anyhow::anyhow!("Cannot sign {url}: {e}"))?;
    println!("{signed}");
    Ok(())
}

/// Rewrite media links in a document
fn run_filter_command(
    config: &MediaConfig,
    input: Option<PathBuf>,
    output: Option<PathBuf>,
    now: Option<i64>,
) -> anyhow::Result<()> {
    let content = match &input {
        Some(path) => std::fs::read(path)?,
        None => {
            let mut buf = Vec::new();
            std::io::stdin().read_to_end(&mut buf)?;
            buf
        }
    };

    let rewritten = match config.signer() {
        Ok(signer) => signer.rewrite_bytes(&content, now_or(now)).into_owned(),
        Err(e) => {
            tracing::warn!(%e, "Secure media setup is incomplete, passing document through");
            content
        }
    };

    match &output {
        Some(path) => std::fs::write(path, rewritten)?,
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(&rewritten)?;
            stdout.flush()?;
        }
    }

    Ok(())
}

/// Display status and configuration information
fn run_status_command(config: &MediaConfig) {
    const VERSION: &str = env!("CARGO_PKG_VERSION");

    println!("Secure Media v{VERSION}");
    println!("Signs media URLs for the Nginx secure_link module\n");

    println!("Configuration:");
    println!(
        "  CONFIG_FILE  = {}",
        std::env::var("CONFIG_FILE").unwrap_or_else(|_| "(not set)".to_string())
    );
    println!(
        "  secret       = {}",
        if config.has_secret() {
            "<redacted>"
        } else {
            "(not set)"
        }
    );
    println!("  expiry       = {}s", config.effective_expiry());
    println!("  base_url     = {}", config.base_url);
    println!("  site_prefix  = {}", config.site_url());
    println!("  uploads_path = {}", config.uploads_path());

    if !config.has_secret() {
        println!(
            "\nSetup will not be complete until {SECRET_ENV} is defined. \
             Media links are served unsigned until then."
        );
    }

    println!("\nCommands:");
    println!("  secure-media sign <url>   Print a signed URL");
    println!("  secure-media filter       Sign media links in a document");
    println!("\nRun 'secure-media --help' for more details.");
}
