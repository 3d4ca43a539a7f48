//! refbridge command-line host
//!
//! Serves one bridge session over standard input and the configured reply
//! stream until the counterpart closes its end.

use std::fs::File;
use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::Context;
use clap::{Parser, Subcommand};
use refbridge_runtime::config::REPLIES_ENV;
use refbridge_runtime::{serve, BridgeConfig, ReplyStream, Session};
use refbridge_stdlib::{register_builtin, ModuleRegistry};
use tokio::io::{AsyncWrite, BufReader};
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Environment variable holding a log filter directive
const LOG_ENV: &str = "REFBRIDGE_LOG";

#[derive(Parser, Debug)]
#[command(name = "refbridge")]
#[command(about = "Serve live values over line-delimited JSON", long_about = None)]
#[command(version)]
struct Cli {
    /// Stream carrying replies and notifications [env: REFBRIDGE_REPLIES]
    #[arg(long, value_name = "STREAM", global = true)]
    replies: Option<ReplyStream>,

    /// Log filter directive, e.g. "refbridge_runtime=debug"
    #[arg(long, value_name = "FILTER", global = true)]
    log: Option<String>,

    /// Write logs to a file instead of the non-reply stream
    #[arg(long, value_name = "PATH", global = true)]
    log_file: Option<PathBuf>,

    /// Log at debug level
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Built-in module to expose (repeatable; default: all)
    #[arg(long = "module", value_name = "NAME", global = true)]
    modules: Vec<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
enum Commands {
    /// Serve a session over stdin and the reply stream (default)
    Serve,

    /// List the modules `require` can load
    Modules,
}

impl Cli {
    fn config(&self) -> anyhow::Result<BridgeConfig> {
        let mut config = BridgeConfig::from_env()
            .map_err(anyhow::Error::msg)
            .with_context(|| format!("invalid {}", REPLIES_ENV))?;
        if let Some(stream) = self.replies {
            config = config.with_reply_stream(stream);
        }
        if !self.modules.is_empty() {
            config = config.with_modules(self.modules.iter().cloned());
        }
        Ok(config)
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = cli.config()?;

    match cli.command.as_ref().unwrap_or(&Commands::Serve) {
        Commands::Serve => {
            init_logging(&cli, config.reply_stream)?;
            run(config)
        }
        Commands::Modules => {
            let mut registry = ModuleRegistry::new();
            for name in &config.modules {
                if !register_builtin(&mut registry, name) {
                    eprintln!("unknown module: {}", name);
                }
            }
            for name in registry.names() {
                println!("{}", name);
            }
            Ok(())
        }
    }
}

fn run(config: BridgeConfig) -> anyhow::Result<()> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to start the async runtime")?;

    runtime.block_on(async move {
        let output: Box<dyn AsyncWrite + Unpin + Send> = match config.reply_stream {
            ReplyStream::Stdout => Box::new(tokio::io::stdout()),
            ReplyStream::Stderr => Box::new(tokio::io::stderr()),
        };
        let session = Session::new(config);
        serve(session, BufReader::new(tokio::io::stdin()), output)
            .await
            .context("serving failed")?;
        tracing::info!("session ended");
        Ok(())
    })
}

// ============================================================================
// Logging
// ============================================================================

fn init_logging(cli: &Cli, replies: ReplyStream) -> anyhow::Result<()> {
    let directive = filter_directive(
        cli.log.as_deref(),
        std::env::var(LOG_ENV).ok(),
        std::env::var("DEBUG").ok(),
        cli.verbose,
    );
    let filter = EnvFilter::try_new(&directive)
        .with_context(|| format!("invalid log filter '{}'", directive))?;

    let writer = match &cli.log_file {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("cannot open log file {}", path.display()))?;
            BoxMakeWriter::new(Mutex::new(file))
        }
        // Logs take whichever stream replies leave free
        None => match replies {
            ReplyStream::Stdout => BoxMakeWriter::new(std::io::stderr),
            ReplyStream::Stderr => BoxMakeWriter::new(std::io::stdout),
        },
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_ansi(false).with_writer(writer))
        .try_init()
        .context("failed to install the log subscriber")?;
    Ok(())
}

/// Pick the log filter: flag, then `REFBRIDGE_LOG`, then `DEBUG`, then `--verbose`
fn filter_directive(
    flag: Option<&str>,
    env: Option<String>,
    debug: Option<String>,
    verbose: bool,
) -> String {
    if let Some(flag) = flag {
        return flag.to_string();
    }
    if let Some(env) = env.filter(|v| !v.trim().is_empty()) {
        return env;
    }
    if debug.is_some_and(|v| v.contains("refbridge")) || verbose {
        return "debug".to_string();
    }
    "warn".to_string()
}
