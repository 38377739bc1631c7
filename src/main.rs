use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use ztrace::{Config, MemorySink, Session};

mod demo;
mod report;

pub type Result<T> = anyhow::Result<T>;

#[derive(Parser)]
#[command(name = "ztrace")]
#[command(about = "Lightweight execution tracer", long_about = None)]
struct Cli {
    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Trace the bundled demo functions and write their log.
    Demo {
        /// Root of the log tree (default: $ZTRACE_LOG_DIR or ./ztrace_logs).
        #[arg(long)]
        log_dir: Option<String>,

        /// Directory the demo sources are looked up in, for ignore markers.
        #[arg(long)]
        source_root: Option<String>,

        /// Run the demo without tracing.
        #[arg(long)]
        disabled: bool,
    },
    /// Summarize a trace log file.
    Show {
        #[arg(long)]
        log: String,

        /// Only functions whose key contains this text.
        #[arg(long)]
        function: Option<String>,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ztrace=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    match cli.cmd {
        Commands::Demo {
            log_dir,
            source_root,
            disabled,
        } => {
            let source_root =
                source_root.unwrap_or_else(|| env!("CARGO_MANIFEST_DIR").to_string());
            let mut config = Config::from_env().with_source_root(source_root);
            if let Some(dir) = log_dir {
                config = config.with_log_dir(dir);
            }
            if disabled {
                config = config.with_disabled(true);
            }
            if config.disabled {
                demo::run(&Session::with_sink(config, MemorySink::new()))?;
                println!("Tracing disabled; nothing written");
            } else {
                let session = Session::open(config)?;
                demo::run(&session)?;
                session.flush()?;
                println!("Wrote {}", session.log_path()?.display());
            }
        }
        Commands::Show { log, function } => {
            let raw = report::read_log(&log)?;
            print!("{}", report::render(&raw, function.as_deref())?);
        }
    }

    Ok(())
}
