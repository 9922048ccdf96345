//! gr - cached `go run`
//!
//! CLI entry point: parses Go-style flags, then hands over to the runner.

use console::style;
use gr::build::{self, GoCompiler};
use gr::cache::CacheStore;
use gr::cli::Cli;
use gr::config::ConfigManager;
use gr::error::{GrError, GrResult, EXIT_FATAL};
use gr::exec;
use gr::paths;
use gr::run::{Invocation, Runner};
use std::process::ExitCode;
use tracing::debug;
use tracing_subscriber::EnvFilter;

/// Environment variable holding a log filter when `-debug` is not given
const LOG_ENV: &str = "GR_LOG";

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse_go_style();
    init_logging(cli.debug);

    match run(cli).await {
        Ok(code) => ExitCode::from(exec::passthrough_status(code)),
        Err(e) => {
            eprintln!("{} {}", style("gr:").red().bold().for_stderr(), e);
            if let Some(hint) = e.hint() {
                eprintln!("{} {}", style("hint:").yellow().for_stderr(), hint);
            }
            ExitCode::from(e.exit_code())
        }
    }
}

fn init_logging(debug: bool) {
    let filter = if debug {
        EnvFilter::new("gr=debug")
    } else {
        EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("gr=warn"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();
}

async fn run(cli: Cli) -> GrResult<i32> {
    let config_manager = match cli.config {
        Some(ref path) => ConfigManager::with_path(path.clone()),
        None => ConfigManager::new(),
    };
    let config = config_manager.load().await?;

    let package_dir = paths::absolute(&cli.package)
        .map_err(|e| GrError::io(format!("resolving package path {}", cli.package.display()), e))?;
    debug!("package {}", package_dir.display());

    let store = CacheStore::open(config.cache.dir.as_deref(), config.cache.keep_entries)?;
    let compiler = GoCompiler::from_env(&config.build.go);
    let launcher = exec::default_launcher();
    let env = build::tracked_env(&config.build.extra_env);

    let invocation = Invocation {
        package_dir,
        flags: cli.compiler_flags(),
        args: cli.args,
    };

    Runner::new(&store, &compiler, launcher.as_ref(), env)
        .run(&invocation)
        .await
}
