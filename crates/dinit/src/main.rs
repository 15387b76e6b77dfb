//! dinit - minimal init process for containers.
//!
//! ## Usage
//!
//! ```bash
//! # Run two processes; the container lives as long as nginx does.
//! dinit -r /usr/sbin/php-fpm -F -r /usr/sbin/nginx -g 'daemon off;'
//!
//! # Add a process to the running instance.
//! dinit --submit -r /usr/local/bin/worker --queue default
//! ```
//!
//! Arguments are expanded for `$VAR` references; use `\-r` for a literal
//! `-r` argument.

use std::io::Write;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};
use dinit_protocol::CommandGroup;
use log::{error, info, warn};

use dinit::config::{Cli, Config, scaled_worker_threads};
use dinit::events::{EventSink, LogSink};
use dinit::reaper::{self, Reaper};
use dinit::socket::{self, ControlSocket};
use dinit::supervisor::{Origin, Supervisor};
use dinit::{hooks, lifecycle};

fn main() -> ExitCode {
    let decoded = match dinit_protocol::decode(std::env::args()) {
        Ok(decoded) => decoded,
        Err(e) => {
            eprintln!("dinit: {e}");
            return ExitCode::FAILURE;
        }
    };

    let config = Config::from(Cli::parse_from(&decoded.flags));
    init_logging(&config);

    if decoded.commands.is_empty() {
        let _ = Cli::command().print_help();
        return ExitCode::SUCCESS;
    }

    let runtime = match build_runtime(&config) {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("failed to start runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(run(config, decoded.commands)) {
        Ok(code) => code,
        Err(e) => {
            error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

fn init_logging(config: &Config) {
    let level = if config.verbose { "debug" } else { "info" };
    let timestamps = config.timestamps;
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format(move |buf, record| {
            if timestamps {
                writeln!(buf, "{} dinit: {}", buf.timestamp(), record.args())
            } else {
                writeln!(buf, "dinit: {}", record.args())
            }
        })
        .init();
}

fn build_runtime(config: &Config) -> std::io::Result<tokio::runtime::Runtime> {
    let mut builder = tokio::runtime::Builder::new_multi_thread();
    builder.enable_all();

    if config.core_fraction > 0.0 {
        if let Ok(threads) = std::env::var("TOKIO_WORKER_THREADS") {
            info!("TOKIO_WORKER_THREADS already set, using that value: {threads}");
        } else {
            let cpus = std::thread::available_parallelism().map_or(1, |n| n.get());
            if let Some(threads) = scaled_worker_threads(config.core_fraction, cpus) {
                info!("using {threads} worker threads");
                builder.worker_threads(threads);
            }
        }
    }

    builder.build()
}

async fn run(config: Config, commands: CommandGroup) -> Result<ExitCode> {
    if let Some(start) = &config.start {
        hooks::run_hook(start)
            .await
            .context("start command failed")?;
    }

    let code = if config.submit {
        socket::submit(&config.socket_path, &commands)
            .await
            .context("failed to write to unix socket")?;
        ExitCode::SUCCESS
    } else {
        supervise(&config, commands).await?
    };

    if let Some(stop) = &config.stop
        && let Err(e) = hooks::run_hook(stop).await
    {
        warn!("stop command failed: {e}");
    }
    Ok(code)
}

async fn supervise(config: &Config, commands: CommandGroup) -> Result<ExitCode> {
    let events: Arc<dyn EventSink> = Arc::new(LogSink);
    let supervisor = Supervisor::with_policy(config.all_primary, config.shutdown, events);

    let control = ControlSocket::bind(&config.socket_path)?;
    let server = tokio::spawn(control.serve(supervisor.clone()));

    let reaper = reaper::is_init().then(|| {
        Reaper::new(
            Arc::clone(supervisor.registry()),
            Arc::clone(supervisor.events()),
        )
        .spawn()
    });

    let boot = supervisor.run(commands, Origin::Boot).await;
    let waited = lifecycle::wait(&supervisor).await;

    server.abort();
    socket::remove_socket_file(&config.socket_path);
    // The stop hook's exit status must not be collected by the reaper.
    if let Some(reaper) = reaper {
        reaper.stop().await;
    }
    waited?;

    Ok(if boot.is_ok() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
