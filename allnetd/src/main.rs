use std::os::fd::{FromRawFd, OwnedFd, RawFd};

use allnetd_lib::config::load_from_path;
use allnetd_lib::{daemon, Config, PipeRegistry};
use tokio::net::unix::pipe;
use tracing::{error, info};

fn usage(prog: &str) -> String {
    format!("usage: {prog} [--config <path>] N p0r p0w p1r p1w ... p(N-1)r p(N-1)w  (N >= 3)")
}

/// Pull an optional `--config <path>` out of argv, ahead of the positional
/// pipe arguments (spec §6: the historical positional contract is
/// unchanged, so the flag is stripped before `parse_pipe_args` ever sees
/// the remainder).
fn take_config_flag(args: &[String]) -> Result<(Option<String>, &[String]), String> {
    match args.first().map(String::as_str) {
        Some("--config") => {
            let path = args.get(1).ok_or("--config requires a path argument")?.clone();
            Ok((Some(path), &args[2..]))
        }
        _ => Ok((None, args)),
    }
}

/// Parse `N p0r p0w ...` from the raw argv (excluding argv[0] and any
/// `--config` flag) into a list of (read_fd, write_fd) pairs. Returns a
/// usage string on any malformed input, matching §6's "nonzero status
/// after printing a usage diagnostic".
fn parse_pipe_args(args: &[String]) -> Result<Vec<(RawFd, RawFd)>, String> {
    let n: usize = args.first().ok_or("missing pipe count")?.parse().map_err(|_| "pipe count is not a number".to_string())?;
    if n < 3 {
        return Err("pipe count must be >= 3".to_string());
    }
    if args.len() != 1 + 2 * n {
        return Err(format!("expected {} fd arguments for {n} pipes, got {}", 2 * n, args.len() - 1));
    }

    let mut pairs = Vec::with_capacity(n);
    for i in 0..n {
        let r: RawFd = args[1 + 2 * i].parse().map_err(|_| format!("pipe {i}: invalid read fd"))?;
        let w: RawFd = args[2 + 2 * i].parse().map_err(|_| format!("pipe {i}: invalid write fd"))?;
        pairs.push((r, w));
    }
    Ok(pairs)
}

/// Build a `PipeRegistry` from inherited file descriptors.
///
/// Safety: each raw fd is guaranteed by §6 of the external interface to
/// already be open and owned by this process, inherited from the parent
/// that exec'd it; nothing else in this binary or the library crate
/// constructs a raw fd. Wrapping it in `OwnedFd` before handing it to tokio
/// means a failed conversion closes it rather than leaking it.
fn build_registry(pairs: Vec<(RawFd, RawFd)>) -> allnetd_lib::Result<PipeRegistry> {
    let mut receivers = Vec::with_capacity(pairs.len());
    let mut senders = Vec::with_capacity(pairs.len());

    for (r, w) in pairs {
        let owned_r = unsafe { OwnedFd::from_raw_fd(r) };
        let owned_w = unsafe { OwnedFd::from_raw_fd(w) };
        let rx = pipe::Receiver::try_from(owned_r)
            .map_err(|e| allnetd_lib::DaemonError::Config(format!("failed to wrap read fd {r}: {e}")))?;
        let tx = pipe::Sender::try_from(owned_w)
            .map_err(|e| allnetd_lib::DaemonError::Config(format!("failed to wrap write fd {w}: {e}")))?;
        receivers.push(rx);
        senders.push(tx);
    }

    Ok(PipeRegistry::new(receivers, senders))
}

#[tokio::main]
async fn main() {
    let argv: Vec<String> = std::env::args().collect();
    let prog = argv.first().cloned().unwrap_or_else(|| "ad".to_string());

    let (config_path, rest) = match take_config_flag(&argv[1..]) {
        Ok(parsed) => parsed,
        Err(reason) => {
            eprintln!("{reason}");
            eprintln!("{}", usage(&prog));
            std::process::exit(1);
        }
    };

    let pairs = match parse_pipe_args(rest) {
        Ok(pairs) => pairs,
        Err(reason) => {
            eprintln!("{reason}");
            eprintln!("{}", usage(&prog));
            std::process::exit(1);
        }
    };

    let config = match config_path {
        Some(path) => match load_from_path(&path) {
            Ok(cfg) => cfg,
            Err(e) => {
                eprintln!("failed to load config from {path}: {e}");
                std::process::exit(1);
            }
        },
        None => Config::default(),
    };

    if let Err(e) = allnetd_lib::telemetry::init_tracing(&config.logging.level, config.logging.show_target) {
        eprintln!("failed to initialize logging: {e}");
        std::process::exit(1);
    }

    info!(pipes = pairs.len(), "starting allnetd");

    let registry = match build_registry(pairs) {
        Ok(registry) => registry,
        Err(e) => {
            error!(error = %e, "failed to wire up pipes");
            std::process::exit(1);
        }
    };

    let exit_code = match daemon::run(registry, config).await {
        Ok(()) => 0,
        Err(e) => {
            error!(error = %e, "daemon exited with error");
            1
        }
    };

    allnetd_lib::telemetry::shutdown_tracing();
    std::process::exit(exit_code);
}
