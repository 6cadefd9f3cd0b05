//! scriptfs entry point: parse CLI flags, validate the mount
//! preconditions, build the mount-lifetime [`scriptfs::config::Persistent`],
//! and hand control to the FUSE binding (spec.md §5, §6).

use std::process::ExitCode;

use tracing_subscriber::EnvFilter;

use scriptfs::cli;
use scriptfs::config::Persistent;
use scriptfs::fs::ScriptFs;
use scriptfs::procedure::Procedure;

/// Conventional BSD `EX_USAGE`, used for CLI/argument-shape failures
/// (spec.md §6 "Exit codes").
const EXIT_USAGE: u8 = 64;

/// Env var consulted for the tracing filter (spec.md §6 "Addition —
/// logging": a `RUST_LOG`-equivalent, namespaced so it doesn't collide
/// with an unrelated `RUST_LOG` some other tool on the host may set).
const LOG_ENV_VAR: &str = "SCRIPTFS_LOG";

fn main() -> ExitCode {
    let args = cli::parse_args();

    // `-d` requests the FUSE binding's own debug chatter; it also bumps
    // our own default filter, since a caller passing `-d` is asking to
    // see what's happening, not just what the binding prints.
    let default_filter = if args.debug { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env(LOG_ENV_VAR).unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .init();

    if args.foreground {
        tracing::debug!("foreground requested; daemonization is out of scope (spec.md §1) and fuser::mount2 already blocks in the calling process");
    }

    let mut procedures = Vec::with_capacity(args.procedures.len().max(1));
    for spec in &args.procedures {
        match Procedure::parse(spec) {
            Ok(p) => procedures.push(p),
            Err(e) => {
                tracing::error!(spec = %spec, error = %e, "invalid -p procedure spec");
                return ExitCode::from(EXIT_USAGE);
            }
        }
    }
    if procedures.is_empty() {
        procedures.push(Procedure::default_auto());
    }

    if !args.mirror_path.is_dir() {
        tracing::error!(path = ?args.mirror_path, "mirror path does not exist or is not a directory");
        return ExitCode::from(libc::ENOENT as u8);
    }
    if !args.mountpoint.is_dir() {
        tracing::error!(path = ?args.mountpoint, "mountpoint does not exist or is not a directory");
        return ExitCode::from(libc::ENOENT as u8);
    }
    match std::fs::read_dir(&args.mountpoint) {
        Ok(mut entries) => {
            if entries.next().is_some() {
                tracing::error!(path = ?args.mountpoint, "mountpoint is not empty");
                return ExitCode::from(EXIT_USAGE);
            }
        }
        Err(e) => {
            tracing::error!(path = ?args.mountpoint, error = %e, "cannot read mountpoint");
            return ExitCode::from(libc::EACCES as u8);
        }
    }

    let persistent = match Persistent::new(args.mirror_path.clone(), procedures, args.eager_size) {
        Ok(p) => p,
        Err(e) => {
            tracing::error!(path = ?args.mirror_path, error = %e, "cannot open mirror directory");
            return ExitCode::from(libc::EACCES as u8);
        }
    };

    // Not mounted read-only: non-script files pass writes through to the
    // mirror (spec.md §1). Only classified files refuse write-mode opens,
    // enforced per-op in `ScriptFs`.
    let mut mount_options = vec![fuser::MountOption::FSName("scriptfs".to_string())];
    if args.mount_options.iter().any(|o| o == "allow_other") {
        mount_options.push(fuser::MountOption::AllowOther);
    }
    for opt in &args.mount_options {
        if opt == "allow_other" {
            continue;
        }
        mount_options.push(fuser::MountOption::CUSTOM(opt.clone()));
    }

    let fs = ScriptFs::new(persistent);
    tracing::info!(mirror = ?args.mirror_path, mountpoint = ?args.mountpoint, "mounting");
    match fuser::mount2(fs, &args.mountpoint, &mount_options) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "fuse session ended with an error");
            ExitCode::FAILURE
        }
    }
}
