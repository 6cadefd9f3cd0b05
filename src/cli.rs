//! Command-line interface definitions for scriptfs.
//!
//! Mirrors the teacher crate's clap-derive layout (`takumin-rsdebstrap`'s
//! `cli.rs`), adapted from its subcommand shape to scriptfs's single
//! mount invocation (spec.md §5).

use std::path::PathBuf;

use clap::Parser;

/// `scriptfs [-l] [-p SPEC]... mirror_path mountpoint [-f] [-d] [-o OPT]...`
/// (spec.md §5 "Invocation"). Flags the underlying FUSE binding itself
/// recognizes (`-f`, `-d`, `-o`) are collected here and forwarded rather
/// than reinterpreted.
#[derive(Parser, Debug)]
#[command(
    name = env!("CARGO_PKG_NAME"),
    version = env!("CARGO_PKG_VERSION"),
    about = env!("CARGO_PKG_DESCRIPTION"),
)]
pub struct Cli {
    /// Report a script's true output length via `stat`, by running it
    /// eagerly on every `getattr` rather than reporting the mirror
    /// file's own size.
    #[arg(short = 'l', long = "eager-size")]
    pub eager_size: bool,

    /// A `program[;test]` procedure spec (spec.md §4.5 grammar). May be
    /// given multiple times; order fixes classifier precedence. With
    /// none given, every file is classified `-p auto`.
    #[arg(short = 'p', long = "procedure", value_name = "SPEC")]
    pub procedures: Vec<String>,

    /// Run in the foreground instead of daemonizing.
    #[arg(short = 'f', long = "foreground")]
    pub foreground: bool,

    /// Enable the FUSE binding's own debug output.
    #[arg(short = 'd', long = "debug")]
    pub debug: bool,

    /// Mount option forwarded verbatim to the FUSE binding (e.g.
    /// `allow_other`). May be given multiple times.
    #[arg(short = 'o', long = "option", value_name = "OPT")]
    pub mount_options: Vec<String>,

    /// The directory to overlay.
    pub mirror_path: PathBuf,

    /// The empty directory to mount onto.
    pub mountpoint: PathBuf,
}

pub fn parse_args() -> Cli {
    Cli::parse()
}
