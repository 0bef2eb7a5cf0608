use std::path::PathBuf;

use clap::{Args, ValueEnum};

use bindle::Mode;

#[derive(Args)]
pub struct SharedArgs {
  /// JSON configuration file. `bindle.config.json` is picked up
  /// automatically when present.
  #[clap(long, short = 'c')]
  pub config: Option<PathBuf>,

  #[clap(long)]
  pub cwd: Option<PathBuf>,

  #[clap(long)]
  pub mode: Option<ModeArg>,
}

#[derive(Args)]
pub struct BuildArgs {
  /// Output directory.
  #[clap(long, short = 'd')]
  pub dir: Option<PathBuf>,

  #[clap(long, short = 'm')]
  pub minify: Option<bool>,

  #[clap(long)]
  pub entry_filenames: Option<String>,

  #[clap(long)]
  pub chunk_filenames: Option<String>,

  /// Entry point, `name=specifier` or a bare specifier named `main`.
  /// Repeatable.
  #[clap(long, action = clap::ArgAction::Append)]
  pub entry: Option<Vec<String>>,

  #[clap(long)]
  pub silent: bool,
}

#[derive(Args)]
pub struct ServeArgs {
  #[clap(long, short = 'p')]
  pub port: Option<u16>,

  /// Open the served address in a browser once listening.
  #[clap(long)]
  pub open: bool,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum ModeArg {
  Development,
  Production,
}

impl From<ModeArg> for Mode {
  fn from(value: ModeArg) -> Self {
    match value {
      ModeArg::Development => Mode::Development,
      ModeArg::Production => Mode::Production,
    }
  }
}
