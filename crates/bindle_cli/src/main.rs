mod args;

use std::{path::Path, time::Instant};

use ansi_term::Colour;
use clap::{Parser, Subcommand};

use args::{BuildArgs, ServeArgs, SharedArgs};
use bindle::{ArtifactKind, Bundler, BundlerOptions, FxIndexMap, OutputAsset};
use bindle_dev::DevServer;

const DEFAULT_CONFIG_FILE: &str = "bindle.config.json";

#[derive(Parser)]
#[command(version, about, long_about = None)]
struct Cli {
  #[clap(flatten)]
  shared: SharedArgs,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand)]
enum Command {
  /// One-shot build to the output directory.
  Build(BuildArgs),
  /// Watch, rebuild and serve with live updates.
  Serve(ServeArgs),
}

fn load_options(shared: &SharedArgs) -> Result<BundlerOptions, String> {
  let explicit = shared.config.as_deref();
  let path = match explicit {
    Some(path) => Some(path.to_path_buf()),
    None => {
      let cwd_config = shared
        .cwd
        .as_deref()
        .unwrap_or(Path::new("."))
        .join(DEFAULT_CONFIG_FILE);
      cwd_config.is_file().then_some(cwd_config)
    }
  };

  let mut options: BundlerOptions = match path {
    Some(path) => {
      let raw = std::fs::read_to_string(&path)
        .map_err(|err| format!("cannot read {}: {err}", path.display()))?;
      serde_json::from_str(&raw)
        .map_err(|err| format!("invalid config {}: {err}", path.display()))?
    }
    None => BundlerOptions::default(),
  };

  // Flags override the file.
  if shared.cwd.is_some() {
    options.cwd.clone_from(&shared.cwd);
  }
  if let Some(mode) = shared.mode {
    options.mode = Some(mode.into());
  }
  Ok(options)
}

fn apply_build_args(options: &mut BundlerOptions, build: &BuildArgs) {
  if build.dir.is_some() {
    options.output_dir.clone_from(&build.dir);
  }
  if build.minify.is_some() {
    options.minify = build.minify;
  }
  if build.entry_filenames.is_some() {
    options.entry_filenames.clone_from(&build.entry_filenames);
  }
  if build.chunk_filenames.is_some() {
    options.chunk_filenames.clone_from(&build.chunk_filenames);
  }
  if let Some(entries) = &build.entry {
    let mut map = FxIndexMap::default();
    for entry in entries {
      match entry.split_once('=') {
        Some((name, specifier)) => map.insert(name.to_string(), specifier.to_string()),
        None => map.insert("main".to_string(), entry.clone()),
      };
    }
    options.entries = Some(map);
  }
}

fn print_output_assets(dir: &str, outputs: &[OutputAsset]) {
  let mut left = 0;
  let mut right = 0;

  let mut rows = Vec::with_capacity(outputs.len());
  for output in outputs {
    let size = format!("{:.2}", output.content.len() as f64 / 1024.0);
    left = left.max(output.filename.len());
    right = right.max(size.len());
    let kind = match output.kind {
      ArtifactKind::Chunk { .. } => "chunk",
      ArtifactKind::Asset => "asset",
      ArtifactKind::Manifest => "manifest",
    };
    rows.push((output.filename.as_str(), size, kind));
  }

  let dim = Colour::White.dimmed();
  let color = Colour::Cyan;

  for (filename, size, kind) in rows {
    println!(
      "{}{}{:pad_left$} {}{}{:pad_right$}{} kB",
      dim.paint(format!("{dir}/")),
      color.paint(filename),
      "",
      dim.paint(kind),
      dim.paint(" │ size: "),
      "",
      size,
      pad_left = left - filename.len(),
      pad_right = right - size.len()
    );
  }
}

async fn run_build(options: BundlerOptions, build: &BuildArgs) -> std::process::ExitCode {
  let dir = options
    .output_dir
    .as_deref()
    .unwrap_or(Path::new("dist"))
    .to_string_lossy()
    .into_owned();

  let mut bundler = match Bundler::new(options) {
    Ok(bundler) => bundler,
    Err(errors) => {
      for error in &*errors {
        println!("{} {error}", Colour::Red.paint("Error:"));
      }
      return std::process::ExitCode::FAILURE;
    }
  };

  let start = Instant::now();
  match bundler.write().await {
    Ok((output, _report)) => {
      if !build.silent {
        for warning in &output.warnings {
          println!("{} {warning}", Colour::Yellow.paint("Warning:"));
        }
        if !output.assets.is_empty() {
          print_output_assets(&dir, &output.assets);
        }
      }
      let elapsed = format!("{:.2} ms", start.elapsed().as_secs_f64() * 1000.0);
      println!("\n{} Finished in {}", Colour::Green.paint("✔"), Colour::White.bold().paint(elapsed));
      std::process::ExitCode::SUCCESS
    }
    Err(errors) => {
      for error in &*errors {
        println!("{} {error}", Colour::Red.paint("Error:"));
      }
      std::process::ExitCode::FAILURE
    }
  }
}

async fn run_serve(mut options: BundlerOptions, serve: &ServeArgs) -> std::process::ExitCode {
  if serve.port.is_some() || serve.open {
    let mut dev = options.dev_server.unwrap_or_default();
    if serve.port.is_some() {
      dev.port = serve.port;
    }
    if serve.open {
      dev.open = Some(true);
    }
    options.dev_server = Some(dev);
  }

  let bundler = match Bundler::new(options) {
    Ok(bundler) => bundler,
    Err(errors) => {
      for error in &*errors {
        println!("{} {error}", Colour::Red.paint("Error:"));
      }
      return std::process::ExitCode::FAILURE;
    }
  };

  match DevServer::new(bundler).serve().await {
    Ok(()) => std::process::ExitCode::SUCCESS,
    Err(errors) => {
      for error in &*errors {
        println!("{} {error}", Colour::Red.paint("Error:"));
      }
      std::process::ExitCode::FAILURE
    }
  }
}

#[tokio::main]
async fn main() -> std::process::ExitCode {
  tracing_subscriber::fmt()
    .with_env_filter(
      tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("bindle=info")),
    )
    .init();

  let cli = Cli::parse();
  let options = match load_options(&cli.shared) {
    Ok(options) => options,
    Err(message) => {
      println!("{} {message}", Colour::Red.paint("Error:"));
      return std::process::ExitCode::FAILURE;
    }
  };

  match &cli.command {
    Command::Build(build) => {
      let mut options = options;
      apply_build_args(&mut options, build);
      run_build(options, build).await
    }
    Command::Serve(serve) => run_serve(options, serve).await,
  }
}
