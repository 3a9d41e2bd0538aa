use anyhow::{Context, Result};
use atomwrite::config::Config;
use atomwrite::render::{render, RenderInput};
use clap::Parser;
use std::io::{self, Read};
use std::path::Path;
use tracing::Level;

mod cli;

use cli::Cli;

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = Config::load_or_default(cli.config.as_deref())?;
    tracing::debug!(
        config = %config.config_path.display(),
        mode = %config.write.mode,
        backup = config.write.backup,
        create_parent_dirs = config.write.create_parent_dirs,
        "loaded config"
    );
    let options = cli.write_options(config.write);
    let path = cli.target()?;
    let contents = read_contents(cli.from.as_deref())?;

    let input = RenderInput {
        path: &path,
        contents: &contents,
        options,
        dry: cli.dry_run,
    };
    let mut stdout = io::stdout().lock();
    let result =
        render(&input, &mut stdout).with_context(|| format!("Failed to write {}", path.display()))?;

    if !result.did_render {
        eprintln!("unchanged {}", path.display());
    } else if !cli.dry_run {
        eprintln!("wrote {}", path.display());
    }
    if let Some(backup) = result.backup {
        eprintln!("backup {}", backup.display());
    }
    Ok(())
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        _ => Level::DEBUG,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(io::stderr)
        .init();
}

fn read_contents(from: Option<&Path>) -> Result<Vec<u8>> {
    match from {
        Some(path) => std::fs::read(path)
            .with_context(|| format!("Failed to read input: {}", path.display())),
        None => {
            let mut buf = Vec::new();
            io::stdin()
                .lock()
                .read_to_end(&mut buf)
                .context("Failed to read stdin")?;
            Ok(buf)
        }
    }
}
