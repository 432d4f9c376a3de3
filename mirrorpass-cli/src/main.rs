mod cli;
mod render;
mod scene;

use std::path::Path;

use anyhow::{Context, Result};
use clap::Parser;
use mirrorpass_render::MirrorConfig;

use cli::{Cli, Command};

fn load_config(path: Option<&Path>) -> Result<MirrorConfig> {
    match path {
        Some(path) => MirrorConfig::load(path)
            .with_context(|| format!("failed to load mirror configuration {}", path.display())),
        None => Ok(MirrorConfig::default()),
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    match cli.command {
        Command::Render(args) => {
            let config = load_config(args.config.as_deref())?;
            render::run(&args, &config)
        }
        Command::Config { config } => {
            let config = load_config(config.as_deref())?;
            println!("{config:#?}");
            Ok(())
        }
    }
}
