// Lightcycle - Terminal lightcycle duel against an A*-driven pursuer
// Two cycles leave fading trails on a walled grid; the first to crash loses
use anyhow::{Context, Result};
use clap::Parser;
use env_logger::{Builder, Env, Target};
use log::{error, info};
use std::fs::OpenOptions;
use std::path::PathBuf;

mod collision;
mod config;
mod cycle;
mod game;
mod grid;
mod input;
mod pathfinding;
mod pursuit;
mod renderer;
mod speed;
mod types;

use config::{Args, GameConfig};
use game::GameLoop;
use input::{KeyboardInput, TerminalMenu};
use renderer::{install_panic_hook, restore_terminal, setup_terminal, RenderConfig, TerminalRenderer};
use types::ExitReason;

// Log to a file; stderr would scribble over the alternate screen
fn init_logging(args: &Args) -> Result<PathBuf> {
    let log_path = match &args.log_file {
        Some(path) => path.clone(),
        None => GameConfig::config_dir()?.join("lightcycle.log"),
    };
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .with_context(|| format!("Failed to open log file {}", log_path.display()))?;

    let default_level = if args.quiet { "warn" } else { "info" };
    Builder::from_env(Env::default().default_filter_or(default_level))
        .target(Target::Pipe(Box::new(file)))
        .init();
    Ok(log_path)
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Set global config path immediately (before any config loads)
    GameConfig::set_config_path(args.cfg.clone());

    let log_path = init_logging(&args)?;

    // Get config file path (custom or default)
    let config_path = GameConfig::config_path(None)?;
    let config_file_exists = config_path.exists();

    let mut config = if config_file_exists {
        match GameConfig::load() {
            Ok(c) => c,
            Err(e) => {
                eprintln!("\nFailed to load config file: {:#}", e);
                eprintln!("Config file: {}", config_path.display());
                eprintln!("\nPlease fix the config file or delete it to regenerate with defaults.");
                return Err(e);
            }
        }
    } else {
        // No config file - use defaults (will be saved below)
        GameConfig {
            config_path: Some(config_path.clone()),
            ..Default::default()
        }
    };

    let args_provided = config.merge_with_args(&args);
    config.sanitize();

    // Save config ONLY on first run or when command-line args changed it
    if !config_file_exists || args_provided {
        config.save()?;
    }

    info!("Using config file {}", config_path.display());
    let render_config = RenderConfig::from_config(&config)?;
    let round_config = config.round_config();

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    install_panic_hook();
    let terminal = match setup_terminal() {
        Ok(terminal) => terminal,
        Err(e) => {
            let _ = restore_terminal();
            return Err(e);
        }
    };
    let renderer = TerminalRenderer::new(terminal, render_config);
    let mut game = GameLoop::new(renderer, KeyboardInput, TerminalMenu, round_config);

    let result = runtime.block_on(game.run());

    // Restore the terminal before reporting anything
    let restored = restore_terminal();

    match result {
        Ok(ExitReason::MenuQuit) => {
            info!("Quit from menu");
            println!("End of line.");
        }
        Ok(ExitReason::Interrupted) => {
            info!("Interrupted by user");
            println!("Interrupted.");
        }
        Err(e) => {
            error!("Game loop failed: {:#}", e);
            eprintln!("Error: {:#} (log: {})", e, log_path.display());
            return Err(e);
        }
    }
    restored
}
