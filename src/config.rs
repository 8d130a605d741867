// Config Module - Configuration management and command-line argument parsing
use anyhow::{Context, Result};
use clap::Parser;
use log::info;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::OnceLock;
use std::time::Duration;

use crate::game::RoundConfig;
use crate::speed::SpeedRamp;

// Global storage for custom config path
static CUSTOM_CONFIG_PATH: OnceLock<Option<String>> = OnceLock::new();

const CONFIG_DIR_NAME: &str = "lightcycle";

#[derive(Parser, Debug, Default)]
#[command(
    author,
    version,
    about = "Terminal lightcycle duel against a pathfinding pursuer",
    long_about = "Steer your lightcycle with the arrow keys (or WASD) and outlast the AI pursuer.\n\
                  Touching a wall, an obstacle or any trail ends the round.\n\
                  Settings live in ~/.config/lightcycle/config.conf and are created on first run."
)]
pub struct Args {
    /// Grid size in cells (square board, walls included)
    #[arg(short, long)]
    pub size: Option<usize>,

    /// Number of obstacle shapes placed each round
    #[arg(short, long)]
    pub obstacles: Option<usize>,

    /// RNG seed for obstacle placement (0 = random every run)
    #[arg(long)]
    pub seed: Option<u64>,

    /// How many planned steps the pursuer scores per candidate move
    #[arg(short, long)]
    pub depth: Option<usize>,

    /// Log file path (default: ~/.config/lightcycle/lightcycle.log)
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Quiet mode - only log warnings and errors
    #[arg(short = 'q', long)]
    pub quiet: bool,

    /// Config file path or name (e.g., --cfg /full/path or --cfg hard for ~/.config/lightcycle/hard.conf)
    #[arg(long)]
    pub cfg: Option<String>,
}

// Quoted and escaped TOML string literal
fn toml_string(value: &str) -> String {
    toml::Value::String(value.to_string()).to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GameConfig {
    #[serde(skip)]
    pub config_path: Option<PathBuf>,  // Stores the config file path (not serialized)

    pub grid_size: usize,  // Square board edge, walls included (default 32)
    pub player_trail_length: usize,  // Cells the player's trail keeps (default 20)
    pub pursuer_trail_length: usize,  // Cells the pursuer's trail keeps (default 30)
    pub obstacle_count: usize,  // Obstacle shapes per round (default 10)
    pub initial_speed_ms: u64,  // Tick delay at round start (default 300ms)
    pub max_speed_ms: u64,  // Tick delay once the ramp completes (default 70ms)
    pub ramp_duration_ms: u64,  // Time to reach max speed (default 3000ms)
    pub pursuit_depth: usize,  // Planned steps scored per pursuer candidate (default 3)
    pub round_over_pause_ms: u64,  // How long the outcome banner stays up (default 2000ms)
    pub resize_retry_ms: u64,  // Wait between terminal size checks when too small (default 1000ms)
    pub seed: u64,  // Obstacle RNG seed, 0 = random

    // Colors: ratatui names ("cyan", "lightred") or hex ("#00ffff")
    pub player_color: String,
    pub pursuer_color: String,
    pub obstacle_color: String,
    pub wall_color: String,
    pub banner_color: String,

    // Names shown in the outcome banner
    pub player_name: String,
    pub pursuer_name: String,
}

impl Default for GameConfig {
    fn default() -> Self {
        GameConfig {
            config_path: None,
            grid_size: 32,
            player_trail_length: 20,
            pursuer_trail_length: 30,
            obstacle_count: 10,
            initial_speed_ms: 300,
            max_speed_ms: 70,
            ramp_duration_ms: 3000,
            pursuit_depth: 3,
            round_over_pause_ms: 2000,
            resize_retry_ms: 1000,
            seed: 0,
            player_color: "cyan".to_string(),
            pursuer_color: "yellow".to_string(),
            obstacle_color: "white".to_string(),
            wall_color: "gray".to_string(),
            banner_color: "red".to_string(),
            player_name: "USER".to_string(),
            pursuer_name: "RINZLER".to_string(),
        }
    }
}

impl GameConfig {
    pub fn merge_with_args(&mut self, args: &Args) -> bool {
        // Track if any args were actually provided
        let mut args_provided = false;

        // Only override config values if explicitly specified on command line
        if let Some(size) = args.size {
            self.grid_size = size;
            args_provided = true;
        }

        if let Some(obstacles) = args.obstacles {
            self.obstacle_count = obstacles;
            args_provided = true;
        }

        if let Some(seed) = args.seed {
            self.seed = seed;
            args_provided = true;
        }

        if let Some(depth) = args.depth {
            self.pursuit_depth = depth;
            args_provided = true;
        }

        args_provided
    }

    /// Set the global config path (called once at startup)
    pub fn set_config_path(cfg: Option<String>) {
        let _ = CUSTOM_CONFIG_PATH.set(cfg);
    }

    /// Get the global config path (if set)
    fn get_config_path_arg() -> Option<&'static str> {
        CUSTOM_CONFIG_PATH.get().and_then(|opt| opt.as_deref())
    }

    /// ~/.config/lightcycle, created on demand
    pub fn config_dir() -> Result<PathBuf> {
        let home = std::env::var("HOME").context("HOME is not set")?;
        let config_dir = PathBuf::from(home).join(".config").join(CONFIG_DIR_NAME);
        std::fs::create_dir_all(&config_dir)
            .with_context(|| format!("Failed to create {}", config_dir.display()))?;
        Ok(config_dir)
    }

    pub fn config_path(cfg_arg: Option<&str>) -> Result<PathBuf> {
        // Priority: explicit arg > global > None
        let cfg = cfg_arg.or_else(|| Self::get_config_path_arg());

        if let Some(cfg) = cfg {
            // Check if it's an absolute path
            let path = PathBuf::from(cfg);
            if path.is_absolute() {
                return Ok(path);
            }

            // Check if it contains path separators (relative path)
            if cfg.contains('/') || cfg.contains('\\') {
                return Ok(path);
            }

            // Add .conf extension if not present
            let filename = if cfg.ends_with(".conf") {
                cfg.to_string()
            } else {
                format!("{}.conf", cfg)
            };

            Ok(Self::config_dir()?.join(filename))
        } else {
            // Default config path
            Ok(Self::config_dir()?.join("config.conf"))
        }
    }

    pub fn load_with_path(cfg_arg: Option<&str>) -> Result<Self> {
        let path = Self::config_path(cfg_arg)?;
        Self::load_from(path)
    }

    pub fn load_from(path: PathBuf) -> Result<Self> {
        let contents = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let mut parsed: Self = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        parsed.config_path = Some(path);
        parsed.sanitize();
        Ok(parsed)
    }

    /// Sanitize config values to handle out-of-range edits
    pub fn sanitize(&mut self) {
        // Grid must leave room for an obstacle anchor range of [1, size-5]
        self.grid_size = self.grid_size.max(8).min(128);
        self.player_trail_length = self.player_trail_length.max(1).min(10000);
        // The pursuer needs its previous cell on the trail, or it may plan a reversal it cannot take
        self.pursuer_trail_length = self.pursuer_trail_length.max(2).min(10000);
        self.obstacle_count = self.obstacle_count.min(500);
        self.initial_speed_ms = self.initial_speed_ms.max(1).min(10000);
        self.max_speed_ms = self.max_speed_ms.max(1).min(self.initial_speed_ms);
        self.ramp_duration_ms = self.ramp_duration_ms.max(1).min(600_000);
        self.pursuit_depth = self.pursuit_depth.max(1).min(64);
        self.round_over_pause_ms = self.round_over_pause_ms.min(60_000);
        self.resize_retry_ms = self.resize_retry_ms.max(10).min(60_000);

        // Sanitize string values (trim whitespace)
        self.player_color = self.player_color.trim().to_lowercase();
        self.pursuer_color = self.pursuer_color.trim().to_lowercase();
        self.obstacle_color = self.obstacle_color.trim().to_lowercase();
        self.wall_color = self.wall_color.trim().to_lowercase();
        self.banner_color = self.banner_color.trim().to_lowercase();
        self.player_name = self.player_name.trim().to_uppercase();
        self.pursuer_name = self.pursuer_name.trim().to_uppercase();
    }

    pub fn load() -> Result<Self> {
        Self::load_with_path(None)
    }

    /// Per-round tuning handed to the game loop
    pub fn round_config(&self) -> RoundConfig {
        RoundConfig {
            grid_size: self.grid_size as i32,
            player_trail_length: self.player_trail_length,
            pursuer_trail_length: self.pursuer_trail_length,
            obstacle_count: self.obstacle_count,
            pursuit_depth: self.pursuit_depth,
            speed: SpeedRamp::from_millis(self.initial_speed_ms, self.max_speed_ms, self.ramp_duration_ms),
            round_over_pause: Duration::from_millis(self.round_over_pause_ms),
            resize_retry: Duration::from_millis(self.resize_retry_ms),
            seed: (self.seed != 0).then_some(self.seed),
        }
    }

    pub fn save(&self) -> Result<()> {
        let path = match self.config_path.clone() {
            Some(path) => path,
            None => Self::config_path(None)?,
        };

        // Sanitize values before saving
        let mut sanitized = self.clone();
        sanitized.sanitize();

        // Build TOML with comments manually for better documentation
        let contents = format!(
            r##"# Lightcycle Configuration File
# Changes apply from the next program start

# Square board edge in cells, boundary walls included (8-128)
# The terminal needs this many rows and twice as many columns
grid_size = {}

# How many cells each trail keeps before the oldest one fades
player_trail_length = {}
pursuer_trail_length = {}

# Obstacle shapes (3-cell bars and L shapes) placed each round
obstacle_count = {}

# Speed ramp: tick delay starts at initial_speed_ms and falls linearly
# to max_speed_ms over ramp_duration_ms, then stays there
initial_speed_ms = {}
max_speed_ms = {}
ramp_duration_ms = {}

# Planned steps the pursuer scores for each candidate move
# Higher values favour routes that close distance over several ticks
pursuit_depth = {}

# How long the round-over banner stays up before the menu returns
round_over_pause_ms = {}

# Wait between checks while the terminal is too small for the board
resize_retry_ms = {}

# Obstacle RNG seed (0 = new layout every run)
seed = {}

# Colors: names like "cyan", "lightred" or hex like "#00ffff"
player_color = {}
pursuer_color = {}
obstacle_color = {}
wall_color = {}
banner_color = {}

# Names shown in the round-over banner
player_name = {}
pursuer_name = {}
"##,
            sanitized.grid_size,
            sanitized.player_trail_length,
            sanitized.pursuer_trail_length,
            sanitized.obstacle_count,
            sanitized.initial_speed_ms,
            sanitized.max_speed_ms,
            sanitized.ramp_duration_ms,
            sanitized.pursuit_depth,
            sanitized.round_over_pause_ms,
            sanitized.resize_retry_ms,
            sanitized.seed,
            toml_string(&sanitized.player_color),
            toml_string(&sanitized.pursuer_color),
            toml_string(&sanitized.obstacle_color),
            toml_string(&sanitized.wall_color),
            toml_string(&sanitized.banner_color),
            toml_string(&sanitized.player_name),
            toml_string(&sanitized.pursuer_name),
        );

        std::fs::write(&path, contents).with_context(|| format!("Failed to write {}", path.display()))?;
        info!("Saved config to {}", path.display());
        Ok(())
    }
}
