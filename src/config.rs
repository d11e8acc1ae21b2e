use anyhow::Context;
use serde::Deserialize;
use std::env;
use std::path::Path;

pub const GAME_MODE_TEAMS: u8 = 2;

/// Startup-time tunables. Loaded once and shared read-only for the life of the server.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    pub port: u16,

    pub game_radius: f64,
    pub play_radius: f64,
    pub sector_size: u16,
    pub sector_count: u16,

    pub initial_parts: u32,
    pub tick_ms: u64,
    pub motion_tick_ms: u64,
    pub angle_tick_ms: u64,
    pub rotation_broadcast_ms: f64,
    pub view_range: f64,

    pub initial_food_count: usize,
    pub max_food_count: usize,
    pub food_spawn_interval: u64,
    pub food_per_spawn: usize,
    pub min_natural_food_size: u8,
    pub max_natural_food_size: u8,
    pub min_death_food_size: u8,

    pub initial_prey_count: usize,
    pub max_prey_count: usize,
    pub prey_spawn_chance: f64,

    pub leaderboard_interval: u64,
    pub minimap_interval: u64,
    pub bot_rebalance_interval: u64,
    pub min_players: usize,
    pub max_bots: usize,
    pub bot_names: Vec<String>,

    pub default_protocol_version: u8,
    pub server_id: u16,
    pub game_mode: u8,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            game_radius: 2000.0,
            play_radius: 1950.0,
            sector_size: 300,
            sector_count: 14,
            initial_parts: 2,
            tick_ms: 47,
            motion_tick_ms: 8,
            angle_tick_ms: 16,
            rotation_broadcast_ms: 100.0,
            view_range: 3000.0,
            initial_food_count: 200,
            max_food_count: 400,
            food_spawn_interval: 2,
            food_per_spawn: 3,
            min_natural_food_size: 15,
            max_natural_food_size: 47,
            min_death_food_size: 68,
            initial_prey_count: 5,
            max_prey_count: 10,
            prey_spawn_chance: 0.1,
            leaderboard_interval: 10,
            minimap_interval: 10,
            bot_rebalance_interval: 50,
            min_players: 20,
            max_bots: 25,
            bot_names: [
                "Bot Alpha", "Bot Beta", "Bot Gamma", "Bot Delta", "Bot Epsilon", "Snake AI",
                "Robo Snake", "AI Player", "Computer", "NPC",
            ]
            .iter()
            .map(|name| name.to_string())
            .collect(),
            default_protocol_version: 11,
            server_id: 1,
            game_mode: 0,
        }
    }
}

impl GameConfig {
    /// Defaults, then the JSON file named by `SLITHER_CONFIG`, then `PORT`.
    pub fn load() -> anyhow::Result<Self> {
        let mut config = match env::var("SLITHER_CONFIG") {
            Ok(path) if !path.trim().is_empty() => Self::from_file(Path::new(path.trim()))?,
            _ => Self::default(),
        };
        if let Some(port) = env::var("PORT").ok().and_then(|value| value.parse().ok()) {
            config.port = port;
        }
        config.sanitize();
        Ok(config)
    }

    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        Self::from_json(&raw).with_context(|| format!("invalid config file {}", path.display()))
    }

    pub fn from_json(raw: &str) -> anyhow::Result<Self> {
        let mut config: GameConfig = serde_json::from_str(raw)?;
        config.sanitize();
        Ok(config)
    }

    fn sanitize(&mut self) {
        self.play_radius = self.play_radius.min(self.game_radius);
        self.initial_parts = self.initial_parts.max(2);
        self.tick_ms = self.tick_ms.max(1);
        self.motion_tick_ms = self.motion_tick_ms.max(1);
        self.angle_tick_ms = self.angle_tick_ms.max(1);
        self.food_spawn_interval = self.food_spawn_interval.max(1);
        self.leaderboard_interval = self.leaderboard_interval.max(1);
        self.minimap_interval = self.minimap_interval.max(1);
        self.bot_rebalance_interval = self.bot_rebalance_interval.max(1);
        if self.max_natural_food_size <= self.min_natural_food_size {
            self.max_natural_food_size = self.min_natural_food_size.saturating_add(1);
        }
    }

    pub fn center(&self) -> crate::game::types::Point {
        crate::game::types::Point::new(self.game_radius, self.game_radius)
    }

    pub fn world_size(&self) -> f64 {
        self.game_radius * 2.0
    }

    pub fn team_mode(&self) -> bool {
        self.game_mode == GAME_MODE_TEAMS
    }
}
