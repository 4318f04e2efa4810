use serde::Deserialize;

use gemrush_core::player::PLAYER_SLOTS;

/// Top-level server configuration, loaded from `gemrush.toml` with
/// environment overrides on top.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub listen_addr: String,
    pub limits: LimitsConfig,
    pub rooms: RoomsConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:3000".to_string(),
            limits: LimitsConfig::default(),
            rooms: RoomsConfig::default(),
        }
    }
}

/// Infrastructure limits (connection caps, buffer sizes).
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    pub max_ws_connections: usize,
    pub player_message_buffer: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_ws_connections: 200,
            player_message_buffer: 256,
        }
    }
}

/// Match/room settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RoomsConfig {
    pub tick_interval_ms: u64,
    pub max_players: usize,
    pub arena_width: f32,
    pub arena_height: f32,
}

impl Default for RoomsConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: 50,
            max_players: 2,
            arena_width: 960.0,
            arena_height: 640.0,
        }
    }
}

impl ServerConfig {
    /// Validate configuration. Errors are fatal at startup.
    pub fn validate(&self) {
        if self.listen_addr.parse::<std::net::SocketAddr>().is_err() {
            tracing::error!(
                addr = %self.listen_addr,
                "listen_addr is not a valid socket address"
            );
            std::process::exit(1);
        }
        if self.rooms.max_players == 0 || self.rooms.max_players > PLAYER_SLOTS.len() {
            tracing::error!(
                max_players = self.rooms.max_players,
                supported = PLAYER_SLOTS.len(),
                "rooms.max_players outside the supported range"
            );
            std::process::exit(1);
        }
        if self.rooms.tick_interval_ms == 0 {
            tracing::error!("rooms.tick_interval_ms must be > 0");
            std::process::exit(1);
        }
        if self.rooms.arena_width <= 0.0 || self.rooms.arena_height <= 0.0 {
            tracing::error!("rooms arena dimensions must be positive");
            std::process::exit(1);
        }
        if self.limits.max_ws_connections == 0 {
            tracing::error!("limits.max_ws_connections must be > 0");
            std::process::exit(1);
        }
        if self.limits.player_message_buffer == 0 {
            tracing::error!("limits.player_message_buffer must be > 0");
            std::process::exit(1);
        }
    }

    /// Load config from `gemrush.toml` if present, then apply env
    /// overrides. `PORT` (default 3000) picks the listen port.
    pub fn load() -> Self {
        let mut config = match std::fs::read_to_string("gemrush.toml") {
            Ok(content) => match toml::from_str::<ServerConfig>(&content) {
                Ok(cfg) => {
                    tracing::info!("Loaded configuration from gemrush.toml");
                    cfg
                },
                Err(e) => {
                    tracing::warn!("Failed to parse gemrush.toml: {e}, using defaults");
                    ServerConfig::default()
                },
            },
            Err(_) => {
                tracing::info!("No gemrush.toml found, using defaults");
                ServerConfig::default()
            },
        };

        if let Ok(addr) = std::env::var("GEMRUSH_LISTEN_ADDR")
            && !addr.is_empty()
        {
            config.listen_addr = addr;
        }
        if let Ok(port) = std::env::var("PORT")
            && let Ok(port) = port.parse::<u16>()
        {
            config.listen_addr = format!("0.0.0.0:{port}");
        }

        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_values() {
        let cfg = ServerConfig::default();
        assert_eq!(cfg.listen_addr, "0.0.0.0:3000");
        assert_eq!(cfg.rooms.tick_interval_ms, 50);
        assert_eq!(cfg.rooms.max_players, 2);
        assert_eq!(cfg.limits.max_ws_connections, 200);
    }

    #[test]
    fn parse_minimal_toml() {
        let toml_str = r#"
listen_addr = "127.0.0.1:9090"

[rooms]
max_players = 3
tick_interval_ms = 33
"#;
        let cfg: ServerConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(cfg.listen_addr, "127.0.0.1:9090");
        assert_eq!(cfg.rooms.max_players, 3);
        assert_eq!(cfg.rooms.tick_interval_ms, 33);
        // Untouched sections keep their defaults.
        assert_eq!(cfg.limits.player_message_buffer, 256);
    }

    #[test]
    fn invalid_addr_detected() {
        let cfg = ServerConfig {
            listen_addr: "not-an-address".to_string(),
            ..ServerConfig::default()
        };
        // validate() exits the process, so test the underlying check.
        assert!(cfg.listen_addr.parse::<std::net::SocketAddr>().is_err());
    }

    #[test]
    fn player_count_bounds() {
        for bad in [0usize, PLAYER_SLOTS.len() + 1] {
            let cfg = ServerConfig {
                rooms: RoomsConfig {
                    max_players: bad,
                    ..RoomsConfig::default()
                },
                ..ServerConfig::default()
            };
            assert!(
                cfg.rooms.max_players == 0 || cfg.rooms.max_players > PLAYER_SLOTS.len(),
                "{:?} should be out of range",
                cfg.rooms.max_players
            );
        }
    }
}
