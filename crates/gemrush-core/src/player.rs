use serde::{Deserialize, Serialize};

use crate::TILE_SIZE;

/// Cosmetic avatar color, assigned by slot at registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

/// Spawn configuration for one player slot.
#[derive(Debug, Clone, Copy)]
pub struct PlayerSlotConfig {
    pub start_x: f32,
    pub facing_left: bool,
    pub color: PlayerColor,
}

/// Per-slot spawn table. The slot index assigned at registration indexes
/// into this; it also bounds the supported player count.
pub const PLAYER_SLOTS: &[PlayerSlotConfig] = &[
    PlayerSlotConfig {
        start_x: 4.0 * TILE_SIZE,
        facing_left: false,
        color: PlayerColor {
            r: 255,
            g: 255,
            b: 255,
        },
    },
    PlayerSlotConfig {
        start_x: 26.0 * TILE_SIZE,
        facing_left: true,
        color: PlayerColor {
            r: 102,
            g: 255,
            b: 102,
        },
    },
    PlayerSlotConfig {
        start_x: 15.0 * TILE_SIZE,
        facing_left: false,
        color: PlayerColor {
            r: 102,
            g: 102,
            b: 255,
        },
    },
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slot_table_covers_three_players() {
        assert_eq!(PLAYER_SLOTS.len(), 3);
        // First two slots face each other across the arena.
        assert!(!PLAYER_SLOTS[0].facing_left);
        assert!(PLAYER_SLOTS[1].facing_left);
        assert!(PLAYER_SLOTS[0].start_x < PLAYER_SLOTS[1].start_x);
    }
}
