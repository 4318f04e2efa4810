pub mod controls;
pub mod level;
pub mod net;
pub mod phase;
pub mod player;

/// World-unit size of one tile. Arena dimensions, platform sizes, and
/// spawn positions are all expressed in multiples of this.
pub const TILE_SIZE: f32 = 32.0;

#[cfg(any(test, feature = "test-helpers"))]
pub mod test_helpers {
    use crate::controls::Controls;

    pub fn idle() -> Controls {
        Controls::default()
    }

    pub fn run_right() -> Controls {
        Controls {
            right: true,
            ..Controls::default()
        }
    }

    pub fn run_left() -> Controls {
        Controls {
            left: true,
            ..Controls::default()
        }
    }

    pub fn jump() -> Controls {
        Controls {
            up: true,
            ..Controls::default()
        }
    }

    pub fn attack() -> Controls {
        Controls {
            action_key: true,
            ..Controls::default()
        }
    }
}
