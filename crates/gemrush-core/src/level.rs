use serde::{Deserialize, Serialize};

/// A platform placement as a fraction of the arena dimensions, plus the
/// size variant. Fractions keep the layout independent of arena size.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlatformDef {
    pub x_frac: f32,
    pub y_frac: f32,
    pub is_small: bool,
}

/// A declarative level: arena dimensions and platform placements.
/// Immutable after construction; consumed once by the level factory and
/// replicated to clients at match start.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelDef {
    pub width: f32,
    pub height: f32,
    pub platforms: Vec<PlatformDef>,
}

impl LevelDef {
    /// The standard six-platform arena layout.
    pub fn standard(width: f32, height: f32) -> Self {
        Self {
            width,
            height,
            platforms: vec![
                PlatformDef {
                    x_frac: 0.5,
                    y_frac: 0.28,
                    is_small: true,
                },
                PlatformDef {
                    x_frac: 0.175,
                    y_frac: 0.4,
                    is_small: true,
                },
                PlatformDef {
                    x_frac: 0.825,
                    y_frac: 0.4,
                    is_small: true,
                },
                PlatformDef {
                    x_frac: 0.5,
                    y_frac: 0.55,
                    is_small: false,
                },
                PlatformDef {
                    x_frac: 0.225,
                    y_frac: 0.75,
                    is_small: false,
                },
                PlatformDef {
                    x_frac: 0.775,
                    y_frac: 0.75,
                    is_small: false,
                },
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_layout_is_deterministic() {
        let a = LevelDef::standard(960.0, 640.0);
        let b = LevelDef::standard(960.0, 640.0);
        assert_eq!(a, b);
        assert_eq!(a.platforms.len(), 6);
    }

    #[test]
    fn fractions_stay_inside_the_arena() {
        let level = LevelDef::standard(960.0, 640.0);
        for p in &level.platforms {
            assert!(p.x_frac > 0.0 && p.x_frac < 1.0);
            assert!(p.y_frac > 0.0 && p.y_frac < 1.0);
        }
    }
}
