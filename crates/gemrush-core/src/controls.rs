use serde::{Deserialize, Serialize};

/// A player's control command: directional flags plus the action key.
/// The default value is the "no input" command every slot holds until
/// its first message arrives.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Controls {
    pub up: bool,
    pub left: bool,
    pub right: bool,
    pub action_key: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_no_input() {
        let c = Controls::default();
        assert!(!c.up && !c.left && !c.right && !c.action_key);
    }
}
