//! The discrete action space.

use std::fmt;

/// One high-level decision per tick.
///
/// The discriminants are the wire indices the training loop sends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Action {
    /// Take the next expansion, build gas harvesters, train workers.
    Expand = 0,
    /// Work down the gateway → cybernetics core → stargate chain.
    BuildMilitaryStructure = 1,
    /// Train void rays at every idle stargate.
    BuildMilitaryUnit = 2,
    /// Send every idle void ray at the enemy.
    Attack = 3,
    /// Build a pylon when supply runs low.
    BuildSupply = 4,
    NoOp = 5,
}

impl Action {
    /// Size of the action space.
    pub const COUNT: usize = 6;

    /// Returns all actions in index order.
    pub fn all() -> [Action; Self::COUNT] {
        [
            Action::Expand,
            Action::BuildMilitaryStructure,
            Action::BuildMilitaryUnit,
            Action::Attack,
            Action::BuildSupply,
            Action::NoOp,
        ]
    }

    pub fn index(&self) -> usize {
        *self as usize
    }

    /// Returns the action with the given index, if in range.
    pub fn from_index(index: usize) -> Option<Action> {
        Self::all().get(index).copied()
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Action::Expand => "expand",
            Action::BuildMilitaryStructure => "build_military_structure",
            Action::BuildMilitaryUnit => "build_military_unit",
            Action::Attack => "attack",
            Action::BuildSupply => "build_supply",
            Action::NoOp => "no_op",
        };
        f.write_str(name)
    }
}
