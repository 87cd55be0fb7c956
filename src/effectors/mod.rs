//! Domain effectors: the in-world routines behind each [`Action`].
//!
//! Every routine is a best-effort attempt ("build if affordable and not
//! already pending"). A rejected command ends the action for this tick with
//! an [`EffectorError`]; the driver logs it and carries on as if the action
//! were a no-op.

pub mod context;
pub mod economy;
pub mod military;

use thiserror::Error;

use crate::action::Action;
use crate::world::{Command, CommandError};

pub use context::EffectorContext;

/// Failure of an effector routine.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum EffectorError {
    #[error("command rejected: {0}")]
    Rejected(#[from] CommandError),
}

/// One effector routine.
pub type Effector = fn(&mut EffectorContext<'_>) -> Result<(), EffectorError>;

const EXPAND: &[Effector] = &[
    economy::expand,
    economy::build_assimilators,
    economy::build_workers,
];
const MILITARY_STRUCTURE: &[Effector] = &[
    military::build_gateway,
    military::build_cybernetics_core,
    military::build_stargates,
];
const MILITARY_UNIT: &[Effector] = &[military::build_void_rays];
const ATTACK: &[Effector] = &[military::attack];
const SUPPLY: &[Effector] = &[economy::build_pylons];
const NO_OP: &[Effector] = &[];

/// Routines run for `action`, in order.
pub fn routines(action: Action) -> &'static [Effector] {
    match action {
        Action::Expand => EXPAND,
        Action::BuildMilitaryStructure => MILITARY_STRUCTURE,
        Action::BuildMilitaryUnit => MILITARY_UNIT,
        Action::Attack => ATTACK,
        Action::BuildSupply => SUPPLY,
        Action::NoOp => NO_OP,
    }
}

/// Redistributes workers, then runs the routines of `action`.
///
/// Stops at the first failing routine.
pub fn apply(action: Action, ctx: &mut EffectorContext<'_>) -> Result<(), EffectorError> {
    ctx.issue(Command::DistributeWorkers)?;
    for routine in routines(action) {
        routine(ctx)?;
    }
    Ok(())
}
