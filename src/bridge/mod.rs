//! The cross-thread environment bridge.
//!
//! A [`GameEnv`] facade talks to one [`SessionDriver`] thread through a pair
//! of channels. The driver advances the engine at its own pace and answers
//! each action with one [`StepResult`]; the facade turns that exchange into
//! blocking `reset`/`step` calls. [`EnvPool`] runs several facades side by
//! side.
//!
//! # Examples
//!
//! ```no_run
//! use rts_bridge::bridge::GameEnv;
//! use rts_bridge::config::EnvConfig;
//! use rts_bridge::sandbox::{SandboxConfig, SandboxEngine};
//! use rts_bridge::world::engine_factory;
//! use rts_bridge::Action;
//!
//! let factory = engine_factory(|| SandboxEngine::new(SandboxConfig::default()));
//! let mut env = GameEnv::new(EnvConfig::default(), factory).unwrap();
//! env.reset().unwrap();
//! loop {
//!     let result = env.step(Action::BuildSupply).unwrap();
//!     if result.done {
//!         break;
//!     }
//! }
//! ```

pub mod channel;
pub mod clock;
pub mod driver;
pub mod episode_log;
pub mod error;
pub mod facade;
pub mod pool;


pub use channel::{rendezvous, ActionMessage, DriverEnd, FacadeEnd, Info, StepResult};
pub use clock::DecisionClock;
pub use driver::{DriverHandle, DriverReport, DriverState, SessionDriver};
pub use episode_log::{EpisodeLog, EpisodeLogError, RewardHistory};
pub use error::{EnvError, StallSide};
pub use facade::GameEnv;
pub use pool::EnvPool;
