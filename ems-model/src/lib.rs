mod allocation;
pub use allocation::Allocation;
mod error;
pub use error::{Error, Result};
pub mod instance;
pub use instance::{Instance, SpeedRatios};
pub mod objective;
pub mod precedence;
pub mod survival;
pub use survival::SurvivalCurve;
pub mod utilisation;
pub use utilisation::{SelfConsistentSolver, UtilisationModel, Utilisations};
