//! Combat core: profiles, fire modes, validation, trajectories, hits

pub mod authority;
pub mod behavior;
pub mod combat;
pub mod physics;
pub mod profile;
pub mod runtime;
pub mod scene;
pub mod trajectory;
pub mod validation;

pub use authority::CombatAuthority;
pub use combat::CombatEvent;
pub use physics::SimulatedCaster;
pub use profile::WeaponType;
pub use scene::{InMemoryScene, PlayerId};
pub use validation::FireRequest;
