//! Application state shared across routes

use std::sync::Arc;

use crate::config::Config;
use crate::game::{CombatAuthority, InMemoryScene, SimulatedCaster};
use crate::util::time::{Clock, MonotonicClock};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub scene: Arc<InMemoryScene>,
    pub clock: Arc<dyn Clock>,
    pub authority: Arc<CombatAuthority>,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let config = Arc::new(config);

        // World and physics collaborators
        let scene = Arc::new(InMemoryScene::new());
        let caster = Arc::new(SimulatedCaster::new(scene.clone()));
        let clock: Arc<dyn Clock> = Arc::new(MonotonicClock);

        let authority = Arc::new(CombatAuthority::new(
            config.combat.clone(),
            scene.clone(),
            caster,
            clock.clone(),
        ));

        Self {
            config,
            scene,
            clock,
            authority,
        }
    }
}
