//! Server-authoritative combat entry point
//!
//! Fire and reload intents from untrusted clients run through a
//! short-circuiting validation pipeline. Rejections are only logged
//! locally; nothing about why a shot was refused goes back to the client.

use dashmap::DashMap;
use glam::Vec3;
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::config::CombatConfig;
use crate::util::time::Clock;

use super::combat::{CombatEvent, HitResolver, ShotContext};
use super::physics::{BallisticCaster, CastBehavior, CastRequest, ImpactHandle};
use super::profile::WeaponProfile;
use super::runtime::WeaponRuntimeState;
use super::scene::{EntityId, PlayerId, SceneGraph};
use super::trajectory::{self, Trajectory};
use super::validation::{
    check_clock, validate_aim, validate_cadence, validate_structure, FireRejection, FireRequest,
    RejectionCategory,
};

/// Capacity of the outbound combat event channel
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Result of an accepted fire intent
#[derive(Debug, Clone)]
pub struct FireOutcome {
    pub weapon_id: EntityId,
    pub trajectories: Vec<Trajectory>,
    pub remaining_ammo: u32,
}

type SharedWeaponState = Arc<Mutex<WeaponRuntimeState>>;

/// Owns the weapon and player registries and validates every intent
pub struct CombatAuthority {
    config: CombatConfig,
    scene: Arc<dyn SceneGraph>,
    caster: Arc<dyn BallisticCaster>,
    clock: Arc<dyn Clock>,
    resolver: Arc<HitResolver>,
    /// Weapon entity -> live state, created on first use
    weapons: DashMap<EntityId, SharedWeaponState>,
    /// Player -> last accepted fire time
    fire_history: DashMap<PlayerId, f64>,
    events: broadcast::Sender<CombatEvent>,
}

impl CombatAuthority {
    pub fn new(
        config: CombatConfig,
        scene: Arc<dyn SceneGraph>,
        caster: Arc<dyn BallisticCaster>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let resolver = Arc::new(HitResolver::new(scene.clone(), events.clone()));

        Self {
            config,
            scene,
            caster,
            clock,
            resolver,
            weapons: DashMap::new(),
            fire_history: DashMap::new(),
            events,
        }
    }

    /// Subscribe to outbound combat events
    pub fn subscribe(&self) -> broadcast::Receiver<CombatEvent> {
        self.events.subscribe()
    }

    /// Process one fire intent. Any rejection is logged and returned to
    /// the in-process caller only.
    pub fn handle_fire_intent(
        &self,
        player_id: PlayerId,
        request: &FireRequest,
    ) -> Result<FireOutcome, FireRejection> {
        let result = self.try_fire(player_id, request);
        if let Err(rejection) = &result {
            log_rejection("fire", player_id, rejection);
        }
        result
    }

    /// Refill the equipped weapon's magazine
    pub fn handle_reload_intent(&self, player_id: PlayerId) -> Result<u32, FireRejection> {
        let result = self.try_reload(player_id);
        if let Err(rejection) = &result {
            log_rejection("reload", player_id, rejection);
        }
        result
    }

    /// Drop the player's fire history and the state of the weapon their
    /// character holds. Must run before the character leaves the scene.
    pub fn handle_disconnect(&self, player_id: PlayerId) {
        self.fire_history.remove(&player_id);
        if let Some(weapon_id) = self.scene.equipped_weapon(player_id) {
            self.weapons.remove(&weapon_id);
        }
        info!(player_id = %player_id, "Cleared combat state for disconnected player");
    }

    /// Forget a destroyed weapon entity
    pub fn handle_weapon_destroyed(&self, weapon_id: EntityId) {
        if self.weapons.remove(&weapon_id).is_some() {
            debug!(weapon_id = %weapon_id, "Removed runtime state of destroyed weapon");
        }
    }

    pub fn active_weapons(&self) -> usize {
        self.weapons.len()
    }

    pub fn tracked_players(&self) -> usize {
        self.fire_history.len()
    }

    /// Current ammo of a weapon with live state
    #[cfg(test)]
    pub fn ammo(&self, weapon_id: EntityId) -> Option<u32> {
        self.weapons
            .get(&weapon_id)
            .map(|state| state.value().lock().current_ammo)
    }

    fn try_fire(
        &self,
        player_id: PlayerId,
        request: &FireRequest,
    ) -> Result<FireOutcome, FireRejection> {
        let fire = validate_structure(request)?;

        let now = self.clock.now();
        check_clock(now, fire.client_time, self.config.clock_desync_tolerance)?;

        let weapon_id = self.equipped_weapon(player_id)?;
        if request.weapon_id.is_some_and(|requested| requested != weapon_id) {
            return Err(FireRejection::WeaponMismatch);
        }

        if self.config.enforce_aim_checks {
            let character = self
                .scene
                .character(player_id)
                .ok_or(FireRejection::NoWeapon)?;
            validate_aim(&fire, character.position, self.config.max_origin_offset)?;
        }

        let shared = self.runtime_state(weapon_id)?;
        let mut state = shared.lock();

        if !state.has_ammo() {
            return Err(FireRejection::OutOfAmmo);
        }

        if !state.can_fire(now) {
            return Err(FireRejection::Cooldown);
        }

        let player_last_fire = self.fire_history.get(&player_id).map(|t| *t.value());
        validate_cadence(
            now,
            player_last_fire,
            state.behavior.min_shot_interval(),
            state.profile.cooldown_tolerance as f64,
        )?;

        if !state.consume_ammo() {
            return Err(FireRejection::OutOfAmmo);
        }

        let trajectories = trajectory::fire(
            fire.origin,
            fire.direction,
            &state.profile,
            &state.behavior,
            &mut rand::thread_rng(),
        );
        self.dispatch(player_id, weapon_id, &state.profile, &trajectories);

        state.record_shot(now);
        self.fire_history.insert(player_id, now);
        let remaining_ammo = state.current_ammo;
        let auto_fire = state.behavior.is_auto_fire();
        drop(state);

        if let Some(metadata) = &request.metadata {
            debug!(
                player_id = %player_id,
                fire_mode_hint = ?metadata.fire_mode_hint,
                stance = ?metadata.stance,
                movement_state = ?metadata.movement_state,
                "Fire metadata (advisory)"
            );
        }
        debug!(
            player_id = %player_id,
            weapon_id = %weapon_id,
            pellets = trajectories.len(),
            remaining_ammo,
            "Shot accepted"
        );

        let _ = self.events.send(CombatEvent::BulletFired {
            shooter_id: player_id,
            weapon_id,
            origin: fire.origin,
            directions: trajectories.iter().map(|t| t.direction).collect(),
            speed: trajectories.first().map(|t| t.velocity.length()).unwrap_or(0.0),
            auto_fire,
        });

        Ok(FireOutcome {
            weapon_id,
            trajectories,
            remaining_ammo,
        })
    }

    fn try_reload(&self, player_id: PlayerId) -> Result<u32, FireRejection> {
        let weapon_id = self.equipped_weapon(player_id)?;
        let shared = self.runtime_state(weapon_id)?;
        let ammo = {
            let mut state = shared.lock();
            state.reload();
            state.current_ammo
        };

        debug!(player_id = %player_id, weapon_id = %weapon_id, ammo, "Weapon reloaded");
        let _ = self.events.send(CombatEvent::WeaponReloaded {
            player_id,
            weapon_id,
            ammo,
        });
        Ok(ammo)
    }

    /// Equipped entity that carries the weapon tag
    fn equipped_weapon(&self, player_id: PlayerId) -> Result<EntityId, FireRejection> {
        self.scene
            .equipped_weapon(player_id)
            .filter(|weapon| self.scene.is_weapon(*weapon))
            .ok_or(FireRejection::NoWeapon)
    }

    /// Fetch the weapon's live state, resolving its profile on first use
    fn runtime_state(&self, weapon_id: EntityId) -> Result<SharedWeaponState, FireRejection> {
        if let Some(existing) = self.weapons.get(&weapon_id) {
            return Ok(existing.value().clone());
        }

        let entry = self.weapons.entry(weapon_id).or_try_insert_with(|| {
            let overrides = self.scene.weapon_overrides(weapon_id);
            let profile = WeaponProfile::resolve(&overrides)?;
            debug!(
                weapon_id = %weapon_id,
                weapon_type = ?profile.weapon_type,
                fire_mode = ?profile.fire_mode,
                "Created weapon runtime state"
            );
            Ok::<_, FireRejection>(Arc::new(Mutex::new(WeaponRuntimeState::new(
                profile,
                self.config.burst_interval,
            ))))
        })?;

        Ok(entry.value().clone())
    }

    /// Hand every trajectory to the caster with the firer excluded
    fn dispatch(
        &self,
        player_id: PlayerId,
        weapon_id: EntityId,
        profile: &WeaponProfile,
        trajectories: &[Trajectory],
    ) {
        let mut exclusions = vec![weapon_id];
        if let Some(character) = self.scene.character(player_id) {
            exclusions.push(character.entity);
        }
        if let Some(container) = self.scene.projectile_container() {
            exclusions.push(container);
        }

        let behavior = CastBehavior {
            exclusions,
            acceleration: Vec3::new(0.0, -self.config.gravity, 0.0),
            max_distance: profile.range,
        };

        for trajectory in trajectories {
            let shot = ShotContext {
                shot_id: Uuid::new_v4(),
                shooter_id: player_id,
                weapon_id,
                origin: trajectory.origin,
                base_damage: profile.damage,
                range: profile.range,
                pellet_index: trajectory.pellet_index,
            };
            let request = CastRequest {
                origin: trajectory.origin,
                direction: trajectory.direction,
                speed: profile.bullet_velocity,
                behavior: behavior.clone(),
            };
            self.caster
                .cast(request, ImpactHandle::new(shot, self.resolver.clone()));
        }
    }
}

fn log_rejection(intent: &'static str, player_id: PlayerId, rejection: &FireRejection) {
    match rejection.category() {
        RejectionCategory::Configuration => {
            error!(player_id = %player_id, intent, error = %rejection, "Weapon configuration defect");
        }
        category => {
            debug!(player_id = %player_id, intent, ?category, reason = %rejection, "Intent rejected");
        }
    }
}
