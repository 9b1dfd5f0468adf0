//! Hit resolution - range falloff, damage application, combat events

use glam::Vec3;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, info};
use uuid::Uuid;

use super::scene::{EntityId, PlayerId, SceneGraph};

/// Falloff begins past this fraction of max range
pub const FALLOFF_START_FRACTION: f32 = 0.5;

/// Damage after linear range falloff.
///
/// Full damage up to half range, then linear down to zero at max range.
/// Never negative, including past max range.
pub fn falloff_damage(base_damage: f32, range: f32, distance: f32) -> f32 {
    let falloff_start = range * FALLOFF_START_FRACTION;
    if distance <= falloff_start {
        return base_damage;
    }
    let span = range - falloff_start;
    let factor = 1.0 - (distance - falloff_start) / span;
    base_damage * factor.clamp(0.0, 1.0)
}

/// Apply damage to health, returns (new_health, is_dead)
pub fn apply_damage(current_health: f32, damage: f32) -> (f32, bool) {
    let new_health = (current_health - damage).max(0.0);
    (new_health, new_health <= 0.0)
}

/// Everything hit processing needs about the discharge, captured at fire
/// time so a late impact never has to consult the weapon registry.
#[derive(Debug, Clone)]
pub struct ShotContext {
    pub shot_id: Uuid,
    pub shooter_id: PlayerId,
    pub weapon_id: EntityId,
    pub origin: Vec3,
    pub base_damage: f32,
    pub range: f32,
    pub pellet_index: u32,
}

/// Outcome of one resolved hit
#[derive(Debug, Clone, PartialEq)]
pub struct HitResult {
    pub shot_id: Uuid,
    pub shooter_id: PlayerId,
    pub target_id: EntityId,
    pub damage: f32,
    pub distance: f32,
    pub point: Vec3,
    pub target_killed: bool,
    /// False when the struck entity has no health capability
    pub damage_applied: bool,
}

/// Outbound events the transport may relay to clients
#[derive(Debug, Clone, PartialEq)]
pub enum CombatEvent {
    BulletFired {
        shooter_id: PlayerId,
        weapon_id: EntityId,
        origin: Vec3,
        directions: Vec<Vec3>,
        speed: f32,
        /// Holding the trigger keeps firing at the weapon's fire rate
        auto_fire: bool,
    },
    HitConfirmed {
        shooter_id: PlayerId,
        weapon_id: EntityId,
        target_id: EntityId,
        damage: f32,
        point: Vec3,
        killed: bool,
    },
    WeaponReloaded {
        player_id: PlayerId,
        weapon_id: EntityId,
        ammo: u32,
    },
}

/// Turns caster impacts into damage
pub struct HitResolver {
    scene: Arc<dyn SceneGraph>,
    events: broadcast::Sender<CombatEvent>,
}

impl HitResolver {
    pub fn new(scene: Arc<dyn SceneGraph>, events: broadcast::Sender<CombatEvent>) -> Self {
        Self { scene, events }
    }

    /// Resolve a hit on `target` at `point`
    pub fn resolve_hit(&self, shot: &ShotContext, point: Vec3, target: EntityId) -> HitResult {
        let distance = point.distance(shot.origin);
        let damage = falloff_damage(shot.base_damage, shot.range, distance);

        let mut result = HitResult {
            shot_id: shot.shot_id,
            shooter_id: shot.shooter_id,
            target_id: target,
            damage,
            distance,
            point,
            target_killed: false,
            damage_applied: false,
        };

        let Some(receiver) = self.scene.damage_receiver(target) else {
            debug!(shot_id = %shot.shot_id, target_id = %target, "Hit non-damageable surface");
            return result;
        };

        if damage <= 0.0 {
            debug!(shot_id = %shot.shot_id, distance, "Hit past effective range, no damage");
            return result;
        }

        let outcome = receiver.take_damage(damage);
        result.damage_applied = true;
        result.target_killed = outcome.killed;

        info!(
            shooter_id = %shot.shooter_id,
            weapon_id = %shot.weapon_id,
            target_id = %target,
            damage,
            distance,
            killed = outcome.killed,
            "Hit confirmed"
        );

        let _ = self.events.send(CombatEvent::HitConfirmed {
            shooter_id: shot.shooter_id,
            weapon_id: shot.weapon_id,
            target_id: target,
            damage,
            point,
            killed: outcome.killed,
        });

        result
    }

    /// A trajectory ran out of range without hitting anything
    pub fn resolve_termination(&self, shot: &ShotContext) {
        debug!(shot_id = %shot.shot_id, pellet = shot.pellet_index, "Trajectory terminated");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::scene::InMemoryScene;

    fn approx(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-4
    }

    #[test]
    fn falloff_matches_reference_points() {
        assert!(approx(falloff_damage(30.0, 400.0, 0.0), 30.0));
        assert!(approx(falloff_damage(30.0, 400.0, 200.0), 30.0));
        assert!(approx(falloff_damage(30.0, 400.0, 300.0), 15.0));
        assert!(approx(falloff_damage(30.0, 400.0, 250.0), 22.5));
        assert!(approx(falloff_damage(30.0, 400.0, 400.0), 0.0));
    }

    #[test]
    fn falloff_is_clamped_past_range() {
        assert_eq!(falloff_damage(30.0, 400.0, 550.0), 0.0);
    }

    #[test]
    fn apply_damage_reports_death() {
        assert_eq!(apply_damage(50.0, 20.0), (30.0, false));
        assert_eq!(apply_damage(10.0, 20.0), (0.0, true));
    }

    fn shot(origin: Vec3) -> ShotContext {
        ShotContext {
            shot_id: Uuid::new_v4(),
            shooter_id: Uuid::new_v4(),
            weapon_id: Uuid::new_v4(),
            origin,
            base_damage: 30.0,
            range: 400.0,
            pellet_index: 0,
        }
    }

    #[test]
    fn hit_on_damageable_target_applies_falloff_damage() {
        let scene = Arc::new(InMemoryScene::new());
        let target = scene.spawn_target(Vec3::new(0.0, 0.0, -300.0), 100.0, 1.0);
        let (tx, mut rx) = broadcast::channel(8);
        let resolver = HitResolver::new(scene.clone(), tx);

        let shot = shot(Vec3::ZERO);
        let result = resolver.resolve_hit(&shot, Vec3::new(0.0, 0.0, -300.0), target);
        assert!(result.damage_applied);
        assert!(approx(result.damage, 15.0));
        assert!(approx(scene.health_of(target).unwrap(), 85.0));

        match rx.try_recv().unwrap() {
            CombatEvent::HitConfirmed { weapon_id, target_id, killed, .. } => {
                assert_eq!(weapon_id, shot.weapon_id);
                assert_eq!(target_id, target);
                assert!(!killed);
            }
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[test]
    fn hit_on_wall_applies_nothing() {
        let scene = Arc::new(InMemoryScene::new());
        let wall = scene.spawn_obstacle(Vec3::new(0.0, 0.0, -10.0), 2.0);
        let (tx, mut rx) = broadcast::channel(8);
        let resolver = HitResolver::new(scene, tx);

        let result = resolver.resolve_hit(&shot(Vec3::ZERO), Vec3::new(0.0, 0.0, -8.0), wall);
        assert!(!result.damage_applied);
        assert!(rx.try_recv().is_err());
    }
}
