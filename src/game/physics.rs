//! Ballistic caster port and the simulated projectile integrator

use glam::Vec3;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::trace;

use super::combat::{HitResolver, HitResult, ShotContext};
use super::scene::{Collider, EntityId, InMemoryScene};

/// Physics configuration attached to one cast
#[derive(Debug, Clone, PartialEq)]
pub struct CastBehavior {
    /// Entities the projectile passes through (the firer's own parts)
    pub exclusions: Vec<EntityId>,
    /// Constant acceleration, normally gravity
    pub acceleration: Vec3,
    /// Max travel distance before the cast terminates
    pub max_distance: f32,
}

/// Launch parameters for one trajectory
#[derive(Debug, Clone, PartialEq)]
pub struct CastRequest {
    pub origin: Vec3,
    pub direction: Vec3,
    pub speed: f32,
    pub behavior: CastBehavior,
}

/// Terminal event reported back by a caster
#[derive(Debug, Clone, PartialEq)]
pub enum Impact {
    Hit(HitResult),
    Terminated,
}

/// Physics engine that moves projectiles and reports how they end.
///
/// Implementations must eventually call exactly one of
/// [`ImpactHandle::hit`] or [`ImpactHandle::terminate`], from any thread.
pub trait BallisticCaster: Send + Sync {
    fn cast(&self, request: CastRequest, impact: ImpactHandle);
}

struct ImpactInner {
    shot: ShotContext,
    resolver: Arc<HitResolver>,
    resolved: AtomicBool,
}

/// One-shot completion handle for a single trajectory.
///
/// Cloneable so a caster may race a hit against its range cutoff; the
/// first call wins and every later call is ignored.
#[derive(Clone)]
pub struct ImpactHandle {
    inner: Arc<ImpactInner>,
}

impl ImpactHandle {
    pub fn new(shot: ShotContext, resolver: Arc<HitResolver>) -> Self {
        Self {
            inner: Arc::new(ImpactInner {
                shot,
                resolver,
                resolved: AtomicBool::new(false),
            }),
        }
    }

    pub fn shot(&self) -> &ShotContext {
        &self.inner.shot
    }

    #[cfg(test)]
    pub fn is_resolved(&self) -> bool {
        self.inner.resolved.load(Ordering::Acquire)
    }

    fn claim(&self) -> bool {
        self.inner
            .resolved
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Report a hit. Returns `None` if the trajectory was already resolved.
    pub fn hit(&self, point: Vec3, target: EntityId) -> Option<Impact> {
        if !self.claim() {
            return None;
        }
        let result = self.inner.resolver.resolve_hit(&self.inner.shot, point, target);
        Some(Impact::Hit(result))
    }

    /// Report that the trajectory reached max range
    pub fn terminate(&self) -> Option<Impact> {
        if !self.claim() {
            return None;
        }
        self.inner.resolver.resolve_termination(&self.inner.shot);
        Some(Impact::Terminated)
    }
}

/// Integration step for simulated projectiles (seconds)
pub const SIM_STEP: f32 = 1.0 / 120.0;

/// Upper bound on simulated flight time (30 seconds of steps)
const MAX_SIM_STEPS: u32 = 120 * 30;

/// Advance a projectile by one step under constant acceleration
pub fn step_projectile(position: Vec3, velocity: Vec3, acceleration: Vec3, dt: f32) -> (Vec3, Vec3) {
    let new_velocity = velocity + acceleration * dt;
    let new_position = position + velocity * dt + acceleration * (0.5 * dt * dt);
    (new_position, new_velocity)
}

/// First point where segment `from -> to` enters the sphere, as a
/// fraction of the segment in `[0, 1]`
pub fn segment_sphere_entry(from: Vec3, to: Vec3, center: Vec3, radius: f32) -> Option<f32> {
    let d = to - from;
    let f = from - center;
    let a = d.dot(d);
    let c = f.dot(f) - radius * radius;
    if c <= 0.0 {
        // Starts inside: only a hit if heading further in
        return (f.dot(d) < 0.0).then_some(0.0);
    }
    if a <= f32::EPSILON {
        return None;
    }
    let b = 2.0 * f.dot(d);
    let disc = b * b - 4.0 * a * c;
    if disc < 0.0 {
        return None;
    }
    let t = (-b - disc.sqrt()) / (2.0 * a);
    (0.0..=1.0).contains(&t).then_some(t)
}

/// Walk a projectile through `colliders` until it hits or runs out of
/// range. Returns the hit point and entity, if any.
pub fn trace_projectile(request: &CastRequest, colliders: &[Collider]) -> Option<(Vec3, EntityId)> {
    let mut position = request.origin;
    let mut velocity = request.direction * request.speed;
    let mut travelled = 0.0_f32;

    if request.speed <= 0.0 || request.behavior.max_distance <= 0.0 {
        return None;
    }

    let mut steps = 0;
    while travelled < request.behavior.max_distance && steps < MAX_SIM_STEPS {
        steps += 1;
        let (next, next_velocity) =
            step_projectile(position, velocity, request.behavior.acceleration, SIM_STEP);

        // Clip the last segment to the remaining range
        let segment = next - position;
        let remaining = request.behavior.max_distance - travelled;
        let seg_len = segment.length();
        let next = if seg_len > remaining && seg_len > 0.0 {
            position + segment * (remaining / seg_len)
        } else {
            next
        };

        let closest = colliders
            .iter()
            .filter(|c| !request.behavior.exclusions.contains(&c.entity))
            .filter_map(|c| {
                segment_sphere_entry(position, next, c.center, c.radius).map(|t| (t, c.entity))
            })
            .min_by(|a, b| a.0.total_cmp(&b.0));

        if let Some((t, entity)) = closest {
            return Some((position.lerp(next, t), entity));
        }

        travelled += (next - position).length();
        position = next;
        velocity = next_velocity;
    }

    None
}

/// Caster that integrates projectiles on the tokio runtime against the
/// spherical colliders of an [`InMemoryScene`]
pub struct SimulatedCaster {
    scene: Arc<InMemoryScene>,
}

impl SimulatedCaster {
    pub fn new(scene: Arc<InMemoryScene>) -> Self {
        Self { scene }
    }
}

impl BallisticCaster for SimulatedCaster {
    fn cast(&self, request: CastRequest, impact: ImpactHandle) {
        let scene = self.scene.clone();

        tokio::spawn(async move {
            let colliders = scene.colliders();
            match trace_projectile(&request, &colliders) {
                Some((point, entity)) => {
                    if let Some(Impact::Hit(hit)) = impact.hit(point, entity) {
                        trace!(
                            shot_id = %hit.shot_id,
                            shooter_id = %hit.shooter_id,
                            target_id = %hit.target_id,
                            distance = hit.distance,
                            damage = hit.damage,
                            applied = hit.damage_applied,
                            killed = hit.target_killed,
                            "Projectile hit"
                        );
                    }
                }
                None => {
                    impact.terminate();
                }
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::combat::CombatEvent;
    use crate::game::profile::WeaponType;
    use crate::game::scene::SceneGraph;
    use std::time::Duration;
    use tokio::sync::broadcast;
    use uuid::Uuid;

    fn request(max_distance: f32, exclusions: Vec<EntityId>) -> CastRequest {
        CastRequest {
            origin: Vec3::ZERO,
            direction: Vec3::NEG_Z,
            speed: 1000.0,
            behavior: CastBehavior {
                exclusions,
                acceleration: Vec3::new(0.0, -9.81, 0.0),
                max_distance,
            },
        }
    }

    fn handle(scene: Arc<InMemoryScene>) -> (ImpactHandle, broadcast::Receiver<CombatEvent>) {
        let (tx, rx) = broadcast::channel(8);
        let resolver = Arc::new(HitResolver::new(scene, tx));
        let shot = ShotContext {
            shot_id: Uuid::new_v4(),
            shooter_id: Uuid::new_v4(),
            weapon_id: Uuid::new_v4(),
            origin: Vec3::ZERO,
            base_damage: 30.0,
            range: 400.0,
            pellet_index: 0,
        };
        (ImpactHandle::new(shot, resolver), rx)
    }

    #[test]
    fn segment_hits_sphere_in_front() {
        let t = segment_sphere_entry(Vec3::ZERO, Vec3::new(0.0, 0.0, -10.0), Vec3::new(0.0, 0.0, -5.0), 1.0);
        assert!((t.unwrap() - 0.4).abs() < 1e-5);
        assert!(segment_sphere_entry(Vec3::ZERO, Vec3::new(0.0, 0.0, -3.0), Vec3::new(0.0, 0.0, -5.0), 1.0).is_none());
    }

    #[test]
    fn segment_leaving_an_overlapping_sphere_is_not_a_hit() {
        // Muzzle inside another body, shooting out of it
        assert!(segment_sphere_entry(Vec3::ZERO, Vec3::new(0.0, 5.0, 0.0), Vec3::ZERO, 1.0).is_none());
        assert!(segment_sphere_entry(Vec3::new(0.0, 0.5, 0.0), Vec3::new(0.0, 5.0, 0.0), Vec3::ZERO, 1.0).is_none());
        // Heading deeper in still counts
        assert_eq!(
            segment_sphere_entry(Vec3::new(0.0, 0.5, 0.0), Vec3::new(0.0, -5.0, 0.0), Vec3::ZERO, 1.0),
            Some(0.0)
        );
    }

    #[test]
    fn shot_out_of_an_overlapping_character_misses_it() {
        let scene = InMemoryScene::new();
        let shooter = Uuid::new_v4();
        let bystander = Uuid::new_v4();
        scene.spawn_player(shooter, Vec3::ZERO, WeaponType::Rifle);
        scene.spawn_player(bystander, Vec3::ZERO, WeaponType::Rifle);
        let own_body = scene.character(shooter).unwrap().entity;

        let mut up = request(400.0, vec![own_body]);
        up.direction = Vec3::Y;
        assert_eq!(trace_projectile(&up, &scene.colliders()), None);
    }

    #[test]
    fn trace_stops_at_first_collider_and_skips_exclusions() {
        let near = Collider { entity: Uuid::new_v4(), center: Vec3::new(0.0, 0.0, -20.0), radius: 1.0 };
        let far = Collider { entity: Uuid::new_v4(), center: Vec3::new(0.0, 0.0, -50.0), radius: 1.0 };

        let (_, hit) = trace_projectile(&request(400.0, vec![]), &[far, near]).unwrap();
        assert_eq!(hit, near.entity);

        let (point, hit) = trace_projectile(&request(400.0, vec![near.entity]), &[far, near]).unwrap();
        assert_eq!(hit, far.entity);
        assert!((point.z + 49.0).abs() < 0.1);
    }

    #[test]
    fn trace_respects_max_distance() {
        let target = Collider { entity: Uuid::new_v4(), center: Vec3::new(0.0, 0.0, -120.0), radius: 1.0 };
        assert!(trace_projectile(&request(100.0, vec![]), &[target]).is_none());
        assert!(trace_projectile(&request(150.0, vec![]), &[target]).is_some());
    }

    #[test]
    fn gravity_bends_the_path_down() {
        let (p, v) = step_projectile(Vec3::ZERO, Vec3::new(0.0, 0.0, -100.0), Vec3::new(0.0, -10.0, 0.0), 1.0);
        assert!(p.y < 0.0);
        assert!(v.y < 0.0);
    }

    #[test]
    fn impact_handle_resolves_exactly_once() {
        let scene = Arc::new(InMemoryScene::new());
        let target = scene.spawn_target(Vec3::new(0.0, 0.0, -10.0), 100.0, 1.0);
        let (impact, _rx) = handle(scene.clone());
        let racer = impact.clone();

        assert!(matches!(impact.hit(Vec3::new(0.0, 0.0, -9.0), target), Some(Impact::Hit(_))));
        assert!(racer.terminate().is_none());
        assert!(racer.hit(Vec3::new(0.0, 0.0, -9.0), target).is_none());
        assert!(impact.is_resolved());
        assert_eq!(scene.health_of(target), Some(70.0));
    }

    #[test]
    fn termination_blocks_later_hit() {
        let scene = Arc::new(InMemoryScene::new());
        let target = scene.spawn_target(Vec3::new(0.0, 0.0, -10.0), 100.0, 1.0);
        let (impact, _rx) = handle(scene.clone());

        assert_eq!(impact.terminate(), Some(Impact::Terminated));
        assert!(impact.hit(Vec3::new(0.0, 0.0, -9.0), target).is_none());
        assert_eq!(scene.health_of(target), Some(100.0));
    }

    #[tokio::test]
    async fn simulated_caster_reports_hit_asynchronously() {
        let scene = Arc::new(InMemoryScene::new());
        let target = scene.spawn_target(Vec3::new(0.0, 0.0, -30.0), 100.0, 1.0);
        let caster = SimulatedCaster::new(scene.clone());
        let (impact, mut rx) = handle(scene.clone());

        caster.cast(request(400.0, vec![]), impact.clone());

        let event = tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .expect("hit within timeout")
            .unwrap();
        assert!(matches!(event, CombatEvent::HitConfirmed { target_id, .. } if target_id == target));
        assert!(impact.is_resolved());
        assert!(scene.damage_receiver(target).is_some());
    }
}
