//! Scene/entity graph port consumed by the combat authority

use dashmap::DashMap;
use glam::Vec3;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use uuid::Uuid;

use super::combat::apply_damage;
use super::profile::{ProfileOverrides, WeaponType};

pub type PlayerId = Uuid;
pub type EntityId = Uuid;

/// Result of damaging an entity
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DamageOutcome {
    pub remaining_health: f32,
    pub killed: bool,
}

/// Health capability of a struck entity
pub trait DamageReceiver: Send + Sync {
    fn take_damage(&self, amount: f32) -> DamageOutcome;
}

/// Where a player's character currently stands
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CharacterInfo {
    pub entity: EntityId,
    pub position: Vec3,
}

/// Queries the authority needs from the host world
pub trait SceneGraph: Send + Sync {
    /// Whether the entity carries the weapon tag
    fn is_weapon(&self, entity: EntityId) -> bool;

    /// Attribute overrides set on a weapon entity (empty if none)
    fn weapon_overrides(&self, weapon: EntityId) -> ProfileOverrides;

    fn equipped_weapon(&self, player: PlayerId) -> Option<EntityId>;

    fn character(&self, player: PlayerId) -> Option<CharacterInfo>;

    /// Health capability of the entity owning a struck surface
    fn damage_receiver(&self, entity: EntityId) -> Option<Arc<dyn DamageReceiver>>;

    /// Folder holding in-flight projectiles, excluded from collisions
    fn projectile_container(&self) -> Option<EntityId> {
        None
    }
}

/// Simple health pool
#[derive(Debug)]
pub struct HealthPool {
    health: Mutex<f32>,
}

impl HealthPool {
    pub fn new(health: f32) -> Self {
        Self {
            health: Mutex::new(health),
        }
    }

    #[cfg(test)]
    pub fn health(&self) -> f32 {
        *self.health.lock()
    }
}

impl DamageReceiver for HealthPool {
    fn take_damage(&self, amount: f32) -> DamageOutcome {
        let mut health = self.health.lock();
        let (remaining, killed) = apply_damage(*health, amount);
        *health = remaining;
        DamageOutcome {
            remaining_health: remaining,
            killed,
        }
    }
}

#[derive(Debug, Clone)]
struct PlayerRecord {
    character: EntityId,
    position: Vec3,
    equipped: Option<EntityId>,
}

#[derive(Debug, Clone)]
struct WeaponRecord {
    tagged: bool,
    overrides: ProfileOverrides,
}

/// Spherical collider used by the simulated caster
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Collider {
    pub entity: EntityId,
    pub center: Vec3,
    pub radius: f32,
}

pub const CHARACTER_HEALTH: f32 = 100.0;
pub const CHARACTER_RADIUS: f32 = 1.0;

/// Distance between neighbouring spawn points
pub const SPAWN_SPACING: f32 = 5.0;
/// Spawn points per row of the spawn grid
const SPAWN_COLUMNS: u32 = 8;

/// In-process world used by the server binary and tests
#[derive(Default)]
pub struct InMemoryScene {
    players: DashMap<PlayerId, PlayerRecord>,
    weapons: DashMap<EntityId, WeaponRecord>,
    health: DashMap<EntityId, Arc<HealthPool>>,
    colliders: DashMap<EntityId, Collider>,
    projectile_folder: EntityId,
    spawns: AtomicU32,
}

impl InMemoryScene {
    pub fn new() -> Self {
        Self {
            projectile_folder: Uuid::new_v4(),
            ..Default::default()
        }
    }

    /// Next free point on the spawn grid. Points never repeat, so no two
    /// characters start overlapping.
    pub fn next_spawn_point(&self) -> Vec3 {
        let index = self.spawns.fetch_add(1, Ordering::Relaxed);
        let column = (index % SPAWN_COLUMNS) as f32;
        let row = (index / SPAWN_COLUMNS) as f32;
        Vec3::new(column * SPAWN_SPACING, 0.0, row * SPAWN_SPACING)
    }

    /// Add a character for `player` holding a freshly spawned weapon.
    /// Returns the weapon entity id.
    pub fn spawn_player(&self, player: PlayerId, position: Vec3, weapon_type: WeaponType) -> EntityId {
        let character = self.spawn_target(position, CHARACTER_HEALTH, CHARACTER_RADIUS);
        let weapon = self.spawn_weapon(ProfileOverrides {
            weapon_type: Some(weapon_type),
            ..Default::default()
        });
        self.players.insert(
            player,
            PlayerRecord {
                character,
                position,
                equipped: Some(weapon),
            },
        );
        weapon
    }

    /// Create a tagged weapon entity carrying `overrides`
    pub fn spawn_weapon(&self, overrides: ProfileOverrides) -> EntityId {
        let id = Uuid::new_v4();
        self.weapons.insert(
            id,
            WeaponRecord {
                tagged: true,
                overrides,
            },
        );
        id
    }

    /// An entity that exists but is not tagged as a weapon
    #[cfg(test)]
    pub fn spawn_untagged_tool(&self) -> EntityId {
        let id = Uuid::new_v4();
        self.weapons.insert(
            id,
            WeaponRecord {
                tagged: false,
                overrides: ProfileOverrides::default(),
            },
        );
        id
    }

    /// Damageable sphere (dummy, crate, character body)
    pub fn spawn_target(&self, center: Vec3, health: f32, radius: f32) -> EntityId {
        let id = Uuid::new_v4();
        self.health.insert(id, Arc::new(HealthPool::new(health)));
        self.colliders.insert(id, Collider { entity: id, center, radius });
        id
    }

    /// Non-damageable sphere (wall, rock)
    #[cfg(test)]
    pub fn spawn_obstacle(&self, center: Vec3, radius: f32) -> EntityId {
        let id = Uuid::new_v4();
        self.colliders.insert(id, Collider { entity: id, center, radius });
        id
    }

    #[cfg(test)]
    pub fn equip(&self, player: PlayerId, weapon: Option<EntityId>) {
        if let Some(mut record) = self.players.get_mut(&player) {
            record.equipped = weapon;
        }
    }

    /// Remove the player's character and the weapon it held. Returns the
    /// destroyed weapon entity, if any.
    pub fn remove_player(&self, player: PlayerId) -> Option<EntityId> {
        let (_, record) = self.players.remove(&player)?;
        self.health.remove(&record.character);
        self.colliders.remove(&record.character);
        let weapon = record.equipped?;
        self.weapons.remove(&weapon).map(|_| weapon)
    }

    #[cfg(test)]
    pub fn health_of(&self, entity: EntityId) -> Option<f32> {
        self.health.get(&entity).map(|pool| pool.health())
    }

    pub fn colliders(&self) -> Vec<Collider> {
        self.colliders.iter().map(|c| *c.value()).collect()
    }

    pub fn player_count(&self) -> usize {
        self.players.len()
    }
}

impl SceneGraph for InMemoryScene {
    fn is_weapon(&self, entity: EntityId) -> bool {
        self.weapons.get(&entity).map(|w| w.tagged).unwrap_or(false)
    }

    fn weapon_overrides(&self, weapon: EntityId) -> ProfileOverrides {
        self.weapons
            .get(&weapon)
            .map(|w| w.overrides.clone())
            .unwrap_or_default()
    }

    fn equipped_weapon(&self, player: PlayerId) -> Option<EntityId> {
        self.players.get(&player).and_then(|p| p.equipped)
    }

    fn character(&self, player: PlayerId) -> Option<CharacterInfo> {
        self.players.get(&player).map(|p| CharacterInfo {
            entity: p.character,
            position: p.position,
        })
    }

    fn damage_receiver(&self, entity: EntityId) -> Option<Arc<dyn DamageReceiver>> {
        self.health
            .get(&entity)
            .map(|pool| pool.value().clone() as Arc<dyn DamageReceiver>)
    }

    fn projectile_container(&self) -> Option<EntityId> {
        Some(self.projectile_folder)
    }
}
