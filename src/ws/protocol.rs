//! WebSocket protocol message definitions
//! These are the wire types for client-server communication

use glam::Vec3;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::game::{CombatEvent, FireRequest};

/// Messages sent from client to server
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMsg {
    /// Request to discharge the equipped weapon once
    FireBullet(FireRequest),

    /// Refill the equipped weapon
    ReloadWeapon,

    /// Ping for latency and clock sync
    Ping {
        /// Client timestamp
        t: u64,
    },
}

/// Messages sent from server to client
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMsg {
    /// Welcome message after connection
    Welcome {
        player_id: Uuid,
        weapon_id: Uuid,
        /// Server combat clock in seconds; fire requests are stamped with it
        server_time: f64,
    },

    /// A shot was accepted
    BulletFired {
        shooter_id: Uuid,
        weapon_id: Uuid,
        origin: Vec3,
        directions: Vec<Vec3>,
        speed: f32,
        /// Client may keep repeating the shot while the trigger is held
        auto_fire: bool,
    },

    /// A bullet damaged something
    HitConfirmed {
        shooter_id: Uuid,
        weapon_id: Uuid,
        target_id: Uuid,
        damage: f32,
        point: Vec3,
        killed: bool,
    },

    /// A weapon magazine was refilled
    WeaponReloaded {
        player_id: Uuid,
        weapon_id: Uuid,
        ammo: u32,
    },

    /// Pong response
    Pong {
        /// Echo back client timestamp
        t: u64,
        server_time: f64,
    },
}

impl From<CombatEvent> for ServerMsg {
    fn from(event: CombatEvent) -> Self {
        match event {
            CombatEvent::BulletFired {
                shooter_id,
                weapon_id,
                origin,
                directions,
                speed,
                auto_fire,
            } => Self::BulletFired {
                shooter_id,
                weapon_id,
                origin,
                directions,
                speed,
                auto_fire,
            },
            CombatEvent::HitConfirmed {
                shooter_id,
                weapon_id,
                target_id,
                damage,
                point,
                killed,
            } => Self::HitConfirmed {
                shooter_id,
                weapon_id,
                target_id,
                damage,
                point,
                killed,
            },
            CombatEvent::WeaponReloaded {
                player_id,
                weapon_id,
                ammo,
            } => Self::WeaponReloaded {
                player_id,
                weapon_id,
                ammo,
            },
        }
    }
}
