//! Fire request validation gates
//!
//! Every gate is a pure function so the pipeline order in the authority
//! reads top to bottom and each rule is tested on its own.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use super::profile::ProfileError;
use super::scene::EntityId;

/// Max deviation from unit length accepted for a client direction
pub const UNIT_DIRECTION_TOLERANCE: f32 = 0.01;

/// Absorbs float noise at the anti-cheat cadence boundary
const CADENCE_EPSILON: f64 = 1e-9;

/// Advisory client context. Logged, never trusted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FireMetadata {
    pub fire_mode_hint: Option<String>,
    pub stance: Option<String>,
    pub movement_state: Option<String>,
}

/// Untrusted fire intent as received from a client
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FireRequest {
    pub origin: Option<Vec3>,
    pub direction: Option<Vec3>,
    /// Client clock in server-synchronized seconds
    pub client_time: Option<f64>,
    pub weapon_id: Option<EntityId>,
    pub metadata: Option<FireMetadata>,
}

/// A request that passed structural validation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ValidatedFire {
    pub origin: Vec3,
    /// Normalized aim direction
    pub direction: Vec3,
    pub client_time: f64,
    /// Length of the direction as sent by the client
    pub reported_length: f32,
}

/// How a rejection is classified
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectionCategory {
    /// Structurally invalid intent
    Malformed,
    /// Well formed but disallowed by timing, ammo or anti-cheat rules
    Policy,
    /// No usable weapon equipped
    Precondition,
    /// Weapon profile could not be resolved
    Configuration,
}

/// Why a fire or reload intent was dropped. Never sent to the client.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FireRejection {
    #[error("malformed request: {0}")]
    Malformed(&'static str),

    #[error("client clock off by {0:.3}s")]
    ClockDesync(f64),

    #[error("aim check failed: {0}")]
    AimCheck(&'static str),

    #[error("no tagged weapon equipped")]
    NoWeapon,

    #[error("requested weapon is not the equipped one")]
    WeaponMismatch,

    #[error("magazine empty")]
    OutOfAmmo,

    #[error("weapon still cooling down")]
    Cooldown,

    #[error("fire cadence too fast ({gap:.3}s < {min:.3}s)")]
    Cadence { gap: f64, min: f64 },

    #[error(transparent)]
    Profile(#[from] ProfileError),
}

impl FireRejection {
    pub fn category(&self) -> RejectionCategory {
        match self {
            Self::Malformed(_) => RejectionCategory::Malformed,
            Self::ClockDesync(_)
            | Self::AimCheck(_)
            | Self::OutOfAmmo
            | Self::Cooldown
            | Self::Cadence { .. } => RejectionCategory::Policy,
            Self::NoWeapon | Self::WeaponMismatch => RejectionCategory::Precondition,
            Self::Profile(_) => RejectionCategory::Configuration,
        }
    }
}

/// Step 1: required fields present and finite, direction normalizable
pub fn validate_structure(request: &FireRequest) -> Result<ValidatedFire, FireRejection> {
    let origin = request
        .origin
        .ok_or(FireRejection::Malformed("missing origin"))?;
    let direction = request
        .direction
        .ok_or(FireRejection::Malformed("missing direction"))?;
    let client_time = request
        .client_time
        .ok_or(FireRejection::Malformed("missing client time"))?;

    if !origin.is_finite() {
        return Err(FireRejection::Malformed("non-finite origin"));
    }
    if !client_time.is_finite() {
        return Err(FireRejection::Malformed("non-finite client time"));
    }

    let reported_length = direction.length();
    if !reported_length.is_finite() || reported_length <= f32::EPSILON {
        return Err(FireRejection::Malformed("degenerate direction"));
    }

    Ok(ValidatedFire {
        origin,
        direction: direction / reported_length,
        client_time,
        reported_length,
    })
}

/// Step 2: reject large client/server clock desync
pub fn check_clock(server_now: f64, client_time: f64, tolerance: f64) -> Result<(), FireRejection> {
    let desync = (server_now - client_time).abs();
    if desync > tolerance {
        return Err(FireRejection::ClockDesync(desync));
    }
    Ok(())
}

/// Optional aim sanity: unit-length direction and a muzzle near the body
pub fn validate_aim(
    fire: &ValidatedFire,
    character_position: Vec3,
    max_origin_offset: f32,
) -> Result<(), FireRejection> {
    if (fire.reported_length - 1.0).abs() > UNIT_DIRECTION_TOLERANCE {
        return Err(FireRejection::AimCheck("direction is not unit length"));
    }
    if fire.origin.distance(character_position) > max_origin_offset {
        return Err(FireRejection::AimCheck("origin too far from character"));
    }
    Ok(())
}

/// Step 7: independent cadence gate keyed on the player's last accepted
/// shot. `min_interval` is the weapon's smallest legitimate gap.
pub fn validate_cadence(
    now: f64,
    player_last_fire: Option<f64>,
    min_interval: f64,
    cooldown_tolerance: f64,
) -> Result<(), FireRejection> {
    let Some(last) = player_last_fire else {
        return Ok(());
    };
    let gap = now - last;
    let min = min_interval - cooldown_tolerance;
    if gap + CADENCE_EPSILON < min {
        return Err(FireRejection::Cadence { gap, min });
    }
    Ok(())
}
