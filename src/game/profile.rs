//! Weapon profile resolution
//!
//! A profile is built once per weapon entity by layering three sources,
//! highest priority first: the entity's own attribute overrides, the
//! preset for its weapon type, and the global defaults. The first
//! source that carries a value for a field wins.

use serde::{Deserialize, Serialize};

/// Weapon families with their own stat presets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeaponType {
    Rifle,
    Pistol,
    Shotgun,
    Sniper,
    Smg,
}

/// Trigger behavior declared by a profile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FireMode {
    SemiAuto,
    FullAuto,
    Burst,
    /// Same gating as semi-auto, only with a slower fire rate
    Bolt,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Recoil {
    pub horizontal: f32,
    pub vertical: f32,
    pub recovery: f32,
}

/// Dispersion radii as tangent-plane offsets
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Spread {
    pub hip_fire: f32,
    pub ads: f32,
}

/// Fully resolved, immutable weapon stats
#[derive(Debug, Clone, PartialEq)]
pub struct WeaponProfile {
    pub weapon_type: WeaponType,
    /// Damage per bullet (per pellet for shotguns)
    pub damage: f32,
    /// Max travel distance, also the falloff reference
    pub range: f32,
    /// Rounds per minute
    pub fire_rate: f32,
    /// Slack in seconds allowed by the anti-cheat cadence gate
    pub cooldown_tolerance: f32,
    pub bullet_velocity: f32,
    pub fire_mode: FireMode,
    pub burst_count: u32,
    /// Pellets per trigger pull
    pub bullet_count: u32,
    pub magazine_size: u32,
    pub reload_time: f32,
    pub ads_speed: f32,
    pub recoil: Recoil,
    pub spread: Spread,
}

impl WeaponProfile {
    /// Seconds between shots derived from the fire rate
    pub fn fire_delay(&self) -> f64 {
        60.0 / self.fire_rate as f64
    }

    /// Resolve a profile from an entity's overrides
    pub fn resolve(overrides: &ProfileOverrides) -> Result<Self, ProfileError> {
        let defaults = ProfileOverrides::global_defaults();
        let weapon_type = overrides
            .weapon_type
            .or(defaults.weapon_type)
            .ok_or(ProfileError::MissingField("weapon_type"))?;

        overrides
            .clone()
            .or(ProfileOverrides::preset(weapon_type))
            .or(defaults)
            .finish()
    }
}

/// A partial profile: one layer of the resolution chain.
///
/// Weapon entities expose their attribute overrides in this shape, and
/// the preset and default tables are expressed the same way.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ProfileOverrides {
    pub weapon_type: Option<WeaponType>,
    pub damage: Option<f32>,
    pub range: Option<f32>,
    pub fire_rate: Option<f32>,
    pub cooldown_tolerance: Option<f32>,
    pub bullet_velocity: Option<f32>,
    pub fire_mode: Option<FireMode>,
    pub burst_count: Option<u32>,
    pub bullet_count: Option<u32>,
    pub magazine_size: Option<u32>,
    pub reload_time: Option<f32>,
    pub ads_speed: Option<f32>,
    pub recoil: Option<Recoil>,
    pub spread: Option<Spread>,
}

impl ProfileOverrides {
    /// Bottom of the chain: every field is populated
    pub fn global_defaults() -> Self {
        Self {
            weapon_type: Some(WeaponType::Rifle),
            damage: Some(25.0),
            range: Some(300.0),
            fire_rate: Some(400.0),
            cooldown_tolerance: Some(0.05),
            bullet_velocity: Some(1000.0),
            fire_mode: Some(FireMode::SemiAuto),
            burst_count: Some(3),
            bullet_count: Some(1),
            magazine_size: Some(30),
            reload_time: Some(2.5),
            ads_speed: Some(1.0),
            recoil: Some(Recoil {
                horizontal: 1.0,
                vertical: 2.0,
                recovery: 0.9,
            }),
            spread: Some(Spread {
                hip_fire: 0.05,
                ads: 0.02,
            }),
        }
    }

    /// Stat preset for a weapon family
    pub fn preset(weapon_type: WeaponType) -> Self {
        match weapon_type {
            WeaponType::Rifle => Self {
                damage: Some(30.0),
                range: Some(400.0),
                fire_rate: Some(500.0),
                fire_mode: Some(FireMode::FullAuto),
                magazine_size: Some(30),
                ..Self::default()
            },
            WeaponType::Pistol => Self {
                damage: Some(25.0),
                range: Some(200.0),
                fire_rate: Some(300.0),
                fire_mode: Some(FireMode::SemiAuto),
                magazine_size: Some(12),
                reload_time: Some(1.5),
                ads_speed: Some(1.4),
                ..Self::default()
            },
            WeaponType::Shotgun => Self {
                damage: Some(12.0),
                range: Some(100.0),
                fire_rate: Some(70.0),
                fire_mode: Some(FireMode::SemiAuto),
                bullet_count: Some(8),
                magazine_size: Some(6),
                reload_time: Some(3.0),
                spread: Some(Spread {
                    hip_fire: 0.12,
                    ads: 0.08,
                }),
                ..Self::default()
            },
            WeaponType::Sniper => Self {
                damage: Some(100.0),
                range: Some(1000.0),
                fire_rate: Some(40.0),
                bullet_velocity: Some(3000.0),
                fire_mode: Some(FireMode::Bolt),
                magazine_size: Some(5),
                reload_time: Some(3.5),
                ads_speed: Some(0.6),
                spread: Some(Spread {
                    hip_fire: 0.1,
                    ads: 0.0,
                }),
                ..Self::default()
            },
            WeaponType::Smg => Self {
                damage: Some(18.0),
                range: Some(250.0),
                fire_rate: Some(800.0),
                fire_mode: Some(FireMode::FullAuto),
                magazine_size: Some(35),
                reload_time: Some(2.0),
                ads_speed: Some(1.2),
                ..Self::default()
            },
        }
    }

    /// Fill every missing field of `self` from `lower`
    pub fn or(self, lower: Self) -> Self {
        Self {
            weapon_type: self.weapon_type.or(lower.weapon_type),
            damage: self.damage.or(lower.damage),
            range: self.range.or(lower.range),
            fire_rate: self.fire_rate.or(lower.fire_rate),
            cooldown_tolerance: self.cooldown_tolerance.or(lower.cooldown_tolerance),
            bullet_velocity: self.bullet_velocity.or(lower.bullet_velocity),
            fire_mode: self.fire_mode.or(lower.fire_mode),
            burst_count: self.burst_count.or(lower.burst_count),
            bullet_count: self.bullet_count.or(lower.bullet_count),
            magazine_size: self.magazine_size.or(lower.magazine_size),
            reload_time: self.reload_time.or(lower.reload_time),
            ads_speed: self.ads_speed.or(lower.ads_speed),
            recoil: self.recoil.or(lower.recoil),
            spread: self.spread.or(lower.spread),
        }
    }

    /// Turn a fully layered set of overrides into a profile
    pub fn finish(self) -> Result<WeaponProfile, ProfileError> {
        let profile = WeaponProfile {
            weapon_type: self.weapon_type.ok_or(ProfileError::MissingField("weapon_type"))?,
            damage: self.damage.ok_or(ProfileError::MissingField("damage"))?,
            range: self.range.ok_or(ProfileError::MissingField("range"))?,
            fire_rate: self.fire_rate.ok_or(ProfileError::MissingField("fire_rate"))?,
            cooldown_tolerance: self
                .cooldown_tolerance
                .ok_or(ProfileError::MissingField("cooldown_tolerance"))?,
            bullet_velocity: self
                .bullet_velocity
                .ok_or(ProfileError::MissingField("bullet_velocity"))?,
            fire_mode: self.fire_mode.ok_or(ProfileError::MissingField("fire_mode"))?,
            burst_count: self.burst_count.ok_or(ProfileError::MissingField("burst_count"))?,
            bullet_count: self.bullet_count.ok_or(ProfileError::MissingField("bullet_count"))?,
            magazine_size: self
                .magazine_size
                .ok_or(ProfileError::MissingField("magazine_size"))?,
            reload_time: self.reload_time.ok_or(ProfileError::MissingField("reload_time"))?,
            ads_speed: self.ads_speed.ok_or(ProfileError::MissingField("ads_speed"))?,
            recoil: self.recoil.ok_or(ProfileError::MissingField("recoil"))?,
            spread: self.spread.ok_or(ProfileError::MissingField("spread"))?,
        };

        validate(&profile)?;
        Ok(profile)
    }
}

fn validate(profile: &WeaponProfile) -> Result<(), ProfileError> {
    let positive = [
        ("damage", profile.damage),
        ("range", profile.range),
        ("fire_rate", profile.fire_rate),
        ("bullet_velocity", profile.bullet_velocity),
    ];
    for (field, value) in positive {
        if !(value.is_finite() && value > 0.0) {
            return Err(ProfileError::InvalidField(field));
        }
    }

    let at_least_one = [
        ("burst_count", profile.burst_count),
        ("bullet_count", profile.bullet_count),
        ("magazine_size", profile.magazine_size),
    ];
    for (field, value) in at_least_one {
        if value == 0 {
            return Err(ProfileError::InvalidField(field));
        }
    }

    if !(profile.cooldown_tolerance >= 0.0 && profile.spread.hip_fire >= 0.0) {
        return Err(ProfileError::InvalidField("cooldown_tolerance/spread"));
    }

    Ok(())
}

/// Profile resolution failures. With the global defaults in place these
/// only arise from bad override data on a weapon entity.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ProfileError {
    #[error("weapon profile field `{0}` could not be resolved")]
    MissingField(&'static str),

    #[error("weapon profile field `{0}` is out of range")]
    InvalidField(&'static str),
}
