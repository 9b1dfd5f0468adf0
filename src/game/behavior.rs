//! Fire-mode behaviors: timing, projectile count and dispersion per mode

use glam::Vec2;
use rand::Rng;

use super::profile::{FireMode, WeaponProfile, WeaponType};

/// Absorbs float noise so a shot landing exactly on the delay is accepted
const TIMING_EPSILON: f64 = 1e-9;

/// Strategy selected once per weapon from its resolved profile
#[derive(Debug, Clone, PartialEq)]
pub enum FireBehavior {
    /// Also covers bolt-action, which only differs by its fire rate
    SemiAuto { fire_delay: f64 },
    FullAuto { fire_delay: f64 },
    Burst(BurstState),
    Shotgun {
        fire_delay: f64,
        pellets: u32,
        spread_radius: f32,
    },
}

/// Burst bookkeeping, owned by the weapon's runtime state
#[derive(Debug, Clone, PartialEq)]
pub struct BurstState {
    /// Cooldown between bursts
    pub fire_delay: f64,
    pub burst_count: u32,
    /// Fixed spacing of shots inside one burst
    pub burst_interval: f64,
    pub shots_fired: u32,
    /// Start of the current burst, `None` before the first trigger pull
    pub burst_start: Option<f64>,
}

impl BurstState {
    fn in_progress(&self) -> bool {
        self.burst_start.is_some() && self.shots_fired < self.burst_count
    }
}

impl FireBehavior {
    pub fn for_profile(profile: &WeaponProfile, burst_interval: f64) -> Self {
        let fire_delay = profile.fire_delay();

        if profile.weapon_type == WeaponType::Shotgun {
            return Self::Shotgun {
                fire_delay,
                pellets: profile.bullet_count,
                spread_radius: profile.spread.hip_fire,
            };
        }

        match profile.fire_mode {
            FireMode::SemiAuto | FireMode::Bolt => Self::SemiAuto { fire_delay },
            FireMode::FullAuto => Self::FullAuto { fire_delay },
            FireMode::Burst => Self::Burst(BurstState {
                fire_delay,
                burst_count: profile.burst_count.max(1),
                burst_interval,
                shots_fired: 0,
                burst_start: None,
            }),
        }
    }

    /// Whether a shot at `now` respects this mode's timing
    pub fn can_fire(&self, last_shot: Option<f64>, now: f64) -> bool {
        match self {
            Self::Burst(burst) if burst.in_progress() => {
                let start = burst.burst_start.unwrap_or(now);
                now - start + TIMING_EPSILON >= burst.burst_interval * burst.shots_fired as f64
            }
            _ => match last_shot {
                Some(last) => now - last + TIMING_EPSILON >= self.fire_delay(),
                None => true,
            },
        }
    }

    /// Seconds between trigger pulls (between bursts for burst mode)
    pub fn fire_delay(&self) -> f64 {
        match self {
            Self::SemiAuto { fire_delay }
            | Self::FullAuto { fire_delay }
            | Self::Shotgun { fire_delay, .. } => *fire_delay,
            Self::Burst(burst) => burst.fire_delay,
        }
    }

    /// Smallest legitimate gap between two accepted shots. Used by the
    /// anti-cheat gate, which must not depend on burst bookkeeping.
    pub fn min_shot_interval(&self) -> f64 {
        match self {
            Self::Burst(burst) => burst.fire_delay.min(burst.burst_interval),
            _ => self.fire_delay(),
        }
    }

    pub fn is_auto_fire(&self) -> bool {
        matches!(self, Self::FullAuto { .. })
    }

    pub fn bullet_count(&self) -> u32 {
        match self {
            Self::Shotgun { pellets, .. } => *pellets,
            _ => 1,
        }
    }

    /// Angular offset for one pellet. Shotgun pellets get an independent
    /// uniform polar sample on every call; every other mode is exact.
    pub fn spread_pattern<R: Rng + ?Sized>(&self, _pellet_index: u32, rng: &mut R) -> Vec2 {
        match self {
            Self::Shotgun { spread_radius, .. } => {
                let angle = rng.gen::<f32>() * std::f32::consts::TAU;
                let radius = rng.gen::<f32>() * *spread_radius;
                Vec2::new(radius * angle.cos(), radius * angle.sin())
            }
            _ => Vec2::ZERO,
        }
    }

    /// Record an accepted shot. Only burst mode keeps state.
    pub fn register_shot(&mut self, now: f64) {
        if let Self::Burst(burst) = self {
            if !burst.in_progress() {
                burst.shots_fired = 0;
                burst.burst_start = Some(now);
            }
            burst.shots_fired += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::profile::ProfileOverrides;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn behavior(overrides: ProfileOverrides) -> FireBehavior {
        let profile = WeaponProfile::resolve(&overrides).unwrap();
        FireBehavior::for_profile(&profile, 0.08)
    }

    fn typed(weapon_type: WeaponType) -> ProfileOverrides {
        ProfileOverrides {
            weapon_type: Some(weapon_type),
            ..Default::default()
        }
    }

    #[test]
    fn semi_and_full_auto_gate_on_fire_delay_inclusive() {
        for overrides in [typed(WeaponType::Pistol), typed(WeaponType::Rifle), typed(WeaponType::Sniper)] {
            let b = behavior(overrides);
            let delay = b.fire_delay();
            assert!(b.can_fire(None, 0.0));
            assert!(!b.can_fire(Some(10.0), 10.0 + delay * 0.5));
            assert!(b.can_fire(Some(10.0), 10.0 + delay));
            assert!(b.can_fire(Some(10.0), 10.0 + delay + 0.01));
        }
    }

    #[test]
    fn mode_flags() {
        assert!(behavior(typed(WeaponType::Rifle)).is_auto_fire());
        assert!(!behavior(typed(WeaponType::Pistol)).is_auto_fire());
        // Bolt maps onto semi-auto rules
        assert!(matches!(
            behavior(typed(WeaponType::Sniper)),
            FireBehavior::SemiAuto { .. }
        ));
        let burst = behavior(ProfileOverrides {
            fire_mode: Some(FireMode::Burst),
            ..Default::default()
        });
        assert!(matches!(burst, FireBehavior::Burst(_)));
        assert_eq!(burst.bullet_count(), 1);
    }

    #[test]
    fn burst_of_three_then_cooldown() {
        let mut b = behavior(ProfileOverrides {
            fire_mode: Some(FireMode::Burst),
            burst_count: Some(3),
            fire_rate: Some(120.0), // 0.5s between bursts
            ..Default::default()
        });

        let mut last = None;
        let mut accepted = Vec::new();
        let mut t = 0.0;
        while t < 0.45 {
            if b.can_fire(last, t) {
                b.register_shot(t);
                last = Some(t);
                accepted.push(t);
            }
            t += 0.01;
        }
        assert_eq!(accepted.len(), 3);

        // Next burst only once fire_delay has passed since the last shot
        let last_shot = *accepted.last().unwrap();
        assert!(!b.can_fire(last, last_shot + 0.49));
        assert!(b.can_fire(last, last_shot + 0.5));
        b.register_shot(last_shot + 0.5);
        match &b {
            FireBehavior::Burst(state) => {
                assert_eq!(state.shots_fired, 1);
                assert_eq!(state.burst_start, Some(last_shot + 0.5));
            }
            other => panic!("expected burst, got {other:?}"),
        }
    }

    #[test]
    fn intra_burst_shots_are_spaced_from_burst_start() {
        let mut b = behavior(ProfileOverrides {
            fire_mode: Some(FireMode::Burst),
            ..Default::default()
        });
        b.register_shot(1.0);
        assert!(!b.can_fire(Some(1.0), 1.05));
        assert!(b.can_fire(Some(1.0), 1.08));
        b.register_shot(1.08);
        assert!(!b.can_fire(Some(1.08), 1.15));
        assert!(b.can_fire(Some(1.08), 1.16));
    }

    #[test]
    fn shotgun_pellets_stay_inside_hip_spread() {
        let b = behavior(typed(WeaponType::Shotgun));
        assert_eq!(b.bullet_count(), 8);
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let offsets: Vec<Vec2> = (0..b.bullet_count())
            .map(|i| b.spread_pattern(i, &mut rng))
            .collect();
        for offset in &offsets {
            assert!(offset.length() <= 0.12 + 1e-6);
        }
        // Independent samples, not one shared offset
        assert!(offsets.windows(2).any(|w| w[0] != w[1]));
    }

    #[test]
    fn shotgun_pellet_override_wins_over_preset() {
        let single = behavior(ProfileOverrides {
            weapon_type: Some(WeaponType::Shotgun),
            bullet_count: Some(1),
            ..Default::default()
        });
        assert_eq!(single.bullet_count(), 1);

        let heavy = behavior(ProfileOverrides {
            weapon_type: Some(WeaponType::Shotgun),
            bullet_count: Some(12),
            ..Default::default()
        });
        assert_eq!(heavy.bullet_count(), 12);
    }

    #[test]
    fn single_bullet_modes_have_no_spread() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let b = behavior(typed(WeaponType::Smg));
        assert_eq!(b.spread_pattern(0, &mut rng), Vec2::ZERO);
    }
}
