//! Mutable per-weapon state

use std::sync::Arc;

use super::behavior::FireBehavior;
use super::profile::WeaponProfile;

/// Live state of one weapon entity, created on its first fire or reload
#[derive(Debug, Clone)]
pub struct WeaponRuntimeState {
    pub profile: Arc<WeaponProfile>,
    pub behavior: FireBehavior,
    pub current_ammo: u32,
    /// Monotonic seconds of the last accepted shot
    pub last_shot_time: Option<f64>,
}

impl WeaponRuntimeState {
    /// Fresh state with a full magazine
    pub fn new(profile: WeaponProfile, burst_interval: f64) -> Self {
        let behavior = FireBehavior::for_profile(&profile, burst_interval);
        Self {
            current_ammo: profile.magazine_size,
            profile: Arc::new(profile),
            behavior,
            last_shot_time: None,
        }
    }

    pub fn has_ammo(&self) -> bool {
        self.current_ammo > 0
    }

    /// Take one round. Fails without touching state when empty.
    pub fn consume_ammo(&mut self) -> bool {
        match self.current_ammo.checked_sub(1) {
            Some(remaining) => {
                self.current_ammo = remaining;
                true
            }
            None => false,
        }
    }

    pub fn can_fire(&self, now: f64) -> bool {
        self.behavior.can_fire(self.last_shot_time, now)
    }

    /// Refill to a full magazine
    pub fn reload(&mut self) {
        self.current_ammo = self.profile.magazine_size;
    }

    /// Commit an accepted shot
    pub fn record_shot(&mut self, now: f64) {
        self.behavior.register_shot(now);
        self.last_shot_time = Some(now);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::profile::{ProfileOverrides, WeaponType};

    fn pistol() -> WeaponRuntimeState {
        let profile = WeaponProfile::resolve(&ProfileOverrides {
            weapon_type: Some(WeaponType::Pistol),
            ..Default::default()
        })
        .unwrap();
        WeaponRuntimeState::new(profile, 0.08)
    }

    #[test]
    fn starts_with_full_magazine() {
        let state = pistol();
        assert_eq!(state.current_ammo, 12);
        assert!(state.last_shot_time.is_none());
        assert!(state.can_fire(0.0));
    }

    #[test]
    fn ammo_never_goes_negative() {
        let mut state = pistol();
        for _ in 0..12 {
            assert!(state.consume_ammo());
        }
        assert!(!state.has_ammo());
        assert!(!state.consume_ammo());
        assert_eq!(state.current_ammo, 0);
    }

    #[test]
    fn reload_refills_regardless_of_remaining() {
        let mut state = pistol();
        state.consume_ammo();
        state.reload();
        assert_eq!(state.current_ammo, 12);
        state.reload();
        assert_eq!(state.current_ammo, 12);
    }

    #[test]
    fn record_shot_arms_cooldown() {
        let mut state = pistol();
        state.record_shot(5.0);
        assert_eq!(state.last_shot_time, Some(5.0));
        assert!(!state.can_fire(5.1));
        assert!(state.can_fire(5.2));
    }
}
