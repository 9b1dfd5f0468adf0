//! Trajectory generation: aim ray + behavior + stats -> bullet paths

use glam::{Vec2, Vec3};
use rand::Rng;

use super::behavior::FireBehavior;
use super::profile::WeaponProfile;

pub const WORLD_UP: Vec3 = Vec3::Y;

/// One bullet or pellet of a single discharge
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Trajectory {
    pub origin: Vec3,
    /// Unit direction with spread applied
    pub direction: Vec3,
    pub velocity: Vec3,
    pub spread: Vec2,
    pub pellet_index: u32,
}

/// Right and up axes around `forward`.
///
/// Falls back to a secondary axis when `forward` is (anti)parallel to
/// world up, where the cross product would vanish.
pub fn local_basis(forward: Vec3) -> (Vec3, Vec3) {
    let mut right = forward.cross(WORLD_UP);
    if right.length_squared() < 1e-6 {
        right = forward.cross(Vec3::X);
    }
    let right = right.normalize();
    let up = right.cross(forward);
    (right, up)
}

/// Rotate a unit direction by a spread offset in its local basis
pub fn apply_spread(forward: Vec3, spread: Vec2) -> Vec3 {
    if spread == Vec2::ZERO {
        return forward;
    }
    let (right, up) = local_basis(forward);
    (forward + right * spread.x + up * spread.y).normalize()
}

/// Build every trajectory for one trigger pull.
///
/// `base_direction` must already be a unit vector.
pub fn fire<R: Rng + ?Sized>(
    origin: Vec3,
    base_direction: Vec3,
    profile: &WeaponProfile,
    behavior: &FireBehavior,
    rng: &mut R,
) -> Vec<Trajectory> {
    let build = |pellet_index: u32, spread: Vec2| {
        let direction = apply_spread(base_direction, spread);
        Trajectory {
            origin,
            direction,
            velocity: direction * profile.bullet_velocity,
            spread,
            pellet_index,
        }
    };

    let count = behavior.bullet_count();
    if count <= 1 {
        return vec![build(0, behavior.spread_pattern(0, rng))];
    }

    (0..count)
        .map(|i| build(i, behavior.spread_pattern(i, rng)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::profile::{ProfileOverrides, WeaponType};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn setup(weapon_type: WeaponType) -> (WeaponProfile, FireBehavior) {
        let profile = WeaponProfile::resolve(&ProfileOverrides {
            weapon_type: Some(weapon_type),
            ..Default::default()
        })
        .unwrap();
        let behavior = FireBehavior::for_profile(&profile, 0.08);
        (profile, behavior)
    }

    #[test]
    fn basis_is_orthonormal() {
        for forward in [Vec3::NEG_Z, Vec3::X, Vec3::new(1.0, 1.0, 0.3).normalize()] {
            let (right, up) = local_basis(forward);
            assert!((right.length() - 1.0).abs() < 1e-5);
            assert!((up.length() - 1.0).abs() < 1e-5);
            assert!(right.dot(forward).abs() < 1e-5);
            assert!(up.dot(forward).abs() < 1e-5);
        }
    }

    #[test]
    fn basis_survives_vertical_aim() {
        for forward in [Vec3::Y, Vec3::NEG_Y] {
            let (right, up) = local_basis(forward);
            assert!(right.is_finite() && up.is_finite());
            assert!((right.length() - 1.0).abs() < 1e-5);
        }
    }

    #[test]
    fn rifle_fast_path_is_a_single_straight_shot() {
        let (profile, behavior) = setup(WeaponType::Rifle);
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let shots = fire(Vec3::ZERO, Vec3::NEG_Z, &profile, &behavior, &mut rng);
        assert_eq!(shots.len(), 1);
        let shot = shots[0];
        assert_eq!(shot.pellet_index, 0);
        assert_eq!(shot.direction, Vec3::NEG_Z);
        assert_eq!(shot.velocity, Vec3::NEG_Z * profile.bullet_velocity);
    }

    #[test]
    fn shotgun_emits_one_trajectory_per_pellet() {
        let (profile, behavior) = setup(WeaponType::Shotgun);
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        let shots = fire(Vec3::ONE, Vec3::NEG_Z, &profile, &behavior, &mut rng);
        assert_eq!(shots.len(), 8);
        for (i, shot) in shots.iter().enumerate() {
            assert_eq!(shot.pellet_index, i as u32);
            assert_eq!(shot.origin, Vec3::ONE);
            assert!((shot.direction.length() - 1.0).abs() < 1e-5);
            assert!(shot.spread.length() <= profile.spread.hip_fire + 1e-6);
            assert!((shot.velocity.length() - profile.bullet_velocity).abs() < 1e-2);
        }
    }

    #[test]
    fn spread_offsets_direction_in_local_plane() {
        let dir = apply_spread(Vec3::NEG_Z, Vec2::new(0.1, 0.0));
        // -Z x +Y = +X
        assert!(dir.x > 0.0);
        assert!(dir.z < 0.0);
        assert!((dir.length() - 1.0).abs() < 1e-5);
    }
}
