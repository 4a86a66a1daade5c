// enemy.rs - Enemy component definitions: stats, health, and the
// single-slot damage mailbox.

use bevy::prelude::*;

use crate::data::EnemyStatsDef;
use crate::spawner::WaveMultipliers;

/// Marker for an enemy that is live in the world. Pool residents lose this
/// marker, so every gameplay query that iterates enemies skips them.
#[derive(Component)]
pub struct Enemy;

/// Marker for a pool resident. Mutually exclusive with `Enemy`.
#[derive(Component)]
pub struct Pooled;

/// While present, the player's weapon can target this enemy. Removed when
/// the Death state disables the hit collider.
#[derive(Component)]
pub struct Hittable;

#[derive(Component, Clone, Debug)]
pub struct EnemyKind(pub String);

/// Per-instance combat stats: the catalog entry with the current wave's
/// multipliers baked in at checkout time.
#[derive(Component, Clone, Debug)]
pub struct EnemyStats {
    pub max_hp: f32,
    pub attack_damage: f32,
    pub attack_range: f32,
    pub attack_cooldown: f32,
    pub hit_stun: f32,
    pub move_speed: f32,
    pub turn_speed: f32,
    pub xp_reward: f32,
}

impl EnemyStats {
    pub fn from_def(def: &EnemyStatsDef, mults: &WaveMultipliers) -> Self {
        Self {
            max_hp: def.max_hp * mults.hp,
            attack_damage: def.attack_damage * mults.damage,
            attack_range: def.attack_range,
            attack_cooldown: def.attack_cooldown,
            hit_stun: def.hit_stun,
            move_speed: def.move_speed * mults.speed,
            turn_speed: def.turn_speed,
            xp_reward: def.xp_reward * mults.xp,
        }
    }
}

#[derive(Component, Clone, Debug)]
pub struct EnemyHealth {
    pub current: f32,
    pub max: f32,
}

impl EnemyHealth {
    pub fn full(max: f32) -> Self {
        Self { current: max, max }
    }
}

/// Single-slot deferred-damage mailbox.
///
/// Damage sources may fire at any point in the frame; the AI consumes the
/// slot exactly once per tick, so the transition decision (stun or death)
/// happens from a single call site no matter how many sources fired.
///
/// A second request landing before the slot is consumed overwrites the first
/// - amounts are NOT summed. Combat balance was tuned against this
/// last-hit-wins behavior, so it is kept deliberately.
#[derive(Component, Clone, Default, Debug)]
pub struct DamageMailbox {
    pending: Option<f32>,
}

impl DamageMailbox {
    pub fn request(&mut self, amount: f32) {
        self.pending = Some(amount);
    }

    pub fn take(&mut self) -> Option<f32> {
        self.pending.take()
    }

    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn clear(&mut self) {
        self.pending = None;
    }
}

/// Delay between an enemy's death and its return to the pool, so the death
/// animation has time to play before the instance disappears.
#[derive(Component)]
pub struct Corpse {
    pub timer: Timer,
}

impl Corpse {
    pub const RETURN_DELAY: f32 = 1.0;

    pub fn new() -> Self {
        Self {
            timer: Timer::from_seconds(Self::RETURN_DELAY, TimerMode::Once),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mailbox_overwrites_instead_of_summing() {
        let mut mailbox = DamageMailbox::default();
        mailbox.request(3.0);
        mailbox.request(5.0);
        // Last hit wins; 3.0 is gone.
        assert_eq!(mailbox.take(), Some(5.0));
        assert_eq!(mailbox.take(), None);
    }

    #[test]
    fn stats_apply_wave_multipliers() {
        let def = EnemyStatsDef {
            max_hp: 10.0,
            attack_damage: 4.0,
            attack_range: 60.0,
            attack_cooldown: 1.0,
            hit_stun: 0.3,
            move_speed: 100.0,
            turn_speed: 5.0,
            xp_reward: 5.0,
        };
        let mults = WaveMultipliers {
            hp: 2.0,
            speed: 1.5,
            damage: 3.0,
            xp: 2.0,
        };
        let stats = EnemyStats::from_def(&def, &mults);
        assert_eq!(stats.max_hp, 20.0);
        assert_eq!(stats.move_speed, 150.0);
        assert_eq!(stats.attack_damage, 12.0);
        assert_eq!(stats.xp_reward, 10.0);
        // Ranges and timings are not wave-scaled.
        assert_eq!(stats.attack_range, 60.0);
    }
}
