// player.rs - Player avatar: WASD movement on the game clock, an
// auto-firing melee weapon, and the upgrade set the level-up menu offers.

use bevy::prelude::*;

use crate::enemy::{DamageMailbox, Hittable};
use crate::game_clock::GameClock;

pub struct PlayerPlugin;

impl Plugin for PlayerPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(Startup, spawn_player)
            .add_systems(Update, (player_move_system, player_attack_system));
    }
}

#[derive(Component)]
pub struct Player;

#[derive(Component, Debug)]
pub struct MoveSpeed(pub f32);

/// Auto-attack: fires at the nearest hittable enemy in range whenever the
/// cooldown elapses.
#[derive(Component, Debug)]
pub struct PlayerWeapon {
    pub damage: f32,
    pub range: f32,
    pub cooldown: f32,
    pub timer: f32,
}

impl Default for PlayerWeapon {
    fn default() -> Self {
        Self {
            damage: 10.0,
            range: 120.0,
            cooldown: 0.8,
            timer: 0.0,
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum UpgradeKind {
    Damage,
    Range,
    AttackSpeed,
    MoveSpeed,
}

impl UpgradeKind {
    pub fn all() -> [UpgradeKind; 4] {
        [
            UpgradeKind::Damage,
            UpgradeKind::Range,
            UpgradeKind::AttackSpeed,
            UpgradeKind::MoveSpeed,
        ]
    }

    pub fn label(&self) -> &'static str {
        match self {
            UpgradeKind::Damage => "Damage +25%",
            UpgradeKind::Range => "Range +20%",
            UpgradeKind::AttackSpeed => "Attack speed +15%",
            UpgradeKind::MoveSpeed => "Move speed +15%",
        }
    }

    pub fn apply(&self, weapon: &mut PlayerWeapon, speed: &mut MoveSpeed) {
        match self {
            UpgradeKind::Damage => weapon.damage *= 1.25,
            UpgradeKind::Range => weapon.range *= 1.2,
            UpgradeKind::AttackSpeed => weapon.cooldown /= 1.15,
            UpgradeKind::MoveSpeed => speed.0 *= 1.15,
        }
    }
}

fn spawn_player(mut commands: Commands) {
    commands.spawn((
        Player,
        MoveSpeed(200.0),
        PlayerWeapon::default(),
        Sprite::from_color(Color::srgb(0.2, 0.7, 0.9), Vec2::splat(24.0)),
        Transform::from_xyz(0.0, 0.0, 1.0),
    ));
}

/// WASD / arrow movement. Runs on the game clock, so a frozen clock pins the
/// player in place like everything else.
fn player_move_system(
    clock: Res<GameClock>,
    keyboard: Res<ButtonInput<KeyCode>>,
    mut player: Query<(&mut Transform, &MoveSpeed), With<Player>>,
) {
    let delta = clock.delta_secs();
    if delta <= 0.0 {
        return;
    }
    let Ok((mut transform, speed)) = player.single_mut() else {
        return;
    };

    let mut direction = Vec2::ZERO;
    if keyboard.pressed(KeyCode::KeyW) || keyboard.pressed(KeyCode::ArrowUp) {
        direction.y += 1.0;
    }
    if keyboard.pressed(KeyCode::KeyS) || keyboard.pressed(KeyCode::ArrowDown) {
        direction.y -= 1.0;
    }
    if keyboard.pressed(KeyCode::KeyA) || keyboard.pressed(KeyCode::ArrowLeft) {
        direction.x -= 1.0;
    }
    if keyboard.pressed(KeyCode::KeyD) || keyboard.pressed(KeyCode::ArrowRight) {
        direction.x += 1.0;
    }
    if direction == Vec2::ZERO {
        return;
    }

    let step = direction.normalize() * speed.0 * delta;
    transform.translation += step.extend(0.0);
}

/// Posts damage to the nearest hittable enemy in range. The mailbox holds a
/// single pending hit, so a faster weapon than the enemy's tick rate
/// overwrites rather than stacks.
fn player_attack_system(
    clock: Res<GameClock>,
    mut player: Query<(&Transform, &mut PlayerWeapon), With<Player>>,
    mut targets: Query<(&Transform, &mut DamageMailbox), With<Hittable>>,
) {
    let delta = clock.delta_secs();
    if delta <= 0.0 {
        return;
    }
    let Ok((player_transform, mut weapon)) = player.single_mut() else {
        return;
    };

    weapon.timer -= delta;
    if weapon.timer > 0.0 {
        return;
    }

    let here = player_transform.translation.truncate();
    let nearest = targets
        .iter_mut()
        .map(|(transform, mailbox)| {
            let dist = transform.translation.truncate().distance(here);
            (dist, mailbox)
        })
        .filter(|(dist, _)| *dist <= weapon.range)
        .min_by(|(a, _), (b, _)| a.total_cmp(b));

    if let Some((_, mut mailbox)) = nearest {
        mailbox.request(weapon.damage);
        weapon.timer = weapon.cooldown;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upgrades_move_the_right_stat() {
        let mut weapon = PlayerWeapon::default();
        let mut speed = MoveSpeed(200.0);

        UpgradeKind::Damage.apply(&mut weapon, &mut speed);
        assert!(weapon.damage > 10.0);

        let cooldown_before = weapon.cooldown;
        UpgradeKind::AttackSpeed.apply(&mut weapon, &mut speed);
        assert!(weapon.cooldown < cooldown_before);

        UpgradeKind::MoveSpeed.apply(&mut weapon, &mut speed);
        assert!(speed.0 > 200.0);
    }
}
