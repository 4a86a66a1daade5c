// nav.rs - The navigation backend the AI states drive.
//
// The AI never moves a Transform directly; it issues set_destination / stop /
// resume orders on the NavAgent, and the steering system here carries them
// out. A separation pass keeps enemies from stacking on one spot.

use bevy::prelude::*;

use crate::enemy::{Enemy, EnemyStats, Pooled};
use crate::game_clock::GameClock;

pub struct NavPlugin;

impl Plugin for NavPlugin {
    fn build(&self, app: &mut App) {
        // separation runs after steering so it gets the last word each frame
        app.add_systems(Update, (nav_steer_system, separation_system).chain());
    }
}

#[derive(Component, Default, Debug)]
pub struct NavAgent {
    pub destination: Option<Vec2>,
    pub stopped: bool,
    /// World-units-per-second velocity of the last steering step.
    pub velocity: Vec2,
    /// Facing angle in radians; the Attack state turns this toward the
    /// target, steering points it along the direction of travel.
    pub facing: f32,
}

impl NavAgent {
    pub fn set_destination(&mut self, pos: Vec2) {
        self.destination = Some(pos);
    }

    pub fn stop(&mut self) {
        self.stopped = true;
        self.velocity = Vec2::ZERO;
    }

    pub fn resume(&mut self) {
        self.stopped = false;
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn speed(&self) -> f32 {
        self.velocity.length()
    }
}

/// Moves each live enemy toward its destination at its move speed.
/// Runs on the game clock, so a frozen clock freezes all movement.
fn nav_steer_system(
    clock: Res<GameClock>,
    mut agents: Query<(&mut Transform, &mut NavAgent, &EnemyStats), (With<Enemy>, Without<Pooled>)>,
) {
    let delta = clock.delta_secs();
    if delta <= 0.0 {
        return;
    }

    for (mut transform, mut agent, stats) in agents.iter_mut() {
        if agent.stopped {
            agent.velocity = Vec2::ZERO;
            continue;
        }
        let Some(destination) = agent.destination else {
            agent.velocity = Vec2::ZERO;
            continue;
        };

        let here = transform.translation.truncate();
        let diff = destination - here;
        // Close enough: park on the spot instead of jittering around it.
        if diff.length() < 1.0 {
            agent.velocity = Vec2::ZERO;
            continue;
        }

        let direction = diff.normalize();
        let step = direction * stats.move_speed * delta;
        transform.translation += step.extend(0.0);
        agent.velocity = direction * stats.move_speed;
        agent.facing = direction.y.atan2(direction.x);
        transform.rotation = Quat::from_rotation_z(agent.facing);
    }
}

/// Pushes live enemies apart when they crowd within `min_distance` of each
/// other; the closer they are, the stronger the push.
fn separation_system(
    clock: Res<GameClock>,
    mut query: Query<(Entity, &mut Transform), (With<Enemy>, Without<Pooled>)>,
) {
    let min_distance = 40.0;
    let push_strength = 120.0;
    let delta = clock.delta_secs();
    if delta <= 0.0 {
        return;
    }

    // Phase 1: snapshot positions so the pair comparisons see a consistent
    // frame instead of positions already nudged by earlier pushes.
    let positions: Vec<(Entity, Vec3)> = query
        .iter()
        .map(|(entity, transform)| (entity, transform.translation))
        .collect();

    let mut pushes: Vec<(Entity, Vec3)> = Vec::new();
    for i in 0..positions.len() {
        for j in (i + 1)..positions.len() {
            let (entity_a, pos_a) = positions[i];
            let (entity_b, pos_b) = positions[j];

            let diff = Vec3::new(pos_a.x - pos_b.x, pos_a.y - pos_b.y, 0.0);
            let distance = diff.length();

            if distance < min_distance && distance > 0.01 {
                let overlap_ratio = 1.0 - (distance / min_distance);
                let direction = diff.normalize();
                let force = direction * overlap_ratio * push_strength * delta;

                pushes.push((entity_a, force));
                pushes.push((entity_b, -force));
            }
        }
    }

    // Phase 2: apply
    for (entity, force) in pushes {
        if let Ok((_, mut transform)) = query.get_mut(entity) {
            transform.translation += force;
        }
    }
}
