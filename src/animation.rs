// animation.rs - The animation surface the AI states drive.
//
// The AI only ever sets a movement blend value and fires one-shot triggers;
// whatever plays the actual clips consumes them from here. The drain system
// stands in for that backend.

use bevy::prelude::*;

pub struct AnimationPlugin;

impl Plugin for AnimationPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(PostUpdate, drain_triggers_system);
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum AnimTrigger {
    Attack,
    Die,
}

#[derive(Component, Default, Debug)]
pub struct Animator {
    /// Normalized movement blend: current speed over configured speed.
    pub move_blend: f32,
    triggers: Vec<AnimTrigger>,
}

impl Animator {
    pub fn set_blend(&mut self, value: f32) {
        self.move_blend = value;
    }

    pub fn set_trigger(&mut self, trigger: AnimTrigger) {
        self.triggers.push(trigger);
    }

    pub fn reset(&mut self) {
        self.move_blend = 0.0;
        self.triggers.clear();
    }
}

fn drain_triggers_system(mut animators: Query<(Entity, &mut Animator)>) {
    for (entity, mut animator) in animators.iter_mut() {
        for trigger in animator.triggers.drain(..) {
            debug!("{entity} animation trigger {trigger:?}");
        }
    }
}
