// game_clock.rs - The pausable session clock.
//
// Every gameplay timer (spawn intervals, attack cooldowns, hit-stun, game
// time) consumes this clock's delta instead of Time's, so freezing the clock
// freezes all off-screen combat progress in one place. The session machine
// freezes it around Paused, LevelUp, and the Ready countdown; terminal states
// leave it running because nothing consumes it anymore.

use bevy::prelude::*;

pub struct GameClockPlugin;

impl Plugin for GameClockPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<GameClock>()
            // PreUpdate so the delta is fresh before any gameplay system runs.
            .add_systems(PreUpdate, tick_clock_system);
    }
}

#[derive(Resource, Default)]
pub struct GameClock {
    /// Seconds of unpaused session time since the stage started.
    pub elapsed: f32,
    paused: bool,
    frame_delta: f32,
}

impl GameClock {
    /// This frame's gameplay delta: the real frame delta, or 0.0 while paused.
    pub fn delta_secs(&self) -> f32 {
        if self.paused {
            0.0
        } else {
            self.frame_delta
        }
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn pause(&mut self) {
        self.paused = true;
    }

    pub fn resume(&mut self) {
        self.paused = false;
    }

    pub fn reset(&mut self) {
        self.elapsed = 0.0;
    }
}

fn tick_clock_system(time: Res<Time>, mut clock: ResMut<GameClock>) {
    clock.frame_delta = time.delta_secs();
    if !clock.paused {
        clock.elapsed += clock.frame_delta;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paused_clock_yields_zero_delta() {
        let mut clock = GameClock::default();
        clock.frame_delta = 0.016;
        assert!(clock.delta_secs() > 0.0);

        clock.pause();
        assert_eq!(clock.delta_secs(), 0.0);

        clock.resume();
        assert_eq!(clock.delta_secs(), 0.016);
    }
}
