// scene.rs - Scene changes. The only transition a run can make is into the
// results screen: tear the stage down and show the run's numbers against the
// all-time bests.

use bevy::prelude::*;

use crate::enemy::EnemyKind;
use crate::player::Player;
use crate::save_load::SaveData;
use crate::session::Session;
use crate::spawner::EnemyPools;

pub struct ScenePlugin;

impl Plugin for ScenePlugin {
    fn build(&self, app: &mut App) {
        app.add_observer(on_scene_request);
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum SceneKind {
    Results,
}

#[derive(Event)]
pub struct SceneRequest {
    pub scene: SceneKind,
}

#[derive(Component)]
struct ResultsUi;

fn on_scene_request(
    trigger: On<SceneRequest>,
    mut commands: Commands,
    mut pools: ResMut<EnemyPools>,
    session: Res<Session>,
    save: Res<SaveData>,
    enemies: Query<Entity, With<EnemyKind>>,
    player: Query<Entity, With<Player>>,
) {
    match trigger.scene {
        SceneKind::Results => {
            info!("entering results scene");
            // Pooled and live instances alike; the pool bookkeeping goes
            // with them.
            for entity in enemies.iter() {
                commands.entity(entity).despawn();
            }
            for entity in player.iter() {
                commands.entity(entity).despawn();
            }
            pools.drop_all();
            spawn_results_screen(&mut commands, &session, &save);
        }
    }
}

fn spawn_results_screen(commands: &mut Commands, session: &Session, save: &SaveData) {
    let line = |text: String, size: f32| {
        (
            Text::new(text),
            TextFont {
                font_size: size,
                ..default()
            },
            TextColor(Color::WHITE),
        )
    };

    commands
        .spawn((
            ResultsUi,
            Node {
                width: Val::Percent(100.0),
                height: Val::Percent(100.0),
                flex_direction: FlexDirection::Column,
                align_items: AlignItems::Center,
                justify_content: JustifyContent::Center,
                row_gap: Val::Px(10.0),
                ..default()
            },
            BackgroundColor(Color::srgba(0.05, 0.05, 0.1, 0.95)),
            // Above the HUD.
            GlobalZIndex(10),
        ))
        .with_children(|parent| {
            parent.spawn(line("RESULTS".to_string(), 56.0));
            parent.spawn(line(format!("Score      {}", session.score), 28.0));
            parent.spawn(line(format!("Kills      {}", session.kills), 28.0));
            parent.spawn(line(
                format!("Wave       {}/{}", session.current_wave, session.total_waves),
                28.0,
            ));
            parent.spawn(line(format!("Level      {}", session.level), 28.0));
            parent.spawn(line(format!("Time       {:.1}s", session.game_time), 28.0));
            parent.spawn(line(
                format!("Best score {}   Best wave {}", save.best_score, save.best_wave),
                24.0,
            ));
        });
}
