use bevy::prelude::*;

fn main() {
    App::new()
        .add_plugins((
            DefaultPlugins,
            game_clock::GameClockPlugin,
            data::MasterDataPlugin,
            save_load::SaveLoadPlugin,
            session::SessionPlugin,
            spawner::SpawnerPlugin,
            enemy_ai::EnemyAiPlugin,
            nav::NavPlugin,
            animation::AnimationPlugin,
            player::PlayerPlugin,
            dialog::DialogPlugin,
            hud::HudPlugin,
            scene::ScenePlugin,
        ))
        .add_systems(Startup, spawn_camera)
        .run();
}

fn spawn_camera(mut commands: Commands) {
    commands.spawn(Camera2d);
}

mod animation;
mod data;
mod dialog;
mod enemy;
mod enemy_ai;
mod game_clock;
mod hud;
mod nav;
mod player;
mod save_load;
mod scene;
mod session;
mod spawner;
mod state_machine;
