// dialog.rs - Modal menus driven by the session machine.
//
// The machine opens a menu by inserting the request resource and closes it
// by removing it; this module owns the UI lifetime and writes the player's
// pick back onto the Session. Removing the request mid-wait (state left
// early) tears the menu down without ever producing a choice.

use bevy::prelude::*;

use crate::player::UpgradeKind;
use crate::session::{PauseChoice, Session};

pub struct DialogPlugin;

impl Plugin for DialogPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(
            Update,
            (
                spawn_pause_menu.run_if(resource_added::<PauseMenuRequest>),
                pause_menu_input.run_if(resource_exists::<PauseMenuRequest>),
                despawn_pause_menu.run_if(resource_removed::<PauseMenuRequest>),
                spawn_level_up_menu.run_if(resource_added::<LevelUpMenuRequest>),
                level_up_menu_input.run_if(resource_exists::<LevelUpMenuRequest>),
                despawn_level_up_menu.run_if(resource_removed::<LevelUpMenuRequest>),
            ),
        );
    }
}

#[derive(Resource)]
pub struct PauseMenuRequest;

#[derive(Resource)]
pub struct LevelUpMenuRequest {
    pub options: Vec<UpgradeKind>,
}

#[derive(Component)]
struct PauseMenuUi;

#[derive(Component)]
struct LevelUpMenuUi;

fn menu_root() -> impl Bundle {
    (
        Node {
            width: Val::Percent(100.0),
            height: Val::Percent(100.0),
            flex_direction: FlexDirection::Column,
            align_items: AlignItems::Center,
            justify_content: JustifyContent::Center,
            row_gap: Val::Px(12.0),
            ..default()
        },
        BackgroundColor(Color::srgba(0.0, 0.0, 0.0, 0.6)),
    )
}

fn menu_line(text: &str, size: f32) -> impl Bundle {
    (
        Text::new(text),
        TextFont {
            font_size: size,
            ..default()
        },
        TextColor(Color::WHITE),
    )
}

fn spawn_pause_menu(mut commands: Commands) {
    commands.spawn((menu_root(), PauseMenuUi)).with_children(|parent| {
        parent.spawn(menu_line("PAUSED", 48.0));
        parent.spawn(menu_line("[1] Resume", 28.0));
        parent.spawn(menu_line("[2] Retry", 28.0));
        parent.spawn(menu_line("[3] Quit to Title", 28.0));
    });
}

fn pause_menu_input(keyboard: Res<ButtonInput<KeyCode>>, mut session: ResMut<Session>) {
    // Escape doubles as resume so pause toggles naturally.
    let choice = if keyboard.just_pressed(KeyCode::Digit1)
        || keyboard.just_pressed(KeyCode::Escape)
    {
        Some(PauseChoice::Resume)
    } else if keyboard.just_pressed(KeyCode::Digit2) {
        Some(PauseChoice::Retry)
    } else if keyboard.just_pressed(KeyCode::Digit3) {
        Some(PauseChoice::Quit)
    } else {
        None
    };

    if choice.is_some() {
        session.pause_choice = choice;
    }
}

fn despawn_pause_menu(mut commands: Commands, menus: Query<Entity, With<PauseMenuUi>>) {
    for entity in menus.iter() {
        commands.entity(entity).despawn();
    }
}

fn spawn_level_up_menu(
    mut commands: Commands,
    request: Res<LevelUpMenuRequest>,
    mut session: ResMut<Session>,
) {
    if request.options.is_empty() {
        // Nothing to offer: resolve immediately with no pick.
        session.upgrade_choice = Some(None);
        return;
    }

    commands
        .spawn((menu_root(), LevelUpMenuUi))
        .with_children(|parent| {
            parent.spawn(menu_line("LEVEL UP", 48.0));
            for (i, option) in request.options.iter().enumerate() {
                parent.spawn(menu_line(&format!("[{}] {}", i + 1, option.label()), 28.0));
            }
        });
}

fn level_up_menu_input(
    keyboard: Res<ButtonInput<KeyCode>>,
    request: Res<LevelUpMenuRequest>,
    mut session: ResMut<Session>,
) {
    let keys = [KeyCode::Digit1, KeyCode::Digit2, KeyCode::Digit3];
    for (i, key) in keys.iter().enumerate() {
        if keyboard.just_pressed(*key) {
            if let Some(kind) = request.options.get(i) {
                session.upgrade_choice = Some(Some(*kind));
            }
        }
    }
}

fn despawn_level_up_menu(mut commands: Commands, menus: Query<Entity, With<LevelUpMenuUi>>) {
    for entity in menus.iter() {
        commands.entity(entity).despawn();
    }
}
