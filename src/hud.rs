// hud.rs - In-stage readout: the stats line, the Ready countdown, and the
// victory/defeat banner. Everything here is a read-only view over Session,
// refreshed through change detection.

use bevy::prelude::*;

use crate::session::{Session, StageOutcome, COUNTDOWN_SECS};

pub struct HudPlugin;

impl Plugin for HudPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(Startup, spawn_hud)
            .add_systems(Update, (update_stats_text, update_overlay_text));
    }
}

#[derive(Component)]
struct StatsText;

#[derive(Component)]
struct OverlayText;

fn spawn_hud(mut commands: Commands) {
    commands.spawn((
        StatsText,
        Text::new(""),
        TextFont {
            font_size: 20.0,
            ..default()
        },
        TextColor(Color::WHITE),
        Node {
            position_type: PositionType::Absolute,
            top: Val::Px(8.0),
            left: Val::Px(8.0),
            ..default()
        },
    ));

    commands.spawn((
        OverlayText,
        Text::new(""),
        TextFont {
            font_size: 72.0,
            ..default()
        },
        TextColor(Color::srgb(1.0, 0.9, 0.3)),
        Node {
            position_type: PositionType::Absolute,
            top: Val::Percent(35.0),
            width: Val::Percent(100.0),
            justify_content: JustifyContent::Center,
            ..default()
        },
        TextLayout::new_with_justify(Justify::Center),
    ));
}

fn update_stats_text(session: Res<Session>, mut text: Query<&mut Text, With<StatsText>>) {
    if !session.is_changed() {
        return;
    }
    let Ok(mut text) = text.single_mut() else {
        return;
    };

    let remaining = (session.time_limit - session.game_time).max(0.0);
    text.0 = format!(
        "HP {:.0}/{:.0}   Wave {}/{}   Kills {}   Score {}   Lv {}  XP {:.0}/{:.0}   Time {:.0}",
        session.current_hp,
        session.max_hp,
        session.current_wave,
        session.total_waves,
        session.kills,
        session.score,
        session.level,
        session.xp,
        session.next_level_xp,
        remaining,
    );
}

/// One center slot shared by the countdown and the outcome banner; the two
/// can never be live at the same time.
fn update_overlay_text(session: Res<Session>, mut text: Query<&mut Text, With<OverlayText>>) {
    if !session.is_changed() {
        return;
    }
    let Ok(mut text) = text.single_mut() else {
        return;
    };

    text.0 = if session.countdown > 0.0 && session.countdown <= COUNTDOWN_SECS {
        if session.countdown > 1.0 {
            format!("{}", session.countdown.ceil() as u32)
        } else {
            "GO!".to_string()
        }
    } else {
        match session.banner {
            Some(StageOutcome::Victory) => "VICTORY".to_string(),
            Some(StageOutcome::Defeat) => "GAME OVER".to_string(),
            None => String::new(),
        }
    };
}
