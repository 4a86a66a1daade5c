// session.rs - The stage session state machine:
// Ready / Playing / Paused / LevelUp / Victory / GameOver / QuitToTitle,
// built on the same engine as the enemy AI.
//
// The machine's context is the Session resource itself. States cannot touch
// the wider world directly; they push SessionActions into the session's
// outbox, and apply_session_actions_system carries them out after the tick.
// Async waits (the pause menu, the level-up chooser, the Ready countdown)
// are request/response fields on the Session: enter() issues the request,
// update() polls the response, and exit() withdraws the request - which is
// what makes an abandoned wait safe when the state is left early.
//
// Clock policy: any state that shows a blocking modal (Paused, LevelUp) or
// holds the pre-game countdown (Ready) freezes the game clock, because every
// gameplay timer keys off it and off-screen combat progress during a modal
// would be wrong. Terminal states resume the clock; nothing consumes it
// anymore.

use bevy::prelude::*;
use rand::seq::IteratorRandom;

use crate::data::StageTable;
use crate::game_clock::GameClock;
use crate::player::{MoveSpeed, Player, PlayerWeapon, UpgradeKind};
use crate::save_load::{self, SaveData, SessionRecord};
use crate::scene::{SceneKind, SceneRequest};
use crate::spawner::{ClearEnemiesRequest, StageInitRequest, WaveScheduler};
use crate::state_machine::{State, StateMachine};

/// Seconds of 3-2-1-GO before control is handed to the player.
pub const COUNTDOWN_SECS: f32 = 3.0;
/// How long the victory/defeat banner stays up before the scene changes.
pub const BANNER_SECS: f32 = 3.0;
/// XP needed for the first level-up; each threshold grows by half.
pub const BASE_LEVEL_XP: f32 = 20.0;

pub struct SessionPlugin;

impl Plugin for SessionPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(Startup, setup_session)
            .add_systems(
                Update,
                (
                    pause_input_system,
                    session_tick_system,
                    apply_session_actions_system,
                )
                    .chain(),
            )
            .add_observer(on_enemy_attack_landed);
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum SessionKey {
    Ready,
    Playing,
    Paused,
    LevelUp,
    Victory,
    GameOver,
    QuitToTitle,
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum SessionEvent {
    StartGame,
    Pause,
    Resume,
    Retry,
    QuitToTitle,
    LevelUp,
    LevelUpComplete,
    Victory,
    GameOver,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum PauseChoice {
    Resume,
    Retry,
    Quit,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum StageOutcome {
    Victory,
    Defeat,
}

/// Side effects requested by session states, applied after the tick.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum SessionAction {
    FreezeClock,
    ResumeClock,
    InitStage,
    StartSpawning,
    StopSpawning,
    ClearEnemies,
    ShowPauseMenu,
    ClosePauseMenu,
    ShowLevelUpMenu,
    CloseLevelUpMenu,
    ApplyUpgrade(UpgradeKind),
    SaveResults,
    GoToResults,
}

/// The whole session's context: aggregate counters (single-writer here,
/// read by the HUD via change detection), the deferred request flags, and
/// the async request/response plumbing the states use.
#[derive(Resource)]
pub struct Session {
    // counters
    pub game_time: f32,
    pub time_limit: f32,
    pub current_hp: f32,
    pub max_hp: f32,
    pub xp: f32,
    pub level: u32,
    pub next_level_xp: f32,
    pub score: u32,
    pub kills: u32,
    pub wave_kills: u32,
    pub current_wave: u32,
    pub total_waves: u32,
    pub waves_cleared: bool,
    // deferred one-tick flags: set mid-frame by input/XP handlers, acted on
    // at the NEXT update so they never interrupt the current frame's logic
    pub pause_requested: bool,
    pub level_up_requested: bool,
    // async plumbing
    pub stage_ready: bool,
    pub countdown: f32,
    pub pause_choice: Option<PauseChoice>,
    /// Outer None: dialog still open. Inner None: closed without a pick
    /// (empty option list).
    pub upgrade_choice: Option<Option<UpgradeKind>>,
    pub banner: Option<StageOutcome>,
    pub banner_timer: f32,
    pub results_saved: bool,
    pub scene_requested: bool,
    // per-tick inputs
    pub dt_game: f32,
    pub dt_real: f32,
    // outbox
    pub actions: Vec<SessionAction>,
}

impl Default for Session {
    fn default() -> Self {
        Self {
            game_time: 0.0,
            time_limit: 0.0,
            current_hp: 0.0,
            max_hp: 0.0,
            xp: 0.0,
            level: 1,
            next_level_xp: BASE_LEVEL_XP,
            score: 0,
            kills: 0,
            wave_kills: 0,
            current_wave: 0,
            total_waves: 0,
            waves_cleared: false,
            pause_requested: false,
            level_up_requested: false,
            stage_ready: false,
            countdown: -1.0,
            pause_choice: None,
            upgrade_choice: None,
            banner: None,
            banner_timer: 0.0,
            results_saved: false,
            scene_requested: false,
            dt_game: 0.0,
            dt_real: 0.0,
            actions: Vec::new(),
        }
    }
}

impl Session {
    /// Full counter reset for a new stage attempt. Retry comes through here
    /// too: it is a restart, not a resume.
    pub fn reset_for_stage(&mut self, stage: &StageTable) {
        let actions = std::mem::take(&mut self.actions);
        *self = Self {
            time_limit: stage.time_limit,
            current_hp: stage.player_max_hp,
            max_hp: stage.player_max_hp,
            current_wave: 1,
            total_waves: stage.waves.len() as u32,
            actions,
            ..Self::default()
        };
    }

    /// HP stays inside [0, max_hp] for every mutation.
    pub fn take_damage(&mut self, amount: f32) {
        self.current_hp = (self.current_hp - amount).clamp(0.0, self.max_hp);
    }

    pub fn heal(&mut self, amount: f32) {
        self.current_hp = (self.current_hp + amount).clamp(0.0, self.max_hp);
    }

    /// Crossing the threshold only raises the deferred flag; the actual
    /// level-up happens when the machine enters LevelUp.
    pub fn gain_xp(&mut self, amount: f32) {
        self.xp += amount;
        if self.xp >= self.next_level_xp {
            self.level_up_requested = true;
        }
    }

    /// Level only ever increases.
    pub fn level_up(&mut self) {
        self.level += 1;
        self.next_level_xp *= 1.5;
        // Banked XP past the new threshold queues the next level-up.
        if self.xp >= self.next_level_xp {
            self.level_up_requested = true;
        }
    }

    /// Wave counter only ever increases within a session.
    pub fn advance_wave(&mut self) {
        self.current_wave += 1;
    }

    fn act(&mut self, action: SessionAction) {
        self.actions.push(action);
    }

    fn save_once(&mut self) {
        if !self.results_saved {
            self.results_saved = true;
            self.act(SessionAction::SaveResults);
        }
    }
}

struct ReadyState;

impl State<Session, SessionEvent> for ReadyState {
    fn enter(&mut self, ctx: &mut Session) {
        ctx.stage_ready = false;
        ctx.countdown = -1.0;
        ctx.banner = None;
        ctx.act(SessionAction::FreezeClock);
        ctx.act(SessionAction::StopSpawning);
        ctx.act(SessionAction::InitStage);
    }

    fn update(&mut self, ctx: &mut Session) -> Option<SessionEvent> {
        // Wait for the init handshake before the countdown starts.
        if !ctx.stage_ready {
            return None;
        }
        if ctx.countdown < 0.0 {
            ctx.countdown = COUNTDOWN_SECS;
        }
        // The countdown runs on real time: the session clock is frozen here,
        // independent of the Paused state.
        ctx.countdown -= ctx.dt_real;
        if ctx.countdown <= 0.0 {
            return Some(SessionEvent::StartGame);
        }
        None
    }

    fn exit(&mut self, ctx: &mut Session) {
        // Cancels a countdown still in flight if the state is left early.
        ctx.countdown = -1.0;
    }
}

struct PlayingState;

impl State<Session, SessionEvent> for PlayingState {
    fn enter(&mut self, ctx: &mut Session) {
        ctx.act(SessionAction::ResumeClock);
        ctx.act(SessionAction::StartSpawning);
    }

    fn update(&mut self, ctx: &mut Session) -> Option<SessionEvent> {
        ctx.game_time += ctx.dt_game;

        // Win/lose predicates come before the deferred flags: a pause
        // request raised the same tick cannot hold off a finished game.
        if ctx.game_time >= ctx.time_limit || ctx.waves_cleared {
            return Some(SessionEvent::Victory);
        }
        if ctx.current_hp <= 0.0 {
            return Some(SessionEvent::GameOver);
        }

        if ctx.pause_requested {
            ctx.pause_requested = false;
            return Some(SessionEvent::Pause);
        }
        if ctx.level_up_requested {
            ctx.level_up_requested = false;
            return Some(SessionEvent::LevelUp);
        }
        None
    }
}

struct PausedState;

impl State<Session, SessionEvent> for PausedState {
    fn enter(&mut self, ctx: &mut Session) {
        ctx.pause_choice = None;
        ctx.act(SessionAction::FreezeClock);
        ctx.act(SessionAction::ShowPauseMenu);
    }

    fn update(&mut self, ctx: &mut Session) -> Option<SessionEvent> {
        match ctx.pause_choice.take()? {
            PauseChoice::Resume => Some(SessionEvent::Resume),
            PauseChoice::Retry => Some(SessionEvent::Retry),
            PauseChoice::Quit => Some(SessionEvent::QuitToTitle),
        }
    }

    fn exit(&mut self, ctx: &mut Session) {
        // Withdraw the dialog whichever way we leave - including a teardown
        // that never saw a choice.
        ctx.pause_choice = None;
        ctx.act(SessionAction::ClosePauseMenu);
    }
}

struct LevelUpState;

impl State<Session, SessionEvent> for LevelUpState {
    fn enter(&mut self, ctx: &mut Session) {
        ctx.level_up();
        ctx.upgrade_choice = None;
        ctx.act(SessionAction::FreezeClock);
        ctx.act(SessionAction::ShowLevelUpMenu);
    }

    fn update(&mut self, ctx: &mut Session) -> Option<SessionEvent> {
        let choice = ctx.upgrade_choice.take()?;
        if let Some(kind) = choice {
            ctx.act(SessionAction::ApplyUpgrade(kind));
        }
        // With or without a pick, LevelUp always returns to Playing.
        Some(SessionEvent::LevelUpComplete)
    }

    fn exit(&mut self, ctx: &mut Session) {
        ctx.upgrade_choice = None;
        ctx.act(SessionAction::CloseLevelUpMenu);
    }
}

/// Victory and GameOver share everything but the banner.
struct TerminalState {
    outcome: StageOutcome,
}

impl State<Session, SessionEvent> for TerminalState {
    fn enter(&mut self, ctx: &mut Session) {
        // Terminal states let the clock run; nothing consumes it anymore
        // and still-running UI reacts normally.
        ctx.act(SessionAction::ResumeClock);
        ctx.act(SessionAction::StopSpawning);
        ctx.banner = Some(self.outcome);
        ctx.banner_timer = BANNER_SECS;
        ctx.save_once();
    }

    fn update(&mut self, ctx: &mut Session) -> Option<SessionEvent> {
        ctx.banner_timer -= ctx.dt_real;
        if ctx.banner_timer <= 0.0 && !ctx.scene_requested {
            ctx.scene_requested = true;
            ctx.act(SessionAction::GoToResults);
        }
        None
    }
}

struct QuitToTitleState;

impl State<Session, SessionEvent> for QuitToTitleState {
    fn enter(&mut self, ctx: &mut Session) {
        ctx.act(SessionAction::ResumeClock);
        ctx.act(SessionAction::StopSpawning);
        ctx.act(SessionAction::ClearEnemies);
        ctx.save_once();
        // Straight to the results scene, no banner.
        ctx.scene_requested = true;
        ctx.act(SessionAction::GoToResults);
    }

    fn update(&mut self, _ctx: &mut Session) -> Option<SessionEvent> {
        None
    }
}

pub fn build_session_machine() -> StateMachine<Session, SessionKey, SessionEvent> {
    let mut machine = StateMachine::new();
    machine
        .add_state(SessionKey::Ready, Box::new(ReadyState))
        .add_state(SessionKey::Playing, Box::new(PlayingState))
        .add_state(SessionKey::Paused, Box::new(PausedState))
        .add_state(SessionKey::LevelUp, Box::new(LevelUpState))
        .add_state(
            SessionKey::Victory,
            Box::new(TerminalState {
                outcome: StageOutcome::Victory,
            }),
        )
        .add_state(
            SessionKey::GameOver,
            Box::new(TerminalState {
                outcome: StageOutcome::Defeat,
            }),
        )
        .add_state(SessionKey::QuitToTitle, Box::new(QuitToTitleState));

    machine
        .add_transition(SessionKey::Ready, SessionEvent::StartGame, SessionKey::Playing)
        .add_transition(SessionKey::Playing, SessionEvent::Pause, SessionKey::Paused)
        .add_transition(SessionKey::Playing, SessionEvent::LevelUp, SessionKey::LevelUp)
        .add_transition(SessionKey::Playing, SessionEvent::Victory, SessionKey::Victory)
        .add_transition(SessionKey::Playing, SessionEvent::GameOver, SessionKey::GameOver)
        .add_transition(SessionKey::Paused, SessionEvent::Resume, SessionKey::Playing)
        .add_transition(SessionKey::Paused, SessionEvent::Retry, SessionKey::Ready)
        .add_transition(SessionKey::Paused, SessionEvent::QuitToTitle, SessionKey::QuitToTitle)
        .add_transition(SessionKey::LevelUp, SessionEvent::LevelUpComplete, SessionKey::Playing);
    machine
}

#[derive(Resource)]
pub struct SessionMachine(pub StateMachine<Session, SessionKey, SessionEvent>);

fn setup_session(mut commands: Commands) {
    let mut session = Session::default();
    let mut machine = build_session_machine();
    // Ready's enter queues FreezeClock + InitStage; the action system picks
    // them up on the first Update tick.
    machine.set_initial(SessionKey::Ready, &mut session);
    commands.insert_resource(session);
    commands.insert_resource(SessionMachine(machine));
}

/// Enemy hits land on the session's HP pool; the machine notices a depleted
/// pool at its next update.
fn on_enemy_attack_landed(
    trigger: On<crate::enemy_ai::EnemyAttackLanded>,
    machine: Res<SessionMachine>,
    mut session: ResMut<Session>,
) {
    if machine.0.is_in(SessionKey::Playing) {
        session.take_damage(trigger.damage);
    }
}

/// Escape raises the deferred pause flag; it is acted on at the next session
/// tick, never mid-frame.
fn pause_input_system(
    keyboard: Res<ButtonInput<KeyCode>>,
    machine: Res<SessionMachine>,
    mut session: ResMut<Session>,
) {
    if keyboard.just_pressed(KeyCode::Escape) && machine.0.is_in(SessionKey::Playing) {
        session.pause_requested = true;
    }
}

fn session_tick_system(
    clock: Res<GameClock>,
    time: Res<Time>,
    mut machine: ResMut<SessionMachine>,
    mut session: ResMut<Session>,
) {
    session.dt_game = clock.delta_secs();
    session.dt_real = time.delta_secs();
    machine.0.update(&mut session);
}

/// Drains the session outbox and performs each requested side effect.
fn apply_session_actions_system(
    mut commands: Commands,
    mut session: ResMut<Session>,
    mut clock: ResMut<GameClock>,
    mut scheduler: ResMut<WaveScheduler>,
    mut player: Query<(&mut PlayerWeapon, &mut MoveSpeed), With<Player>>,
    mut save: ResMut<SaveData>,
) {
    let actions = std::mem::take(&mut session.actions);
    for action in actions {
        match action {
            SessionAction::FreezeClock => clock.pause(),
            SessionAction::ResumeClock => clock.resume(),
            SessionAction::InitStage => commands.insert_resource(StageInitRequest),
            SessionAction::StartSpawning => scheduler.enabled = true,
            SessionAction::StopSpawning => scheduler.enabled = false,
            SessionAction::ClearEnemies => commands.insert_resource(ClearEnemiesRequest),
            SessionAction::ShowPauseMenu => {
                commands.insert_resource(crate::dialog::PauseMenuRequest)
            }
            SessionAction::ClosePauseMenu => {
                commands.remove_resource::<crate::dialog::PauseMenuRequest>()
            }
            SessionAction::ShowLevelUpMenu => {
                let mut rng = rand::thread_rng();
                let options: Vec<UpgradeKind> =
                    UpgradeKind::all().into_iter().choose_multiple(&mut rng, 3);
                commands.insert_resource(crate::dialog::LevelUpMenuRequest { options });
            }
            SessionAction::CloseLevelUpMenu => {
                commands.remove_resource::<crate::dialog::LevelUpMenuRequest>()
            }
            SessionAction::ApplyUpgrade(kind) => {
                for (mut weapon, mut speed) in player.iter_mut() {
                    kind.apply(&mut weapon, &mut speed);
                }
                info!("upgrade applied: {kind:?}");
            }
            SessionAction::SaveResults => {
                *save = save_load::write_results(&SessionRecord::from_session(&session));
            }
            SessionAction::GoToResults => {
                commands.trigger(SceneRequest {
                    scene: SceneKind::Results,
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Machine initialized into Ready with a default stage's counters, init
    /// handshake already acknowledged.
    fn ready_session() -> (StateMachine<Session, SessionKey, SessionEvent>, Session) {
        let mut session = Session::default();
        let mut machine = build_session_machine();
        machine.set_initial(SessionKey::Ready, &mut session);
        session.reset_for_stage(&StageTable::default());
        session.stage_ready = true;
        session.actions.clear();
        (machine, session)
    }

    /// Machine driven through the countdown into Playing.
    fn playing_session() -> (StateMachine<Session, SessionKey, SessionEvent>, Session) {
        let (mut machine, mut session) = ready_session();
        session.dt_real = 1.0;
        for _ in 0..3 {
            machine.update(&mut session);
        }
        assert_eq!(machine.active(), Some(SessionKey::Playing));
        session.actions.clear();
        (machine, session)
    }

    #[test]
    fn ready_counts_down_then_starts() {
        let (mut machine, mut session) = ready_session();
        session.dt_real = 1.0;

        machine.update(&mut session); // 3 -> 2
        machine.update(&mut session); // 2 -> 1
        assert_eq!(machine.active(), Some(SessionKey::Ready));
        machine.update(&mut session); // 1 -> 0: StartGame
        assert_eq!(machine.active(), Some(SessionKey::Playing));
        assert!(session.actions.contains(&SessionAction::ResumeClock));
        assert!(session.actions.contains(&SessionAction::StartSpawning));
    }

    #[test]
    fn ready_waits_for_the_init_handshake() {
        let (mut machine, mut session) = ready_session();
        session.stage_ready = false;
        session.dt_real = 100.0;
        machine.update(&mut session);
        // No countdown progress until the stage reports ready.
        assert_eq!(machine.active(), Some(SessionKey::Ready));
    }

    #[test]
    fn victory_beats_a_pause_raised_the_same_tick() {
        let (mut machine, mut session) = playing_session();
        session.dt_game = 1.0;
        session.game_time = session.time_limit - 0.5;
        session.pause_requested = true;

        machine.update(&mut session);

        assert_eq!(machine.active(), Some(SessionKey::Victory));
        assert_eq!(session.banner, Some(StageOutcome::Victory));
        assert!(session.results_saved);
        assert!(session.actions.contains(&SessionAction::SaveResults));
    }

    #[test]
    fn all_waves_cleared_is_also_victory() {
        let (mut machine, mut session) = playing_session();
        session.waves_cleared = true;
        machine.update(&mut session);
        assert_eq!(machine.active(), Some(SessionKey::Victory));
    }

    #[test]
    fn hp_zero_is_game_over() {
        let (mut machine, mut session) = playing_session();
        session.take_damage(session.max_hp + 50.0);
        assert_eq!(session.current_hp, 0.0);

        machine.update(&mut session);
        assert_eq!(machine.active(), Some(SessionKey::GameOver));
        assert_eq!(session.banner, Some(StageOutcome::Defeat));
    }

    #[test]
    fn terminal_banner_requests_the_scene_once() {
        let (mut machine, mut session) = playing_session();
        session.waves_cleared = true;
        machine.update(&mut session); // -> Victory
        session.actions.clear();

        session.dt_real = BANNER_SECS + 1.0;
        machine.update(&mut session);
        assert!(session.actions.contains(&SessionAction::GoToResults));

        session.actions.clear();
        machine.update(&mut session);
        assert!(!session.actions.contains(&SessionAction::GoToResults));
    }

    #[test]
    fn pause_round_trip() {
        let (mut machine, mut session) = playing_session();
        session.pause_requested = true;
        machine.update(&mut session);
        assert_eq!(machine.active(), Some(SessionKey::Paused));
        assert!(session.actions.contains(&SessionAction::ShowPauseMenu));
        session.actions.clear();

        session.pause_choice = Some(PauseChoice::Resume);
        machine.update(&mut session);
        assert_eq!(machine.active(), Some(SessionKey::Playing));
        assert!(session.actions.contains(&SessionAction::ClosePauseMenu));
    }

    #[test]
    fn retry_lands_in_ready_and_reinitializes() {
        let (mut machine, mut session) = playing_session();
        session.pause_requested = true;
        machine.update(&mut session);
        session.actions.clear();

        session.pause_choice = Some(PauseChoice::Retry);
        machine.update(&mut session);

        // Ready, not Playing - and a fresh init request, not a resume.
        assert_eq!(machine.active(), Some(SessionKey::Ready));
        assert!(session.actions.contains(&SessionAction::InitStage));
        assert!(!session.stage_ready);
    }

    #[test]
    fn quit_saves_and_goes_to_results_without_banner() {
        let (mut machine, mut session) = playing_session();
        session.pause_requested = true;
        machine.update(&mut session);
        session.actions.clear();

        session.pause_choice = Some(PauseChoice::Quit);
        machine.update(&mut session);

        assert_eq!(machine.active(), Some(SessionKey::QuitToTitle));
        assert!(session.banner.is_none());
        assert!(session.results_saved);
        assert!(session.actions.contains(&SessionAction::SaveResults));
        assert!(session.actions.contains(&SessionAction::GoToResults));
        assert!(session.actions.contains(&SessionAction::ClearEnemies));
    }

    #[test]
    fn level_up_applies_choice_and_returns_to_playing() {
        let (mut machine, mut session) = playing_session();
        session.gain_xp(BASE_LEVEL_XP);
        assert!(session.level_up_requested);

        machine.update(&mut session);
        assert_eq!(machine.active(), Some(SessionKey::LevelUp));
        assert_eq!(session.level, 2);
        session.actions.clear();

        session.upgrade_choice = Some(Some(UpgradeKind::Damage));
        machine.update(&mut session);
        assert_eq!(machine.active(), Some(SessionKey::Playing));
        assert!(session
            .actions
            .contains(&SessionAction::ApplyUpgrade(UpgradeKind::Damage)));
    }

    #[test]
    fn empty_upgrade_pool_still_returns_to_playing() {
        let (mut machine, mut session) = playing_session();
        session.gain_xp(BASE_LEVEL_XP);
        machine.update(&mut session);
        session.actions.clear();

        // Dialog closed with nothing to pick.
        session.upgrade_choice = Some(None);
        machine.update(&mut session);
        assert_eq!(machine.active(), Some(SessionKey::Playing));
        assert!(!session
            .actions
            .iter()
            .any(|a| matches!(a, SessionAction::ApplyUpgrade(_))));
    }

    #[test]
    fn hp_is_clamped_and_level_is_monotonic() {
        let mut session = Session::default();
        session.reset_for_stage(&StageTable::default());

        session.take_damage(1_000_000.0);
        assert_eq!(session.current_hp, 0.0);
        session.heal(1_000_000.0);
        assert_eq!(session.current_hp, session.max_hp);

        let before = session.level;
        session.level_up();
        session.level_up();
        assert!(session.level > before);
    }

    #[test]
    fn banked_xp_queues_the_next_level_up() {
        let mut session = Session::default();
        session.reset_for_stage(&StageTable::default());

        // Enough XP for two thresholds at once.
        session.gain_xp(BASE_LEVEL_XP * 3.0);
        assert!(session.level_up_requested);
        session.level_up_requested = false;

        session.level_up();
        assert!(session.level_up_requested, "surplus XP re-raises the flag");
    }
}
