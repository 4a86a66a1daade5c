// spawner.rs - Per-kind enemy pools and the wave-driven spawn scheduler.
//
// The pools keep a queue of disabled instances per enemy kind; checkout
// re-initializes an instance in place, return disables it again. An instance
// is in exactly one of {its pool queue, the active set} at every observation
// point. The schedule half is a plain struct (SpawnSchedule) so the spawn
// cadence is testable without an ECS world.

use bevy::prelude::*;
use rand::Rng;
use std::collections::{HashMap, HashSet, VecDeque};
use std::time::Duration;

use crate::animation::Animator;
use crate::data::{EnemyCatalog, StageTable, WaveEntry};
use crate::enemy::{
    Corpse, DamageMailbox, Enemy, EnemyHealth, EnemyKind, EnemyStats, Hittable, Pooled,
};
use crate::enemy_ai::{EnemyBrain, EnemyDied};
use crate::game_clock::GameClock;
use crate::nav::NavAgent;
use crate::player::{MoveSpeed, Player, PlayerWeapon};
use crate::session::Session;

pub struct SpawnerPlugin;

impl Plugin for SpawnerPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<EnemyPools>()
            .init_resource::<WaveScheduler>()
            .add_observer(on_enemy_died)
            .add_systems(
                Update,
                (
                    stage_init_system.run_if(resource_exists::<StageInitRequest>),
                    spawn_tick_system,
                    wave_progress_system,
                    return_to_pool_system,
                    clear_enemies_system.run_if(resource_exists::<ClearEnemiesRequest>),
                )
                    .chain(),
            );
    }
}

/// One-shot request resources. The session machine inserts them; the systems
/// here consume them and remove the resource when done.
#[derive(Resource)]
pub struct StageInitRequest;

#[derive(Resource)]
pub struct ClearEnemiesRequest;

#[derive(Clone, Copy, Debug)]
pub struct WaveMultipliers {
    pub hp: f32,
    pub speed: f32,
    pub damage: f32,
    pub xp: f32,
}

#[derive(Debug)]
pub struct SpawnOrder {
    pub kind: String,
}

/// The spawn cadence for one wave: a round-robin cursor over the wave's kind
/// list, one countdown timer per kind. The wave entry itself is never
/// mutated; this is the advancing snapshot.
pub struct SpawnSchedule {
    spawns: Vec<crate::data::WaveSpawn>,
    timers: Vec<f32>,
    cursor: usize,
    pub remaining: u32,
    pub spawning: bool,
    pub multipliers: WaveMultipliers,
    pub min_dist: f32,
    pub max_dist: f32,
}

impl SpawnSchedule {
    pub fn from_wave(entry: &WaveEntry) -> Self {
        let timers = entry.spawns.iter().map(|s| s.interval).collect();
        Self {
            timers,
            cursor: 0,
            remaining: entry.enemy_count,
            spawning: !entry.spawns.is_empty() && entry.enemy_count > 0,
            multipliers: WaveMultipliers {
                hp: entry.hp_mult,
                speed: entry.speed_mult,
                damage: entry.damage_mult,
                xp: entry.xp_mult,
            },
            min_dist: entry.min_spawn_dist,
            max_dist: entry.max_spawn_dist,
            spawns: entry.spawns.clone(),
        }
    }

    /// Advances every kind's timer and emits at most one spawn order: the
    /// cursor's kind, once its timer has elapsed and spawns remain. The
    /// cursor then wraps to the next kind and that kind's timer re-arms.
    pub fn tick(&mut self, dt: f32) -> Option<SpawnOrder> {
        if !self.spawning {
            return None;
        }
        for timer in &mut self.timers {
            *timer -= dt;
        }

        let idx = self.cursor;
        if self.timers[idx] > 0.0 {
            return None;
        }
        self.timers[idx] = self.spawns[idx].interval;
        self.cursor = (self.cursor + 1) % self.spawns.len();
        self.remaining -= 1;
        if self.remaining == 0 {
            self.spawning = false;
        }
        Some(SpawnOrder {
            kind: self.spawns[idx].kind.clone(),
        })
    }

    pub fn halt(&mut self) {
        self.spawning = false;
    }
}

/// Per-kind queues of disabled instances plus the live set. Only this
/// module's systems touch the internals.
#[derive(Resource, Default)]
pub struct EnemyPools {
    pools: HashMap<String, VecDeque<Entity>>,
    active: HashSet<Entity>,
}

impl EnemyPools {
    /// Moves one pooled instance of `kind` into the active set, or None if
    /// that pool is empty.
    pub fn checkout(&mut self, kind: &str) -> Option<Entity> {
        let entity = self.pools.get_mut(kind)?.pop_front()?;
        self.active.insert(entity);
        Some(entity)
    }

    /// Tracks a freshly constructed instance (pool-exhaustion fallback).
    pub fn register_active(&mut self, entity: Entity) {
        self.active.insert(entity);
    }

    /// Moves an active instance back into its kind's pool.
    pub fn stash(&mut self, kind: &str, entity: Entity) {
        self.active.remove(&entity);
        let queue = self.pools.entry(kind.to_string()).or_default();
        debug_assert!(!queue.contains(&entity), "instance stashed twice");
        queue.push_back(entity);
    }

    /// Seeds a disabled instance during pre-warming.
    pub fn prewarm(&mut self, kind: &str, entity: Entity) {
        self.pools.entry(kind.to_string()).or_default().push_back(entity);
    }

    pub fn pooled_count(&self, kind: &str) -> usize {
        self.pools.get(kind).map_or(0, |q| q.len())
    }

    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    pub fn is_active(&self, entity: Entity) -> bool {
        self.active.contains(&entity)
    }

    pub fn is_pooled(&self, entity: Entity) -> bool {
        self.pools.values().any(|q| q.contains(&entity))
    }

    /// Forgets every tracked entity. For scene teardown, where the entities
    /// themselves are being despawned.
    pub fn drop_all(&mut self) {
        self.pools.clear();
        self.active.clear();
    }
}

#[derive(Resource, Default)]
pub struct WaveScheduler {
    pub schedule: Option<SpawnSchedule>,
    pub wave_index: usize,
    /// Toggled by the session machine; the schedule also freezes implicitly
    /// with the game clock.
    pub enabled: bool,
}

/// Full stage (re)initialization: reset counters and the clock, force every
/// instance back to its pool, pre-warm pools for every kind the stage
/// references, place the player, and arm wave one. Runs for both a fresh
/// stage and a retry - retry is not a resume.
#[allow(clippy::too_many_arguments)]
fn stage_init_system(
    mut commands: Commands,
    stage: Res<StageTable>,
    catalog: Res<EnemyCatalog>,
    mut session: ResMut<Session>,
    mut clock: ResMut<GameClock>,
    mut pools: ResMut<EnemyPools>,
    mut scheduler: ResMut<WaveScheduler>,
    mut live: Query<
        (Entity, &EnemyKind, &mut DamageMailbox, &mut NavAgent, &mut Animator),
        (With<Enemy>, Without<Pooled>),
    >,
    mut player: Query<(&mut Transform, &mut MoveSpeed, &mut PlayerWeapon), With<Player>>,
) {
    // Anything left over from a previous attempt goes straight back.
    for (entity, kind, mut mailbox, mut nav, mut animator) in live.iter_mut() {
        disable_instance(&mut commands, entity, &mut mailbox, &mut nav, &mut animator);
        pools.stash(&kind.0, entity);
    }

    // Pre-warm a pool per kind referenced anywhere in the stage, so waves
    // never pay a mid-combat allocation spike.
    let mut kinds: Vec<&str> = Vec::new();
    for wave in &stage.waves {
        for spawn in &wave.spawns {
            if !kinds.contains(&spawn.kind.as_str()) {
                kinds.push(&spawn.kind);
            }
        }
    }
    for kind in kinds {
        if catalog.get(kind).is_none() {
            error!("stage references unknown enemy kind '{kind}'; its spawns will be skipped");
            continue;
        }
        let deficit = (stage.pool_size as usize).saturating_sub(pools.pooled_count(kind));
        for _ in 0..deficit {
            let entity = commands
                .spawn((
                    Pooled,
                    EnemyKind(kind.to_string()),
                    Transform::default(),
                    NavAgent::default(),
                    Animator::default(),
                    DamageMailbox::default(),
                ))
                .id();
            pools.prewarm(kind, entity);
        }
    }

    // The player restarts at the origin with base stats; a retry does not
    // carry upgrades over.
    if let Ok((mut transform, mut speed, mut weapon)) = player.single_mut() {
        *transform = Transform::from_xyz(0.0, 0.0, 1.0);
        speed.0 = stage.player_move_speed;
        *weapon = PlayerWeapon::default();
    }

    scheduler.wave_index = 0;
    scheduler.enabled = false;
    scheduler.schedule = stage.waves.first().map(SpawnSchedule::from_wave);

    clock.reset();
    session.reset_for_stage(&stage);
    session.stage_ready = true;
    commands.remove_resource::<StageInitRequest>();
    info!("stage initialized: {} waves, {}s time limit", stage.waves.len(), stage.time_limit);
}

/// The per-tick spawn loop. Runs on the game clock, so a frozen clock
/// freezes spawning for free.
fn spawn_tick_system(
    mut commands: Commands,
    clock: Res<GameClock>,
    catalog: Res<EnemyCatalog>,
    mut scheduler: ResMut<WaveScheduler>,
    mut pools: ResMut<EnemyPools>,
    player: Query<&Transform, With<Player>>,
) {
    if !scheduler.enabled {
        return;
    }
    let dt = clock.delta_secs();
    if dt <= 0.0 {
        return;
    }
    let Some(schedule) = scheduler.schedule.as_mut() else {
        return;
    };
    let Some(order) = schedule.tick(dt) else {
        return;
    };

    let Some(def) = catalog.get(&order.kind) else {
        // Data hole: skip this spawn, the wave keeps going.
        error!("enemy kind '{}' missing from catalog; spawn skipped", order.kind);
        return;
    };
    let Ok(player_pos) = player.single().map(|t| t.translation.truncate()) else {
        return;
    };

    // Random ring position around the player.
    let mut rng = rand::thread_rng();
    let angle = rng.gen_range(0.0..std::f32::consts::TAU);
    let radius = if schedule.max_dist > schedule.min_dist {
        rng.gen_range(schedule.min_dist..schedule.max_dist)
    } else {
        schedule.min_dist
    };
    let position = player_pos + Vec2::from_angle(angle) * radius;

    let stats = EnemyStats::from_def(def, &schedule.multipliers);
    let bundle = (
        Enemy,
        Hittable,
        EnemyKind(order.kind.clone()),
        EnemyHealth::full(stats.max_hp),
        DamageMailbox::default(),
        NavAgent::default(),
        Animator::default(),
        EnemyBrain::new(&stats),
        Transform::from_translation(position.extend(0.0)),
        stats,
    );

    match pools.checkout(&order.kind) {
        Some(entity) => {
            // Re-initialize in place: stats copied in, HP back to max, fresh
            // machine in Idle.
            commands.entity(entity).remove::<Pooled>().insert(bundle);
        }
        None => {
            // Exhaustion is tolerated, not fatal - but it means the pool was
            // sized too small for this wave.
            warn!("pool empty for enemy kind '{}'; allocating a fresh instance", order.kind);
            let entity = commands.spawn(bundle).id();
            pools.register_active(entity);
        }
    }
}

/// Advances to the next wave once the current wave's kill target is met.
fn wave_progress_system(
    stage: Res<StageTable>,
    mut scheduler: ResMut<WaveScheduler>,
    mut session: ResMut<Session>,
) {
    if !scheduler.enabled {
        return;
    }
    let Some(entry) = stage.waves.get(scheduler.wave_index) else {
        return;
    };
    if session.wave_kills < entry.kill_target {
        return;
    }

    scheduler.wave_index += 1;
    session.wave_kills = 0;
    if let Some(next) = stage.waves.get(scheduler.wave_index) {
        session.advance_wave();
        scheduler.schedule = Some(SpawnSchedule::from_wave(next));
        info!("wave {} begins", session.current_wave);
    } else {
        session.waves_cleared = true;
        scheduler.schedule = None;
        info!("all waves cleared");
    }
}

/// Death notification: count the kill, feed XP/score, and leave the corpse
/// in place for a moment before it returns to the pool. The Death state's
/// entry guard ensures this runs once per instance.
fn on_enemy_died(
    trigger: On<EnemyDied>,
    mut commands: Commands,
    mut session: ResMut<Session>,
) {
    session.kills += 1;
    session.wave_kills += 1;
    session.score += trigger.xp.round() as u32;
    session.gain_xp(trigger.xp);
    commands.entity(trigger.entity).insert(Corpse::new());
}

fn return_to_pool_system(
    mut commands: Commands,
    clock: Res<GameClock>,
    mut pools: ResMut<EnemyPools>,
    mut corpses: Query<
        (Entity, &EnemyKind, &mut Corpse, &mut DamageMailbox, &mut NavAgent, &mut Animator),
        With<Enemy>,
    >,
) {
    let delta = Duration::from_secs_f32(clock.delta_secs());
    for (entity, kind, mut corpse, mut mailbox, mut nav, mut animator) in corpses.iter_mut() {
        corpse.timer.tick(delta);
        if !corpse.timer.just_finished() {
            continue;
        }
        disable_instance(&mut commands, entity, &mut mailbox, &mut nav, &mut animator);
        pools.stash(&kind.0, entity);
    }
}

/// Force-returns every live instance immediately and stops the spawn loop.
/// Used when leaving the stage early; safe to run mid-spawn.
fn clear_enemies_system(
    mut commands: Commands,
    mut pools: ResMut<EnemyPools>,
    mut scheduler: ResMut<WaveScheduler>,
    mut live: Query<
        (Entity, &EnemyKind, &mut DamageMailbox, &mut NavAgent, &mut Animator),
        (With<Enemy>, Without<Pooled>),
    >,
) {
    scheduler.enabled = false;
    if let Some(schedule) = scheduler.schedule.as_mut() {
        schedule.halt();
    }
    for (entity, kind, mut mailbox, mut nav, mut animator) in live.iter_mut() {
        disable_instance(&mut commands, entity, &mut mailbox, &mut nav, &mut animator);
        pools.stash(&kind.0, entity);
    }
    commands.remove_resource::<ClearEnemiesRequest>();
}

/// The reset half of the pool lifecycle: strip the live-only components,
/// tear down the machine, clear the mailbox, and mark the instance pooled.
/// The entity itself is never despawned during normal play.
fn disable_instance(
    commands: &mut Commands,
    entity: Entity,
    mailbox: &mut DamageMailbox,
    nav: &mut NavAgent,
    animator: &mut Animator,
) {
    mailbox.clear();
    nav.reset();
    animator.reset();
    commands
        .entity(entity)
        .remove::<(Enemy, Hittable, Corpse, EnemyBrain, EnemyStats, EnemyHealth)>()
        .insert(Pooled);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::WaveSpawn;

    fn two_kind_wave() -> WaveEntry {
        WaveEntry {
            spawns: vec![
                WaveSpawn { kind: "a".into(), interval: 1.0 },
                WaveSpawn { kind: "b".into(), interval: 1.0 },
            ],
            min_spawn_dist: 100.0,
            max_spawn_dist: 200.0,
            enemy_count: 5,
            kill_target: 5,
            hp_mult: 1.0,
            speed_mult: 1.0,
            damage_mult: 1.0,
            xp_mult: 1.0,
        }
    }

    #[test]
    fn schedule_alternates_kinds_and_stops_at_count() {
        let mut schedule = SpawnSchedule::from_wave(&two_kind_wave());

        let mut spawned = Vec::new();
        for _ in 0..8 {
            if let Some(order) = schedule.tick(1.0) {
                spawned.push(order.kind);
            }
        }

        assert_eq!(spawned, vec!["a", "b", "a", "b", "a"]);
        assert_eq!(schedule.remaining, 0);
        assert!(!schedule.spawning);
    }

    #[test]
    fn schedule_waits_out_the_interval() {
        let mut schedule = SpawnSchedule::from_wave(&two_kind_wave());
        // Half a second in, nothing is due yet.
        assert!(schedule.tick(0.5).is_none());
        assert!(schedule.tick(0.5).is_some());
    }

    #[test]
    fn halt_stops_mid_wave() {
        let mut schedule = SpawnSchedule::from_wave(&two_kind_wave());
        assert!(schedule.tick(1.0).is_some());
        schedule.halt();
        assert!(schedule.tick(10.0).is_none());
        assert_eq!(schedule.remaining, 4);
    }

    #[test]
    fn empty_wave_never_spawns() {
        let mut entry = two_kind_wave();
        entry.enemy_count = 0;
        let mut schedule = SpawnSchedule::from_wave(&entry);
        assert!(!schedule.spawning);
        assert!(schedule.tick(100.0).is_none());
    }

    #[test]
    fn pool_membership_is_exclusive() {
        let mut world = World::new();
        let e1 = world.spawn_empty().id();
        let e2 = world.spawn_empty().id();

        let mut pools = EnemyPools::default();
        pools.prewarm("a", e1);
        pools.prewarm("a", e2);
        assert!(pools.is_pooled(e1) && !pools.is_active(e1));

        let taken = pools.checkout("a").unwrap();
        assert_eq!(taken, e1, "pool is FIFO");
        assert!(pools.is_active(e1) && !pools.is_pooled(e1));
        assert!(pools.is_pooled(e2) && !pools.is_active(e2));

        pools.stash("a", e1);
        assert!(pools.is_pooled(e1) && !pools.is_active(e1));

        // Exhaustion: both out, third checkout yields None.
        pools.checkout("a").unwrap();
        pools.checkout("a").unwrap();
        assert!(pools.checkout("a").is_none());
        assert_eq!(pools.active_count(), 2);
    }
}
