// enemy_ai.rs - The per-enemy AI machine: Idle / Chase / Attack / HitStun /
// Death on the generic state-machine engine.
//
// The machine runs over AiCtx, a per-tick view of one enemy assembled from
// its components by enemy_ai_system. States write orders (navigation,
// animation, attack hits, the death notification) into the ctx; the system
// applies them back to the world after the machine returns. Persistent
// fields (attack cooldown, stun timer, death-announced flag) round-trip
// through EnemyBrain so the states themselves stay stateless.
//
// Every non-terminal state consumes the damage mailbox as the FIRST thing in
// its update, so hit response pre-empts movement and attack logic within the
// same tick, and exactly one transition decision happens per frame no matter
// how many damage sources fired.

use bevy::prelude::*;

use crate::animation::{AnimTrigger, Animator};
use crate::enemy::{DamageMailbox, Enemy, EnemyHealth, EnemyStats, Hittable, Pooled};
use crate::game_clock::GameClock;
use crate::nav::NavAgent;
use crate::player::Player;
use crate::state_machine::{State, StateMachine};

/// Leaving Attack requires the target to drift past attack_range * 1.2, so
/// an enemy parked exactly at attack_range cannot flap between Chase and
/// Attack on consecutive ticks.
pub const ATTACK_EXIT_HYSTERESIS: f32 = 1.2;

pub struct EnemyAiPlugin;

impl Plugin for EnemyAiPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(Update, enemy_ai_system);
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum AiKey {
    Idle,
    Chase,
    Attack,
    HitStun,
    Death,
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum AiEvent {
    FoundTarget,
    EnterAttackRange,
    ExitAttackRange,
    LostTarget,
    TakeHit,
    RecoverFromHit,
    Die,
}

/// Navigation orders accumulated during one tick. Applied in the order
/// resume, destination, stop - so a stop issued by an entered state wins
/// over the destination the exiting state set the same tick.
#[derive(Default, Debug)]
pub struct NavOrders {
    pub resume: bool,
    pub destination: Option<Vec2>,
    pub stop: bool,
}

/// Per-tick view of one enemy. Inputs are copied in from components, outputs
/// are applied back after the machine runs.
pub struct AiCtx {
    pub dt: f32,
    pub stats: EnemyStats,
    pub hp: f32,
    pub pending_damage: Option<f32>,
    pub stun_remaining: f32,
    pub attack_cooldown: f32,
    pub death_announced: bool,
    pub position: Vec2,
    /// Player position this tick; None means the target reference is gone.
    pub target: Option<Vec2>,
    pub velocity: f32,
    pub facing: f32,
    // outputs
    pub orders: NavOrders,
    pub blend: Option<f32>,
    pub triggers: Vec<AnimTrigger>,
    /// Damage to deliver to the player this tick.
    pub attack_hit: Option<f32>,
    pub announce_death: bool,
    pub disable_hit: bool,
}

impl AiCtx {
    pub fn new(stats: EnemyStats) -> Self {
        Self {
            dt: 0.0,
            hp: stats.max_hp,
            stats,
            pending_damage: None,
            stun_remaining: 0.0,
            attack_cooldown: 0.0,
            death_announced: false,
            position: Vec2::ZERO,
            target: None,
            velocity: 0.0,
            facing: 0.0,
            orders: NavOrders::default(),
            blend: None,
            triggers: Vec::new(),
            attack_hit: None,
            announce_death: false,
            disable_hit: false,
        }
    }

    /// Consumes the pending-damage slot: subtracts from HP (clamped to
    /// [0, max]), arms the hit-stun timer, and reports whether HP crossed
    /// zero. Called at most once per tick, from the active state.
    pub fn try_consume_damage(&mut self) -> (bool, bool) {
        let Some(amount) = self.pending_damage.take() else {
            return (false, false);
        };
        self.hp = (self.hp - amount).clamp(0.0, self.stats.max_hp);
        self.stun_remaining = self.stats.hit_stun;
        (true, self.hp <= 0.0)
    }

    pub fn distance_to_target(&self) -> Option<f32> {
        self.target.map(|t| self.position.distance(t))
    }

    /// The damage-first preamble shared by every non-terminal state.
    /// Returns the transition the hit demands, if any.
    fn damage_event(&mut self) -> Option<AiEvent> {
        match self.try_consume_damage() {
            (_, true) => Some(AiEvent::Die),
            (true, false) => Some(AiEvent::TakeHit),
            _ => None,
        }
    }
}

struct IdleState;

impl State<AiCtx, AiEvent> for IdleState {
    fn enter(&mut self, ctx: &mut AiCtx) {
        ctx.orders.stop = true;
        ctx.blend = Some(0.0);
    }

    fn update(&mut self, ctx: &mut AiCtx) -> Option<AiEvent> {
        // Damage can land while idle.
        if let Some(event) = ctx.damage_event() {
            return Some(event);
        }
        if ctx.target.is_some() {
            return Some(AiEvent::FoundTarget);
        }
        None
    }
}

struct ChaseState;

impl State<AiCtx, AiEvent> for ChaseState {
    fn enter(&mut self, ctx: &mut AiCtx) {
        ctx.orders.resume = true;
    }

    fn update(&mut self, ctx: &mut AiCtx) -> Option<AiEvent> {
        if let Some(event) = ctx.damage_event() {
            return Some(event);
        }
        let Some(target) = ctx.target else {
            return Some(AiEvent::LostTarget);
        };

        ctx.orders.destination = Some(target);
        ctx.blend = Some(ctx.velocity / ctx.stats.move_speed.max(f32::EPSILON));

        if ctx.position.distance(target) <= ctx.stats.attack_range {
            return Some(AiEvent::EnterAttackRange);
        }
        None
    }
}

struct AttackState;

impl State<AiCtx, AiEvent> for AttackState {
    fn enter(&mut self, ctx: &mut AiCtx) {
        ctx.orders.stop = true;
        ctx.blend = Some(0.0);
        // Each engagement starts with a full windup.
        ctx.attack_cooldown = ctx.stats.attack_cooldown;
    }

    fn update(&mut self, ctx: &mut AiCtx) -> Option<AiEvent> {
        if let Some(event) = ctx.damage_event() {
            return Some(event);
        }
        let Some(target) = ctx.target else {
            return Some(AiEvent::LostTarget);
        };

        // Turn toward the target at the configured angular rate.
        let desired = (target - ctx.position).to_angle();
        let diff = (desired - ctx.facing + std::f32::consts::PI)
            .rem_euclid(std::f32::consts::TAU)
            - std::f32::consts::PI;
        let max_step = ctx.stats.turn_speed * ctx.dt;
        ctx.facing += diff.clamp(-max_step, max_step);

        ctx.attack_cooldown -= ctx.dt;
        if ctx.attack_cooldown <= 0.0 {
            ctx.triggers.push(AnimTrigger::Attack);
            ctx.attack_hit = Some(ctx.stats.attack_damage);
            ctx.attack_cooldown = ctx.stats.attack_cooldown;
        }

        if ctx.position.distance(target) > ctx.stats.attack_range * ATTACK_EXIT_HYSTERESIS {
            return Some(AiEvent::ExitAttackRange);
        }
        None
    }
}

struct HitStunState;

impl State<AiCtx, AiEvent> for HitStunState {
    fn enter(&mut self, ctx: &mut AiCtx) {
        ctx.orders.stop = true;
        ctx.blend = Some(0.0);
    }

    fn update(&mut self, ctx: &mut AiCtx) -> Option<AiEvent> {
        // Further hits (and death) still land during the stun; a fresh hit
        // re-enters HitStun, which restarts the freeze.
        if let Some(event) = ctx.damage_event() {
            return Some(event);
        }
        ctx.stun_remaining -= ctx.dt;
        if ctx.stun_remaining <= 0.0 {
            // A stunned enemy was already fighting something: back to Chase,
            // not Idle.
            return Some(AiEvent::RecoverFromHit);
        }
        None
    }
}

struct DeathState;

impl State<AiCtx, AiEvent> for DeathState {
    fn enter(&mut self, ctx: &mut AiCtx) {
        ctx.orders.stop = true;
        ctx.blend = Some(0.0);
        ctx.disable_hit = true;
        ctx.triggers.push(AnimTrigger::Die);
        // The notification must fire exactly once even if Death were ever
        // re-entered.
        if !ctx.death_announced {
            ctx.death_announced = true;
            ctx.announce_death = true;
        }
    }

    fn update(&mut self, _ctx: &mut AiCtx) -> Option<AiEvent> {
        None
    }
}

/// Assembles the AI transition table. Death is terminal: it has no outgoing
/// entries, so any event fired at it is a no-op.
pub fn build_enemy_machine() -> StateMachine<AiCtx, AiKey, AiEvent> {
    let mut machine = StateMachine::new();
    machine
        .add_state(AiKey::Idle, Box::new(IdleState))
        .add_state(AiKey::Chase, Box::new(ChaseState))
        .add_state(AiKey::Attack, Box::new(AttackState))
        .add_state(AiKey::HitStun, Box::new(HitStunState))
        .add_state(AiKey::Death, Box::new(DeathState));

    machine
        .add_transition(AiKey::Idle, AiEvent::FoundTarget, AiKey::Chase)
        .add_transition(AiKey::Chase, AiEvent::EnterAttackRange, AiKey::Attack)
        .add_transition(AiKey::Chase, AiEvent::LostTarget, AiKey::Idle)
        .add_transition(AiKey::Attack, AiEvent::ExitAttackRange, AiKey::Chase)
        .add_transition(AiKey::Attack, AiEvent::LostTarget, AiKey::Idle)
        .add_transition(AiKey::HitStun, AiEvent::RecoverFromHit, AiKey::Chase);

    for from in [AiKey::Idle, AiKey::Chase, AiKey::Attack, AiKey::HitStun] {
        machine
            .add_transition(from, AiEvent::TakeHit, AiKey::HitStun)
            .add_transition(from, AiEvent::Die, AiKey::Death);
    }
    machine
}

/// The brain component: the cached machine plus the AI fields that must
/// survive between ticks.
#[derive(Component)]
pub struct EnemyBrain {
    machine: StateMachine<AiCtx, AiKey, AiEvent>,
    pub attack_cooldown: f32,
    pub stun_remaining: f32,
    pub death_announced: bool,
}

impl EnemyBrain {
    pub fn new(stats: &EnemyStats) -> Self {
        let mut machine = build_enemy_machine();
        // Bootstrap enter(Idle) runs against a scratch ctx; its only output
        // is a stop order, and a fresh NavAgent is already stationary.
        let mut scratch = AiCtx::new(stats.clone());
        machine.set_initial(AiKey::Idle, &mut scratch);
        Self {
            machine,
            attack_cooldown: 0.0,
            stun_remaining: 0.0,
            death_announced: false,
        }
    }

    pub fn active(&self) -> Option<AiKey> {
        self.machine.active()
    }

    pub fn is_dead(&self) -> bool {
        self.machine.is_in(AiKey::Death)
    }
}

/// Fired exactly once per enemy, from the Death state's entry.
#[derive(Event)]
pub struct EnemyDied {
    pub entity: Entity,
    pub xp: f32,
}

/// Fired when an enemy's attack windup completes while it holds the player
/// in its attack band.
#[derive(Event)]
pub struct EnemyAttackLanded {
    pub attacker: Entity,
    pub damage: f32,
}

/// Ticks every live enemy's machine once per frame: build the ctx from the
/// components, run, apply the outputs back.
#[allow(clippy::type_complexity)]
fn enemy_ai_system(
    mut commands: Commands,
    clock: Res<GameClock>,
    player: Query<&Transform, (With<Player>, Without<Enemy>)>,
    mut enemies: Query<
        (
            Entity,
            &mut Transform,
            &EnemyStats,
            &mut EnemyHealth,
            &mut DamageMailbox,
            &mut NavAgent,
            &mut Animator,
            &mut EnemyBrain,
        ),
        (With<Enemy>, Without<Pooled>, Without<Player>),
    >,
) {
    let dt = clock.delta_secs();
    if dt <= 0.0 {
        // Frozen clock: no combat progress, and mailboxes stay pending until
        // the clock resumes.
        return;
    }

    // The target reference is resolved fresh every tick - the enemy never
    // owns the player's lifetime.
    let target = player.iter().next().map(|t| t.translation.truncate());

    for (entity, mut transform, stats, mut health, mut mailbox, mut nav, mut animator, mut brain) in
        enemies.iter_mut()
    {
        let mut ctx = AiCtx {
            dt,
            stats: stats.clone(),
            hp: health.current,
            pending_damage: mailbox.take(),
            stun_remaining: brain.stun_remaining,
            attack_cooldown: brain.attack_cooldown,
            death_announced: brain.death_announced,
            position: transform.translation.truncate(),
            target,
            velocity: nav.speed(),
            facing: nav.facing,
            orders: NavOrders::default(),
            blend: None,
            triggers: Vec::new(),
            attack_hit: None,
            announce_death: false,
            disable_hit: false,
        };

        brain.machine.update(&mut ctx);

        // Writeback: persistent fields first.
        health.current = ctx.hp;
        brain.stun_remaining = ctx.stun_remaining;
        brain.attack_cooldown = ctx.attack_cooldown;
        brain.death_announced = ctx.death_announced;
        if let Some(amount) = ctx.pending_damage {
            // A hit that arrived but was not consumed (terminal state) stays
            // in the slot; pool reset clears it.
            mailbox.request(amount);
        }

        // Navigation orders: resume, then destination, then stop - so a stop
        // issued by a freshly entered state wins the tick.
        if ctx.orders.resume {
            nav.resume();
        }
        if let Some(destination) = ctx.orders.destination {
            nav.set_destination(destination);
        }
        if ctx.orders.stop {
            nav.stop();
        }

        nav.facing = ctx.facing;
        transform.rotation = Quat::from_rotation_z(ctx.facing);

        if let Some(blend) = ctx.blend {
            animator.set_blend(blend);
        }
        for trigger in ctx.triggers.drain(..) {
            animator.set_trigger(trigger);
        }

        if let Some(damage) = ctx.attack_hit {
            commands.trigger(EnemyAttackLanded {
                attacker: entity,
                damage,
            });
        }
        if ctx.disable_hit {
            commands.entity(entity).remove::<Hittable>();
        }
        if ctx.announce_death {
            commands.trigger(EnemyDied {
                entity,
                xp: stats.xp_reward,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_stats() -> EnemyStats {
        EnemyStats {
            max_hp: 10.0,
            attack_damage: 4.0,
            attack_range: 60.0,
            attack_cooldown: 1.0,
            hit_stun: 0.3,
            move_speed: 100.0,
            turn_speed: 6.0,
            xp_reward: 5.0,
        }
    }

    /// Machine already transitioned into Chase, ctx targeting a point `dist`
    /// away on the x axis.
    fn chasing(dist: f32) -> (StateMachine<AiCtx, AiKey, AiEvent>, AiCtx) {
        let mut machine = build_enemy_machine();
        let mut ctx = AiCtx::new(test_stats());
        ctx.dt = 0.1;
        ctx.target = Some(Vec2::new(dist, 0.0));
        machine.set_initial(AiKey::Idle, &mut ctx);
        machine.update(&mut ctx); // Idle sees the target -> Chase
        assert_eq!(machine.active(), Some(AiKey::Chase));
        (machine, ctx)
    }

    #[test]
    fn lethal_pending_damage_preempts_chase() {
        let (mut machine, mut ctx) = chasing(500.0);
        ctx.pending_damage = Some(12.0);

        machine.update(&mut ctx);

        assert_eq!(machine.active(), Some(AiKey::Death));
        assert_eq!(ctx.hp, 0.0);
        assert!(ctx.announce_death, "death notification fires on entry");
        assert!(ctx.disable_hit);
        assert!(ctx.triggers.contains(&AnimTrigger::Die));

        // A second tick in Death announces nothing further.
        ctx.announce_death = false;
        ctx.triggers.clear();
        machine.update(&mut ctx);
        assert!(!ctx.announce_death);
    }

    #[test]
    fn nonlethal_hit_stuns_then_recovers_to_chase() {
        let (mut machine, mut ctx) = chasing(500.0);
        ctx.pending_damage = Some(3.0);

        machine.update(&mut ctx);
        assert_eq!(machine.active(), Some(AiKey::HitStun));
        assert_eq!(ctx.hp, 7.0);
        assert_eq!(ctx.stun_remaining, 0.3);

        // 0.3s of stun at dt = 0.1 -> recovered after three ticks, and back
        // to Chase, not Idle.
        for _ in 0..3 {
            machine.update(&mut ctx);
        }
        assert_eq!(machine.active(), Some(AiKey::Chase));
    }

    #[test]
    fn hit_during_stun_restarts_the_stun() {
        let (mut machine, mut ctx) = chasing(500.0);
        ctx.pending_damage = Some(2.0);
        machine.update(&mut ctx);
        assert_eq!(machine.active(), Some(AiKey::HitStun));

        machine.update(&mut ctx); // stun at 0.2
        ctx.pending_damage = Some(2.0);
        machine.update(&mut ctx); // re-stun: exit + enter HitStun
        assert_eq!(machine.active(), Some(AiKey::HitStun));
        assert_eq!(ctx.stun_remaining, 0.3);
        assert_eq!(ctx.hp, 6.0);
    }

    #[test]
    fn attack_band_has_hysteresis() {
        // Sitting exactly at attack_range enters Attack...
        let (mut machine, mut ctx) = chasing(60.0);
        machine.update(&mut ctx);
        assert_eq!(machine.active(), Some(AiKey::Attack));

        // ...and drifting to 1.1x range does NOT leave it.
        ctx.target = Some(Vec2::new(66.0, 0.0));
        machine.update(&mut ctx);
        assert_eq!(machine.active(), Some(AiKey::Attack));

        // Past 1.2x range it exits back to Chase.
        ctx.target = Some(Vec2::new(73.0, 0.0));
        machine.update(&mut ctx);
        assert_eq!(machine.active(), Some(AiKey::Chase));

        // And at exactly attack_range it re-enters, without having ever
        // oscillated inside the band.
        ctx.target = Some(Vec2::new(60.0, 0.0));
        machine.update(&mut ctx);
        assert_eq!(machine.active(), Some(AiKey::Attack));
    }

    #[test]
    fn attack_fires_on_cooldown_elapse() {
        let (mut machine, mut ctx) = chasing(50.0);
        machine.update(&mut ctx); // -> Attack, cooldown armed to 1.0
        assert_eq!(machine.active(), Some(AiKey::Attack));

        // Nine ticks of 0.1s: still winding up.
        for _ in 0..9 {
            machine.update(&mut ctx);
        }
        assert!(ctx.attack_hit.is_none());

        machine.update(&mut ctx);
        assert_eq!(ctx.attack_hit, Some(4.0));
        assert!(ctx.triggers.contains(&AnimTrigger::Attack));
        // Cooldown re-armed.
        assert!(ctx.attack_cooldown > 0.9);
    }

    #[test]
    fn lost_target_returns_to_idle() {
        let (mut machine, mut ctx) = chasing(500.0);
        ctx.target = None;
        machine.update(&mut ctx);
        assert_eq!(machine.active(), Some(AiKey::Idle));
    }

    #[test]
    fn idle_takes_damage_before_target_checks() {
        let mut machine = build_enemy_machine();
        let mut ctx = AiCtx::new(test_stats());
        ctx.dt = 0.1;
        machine.set_initial(AiKey::Idle, &mut ctx);

        // Target appears AND lethal damage is pending the same tick: death
        // wins because damage is consumed first.
        ctx.target = Some(Vec2::new(500.0, 0.0));
        ctx.pending_damage = Some(12.0);
        machine.update(&mut ctx);
        assert_eq!(machine.active(), Some(AiKey::Death));
    }

    #[test]
    fn events_fired_at_death_are_no_ops() {
        let (mut machine, mut ctx) = chasing(500.0);
        ctx.pending_damage = Some(12.0);
        machine.update(&mut ctx);
        assert_eq!(machine.active(), Some(AiKey::Death));

        for event in [AiEvent::TakeHit, AiEvent::FoundTarget, AiEvent::Die] {
            assert!(!machine.handle(event, &mut ctx));
        }
        assert_eq!(machine.active(), Some(AiKey::Death));
    }

    #[test]
    fn hp_stays_clamped_to_bounds() {
        let mut ctx = AiCtx::new(test_stats());
        ctx.pending_damage = Some(1000.0);
        let (applied, dead) = ctx.try_consume_damage();
        assert!(applied && dead);
        assert_eq!(ctx.hp, 0.0);

        // Negative "damage" (a heal) cannot push past max either.
        ctx.hp = 9.5;
        ctx.pending_damage = Some(-100.0);
        let (applied, dead) = ctx.try_consume_damage();
        assert!(applied && !dead);
        assert_eq!(ctx.hp, 10.0);
    }
}
