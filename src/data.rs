// data.rs - Master data: the enemy catalog and the stage/wave table.
//
// Both tables are RON files under assets/, loaded once at PreStartup and
// read-only afterwards. A missing or corrupt file is logged and replaced by
// the built-in defaults rather than crashing - same posture as the save file.

use bevy::prelude::*;
use serde::Deserialize;
use std::collections::HashMap;

pub struct MasterDataPlugin;

impl Plugin for MasterDataPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(PreStartup, load_master_data);
    }
}

/// Base stats for one enemy kind, before wave multipliers are applied.
#[derive(Deserialize, Clone, Debug)]
pub struct EnemyStatsDef {
    pub max_hp: f32,
    pub attack_damage: f32,
    pub attack_range: f32,
    pub attack_cooldown: f32,
    pub hit_stun: f32,
    pub move_speed: f32,
    /// Radians per second the enemy can turn while lining up an attack.
    pub turn_speed: f32,
    pub xp_reward: f32,
}

#[derive(Resource, Deserialize, Debug)]
pub struct EnemyCatalog {
    pub enemies: HashMap<String, EnemyStatsDef>,
}

impl EnemyCatalog {
    pub fn get(&self, kind: &str) -> Option<&EnemyStatsDef> {
        self.enemies.get(kind)
    }
}

/// One kind's slot in a wave: what to spawn and how often.
#[derive(Deserialize, Clone, Debug)]
pub struct WaveSpawn {
    pub kind: String,
    /// Seconds between spawns of this kind.
    pub interval: f32,
}

/// One wave's immutable schedule entry. The spawner advances a cursor
/// through the kinds but never mutates the entry itself.
#[derive(Deserialize, Clone, Debug)]
pub struct WaveEntry {
    pub spawns: Vec<WaveSpawn>,
    pub min_spawn_dist: f32,
    pub max_spawn_dist: f32,
    /// Total enemies this wave will spawn.
    pub enemy_count: u32,
    /// Kills needed to clear the wave.
    pub kill_target: u32,
    // Older stage files may omit the multipliers; #[serde(default)] fills in
    // 1.0 instead of failing to parse.
    #[serde(default = "one")]
    pub hp_mult: f32,
    #[serde(default = "one")]
    pub speed_mult: f32,
    #[serde(default = "one")]
    pub damage_mult: f32,
    #[serde(default = "one")]
    pub xp_mult: f32,
}

fn one() -> f32 {
    1.0
}

#[derive(Resource, Deserialize, Debug)]
pub struct StageTable {
    /// Surviving this long is one of the two victory conditions.
    pub time_limit: f32,
    pub player_max_hp: f32,
    pub player_move_speed: f32,
    /// Inactive instances pre-warmed per enemy kind at stage init.
    pub pool_size: u32,
    pub waves: Vec<WaveEntry>,
}

impl Default for EnemyCatalog {
    fn default() -> Self {
        let mut enemies = HashMap::new();
        enemies.insert(
            "walker".to_string(),
            EnemyStatsDef {
                max_hp: 10.0,
                attack_damage: 4.0,
                attack_range: 60.0,
                attack_cooldown: 1.2,
                hit_stun: 0.3,
                move_speed: 90.0,
                turn_speed: 6.0,
                xp_reward: 5.0,
            },
        );
        enemies.insert(
            "brute".to_string(),
            EnemyStatsDef {
                max_hp: 30.0,
                attack_damage: 10.0,
                attack_range: 75.0,
                attack_cooldown: 2.0,
                hit_stun: 0.15,
                move_speed: 55.0,
                turn_speed: 3.0,
                xp_reward: 14.0,
            },
        );
        Self { enemies }
    }
}

impl Default for StageTable {
    fn default() -> Self {
        Self {
            time_limit: 180.0,
            player_max_hp: 100.0,
            player_move_speed: 160.0,
            pool_size: 16,
            waves: vec![
                WaveEntry {
                    spawns: vec![WaveSpawn {
                        kind: "walker".to_string(),
                        interval: 1.0,
                    }],
                    min_spawn_dist: 300.0,
                    max_spawn_dist: 500.0,
                    enemy_count: 10,
                    kill_target: 8,
                    hp_mult: 1.0,
                    speed_mult: 1.0,
                    damage_mult: 1.0,
                    xp_mult: 1.0,
                },
                WaveEntry {
                    spawns: vec![
                        WaveSpawn {
                            kind: "walker".to_string(),
                            interval: 0.8,
                        },
                        WaveSpawn {
                            kind: "brute".to_string(),
                            interval: 2.5,
                        },
                    ],
                    min_spawn_dist: 300.0,
                    max_spawn_dist: 550.0,
                    enemy_count: 18,
                    kill_target: 15,
                    hp_mult: 1.3,
                    speed_mult: 1.1,
                    damage_mult: 1.2,
                    xp_mult: 1.2,
                },
            ],
        }
    }
}

fn load_master_data(mut commands: Commands) {
    commands.insert_resource(load_table::<EnemyCatalog>("assets/enemies.ron"));
    commands.insert_resource(load_table::<StageTable>("assets/stage.ron"));
}

/// Reads one RON table from disk, falling back to the built-in default on any
/// read or parse failure. Data errors degrade, they never halt startup.
fn load_table<T>(path: &str) -> T
where
    T: for<'de> Deserialize<'de> + Default,
{
    match std::fs::read_to_string(path) {
        Ok(contents) => match ron::from_str::<T>(&contents) {
            Ok(table) => {
                info!("Loaded master data from {path}");
                table
            }
            Err(e) => {
                error!("Failed to parse {path}: {e}. Using built-in defaults.");
                T::default()
            }
        },
        Err(e) => {
            error!("Failed to read {path}: {e}. Using built-in defaults.");
            T::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wave_multipliers_default_to_one() {
        let entry: WaveEntry = ron::from_str(
            r#"(
                spawns: [(kind: "walker", interval: 1.0)],
                min_spawn_dist: 200.0,
                max_spawn_dist: 400.0,
                enemy_count: 5,
                kill_target: 5,
            )"#,
        )
        .expect("entry without multipliers should parse");

        assert_eq!(entry.hp_mult, 1.0);
        assert_eq!(entry.xp_mult, 1.0);
    }

    #[test]
    fn default_stage_references_known_kinds() {
        let catalog = EnemyCatalog::default();
        let stage = StageTable::default();
        for wave in &stage.waves {
            for spawn in &wave.spawns {
                assert!(catalog.get(&spawn.kind).is_some(), "unknown kind {}", spawn.kind);
            }
        }
    }
}
