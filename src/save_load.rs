// save_load.rs - Persistent results: the last run and the all-time bests,
// written as RON to the platform data directory.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use crate::session::Session;

pub struct SaveLoadPlugin;

impl Plugin for SaveLoadPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(PreStartup, load_save_data);
    }
}

/// One finished (or abandoned) stage run, as written to the results file.
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct SessionRecord {
    pub wave: u32,
    pub time: f32,
    pub hp: f32,
    pub xp: f32,
    pub level: u32,
    pub score: u32,
    pub kills: u32,
}

impl SessionRecord {
    pub fn from_session(session: &Session) -> Self {
        Self {
            wave: session.current_wave,
            time: session.game_time,
            hp: session.current_hp,
            xp: session.xp,
            level: session.level,
            score: session.score,
            kills: session.kills,
        }
    }
}

/// What persists across sessions. Fields carry #[serde(default)] so results
/// files from older builds still parse; missing fields just default.
#[derive(Resource, Serialize, Deserialize, Debug, Clone, Default)]
pub struct SaveData {
    #[serde(default)]
    pub best_score: u32,
    #[serde(default)]
    pub best_wave: u32,
    #[serde(default)]
    pub runs: u32,
    #[serde(default)]
    pub last_run: Option<SessionRecord>,
}

impl SaveData {
    fn absorb(&mut self, record: &SessionRecord) {
        self.best_score = self.best_score.max(record.score);
        self.best_wave = self.best_wave.max(record.wave);
        self.runs += 1;
        self.last_run = Some(record.clone());
    }
}

fn save_file_path() -> Option<std::path::PathBuf> {
    // Falls back to the working directory when the platform has no data dir.
    let base = dirs::data_dir().unwrap_or_else(|| std::path::PathBuf::from("."));
    Some(base.join("wavebreak").join("results.ron"))
}

fn load() -> Option<SaveData> {
    let path = save_file_path()?;
    if !path.exists() {
        info!("no results file at {:?}, starting fresh", path);
        return None;
    }

    match std::fs::read_to_string(&path) {
        Ok(contents) => match ron::from_str::<SaveData>(&contents) {
            Ok(data) => Some(data),
            Err(e) => {
                // Corrupt or outdated file: keep playing on defaults rather
                // than crashing.
                error!("failed to parse results file: {e}, using defaults");
                None
            }
        },
        Err(e) => {
            error!("failed to read results file: {e}, using defaults");
            None
        }
    }
}

fn save(data: &SaveData) {
    let Some(path) = save_file_path() else {
        error!("could not determine results file path");
        return;
    };
    if let Some(parent) = path.parent() {
        if let Err(e) = std::fs::create_dir_all(parent) {
            error!("failed to create results directory: {e}");
            return;
        }
    }

    let pretty = ron::ser::PrettyConfig::default();
    match ron::ser::to_string_pretty(data, pretty) {
        Ok(serialized) => {
            if let Err(e) = std::fs::write(&path, serialized) {
                error!("failed to write results file: {e}");
            } else {
                info!("results saved to {:?}", path);
            }
        }
        Err(e) => error!("failed to serialize results: {e}"),
    }
}

fn load_save_data(mut commands: Commands) {
    commands.insert_resource(load().unwrap_or_default());
}

/// Folds one finished run into the persistent results and writes them out.
/// Plain function, called at the few moments a run actually ends.
pub fn write_results(record: &SessionRecord) -> SaveData {
    let mut data = load().unwrap_or_default();
    data.absorb(record);
    save(&data);
    data
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absorb_keeps_the_best_and_the_latest() {
        let mut data = SaveData::default();
        data.absorb(&SessionRecord {
            wave: 3,
            score: 100,
            ..Default::default()
        });
        data.absorb(&SessionRecord {
            wave: 2,
            score: 40,
            ..Default::default()
        });

        assert_eq!(data.best_score, 100);
        assert_eq!(data.best_wave, 3);
        assert_eq!(data.runs, 2);
        assert_eq!(data.last_run.as_ref().map(|r| r.score), Some(40));
    }

    #[test]
    fn old_results_files_parse_with_defaults() {
        let data: SaveData = ron::from_str("(best_score: 7)").expect("parses");
        assert_eq!(data.best_score, 7);
        assert_eq!(data.best_wave, 0);
        assert!(data.last_run.is_none());
    }
}
