//! Application state store.
//!
//! `StateStore` is a cloneable handle over one `AppState`. Components read
//! snapshots and change state only through the named update operations.
//! The host can persist the state between runs with `AppState::load` and
//! `AppState::save`, which use file locking and an atomic rename.

use crate::{AppState, Error, ProfileUpdate, Result, UserProfile, Workout};
use fs2::FileExt;
use std::fs::File;
use std::io::{ErrorKind, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tempfile::NamedTempFile;

/// Shared, injectable state container
#[derive(Clone, Debug, Default)]
pub struct StateStore {
    inner: Arc<RwLock<AppState>>,
}

impl StateStore {
    pub fn new(state: AppState) -> Self {
        Self {
            inner: Arc::new(RwLock::new(state)),
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, AppState>> {
        self.inner
            .read()
            .map_err(|_| Error::State("state store lock poisoned".into()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, AppState>> {
        self.inner
            .write()
            .map_err(|_| Error::State("state store lock poisoned".into()))
    }

    /// A copy of the whole state at this moment
    pub fn snapshot(&self) -> Result<AppState> {
        Ok(self.read()?.clone())
    }

    pub fn steps(&self) -> Result<u32> {
        Ok(self.read()?.steps)
    }

    pub fn workouts(&self) -> Result<Vec<Workout>> {
        Ok(self.read()?.workouts.clone())
    }

    pub fn profile(&self) -> Result<UserProfile> {
        Ok(self.read()?.profile.clone())
    }

    pub fn set_steps(&self, steps: u32) -> Result<()> {
        self.write()?.steps = steps;
        tracing::debug!("Step count set to {}", steps);
        Ok(())
    }

    pub fn reset_steps(&self) -> Result<()> {
        self.write()?.steps = 0;
        tracing::info!("Step count reset");
        Ok(())
    }

    /// Append a workout, keeping insertion order
    pub fn add_workout(&self, workout: Workout) -> Result<()> {
        let mut state = self.write()?;
        tracing::info!(
            "Added workout '{}' at {} ({})",
            workout.name,
            workout.time,
            workout.id
        );
        state.workouts.push(workout);
        Ok(())
    }

    pub fn reset_workouts(&self) -> Result<usize> {
        let mut state = self.write()?;
        let removed = state.workouts.len();
        state.workouts.clear();
        tracing::info!("Cleared {} workouts", removed);
        Ok(removed)
    }

    /// Merge a partial update into the profile
    ///
    /// The update is validated first; on error the profile is left untouched.
    pub fn update_profile(&self, update: ProfileUpdate) -> Result<UserProfile> {
        update.validate()?;
        let mut state = self.write()?;
        update.apply_to(&mut state.profile);
        tracing::info!("Updated profile for {}", state.profile.name);
        Ok(state.profile.clone())
    }
}

impl AppState {
    /// Load the saved state, or start fresh
    ///
    /// A missing file is a first run. A file that does not decode is renamed
    /// to `<name>.corrupt` before the default state is returned, so the next
    /// save cannot overwrite the user's only copy of their workouts.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = match read_shared(path)? {
            Some(contents) => contents,
            None => {
                tracing::info!("No saved state at {:?}, starting fresh", path);
                return Ok(Self::default());
            }
        };

        match serde_json::from_str::<AppState>(&contents) {
            Ok(state) => {
                tracing::debug!(
                    "Loaded {} steps and {} workouts from {:?}",
                    state.steps,
                    state.workouts.len(),
                    path
                );
                Ok(state)
            }
            Err(e) => {
                let aside = set_aside(path)?;
                tracing::warn!(
                    "Saved state in {:?} is unreadable ({}); kept it as {:?} and started fresh",
                    path,
                    e,
                    aside
                );
                Ok(Self::default())
            }
        }
    }

    /// Save state to a file: temp file, fsync, rename over the original
    pub fn save(&self, path: &Path) -> Result<()> {
        let parent = path
            .parent()
            .ok_or_else(|| Error::State(format!("state path {:?} has no parent", path)))?;
        std::fs::create_dir_all(parent)?;

        let temp = NamedTempFile::new_in(parent)?;
        temp.as_file().lock_exclusive()?;

        {
            let mut writer = std::io::BufWriter::new(temp.as_file());
            let contents = serde_json::to_string_pretty(self)?;
            writer.write_all(contents.as_bytes())?;
            writer.flush()?;
        }

        temp.as_file().sync_all()?;
        temp.as_file().unlock()?;

        temp.persist(path).map_err(|e| Error::Io(e.error))?;

        tracing::debug!("Saved app state to {:?}", path);
        Ok(())
    }
}

/// Read a whole file under a shared lock; `None` when it does not exist
fn read_shared(path: &Path) -> Result<Option<String>> {
    let mut file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };

    let mut contents = String::new();
    file.lock_shared()?;
    let read = file.read_to_string(&mut contents);
    file.unlock()?;

    match read {
        Ok(_) => Ok(Some(contents)),
        // Not UTF-8: treat like any other undecodable state
        Err(e) if e.kind() == ErrorKind::InvalidData => Ok(Some(String::new())),
        Err(e) => Err(e.into()),
    }
}

/// Move an unreadable state file out of the way, returning its new path
fn set_aside(path: &Path) -> Result<PathBuf> {
    let mut name = path
        .file_name()
        .ok_or_else(|| Error::State(format!("state path {:?} has no file name", path)))?
        .to_os_string();
    name.push(".corrupt");
    let aside = path.with_file_name(name);
    std::fs::rename(path, &aside)?;
    Ok(aside)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::NewWorkout;

    fn workout(name: &str, time: &str) -> Workout {
        NewWorkout::new(name, time).validate().unwrap()
    }

    #[test]
    fn test_mutations_visible_to_clones() {
        let store = StateStore::default();
        let view = store.clone();

        store.set_steps(4_200).unwrap();
        store.add_workout(workout("Run", "06:30")).unwrap();

        assert_eq!(view.steps().unwrap(), 4_200);
        assert_eq!(view.workouts().unwrap().len(), 1);
    }

    #[test]
    fn test_workouts_keep_insertion_order() {
        let store = StateStore::default();
        for (name, time) in [("C", "20:00"), ("A", "06:00"), ("B", "12:00")] {
            store.add_workout(workout(name, time)).unwrap();
        }
        let names: Vec<_> = store.workouts().unwrap().into_iter().map(|w| w.name).collect();
        assert_eq!(names, vec!["C", "A", "B"]);
    }

    #[test]
    fn test_resets() {
        let store = StateStore::default();
        store.set_steps(10).unwrap();
        store.add_workout(workout("Run", "06:30")).unwrap();

        store.reset_steps().unwrap();
        assert_eq!(store.reset_workouts().unwrap(), 1);

        let snapshot = store.snapshot().unwrap();
        assert_eq!(snapshot.steps, 0);
        assert!(snapshot.workouts.is_empty());
    }

    #[test]
    fn test_update_profile_merges_fields() {
        let store = StateStore::default();
        let updated = store
            .update_profile(ProfileUpdate {
                height_cm: Some(182.0),
                calorie_goal_kcal: Some(300.0),
                ..Default::default()
            })
            .unwrap();

        assert_eq!(updated.height_cm, 182.0);
        assert_eq!(updated.calorie_goal_kcal, Some(300.0));
        assert_eq!(updated.weight_kg, UserProfile::default().weight_kg);
        assert_eq!(store.profile().unwrap(), updated);
    }

    #[test]
    fn test_invalid_profile_update_leaves_state_untouched() {
        let store = StateStore::default();
        let result = store.update_profile(ProfileUpdate {
            name: Some("Sam".into()),
            weight_kg: Some(-1.0),
            ..Default::default()
        });

        assert!(matches!(result, Err(Error::InvalidInput(_))));
        assert_eq!(store.profile().unwrap(), UserProfile::default());
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let temp_dir = tempfile::tempdir().unwrap();
        let state_path = temp_dir.path().join("state.json");

        let store = StateStore::default();
        store.set_steps(8_123).unwrap();
        store.add_workout(workout("Yoga", "19:15")).unwrap();
        store.snapshot().unwrap().save(&state_path).unwrap();

        let loaded = AppState::load(&state_path).unwrap();
        assert_eq!(loaded, store.snapshot().unwrap());
    }

    #[test]
    fn test_load_nonexistent_returns_default() {
        let temp_dir = tempfile::tempdir().unwrap();
        let state = AppState::load(&temp_dir.path().join("missing.json")).unwrap();
        assert_eq!(state, AppState::default());
    }

    #[test]
    fn test_corrupted_state_is_kept_aside() {
        let temp_dir = tempfile::tempdir().unwrap();
        let state_path = temp_dir.path().join("state.json");
        std::fs::write(&state_path, "{ invalid json }").unwrap();

        let state = AppState::load(&state_path).unwrap();
        assert_eq!(state, AppState::default());

        assert!(!state_path.exists());
        let aside = temp_dir.path().join("state.json.corrupt");
        assert_eq!(std::fs::read_to_string(aside).unwrap(), "{ invalid json }");
    }

    #[test]
    fn test_save_after_corruption_keeps_the_corrupt_copy() {
        let temp_dir = tempfile::tempdir().unwrap();
        let state_path = temp_dir.path().join("state.json");
        std::fs::write(&state_path, &[0xff, 0xfe, 0x00][..]).unwrap();

        let store = StateStore::new(AppState::load(&state_path).unwrap());
        store.set_steps(12).unwrap();
        store.snapshot().unwrap().save(&state_path).unwrap();

        assert_eq!(AppState::load(&state_path).unwrap().steps, 12);
        assert_eq!(
            std::fs::read(temp_dir.path().join("state.json.corrupt")).unwrap(),
            vec![0xff, 0xfe, 0x00]
        );
    }

    #[test]
    fn test_atomic_save_leaves_no_temp_files() {
        let temp_dir = tempfile::tempdir().unwrap();
        let state_path = temp_dir.path().join("state.json");

        AppState::default().save(&state_path).unwrap();

        let extras: Vec<_> = std::fs::read_dir(temp_dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name() != "state.json")
            .collect();
        assert!(extras.is_empty(), "Expected only state.json, found {:?}", extras);
    }
}
