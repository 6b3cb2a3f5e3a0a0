use std::sync::Arc;

use log::{debug, info, warn};
use tokio::sync::Mutex;

use crate::{
    db::{
        models::{ExerciseDetail, SetValues, Workout, WorkoutDetail, WorkoutExercise, WorkoutSet},
        repositories::{
            templates::touch_template,
            workouts::{insert_set, insert_workout, insert_workout_exercise},
        },
        Database,
    },
    error::{StorageError, StorageResult},
    timer::{Clock, RestTimer},
    utils::format_elapsed,
};

use super::prefill::{next_set_values, prefill_for_exercise};

pub const EMPTY_WORKOUT_NAME: &str = "Workout";
/// Sets created when an exercise is added or swapped in by hand.
pub const DEFAULT_NEW_EXERCISE_SETS: u32 = 3;

#[derive(Debug, Default)]
struct ActiveSession {
    workout: Option<Workout>,
    last_completed_set_id: Option<String>,
    has_interrupted_workout: bool,
}

/// Owns the single in-progress workout and drives the rest timer from set
/// completion. Starting while a workout is active is a no-op.
#[derive(Clone)]
pub struct WorkoutSessionManager {
    db: Database,
    rest_timer: RestTimer,
    clock: Arc<dyn Clock>,
    fallback_rest_seconds: u32,
    session: Arc<Mutex<ActiveSession>>,
}

impl WorkoutSessionManager {
    pub fn new(
        db: Database,
        rest_timer: RestTimer,
        clock: Arc<dyn Clock>,
        fallback_rest_seconds: u32,
    ) -> Self {
        Self {
            db,
            rest_timer,
            clock,
            fallback_rest_seconds,
            session: Arc::new(Mutex::new(ActiveSession::default())),
        }
    }

    pub fn rest_timer(&self) -> &RestTimer {
        &self.rest_timer
    }

    pub async fn active_workout(&self) -> Option<Workout> {
        self.session.lock().await.workout.clone()
    }

    pub async fn is_workout_in_progress(&self) -> bool {
        self.session.lock().await.workout.is_some()
    }

    pub async fn active_detail(&self) -> StorageResult<Option<WorkoutDetail>> {
        let Some(workout_id) = self.active_workout_id().await else {
            return Ok(None);
        };
        self.db
            .get_workout_detail(&workout_id)
            .await
            .map_err(StorageError::read("load active workout"))
    }

    // Recovery

    /// Adopt a workout left in progress by a previous process and resync the
    /// rest timer. Returns whether one was found.
    pub async fn recover_interrupted(&self) -> StorageResult<bool> {
        let mut session = self.session.lock().await;
        let Some(workout) = self
            .db
            .get_in_progress_workout()
            .await
            .map_err(StorageError::read("load in-progress workout"))?
        else {
            return Ok(false);
        };

        warn!(
            "Recovered interrupted workout {} ({}) started at {}",
            workout.id, workout.name, workout.started_at
        );
        session.workout = Some(workout);
        session.has_interrupted_workout = true;
        drop(session);

        self.rest_timer.resync().await;
        Ok(true)
    }

    pub async fn has_interrupted_workout(&self) -> bool {
        self.session.lock().await.has_interrupted_workout
    }

    pub async fn resume_interrupted(&self) {
        self.session.lock().await.has_interrupted_workout = false;
    }

    pub async fn discard_interrupted(&self) -> StorageResult<()> {
        self.session.lock().await.has_interrupted_workout = false;
        self.discard().await
    }

    // Starting

    /// Start a workout from a template. Each template exercise becomes a
    /// workout exercise with its default number of sets, pre-filled from
    /// history. Returns `None` when a workout is already active.
    pub async fn start_from_template(&self, template_id: &str) -> StorageResult<Option<Workout>> {
        let mut session = self.session.lock().await;
        if session.workout.is_some() {
            debug!("Ignoring template start, a workout is already active");
            return Ok(None);
        }

        let detail = self
            .db
            .get_template_detail(template_id)
            .await
            .map_err(StorageError::read("load template"))?
            .ok_or_else(|| StorageError::not_found("template", template_id))?;

        let now = self.clock.now();
        let workout = Workout {
            template_id: Some(detail.template.id.clone()),
            ..Workout::start(&detail.template.name, now)
        };
        let record = workout.clone();

        self.db
            .execute(move |conn| {
                let tx = conn.transaction()?;
                insert_workout(&tx, &record)?;

                let mut position = 0;
                for template_exercise in &detail.exercises {
                    let Some(exercise) = template_exercise.exercise.as_ref() else {
                        continue;
                    };

                    let entry = WorkoutExercise::new(&record.id, &exercise.id, position);
                    insert_workout_exercise(&tx, &entry)?;

                    let values = prefill_for_exercise(
                        &tx,
                        &exercise.id,
                        template_exercise.entry.default_sets,
                    )?;
                    for (index, values) in values.into_iter().enumerate() {
                        insert_set(&tx, &WorkoutSet::new(&entry.id, index as u32, values))?;
                    }
                    position += 1;
                }

                touch_template(&tx, &detail.template.id, now)?;
                tx.commit()?;
                Ok(())
            })
            .await
            .map_err(StorageError::write("start workout from template"))?;

        info!("Started workout {} from template {}", workout.id, template_id);
        *session = ActiveSession {
            workout: Some(workout.clone()),
            ..ActiveSession::default()
        };
        Ok(Some(workout))
    }

    /// Start a workout with no exercises. Returns `None` when a workout is
    /// already active.
    pub async fn start_empty(&self) -> StorageResult<Option<Workout>> {
        let mut session = self.session.lock().await;
        if session.workout.is_some() {
            debug!("Ignoring empty start, a workout is already active");
            return Ok(None);
        }

        let workout = Workout::start(EMPTY_WORKOUT_NAME, self.clock.now());
        self.db
            .insert_workout(&workout)
            .await
            .map_err(StorageError::write("start workout"))?;

        info!("Started empty workout {}", workout.id);
        *session = ActiveSession {
            workout: Some(workout.clone()),
            ..ActiveSession::default()
        };
        Ok(Some(workout))
    }

    // Editing

    pub async fn add_exercise(
        &self,
        exercise_id: &str,
        set_count: u32,
    ) -> StorageResult<ExerciseDetail> {
        let workout_id = self.require_active_workout_id().await?;

        let values = self.prefill(exercise_id, set_count).await?;
        self.db
            .add_workout_exercise(&workout_id, exercise_id, values)
            .await
            .map_err(StorageError::write("add exercise"))
    }

    /// Replace a workout exercise's catalog entry and start its sets over.
    pub async fn swap_exercise(
        &self,
        workout_exercise_id: &str,
        exercise_id: &str,
    ) -> StorageResult<ExerciseDetail> {
        let workout_id = self.require_active_workout_id().await?;
        self.ensure_entry_in(&workout_id, workout_exercise_id).await?;
        self.stop_timer_if_last_completed_in(workout_exercise_id)
            .await?;

        let values = self.prefill(exercise_id, DEFAULT_NEW_EXERCISE_SETS).await?;
        self.db
            .swap_workout_exercise(workout_exercise_id, exercise_id, values)
            .await
            .map_err(StorageError::write("swap exercise"))
    }

    pub async fn remove_exercise(&self, workout_exercise_id: &str) -> StorageResult<bool> {
        let workout_id = self.require_active_workout_id().await?;
        self.ensure_entry_in(&workout_id, workout_exercise_id).await?;
        self.stop_timer_if_last_completed_in(workout_exercise_id)
            .await?;

        self.db
            .remove_workout_exercise(workout_exercise_id)
            .await
            .map_err(StorageError::write("remove exercise"))
    }

    /// Append a set that copies the exercise's current last set.
    pub async fn add_set(&self, workout_exercise_id: &str) -> StorageResult<WorkoutSet> {
        let workout_id = self.require_active_workout_id().await?;
        self.ensure_entry_in(&workout_id, workout_exercise_id).await?;

        let existing = self
            .db
            .list_sets(workout_exercise_id)
            .await
            .map_err(StorageError::read("load sets"))?;

        self.db
            .add_set(workout_exercise_id, next_set_values(&existing))
            .await
            .map_err(StorageError::write("add set"))
    }

    pub async fn update_set(&self, set_id: &str, values: SetValues) -> StorageResult<WorkoutSet> {
        let workout_id = self.require_active_workout_id().await?;
        self.ensure_set_in(&workout_id, set_id).await?;

        self.db
            .update_set_values(set_id, values)
            .await
            .map_err(StorageError::write("update set"))
    }

    pub async fn delete_set(&self, set_id: &str) -> StorageResult<bool> {
        let mut session = self.session.lock().await;
        let workout_id = active_id(&session)?;
        self.ensure_set_in(&workout_id, set_id).await?;

        if session.last_completed_set_id.as_deref() == Some(set_id) {
            self.rest_timer.stop().await;
            session.last_completed_set_id = None;
        }

        let deleted = self
            .db
            .delete_set(set_id)
            .await
            .map_err(StorageError::write("delete set"))?;
        Ok(deleted.is_some())
    }

    /// Flip a set's completion. Completing starts the rest timer with the
    /// exercise's rest duration; un-completing the most recently completed
    /// set stops it.
    pub async fn toggle_set_completion(&self, set_id: &str) -> StorageResult<WorkoutSet> {
        let mut session = self.session.lock().await;
        let workout_id = active_id(&session)?;
        self.ensure_set_in(&workout_id, set_id).await?;

        let set = self
            .db
            .get_set(set_id)
            .await
            .map_err(StorageError::read("load set"))?
            .ok_or_else(|| StorageError::not_found("set", set_id))?;
        let now = self.clock.now();

        if set.is_completed {
            let updated = self
                .db
                .set_completion(set_id, false, now)
                .await
                .map_err(StorageError::write("mark set incomplete"))?;

            if session.last_completed_set_id.as_deref() == Some(set_id) {
                self.rest_timer.stop().await;
                session.last_completed_set_id = None;
            }
            return Ok(updated);
        }

        let updated = self
            .db
            .set_completion(set_id, true, now)
            .await
            .map_err(StorageError::write("mark set complete"))?;
        session.last_completed_set_id = Some(set_id.to_string());

        let rest_seconds = match self.db.exercise_for_set(set_id).await {
            Ok(Some(exercise)) => exercise.default_rest_seconds,
            Ok(None) => self.fallback_rest_seconds,
            Err(err) => {
                warn!("Falling back to default rest for set {set_id}: {err:#}");
                self.fallback_rest_seconds
            }
        };
        self.rest_timer.start(rest_seconds).await;

        Ok(updated)
    }

    // Ending

    /// Complete the active workout, stamping its completion time and
    /// duration. Returns the stored workout, or `None` when nothing is active.
    pub async fn finish(&self) -> StorageResult<Option<Workout>> {
        let mut session = self.session.lock().await;
        let Some(workout) = session.workout.clone() else {
            return Ok(None);
        };

        let now = self.clock.now();
        let elapsed = (now - workout.started_at).num_seconds().max(0);
        let duration_seconds = u32::try_from(elapsed).unwrap_or(u32::MAX);

        let transitioned = self
            .db
            .finish_workout(&workout.id, now, duration_seconds)
            .await
            .map_err(StorageError::write("finish workout"))?;
        if !transitioned {
            warn!("Workout {} was already complete", workout.id);
        }

        self.rest_timer.stop().await;
        *session = ActiveSession::default();
        info!("Finished workout {} after {duration_seconds}s", workout.id);

        self.db
            .get_workout(&workout.id)
            .await
            .map_err(StorageError::read("load finished workout"))
    }

    /// Delete the active workout with everything it owns.
    pub async fn discard(&self) -> StorageResult<()> {
        let mut session = self.session.lock().await;
        let Some(workout) = session.workout.clone() else {
            return Ok(());
        };

        self.db
            .delete_workout(&workout.id)
            .await
            .map_err(StorageError::write("discard workout"))?;

        self.rest_timer.stop().await;
        *session = ActiveSession::default();
        info!("Discarded workout {}", workout.id);
        Ok(())
    }

    // Derived state

    pub async fn elapsed_seconds(&self) -> u64 {
        let session = self.session.lock().await;
        match session.workout.as_ref() {
            Some(workout) => {
                let elapsed = (self.clock.now() - workout.started_at).num_seconds();
                u64::try_from(elapsed).unwrap_or(0)
            }
            None => 0,
        }
    }

    pub async fn formatted_elapsed(&self) -> String {
        format_elapsed(self.elapsed_seconds().await)
    }

    pub async fn has_completed_sets(&self) -> StorageResult<bool> {
        let Some(workout_id) = self.active_workout_id().await else {
            return Ok(false);
        };
        let count = self
            .db
            .count_completed_sets(&workout_id)
            .await
            .map_err(StorageError::read("count completed sets"))?;
        Ok(count > 0)
    }

    async fn active_workout_id(&self) -> Option<String> {
        self.session
            .lock()
            .await
            .workout
            .as_ref()
            .map(|workout| workout.id.clone())
    }

    async fn require_active_workout_id(&self) -> StorageResult<String> {
        active_id(&*self.session.lock().await)
    }

    /// Edits only reach rows of the active workout; history stays read-only.
    async fn ensure_entry_in(&self, workout_id: &str, workout_exercise_id: &str) -> StorageResult<()> {
        let owner = self
            .db
            .workout_id_for_workout_exercise(workout_exercise_id)
            .await
            .map_err(StorageError::read("load workout exercise"))?;
        match owner {
            Some(owner) if owner == workout_id => Ok(()),
            Some(_) => Err(StorageError::not_in_active_workout("workout exercise", workout_exercise_id)),
            None => Err(StorageError::not_found("workout exercise", workout_exercise_id)),
        }
    }

    async fn ensure_set_in(&self, workout_id: &str, set_id: &str) -> StorageResult<()> {
        let owner = self
            .db
            .workout_id_for_set(set_id)
            .await
            .map_err(StorageError::read("load set"))?;
        match owner {
            Some(owner) if owner == workout_id => Ok(()),
            Some(_) => Err(StorageError::not_in_active_workout("set", set_id)),
            None => Err(StorageError::not_found("set", set_id)),
        }
    }

    async fn prefill(&self, exercise_id: &str, set_count: u32) -> StorageResult<Vec<SetValues>> {
        let exercise_id = exercise_id.to_string();
        self.db
            .execute(move |conn| prefill_for_exercise(conn, &exercise_id, set_count))
            .await
            .map_err(StorageError::read("load previous sets"))
    }

    /// Removing an exercise also removes its sets; the countdown started by
    /// one of them goes with it.
    async fn stop_timer_if_last_completed_in(&self, workout_exercise_id: &str) -> StorageResult<()> {
        let mut session = self.session.lock().await;
        let Some(set_id) = session.last_completed_set_id.clone() else {
            return Ok(());
        };

        let owner = self
            .db
            .get_set(&set_id)
            .await
            .map_err(StorageError::read("load set"))?
            .map(|set| set.workout_exercise_id);
        if owner.as_deref() == Some(workout_exercise_id) {
            self.rest_timer.stop().await;
            session.last_completed_set_id = None;
        }
        Ok(())
    }
}

fn active_id(session: &ActiveSession) -> StorageResult<String> {
    session
        .workout
        .as_ref()
        .map(|workout| workout.id.clone())
        .ok_or(StorageError::NoActiveWorkout)
}
