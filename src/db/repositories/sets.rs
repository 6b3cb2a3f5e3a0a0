use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use crate::db::{
    connection::Database,
    models::{Exercise, ExerciseDetail, SetValues, WorkoutExercise, WorkoutSet},
    repositories::{
        exercises::load_exercise,
        workouts::{
            delete_workout_exercise_cascade, insert_set, insert_workout_exercise,
            load_sets, load_workout_exercise,
            reindex_sets, row_to_set, SET_COLUMNS,
        },
    },
};

pub(crate) fn load_set(conn: &Connection, set_id: &str) -> Result<Option<WorkoutSet>> {
    let mut stmt = conn.prepare_cached(&format!(
        "SELECT {SET_COLUMNS} FROM workout_sets WHERE id = ?1"
    ))?;
    let mut rows = stmt.query(params![set_id])?;
    match rows.next()? {
        Some(row) => Ok(Some(row_to_set(row)?)),
        None => Ok(None),
    }
}

fn count_rows(conn: &Connection, sql: &str, parent_id: &str) -> Result<u32> {
    let count: i64 = conn.query_row(sql, params![parent_id], |row| row.get(0))?;
    Ok(u32::try_from(count)?)
}

impl Database {
    /// Append a catalog exercise to a workout with the given set values, all
    /// incomplete. Returns the new entry with its sets.
    pub async fn add_workout_exercise(
        &self,
        workout_id: &str,
        exercise_id: &str,
        sets: Vec<SetValues>,
    ) -> Result<ExerciseDetail> {
        let workout_id = workout_id.to_string();
        let exercise_id = exercise_id.to_string();
        self.execute(move |conn| {
            let tx = conn.transaction()?;

            let exercise = load_exercise(&tx, &exercise_id)?
                .ok_or_else(|| anyhow!("Exercise not found"))?;
            let position = count_rows(
                &tx,
                "SELECT COUNT(*) FROM workout_exercises WHERE workout_id = ?1",
                &workout_id,
            )?;

            let entry = WorkoutExercise::new(&workout_id, &exercise_id, position);
            insert_workout_exercise(&tx, &entry)?;

            let mut created = Vec::with_capacity(sets.len());
            for (index, values) in sets.into_iter().enumerate() {
                let set = WorkoutSet::new(&entry.id, index as u32, values);
                insert_set(&tx, &set)?;
                created.push(set);
            }

            tx.commit()?;
            Ok(ExerciseDetail {
                entry,
                exercise: Some(exercise),
                sets: created,
            })
        })
        .await
    }

    /// Remove an exercise and its sets from a workout. Remaining exercises
    /// keep contiguous positions.
    pub async fn remove_workout_exercise(&self, workout_exercise_id: &str) -> Result<bool> {
        let workout_exercise_id = workout_exercise_id.to_string();
        self.execute(move |conn| {
            let tx = conn.transaction()?;
            let removed = delete_workout_exercise_cascade(&tx, &workout_exercise_id)?;
            tx.commit()?;
            Ok(removed)
        })
        .await
    }

    /// Point a workout exercise at a different catalog entry, replacing its
    /// sets with fresh incomplete ones. The position is kept.
    pub async fn swap_workout_exercise(
        &self,
        workout_exercise_id: &str,
        exercise_id: &str,
        sets: Vec<SetValues>,
    ) -> Result<ExerciseDetail> {
        let workout_exercise_id = workout_exercise_id.to_string();
        let exercise_id = exercise_id.to_string();
        self.execute(move |conn| {
            let tx = conn.transaction()?;

            let exercise = load_exercise(&tx, &exercise_id)?
                .ok_or_else(|| anyhow!("Exercise not found"))?;
            let mut entry = load_workout_exercise(&tx, &workout_exercise_id)?
                .ok_or_else(|| anyhow!("Workout exercise not found"))?;

            tx.execute(
                "DELETE FROM workout_sets WHERE workout_exercise_id = ?1",
                params![workout_exercise_id],
            )?;
            tx.execute(
                "UPDATE workout_exercises SET exercise_id = ?1 WHERE id = ?2",
                params![exercise_id, workout_exercise_id],
            )?;
            entry.exercise_id = Some(exercise_id);

            let mut created = Vec::with_capacity(sets.len());
            for (index, values) in sets.into_iter().enumerate() {
                let set = WorkoutSet::new(&entry.id, index as u32, values);
                insert_set(&tx, &set)?;
                created.push(set);
            }

            tx.commit()?;
            Ok(ExerciseDetail {
                entry,
                exercise: Some(exercise),
                sets: created,
            })
        })
        .await
    }

    /// Append an incomplete set at the end of an exercise.
    pub async fn add_set(&self, workout_exercise_id: &str, values: SetValues) -> Result<WorkoutSet> {
        let workout_exercise_id = workout_exercise_id.to_string();
        self.execute(move |conn| {
            let position = count_rows(
                conn,
                "SELECT COUNT(*) FROM workout_sets WHERE workout_exercise_id = ?1",
                &workout_exercise_id,
            )?;
            let set = WorkoutSet::new(&workout_exercise_id, position, values);
            insert_set(conn, &set)?;
            Ok(set)
        })
        .await
    }

    pub async fn get_set(&self, set_id: &str) -> Result<Option<WorkoutSet>> {
        let set_id = set_id.to_string();
        self.execute(move |conn| load_set(conn, &set_id)).await
    }

    pub async fn list_sets(&self, workout_exercise_id: &str) -> Result<Vec<WorkoutSet>> {
        let workout_exercise_id = workout_exercise_id.to_string();
        self.execute(move |conn| load_sets(conn, &workout_exercise_id))
            .await
    }

    pub async fn update_set_values(&self, set_id: &str, values: SetValues) -> Result<WorkoutSet> {
        let set_id = set_id.to_string();
        self.execute(move |conn| {
            let rows_affected = conn.execute(
                "UPDATE workout_sets
                 SET weight = ?1, reps = ?2, distance = ?3, seconds = ?4, rpe = ?5
                 WHERE id = ?6",
                params![
                    values.weight,
                    values.reps,
                    values.distance,
                    values.seconds,
                    values.rpe,
                    set_id,
                ],
            )?;
            if rows_affected == 0 {
                return Err(anyhow!("Set not found"));
            }
            load_set(conn, &set_id)?.ok_or_else(|| anyhow!("Set not found"))
        })
        .await
    }

    /// Write a set's completion flag. `completed_at` is stored only while the
    /// set is complete.
    pub async fn set_completion(
        &self,
        set_id: &str,
        completed: bool,
        at: DateTime<Utc>,
    ) -> Result<WorkoutSet> {
        let set_id = set_id.to_string();
        self.execute(move |conn| {
            let completed_at = completed.then(|| at.to_rfc3339());
            let rows_affected = conn.execute(
                "UPDATE workout_sets SET is_completed = ?1, completed_at = ?2 WHERE id = ?3",
                params![completed, completed_at, set_id],
            )?;
            if rows_affected == 0 {
                return Err(anyhow!("Set not found"));
            }
            load_set(conn, &set_id)?.ok_or_else(|| anyhow!("Set not found"))
        })
        .await
    }

    /// Delete a set and close the position gap among its siblings. Returns
    /// the deleted set, or `None` when it did not exist.
    pub async fn delete_set(&self, set_id: &str) -> Result<Option<WorkoutSet>> {
        let set_id = set_id.to_string();
        self.execute(move |conn| {
            let tx = conn.transaction()?;
            let Some(set) = load_set(&tx, &set_id)? else {
                return Ok(None);
            };

            tx.execute("DELETE FROM workout_sets WHERE id = ?1", params![set_id])?;
            reindex_sets(&tx, &set.workout_exercise_id)?;
            tx.commit()?;
            Ok(Some(set))
        })
        .await
    }

    /// Catalog entry behind a set, if the set and its exercise still exist.
    pub async fn exercise_for_set(&self, set_id: &str) -> Result<Option<Exercise>> {
        let set_id = set_id.to_string();
        self.execute(move |conn| {
            let exercise_id: Option<Option<String>> = conn
                .query_row(
                    "SELECT we.exercise_id
                     FROM workout_sets s
                     JOIN workout_exercises we ON we.id = s.workout_exercise_id
                     WHERE s.id = ?1",
                    params![set_id],
                    |row| row.get(0),
                )
                .optional()?;

            match exercise_id.flatten() {
                Some(id) => load_exercise(conn, &id),
                None => Ok(None),
            }
        })
        .await
    }

    /// Workout that owns a set, if the set exists.
    pub async fn workout_id_for_set(&self, set_id: &str) -> Result<Option<String>> {
        let set_id = set_id.to_string();
        self.execute(move |conn| {
            let workout_id = conn
                .query_row(
                    "SELECT we.workout_id
                     FROM workout_sets s
                     JOIN workout_exercises we ON we.id = s.workout_exercise_id
                     WHERE s.id = ?1",
                    params![set_id],
                    |row| row.get(0),
                )
                .optional()?;
            Ok(workout_id)
        })
        .await
    }

    pub async fn workout_id_for_workout_exercise(
        &self,
        workout_exercise_id: &str,
    ) -> Result<Option<String>> {
        let workout_exercise_id = workout_exercise_id.to_string();
        self.execute(move |conn| {
            let workout_id = conn
                .query_row(
                    "SELECT workout_id FROM workout_exercises WHERE id = ?1",
                    params![workout_exercise_id],
                    |row| row.get(0),
                )
                .optional()?;
            Ok(workout_id)
        })
        .await
    }

    pub async fn count_completed_sets(&self, workout_id: &str) -> Result<u32> {
        let workout_id = workout_id.to_string();
        self.execute(move |conn| {
            count_rows(
                conn,
                "SELECT COUNT(*)
                 FROM workout_sets s
                 JOIN workout_exercises we ON we.id = s.workout_exercise_id
                 WHERE we.workout_id = ?1 AND s.is_completed = 1",
                &workout_id,
            )
        })
        .await
    }
}
