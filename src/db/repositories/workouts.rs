use anyhow::Result;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Row};

use crate::db::{
    connection::Database,
    helpers::{parse_datetime, parse_optional_datetime, to_optional_u32, to_u32},
    models::{ExerciseDetail, SetValues, Workout, WorkoutDetail, WorkoutExercise, WorkoutSet},
    repositories::exercises::load_exercise,
};

const WORKOUT_COLUMNS: &str =
    "id, name, started_at, completed_at, duration_seconds, is_in_progress, template_id";
pub(crate) const SET_COLUMNS: &str = "id, workout_exercise_id, position, weight, reps, distance, seconds, rpe, is_completed, completed_at";

fn row_to_workout(row: &Row) -> Result<Workout> {
    let started_at: String = row.get("started_at")?;
    let completed_at: Option<String> = row.get("completed_at")?;
    let duration_seconds: Option<i64> = row.get("duration_seconds")?;

    Ok(Workout {
        id: row.get("id")?,
        name: row.get("name")?,
        started_at: parse_datetime(&started_at, "started_at")?,
        completed_at: parse_optional_datetime(completed_at, "completed_at")?,
        duration_seconds: to_optional_u32(duration_seconds, "duration_seconds")?,
        is_in_progress: row.get("is_in_progress")?,
        template_id: row.get("template_id")?,
    })
}

fn row_to_workout_exercise(row: &Row) -> Result<WorkoutExercise> {
    let position: i64 = row.get("position")?;
    Ok(WorkoutExercise {
        id: row.get("id")?,
        workout_id: row.get("workout_id")?,
        exercise_id: row.get("exercise_id")?,
        position: to_u32(position, "position")?,
    })
}

pub(crate) fn row_to_set(row: &Row) -> Result<WorkoutSet> {
    let position: i64 = row.get("position")?;
    let completed_at: Option<String> = row.get("completed_at")?;

    Ok(WorkoutSet {
        id: row.get("id")?,
        workout_exercise_id: row.get("workout_exercise_id")?,
        position: to_u32(position, "position")?,
        values: SetValues {
            weight: row.get("weight")?,
            reps: row.get("reps")?,
            distance: row.get("distance")?,
            seconds: row.get("seconds")?,
            rpe: row.get("rpe")?,
        },
        is_completed: row.get("is_completed")?,
        completed_at: parse_optional_datetime(completed_at, "completed_at")?,
    })
}

pub(crate) fn insert_workout(conn: &Connection, workout: &Workout) -> Result<()> {
    conn.execute(
        "INSERT INTO workouts (id, name, started_at, completed_at, duration_seconds, is_in_progress, template_id)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            workout.id,
            workout.name,
            workout.started_at.to_rfc3339(),
            workout.completed_at.as_ref().map(|dt| dt.to_rfc3339()),
            workout.duration_seconds,
            workout.is_in_progress,
            workout.template_id,
        ],
    )?;
    Ok(())
}

pub(crate) fn insert_workout_exercise(conn: &Connection, entry: &WorkoutExercise) -> Result<()> {
    conn.execute(
        "INSERT INTO workout_exercises (id, workout_id, exercise_id, position)
         VALUES (?1, ?2, ?3, ?4)",
        params![entry.id, entry.workout_id, entry.exercise_id, entry.position],
    )?;
    Ok(())
}

pub(crate) fn insert_set(conn: &Connection, set: &WorkoutSet) -> Result<()> {
    conn.execute(
        "INSERT INTO workout_sets (id, workout_exercise_id, position, weight, reps, distance, seconds, rpe, is_completed, completed_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        params![
            set.id,
            set.workout_exercise_id,
            set.position,
            set.values.weight,
            set.values.reps,
            set.values.distance,
            set.values.seconds,
            set.values.rpe,
            set.is_completed,
            set.completed_at.as_ref().map(|dt| dt.to_rfc3339()),
        ],
    )?;
    Ok(())
}

pub(crate) fn load_workout(conn: &Connection, workout_id: &str) -> Result<Option<Workout>> {
    let mut stmt = conn.prepare_cached(&format!(
        "SELECT {WORKOUT_COLUMNS} FROM workouts WHERE id = ?1"
    ))?;
    let mut rows = stmt.query(params![workout_id])?;
    match rows.next()? {
        Some(row) => Ok(Some(row_to_workout(row)?)),
        None => Ok(None),
    }
}

pub(crate) fn load_workout_exercises(
    conn: &Connection,
    workout_id: &str,
) -> Result<Vec<WorkoutExercise>> {
    let mut stmt = conn.prepare_cached(
        "SELECT id, workout_id, exercise_id, position
         FROM workout_exercises
         WHERE workout_id = ?1
         ORDER BY position",
    )?;
    let mut rows = stmt.query(params![workout_id])?;
    let mut entries = Vec::new();
    while let Some(row) = rows.next()? {
        entries.push(row_to_workout_exercise(row)?);
    }
    Ok(entries)
}

pub(crate) fn load_workout_exercise(
    conn: &Connection,
    workout_exercise_id: &str,
) -> Result<Option<WorkoutExercise>> {
    let mut stmt = conn.prepare_cached(
        "SELECT id, workout_id, exercise_id, position FROM workout_exercises WHERE id = ?1",
    )?;
    let mut rows = stmt.query(params![workout_exercise_id])?;
    match rows.next()? {
        Some(row) => Ok(Some(row_to_workout_exercise(row)?)),
        None => Ok(None),
    }
}

pub(crate) fn load_sets(conn: &Connection, workout_exercise_id: &str) -> Result<Vec<WorkoutSet>> {
    let mut stmt = conn.prepare_cached(&format!(
        "SELECT {SET_COLUMNS} FROM workout_sets WHERE workout_exercise_id = ?1 ORDER BY position"
    ))?;
    let mut rows = stmt.query(params![workout_exercise_id])?;
    let mut sets = Vec::new();
    while let Some(row) = rows.next()? {
        sets.push(row_to_set(row)?);
    }
    Ok(sets)
}

pub(crate) fn load_workout_detail(
    conn: &Connection,
    workout_id: &str,
) -> Result<Option<WorkoutDetail>> {
    let Some(workout) = load_workout(conn, workout_id)? else {
        return Ok(None);
    };

    let mut exercises = Vec::new();
    for entry in load_workout_exercises(conn, workout_id)? {
        let exercise = match entry.exercise_id.as_deref() {
            Some(exercise_id) => load_exercise(conn, exercise_id)?,
            None => None,
        };
        let sets = load_sets(conn, &entry.id)?;
        exercises.push(ExerciseDetail {
            entry,
            exercise,
            sets,
        });
    }

    Ok(Some(WorkoutDetail { workout, exercises }))
}

pub(crate) fn load_in_progress_workout(conn: &Connection) -> Result<Option<Workout>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {WORKOUT_COLUMNS}
         FROM workouts
         WHERE is_in_progress = 1
         ORDER BY started_at DESC
         LIMIT 1"
    ))?;
    let mut rows = stmt.query([])?;
    match rows.next()? {
        Some(row) => Ok(Some(row_to_workout(row)?)),
        None => Ok(None),
    }
}

/// Sets of the newest completed workout that recorded `exercise_id` with at
/// least one set. Empty when the exercise has no history.
pub(crate) fn load_latest_sets_for_exercise(
    conn: &Connection,
    exercise_id: &str,
) -> Result<Vec<WorkoutSet>> {
    let mut stmt = conn.prepare_cached(
        "SELECT we.id
         FROM workout_exercises we
         JOIN workouts w ON w.id = we.workout_id
         WHERE we.exercise_id = ?1
           AND w.is_in_progress = 0
           AND EXISTS (SELECT 1 FROM workout_sets s WHERE s.workout_exercise_id = we.id)
         ORDER BY w.started_at DESC
         LIMIT 1",
    )?;
    let mut rows = stmt.query(params![exercise_id])?;
    let source: Option<String> = match rows.next()? {
        Some(row) => Some(row.get(0)?),
        None => None,
    };

    match source {
        Some(workout_exercise_id) => load_sets(conn, &workout_exercise_id),
        None => Ok(Vec::new()),
    }
}

/// Remove a workout exercise and its sets, then close the position gap.
pub(crate) fn delete_workout_exercise_cascade(
    conn: &Connection,
    workout_exercise_id: &str,
) -> Result<bool> {
    let Some(entry) = load_workout_exercise(conn, workout_exercise_id)? else {
        return Ok(false);
    };

    conn.execute(
        "DELETE FROM workout_sets WHERE workout_exercise_id = ?1",
        params![workout_exercise_id],
    )?;
    conn.execute(
        "DELETE FROM workout_exercises WHERE id = ?1",
        params![workout_exercise_id],
    )?;
    reindex_workout_exercises(conn, &entry.workout_id)?;
    Ok(true)
}

pub(crate) fn reindex_workout_exercises(conn: &Connection, workout_id: &str) -> Result<()> {
    let ids: Vec<String> = load_workout_exercises(conn, workout_id)?
        .into_iter()
        .map(|entry| entry.id)
        .collect();
    for (position, id) in ids.iter().enumerate() {
        conn.execute(
            "UPDATE workout_exercises SET position = ?1 WHERE id = ?2",
            params![position as u32, id],
        )?;
    }
    Ok(())
}

pub(crate) fn reindex_sets(conn: &Connection, workout_exercise_id: &str) -> Result<()> {
    let ids: Vec<String> = load_sets(conn, workout_exercise_id)?
        .into_iter()
        .map(|set| set.id)
        .collect();
    for (position, id) in ids.iter().enumerate() {
        conn.execute(
            "UPDATE workout_sets SET position = ?1 WHERE id = ?2",
            params![position as u32, id],
        )?;
    }
    Ok(())
}

impl Database {
    pub async fn insert_workout(&self, workout: &Workout) -> Result<()> {
        let record = workout.clone();
        self.execute(move |conn| insert_workout(conn, &record)).await
    }

    pub async fn get_workout(&self, workout_id: &str) -> Result<Option<Workout>> {
        let workout_id = workout_id.to_string();
        self.execute(move |conn| load_workout(conn, &workout_id)).await
    }

    pub async fn get_workout_detail(&self, workout_id: &str) -> Result<Option<WorkoutDetail>> {
        let workout_id = workout_id.to_string();
        self.execute(move |conn| load_workout_detail(conn, &workout_id))
            .await
    }

    pub async fn get_in_progress_workout(&self) -> Result<Option<Workout>> {
        self.execute(|conn| load_in_progress_workout(conn)).await
    }

    /// History view: completed workouts, newest first.
    pub async fn list_completed_workouts(&self) -> Result<Vec<Workout>> {
        self.execute(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {WORKOUT_COLUMNS}
                 FROM workouts
                 WHERE is_in_progress = 0
                 ORDER BY started_at DESC"
            ))?;

            let mut rows = stmt.query([])?;
            let mut workouts = Vec::new();
            while let Some(row) = rows.next()? {
                workouts.push(row_to_workout(row)?);
            }

            Ok(workouts)
        })
        .await
    }

    /// Mark a workout complete. Only an in-progress workout transitions;
    /// returns `false` when the workout was already complete or is missing.
    pub async fn finish_workout(
        &self,
        workout_id: &str,
        completed_at: DateTime<Utc>,
        duration_seconds: u32,
    ) -> Result<bool> {
        let workout_id = workout_id.to_string();
        self.execute(move |conn| {
            let rows_affected = conn.execute(
                "UPDATE workouts
                 SET is_in_progress = 0,
                     completed_at = ?1,
                     duration_seconds = ?2
                 WHERE id = ?3 AND is_in_progress = 1",
                params![completed_at.to_rfc3339(), duration_seconds, workout_id],
            )?;
            Ok(rows_affected == 1)
        })
        .await
    }

    pub async fn rename_workout(&self, workout_id: &str, name: String) -> Result<()> {
        let workout_id = workout_id.to_string();
        self.execute(move |conn| {
            let rows_affected = conn.execute(
                "UPDATE workouts SET name = ?1 WHERE id = ?2",
                params![name, workout_id],
            )?;
            if rows_affected == 0 {
                return Err(anyhow::anyhow!("Workout not found"));
            }
            Ok(())
        })
        .await
    }

    /// Delete a workout with all of its exercises and sets.
    pub async fn delete_workout(&self, workout_id: &str) -> Result<()> {
        let workout_id = workout_id.to_string();
        self.execute(move |conn| {
            let tx = conn.transaction()?;

            // 1. Sets of every exercise in the workout
            tx.execute(
                "DELETE FROM workout_sets
                 WHERE workout_exercise_id IN (SELECT id FROM workout_exercises WHERE workout_id = ?1)",
                params![workout_id],
            )?;

            // 2. The workout's exercises
            tx.execute(
                "DELETE FROM workout_exercises WHERE workout_id = ?1",
                params![workout_id],
            )?;

            // 3. The workout itself; already gone is fine
            tx.execute("DELETE FROM workouts WHERE id = ?1", params![workout_id])?;

            tx.commit()?;
            Ok(())
        })
        .await
    }
}
