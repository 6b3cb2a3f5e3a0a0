use anyhow::{bail, Result};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::{
    db::{
        connection::Database,
        helpers::{parse_datetime, parse_optional_tag, parse_tag, to_u32},
        models::{BodyPart, EquipmentType, Exercise, MovementCategory, DEFAULT_REST_SECONDS},
    },
    inference::infer_equipment,
};

const EXERCISE_COLUMNS: &str =
    "id, name, movement, equipment, body_part, default_rest_seconds, created_at";

fn row_to_exercise(row: &Row) -> Result<Exercise> {
    let movement: String = row.get("movement")?;
    let equipment: Option<String> = row.get("equipment")?;
    let body_part: Option<String> = row.get("body_part")?;
    let rest: i64 = row.get("default_rest_seconds")?;
    let created_at: String = row.get("created_at")?;

    Ok(Exercise {
        id: row.get("id")?,
        name: row.get("name")?,
        movement: parse_tag(&movement, "movement")?,
        equipment: parse_optional_tag(equipment, "equipment")?,
        body_part: parse_optional_tag(body_part, "body_part")?,
        default_rest_seconds: to_u32(rest, "default_rest_seconds")?,
        created_at: parse_datetime(&created_at, "created_at")?,
    })
}

pub(crate) fn insert_exercise(conn: &Connection, exercise: &Exercise) -> Result<()> {
    conn.execute(
        "INSERT INTO exercises (id, name, movement, equipment, body_part, default_rest_seconds, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            exercise.id,
            exercise.name,
            exercise.movement.as_str(),
            exercise.equipment.map(|e| e.as_str()),
            exercise.body_part.map(|b| b.as_str()),
            exercise.default_rest_seconds,
            exercise.created_at.to_rfc3339(),
        ],
    )?;
    Ok(())
}

pub(crate) fn load_exercise(conn: &Connection, exercise_id: &str) -> Result<Option<Exercise>> {
    let mut stmt = conn.prepare_cached(&format!(
        "SELECT {EXERCISE_COLUMNS} FROM exercises WHERE id = ?1"
    ))?;
    let mut rows = stmt.query(params![exercise_id])?;
    match rows.next()? {
        Some(row) => Ok(Some(row_to_exercise(row)?)),
        None => Ok(None),
    }
}

pub(crate) fn load_exercise_by_name(conn: &Connection, name: &str) -> Result<Option<Exercise>> {
    let mut stmt = conn.prepare_cached(&format!(
        "SELECT {EXERCISE_COLUMNS} FROM exercises WHERE name = ?1"
    ))?;
    let mut rows = stmt.query(params![name])?;
    match rows.next()? {
        Some(row) => Ok(Some(row_to_exercise(row)?)),
        None => Ok(None),
    }
}

pub(crate) fn load_all_exercises(conn: &Connection) -> Result<Vec<Exercise>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {EXERCISE_COLUMNS} FROM exercises ORDER BY name"
    ))?;
    let mut rows = stmt.query([])?;
    let mut exercises = Vec::new();
    while let Some(row) = rows.next()? {
        exercises.push(row_to_exercise(row)?);
    }
    Ok(exercises)
}

impl Database {
    pub async fn insert_exercise(&self, exercise: &Exercise) -> Result<()> {
        let record = exercise.clone();
        self.execute(move |conn| insert_exercise(conn, &record)).await
    }

    pub async fn get_exercise(&self, exercise_id: &str) -> Result<Option<Exercise>> {
        let exercise_id = exercise_id.to_string();
        self.execute(move |conn| load_exercise(conn, &exercise_id))
            .await
    }

    /// Exact, case-sensitive name lookup.
    pub async fn find_exercise_by_name(&self, name: &str) -> Result<Option<Exercise>> {
        let name = name.to_string();
        self.execute(move |conn| load_exercise_by_name(conn, &name))
            .await
    }

    pub async fn list_exercises(&self) -> Result<Vec<Exercise>> {
        self.execute(|conn| load_all_exercises(conn)).await
    }

    /// Manually add a catalog entry. Equipment is inferred from the name when
    /// not given; body part stays unset and is inferred on read.
    pub async fn create_exercise(
        &self,
        name: String,
        movement: MovementCategory,
        equipment: Option<EquipmentType>,
        body_part: Option<BodyPart>,
    ) -> Result<Exercise> {
        self.execute(move |conn| {
            let name = name.trim().to_string();
            if name.is_empty() {
                bail!("exercise name must not be empty");
            }

            if load_exercise_by_name(conn, &name)?.is_some() {
                bail!("exercise \"{name}\" already exists");
            }

            let exercise = Exercise {
                id: uuid::Uuid::new_v4().to_string(),
                equipment: Some(equipment.unwrap_or_else(|| infer_equipment(&name, movement))),
                body_part,
                movement,
                default_rest_seconds: DEFAULT_REST_SECONDS,
                created_at: Utc::now(),
                name,
            };
            insert_exercise(conn, &exercise)?;
            Ok(exercise)
        })
        .await
    }

    pub async fn update_exercise_rest(&self, exercise_id: &str, rest_seconds: u32) -> Result<()> {
        let exercise_id = exercise_id.to_string();
        self.execute(move |conn| {
            let rows_affected = conn.execute(
                "UPDATE exercises SET default_rest_seconds = ?1 WHERE id = ?2",
                params![rest_seconds, exercise_id],
            )?;
            if rows_affected == 0 {
                bail!("Exercise not found");
            }
            Ok(())
        })
        .await
    }

    pub async fn exercise_name_taken(&self, name: &str) -> Result<bool> {
        let name = name.to_string();
        self.execute(move |conn| {
            let found: Option<String> = conn
                .query_row(
                    "SELECT id FROM exercises WHERE name = ?1",
                    params![name],
                    |row| row.get(0),
                )
                .optional()?;
            Ok(found.is_some())
        })
        .await
    }
}
