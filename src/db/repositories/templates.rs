use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Row};

use crate::db::{
    connection::Database,
    helpers::{parse_datetime, parse_optional_datetime, to_u32},
    models::{
        TemplateDetail, TemplateExercise, TemplateExerciseDetail, TemplateExerciseInput,
        WorkoutTemplate,
    },
    repositories::exercises::load_exercise,
};

const TEMPLATE_COLUMNS: &str = "id, name, created_at, last_used_at";

fn row_to_template(row: &Row) -> Result<WorkoutTemplate> {
    let created_at: String = row.get("created_at")?;
    let last_used_at: Option<String> = row.get("last_used_at")?;

    Ok(WorkoutTemplate {
        id: row.get("id")?,
        name: row.get("name")?,
        created_at: parse_datetime(&created_at, "created_at")?,
        last_used_at: parse_optional_datetime(last_used_at, "last_used_at")?,
    })
}

fn row_to_template_exercise(row: &Row) -> Result<TemplateExercise> {
    let position: i64 = row.get("position")?;
    let default_sets: i64 = row.get("default_sets")?;

    Ok(TemplateExercise {
        id: row.get("id")?,
        template_id: row.get("template_id")?,
        exercise_id: row.get("exercise_id")?,
        position: to_u32(position, "position")?,
        default_sets: to_u32(default_sets, "default_sets")?,
    })
}

/// Insert a template and its exercises in list order.
pub(crate) fn insert_template(
    conn: &Connection,
    template: &WorkoutTemplate,
    exercises: &[TemplateExerciseInput],
) -> Result<Vec<TemplateExercise>> {
    conn.execute(
        "INSERT INTO workout_templates (id, name, created_at, last_used_at)
         VALUES (?1, ?2, ?3, ?4)",
        params![
            template.id,
            template.name,
            template.created_at.to_rfc3339(),
            template.last_used_at.as_ref().map(|dt| dt.to_rfc3339()),
        ],
    )?;

    let mut entries = Vec::with_capacity(exercises.len());
    for (position, input) in exercises.iter().enumerate() {
        let entry = TemplateExercise {
            id: uuid::Uuid::new_v4().to_string(),
            template_id: template.id.clone(),
            exercise_id: Some(input.exercise_id.clone()),
            position: position as u32,
            default_sets: input.default_sets,
        };
        conn.execute(
            "INSERT INTO template_exercises (id, template_id, exercise_id, position, default_sets)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                entry.id,
                entry.template_id,
                entry.exercise_id,
                entry.position,
                entry.default_sets,
            ],
        )?;
        entries.push(entry);
    }

    Ok(entries)
}

pub(crate) fn template_name_exists(conn: &Connection, name: &str) -> Result<bool> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM workout_templates WHERE name = ?1",
        params![name],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

pub(crate) fn touch_template(conn: &Connection, template_id: &str, at: DateTime<Utc>) -> Result<()> {
    let rows_affected = conn.execute(
        "UPDATE workout_templates SET last_used_at = ?1 WHERE id = ?2",
        params![at.to_rfc3339(), template_id],
    )?;
    if rows_affected == 0 {
        return Err(anyhow!("Template not found"));
    }
    Ok(())
}

pub(crate) fn load_template(conn: &Connection, template_id: &str) -> Result<Option<WorkoutTemplate>> {
    let mut stmt = conn.prepare_cached(&format!(
        "SELECT {TEMPLATE_COLUMNS} FROM workout_templates WHERE id = ?1"
    ))?;
    let mut rows = stmt.query(params![template_id])?;
    match rows.next()? {
        Some(row) => Ok(Some(row_to_template(row)?)),
        None => Ok(None),
    }
}

pub(crate) fn load_template_detail(
    conn: &Connection,
    template_id: &str,
) -> Result<Option<TemplateDetail>> {
    let Some(template) = load_template(conn, template_id)? else {
        return Ok(None);
    };

    let mut stmt = conn.prepare_cached(
        "SELECT id, template_id, exercise_id, position, default_sets
         FROM template_exercises
         WHERE template_id = ?1
         ORDER BY position",
    )?;
    let mut rows = stmt.query(params![template_id])?;
    let mut entries = Vec::new();
    while let Some(row) = rows.next()? {
        entries.push(row_to_template_exercise(row)?);
    }

    let mut exercises = Vec::with_capacity(entries.len());
    for entry in entries {
        let exercise = match entry.exercise_id.as_deref() {
            Some(exercise_id) => load_exercise(conn, exercise_id)?,
            None => None,
        };
        exercises.push(TemplateExerciseDetail { entry, exercise });
    }

    Ok(Some(TemplateDetail {
        template,
        exercises,
    }))
}

impl Database {
    pub async fn create_template(
        &self,
        name: String,
        exercises: Vec<TemplateExerciseInput>,
    ) -> Result<TemplateDetail> {
        self.execute(move |conn| {
            let tx = conn.transaction()?;
            let template = WorkoutTemplate::new(name, Utc::now());
            insert_template(&tx, &template, &exercises)?;
            let detail = load_template_detail(&tx, &template.id)?
                .ok_or_else(|| anyhow!("Template vanished after insert"))?;
            tx.commit()?;
            Ok(detail)
        })
        .await
    }

    pub async fn template_name_exists(&self, name: &str) -> Result<bool> {
        let name = name.to_string();
        self.execute(move |conn| template_name_exists(conn, &name))
            .await
    }

    pub async fn get_template_detail(&self, template_id: &str) -> Result<Option<TemplateDetail>> {
        let template_id = template_id.to_string();
        self.execute(move |conn| load_template_detail(conn, &template_id))
            .await
    }

    /// Templates ordered by most recent use; never-used templates last.
    pub async fn list_templates(&self) -> Result<Vec<WorkoutTemplate>> {
        self.execute(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {TEMPLATE_COLUMNS}
                 FROM workout_templates
                 ORDER BY last_used_at IS NULL, last_used_at DESC, name"
            ))?;

            let mut rows = stmt.query([])?;
            let mut templates = Vec::new();
            while let Some(row) = rows.next()? {
                templates.push(row_to_template(row)?);
            }

            Ok(templates)
        })
        .await
    }

    pub async fn touch_template(&self, template_id: &str, at: DateTime<Utc>) -> Result<()> {
        let template_id = template_id.to_string();
        self.execute(move |conn| touch_template(conn, &template_id, at))
            .await
    }

    pub async fn delete_template(&self, template_id: &str) -> Result<()> {
        let template_id = template_id.to_string();
        self.execute(move |conn| {
            let tx = conn.transaction()?;
            tx.execute(
                "DELETE FROM template_exercises WHERE template_id = ?1",
                params![template_id],
            )?;
            tx.execute(
                "DELETE FROM workout_templates WHERE id = ?1",
                params![template_id],
            )?;
            tx.commit()?;
            Ok(())
        })
        .await
    }
}
