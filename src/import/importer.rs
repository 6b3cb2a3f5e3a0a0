use std::{collections::HashMap, path::Path, sync::Arc};

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use log::{debug, info};
use rusqlite::Connection;
use serde::Serialize;

use crate::{
    config::ImportConfig,
    db::{
        models::{
            BodyPart, EquipmentType, Exercise, MovementCategory, SetValues, TemplateExerciseInput,
            Workout, WorkoutExercise, WorkoutSet, WorkoutTemplate,
        },
        repositories::{
            exercises::{insert_exercise, load_all_exercises},
            templates::{insert_template, template_name_exists},
            workouts::{insert_set, insert_workout, insert_workout_exercise},
        },
        Database,
    },
    error::{StorageError, StorageResult},
    inference::infer_equipment,
    timer::Clock,
};

use super::{
    grouping::{group_exercises, group_sessions},
    parser::{parse_date, parse_duration, parse_export, ImportRow},
};

#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ImportSummary {
    pub sessions_created: usize,
    pub rows_imported: usize,
    pub rows_skipped: usize,
    pub catalog_entries_created: usize,
    pub templates_created: usize,
}

/// A session ready to be written, with its catalog lookups still pending.
#[derive(Debug, Clone)]
struct SessionPlan {
    name: String,
    started_at: DateTime<Utc>,
    duration_seconds: u32,
    exercises: Vec<ExercisePlan>,
}

#[derive(Debug, Clone)]
struct ExercisePlan {
    name: String,
    body_part: Option<BodyPart>,
    equipment: Option<EquipmentType>,
    sets: Vec<(u32, SetValues)>,
}

/// What a written session looked like, kept for template generation.
#[derive(Debug, Clone)]
struct ImportedSession {
    started_at: DateTime<Utc>,
    exercises: Vec<TemplateExerciseInput>,
}

/// Name-keyed catalog shared by every batch of one import.
#[derive(Debug, Default)]
struct CatalogCache {
    by_name: HashMap<String, Exercise>,
    created: usize,
}

impl CatalogCache {
    fn resolve(&mut self, conn: &Connection, plan: &ExercisePlan) -> Result<String> {
        if let Some(existing) = self.by_name.get(&plan.name) {
            return Ok(existing.id.clone());
        }

        let exercise = new_catalog_entry(plan);
        insert_exercise(conn, &exercise)
            .with_context(|| format!("failed to create exercise \"{}\"", plan.name))?;
        debug!("Created catalog entry {}", exercise.name);

        let id = exercise.id.clone();
        self.by_name.insert(exercise.name.clone(), exercise);
        self.created += 1;
        Ok(id)
    }
}

fn new_catalog_entry(plan: &ExercisePlan) -> Exercise {
    let equipment = plan
        .equipment
        .unwrap_or_else(|| infer_equipment(&plan.name, MovementCategory::Strength));
    Exercise {
        equipment: Some(equipment),
        body_part: plan.body_part,
        ..Exercise::new(&plan.name, MovementCategory::for_equipment(equipment))
    }
}

/// Turns a history export into completed workouts, catalog entries and
/// templates. Rows are processed in file order, one session at a time, and
/// written in batches; a failed batch leaves earlier batches committed.
#[derive(Clone)]
pub struct HistoryImporter {
    db: Database,
    clock: Arc<dyn Clock>,
    batch_size: usize,
    template_names: Vec<String>,
}

impl HistoryImporter {
    pub fn new(db: Database, clock: Arc<dyn Clock>, config: &ImportConfig) -> Self {
        Self {
            db,
            clock,
            batch_size: config.batch_size.max(1),
            template_names: config.template_names.clone(),
        }
    }

    pub async fn import_file(&self, path: &Path) -> StorageResult<ImportSummary> {
        let raw = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("failed to read {}", path.display()))
            .map_err(StorageError::read("read import file"))?;
        self.import_batch(&raw).await
    }

    pub async fn import_batch(&self, raw: &str) -> StorageResult<ImportSummary> {
        let parsed = parse_export(raw);
        info!(
            "Importing history: {} rows parsed, {} rejected",
            parsed.rows.len(),
            parsed.skipped
        );

        let mut summary = ImportSummary {
            rows_skipped: parsed.skipped,
            ..ImportSummary::default()
        };
        let plans = plan_sessions(&parsed.rows, &mut summary);

        let mut cache = CatalogCache {
            by_name: self
                .db
                .execute(|conn| load_all_exercises(conn))
                .await
                .map_err(StorageError::read("load exercise catalog"))?
                .into_iter()
                .map(|exercise| (exercise.name.clone(), exercise))
                .collect(),
            created: 0,
        };

        let mut latest_by_name: HashMap<String, ImportedSession> = HashMap::new();
        for batch in plans.chunks(self.batch_size) {
            let batch = batch.to_vec();
            let (returned, written) = self
                .db
                .execute(move |conn| {
                    let tx = conn.transaction()?;
                    let mut written = Vec::with_capacity(batch.len());
                    for plan in batch {
                        written.push(write_session(&tx, &mut cache, plan)?);
                    }
                    tx.commit()?;
                    Ok((cache, written))
                })
                .await
                .map_err(StorageError::write("import workouts"))?;

            cache = returned;
            summary.sessions_created += written.len();
            debug!("Committed {} imported sessions", summary.sessions_created);
            for (name, session) in written {
                latest_by_name.insert(name, session);
            }
        }
        summary.catalog_entries_created = cache.created;

        summary.templates_created = self.create_templates(latest_by_name).await?;

        info!(
            "Import finished: {} sessions, {} rows imported, {} skipped, {} new exercises, {} templates",
            summary.sessions_created,
            summary.rows_imported,
            summary.rows_skipped,
            summary.catalog_entries_created,
            summary.templates_created
        );
        Ok(summary)
    }

    /// Template per allowlisted name from the last imported session with
    /// that name, unless a template with the name already exists.
    async fn create_templates(
        &self,
        mut latest_by_name: HashMap<String, ImportedSession>,
    ) -> StorageResult<usize> {
        let candidates: Vec<(String, ImportedSession)> = self
            .template_names
            .iter()
            .filter_map(|name| {
                latest_by_name
                    .remove(name)
                    .map(|session| (name.clone(), session))
            })
            .collect();
        if candidates.is_empty() {
            return Ok(0);
        }
        let now = self.clock.now();

        self.db
            .execute(move |conn| {
                let tx = conn.transaction()?;
                let mut created = 0;
                for (name, session) in candidates {
                    if template_name_exists(&tx, &name)? {
                        debug!("Template {name} already exists");
                        continue;
                    }
                    let template = WorkoutTemplate {
                        last_used_at: Some(session.started_at),
                        ..WorkoutTemplate::new(&name, now)
                    };
                    insert_template(&tx, &template, &session.exercises)?;
                    info!("Created template {name} from imported history");
                    created += 1;
                }
                tx.commit()?;
                Ok(created)
            })
            .await
            .map_err(StorageError::write("create imported templates"))
    }
}

/// Group rows into sessions and exercises. Sessions whose date cannot be
/// parsed are dropped and their rows counted as skipped.
fn plan_sessions(rows: &[ImportRow], summary: &mut ImportSummary) -> Vec<SessionPlan> {
    let mut plans = Vec::new();
    for group in group_sessions(rows) {
        let first = &group[0];
        let Some(started_at) = parse_date(&first.date) else {
            debug!(
                "Skipping {} rows of \"{}\" with unreadable date {:?}",
                group.len(),
                first.session_name,
                first.date
            );
            summary.rows_skipped += group.len();
            continue;
        };

        let exercises = group_exercises(group)
            .into_iter()
            .map(|rows| ExercisePlan {
                name: rows[0].exercise_name.clone(),
                body_part: rows[0].body_part,
                equipment: rows[0].equipment,
                sets: rows.iter().map(|row| (row.set_order, row.values)).collect(),
            })
            .collect();

        summary.rows_imported += group.len();
        plans.push(SessionPlan {
            name: first.session_name.clone(),
            started_at,
            duration_seconds: parse_duration(&first.duration),
            exercises,
        });
    }
    plans
}

fn write_session(
    conn: &Connection,
    cache: &mut CatalogCache,
    plan: SessionPlan,
) -> Result<(String, ImportedSession)> {
    let workout = Workout::completed(&plan.name, plan.started_at, plan.duration_seconds);
    let completed_at = plan.started_at + Duration::seconds(i64::from(plan.duration_seconds));
    insert_workout(conn, &workout)?;

    let mut template_exercises = Vec::with_capacity(plan.exercises.len());
    for (position, exercise_plan) in plan.exercises.iter().enumerate() {
        let exercise_id = cache.resolve(conn, exercise_plan)?;
        let entry = WorkoutExercise::new(&workout.id, &exercise_id, position as u32);
        insert_workout_exercise(conn, &entry)?;

        for (set_order, values) in &exercise_plan.sets {
            let mut set = WorkoutSet::new(&entry.id, *set_order, *values);
            set.mark_completed(completed_at);
            insert_set(conn, &set)?;
        }

        template_exercises.push(TemplateExerciseInput {
            exercise_id,
            default_sets: exercise_plan.sets.len() as u32,
        });
    }

    Ok((
        plan.name,
        ImportedSession {
            started_at: plan.started_at,
            exercises: template_exercises,
        },
    ))
}
