//! Workout template models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::db::models::{Exercise, Workout};

pub const DEFAULT_TEMPLATE_SETS: u32 = 3;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WorkoutTemplate {
    pub id: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub last_used_at: Option<DateTime<Utc>>,
}

impl WorkoutTemplate {
    pub fn new(name: impl Into<String>, created_at: DateTime<Utc>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.into(),
            created_at,
            last_used_at: None,
        }
    }

    /// Number of completed workouts carrying this template's name.
    pub fn workout_count(template_name: &str, workouts: &[Workout]) -> usize {
        workouts
            .iter()
            .filter(|w| w.name == template_name && !w.is_in_progress)
            .count()
    }

    /// Typical duration of completed workouts with this name, as "N min".
    ///
    /// With four or more samples, durations outside 1.5 IQR of the quartiles
    /// are dropped before averaging.
    pub fn average_duration(template_name: &str, workouts: &[Workout]) -> Option<String> {
        let mut durations: Vec<f64> = workouts
            .iter()
            .filter(|w| w.name == template_name && !w.is_in_progress)
            .filter_map(|w| w.duration_seconds)
            .map(f64::from)
            .collect();

        if durations.is_empty() {
            return None;
        }

        durations.sort_by(|a, b| a.total_cmp(b));
        let count = durations.len();
        let mean = |values: &[f64]| values.iter().sum::<f64>() / values.len() as f64;

        if count < 4 {
            return Some(format_minutes(mean(&durations)));
        }

        let q1 = durations[count / 4];
        let q3 = durations[(count * 3) / 4];
        let iqr = q3 - q1;
        let (lower, upper) = (q1 - 1.5 * iqr, q3 + 1.5 * iqr);

        let filtered: Vec<f64> = durations
            .iter()
            .copied()
            .filter(|d| *d >= lower && *d <= upper)
            .collect();

        if filtered.is_empty() {
            return Some(format_minutes(mean(&durations)));
        }
        Some(format_minutes(mean(&filtered)))
    }
}

fn format_minutes(seconds: f64) -> String {
    format!("{} min", (seconds / 60.0).round() as i64)
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TemplateExercise {
    pub id: String,
    pub template_id: String,
    pub exercise_id: Option<String>,
    pub position: u32,
    pub default_sets: u32,
}

/// Input for building a template: catalog entry plus default set count.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateExerciseInput {
    pub exercise_id: String,
    pub default_sets: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateExerciseDetail {
    pub entry: TemplateExercise,
    pub exercise: Option<Exercise>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateDetail {
    pub template: WorkoutTemplate,
    pub exercises: Vec<TemplateExerciseDetail>,
}
