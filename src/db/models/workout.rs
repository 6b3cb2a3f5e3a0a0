//! Workout session models.
//!
//! A `Workout` owns its `WorkoutExercise` rows, which own their `WorkoutSet`
//! rows. Positions are dense and 0-based within each parent.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{db::models::Exercise, utils::format_workout_duration};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Workout {
    pub id: String,
    pub name: String,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub duration_seconds: Option<u32>,
    pub is_in_progress: bool,
    pub template_id: Option<String>,
}

impl Workout {
    /// A fresh in-progress workout.
    pub fn start(name: impl Into<String>, started_at: DateTime<Utc>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.into(),
            started_at,
            completed_at: None,
            duration_seconds: None,
            is_in_progress: true,
            template_id: None,
        }
    }

    /// A historical workout that is already complete.
    pub fn completed(
        name: impl Into<String>,
        started_at: DateTime<Utc>,
        duration_seconds: u32,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.into(),
            started_at,
            completed_at: Some(started_at + chrono::Duration::seconds(i64::from(duration_seconds))),
            duration_seconds: Some(duration_seconds),
            is_in_progress: false,
            template_id: None,
        }
    }

    pub fn formatted_duration(&self) -> String {
        format_workout_duration(self.duration_seconds)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WorkoutExercise {
    pub id: String,
    pub workout_id: String,
    pub exercise_id: Option<String>,
    pub position: u32,
}

impl WorkoutExercise {
    pub fn new(workout_id: &str, exercise_id: &str, position: u32) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            workout_id: workout_id.to_string(),
            exercise_id: Some(exercise_id.to_string()),
            position,
        }
    }
}

/// Recorded values of a set. Every field is independently optional; `Some(0)`
/// reps is a real measurement, distinct from `None`.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SetValues {
    pub weight: Option<f64>,
    pub reps: Option<i64>,
    pub distance: Option<f64>,
    pub seconds: Option<f64>,
    pub rpe: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WorkoutSet {
    pub id: String,
    pub workout_exercise_id: String,
    pub position: u32,
    #[serde(flatten)]
    pub values: SetValues,
    pub is_completed: bool,
    pub completed_at: Option<DateTime<Utc>>,
}

impl WorkoutSet {
    pub fn new(workout_exercise_id: &str, position: u32, values: SetValues) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            workout_exercise_id: workout_exercise_id.to_string(),
            position,
            values,
            is_completed: false,
            completed_at: None,
        }
    }

    pub fn mark_completed(&mut self, at: DateTime<Utc>) {
        self.is_completed = true;
        self.completed_at = Some(at);
    }

    pub fn mark_incomplete(&mut self) {
        self.is_completed = false;
        self.completed_at = None;
    }

    pub fn volume(&self) -> f64 {
        self.values.weight.unwrap_or(0.0) * self.values.reps.unwrap_or(0) as f64
    }
}

/// One exercise of a workout together with its catalog entry and sets.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExerciseDetail {
    pub entry: WorkoutExercise,
    pub exercise: Option<Exercise>,
    pub sets: Vec<WorkoutSet>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkoutDetail {
    pub workout: Workout,
    pub exercises: Vec<ExerciseDetail>,
}

impl WorkoutDetail {
    pub fn total_volume(&self) -> f64 {
        self.exercises
            .iter()
            .flat_map(|exercise| exercise.sets.iter())
            .map(WorkoutSet::volume)
            .sum()
    }

    pub fn has_completed_sets(&self) -> bool {
        self.exercises
            .iter()
            .flat_map(|exercise| exercise.sets.iter())
            .any(|set| set.is_completed)
    }

    pub fn set_count(&self) -> usize {
        self.exercises.iter().map(|exercise| exercise.sets.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn completed_workout_derives_completion_from_duration() {
        let start = Utc.with_ymd_and_hms(2024, 3, 1, 18, 0, 0).unwrap();
        let workout = Workout::completed("Push", start, 2700);
        assert!(!workout.is_in_progress);
        assert_eq!(workout.duration_seconds, Some(2700));
        assert_eq!(
            workout.completed_at,
            Some(Utc.with_ymd_and_hms(2024, 3, 1, 18, 45, 0).unwrap())
        );
        assert_eq!(workout.formatted_duration(), "45m");
    }

    #[test]
    fn completion_flag_and_timestamp_move_together() {
        let mut set = WorkoutSet::new("we-1", 0, SetValues::default());
        assert!(!set.is_completed && set.completed_at.is_none());

        set.mark_completed(Utc::now());
        assert!(set.is_completed && set.completed_at.is_some());

        set.mark_incomplete();
        assert!(!set.is_completed && set.completed_at.is_none());
    }

    #[test]
    fn volume_treats_missing_values_as_zero() {
        let workout = Workout::start("Legs", Utc::now());
        let entry = WorkoutExercise::new(&workout.id, "ex-1", 0);
        let sets = vec![
            WorkoutSet::new(&entry.id, 0, SetValues { weight: Some(100.0), reps: Some(5), ..Default::default() }),
            WorkoutSet::new(&entry.id, 1, SetValues { weight: Some(100.0), reps: None, ..Default::default() }),
            WorkoutSet::new(&entry.id, 2, SetValues { weight: None, reps: Some(10), ..Default::default() }),
        ];
        let detail = WorkoutDetail {
            workout,
            exercises: vec![ExerciseDetail { entry, exercise: None, sets }],
        };
        assert_eq!(detail.total_volume(), 500.0);
        assert_eq!(detail.set_count(), 3);
        assert!(!detail.has_completed_sets());
    }
}
