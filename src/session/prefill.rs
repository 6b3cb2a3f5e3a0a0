use anyhow::Result;
use rusqlite::Connection;

use crate::db::{
    models::{SetValues, WorkoutSet},
    repositories::workouts::load_latest_sets_for_exercise,
};

/// Values to seed `set_count` new sets of an exercise with, copied from the
/// most recent completed workout that recorded it.
pub(crate) fn prefill_for_exercise(
    conn: &Connection,
    exercise_id: &str,
    set_count: u32,
) -> Result<Vec<SetValues>> {
    let history = load_latest_sets_for_exercise(conn, exercise_id)?;
    Ok(prefill_from(&history, set_count))
}

/// Set `i` copies source set `i`, or the last source set once the source
/// runs out. Effort ratings are never carried over.
pub fn prefill_from(source: &[WorkoutSet], set_count: u32) -> Vec<SetValues> {
    let Some(last) = source.last() else {
        return vec![SetValues::default(); set_count as usize];
    };

    (0..set_count as usize)
        .map(|index| {
            let values = source.get(index).unwrap_or(last).values;
            SetValues {
                rpe: None,
                ..values
            }
        })
        .collect()
}

/// Values for a set appended by hand: a copy of the exercise's current last set.
pub fn next_set_values(existing: &[WorkoutSet]) -> SetValues {
    existing
        .last()
        .map(|set| SetValues {
            rpe: None,
            ..set.values
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(position: u32, weight: f64, reps: i64) -> WorkoutSet {
        let values = SetValues {
            weight: Some(weight),
            reps: Some(reps),
            rpe: Some(8.0),
            ..Default::default()
        };
        WorkoutSet::new("we", position, values)
    }

    #[test]
    fn missing_history_yields_empty_values() {
        let values = prefill_from(&[], 3);
        assert_eq!(values, vec![SetValues::default(); 3]);
    }

    #[test]
    fn extra_sets_repeat_the_last_source_set() {
        let source = vec![set(0, 100.0, 5), set(1, 90.0, 8)];
        let values = prefill_from(&source, 4);

        let weights: Vec<Option<f64>> = values.iter().map(|v| v.weight).collect();
        assert_eq!(weights, vec![Some(100.0), Some(90.0), Some(90.0), Some(90.0)]);
        assert!(values.iter().all(|v| v.rpe.is_none()));
    }

    #[test]
    fn fewer_sets_take_a_prefix() {
        let source = vec![set(0, 60.0, 10), set(1, 70.0, 8), set(2, 80.0, 6)];
        let values = prefill_from(&source, 1);
        assert_eq!(values.len(), 1);
        assert_eq!(values[0].reps, Some(10));
    }

    #[test]
    fn appended_set_copies_the_previous_one() {
        assert_eq!(next_set_values(&[]), SetValues::default());
        let copied = next_set_values(&[set(0, 50.0, 12)]);
        assert_eq!(copied.weight, Some(50.0));
        assert_eq!(copied.reps, Some(12));
        assert_eq!(copied.rpe, None);
    }
}
