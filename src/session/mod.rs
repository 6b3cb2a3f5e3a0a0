mod manager;
pub mod prefill;

pub use manager::{WorkoutSessionManager, DEFAULT_NEW_EXERCISE_SETS, EMPTY_WORKOUT_NAME};
