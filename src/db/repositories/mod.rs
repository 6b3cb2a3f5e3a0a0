pub mod exercises;
pub mod sets;
pub mod templates;
pub mod workouts;
