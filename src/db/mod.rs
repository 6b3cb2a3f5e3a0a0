mod connection;
pub mod helpers;
mod migrations;
pub mod models;
pub mod repositories;

pub use connection::Database;
pub use models::{
    BodyPart, EquipmentType, Exercise, ExerciseDetail, MovementCategory, SetValues,
    TemplateDetail, Workout, WorkoutDetail, WorkoutExercise, WorkoutSet, WorkoutTemplate,
};
