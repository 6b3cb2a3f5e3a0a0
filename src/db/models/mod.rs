pub mod exercise;
pub mod template;
pub mod workout;

pub use exercise::{BodyPart, EquipmentType, Exercise, MovementCategory, DEFAULT_REST_SECONDS};
pub use template::{
    TemplateDetail, TemplateExercise, TemplateExerciseDetail, TemplateExerciseInput,
    WorkoutTemplate, DEFAULT_TEMPLATE_SETS,
};
pub use workout::{ExerciseDetail, SetValues, Workout, WorkoutDetail, WorkoutExercise, WorkoutSet};
