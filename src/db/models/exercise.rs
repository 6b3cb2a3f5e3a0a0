//! Exercise catalog models.
//!
//! An `Exercise` is the reusable named definition referenced by workouts and
//! templates. `name` is the dedup key and is unique in storage.

use std::{fmt, str::FromStr};

use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::inference::{infer_body_part, infer_equipment};

pub const DEFAULT_REST_SECONDS: u32 = 90;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "camelCase")]
pub enum MovementCategory {
    #[default]
    Strength,
    Cardio,
    Bodyweight,
}

impl MovementCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            MovementCategory::Strength => "strength",
            MovementCategory::Cardio => "cardio",
            MovementCategory::Bodyweight => "bodyweight",
        }
    }

    /// Category implied by the fields an equipment type records.
    pub fn for_equipment(equipment: EquipmentType) -> Self {
        if equipment.tracks_weight() {
            MovementCategory::Strength
        } else if equipment == EquipmentType::RepsOnly {
            MovementCategory::Bodyweight
        } else {
            MovementCategory::Cardio
        }
    }
}

impl FromStr for MovementCategory {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self> {
        match value {
            "strength" => Ok(MovementCategory::Strength),
            "cardio" => Ok(MovementCategory::Cardio),
            "bodyweight" => Ok(MovementCategory::Bodyweight),
            other => Err(anyhow!("unknown movement category '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum EquipmentType {
    Barbell,
    Dumbbell,
    Kettlebell,
    MachineOther,
    WeightedBodyweight,
    RepsOnly,
    Duration,
    Distance,
    WeightedDistance,
}

impl EquipmentType {
    pub const ALL: [EquipmentType; 9] = [
        EquipmentType::Barbell,
        EquipmentType::Dumbbell,
        EquipmentType::Kettlebell,
        EquipmentType::MachineOther,
        EquipmentType::WeightedBodyweight,
        EquipmentType::RepsOnly,
        EquipmentType::Duration,
        EquipmentType::Distance,
        EquipmentType::WeightedDistance,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EquipmentType::Barbell => "barbell",
            EquipmentType::Dumbbell => "dumbbell",
            EquipmentType::Kettlebell => "kettlebell",
            EquipmentType::MachineOther => "machineOther",
            EquipmentType::WeightedBodyweight => "weightedBodyweight",
            EquipmentType::RepsOnly => "repsOnly",
            EquipmentType::Duration => "duration",
            EquipmentType::Distance => "distance",
            EquipmentType::WeightedDistance => "weightedDistance",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            EquipmentType::Barbell => "Barbell",
            EquipmentType::Dumbbell => "Dumbbell",
            EquipmentType::Kettlebell => "Kettlebell",
            EquipmentType::MachineOther => "Machine/Other",
            EquipmentType::WeightedBodyweight => "Weighted Bodyweight",
            EquipmentType::RepsOnly => "Reps Only",
            EquipmentType::Duration => "Duration",
            EquipmentType::Distance => "Distance",
            EquipmentType::WeightedDistance => "Weighted Distance",
        }
    }

    pub fn tracks_weight(&self) -> bool {
        matches!(
            self,
            EquipmentType::Barbell
                | EquipmentType::Dumbbell
                | EquipmentType::Kettlebell
                | EquipmentType::MachineOther
                | EquipmentType::WeightedBodyweight
                | EquipmentType::WeightedDistance
        )
    }

    pub fn tracks_reps(&self) -> bool {
        matches!(
            self,
            EquipmentType::Barbell
                | EquipmentType::Dumbbell
                | EquipmentType::Kettlebell
                | EquipmentType::MachineOther
                | EquipmentType::WeightedBodyweight
                | EquipmentType::RepsOnly
        )
    }

    pub fn tracks_distance(&self) -> bool {
        matches!(
            self,
            EquipmentType::Distance | EquipmentType::WeightedDistance
        )
    }

    pub fn tracks_duration(&self) -> bool {
        *self == EquipmentType::Duration
    }
}

impl FromStr for EquipmentType {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self> {
        EquipmentType::ALL
            .iter()
            .copied()
            .find(|equipment| equipment.as_str() == value)
            .ok_or_else(|| anyhow!("unknown equipment type '{value}'"))
    }
}

impl fmt::Display for EquipmentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum BodyPart {
    Chest,
    Back,
    Shoulders,
    Arms,
    Legs,
    Core,
    Cardio,
    FullBody,
    Other,
}

impl BodyPart {
    pub const ALL: [BodyPart; 9] = [
        BodyPart::Chest,
        BodyPart::Back,
        BodyPart::Shoulders,
        BodyPart::Arms,
        BodyPart::Legs,
        BodyPart::Core,
        BodyPart::Cardio,
        BodyPart::FullBody,
        BodyPart::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BodyPart::Chest => "chest",
            BodyPart::Back => "back",
            BodyPart::Shoulders => "shoulders",
            BodyPart::Arms => "arms",
            BodyPart::Legs => "legs",
            BodyPart::Core => "core",
            BodyPart::Cardio => "cardio",
            BodyPart::FullBody => "fullBody",
            BodyPart::Other => "other",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            BodyPart::Chest => "Chest",
            BodyPart::Back => "Back",
            BodyPart::Shoulders => "Shoulders",
            BodyPart::Arms => "Arms",
            BodyPart::Legs => "Legs",
            BodyPart::Core => "Core",
            BodyPart::Cardio => "Cardio",
            BodyPart::FullBody => "Full Body",
            BodyPart::Other => "Other",
        }
    }
}

impl FromStr for BodyPart {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self> {
        BodyPart::ALL
            .iter()
            .copied()
            .find(|part| part.as_str() == value)
            .ok_or_else(|| anyhow!("unknown body part '{value}'"))
    }
}

impl fmt::Display for BodyPart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Exercise {
    pub id: String,
    pub name: String,
    pub movement: MovementCategory,
    /// `None` means "infer from the name on read".
    pub equipment: Option<EquipmentType>,
    pub body_part: Option<BodyPart>,
    pub default_rest_seconds: u32,
    pub created_at: DateTime<Utc>,
}

impl Exercise {
    pub fn new(name: impl Into<String>, movement: MovementCategory) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.into(),
            movement,
            equipment: None,
            body_part: None,
            default_rest_seconds: DEFAULT_REST_SECONDS,
            created_at: Utc::now(),
        }
    }

    pub fn resolved_equipment(&self) -> EquipmentType {
        self.equipment
            .unwrap_or_else(|| infer_equipment(&self.name, self.movement))
    }

    pub fn resolved_body_part(&self) -> BodyPart {
        self.body_part.unwrap_or_else(|| infer_body_part(&self.name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tag_strings_round_trip_through_from_str() {
        for equipment in EquipmentType::ALL {
            assert_eq!(equipment.as_str().parse::<EquipmentType>().unwrap(), equipment);
        }
        for part in BodyPart::ALL {
            assert_eq!(part.as_str().parse::<BodyPart>().unwrap(), part);
        }
        assert!("Barbell".parse::<EquipmentType>().is_err());
        assert!("full body".parse::<BodyPart>().is_err());
    }

    #[test]
    fn movement_defaults_to_strength() {
        assert_eq!(MovementCategory::default(), MovementCategory::Strength);
    }

    #[test]
    fn movement_category_follows_tracked_fields() {
        assert_eq!(
            MovementCategory::for_equipment(EquipmentType::Dumbbell),
            MovementCategory::Strength
        );
        assert_eq!(
            MovementCategory::for_equipment(EquipmentType::WeightedDistance),
            MovementCategory::Strength
        );
        assert_eq!(
            MovementCategory::for_equipment(EquipmentType::RepsOnly),
            MovementCategory::Bodyweight
        );
        assert_eq!(
            MovementCategory::for_equipment(EquipmentType::Distance),
            MovementCategory::Cardio
        );
    }

    #[test]
    fn missing_metadata_is_inferred_on_read() {
        let mut exercise = Exercise::new("Incline Bench Press (Dumbbell)", MovementCategory::Strength);
        assert_eq!(exercise.resolved_equipment(), EquipmentType::Dumbbell);
        assert_eq!(exercise.resolved_body_part(), BodyPart::Chest);

        exercise.body_part = Some(BodyPart::Shoulders);
        exercise.equipment = Some(EquipmentType::MachineOther);
        assert_eq!(exercise.resolved_body_part(), BodyPart::Shoulders);
        assert_eq!(exercise.resolved_equipment(), EquipmentType::MachineOther);
    }
}
