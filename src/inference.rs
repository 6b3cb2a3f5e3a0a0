//! Catalog metadata inference from free-text exercise names.
//!
//! Both functions are pure and total. Keyword groups are checked in the order
//! they are declared and the first matching group wins, so an earlier group
//! shadows later ones for names that contain keywords from both.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::db::models::{BodyPart, EquipmentType, MovementCategory};

static PARENTHETICAL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\(([^)]+)\)").expect("parenthetical pattern is valid"));

const PAREN_EQUIPMENT: &[(EquipmentType, &[&str])] = &[
    (EquipmentType::Barbell, &["barbell"]),
    (EquipmentType::Dumbbell, &["dumbbell"]),
    (EquipmentType::Kettlebell, &["kettlebell"]),
    (
        EquipmentType::MachineOther,
        &["machine", "cable", "smith", "lever", "band"],
    ),
    (EquipmentType::RepsOnly, &["bodyweight", "assisted"]),
];

const NAME_EQUIPMENT: &[(EquipmentType, &[&str])] = &[
    (
        EquipmentType::Barbell,
        &["barbell", "bench press", "deadlift", "squat rack", "overhead press"],
    ),
    (EquipmentType::Dumbbell, &["dumbbell", "db "]),
    (EquipmentType::Kettlebell, &["kettlebell", "kb "]),
    (
        EquipmentType::MachineOther,
        &["cable", "machine", "smith", "lat pulldown", "leg press", "lever"],
    ),
    (EquipmentType::RepsOnly, &["bodyweight", "assisted"]),
];

const BODY_PARTS: &[(BodyPart, &[&str])] = &[
    (
        BodyPart::Chest,
        &["bench press", "chest", "pec", "fly", "flye", "push up", "pushup", "dip"],
    ),
    (
        BodyPart::Back,
        &[
            "row", "pulldown", "pull down", "lat ", "deadlift", "pull up", "pullup", "chin up",
            "chinup", "back", "shrug",
        ],
    ),
    (
        BodyPart::Shoulders,
        &[
            "shoulder",
            "overhead press",
            "ohp",
            "military press",
            "lateral raise",
            "front raise",
            "face pull",
            "delt",
            "arnold",
        ],
    ),
    (
        BodyPart::Arms,
        &[
            "curl",
            "bicep",
            "tricep",
            "hammer",
            "extension",
            "pushdown",
            "skull",
            "preacher",
            "concentration",
        ],
    ),
    (
        BodyPart::Legs,
        &[
            "squat", "leg", "lunge", "calf", "hamstring", "quad", "glute", "hip", "split squat",
            "step up", "rdl", "romanian", "goblet",
        ],
    ),
    (
        BodyPart::Core,
        &[
            "ab",
            "crunch",
            "plank",
            "core",
            "sit up",
            "situp",
            "russian twist",
            "leg raise",
        ],
    ),
    (
        BodyPart::Cardio,
        &[
            "run",
            "bike",
            "cycle",
            "cardio",
            "elliptical",
            "treadmill",
            "rowing machine",
            "stairmaster",
            "jump rope",
            "burpee",
        ],
    ),
];

fn first_match<T: Copy>(haystack: &str, groups: &[(T, &[&str])]) -> Option<T> {
    groups
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|keyword| haystack.contains(keyword)))
        .map(|(value, _)| *value)
}

/// Equipment for an exercise name: parenthetical hint, then whole-name
/// keywords, then the movement category default.
pub fn infer_equipment(name: &str, fallback: MovementCategory) -> EquipmentType {
    let name = name.to_lowercase();

    if let Some(hint) = PARENTHETICAL.captures(&name).and_then(|caps| caps.get(1)) {
        if let Some(equipment) = first_match(hint.as_str(), PAREN_EQUIPMENT) {
            return equipment;
        }
    }

    if let Some(equipment) = first_match(&name, NAME_EQUIPMENT) {
        return equipment;
    }

    match fallback {
        MovementCategory::Strength => EquipmentType::Barbell,
        MovementCategory::Cardio => EquipmentType::Duration,
        MovementCategory::Bodyweight => EquipmentType::RepsOnly,
    }
}

pub fn infer_body_part(name: &str) -> BodyPart {
    let name = name.to_lowercase();
    first_match(&name, BODY_PARTS).unwrap_or(BodyPart::Other)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn body_part_table() {
        let cases = [
            ("Barbell Bench Press", BodyPart::Chest),
            ("Incline Dumbbell Fly", BodyPart::Chest),
            ("Chest Dip", BodyPart::Chest),
            ("Bent Over Row (Barbell)", BodyPart::Back),
            ("Lat Pulldown (Cable)", BodyPart::Back),
            ("Deadlift (Barbell)", BodyPart::Back),
            // "deadlift" belongs to the back group, which is checked before legs.
            ("Romanian Deadlift", BodyPart::Back),
            ("Overhead Press (Barbell)", BodyPart::Shoulders),
            ("Lateral Raise (Dumbbell)", BodyPart::Shoulders),
            ("Face Pull (Cable)", BodyPart::Shoulders),
            ("Bicep Curl (Dumbbell)", BodyPart::Arms),
            ("Triceps Pushdown (Cable)", BodyPart::Arms),
            ("Squat (Barbell)", BodyPart::Legs),
            ("Walking Lunge", BodyPart::Legs),
            ("RDL", BodyPart::Legs),
            ("Goblet Squat (Kettlebell)", BodyPart::Legs),
            ("Plank", BodyPart::Core),
            ("Crunch", BodyPart::Core),
            ("Treadmill Run", BodyPart::Cardio),
            ("Stationary Bike", BodyPart::Cardio),
            ("Farmer's Walk", BodyPart::Other),
            ("", BodyPart::Other),
        ];

        for (name, expected) in cases {
            assert_eq!(infer_body_part(name), expected, "body part for {name:?}");
        }
    }

    #[test]
    fn earlier_groups_shadow_later_ones() {
        // "press" names: "bench press" is a chest keyword, so shoulders never sees it.
        assert_eq!(infer_body_part("Close Grip Bench Press"), BodyPart::Chest);
        // "leg raise" is listed under core but "leg" already matches legs.
        assert_eq!(infer_body_part("Hanging Leg Raise"), BodyPart::Legs);
        // "rowing machine" is cardio but "row" is a back keyword.
        assert_eq!(infer_body_part("Rowing Machine"), BodyPart::Back);
    }

    #[test]
    fn equipment_table() {
        let cases = [
            ("Bench Press (Dumbbell)", MovementCategory::Strength, EquipmentType::Dumbbell),
            ("Swing (Kettlebell)", MovementCategory::Strength, EquipmentType::Kettlebell),
            ("Chest Fly (Cable)", MovementCategory::Strength, EquipmentType::MachineOther),
            ("Squat (Smith Machine)", MovementCategory::Strength, EquipmentType::MachineOther),
            ("Pull Up (Assisted)", MovementCategory::Strength, EquipmentType::RepsOnly),
            ("Face Pull (Band)", MovementCategory::Strength, EquipmentType::MachineOther),
            ("Bench Press", MovementCategory::Strength, EquipmentType::Barbell),
            ("Romanian Deadlift", MovementCategory::Bodyweight, EquipmentType::Barbell),
            ("DB Shoulder Press", MovementCategory::Strength, EquipmentType::Dumbbell),
            ("KB Swing", MovementCategory::Strength, EquipmentType::Kettlebell),
            ("Leg Press", MovementCategory::Strength, EquipmentType::MachineOther),
            ("Bodyweight Squat", MovementCategory::Strength, EquipmentType::RepsOnly),
            ("Bicep Curl", MovementCategory::Strength, EquipmentType::Barbell),
            ("Running", MovementCategory::Cardio, EquipmentType::Duration),
            ("Push Up", MovementCategory::Bodyweight, EquipmentType::RepsOnly),
        ];

        for (name, fallback, expected) in cases {
            assert_eq!(
                infer_equipment(name, fallback),
                expected,
                "equipment for {name:?} with {fallback:?}"
            );
        }
    }

    #[test]
    fn parenthetical_hint_beats_name_keywords() {
        // "bench press" alone would mean barbell.
        assert_eq!(
            infer_equipment("Bench Press (Smith Machine)", MovementCategory::Strength),
            EquipmentType::MachineOther
        );
    }

    #[test]
    fn unknown_parenthetical_falls_through_to_name_keywords() {
        assert_eq!(
            infer_equipment("Deadlift (Trap Bar)", MovementCategory::Cardio),
            EquipmentType::Barbell
        );
        assert_eq!(
            infer_equipment("Plank (Weighted)", MovementCategory::Bodyweight),
            EquipmentType::RepsOnly
        );
    }

    #[test]
    fn inference_is_case_insensitive() {
        assert_eq!(infer_body_part("BARBELL BENCH PRESS"), BodyPart::Chest);
        assert_eq!(
            infer_equipment("CURL (DUMBBELL)", MovementCategory::Strength),
            EquipmentType::Dumbbell
        );
    }
}
