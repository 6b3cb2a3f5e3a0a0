use super::parser::ImportRow;

/// Split `items` into maximal runs of consecutive equal keys. A key that
/// reappears after a different one starts a new run.
pub fn group_adjacent<'a, T, K, F>(items: &'a [T], key: F) -> Vec<&'a [T]>
where
    K: PartialEq,
    F: Fn(&'a T) -> K,
{
    let mut groups = Vec::new();
    let mut start = 0;
    for index in 1..items.len() {
        if key(&items[index]) != key(&items[start]) {
            groups.push(&items[start..index]);
            start = index;
        }
    }
    if start < items.len() {
        groups.push(&items[start..]);
    }
    groups
}

/// One session per run of rows sharing date and session name.
pub fn group_sessions(rows: &[ImportRow]) -> Vec<&[ImportRow]> {
    group_adjacent(rows, |row| (row.date.as_str(), row.session_name.as_str()))
}

/// One exercise per run of rows sharing an exercise name, in authoring order.
pub fn group_exercises(rows: &[ImportRow]) -> Vec<&[ImportRow]> {
    group_adjacent(rows, |row| row.exercise_name.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::SetValues;

    fn row(date: &str, session: &str, exercise: &str) -> ImportRow {
        ImportRow {
            date: date.to_string(),
            session_name: session.to_string(),
            duration: String::new(),
            exercise_name: exercise.to_string(),
            set_order: 0,
            values: SetValues::default(),
            body_part: None,
            equipment: None,
        }
    }

    #[test]
    fn repeated_key_after_a_break_is_a_new_session() {
        let rows = vec![
            row("2024-01-01", "A", "Squat"),
            row("2024-01-01", "A", "Squat"),
            row("2024-01-02", "B", "Row"),
            row("2024-01-01", "A", "Squat"),
        ];
        let sessions = group_sessions(&rows);
        let sizes: Vec<usize> = sessions.iter().map(|group| group.len()).collect();
        assert_eq!(sizes, vec![2, 1, 1]);
        assert_eq!(sessions[2][0].session_name, "A");
    }

    #[test]
    fn exercises_keep_authoring_order() {
        let rows = vec![
            row("d", "A", "Squat"),
            row("d", "A", "Squat"),
            row("d", "A", "Lunge"),
            row("d", "A", "Squat"),
        ];
        let names: Vec<&str> = group_exercises(&rows)
            .iter()
            .map(|group| group[0].exercise_name.as_str())
            .collect();
        assert_eq!(names, vec!["Squat", "Lunge", "Squat"]);
    }

    #[test]
    fn keys_may_borrow_from_items() {
        let words = ["a", "a", "b"];
        let owned: Vec<String> = words.iter().map(|w| w.to_string()).collect();
        let groups = group_adjacent(&owned, |word| word.as_str());
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[1][0], "b");
    }

    #[test]
    fn empty_input_has_no_groups() {
        assert!(group_sessions(&[]).is_empty());
    }
}
