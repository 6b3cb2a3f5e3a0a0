use kiln_lib::{models::WorkoutSet, timer::RestTimerStatus, Kiln};

const HISTORY: &str = "\
Date,Workout Name,Duration,Exercise Name,Set Order,Weight,Reps,Distance,Seconds,RPE
2024-02-01 18:00:00,New Legs/full Body A,1h5m,Squat (Barbell),1,100,5,,,
2024-02-01 18:00:00,New Legs/full Body A,1h5m,Squat (Barbell),2,100,5,,,
2024-02-01 18:00:00,New Legs/full Body A,1h5m,Leg Curl (Machine),1,40,12,,,
2024-02-03 18:00:00,Upper,45m,Bench Press (Barbell),1,80,8,,,
";

fn all_sets(detail: &kiln_lib::models::WorkoutDetail) -> Vec<&WorkoutSet> {
    detail.exercises.iter().flat_map(|e| e.sets.iter()).collect()
}

#[tokio::test]
async fn imported_history_drives_a_templated_workout() {
    let dir = tempfile::tempdir().unwrap();
    let kiln = Kiln::open(dir.path()).await.unwrap();

    let summary = kiln.importer.import_batch(HISTORY).await.unwrap();
    assert_eq!(summary.sessions_created, 2);
    assert_eq!(summary.catalog_entries_created, 3);
    assert_eq!(summary.templates_created, 1);

    let templates = kiln.db.list_templates().await.unwrap();
    let template = templates
        .iter()
        .find(|t| t.name == "New Legs/full Body A")
        .unwrap();

    let workout = kiln
        .sessions
        .start_from_template(&template.id)
        .await
        .unwrap()
        .unwrap();
    assert!(kiln.sessions.is_workout_in_progress().await);

    let detail = kiln.sessions.active_detail().await.unwrap().unwrap();
    assert_eq!(detail.exercises.len(), 2);
    let squat_sets = &detail.exercises[0].sets;
    assert_eq!(squat_sets.len(), 2);
    assert_eq!(squat_sets[0].values.weight, Some(100.0));
    assert_eq!(squat_sets[0].values.reps, Some(5));
    assert!(all_sets(&detail).iter().all(|s| !s.is_completed));

    kiln.sessions
        .toggle_set_completion(&squat_sets[0].id)
        .await
        .unwrap();
    let timer = kiln.rest_timer.snapshot().await;
    assert_eq!(timer.state.status, RestTimerStatus::Running);
    assert!(kiln.sessions.has_completed_sets().await.unwrap());

    let finished = kiln.sessions.finish().await.unwrap().unwrap();
    assert_eq!(finished.id, workout.id);
    assert!(!finished.is_in_progress);
    assert!(finished.completed_at.is_some());
    assert!(!kiln.rest_timer.is_running().await);

    let history = kiln.db.list_completed_workouts().await.unwrap();
    assert_eq!(history.len(), 3);
    assert_eq!(history[0].id, workout.id);
}

#[tokio::test]
async fn reopening_recovers_the_interrupted_workout() {
    let dir = tempfile::tempdir().unwrap();

    let first = Kiln::open(dir.path()).await.unwrap();
    let workout = first.sessions.start_empty().await.unwrap().unwrap();
    drop(first);

    let reopened = Kiln::open(dir.path()).await.unwrap();
    assert!(reopened.sessions.has_interrupted_workout().await);
    assert_eq!(
        reopened.sessions.active_workout().await.map(|w| w.id),
        Some(workout.id)
    );

    reopened.sessions.discard_interrupted().await.unwrap();
    assert!(!reopened.sessions.is_workout_in_progress().await);
    assert!(reopened.db.get_in_progress_workout().await.unwrap().is_none());
}
