mod support;

use chrono::{Duration, Utc};
use rollcall_backend::{
    error::AppError,
    models::{
        attendance::{AttendanceMethod, JoinRequest, PingRequest, SubmitRequest, Verdict},
        lecture::{CreateLectureRequest, LectureResponse},
        user::Profile,
    },
    repositories::{attendance::AttendanceRepositoryTrait, lecture::LectureRepositoryTrait},
    services::notifier::{PASSCODE_ROTATED, PRESENCE_ANNOUNCED, SESSION_ENDED},
};
use support::{actor, TestApp, LAT_150M, LAT_300M, LAT_50M};

async fn open_lecture(
    app: &TestApp,
    teacher: &Profile,
    join_radius_m: Option<f64>,
) -> LectureResponse {
    app.state
        .lectures
        .create(
            &actor(teacher),
            CreateLectureRequest {
                group_id: app.group_id,
                title: "Distributed Systems".into(),
                lat: 0.0,
                lon: 0.0,
                duration_minutes: 75,
                join_radius_m,
                presence_radius_m: Some(200.0),
            },
        )
        .await
        .expect("create lecture")
}

fn join_at(lat: f64) -> JoinRequest {
    JoinRequest {
        lat,
        lon: 0.0,
        roll_id: None,
    }
}

fn ping_at(lat: f64) -> PingRequest {
    PingRequest { lat, lon: 0.0 }
}

fn submit_at(lat: f64) -> SubmitRequest {
    SubmitRequest {
        lat,
        lon: 0.0,
        accuracy: Some(12.5),
    }
}

#[tokio::test]
async fn join_outside_radius_reports_distance() {
    let app = TestApp::new();
    let teacher = app.teacher("turing");
    let student = app.student("ada");
    let lecture = open_lecture(&app, &teacher, Some(200.0)).await;

    let err = app
        .state
        .presence
        .join(&actor(&student), lecture.id, join_at(LAT_300M))
        .await
        .unwrap_err();

    match err {
        AppError::GeofenceViolation(violation) => {
            assert!((violation.distance_m - 300.0).abs() < 1.0);
            assert_eq!(violation.radius_m, 200.0);
            assert_eq!(violation.anchor.lat, 0.0);
            assert_eq!(violation.location.lat, LAT_300M);
        }
        other => panic!("expected geofence violation, got {:?}", other),
    }
    assert!(app
        .store
        .find(lecture.id, student.id)
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn enough_pings_then_submit_is_present() {
    let app = TestApp::new();
    let teacher = app.teacher("turing");
    let student = app.student("ada");
    let lecture = open_lecture(&app, &teacher, Some(200.0)).await;
    let me = actor(&student);

    let joined = app
        .state
        .presence
        .join(&me, lecture.id, join_at(LAT_50M))
        .await
        .unwrap();
    assert!(joined.created);
    assert_eq!(joined.record.check_score, 1);
    assert_eq!(joined.record.verdict, Verdict::Incomplete);

    for _ in 0..3 {
        let ack = app.state.presence.ping(&me, lecture.id, ping_at(LAT_50M)).await;
        assert!(ack.ok);
    }

    let submitted = app
        .state
        .presence
        .submit(&me, lecture.id, submit_at(LAT_150M))
        .await
        .unwrap();
    assert_eq!(submitted.record.check_score, 4);
    assert_eq!(submitted.record.verdict, Verdict::Present);
    assert_eq!(submitted.message, "passed 4/7 checks");
    assert!(submitted.message.contains("4/7"));
    let snapshot = submitted.record.last_location.expect("snapshot");
    assert_eq!(snapshot.lat, LAT_150M);
    assert_eq!(snapshot.accuracy, 12.5);
    assert!(submitted.record.submitted_at.is_some());
}

#[tokio::test]
async fn short_score_stays_incomplete_and_is_swept_on_end() {
    let app = TestApp::new();
    let teacher = app.teacher("turing");
    let student = app.student("ada");
    let lecture = open_lecture(&app, &teacher, None).await;
    let me = actor(&student);

    app.state
        .presence
        .join(&me, lecture.id, join_at(LAT_50M))
        .await
        .unwrap();
    app.state.presence.ping(&me, lecture.id, ping_at(LAT_50M)).await;

    let submitted = app
        .state
        .presence
        .submit(&me, lecture.id, submit_at(0.0))
        .await
        .unwrap();
    assert_eq!(submitted.record.verdict, Verdict::Incomplete);
    assert_eq!(submitted.message, "passed 2/7 checks, need 4");

    let ended = app
        .state
        .lectures
        .end(&actor(&teacher), lecture.id)
        .await
        .unwrap();
    assert!(ended.ended_at.is_some());

    let record = app.state.presence.my_record(&me, lecture.id).await.unwrap();
    assert_eq!(record.verdict, Verdict::Absent);
    assert_eq!(record.method, AttendanceMethod::Auto);
}

#[tokio::test]
async fn manual_add_after_end_forces_present() {
    let app = TestApp::new();
    let teacher = app.teacher("turing");
    let joined_student = app.student("ada");
    let never_joined = app.student("grace");
    let lecture = open_lecture(&app, &teacher, None).await;

    app.state
        .presence
        .join(&actor(&joined_student), lecture.id, join_at(0.0))
        .await
        .unwrap();
    app.state
        .lectures
        .end(&actor(&teacher), lecture.id)
        .await
        .unwrap();

    let upgraded = app
        .state
        .reconciliation
        .manual_add(&actor(&teacher), lecture.id, "ADA")
        .await
        .unwrap();
    assert_eq!(upgraded.verdict, Verdict::Present);
    assert_eq!(upgraded.method, AttendanceMethod::Manual);
    assert_eq!(upgraded.check_score, 7);
    assert!(upgraded.joined_at.is_some());

    let created = app
        .state
        .reconciliation
        .manual_add(
            &actor(&teacher),
            lecture.id,
            never_joined.email.as_deref().unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(created.student_id, never_joined.id);
    assert_eq!(created.verdict, Verdict::Present);
    assert_eq!(created.method, AttendanceMethod::Manual);
    assert!(created.joined_at.is_none());
    assert!(created.submitted_at.is_some());
}

#[tokio::test]
async fn passcode_is_stable_inside_window_and_rotates_after() {
    let app = TestApp::new();
    let teacher = app.teacher("turing");
    let presenter = actor(&teacher);
    let lecture = open_lecture(&app, &teacher, None).await;
    let mut events = app.state.events.subscribe();

    let err = app
        .state
        .passcodes
        .get_passcode(&presenter, lecture.id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidState(_)));

    app.state.lectures.end(&presenter, lecture.id).await.unwrap();
    let t0 = Utc::now();

    let first = app
        .state
        .passcodes
        .get_passcode_at(&presenter, lecture.id, t0)
        .await
        .unwrap();
    let second = app
        .state
        .passcodes
        .get_passcode_at(&presenter, lecture.id, t0 + Duration::seconds(9))
        .await
        .unwrap();
    assert_eq!(first.code, second.code);
    assert_eq!(first.rotated_at, second.rotated_at);
    assert_eq!(first.code.len(), 4);

    let third = app
        .state
        .passcodes
        .get_passcode_at(&presenter, lecture.id, t0 + Duration::seconds(11))
        .await
        .unwrap();
    assert_ne!(third.code, first.code);
    assert!(third.rotated_at > first.rotated_at);

    let mut names = Vec::new();
    while let Ok(event) = events.try_recv() {
        names.push(event.event.clone());
    }
    assert_eq!(names, vec![SESSION_ENDED, PASSCODE_ROTATED, PASSCODE_ROTATED]);
}

#[tokio::test]
async fn passcode_rotation_rejects_a_recycled_code_from_an_older_window() {
    let app = TestApp::new();
    let teacher = app.teacher("turing");
    let lecture = open_lecture(&app, &teacher, None).await;
    let t0 = Utc::now();

    let first = app
        .store
        .rotate_passcode(lecture.id, None, None, "1234".into(), t0)
        .await
        .unwrap()
        .unwrap();
    let second = app
        .store
        .rotate_passcode(
            lecture.id,
            Some("1234".into()),
            first.passcode_rotated_at,
            "9012".into(),
            t0 + Duration::seconds(11),
        )
        .await
        .unwrap()
        .unwrap();
    let third = app
        .store
        .rotate_passcode(
            lecture.id,
            Some("9012".into()),
            second.passcode_rotated_at,
            "1234".into(),
            t0 + Duration::seconds(22),
        )
        .await
        .unwrap()
        .unwrap();
    assert_eq!(third.passcode.as_deref(), Some("1234"));

    // Same code as the first window, but the rotation time moved on.
    let stale = app
        .store
        .rotate_passcode(
            lecture.id,
            Some("1234".into()),
            first.passcode_rotated_at,
            "3456".into(),
            t0 + Duration::seconds(23),
        )
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stale.passcode.as_deref(), Some("1234"));
    assert_eq!(stale.passcode_rotated_at, Some(t0 + Duration::seconds(22)));
}

#[tokio::test]
async fn passcode_owner_only() {
    let app = TestApp::new();
    let teacher = app.teacher("turing");
    let other = app.teacher("hopper");
    let lecture = open_lecture(&app, &teacher, None).await;
    app.state
        .lectures
        .end(&actor(&teacher), lecture.id)
        .await
        .unwrap();

    let err = app
        .state
        .passcodes
        .get_passcode(&actor(&other), lecture.id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));
}

#[tokio::test]
async fn redeeming_live_passcode_marks_latecomer_present() {
    let app = TestApp::new();
    let teacher = app.teacher("turing");
    let latecomer = app.student("linus");
    let lecture = open_lecture(&app, &teacher, None).await;
    app.state
        .lectures
        .end(&actor(&teacher), lecture.id)
        .await
        .unwrap();

    let t0 = Utc::now();
    let passcode = app
        .state
        .passcodes
        .get_passcode_at(&actor(&teacher), lecture.id, t0)
        .await
        .unwrap();

    let wrong = if passcode.code == "1000" { "1001" } else { "1000" };
    let err = app
        .state
        .passcodes
        .redeem_at(&actor(&latecomer), lecture.id, wrong, t0)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));

    let expired = app
        .state
        .passcodes
        .redeem_at(
            &actor(&latecomer),
            lecture.id,
            &passcode.code,
            t0 + Duration::seconds(11),
        )
        .await
        .unwrap_err();
    assert!(matches!(expired, AppError::Forbidden(_)));

    let record = app
        .state
        .passcodes
        .redeem_at(
            &actor(&latecomer),
            lecture.id,
            &passcode.code,
            t0 + Duration::seconds(4),
        )
        .await
        .unwrap();
    assert_eq!(record.verdict, Verdict::Present);
    assert_eq!(record.method, AttendanceMethod::Manual);
}

#[tokio::test]
async fn repeated_join_is_idempotent() {
    let app = TestApp::new();
    let teacher = app.teacher("turing");
    let student = app.student("ada");
    let lecture = open_lecture(&app, &teacher, None).await;
    let me = actor(&student);
    let mut events = app.state.events.subscribe();

    let first = app
        .state
        .presence
        .join(&me, lecture.id, join_at(LAT_50M))
        .await
        .unwrap();
    app.state.presence.ping(&me, lecture.id, ping_at(0.0)).await;
    let second = app
        .state
        .presence
        .join(&me, lecture.id, join_at(LAT_150M))
        .await
        .unwrap();

    assert!(first.created);
    assert!(!second.created);
    assert_eq!(second.record.id, first.record.id);
    assert_eq!(second.record.check_score, 2);
    assert_eq!(second.record.joined_at, first.record.joined_at);

    let announced: Vec<bool> = std::iter::from_fn(|| events.try_recv().ok())
        .filter(|e| e.event == PRESENCE_ANNOUNCED)
        .map(|e| e.payload["created"].as_bool().unwrap())
        .collect();
    assert_eq!(announced, vec![true, false]);
}

#[tokio::test]
async fn join_persists_trimmed_roll_id() {
    let app = TestApp::new();
    let teacher = app.teacher("turing");
    let student = app.student("ada");
    let lecture = open_lecture(&app, &teacher, None).await;

    let joined = app
        .state
        .presence
        .join(
            &actor(&student),
            lecture.id,
            JoinRequest {
                lat: 0.0,
                lon: 0.0,
                roll_id: Some("  CS-042 ".into()),
            },
        )
        .await
        .unwrap();
    assert_eq!(joined.profile.roll_id.as_deref(), Some("CS-042"));

    let blank = app
        .state
        .presence
        .join(
            &actor(&student),
            lecture.id,
            JoinRequest {
                lat: 0.0,
                lon: 0.0,
                roll_id: Some("   ".into()),
            },
        )
        .await
        .unwrap();
    assert_eq!(blank.profile.roll_id.as_deref(), Some("CS-042"));

    let profile = app.state.presence.profile(&actor(&student)).await.unwrap();
    assert_eq!(profile.roll_id.as_deref(), Some("CS-042"));
}

#[tokio::test]
async fn join_after_end_is_rejected() {
    let app = TestApp::new();
    let teacher = app.teacher("turing");
    let student = app.student("ada");
    let lecture = open_lecture(&app, &teacher, None).await;
    app.state
        .lectures
        .end(&actor(&teacher), lecture.id)
        .await
        .unwrap();

    let err = app
        .state
        .presence
        .join(&actor(&student), lecture.id, join_at(0.0))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidState(_)));
}

#[tokio::test]
async fn pings_never_lower_score_or_change_verdict() {
    let app = TestApp::new();
    let teacher = app.teacher("turing");
    let student = app.student("ada");
    let lecture = open_lecture(&app, &teacher, None).await;
    let me = actor(&student);

    app.state
        .presence
        .join(&me, lecture.id, join_at(0.0))
        .await
        .unwrap();
    let mut last = 1;
    for lat in [0.0, LAT_300M, LAT_50M, 1.0, LAT_150M, 0.0, 0.0, 0.0, 0.0] {
        app.state.presence.ping(&me, lecture.id, ping_at(lat)).await;
        let record = app.state.presence.my_record(&me, lecture.id).await.unwrap();
        assert!(record.check_score >= last);
        last = record.check_score;
    }
    // Uncapped: 7 valid pings plus the join.
    assert_eq!(last, 8);

    let submitted = app
        .state
        .presence
        .submit(&me, lecture.id, submit_at(0.0))
        .await
        .unwrap();
    assert_eq!(submitted.record.verdict, Verdict::Present);

    app.state.presence.ping(&me, lecture.id, ping_at(0.0)).await;
    app.state
        .lectures
        .end(&actor(&teacher), lecture.id)
        .await
        .unwrap();
    let record = app.state.presence.my_record(&me, lecture.id).await.unwrap();
    assert_eq!(record.verdict, Verdict::Present);
    assert_eq!(record.check_score, 9);

    // Every ping is audited, counted or not.
    assert_eq!(app.store.ping_log_len(), 10);
}

#[tokio::test]
async fn submit_enforces_strict_radius_and_requires_join() {
    let app = TestApp::new();
    let teacher = app.teacher("turing");
    let student = app.student("ada");
    let lecture = open_lecture(&app, &teacher, None).await;
    let me = actor(&student);

    let err = app
        .state
        .presence
        .submit(&me, lecture.id, submit_at(0.0))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::RecordNotFound(_)));

    // Inside the lenient join radius, outside the strict one.
    app.state
        .presence
        .join(&me, lecture.id, join_at(LAT_300M))
        .await
        .unwrap();
    let err = app
        .state
        .presence
        .submit(&me, lecture.id, submit_at(LAT_300M))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::GeofenceViolation(_)));

    let record = app.state.presence.my_record(&me, lecture.id).await.unwrap();
    assert!(record.submitted_at.is_none());
}

#[tokio::test]
async fn submit_after_end_overwrites_sweep() {
    let app = TestApp::new();
    let teacher = app.teacher("turing");
    let student = app.student("ada");
    let lecture = open_lecture(&app, &teacher, None).await;
    let me = actor(&student);

    app.state
        .presence
        .join(&me, lecture.id, join_at(0.0))
        .await
        .unwrap();
    for _ in 0..3 {
        app.state.presence.ping(&me, lecture.id, ping_at(0.0)).await;
    }
    app.state
        .lectures
        .end(&actor(&teacher), lecture.id)
        .await
        .unwrap();
    assert_eq!(
        app.state
            .presence
            .my_record(&me, lecture.id)
            .await
            .unwrap()
            .verdict,
        Verdict::Absent
    );

    let submitted = app
        .state
        .presence
        .submit(&me, lecture.id, submit_at(0.0))
        .await
        .unwrap();
    assert_eq!(submitted.record.verdict, Verdict::Present);
}

#[tokio::test]
async fn late_submit_below_threshold_stays_absent() {
    let app = TestApp::new();
    let teacher = app.teacher("turing");
    let student = app.student("ada");
    let lecture = open_lecture(&app, &teacher, None).await;
    let me = actor(&student);

    app.state
        .presence
        .join(&me, lecture.id, join_at(0.0))
        .await
        .unwrap();
    app.state
        .lectures
        .end(&actor(&teacher), lecture.id)
        .await
        .unwrap();

    let submitted = app
        .state
        .presence
        .submit(&me, lecture.id, submit_at(0.0))
        .await
        .unwrap();
    assert_eq!(submitted.record.verdict, Verdict::Absent);
    assert_eq!(submitted.checks_passed, 1);
    assert!(submitted.record.submitted_at.is_some());
    assert_eq!(submitted.message, "passed 1/7 checks, need 4");

    let stored = app.store.find(lecture.id, student.id).await.unwrap().unwrap();
    assert_eq!(stored.verdict, Verdict::Absent);
}

#[tokio::test]
async fn end_twice_is_invalid_state() {
    let app = TestApp::new();
    let teacher = app.teacher("turing");
    let lecture = open_lecture(&app, &teacher, None).await;
    let presenter = actor(&teacher);

    app.state.lectures.end(&presenter, lecture.id).await.unwrap();
    let err = app
        .state
        .lectures
        .end(&presenter, lecture.id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidState(_)));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_joins_create_one_record() {
    let app = TestApp::new();
    let teacher = app.teacher("turing");
    let student = app.student("ada");
    let lecture = open_lecture(&app, &teacher, None).await;
    let me = actor(&student);

    let lecture_id = lecture.id;

    let handles: Vec<_> = (0..16)
        .map(|_| {
            let presence = app.state.presence.clone();
            tokio::spawn(async move { presence.join(&me, lecture_id, join_at(0.0)).await })
        })
        .collect();

    let mut created = 0;
    let mut ids = std::collections::HashSet::new();
    for handle in handles {
        let joined = handle.await.unwrap().unwrap();
        if joined.created {
            created += 1;
        }
        ids.insert(joined.record.id);
        assert_eq!(joined.record.check_score, 1);
    }
    assert_eq!(created, 1);
    assert_eq!(ids.len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_pings_are_all_counted() {
    let app = TestApp::new();
    let teacher = app.teacher("turing");
    let student = app.student("ada");
    let lecture = open_lecture(&app, &teacher, None).await;
    let me = actor(&student);
    app.state
        .presence
        .join(&me, lecture.id, join_at(0.0))
        .await
        .unwrap();

    let lecture_id = lecture.id;
    let handles: Vec<_> = (0..25)
        .map(|_| {
            let presence = app.state.presence.clone();
            tokio::spawn(async move { presence.ping(&me, lecture_id, ping_at(0.0)).await })
        })
        .collect();
    for handle in handles {
        assert!(handle.await.unwrap().ok);
    }

    let record = app.state.presence.my_record(&me, lecture.id).await.unwrap();
    assert_eq!(record.check_score, 26);
}
