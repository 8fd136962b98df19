use axum::http::{Method, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use crate::db::models::{Course, Exercise, User};
use crate::db::types::{CourseRole, ExerciseType};
use crate::test_support::{self, ExerciseFixture, TestContext};


struct Staffed {
    course: Course,
    exercise: Exercise,
    instructor: User,
    tutor: User,
    other_tutor: User,
}

async fn staffed_exercise(
    ctx: &TestContext,
    max_locked_submissions: Option<i32>,
    fixture: ExerciseFixture,
) -> Staffed {
    let db = ctx.state.db();
    let instructor = test_support::insert_user(db, "instructor", "Ada Instructor").await;
    let tutor = test_support::insert_user(db, "tutor-1", "Tom Tutor").await;
    let other_tutor = test_support::insert_user(db, "tutor-2", "Tina Tutor").await;

    let course = test_support::insert_course(db, "rust-101", max_locked_submissions).await;
    test_support::add_course_role(db, &course.id, &instructor.id, CourseRole::Instructor).await;
    test_support::add_course_role(db, &course.id, &tutor.id, CourseRole::Tutor).await;
    test_support::add_course_role(db, &course.id, &other_tutor.id, CourseRole::Tutor).await;

    let exercise = test_support::insert_exercise(db, &course.id, fixture).await;
    Staffed { course, exercise, instructor, tutor, other_tutor }
}

fn token(ctx: &TestContext, user: &User) -> String {
    test_support::bearer_token(&user.id, ctx.state.settings())
}

fn next_uri(exercise: &Exercise, query: &str) -> String {
    format!(
        "/api/v1/exercises/{}/{}-submission-without-assessment?{query}",
        exercise.id,
        exercise.exercise_type.route_segment()
    )
}

fn submission_uri(exercise: &Exercise, submission_id: &str, suffix: &str) -> String {
    format!(
        "/api/v1/{}-submissions/{submission_id}{suffix}",
        exercise.exercise_type.route_segment()
    )
}

async fn call(
    app: &Router,
    method: Method,
    uri: &str,
    token: &str,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let response = app
        .clone()
        .oneshot(test_support::json_request(method, uri, Some(token), body))
        .await
        .expect("response");
    let status = response.status();
    (status, test_support::read_json(response).await)
}

async fn lock(ctx: &TestContext, exercise: &Exercise, submission_id: &str, token: &str) -> Value {
    let (status, body) = call(
        &ctx.app,
        Method::GET,
        &submission_uri(exercise, submission_id, "/for-assessment"),
        token,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK, "response: {body}");
    body
}

async fn submit_feedback(
    ctx: &TestContext,
    exercise: &Exercise,
    submission_id: &str,
    token: &str,
    round: i32,
) -> Value {
    let (status, body) = call(
        &ctx.app,
        Method::PUT,
        &submission_uri(
            exercise,
            submission_id,
            &format!("/feedback?submit=true&correction-round={round}"),
        ),
        token,
        Some(json!({
            "feedbacks": [
                { "reference": "paragraph-1", "text": "Clear thesis", "credits": 4.0 },
                { "text": "Conclusion is missing", "credits": 3.0 }
            ]
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "response: {body}");
    body
}

async fn count_results(ctx: &TestContext, submission_id: &str) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM results WHERE submission_id = $1")
        .bind(submission_id)
        .fetch_one(ctx.state.db())
        .await
        .expect("count results")
}

#[tokio::test]
async fn next_submission_locks_oldest_submission_first() {
    let ctx = test_support::setup_test_context().await;
    let staffed = staffed_exercise(&ctx, None, ExerciseFixture::new(ExerciseType::Text)).await;
    let db = ctx.state.db();
    let (_, _, newer) = test_support::submit_as_new_student(db, &staffed.exercise, "s-1", 5).await;
    let (_, _, older) = test_support::submit_as_new_student(db, &staffed.exercise, "s-2", 30).await;

    let (status, body) = call(
        &ctx.app,
        Method::GET,
        &next_uri(&staffed.exercise, "lock=true"),
        &token(&ctx, &staffed.tutor),
        None,
    )
    .await;

    assert_eq!(status, StatusCode::OK, "response: {body}");
    assert_eq!(body["id"], older.id);
    assert_eq!(body["results"][0]["assessor"]["id"], staffed.tutor.id);
    assert_eq!(body["results"][0]["completion_date"], Value::Null);
    assert!(body.get("participation").is_none(), "tutors must not see the student: {body}");
    assert_eq!(count_results(&ctx, &older.id).await, 1);
    assert_eq!(count_results(&ctx, &newer.id).await, 0);
}

#[tokio::test]
async fn next_submission_without_lock_leaves_no_trace() {
    let ctx = test_support::setup_test_context().await;
    let staffed = staffed_exercise(&ctx, None, ExerciseFixture::new(ExerciseType::Text)).await;
    let (_, _, submission) =
        test_support::submit_as_new_student(ctx.state.db(), &staffed.exercise, "s-1", 5).await;

    let (status, body) = call(
        &ctx.app,
        Method::GET,
        &next_uri(&staffed.exercise, "lock=false"),
        &token(&ctx, &staffed.tutor),
        None,
    )
    .await;

    assert_eq!(status, StatusCode::OK, "response: {body}");
    assert_eq!(body["id"], submission.id);
    assert_eq!(body["results"], json!([]));
    assert_eq!(count_results(&ctx, &submission.id).await, 0);
}

#[tokio::test]
async fn next_submission_returns_null_when_everything_is_taken() {
    let ctx = test_support::setup_test_context().await;
    let staffed = staffed_exercise(&ctx, None, ExerciseFixture::new(ExerciseType::Text)).await;
    let (_, _, submission) =
        test_support::submit_as_new_student(ctx.state.db(), &staffed.exercise, "s-1", 5).await;
    lock(&ctx, &staffed.exercise, &submission.id, &token(&ctx, &staffed.tutor)).await;

    let (status, body) = call(
        &ctx.app,
        Method::GET,
        &next_uri(&staffed.exercise, "lock=true"),
        &token(&ctx, &staffed.other_tutor),
        None,
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, Value::Null);
}

#[tokio::test]
async fn locking_again_resumes_own_draft() {
    let ctx = test_support::setup_test_context().await;
    let staffed = staffed_exercise(&ctx, None, ExerciseFixture::new(ExerciseType::Text)).await;
    let (_, _, submission) =
        test_support::submit_as_new_student(ctx.state.db(), &staffed.exercise, "s-1", 5).await;
    let tutor_token = token(&ctx, &staffed.tutor);

    let first = lock(&ctx, &staffed.exercise, &submission.id, &tutor_token).await;
    let second = lock(&ctx, &staffed.exercise, &submission.id, &tutor_token).await;

    assert_eq!(first["results"][0]["id"], second["results"][0]["id"]);
    assert_eq!(count_results(&ctx, &submission.id).await, 1);
}

#[tokio::test]
async fn second_grader_gets_conflict_on_locked_submission() {
    let ctx = test_support::setup_test_context().await;
    let staffed = staffed_exercise(&ctx, None, ExerciseFixture::new(ExerciseType::Text)).await;
    let (_, _, submission) =
        test_support::submit_as_new_student(ctx.state.db(), &staffed.exercise, "s-1", 5).await;
    lock(&ctx, &staffed.exercise, &submission.id, &token(&ctx, &staffed.tutor)).await;

    let (status, body) = call(
        &ctx.app,
        Method::GET,
        &submission_uri(&staffed.exercise, &submission.id, "/for-assessment"),
        &token(&ctx, &staffed.other_tutor),
        None,
    )
    .await;

    assert_eq!(status, StatusCode::CONFLICT, "response: {body}");
    assert_eq!(body["detail"], "Submission is locked by another assessor");
    assert_eq!(count_results(&ctx, &submission.id).await, 1);
}

#[tokio::test]
async fn assessed_round_is_reported_as_assessed() {
    let ctx = test_support::setup_test_context().await;
    let staffed = staffed_exercise(&ctx, None, ExerciseFixture::new(ExerciseType::Text)).await;
    let (_, _, submission) =
        test_support::submit_as_new_student(ctx.state.db(), &staffed.exercise, "s-1", 5).await;
    let tutor_token = token(&ctx, &staffed.tutor);
    lock(&ctx, &staffed.exercise, &submission.id, &tutor_token).await;
    submit_feedback(&ctx, &staffed.exercise, &submission.id, &tutor_token, 0).await;

    for grader_token in [tutor_token, token(&ctx, &staffed.other_tutor)] {
        let (status, body) = call(
            &ctx.app,
            Method::GET,
            &submission_uri(&staffed.exercise, &submission.id, "/for-assessment"),
            &grader_token,
            None,
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT, "response: {body}");
        assert_eq!(body["detail"], "Submission was already assessed in this round");
    }
}

#[tokio::test]
async fn only_the_latest_submission_can_be_locked() {
    let ctx = test_support::setup_test_context().await;
    let staffed = staffed_exercise(&ctx, None, ExerciseFixture::new(ExerciseType::Text)).await;
    let db = ctx.state.db();
    let (_, participation, first) =
        test_support::submit_as_new_student(db, &staffed.exercise, "s-1", 30).await;
    test_support::insert_submission(
        db,
        &participation,
        ExerciseType::Text,
        json!({ "text": "second attempt" }),
        5,
    )
    .await;

    let (status, body) = call(
        &ctx.app,
        Method::GET,
        &submission_uri(&staffed.exercise, &first.id, "/for-assessment"),
        &token(&ctx, &staffed.tutor),
        None,
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST, "response: {body}");
}

#[tokio::test]
async fn lock_limit_blocks_new_locks_but_not_resumes() {
    let ctx = test_support::setup_test_context().await;
    let staffed = staffed_exercise(&ctx, Some(2), ExerciseFixture::new(ExerciseType::Text)).await;
    let db = ctx.state.db();
    for (index, login) in ["s-1", "s-2", "s-3"].into_iter().enumerate() {
        test_support::submit_as_new_student(db, &staffed.exercise, login, 30 - index as i64).await;
    }
    let tutor_token = token(&ctx, &staffed.tutor);
    let uri = next_uri(&staffed.exercise, "lock=true");

    let (_, first) = call(&ctx.app, Method::GET, &uri, &tutor_token, None).await;
    let (_, second) = call(&ctx.app, Method::GET, &uri, &tutor_token, None).await;
    assert_ne!(first["id"], second["id"]);

    let (status, body) = call(&ctx.app, Method::GET, &uri, &tutor_token, None).await;
    assert_eq!(status, StatusCode::CONFLICT, "response: {body}");

    let first_id = first["id"].as_str().expect("submission id");
    lock(&ctx, &staffed.exercise, first_id, &tutor_token).await;

    let (status, locked) = call(
        &ctx.app,
        Method::GET,
        &format!("/api/v1/courses/{}/locked-submissions", staffed.course.id),
        &tutor_token,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK, "response: {locked}");
    assert_eq!(locked["active_locks"], 2);
    assert_eq!(locked["max_locks"], 2);
    assert_eq!(locked["submissions"].as_array().map(Vec::len), Some(2));
}

#[tokio::test]
async fn exercise_override_raises_course_ceiling() {
    let ctx = test_support::setup_test_context().await;
    let fixture =
        ExerciseFixture { lock_limit_override: Some(2), ..ExerciseFixture::new(ExerciseType::Text) };
    let staffed = staffed_exercise(&ctx, Some(1), fixture).await;
    let db = ctx.state.db();
    test_support::submit_as_new_student(db, &staffed.exercise, "s-1", 20).await;
    test_support::submit_as_new_student(db, &staffed.exercise, "s-2", 10).await;
    let tutor_token = token(&ctx, &staffed.tutor);
    let uri = next_uri(&staffed.exercise, "lock=true");

    let (first, _) = call(&ctx.app, Method::GET, &uri, &tutor_token, None).await;
    let (second, body) = call(&ctx.app, Method::GET, &uri, &tutor_token, None).await;

    assert_eq!(first, StatusCode::OK);
    assert_eq!(second, StatusCode::OK, "response: {body}");
}

#[tokio::test]
async fn instructors_may_inspect_other_tutors_locks() {
    let ctx = test_support::setup_test_context().await;
    let staffed = staffed_exercise(&ctx, None, ExerciseFixture::new(ExerciseType::Text)).await;
    let (_, _, submission) =
        test_support::submit_as_new_student(ctx.state.db(), &staffed.exercise, "s-1", 5).await;
    lock(&ctx, &staffed.exercise, &submission.id, &token(&ctx, &staffed.tutor)).await;
    let uri = format!(
        "/api/v1/courses/{}/locked-submissions?tutor={}",
        staffed.course.id, staffed.tutor.id
    );

    let (status, body) =
        call(&ctx.app, Method::GET, &uri, &token(&ctx, &staffed.instructor), None).await;
    assert_eq!(status, StatusCode::OK, "response: {body}");
    assert_eq!(body["tutor_id"], staffed.tutor.id);
    assert_eq!(body["submissions"][0]["submission_id"], submission.id);

    let (status, _) =
        call(&ctx.app, Method::GET, &uri, &token(&ctx, &staffed.other_tutor), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn cancel_assessment_is_idempotent() {
    let ctx = test_support::setup_test_context().await;
    let staffed = staffed_exercise(&ctx, None, ExerciseFixture::new(ExerciseType::Text)).await;
    let (_, _, submission) =
        test_support::submit_as_new_student(ctx.state.db(), &staffed.exercise, "s-1", 5).await;
    let tutor_token = token(&ctx, &staffed.tutor);
    lock(&ctx, &staffed.exercise, &submission.id, &tutor_token).await;
    let cancel_uri = submission_uri(&staffed.exercise, &submission.id, "/cancel-assessment");

    let (status, body) = call(&ctx.app, Method::PUT, &cancel_uri, &tutor_token, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["cancelled"], true);
    assert_eq!(count_results(&ctx, &submission.id).await, 0);

    let (status, body) = call(&ctx.app, Method::PUT, &cancel_uri, &tutor_token, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["cancelled"], false);

    let (status, body) = call(
        &ctx.app,
        Method::GET,
        &next_uri(&staffed.exercise, "lock=true"),
        &token(&ctx, &staffed.other_tutor),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], submission.id);
}

#[tokio::test]
async fn only_holder_or_instructor_can_cancel() {
    let ctx = test_support::setup_test_context().await;
    let staffed = staffed_exercise(&ctx, None, ExerciseFixture::new(ExerciseType::Text)).await;
    let (_, _, submission) =
        test_support::submit_as_new_student(ctx.state.db(), &staffed.exercise, "s-1", 5).await;
    lock(&ctx, &staffed.exercise, &submission.id, &token(&ctx, &staffed.tutor)).await;
    let cancel_uri = submission_uri(&staffed.exercise, &submission.id, "/cancel-assessment");

    let (status, _) =
        call(&ctx.app, Method::PUT, &cancel_uri, &token(&ctx, &staffed.other_tutor), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(count_results(&ctx, &submission.id).await, 1);

    let (status, body) =
        call(&ctx.app, Method::PUT, &cancel_uri, &token(&ctx, &staffed.instructor), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["cancelled"], true);
}

#[tokio::test]
async fn submitted_assessment_is_not_cancelled() {
    let ctx = test_support::setup_test_context().await;
    let staffed = staffed_exercise(&ctx, None, ExerciseFixture::new(ExerciseType::Text)).await;
    let (_, _, submission) =
        test_support::submit_as_new_student(ctx.state.db(), &staffed.exercise, "s-1", 5).await;
    let tutor_token = token(&ctx, &staffed.tutor);
    lock(&ctx, &staffed.exercise, &submission.id, &tutor_token).await;
    submit_feedback(&ctx, &staffed.exercise, &submission.id, &tutor_token, 0).await;

    let (status, body) = call(
        &ctx.app,
        Method::PUT,
        &submission_uri(&staffed.exercise, &submission.id, "/cancel-assessment"),
        &tutor_token,
        None,
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["cancelled"], false);
    assert_eq!(count_results(&ctx, &submission.id).await, 1);
}

#[tokio::test]
async fn draft_save_keeps_lock_and_scores_feedback() {
    let ctx = test_support::setup_test_context().await;
    let staffed = staffed_exercise(&ctx, None, ExerciseFixture::new(ExerciseType::Text)).await;
    let (_, _, submission) =
        test_support::submit_as_new_student(ctx.state.db(), &staffed.exercise, "s-1", 5).await;
    let tutor_token = token(&ctx, &staffed.tutor);
    lock(&ctx, &staffed.exercise, &submission.id, &tutor_token).await;

    let (status, body) = call(
        &ctx.app,
        Method::PUT,
        &submission_uri(&staffed.exercise, &submission.id, "/feedback"),
        &tutor_token,
        Some(json!({ "feedbacks": [{ "text": "Good start", "credits": 2.5 }] })),
    )
    .await;

    assert_eq!(status, StatusCode::OK, "response: {body}");
    assert_eq!(body["score"], 25.0);
    assert_eq!(body["completion_date"], Value::Null);
    assert_eq!(body["feedbacks"][0]["type"], "MANUAL_UNREFERENCED");

    let (status, _) = call(
        &ctx.app,
        Method::PUT,
        &submission_uri(&staffed.exercise, &submission.id, "/feedback"),
        &token(&ctx, &staffed.other_tutor),
        Some(json!({ "feedbacks": [{ "text": "Mine now", "credits": 10.0 }] })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn feedback_without_text_is_rejected() {
    let ctx = test_support::setup_test_context().await;
    let staffed = staffed_exercise(&ctx, None, ExerciseFixture::new(ExerciseType::Text)).await;
    let (_, _, submission) =
        test_support::submit_as_new_student(ctx.state.db(), &staffed.exercise, "s-1", 5).await;
    let tutor_token = token(&ctx, &staffed.tutor);
    lock(&ctx, &staffed.exercise, &submission.id, &tutor_token).await;

    let (status, body) = call(
        &ctx.app,
        Method::PUT,
        &submission_uri(&staffed.exercise, &submission.id, "/feedback"),
        &tutor_token,
        Some(json!({ "feedbacks": [{ "credits": 1.0 }] })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST, "response: {body}");
}

#[tokio::test]
async fn students_cannot_reach_assessment_routes() {
    let ctx = test_support::setup_test_context().await;
    let staffed = staffed_exercise(&ctx, None, ExerciseFixture::new(ExerciseType::Text)).await;
    let (student, _, submission) =
        test_support::submit_as_new_student(ctx.state.db(), &staffed.exercise, "s-1", 5).await;

    let (status, _) = call(
        &ctx.app,
        Method::GET,
        &submission_uri(&staffed.exercise, &submission.id, "/for-assessment"),
        &token(&ctx, &student),
        None,
    )
    .await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(count_results(&ctx, &submission.id).await, 0);
}

#[tokio::test]
async fn wrong_exercise_type_route_is_not_found() {
    let ctx = test_support::setup_test_context().await;
    let staffed = staffed_exercise(&ctx, None, ExerciseFixture::new(ExerciseType::Text)).await;
    let (_, _, submission) =
        test_support::submit_as_new_student(ctx.state.db(), &staffed.exercise, "s-1", 5).await;

    let (status, _) = call(
        &ctx.app,
        Method::GET,
        &format!("/api/v1/modeling-submissions/{}/for-assessment", submission.id),
        &token(&ctx, &staffed.tutor),
        None,
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn instructor_sees_student_and_tutor_does_not() {
    let ctx = test_support::setup_test_context().await;
    let staffed = staffed_exercise(&ctx, None, ExerciseFixture::new(ExerciseType::Text)).await;
    let (student, _, submission) =
        test_support::submit_as_new_student(ctx.state.db(), &staffed.exercise, "s-1", 5).await;
    lock(&ctx, &staffed.exercise, &submission.id, &token(&ctx, &staffed.tutor)).await;
    let uri = submission_uri(&staffed.exercise, &submission.id, "");

    let (status, as_instructor) =
        call(&ctx.app, Method::GET, &uri, &token(&ctx, &staffed.instructor), None).await;
    assert_eq!(status, StatusCode::OK, "response: {as_instructor}");
    assert_eq!(as_instructor["participation"]["student"]["id"], student.id);
    assert_eq!(as_instructor["results"][0]["assessor"]["name"], "Tom Tutor");

    let (status, as_tutor) =
        call(&ctx.app, Method::GET, &uri, &token(&ctx, &staffed.other_tutor), None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(as_tutor.get("participation").is_none());
    assert_eq!(as_tutor["results"][0]["assessor"]["id"], staffed.tutor.id);
}

#[tokio::test]
async fn platform_admin_acts_as_instructor_without_membership() {
    let ctx = test_support::setup_test_context().await;
    let staffed = staffed_exercise(&ctx, None, ExerciseFixture::new(ExerciseType::Text)).await;
    let db = ctx.state.db();
    let (student, _, submission) =
        test_support::submit_as_new_student(db, &staffed.exercise, "s-1", 5).await;
    lock(&ctx, &staffed.exercise, &submission.id, &token(&ctx, &staffed.tutor)).await;
    let admin = test_support::insert_platform_admin(db, "root", "Platform Admin").await;
    let admin_token = token(&ctx, &admin);

    let (status, body) = call(
        &ctx.app,
        Method::GET,
        &submission_uri(&staffed.exercise, &submission.id, ""),
        &admin_token,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK, "response: {body}");
    assert_eq!(body["participation"]["student"]["id"], student.id);

    let (status, body) = call(
        &ctx.app,
        Method::PUT,
        &submission_uri(&staffed.exercise, &submission.id, "/cancel-assessment"),
        &admin_token,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["cancelled"], true);
}
