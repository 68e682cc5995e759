#![allow(dead_code)] // OpenAPI doc stubs are only referenced by utoipa macros.

use crate::models::{
    attendance::{
        AttendanceMethod, AttendanceResponse, AttendanceSummary, AttendanceView,
        AttendanceViewEntry, JoinRequest, JoinResponse, ManualAddRequest, PingAck, PingRequest,
        SubmitRequest, SubmitResponse, Verdict,
    },
    lecture::{
        CreateLectureRequest, LectureResponse, LectureState, PasscodeResponse,
        RedeemPasscodeRequest, UpdateLectureRequest,
    },
    location::{Coordinates, LocationSnapshot},
    ping_log::PingLog,
    user::{Profile, UserRole},
    PaginationQuery,
};
use utoipa::{
    openapi::security::{Http, HttpAuthScheme, SecurityScheme},
    Modify, OpenApi,
};

#[derive(OpenApi)]
#[openapi(
    paths(
        health_doc,
        me_doc,
        create_lecture_doc,
        list_lectures_doc,
        get_lecture_doc,
        update_lecture_doc,
        delete_lecture_doc,
        end_lecture_doc,
        join_doc,
        ping_doc,
        submit_doc,
        my_attendance_doc,
        attendance_view_doc,
        export_attendance_doc,
        manual_add_doc,
        get_passcode_doc,
        redeem_passcode_doc,
        list_pings_doc
    ),
    components(
        schemas(
            // profiles
            Profile,
            UserRole,
            // lectures
            CreateLectureRequest,
            UpdateLectureRequest,
            LectureResponse,
            LectureState,
            Coordinates,
            PasscodeResponse,
            RedeemPasscodeRequest,
            // presence
            JoinRequest,
            JoinResponse,
            PingRequest,
            PingAck,
            SubmitRequest,
            SubmitResponse,
            LocationSnapshot,
            // attendance
            AttendanceResponse,
            AttendanceMethod,
            Verdict,
            AttendanceView,
            AttendanceViewEntry,
            AttendanceSummary,
            ManualAddRequest,
            PingLog,
            PaginationQuery
        )
    ),
    modifiers(&SecuritySchemes),
    tags(
        (name = "Lectures", description = "Lecture lifecycle"),
        (name = "Presence", description = "Join, ping and submit"),
        (name = "Attendance", description = "Roster view, overrides and passcodes")
    ),
    security(("BearerAuth" = []))
)]
pub struct ApiDoc;

struct SecuritySchemes;

impl Modify for SecuritySchemes {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_default();

        let mut bearer = Http::new(HttpAuthScheme::Bearer);
        bearer.bearer_format = Some("JWT".to_string());

        components.add_security_scheme("BearerAuth", SecurityScheme::Http(bearer));
    }
}

#[utoipa::path(
    get,
    path = "/api/health",
    responses((status = 200, body = serde_json::Value)),
    security(())
)]
fn health_doc() {}

#[utoipa::path(
    get,
    path = "/api/me",
    responses((status = 200, description = "Caller's profile", body = Profile))
)]
fn me_doc() {}

#[utoipa::path(
    post,
    path = "/api/lectures",
    request_body = CreateLectureRequest,
    responses(
        (status = 201, body = LectureResponse),
        (status = 403, description = "Caller is not a teacher")
    ),
    tag = "Lectures"
)]
fn create_lecture_doc() {}

#[utoipa::path(
    get,
    path = "/api/lectures",
    responses((status = 200, body = [LectureResponse])),
    tag = "Lectures"
)]
fn list_lectures_doc() {}

#[utoipa::path(
    get,
    path = "/api/lectures/{id}",
    params(("id" = String, Path, description = "Lecture ID")),
    responses(
        (status = 200, body = LectureResponse),
        (status = 404, description = "Lecture not found")
    ),
    tag = "Lectures"
)]
fn get_lecture_doc() {}

#[utoipa::path(
    put,
    path = "/api/lectures/{id}",
    params(("id" = String, Path, description = "Lecture ID")),
    request_body = UpdateLectureRequest,
    responses(
        (status = 200, body = LectureResponse),
        (status = 409, description = "Lecture has ended")
    ),
    tag = "Lectures"
)]
fn update_lecture_doc() {}

#[utoipa::path(
    delete,
    path = "/api/lectures/{id}",
    params(("id" = String, Path, description = "Lecture ID")),
    responses(
        (status = 204, description = "Lecture deleted"),
        (status = 409, description = "Lecture is still active")
    ),
    tag = "Lectures"
)]
fn delete_lecture_doc() {}

#[utoipa::path(
    post,
    path = "/api/lectures/{id}/end",
    params(("id" = String, Path, description = "Lecture ID")),
    responses(
        (status = 200, body = LectureResponse),
        (status = 409, description = "Lecture already ended")
    ),
    tag = "Lectures"
)]
fn end_lecture_doc() {}

#[utoipa::path(
    post,
    path = "/api/lectures/{id}/join",
    params(("id" = String, Path, description = "Lecture ID")),
    request_body = JoinRequest,
    responses(
        (status = 200, body = JoinResponse),
        (status = 403, description = "Outside the join geofence", body = serde_json::Value),
        (status = 409, description = "Lecture has ended")
    ),
    tag = "Presence"
)]
fn join_doc() {}

#[utoipa::path(
    post,
    path = "/api/lectures/{id}/ping",
    params(("id" = String, Path, description = "Lecture ID")),
    request_body = PingRequest,
    responses((status = 200, description = "Always acknowledged", body = PingAck)),
    tag = "Presence"
)]
fn ping_doc() {}

#[utoipa::path(
    post,
    path = "/api/lectures/{id}/submit",
    params(("id" = String, Path, description = "Lecture ID")),
    request_body = SubmitRequest,
    responses(
        (status = 200, body = SubmitResponse),
        (status = 403, description = "Outside the presence geofence", body = serde_json::Value),
        (status = 404, description = "No record for the caller")
    ),
    tag = "Presence"
)]
fn submit_doc() {}

#[utoipa::path(
    get,
    path = "/api/lectures/{id}/attendance/me",
    params(("id" = String, Path, description = "Lecture ID")),
    responses(
        (status = 200, body = AttendanceResponse),
        (status = 404, description = "No record for the caller")
    ),
    tag = "Presence"
)]
fn my_attendance_doc() {}

#[utoipa::path(
    get,
    path = "/api/lectures/{id}/attendance",
    params(("id" = String, Path, description = "Lecture ID")),
    responses((status = 200, body = AttendanceView)),
    tag = "Attendance"
)]
fn attendance_view_doc() {}

#[utoipa::path(
    get,
    path = "/api/lectures/{id}/attendance/export",
    params(("id" = String, Path, description = "Lecture ID")),
    responses((status = 200, description = "CSV data and file name", body = serde_json::Value)),
    tag = "Attendance"
)]
fn export_attendance_doc() {}

#[utoipa::path(
    post,
    path = "/api/lectures/{id}/attendance/manual",
    params(("id" = String, Path, description = "Lecture ID")),
    request_body = ManualAddRequest,
    responses(
        (status = 200, body = AttendanceResponse),
        (status = 404, description = "No matching student"),
        (status = 409, description = "Lookup is ambiguous")
    ),
    tag = "Attendance"
)]
fn manual_add_doc() {}

#[utoipa::path(
    get,
    path = "/api/lectures/{id}/passcode",
    params(("id" = String, Path, description = "Lecture ID")),
    responses(
        (status = 200, body = PasscodeResponse),
        (status = 409, description = "Lecture is still active")
    ),
    tag = "Attendance"
)]
fn get_passcode_doc() {}

#[utoipa::path(
    post,
    path = "/api/lectures/{id}/passcode/redeem",
    params(("id" = String, Path, description = "Lecture ID")),
    request_body = RedeemPasscodeRequest,
    responses(
        (status = 200, body = AttendanceResponse),
        (status = 403, description = "Wrong or expired passcode")
    ),
    tag = "Attendance"
)]
fn redeem_passcode_doc() {}

#[utoipa::path(
    get,
    path = "/api/lectures/{id}/pings",
    params(("id" = String, Path, description = "Lecture ID"), PaginationQuery),
    responses((status = 200, description = "Paginated ping audit log", body = serde_json::Value)),
    tag = "Attendance"
)]
fn list_pings_doc() {}
