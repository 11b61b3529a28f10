use nightwatch_core::{
    AuditEvent, Booking, Broadcast, BroadcastAudience, MessageType, OutboxItem, OutboxStatus,
    PointsLedgerEntry, RecurringAssignment, Report, Role, Schedule, Severity, User,
    UserPointsCache,
};

use super::schemas::{
    AssignBookingRequest, AvailableShift, CreateBookingRequest, CreateBroadcastRequest,
    CreateRecurringAssignmentRequest, CreateScheduleRequest, HealthResponse,
    MaterializeRequest, MaterializeResponse, OffShiftReportRequest, RegisterRequest,
    ReportRequest, TokenResponse, UpdateScheduleRequest, UserResponse, VerifyRequest,
};

#[derive(utoipa::OpenApi)]
#[openapi(
    info(
        title = "Night Watch Shift Coordinator API",
        version = "0.1.0",
        description = "HTTP API for the community night-watch shift coordinator: OTP auth, shift booking, check-in, incident reports, and admin scheduling."
    ),
    tags(
        (name = "Health", description = "Service health"),
        (name = "Auth", description = "OTP registration and session-token exchange"),
        (name = "Schedules", description = "Read-only schedule lookup"),
        (name = "Shifts", description = "Open-slot lookup"),
        (name = "Bookings", description = "Shift booking, check-in, and on-shift reports"),
        (name = "Reports", description = "Off-shift incident reports"),
        (name = "Points", description = "Points ledger and caller totals"),
        (name = "Admin/Schedules", description = "Schedule CRUD"),
        (name = "Admin/Bookings", description = "Admin shift assignment and cancellation"),
        (name = "Admin/Recurring", description = "Recurring-assignment CRUD and materialization"),
        (name = "Admin/Broadcasts", description = "Broadcast authoring"),
    ),
    paths(
        super::health::health,
        super::auth::register,
        super::auth::verify,
        super::schedules::list_schedules,
        super::shifts::available_shifts,
        super::bookings::create_booking,
        super::bookings::my_bookings,
        super::bookings::check_in,
        super::bookings::file_on_shift_report,
        super::reports::file_off_shift_report,
        super::points::my_points,
        super::admin_schedules::create_schedule,
        super::admin_schedules::update_schedule,
        super::admin_schedules::delete_schedule,
        super::admin_schedules::get_schedule,
        super::admin_schedules::list_schedules,
        super::admin_bookings::assign_booking,
        super::admin_bookings::cancel_booking,
        super::admin_recurring::create_recurring_assignment,
        super::admin_recurring::list_recurring_assignments,
        super::admin_recurring::get_recurring_assignment,
        super::admin_recurring::deactivate_recurring_assignment,
        super::admin_recurring::materialize,
        super::admin_broadcasts::create_broadcast,
    ),
    components(schemas(
        HealthResponse,
        RegisterRequest, VerifyRequest, TokenResponse, UserResponse,
        CreateBookingRequest, ReportRequest, OffShiftReportRequest,
        CreateScheduleRequest, UpdateScheduleRequest, AssignBookingRequest,
        CreateRecurringAssignmentRequest, MaterializeRequest, MaterializeResponse,
        CreateBroadcastRequest, AvailableShift,
        User, Role, Schedule, Booking, Report, Severity,
        PointsLedgerEntry, UserPointsCache,
        MessageType, OutboxStatus, OutboxItem,
        RecurringAssignment, Broadcast, BroadcastAudience, AuditEvent,
    ))
)]
pub struct ApiDoc;
