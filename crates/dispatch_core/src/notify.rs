//! Fire-and-forget notifications.
//!
//! Delivery failures are counted and discarded by the caller; they must never
//! roll back or fail the ride-state transition that triggered them.

use std::sync::{Arc, Mutex};

use bevy_ecs::prelude::Resource;
use serde::{Deserialize, Serialize};

use crate::error::DispatchError;
use crate::routing::RoutePlan;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RecipientRole {
    Student,
    Driver,
    Admin,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    RouteAssigned,
    RideRequest,
    RideAccepted,
    RideStarted,
    RideCompleted,
    RideCancelled,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationPriority {
    Low,
    Medium,
    High,
    Urgent,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub recipient_id: String,
    pub recipient_role: RecipientRole,
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub priority: NotificationPriority,
}

impl Notification {
    /// Driver alert for a fresh assignment.
    pub fn route_assigned(driver_id: &str, plan: &RoutePlan) -> Self {
        let start = plan.waypoints.first().map(|w| w.name.as_str()).unwrap_or("?");
        let end = plan.waypoints.last().map(|w| w.name.as_str()).unwrap_or("?");
        let stops = plan.waypoints.len().saturating_sub(2);
        let stops_text = if stops > 0 {
            format!(" with {stops} stops")
        } else {
            String::new()
        };
        Self {
            recipient_id: driver_id.to_string(),
            recipient_role: RecipientRole::Driver,
            kind: NotificationKind::RouteAssigned,
            title: "New Route Assigned".to_string(),
            message: format!(
                "You have been assigned a route from {start} to {end}{stops_text}."
            ),
            priority: NotificationPriority::Urgent,
        }
    }

    /// Student alert when a driver accepts the request.
    pub fn ride_accepted(
        student_id: &str,
        driver_name: &str,
        vehicle_number: &str,
        eta_minutes: f64,
    ) -> Self {
        Self {
            recipient_id: student_id.to_string(),
            recipient_role: RecipientRole::Student,
            kind: NotificationKind::RideAccepted,
            title: "Ride Accepted".to_string(),
            message: format!(
                "{driver_name} ({vehicle_number}) has accepted your request. Estimated arrival: {} minutes.",
                eta_minutes.ceil() as i64
            ),
            priority: NotificationPriority::High,
        }
    }

    pub fn ride_started(student_id: &str, driver_name: &str) -> Self {
        Self {
            recipient_id: student_id.to_string(),
            recipient_role: RecipientRole::Student,
            kind: NotificationKind::RideStarted,
            title: "Ride Started".to_string(),
            message: format!("{driver_name} has started your ride."),
            priority: NotificationPriority::Medium,
        }
    }

    pub fn ride_completed(student_id: &str) -> Self {
        Self {
            recipient_id: student_id.to_string(),
            recipient_role: RecipientRole::Student,
            kind: NotificationKind::RideCompleted,
            title: "Ride Completed".to_string(),
            message: "You have arrived. Thanks for riding with campus transport.".to_string(),
            priority: NotificationPriority::Low,
        }
    }
}

/// The dispatch decision handed to the driver display and the notifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssignmentCommand {
    pub ride_id: String,
    pub driver_id: String,
    pub plan: RoutePlan,
    pub pickup_eta_minutes: f64,
}

/// Assignment commands produced by the engine, drained by the glue layer for
/// the driver-facing display.
#[derive(Debug, Default, Resource)]
pub struct CommandOutbox(pub Vec<AssignmentCommand>);

/// Trait for notification backends.
pub trait NotificationDispatcher: Send + Sync {
    fn deliver(&self, notification: Notification) -> Result<(), DispatchError>;
}

/// ECS resource wrapping a boxed dispatcher.
#[derive(Resource)]
pub struct NotifierResource(pub Box<dyn NotificationDispatcher>);

impl std::ops::Deref for NotifierResource {
    type Target = dyn NotificationDispatcher;

    fn deref(&self) -> &Self::Target {
        self.0.as_ref()
    }
}

/// Best-effort delivery: `true` on success, `false` on failure. The caller
/// counts failures in telemetry and moves on.
pub fn deliver_best_effort(
    dispatcher: &dyn NotificationDispatcher,
    notification: Notification,
) -> bool {
    dispatcher.deliver(notification).is_ok()
}

/// Discards everything successfully. The default when no delivery channel is
/// wired up.
#[derive(Debug, Default)]
pub struct NullDispatcher;

impl NotificationDispatcher for NullDispatcher {
    fn deliver(&self, _notification: Notification) -> Result<(), DispatchError> {
        Ok(())
    }
}

/// Captures notifications for assertions in tests.
#[derive(Debug, Clone, Default)]
pub struct CollectingDispatcher {
    delivered: Arc<Mutex<Vec<Notification>>>,
}

impl CollectingDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn delivered(&self) -> Vec<Notification> {
        self.delivered.lock().map(|d| d.clone()).unwrap_or_default()
    }
}

impl NotificationDispatcher for CollectingDispatcher {
    fn deliver(&self, notification: Notification) -> Result<(), DispatchError> {
        self.delivered
            .lock()
            .map_err(|_| DispatchError::ExternalService("notification sink poisoned".to_string()))?
            .push(notification);
        Ok(())
    }
}

/// Always fails. Exercises the failure-isolation contract in tests.
#[derive(Debug, Default)]
pub struct FailingDispatcher;

impl NotificationDispatcher for FailingDispatcher {
    fn deliver(&self, _notification: Notification) -> Result<(), DispatchError> {
        Err(DispatchError::ExternalService(
            "notification channel unreachable".to_string(),
        ))
    }
}
