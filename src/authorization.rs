//! Role-based access policy for the staff console.
//!
//! Two closed roles, a fixed capability table, default deny. Every service
//! operation and every HTTP handler asks [`require`] before touching data,
//! so a forbidden request never reads a row.

use crate::auth::SessionContext;
use crate::models::Role;

/// Where a forbidden console view sends the user.
pub const FORBIDDEN_REDIRECT: &str = "/";

// ═══════════════════════════════════════════════════════════
// Types
// ═══════════════════════════════════════════════════════════

/// A view or mutation gated by role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    ViewDashboard,
    ManagePatients,
    ListDoctorOptions,
    ManageDoctors,
    ViewAuditLogs,
    ViewDeletedRecords,
    RestoreRecords,
    PurgeRecords,
    SweepBlobs,
    ManageStaff,
}

impl Capability {
    pub const ALL: &'static [Capability] = &[
        Self::ViewDashboard,
        Self::ManagePatients,
        Self::ListDoctorOptions,
        Self::ManageDoctors,
        Self::ViewAuditLogs,
        Self::ViewDeletedRecords,
        Self::RestoreRecords,
        Self::PurgeRecords,
        Self::SweepBlobs,
        Self::ManageStaff,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::ViewDashboard => "view_dashboard",
            Self::ManagePatients => "manage_patients",
            Self::ListDoctorOptions => "list_doctor_options",
            Self::ManageDoctors => "manage_doctors",
            Self::ViewAuditLogs => "view_audit_logs",
            Self::ViewDeletedRecords => "view_deleted_records",
            Self::RestoreRecords => "restore_records",
            Self::PurgeRecords => "purge_records",
            Self::SweepBlobs => "sweep_blobs",
            Self::ManageStaff => "manage_staff",
        }
    }
}

/// The capability table. Admin holds everything; staff holds the
/// day-to-day patient workflow.
pub fn is_permitted(role: Role, capability: Capability) -> bool {
    match role {
        Role::Admin => true,
        Role::Staff => matches!(
            capability,
            Capability::ViewDashboard | Capability::ManagePatients | Capability::ListDoctorOptions
        ),
    }
}

/// Result of an authorization check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessDecision {
    pub allowed: bool,
    pub role: Role,
    pub capability: Capability,
}

impl AccessDecision {
    fn allow(role: Role, capability: Capability) -> Self {
        Self {
            allowed: true,
            role,
            capability,
        }
    }

    fn deny(role: Role, capability: Capability) -> Self {
        Self {
            allowed: false,
            role,
            capability,
        }
    }
}

// ═══════════════════════════════════════════════════════════
// Error type
// ═══════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Role '{role}' may not {}", .capability.as_str().replace('_', " "))]
pub struct AccessDenied {
    pub role: Role,
    pub capability: Capability,
}

impl AccessDenied {
    pub fn redirect_to(&self) -> &'static str {
        FORBIDDEN_REDIRECT
    }
}

// ═══════════════════════════════════════════════════════════
// Checks
// ═══════════════════════════════════════════════════════════

pub fn check(session: &SessionContext, capability: Capability) -> AccessDecision {
    if is_permitted(session.role, capability) {
        AccessDecision::allow(session.role, capability)
    } else {
        AccessDecision::deny(session.role, capability)
    }
}

/// Gate an operation. Denials are logged with the acting user.
pub fn require(session: &SessionContext, capability: Capability) -> Result<(), AccessDenied> {
    let decision = check(session, capability);
    if decision.allowed {
        return Ok(());
    }
    tracing::warn!(
        user_id = %session.user_id,
        role = %session.role,
        capability = capability.as_str(),
        "Access denied"
    );
    Err(AccessDenied {
        role: decision.role,
        capability: decision.capability,
    })
}

// ═══════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════
