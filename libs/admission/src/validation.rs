//! Admission rules for `/validate`.
//!
//! Rules run in a fixed order and evaluation stops at the first failure, so the
//! caller gets the first actionable problem rather than a full report:
//! 1. every object carries a non-empty `app` label
//! 2. for each pod container, in order: not privileged, then runs as non-root

use crate::request::{AdmissionRequest, Container};

use tracing::debug;

pub const REQUIRED_LABEL: &str = "app";
pub const SUCCESS_MESSAGE: &str = "Validation successful";

/// Outcome of validation, before it is wrapped into an `AdmissionReview`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Verdict {
    pub allowed: bool,
    pub message: String,
}

impl Verdict {
    pub fn allow() -> Self {
        Self {
            allowed: true,
            message: SUCCESS_MESSAGE.to_string(),
        }
    }

    pub fn deny(message: impl Into<String>) -> Self {
        Self {
            allowed: false,
            message: message.into(),
        }
    }
}

/// Run every rule against `req` and return the first denial, if any.
pub fn validate(req: &AdmissionRequest) -> Verdict {
    if let Err(message) = check_required_label(req) {
        debug!(uid = %req.uid, %message, "required label rule failed");
        return Verdict::deny(message);
    }

    if let Err(message) = req.containers.iter().try_for_each(check_container) {
        debug!(uid = %req.uid, %message, "container rule failed");
        return Verdict::deny(message);
    }

    Verdict::allow()
}

fn check_required_label(req: &AdmissionRequest) -> Result<(), String> {
    match req.label(REQUIRED_LABEL) {
        Some(value) if !value.is_empty() => Ok(()),
        _ => Err(format!("Missing required label: {REQUIRED_LABEL}")),
    }
}

// Privileged is checked before non-root for the same container.
fn check_container(container: &Container) -> Result<(), String> {
    let sc = &container.security_context;
    if sc.privileged {
        return Err(format!(
            "Container {} cannot run in privileged mode",
            container.name
        ));
    }
    if !sc.run_as_non_root {
        return Err(format!(
            "Container {} must run as non-root user",
            container.name
        ));
    }
    Ok(())
}
