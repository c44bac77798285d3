//! Defaulting rules for `/mutate`.
//!
//! Unlike validation every rule runs, and the emitted operations keep rule
//! order: the environment label first, then container resources by index.

use crate::request::{AdmissionRequest, Container};

use json_patch::{AddOperation, Patch, PatchOperation};
use jsonptr::PointerBuf;
use serde_json::{Value, json};

pub const ENVIRONMENT_LABEL: &str = "environment";
pub const DEFAULT_ENVIRONMENT: &str = "production";

pub const DEFAULT_LIMITS_CPU: &str = "500m";
pub const DEFAULT_LIMITS_MEMORY: &str = "512Mi";
pub const DEFAULT_REQUESTS_CPU: &str = "100m";
pub const DEFAULT_REQUESTS_MEMORY: &str = "128Mi";

/// Collect the patch operations every defaulting rule emits for `req`.
pub fn mutate(req: &AdmissionRequest) -> Patch {
    let mut operations = Vec::new();
    operations.extend(default_environment_label(req));
    operations.extend(req.containers.iter().filter_map(default_container_resources));
    Patch(operations)
}

// The path assumes `metadata.labels` exists; an object without it gets the
// same single operation, which an RFC 6902 `add` cannot apply.
fn default_environment_label(req: &AdmissionRequest) -> Option<PatchOperation> {
    match req.label(ENVIRONMENT_LABEL) {
        Some(value) if !value.is_empty() => None,
        _ => Some(add(
            PointerBuf::from_tokens(["metadata", "labels", ENVIRONMENT_LABEL]),
            Value::String(DEFAULT_ENVIRONMENT.to_string()),
        )),
    }
}

fn default_container_resources(container: &Container) -> Option<PatchOperation> {
    if container.has_resources {
        return None;
    }
    let mut path = PointerBuf::from_tokens(["spec", "containers"]);
    path.push_back(container.index);
    path.push_back("resources");
    Some(add(path, default_resources()))
}

pub fn default_resources() -> Value {
    json!({
        "limits": {
            "cpu": DEFAULT_LIMITS_CPU,
            "memory": DEFAULT_LIMITS_MEMORY,
        },
        "requests": {
            "cpu": DEFAULT_REQUESTS_CPU,
            "memory": DEFAULT_REQUESTS_MEMORY,
        },
    })
}

#[inline]
fn add(path: PointerBuf, value: Value) -> PatchOperation {
    PatchOperation::Add(AddOperation { path, value })
}
