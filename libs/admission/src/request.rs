use std::collections::BTreeMap;

use serde_json::Value;

pub const DEFAULT_NAMESPACE: &str = "default";

/// Typed view of an admission review payload.
///
/// Every field has a default, so building it from any JSON value never fails.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AdmissionRequest {
    pub uid: String,
    pub kind: String,
    pub namespace: String,
    pub name: String,
    pub labels: BTreeMap<String, String>,
    /// Empty unless the object is a pod.
    pub containers: Vec<Container>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Container {
    /// Position in `spec.containers`, used to build patch paths.
    pub index: usize,
    pub name: String,
    pub security_context: SecurityContext,
    /// `true` when a `resources` key is present, even if it holds an empty object.
    pub has_resources: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SecurityContext {
    pub privileged: bool,
    pub run_as_non_root: bool,
}

impl AdmissionRequest {
    pub fn is_pod(&self) -> bool {
        is_pod_kind(&self.kind)
    }

    pub fn label(&self, key: &str) -> Option<&str> {
        self.labels.get(key).map(String::as_str)
    }

    /// `namespace/name`, as used in log lines.
    pub fn object_ref(&self) -> String {
        format!("{}/{}", self.namespace, self.name)
    }
}

#[inline]
fn is_pod_kind(kind: &str) -> bool {
    kind.eq_ignore_ascii_case("pod")
}

#[inline]
fn str_field(value: &Value, key: &str) -> Option<String> {
    value.get(key).and_then(Value::as_str).map(str::to_string)
}

#[inline]
fn bool_field(value: &Value, key: &str) -> bool {
    value.get(key).and_then(Value::as_bool).unwrap_or(false)
}

/// Build the typed view from a raw `AdmissionReview` body.
///
/// Absent or wrongly typed fields fall back to their defaults instead of failing.
pub fn extract(payload: &Value) -> AdmissionRequest {
    let request = payload.get("request").unwrap_or(&Value::Null);
    let object = request.get("object").unwrap_or(&Value::Null);
    let metadata = object.get("metadata").unwrap_or(&Value::Null);

    let kind = str_field(object, "kind").unwrap_or_default();
    let containers = if is_pod_kind(&kind) {
        extract_containers(object)
    } else {
        Vec::new()
    };

    AdmissionRequest {
        uid: str_field(request, "uid").unwrap_or_default(),
        namespace: str_field(metadata, "namespace")
            .unwrap_or_else(|| DEFAULT_NAMESPACE.to_string()),
        name: str_field(metadata, "name").unwrap_or_default(),
        labels: extract_labels(metadata),
        kind,
        containers,
    }
}

fn extract_labels(metadata: &Value) -> BTreeMap<String, String> {
    metadata
        .get("labels")
        .and_then(Value::as_object)
        .map(|labels| {
            labels
                .iter()
                .filter_map(|(k, v)| v.as_str().map(|v| (k.clone(), v.to_string())))
                .collect()
        })
        .unwrap_or_default()
}

fn extract_containers(object: &Value) -> Vec<Container> {
    object
        .get("spec")
        .and_then(|spec| spec.get("containers"))
        .and_then(Value::as_array)
        .map(|containers| {
            containers
                .iter()
                .enumerate()
                .map(|(index, container)| extract_container(index, container))
                .collect()
        })
        .unwrap_or_default()
}

fn extract_container(index: usize, container: &Value) -> Container {
    let security_context = container
        .get("securityContext")
        .map(|sc| SecurityContext {
            privileged: bool_field(sc, "privileged"),
            run_as_non_root: bool_field(sc, "runAsNonRoot"),
        })
        .unwrap_or_default();

    Container {
        index,
        name: str_field(container, "name").unwrap_or_default(),
        security_context,
        has_resources: container
            .as_object()
            .is_some_and(|c| c.contains_key("resources")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::json;

    #[test]
    fn test_extract_empty_payload() {
        let req = extract(&json!({}));
        assert_eq!(req.uid, "");
        assert_eq!(req.kind, "");
        assert_eq!(req.namespace, "default");
        assert_eq!(req.name, "");
        assert!(req.labels.is_empty());
        assert!(req.containers.is_empty());
    }

    #[test]
    fn test_extract_non_object_payloads() {
        for payload in [
            json!(null),
            json!(42),
            json!("request"),
            json!([1, 2, 3]),
            json!({"request": "not-an-object"}),
            json!({"request": {"object": []}}),
            json!({"request": {"uid": 7, "object": {"metadata": "oops"}}}),
        ] {
            let req = extract(&payload);
            assert_eq!(req.uid, "");
            assert_eq!(req.namespace, "default");
            assert!(req.labels.is_empty());
        }
    }

    #[test]
    fn test_extract_default_namespace() {
        let req = extract(&json!({"request": {"object": {}}}));
        assert_eq!(req.namespace, "default");
    }

    #[test]
    fn test_extract_metadata() {
        let req = extract(&json!({
            "request": {
                "uid": "705ab4f5-6393-11e8-b7cc-42010a800002",
                "object": {
                    "kind": "Deployment",
                    "metadata": {
                        "name": "web",
                        "namespace": "shop",
                        "labels": {"app": "web", "tier": "frontend", "replicas": 3}
                    }
                }
            }
        }));
        assert_eq!(req.uid, "705ab4f5-6393-11e8-b7cc-42010a800002");
        assert_eq!(req.kind, "Deployment");
        assert_eq!(req.object_ref(), "shop/web");
        assert_eq!(req.label("app"), Some("web"));
        assert_eq!(req.label("tier"), Some("frontend"));
        // non-string label values are dropped
        assert_eq!(req.label("replicas"), None);
        assert!(!req.is_pod());
    }

    #[test]
    fn test_extract_pod_containers() {
        let req = extract(&json!({
            "request": {
                "object": {
                    "kind": "POD",
                    "spec": {
                        "containers": [
                            {
                                "name": "app",
                                "securityContext": {"privileged": true, "runAsNonRoot": true},
                                "resources": {}
                            },
                            {"securityContext": {"privileged": "yes"}},
                            "garbage"
                        ]
                    }
                }
            }
        }));
        assert!(req.is_pod());
        assert_eq!(req.containers.len(), 3);

        let app = &req.containers[0];
        assert_eq!(app.index, 0);
        assert_eq!(app.name, "app");
        assert!(app.security_context.privileged);
        assert!(app.security_context.run_as_non_root);
        assert!(app.has_resources);

        let unnamed = &req.containers[1];
        assert_eq!(unnamed.index, 1);
        assert_eq!(unnamed.name, "");
        assert_eq!(unnamed.security_context, SecurityContext::default());
        assert!(!unnamed.has_resources);

        assert_eq!(req.containers[2].index, 2);
        assert_eq!(req.containers[2].name, "");
    }

    #[test]
    fn test_extract_non_pod_skips_containers() {
        let req = extract(&json!({
            "request": {
                "object": {
                    "kind": "ConfigMap",
                    "spec": {"containers": [{"name": "ignored"}]}
                }
            }
        }));
        assert!(req.containers.is_empty());
    }

    #[test]
    fn test_extract_pod_without_spec() {
        let req = extract(&json!({"request": {"object": {"kind": "Pod"}}}));
        assert!(req.is_pod());
        assert!(req.containers.is_empty());
    }
}
