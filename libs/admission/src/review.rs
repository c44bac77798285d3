use crate::validation::Verdict;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use json_patch::Patch;
use serde::{Serialize, Serializer};

pub const API_VERSION: &str = "admission.k8s.io/v1";
pub const KIND: &str = "AdmissionReview";

#[derive(Debug, Serialize)]
pub struct AdmissionReview {
    #[serde(rename = "apiVersion")]
    pub api_version: String,
    pub kind: String,
    pub response: AdmissionResponse,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdmissionResponse {
    pub uid: String,
    pub allowed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<Status>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub patch_type: Option<PatchType>,
    /// Kept as operations; base64-encoded JSON on the wire.
    #[serde(
        skip_serializing_if = "Option::is_none",
        serialize_with = "serialize_patch"
    )]
    pub patch: Option<Patch>,
}

#[derive(Debug, Serialize)]
pub struct Status {
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PatchType {
    #[serde(rename = "JSONPatch")]
    JsonPatch,
}

fn serialize_patch<S>(patch: &Option<Patch>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match patch {
        Some(patch) => {
            let raw = serde_json::to_vec(patch).map_err(serde::ser::Error::custom)?;
            serializer.serialize_str(&STANDARD.encode(raw))
        }
        None => serializer.serialize_none(),
    }
}

impl AdmissionResponse {
    pub fn from_verdict(uid: String, verdict: Verdict) -> Self {
        Self {
            uid,
            allowed: verdict.allowed,
            status: Some(Status {
                message: verdict.message,
            }),
            patch_type: None,
            patch: None,
        }
    }

    /// Mutation always allows; an empty patch leaves out both patch fields.
    pub fn from_patch(uid: String, patch: Patch) -> Self {
        let patch = (!patch.0.is_empty()).then_some(patch);
        Self {
            uid,
            allowed: true,
            status: None,
            patch_type: patch.as_ref().map(|_| PatchType::JsonPatch),
            patch,
        }
    }

    pub fn into_review(self) -> AdmissionReview {
        AdmissionReview {
            api_version: API_VERSION.to_string(),
            kind: KIND.to_string(),
            response: self,
        }
    }
}

pub fn validation_response(uid: impl Into<String>, verdict: Verdict) -> AdmissionReview {
    AdmissionResponse::from_verdict(uid.into(), verdict).into_review()
}

pub fn mutation_response(uid: impl Into<String>, patch: Patch) -> AdmissionReview {
    AdmissionResponse::from_patch(uid.into(), patch).into_review()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mutation::{default_resources, mutate};
    use crate::request::extract;

    use serde_json::{Value, json};

    fn decode_patch(response: &Value) -> Value {
        let encoded = response["patch"].as_str().unwrap();
        serde_json::from_slice(&STANDARD.decode(encoded).unwrap()).unwrap()
    }

    #[test]
    fn test_validation_response_allowed() {
        let review = validation_response("abc", Verdict::allow());
        assert_eq!(
            serde_json::to_value(&review).unwrap(),
            json!({
                "apiVersion": "admission.k8s.io/v1",
                "kind": "AdmissionReview",
                "response": {
                    "uid": "abc",
                    "allowed": true,
                    "status": {"message": "Validation successful"}
                }
            })
        );
    }

    #[test]
    fn test_validation_response_denied() {
        let review = validation_response("", Verdict::deny("Missing required label: app"));
        let value = serde_json::to_value(&review).unwrap();
        assert_eq!(value["response"]["uid"], "");
        assert_eq!(value["response"]["allowed"], false);
        assert_eq!(
            value["response"]["status"]["message"],
            "Missing required label: app"
        );
    }

    #[test]
    fn test_mutation_response_empty_patch() {
        let review = mutation_response("abc", Patch(Vec::new()));
        assert_eq!(
            serde_json::to_value(&review).unwrap(),
            json!({
                "apiVersion": "admission.k8s.io/v1",
                "kind": "AdmissionReview",
                "response": {"uid": "abc", "allowed": true}
            })
        );
    }

    #[test]
    fn test_mutation_response_encodes_patch() {
        let req = extract(&json!({
            "request": {
                "uid": "abc",
                "object": {"kind": "Pod", "spec": {"containers": [{"name": "a"}]}}
            }
        }));
        let review = mutation_response(req.uid.clone(), mutate(&req));
        let value = serde_json::to_value(&review).unwrap();
        let response = &value["response"];

        assert_eq!(response["uid"], "abc");
        assert_eq!(response["allowed"], true);
        assert_eq!(response["patchType"], "JSONPatch");
        assert!(response.get("status").is_none());
        assert_eq!(
            decode_patch(response),
            json!([
                {"op": "add", "path": "/metadata/labels/environment", "value": "production"},
                {"op": "add", "path": "/spec/containers/0/resources", "value": default_resources()}
            ])
        );
    }
}
