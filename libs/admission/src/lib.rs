//! Admission decision engine for pods and other namespaced objects.
//!
//! The engine is pure: [`request::extract`] turns any `AdmissionReview` JSON
//! into a fully defaulted [`AdmissionRequest`], [`validation::validate`] and
//! [`mutation::mutate`] evaluate fixed rule sets against it, and [`review`]
//! wraps the result in the response envelope. Nothing here does I/O.

pub mod mutation;
pub mod request;
pub mod review;
pub mod validation;

pub use request::{AdmissionRequest, Container, SecurityContext, extract};
pub use review::AdmissionReview;
pub use validation::Verdict;
