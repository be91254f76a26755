//! Error taxonomy for the pod object model.
//!
//! Every remote operation returns [`Result`]. Unexpected HTTP statuses are
//! reported through a single variant, [`Error::UnexpectedStatus`], tagged with
//! the [`Resource`] and action that failed, so callers can match on the
//! resource instead of on a zoo of per-type error structs.

use std::fmt;

use thiserror::Error;

use crate::connection::TransportError;

/// The kind of remote resource an error is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    Aspect,
    Notification,
    Conversation,
    Post,
    Comment,
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Resource::Aspect => write!(f, "aspect"),
            Resource::Notification => write!(f, "notification"),
            Resource::Conversation => write!(f, "conversation"),
            Resource::Post => write!(f, "post"),
            Resource::Comment => write!(f, "comment"),
        }
    }
}

/// Errors returned by model operations.
#[derive(Debug, Error)]
pub enum Error {
    /// The connection failed before a status code was available.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// The pod answered with a body that is not the JSON we expected.
    #[error("malformed response body: {0}")]
    MalformedBody(#[from] serde_json::Error),

    /// A post was constructed with neither an id nor a guid.
    #[error("neither guid nor id was provided")]
    MissingIdentifier,

    /// A payload lacks a field the operation needs.
    #[error("{resource} payload is missing field {field:?}")]
    MissingField {
        resource: Resource,
        field: &'static str,
    },

    /// The pod answered with a status other than the one the endpoint
    /// returns on success.
    #[error("{resource}: {action} failed with status {status}")]
    UnexpectedStatus {
        resource: Resource,
        action: &'static str,
        status: u16,
    },

    /// `400` on `POST aspect_memberships`.
    #[error("duplicate record, person {person_id} already exists in aspect {aspect_id}")]
    DuplicateMembership { aspect_id: u64, person_id: u64 },

    /// `404` on `POST aspect_memberships`.
    #[error("person {person_id} not found on this pod")]
    UserNotFound { person_id: u64 },

    /// The pod answered `200` with a body that is not JSON, which is how it
    /// signals that the request was dropped by CSRF protection.
    #[error("request was rejected by the pod's CSRF protection")]
    CsrfRejected,

    /// The person record holds no membership for the aspect.
    #[error("person is not a member of aspect {aspect_id}")]
    NotAMember { aspect_id: u64 },

    /// `404` on `DELETE aspect_memberships/{id}`, usually because the
    /// membership was created a moment ago and is not visible yet.
    #[error("cannot remove membership {membership_id}, probably tried too fast after adding")]
    MembershipRace { membership_id: u64 },
}

impl Error {
    /// The resource the error concerns, when there is one.
    pub fn resource(&self) -> Option<Resource> {
        match self {
            Error::MissingField { resource, .. } | Error::UnexpectedStatus { resource, .. } => {
                Some(*resource)
            }
            Error::MissingIdentifier => Some(Resource::Post),
            Error::DuplicateMembership { .. }
            | Error::UserNotFound { .. }
            | Error::NotAMember { .. }
            | Error::MembershipRace { .. }
            | Error::CsrfRejected => Some(Resource::Aspect),
            Error::Transport(_) | Error::MalformedBody(_) => None,
        }
    }

    /// The HTTP status carried by the error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::UnexpectedStatus { status, .. } => Some(*status),
            Error::DuplicateMembership { .. } => Some(400),
            Error::UserNotFound { .. } | Error::MembershipRace { .. } => Some(404),
            _ => None,
        }
    }

    pub(crate) fn unexpected(resource: Resource, action: &'static str, status: u16) -> Self {
        Error::UnexpectedStatus {
            resource,
            action,
            status,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
