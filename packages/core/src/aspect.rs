//! Aspects: the contact groups that decide who sees a post.
//!
//! Membership is managed through `aspect_memberships`. Removing someone
//! needs the membership id, which only the caller's local copy of that
//! person knows; see [`PersonRecord`].

use std::sync::Arc;

use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::connection::{Connection, Request};
use crate::error::{Error, Resource, Result};

// ---------------------------------------------------------------------------
// PersonRecord
// ---------------------------------------------------------------------------

/// A locally held person, tagged with the listing it came from.
///
/// The two listings put the aspect memberships in different places:
///
/// | Variant | Source | Memberships at |
/// |---------|--------|----------------|
/// | [`Profile`](Self::Profile) | `people/{guid}.json` | `contact.aspect_memberships` |
/// | [`Contact`](Self::Contact) | `contacts.json` | `aspect_memberships` |
///
/// Each membership looks like `{"id": 55, "aspect": {"id": 3, "name": "Family"}}`.
#[derive(Debug, Clone, PartialEq)]
pub enum PersonRecord {
    Profile(Value),
    Contact(Value),
}

impl PersonRecord {
    pub fn data(&self) -> &Value {
        match self {
            PersonRecord::Profile(v) | PersonRecord::Contact(v) => v,
        }
    }

    /// The memberships held locally for this person.
    pub fn aspect_memberships(&self) -> &[Value] {
        let list = match self {
            PersonRecord::Profile(v) => v.get("contact").and_then(|c| c.get("aspect_memberships")),
            PersonRecord::Contact(v) => v.get("aspect_memberships"),
        };
        list.and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    fn aspect_memberships_mut(&mut self) -> Option<&mut Vec<Value>> {
        let list = match self {
            PersonRecord::Profile(v) => v
                .get_mut("contact")
                .and_then(|c| c.get_mut("aspect_memberships")),
            PersonRecord::Contact(v) => v.get_mut("aspect_memberships"),
        };
        list.and_then(Value::as_array_mut)
    }

    /// Position and id of the membership that links this person to `aspect_id`.
    fn membership_in(&self, aspect_id: u64) -> Option<(usize, u64)> {
        self.aspect_memberships()
            .iter()
            .enumerate()
            .find(|(_, m)| {
                m.get("aspect")
                    .and_then(|a| a.get("id"))
                    .and_then(Value::as_u64)
                    == Some(aspect_id)
            })
            .and_then(|(i, m)| m.get("id").and_then(Value::as_u64).map(|id| (i, id)))
    }
}

// ---------------------------------------------------------------------------
// Aspect
// ---------------------------------------------------------------------------

pub struct Aspect {
    connection: Arc<dyn Connection>,
    pub id: u64,
    pub name: Option<String>,
    cached: Vec<Value>,
}

impl Aspect {
    pub fn new(connection: Arc<dyn Connection>, id: u64, name: Option<String>) -> Self {
        Self {
            connection,
            id,
            name,
            cached: Vec::new(),
        }
    }

    /// Contacts in this aspect.
    ///
    /// With `fetch` the list is reloaded from `contacts.json?a_id={id}`;
    /// without it the last fetched list is returned (empty if none).
    pub fn get_users(&mut self, fetch: bool) -> Result<&[Value]> {
        if fetch {
            let response = self
                .connection
                .send(Request::get("contacts.json").query("a_id", self.id.to_string()))?;
            if response.status != 200 {
                return Err(Error::unexpected(
                    Resource::Aspect,
                    "list members",
                    response.status,
                ));
            }
            self.cached = response.json()?;
        }
        Ok(self.cached.as_slice())
    }

    /// Delete the whole aspect.
    ///
    /// The pod answers a successful delete with a `302` redirect back to the
    /// contacts page; any other status means the aspect is still there.
    pub fn remove_aspect(&self) -> Result<()> {
        let token = self.connection.csrf_token()?;
        let request = Request::post(format!("aspects/{}", self.id))
            .field("_method", "delete")
            .field("authenticity_token", token);

        let response = self.connection.post(request)?;
        if response.status != 302 {
            return Err(Error::unexpected(
                Resource::Aspect,
                "remove aspect",
                response.status,
            ));
        }
        debug!(id = self.id, "aspect removed");
        Ok(())
    }

    /// Add person `person_id` to this aspect. Returns the new membership.
    ///
    /// Refresh the person afterwards (or apply the returned membership
    /// locally) before calling [`remove_user`](Self::remove_user), which
    /// needs the membership id.
    pub fn add_user(&self, person_id: u64) -> Result<Value> {
        let token = self.connection.csrf_token()?;
        let request = Request::post("aspect_memberships")
            .json(json!({ "aspect_id": self.id, "person_id": person_id }))
            .header("content-type", "application/json")
            .header("x-csrf-token", token)
            .accept_json();

        let response = self.connection.post(request)?;
        match response.status {
            200 => {}
            400 => {
                return Err(Error::DuplicateMembership {
                    aspect_id: self.id,
                    person_id,
                })
            }
            404 => return Err(Error::UserNotFound { person_id }),
            status => return Err(Error::unexpected(Resource::Aspect, "add user", status)),
        }

        // A request dropped by the pod's CSRF filter still gets a 200, but
        // with an HTML page instead of the membership.
        match response.json::<Value>() {
            Ok(membership) if !membership.is_null() => {
                debug!(aspect = self.id, person_id, "person added to aspect");
                Ok(membership)
            }
            _ => {
                warn!(aspect = self.id, person_id, "add user answered 200 without JSON");
                Err(Error::CsrfRejected)
            }
        }
    }

    /// Remove `person` from this aspect and drop the membership from the
    /// local record.
    pub fn remove_user(&self, person: &mut PersonRecord) -> Result<Value> {
        let (index, membership_id) = person
            .membership_in(self.id)
            .ok_or(Error::NotAMember { aspect_id: self.id })?;

        let token = self.connection.csrf_token()?;
        let request = Request::delete(format!("aspect_memberships/{membership_id}"))
            .header("x-csrf-token", token)
            .accept_json();

        let response = self.connection.delete(request)?;
        match response.status {
            200 => {}
            404 => return Err(Error::MembershipRace { membership_id }),
            status => return Err(Error::unexpected(Resource::Aspect, "remove user", status)),
        }

        if let Some(list) = person.aspect_memberships_mut() {
            list.remove(index);
        }
        debug!(aspect = self.id, membership_id, "person removed from aspect");
        Ok(response.json_value()?)
    }
}
