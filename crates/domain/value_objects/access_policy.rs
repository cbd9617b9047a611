//! Who may do what to which resource.
//!
//! Every decision is a pure function of the acting user's role and the
//! resource owner's id, so handlers can check permissions without touching
//! the database beyond loading the row itself.

use uuid::Uuid;

use crate::domain::value_objects::enums::user_roles::UserRole;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub user_id: Uuid,
    pub role: UserRole,
}

impl Actor {
    pub fn new(user_id: Uuid, role: UserRole) -> Self {
        Self { user_id, role }
    }

    pub fn is_moderator(&self) -> bool {
        self.role == UserRole::Moderator
    }

    pub fn owns(&self, owner_id: Uuid) -> bool {
        self.user_id == owner_id
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    Course,
    Lesson,
    Payment,
    User,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    List,
    Create,
    Retrieve,
    Update,
    Delete,
}

/// Rows an actor sees on a list endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListScope {
    All,
    OwnedBy(Uuid),
}

impl ListScope {
    pub fn owner_filter(&self) -> Option<Uuid> {
        match self {
            ListScope::All => None,
            ListScope::OwnedBy(owner_id) => Some(*owner_id),
        }
    }
}

/// `owner_id` is the owner of the targeted row; it is ignored for `List`
/// and `Create`, which have no row yet. For `User` resources the owner is the
/// user themself.
pub fn is_allowed(actor: &Actor, kind: ResourceKind, action: Action, owner_id: Uuid) -> bool {
    let is_owner = actor.owns(owner_id);
    let is_moderator = actor.is_moderator();

    match (kind, action) {
        (ResourceKind::Course | ResourceKind::Lesson, Action::List) => true,
        (ResourceKind::Course | ResourceKind::Lesson, Action::Create) => !is_moderator,
        (ResourceKind::Course | ResourceKind::Lesson, Action::Retrieve | Action::Update) => {
            is_owner || is_moderator
        }
        (ResourceKind::Course | ResourceKind::Lesson, Action::Delete) => is_owner,

        (ResourceKind::Payment, Action::List | Action::Create) => true,
        (ResourceKind::Payment, Action::Retrieve | Action::Update | Action::Delete) => is_owner,

        (ResourceKind::User, Action::List | Action::Create | Action::Retrieve) => true,
        (ResourceKind::User, Action::Update | Action::Delete) => is_owner,
    }
}

/// Moderators may retrieve any course or lesson, so their lists are unscoped;
/// everyone else lists only what they own. Payments are always private.
pub fn list_scope(actor: &Actor, kind: ResourceKind) -> ListScope {
    match kind {
        ResourceKind::Course | ResourceKind::Lesson if actor.is_moderator() => ListScope::All,
        ResourceKind::User => ListScope::All,
        _ => ListScope::OwnedBy(actor.user_id),
    }
}
