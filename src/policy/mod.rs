//! Access decisions for every tenant-scoped resource.
//!
//! The functions here are pure: handlers load the facts (who owns the row,
//! which team role the caller holds) and ask for a [`Decision`]. Workspace
//! resources need no predicate of their own because the query layer only ever
//! sees rows inside the caller's workspace (see `database::repository::Scope`).
//!
//! Status conventions:
//! - a resource the caller may not see at all is reported as missing (404),
//! - a visible resource with an insufficient role is forbidden (403),
//! - a legal caller asking for an illegal state change is a bad request (400).

use uuid::Uuid;

use crate::database::models::{Bill, TeamInvitation, TeamMember};
use crate::error::ApiError;
use crate::types::{InvitationStatus, Role};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Forbid(&'static str),
    Hide,
    Reject(&'static str),
}

impl Decision {
    /// `entity` names the resource in the 404 message
    pub fn check(self, entity: &str) -> Result<(), ApiError> {
        match self {
            Decision::Allow => Ok(()),
            Decision::Forbid(reason) => Err(ApiError::forbidden(reason)),
            Decision::Hide => Err(ApiError::not_found(format!("{} not found", entity))),
            Decision::Reject(reason) => Err(ApiError::bad_request(reason)),
        }
    }

    pub fn is_allowed(self) -> bool {
        self == Decision::Allow
    }
}

/// Why a principal may touch a bill
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Grant {
    Owner(Uuid),
    TeamMember { team_id: Uuid, role: Role },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    Read,
    Write,
    Delete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TeamCapability {
    View,
    Update,
    Delete,
    ManageMembers,
    ChangeRoles,
}

/// Collect the grants `user_id` holds on `bill`; `team_role` is the caller's
/// role in the bill's team, if any.
pub fn bill_grants(user_id: Uuid, bill: &Bill, team_role: Option<Role>) -> Vec<Grant> {
    let mut grants = Vec::new();
    if bill.user_id == user_id {
        grants.push(Grant::Owner(user_id));
    }
    if let (Some(team_id), Some(role)) = (bill.team_id, team_role) {
        grants.push(Grant::TeamMember { team_id, role });
    }
    grants
}

pub fn bill(grants: &[Grant], capability: Capability) -> Decision {
    if grants.is_empty() {
        return Decision::Hide;
    }
    match capability {
        Capability::Read => Decision::Allow,
        Capability::Write | Capability::Delete => {
            let manages = grants.iter().any(|g| match g {
                Grant::Owner(_) => true,
                Grant::TeamMember { role, .. } => role.can_manage(),
            });
            if manages {
                Decision::Allow
            } else {
                Decision::Forbid("Only the bill owner or a team admin can modify this bill")
            }
        }
    }
}

/// Non-members are forbidden whether or not the team exists, so the answer
/// does not reveal which team ids are real.
pub fn team(membership: Option<Role>, capability: TeamCapability) -> Decision {
    let Some(role) = membership else {
        return Decision::Forbid("You are not a member of this team");
    };
    match capability {
        TeamCapability::View => Decision::Allow,
        TeamCapability::Update | TeamCapability::ManageMembers if role.can_manage() => Decision::Allow,
        TeamCapability::Update => Decision::Forbid("Only team owners and admins can update the team"),
        TeamCapability::ManageMembers => Decision::Forbid("Only team owners and admins can manage members"),
        TeamCapability::Delete | TeamCapability::ChangeRoles if role == Role::Owner => Decision::Allow,
        TeamCapability::Delete => Decision::Forbid("Only the team owner can delete the team"),
        TeamCapability::ChangeRoles => Decision::Forbid("Only the team owner can change member roles"),
    }
}

/// Role change requested by an owner. Ownership moves by promoting someone
/// else; the current owner cannot simply step down.
pub fn role_change(target: &TeamMember, new_role: Role) -> Decision {
    if target.role == Role::Owner && new_role != Role::Owner {
        return Decision::Reject("The team owner cannot be demoted; promote another member to OWNER instead");
    }
    Decision::Allow
}

pub fn remove_member(actor_id: Uuid, actor_role: Role, target: &TeamMember) -> Decision {
    if target.role == Role::Owner {
        return Decision::Reject("The team owner cannot be removed");
    }
    if actor_role.can_manage() || target.user_id == actor_id {
        Decision::Allow
    } else {
        Decision::Forbid("Only team owners and admins can remove other members")
    }
}

/// Every check a member PATCH needs, decided before anything is written
pub fn member_update(
    actor_id: Uuid,
    actor_role: Role,
    target: &TeamMember,
    new_role: Option<Role>,
    settings: bool,
) -> Decision {
    if let Some(role) = new_role {
        let decision = team(Some(actor_role), TeamCapability::ChangeRoles);
        if !decision.is_allowed() {
            return decision;
        }
        let decision = role_change(target, role);
        if !decision.is_allowed() {
            return decision;
        }
    }
    if settings {
        return member_settings(actor_id, actor_role, target);
    }
    Decision::Allow
}

/// Member settings such as notifications may be changed by the member or a manager
pub fn member_settings(actor_id: Uuid, actor_role: Role, target: &TeamMember) -> Decision {
    if actor_role.can_manage() || target.user_id == actor_id {
        Decision::Allow
    } else {
        Decision::Forbid("You can only change your own notification settings")
    }
}

fn addressed_to(email: &str, invitation: &TeamInvitation) -> bool {
    invitation.email.eq_ignore_ascii_case(email)
}

pub fn invitation_view(email: &str, invitation: &TeamInvitation) -> Decision {
    if addressed_to(email, invitation) {
        Decision::Allow
    } else {
        Decision::Hide
    }
}

/// Accepting or declining is reserved to the invitee, once
pub fn invitation_respond(email: &str, invitation: &TeamInvitation) -> Decision {
    if !addressed_to(email, invitation) {
        return Decision::Hide;
    }
    if invitation.status != InvitationStatus::Pending {
        return Decision::Reject("Invitation has already been processed");
    }
    Decision::Allow
}

pub fn invitation_cancel(
    actor_id: Uuid,
    email: &str,
    team_role: Option<Role>,
    invitation: &TeamInvitation,
) -> Decision {
    if addressed_to(email, invitation) || invitation.invited_by_id == Some(actor_id) {
        return Decision::Allow;
    }
    match team_role {
        Some(role) if role.can_manage() => Decision::Allow,
        Some(_) => Decision::Forbid("Only the inviter, the invitee or a team admin can cancel an invitation"),
        None => Decision::Hide,
    }
}

/// Approving or rejecting a ledger transaction depends on the workspace role
pub fn transaction_approval(role: Role) -> Decision {
    if role.can_manage() {
        Decision::Allow
    } else {
        Decision::Forbid("Only workspace owners and admins can approve transactions")
    }
}
