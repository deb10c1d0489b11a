//! Request identity and the permission gate
//!
//! Authentication happens outside this crate. Callers hand in a
//! [`RequestContext`] naming the current user and organization, and ask a
//! [`PermissionGate`] before acting on an entity.

use crate::error::DomainError;
use crate::models::{Job, Project, Task};

/// Who is asking, and within which organization
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestContext {
    pub user_id: i64,
    /// `None` is the personal workspace (rows without an organization)
    pub organization_id: Option<i64>,
    pub is_admin: bool,
}

impl RequestContext {
    pub fn new(user_id: i64) -> Self {
        Self {
            user_id,
            organization_id: None,
            is_admin: false,
        }
    }

    pub fn in_organization(mut self, organization_id: i64) -> Self {
        self.organization_id = Some(organization_id);
        self
    }

    pub fn as_admin(mut self) -> Self {
        self.is_admin = true;
        self
    }

    pub fn in_scope(&self, organization_id: Option<i64>) -> bool {
        self.organization_id == organization_id
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    View,
    Update,
    Delete,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::View => "view",
            Action::Update => "update",
            Action::Delete => "delete",
        }
    }
}

/// The facts about an entity the gate decides on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resource {
    pub entity: &'static str,
    pub id: i64,
    pub organization_id: Option<i64>,
    pub owner_id: Option<i64>,
    pub assignee_id: Option<i64>,
    pub guide_id: Option<i64>,
}

impl Resource {
    pub fn project(project: &Project) -> Self {
        Self {
            entity: "Project",
            id: project.id,
            organization_id: project.organization_id,
            owner_id: project.owner_id,
            assignee_id: project.assignee_id,
            guide_id: None,
        }
    }

    pub fn task(task: &Task) -> Self {
        Self {
            entity: "Task",
            id: task.id,
            organization_id: task.organization_id,
            owner_id: task.owner_id,
            assignee_id: task.assignee_id,
            guide_id: None,
        }
    }

    /// Jobs are owned through their task; the guide acts as the job's owner
    pub fn job(job: &Job, task: &Task) -> Self {
        Self {
            entity: "Job",
            id: job.id,
            organization_id: task.organization_id,
            owner_id: task.owner_id,
            assignee_id: job.assignee_id,
            guide_id: job.guide_id,
        }
    }

    fn is(&self, user_id: i64, who: Option<i64>) -> bool {
        who == Some(user_id)
    }
}

pub trait PermissionGate {
    fn check(&self, ctx: &RequestContext, resource: &Resource, action: Action) -> Result<(), DomainError>;
}

/// Default role-based policy
///
/// - entities outside the current organization scope look missing
/// - admins may do anything within scope
/// - owner, assignee and guide may view and update
/// - owner and guide may delete
#[derive(Debug, Clone, Copy, Default)]
pub struct RolePolicy;

impl PermissionGate for RolePolicy {
    fn check(&self, ctx: &RequestContext, resource: &Resource, action: Action) -> Result<(), DomainError> {
        if !ctx.in_scope(resource.organization_id) {
            return Err(DomainError::not_found(resource.entity, resource.id));
        }
        if ctx.is_admin {
            return Ok(());
        }

        let user = ctx.user_id;
        let owner = resource.is(user, resource.owner_id);
        let guide = resource.is(user, resource.guide_id);
        let assignee = resource.is(user, resource.assignee_id);

        let allowed = match action {
            Action::View | Action::Update => owner || guide || assignee,
            Action::Delete => owner || guide,
        };

        if allowed {
            Ok(())
        } else {
            Err(DomainError::PermissionDenied {
                action: action.as_str().to_string(),
                entity: resource.entity,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resource() -> Resource {
        Resource {
            entity: "Task",
            id: 1,
            organization_id: Some(10),
            owner_id: Some(1),
            assignee_id: Some(2),
            guide_id: None,
        }
    }

    #[test]
    fn test_out_of_scope_looks_missing() {
        let ctx = RequestContext::new(1).in_organization(11);
        let err = RolePolicy.check(&ctx, &resource(), Action::View).unwrap_err();
        assert!(err.is_not_found());

        let personal = RequestContext::new(1);
        assert!(RolePolicy.check(&personal, &resource(), Action::View).unwrap_err().is_not_found());
    }

    #[test]
    fn test_owner_and_assignee_rights() {
        let owner = RequestContext::new(1).in_organization(10);
        let assignee = RequestContext::new(2).in_organization(10);
        assert!(RolePolicy.check(&owner, &resource(), Action::Delete).is_ok());
        assert!(RolePolicy.check(&assignee, &resource(), Action::Update).is_ok());
        let err = RolePolicy.check(&assignee, &resource(), Action::Delete).unwrap_err();
        assert!(matches!(err, DomainError::PermissionDenied { .. }));
    }

    #[test]
    fn test_stranger_denied_admin_allowed() {
        let stranger = RequestContext::new(3).in_organization(10);
        assert!(RolePolicy.check(&stranger, &resource(), Action::View).is_err());
        let admin = stranger.as_admin();
        assert!(RolePolicy.check(&admin, &resource(), Action::Delete).is_ok());
    }
}
