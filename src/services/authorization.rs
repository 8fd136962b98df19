use sqlx::PgPool;

use crate::db::models::User;
use crate::db::types::{CourseRole, MembershipStatus};
use crate::repositories;
use crate::services::anonymization::Viewer;
use crate::services::assessment::AssessmentError;

#[derive(Debug, Clone)]
pub(crate) struct Actor {
    pub(crate) user_id: String,
    pub(crate) role: CourseRole,
}

impl Actor {
    pub(crate) fn is_instructor(&self) -> bool {
        self.role >= CourseRole::Instructor
    }

    pub(crate) fn viewer(&self) -> Viewer {
        Viewer::from_role(self.role)
    }
}

pub(crate) async fn actor_for_course(
    pool: &PgPool,
    user: &User,
    course_id: &str,
) -> Result<Actor, AssessmentError> {
    if user.is_platform_admin {
        return Ok(Actor { user_id: user.id.clone(), role: CourseRole::Instructor });
    }

    let membership =
        repositories::course_memberships::find_for_user_course(pool, &user.id, course_id).await?;

    let role = membership
        .filter(|membership| membership.status == MembershipStatus::Active)
        .and_then(|membership| membership.highest_role())
        .ok_or(AssessmentError::Forbidden("Membership required for this course"))?;

    Ok(Actor { user_id: user.id.clone(), role })
}

pub(crate) fn require_at_least(actor: &Actor, role: CourseRole) -> Result<(), AssessmentError> {
    if actor.role >= role {
        Ok(())
    } else {
        Err(AssessmentError::Forbidden("Not enough permissions for this course"))
    }
}
