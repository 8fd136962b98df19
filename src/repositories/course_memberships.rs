use sqlx::PgPool;
#[cfg(test)]
use uuid::Uuid;

use crate::db::types::{CourseRole, MembershipStatus};

#[derive(Debug, Clone)]
pub(crate) struct MembershipView {
    pub(crate) status: MembershipStatus,
    pub(crate) roles: Vec<CourseRole>,
}

impl MembershipView {
    pub(crate) fn highest_role(&self) -> Option<CourseRole> {
        self.roles.iter().copied().max()
    }
}

#[derive(Debug, sqlx::FromRow)]
struct MembershipBaseRow {
    membership_id: String,
    status: MembershipStatus,
}

pub(crate) async fn find_for_user_course(
    pool: &PgPool,
    user_id: &str,
    course_id: &str,
) -> Result<Option<MembershipView>, sqlx::Error> {
    let base = sqlx::query_as::<_, MembershipBaseRow>(
        "SELECT id AS membership_id, status
         FROM course_memberships
         WHERE user_id = $1 AND course_id = $2",
    )
    .bind(user_id)
    .bind(course_id)
    .fetch_optional(pool)
    .await?;

    let Some(base) = base else {
        return Ok(None);
    };

    let roles = sqlx::query_scalar::<_, CourseRole>(
        "SELECT role
         FROM course_membership_roles
         WHERE membership_id = $1
         ORDER BY role",
    )
    .bind(&base.membership_id)
    .fetch_all(pool)
    .await?;

    Ok(Some(MembershipView { status: base.status, roles }))
}

#[cfg(test)]
pub(crate) async fn ensure_membership_with_role(
    pool: &PgPool,
    course_id: &str,
    user_id: &str,
    role: CourseRole,
    joined_at: time::PrimitiveDateTime,
) -> Result<String, sqlx::Error> {
    let mut tx = pool.begin().await?;

    let existing_id = sqlx::query_scalar::<_, String>(
        "SELECT id
         FROM course_memberships
         WHERE course_id = $1 AND user_id = $2
         FOR UPDATE",
    )
    .bind(course_id)
    .bind(user_id)
    .fetch_optional(&mut *tx)
    .await?;

    let membership_id = if let Some(id) = existing_id {
        sqlx::query("UPDATE course_memberships SET status = $1 WHERE id = $2")
            .bind(MembershipStatus::Active)
            .bind(&id)
            .execute(&mut *tx)
            .await?;
        id
    } else {
        let id = Uuid::new_v4().to_string();
        sqlx::query(
            "INSERT INTO course_memberships (id, course_id, user_id, status, joined_at)
             VALUES ($1,$2,$3,$4,$5)",
        )
        .bind(&id)
        .bind(course_id)
        .bind(user_id)
        .bind(MembershipStatus::Active)
        .bind(joined_at)
        .execute(&mut *tx)
        .await?;
        id
    };

    sqlx::query(
        "INSERT INTO course_membership_roles (membership_id, role, granted_at)
         VALUES ($1,$2,$3)
         ON CONFLICT (membership_id, role) DO NOTHING",
    )
    .bind(&membership_id)
    .bind(role)
    .bind(joined_at)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(membership_id)
}
