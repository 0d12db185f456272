use crate::error::{Error, Result};
use crate::middleware::auth::AuthUser;
use crate::models::student::Student;
use crate::models::user::Role;
use sqlx::{PgConnection, PgPool};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StudentAccess {
    /// Read attempts, grades, indicators.
    View,
    /// Submit a quiz as this student.
    Submit,
    /// Edit grades, override attempts, assign indicators.
    Manage,
}

/// Ownership rules: students reach only their own record, teachers only the
/// students assigned to them, admins everything.
pub fn check_student_access(user: &AuthUser, student: &Student, access: StudentAccess) -> Result<()> {
    let allowed = match user.role {
        Role::Admin => true,
        Role::Student => {
            matches!(access, StudentAccess::View | StudentAccess::Submit)
                && student.user_id == Some(user.id)
        }
        Role::Teacher => {
            matches!(access, StudentAccess::View | StudentAccess::Manage)
                && student.teacher_id == Some(user.id)
        }
    };

    if allowed {
        Ok(())
    } else {
        Err(Error::Forbidden(format!(
            "Not allowed to access student {}",
            student.id
        )))
    }
}

#[derive(Clone)]
pub struct StudentService {
    pool: PgPool,
}

impl StudentService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn get_student(&self, student_id: i64) -> Result<Student> {
        sqlx::query_as::<_, Student>(r#"SELECT * FROM students WHERE id = $1"#)
            .bind(student_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Student {} not found", student_id)))
    }

    /// Loads the student and enforces the ownership rules for `access`.
    pub async fn authorize(
        &self,
        user: &AuthUser,
        student_id: i64,
        access: StudentAccess,
    ) -> Result<Student> {
        let roles: &[Role] = match access {
            StudentAccess::View => &[Role::Student, Role::Teacher],
            StudentAccess::Submit => &[Role::Student],
            StudentAccess::Manage => &[Role::Teacher],
        };
        user.require_any(roles)?;

        let student = self.get_student(student_id).await?;
        check_student_access(user, &student, access)?;
        Ok(student)
    }

    /// Row-locks the student for the rest of the transaction. Every writer
    /// of a student's attempts and grades takes this lock first.
    pub async fn lock_student(conn: &mut PgConnection, student_id: i64) -> Result<Student> {
        sqlx::query_as::<_, Student>(r#"SELECT * FROM students WHERE id = $1 FOR UPDATE"#)
            .bind(student_id)
            .fetch_optional(&mut *conn)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Student {} not found", student_id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    fn student(user_id: Option<Uuid>, teacher_id: Option<Uuid>) -> Student {
        Student {
            id: 7,
            user_id,
            teacher_id,
            name: "Ana".into(),
            grade: "5".into(),
            created_at: Utc::now(),
        }
    }

    fn user(role: Role) -> AuthUser {
        AuthUser {
            id: Uuid::new_v4(),
            role,
        }
    }

    #[test]
    fn students_reach_only_themselves() {
        let me = user(Role::Student);
        let mine = student(Some(me.id), None);
        let other = student(Some(Uuid::new_v4()), None);
        assert!(check_student_access(&me, &mine, StudentAccess::Submit).is_ok());
        assert!(check_student_access(&me, &mine, StudentAccess::View).is_ok());
        assert!(check_student_access(&me, &mine, StudentAccess::Manage).is_err());
        assert!(check_student_access(&me, &other, StudentAccess::View).is_err());
    }

    #[test]
    fn teachers_reach_only_their_students() {
        let teacher = user(Role::Teacher);
        let mine = student(None, Some(teacher.id));
        let other = student(None, Some(Uuid::new_v4()));
        assert!(check_student_access(&teacher, &mine, StudentAccess::Manage).is_ok());
        assert!(check_student_access(&teacher, &mine, StudentAccess::Submit).is_err());
        assert!(matches!(
            check_student_access(&teacher, &other, StudentAccess::View),
            Err(Error::Forbidden(_))
        ));
    }

    #[test]
    fn admins_bypass_ownership() {
        let admin = user(Role::Admin);
        let orphan = student(None, None);
        for access in [StudentAccess::View, StudentAccess::Submit, StudentAccess::Manage] {
            assert!(check_student_access(&admin, &orphan, access).is_ok());
        }
    }
}
