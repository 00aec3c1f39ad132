use crate::models::{Assignment, PeerWork, Student, Work, WorkStatus, PENDING_FILE_ID};
use plagcheck_common::error::{Result, ServiceError};
use sqlx::PgPool;
use uuid::Uuid;

#[derive(Clone)]
pub struct WorkRepository {
    pool: PgPool,
}

impl WorkRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create_student(&self, display_name: &str, email: &str) -> Result<Student> {
        let existing: Option<(Uuid,)> =
            sqlx::query_as("SELECT id FROM students WHERE email = $1")
                .bind(email)
                .fetch_optional(&self.pool)
                .await?;
        if existing.is_some() {
            return Err(ServiceError::Conflict(format!("email {email} already registered")));
        }
        let student = sqlx::query_as::<_, Student>(
            "INSERT INTO students (id, display_name, email, created_at) VALUES ($1, $2, $3, NOW()) RETURNING *",
        )
        .bind(Uuid::new_v4())
        .bind(display_name)
        .bind(email)
        .fetch_one(&self.pool)
        .await?;
        Ok(student)
    }

    pub async fn get_student(&self, id: Uuid) -> Result<Student> {
        sqlx::query_as::<_, Student>("SELECT * FROM students WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("student {id} not found")))
    }

    pub async fn delete_student(&self, id: Uuid) -> Result<()> {
        let (referenced,): (bool,) =
            sqlx::query_as("SELECT EXISTS(SELECT 1 FROM works WHERE student_id = $1)")
                .bind(id)
                .fetch_one(&self.pool)
                .await?;
        if referenced {
            return Err(ServiceError::Conflict(format!(
                "student {id} still has works"
            )));
        }
        let result = sqlx::query("DELETE FROM students WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(ServiceError::NotFound(format!("student {id} not found")));
        }
        Ok(())
    }

    pub async fn create_assignment(&self, title: &str, description: Option<&str>) -> Result<Assignment> {
        let assignment = sqlx::query_as::<_, Assignment>(
            "INSERT INTO assignments (id, title, description, created_at) VALUES ($1, $2, $3, NOW()) RETURNING *",
        )
        .bind(Uuid::new_v4())
        .bind(title)
        .bind(description)
        .fetch_one(&self.pool)
        .await?;
        Ok(assignment)
    }

    pub async fn get_assignment(&self, id: Uuid) -> Result<Assignment> {
        sqlx::query_as::<_, Assignment>("SELECT * FROM assignments WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("assignment {id} not found")))
    }

    pub async fn delete_assignment(&self, id: Uuid) -> Result<()> {
        let (referenced,): (bool,) =
            sqlx::query_as("SELECT EXISTS(SELECT 1 FROM works WHERE assignment_id = $1)")
                .bind(id)
                .fetch_one(&self.pool)
                .await?;
        if referenced {
            return Err(ServiceError::Conflict(format!(
                "assignment {id} still has works"
            )));
        }
        let result = sqlx::query("DELETE FROM assignments WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(ServiceError::NotFound(format!("assignment {id} not found")));
        }
        Ok(())
    }

    /// §4.2 metadata-only create: rejects duplicate (student, assignment) with 409.
    pub async fn create_work(&self, student_id: Uuid, assignment_id: Uuid) -> Result<Work> {
        self.get_student(student_id).await?;
        self.get_assignment(assignment_id).await?;

        let duplicate: Option<(Uuid,)> = sqlx::query_as(
            "SELECT id FROM works WHERE student_id = $1 AND assignment_id = $2",
        )
        .bind(student_id)
        .bind(assignment_id)
        .fetch_optional(&self.pool)
        .await?;
        if duplicate.is_some() {
            return Err(ServiceError::Conflict(
                "a work already exists for this student and assignment".into(),
            ));
        }

        let work = sqlx::query_as::<_, Work>(
            r#"
            INSERT INTO works (id, student_id, assignment_id, file_id, status, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, NOW(), NOW())
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(student_id)
        .bind(assignment_id)
        .bind(PENDING_FILE_ID)
        .bind(WorkStatus::Uploaded.as_str())
        .fetch_one(&self.pool)
        .await?;
        Ok(work)
    }

    pub async fn get_work(&self, id: Uuid) -> Result<Work> {
        sqlx::query_as::<_, Work>("SELECT * FROM works WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("work {id} not found")))
    }

    pub async fn delete_work(&self, id: Uuid) -> Result<()> {
        let result = sqlx::query("DELETE FROM works WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(ServiceError::NotFound(format!("work {id} not found")));
        }
        Ok(())
    }

    pub async fn attach_file(&self, id: Uuid, file_id: &str) -> Result<Work> {
        let work = sqlx::query_as::<_, Work>(
            "UPDATE works SET file_id = $2, updated_at = NOW() WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(file_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("work {id} not found")))?;
        Ok(work)
    }

    pub async fn set_status(&self, id: Uuid, status: WorkStatus) -> Result<Work> {
        let current = self.get_work(id).await?;
        let current_status = WorkStatus::parse(&current.status).unwrap_or(WorkStatus::Uploaded);
        if !current_status.can_transition_to(status) {
            return Err(ServiceError::Conflict(format!(
                "cannot transition work {id} from {} to {}",
                current_status.as_str(),
                status.as_str()
            )));
        }
        let work = sqlx::query_as::<_, Work>(
            "UPDATE works SET status = $2, updated_at = NOW() WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(status.as_str())
        .fetch_one(&self.pool)
        .await?;
        Ok(work)
    }

    /// §4.2 previous-works query: peer works in the same assignment excluding one, oldest first.
    pub async fn peer_works(
        &self,
        assignment_id: Uuid,
        exclude_work_id: Uuid,
        page: i64,
        limit: i64,
    ) -> Result<Vec<PeerWork>> {
        let offset = (page.max(1) - 1) * limit;
        let rows = sqlx::query_as::<_, (Uuid, Uuid, String, chrono::DateTime<chrono::Utc>)>(
            r#"
            SELECT id, student_id, file_id, created_at FROM works
            WHERE assignment_id = $1 AND id != $2 AND file_id != $3
            ORDER BY created_at ASC
            LIMIT $4 OFFSET $5
            "#,
        )
        .bind(assignment_id)
        .bind(exclude_work_id)
        .bind(PENDING_FILE_ID)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows
            .into_iter()
            .map(|(work_id, student_id, file_id, created_at)| PeerWork {
                work_id,
                student_id,
                file_id,
                created_at,
            })
            .collect())
    }

    pub async fn list_works_for_student(&self, student_id: Uuid, page: i64, limit: i64) -> Result<Vec<Work>> {
        let offset = (page.max(1) - 1) * limit;
        let rows = sqlx::query_as::<_, Work>(
            "SELECT * FROM works WHERE student_id = $1 ORDER BY created_at DESC LIMIT $2 OFFSET $3",
        )
        .bind(student_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn list_works_for_assignment(&self, assignment_id: Uuid, page: i64, limit: i64) -> Result<Vec<Work>> {
        let offset = (page.max(1) - 1) * limit;
        let rows = sqlx::query_as::<_, Work>(
            "SELECT * FROM works WHERE assignment_id = $1 ORDER BY created_at DESC LIMIT $2 OFFSET $3",
        )
        .bind(assignment_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}
