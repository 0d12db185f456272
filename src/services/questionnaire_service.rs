use crate::dto::questionnaire_dto::{
    CreateQuestionPayload, CreateQuestionnairePayload, QuestionnaireFilter, UpdateQuestionPayload,
};
use crate::error::{Error, Result};
use crate::middleware::auth::AuthUser;
use crate::models::question::Question;
use crate::models::questionnaire::Questionnaire;
use sqlx::{PgExecutor, PgPool};
use uuid::Uuid;

/// Teachers may change only questionnaires they authored.
pub fn ensure_owner(user: &AuthUser, questionnaire: &Questionnaire) -> Result<()> {
    if user.is_admin() || questionnaire.created_by == Some(user.id) {
        Ok(())
    } else {
        Err(Error::Forbidden(format!(
            "Questionnaire {} belongs to another teacher",
            questionnaire.id
        )))
    }
}

fn normalize_options(options: &[String]) -> Result<[String; 4]> {
    let trimmed: Vec<String> = options.iter().map(|o| o.trim().to_string()).collect();
    if trimmed.iter().any(|o| o.is_empty()) {
        return Err(Error::BadRequest("Question options cannot be empty".to_string()));
    }
    trimmed
        .try_into()
        .map_err(|_| Error::BadRequest("A question needs exactly four options".to_string()))
}

#[derive(Clone)]
pub struct QuestionnaireService {
    pool: PgPool,
}

impl QuestionnaireService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn find_questionnaire<'e, E>(exec: E, questionnaire_id: i64) -> Result<Questionnaire>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, Questionnaire>(r#"SELECT * FROM questionnaires WHERE id = $1"#)
            .bind(questionnaire_id)
            .fetch_optional(exec)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Questionnaire {} not found", questionnaire_id)))
    }

    pub async fn find_questions<'e, E>(exec: E, questionnaire_id: i64) -> Result<Vec<Question>>
    where
        E: PgExecutor<'e>,
    {
        let rows = sqlx::query_as::<_, Question>(
            r#"
            SELECT * FROM questions
            WHERE questionnaire_id = $1
            ORDER BY position, id
            "#,
        )
        .bind(questionnaire_id)
        .fetch_all(exec)
        .await?;
        Ok(rows)
    }

    async fn insert_question<'e, E>(
        exec: E,
        questionnaire_id: i64,
        payload: &CreateQuestionPayload,
    ) -> Result<Question>
    where
        E: PgExecutor<'e>,
    {
        let [o1, o2, o3, o4] = normalize_options(&payload.options)?;
        let question = sqlx::query_as::<_, Question>(
            r#"
            INSERT INTO questions (
                questionnaire_id, position, text, option1, option2, option3, option4,
                correct_answer, image_url
            ) VALUES (
                $1,
                COALESCE($2, (SELECT COALESCE(MAX(position), 0) + 1 FROM questions WHERE questionnaire_id = $1)),
                $3, $4, $5, $6, $7, $8, $9
            )
            RETURNING *
            "#,
        )
        .bind(questionnaire_id)
        .bind(payload.position)
        .bind(payload.text.trim())
        .bind(o1)
        .bind(o2)
        .bind(o3)
        .bind(o4)
        .bind(payload.correct_answer)
        .bind(payload.image_url.clone())
        .fetch_one(exec)
        .await?;
        Ok(question)
    }

    pub async fn create(
        &self,
        payload: CreateQuestionnairePayload,
        created_by: Uuid,
    ) -> Result<(Questionnaire, Vec<Question>)> {
        let mut tx = self.pool.begin().await?;

        let questionnaire = sqlx::query_as::<_, Questionnaire>(
            r#"
            INSERT INTO questionnaires (title, phase, grade, category, created_by)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(payload.title.trim())
        .bind(payload.phase)
        .bind(payload.grade.trim())
        .bind(payload.category.trim())
        .bind(created_by)
        .fetch_one(&mut *tx)
        .await?;

        let mut questions = Vec::with_capacity(payload.questions.len());
        for (idx, q) in payload.questions.iter().enumerate() {
            let mut q = q.clone();
            q.position = q.position.or(Some(idx as i32 + 1));
            questions.push(Self::insert_question(&mut *tx, questionnaire.id, &q).await?);
        }

        tx.commit().await?;
        tracing::info!(
            questionnaire_id = questionnaire.id,
            questions = questions.len(),
            %created_by,
            "questionnaire created"
        );
        Ok((questionnaire, questions))
    }

    pub async fn list(&self, filter: QuestionnaireFilter) -> Result<Vec<Questionnaire>> {
        let rows = sqlx::query_as::<_, Questionnaire>(
            r#"
            SELECT * FROM questionnaires
            WHERE ($1::smallint IS NULL OR phase = $1)
              AND ($2::text IS NULL OR grade = $2)
              AND ($3::text IS NULL OR category = $3)
            ORDER BY phase, created_at DESC
            "#,
        )
        .bind(filter.phase)
        .bind(filter.grade)
        .bind(filter.category)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn get_with_questions(
        &self,
        questionnaire_id: i64,
    ) -> Result<(Questionnaire, Vec<Question>)> {
        let questionnaire = Self::find_questionnaire(&self.pool, questionnaire_id).await?;
        let questions = Self::find_questions(&self.pool, questionnaire_id).await?;
        Ok((questionnaire, questions))
    }

    pub async fn get(&self, questionnaire_id: i64) -> Result<Questionnaire> {
        Self::find_questionnaire(&self.pool, questionnaire_id).await
    }

    pub async fn add_question(
        &self,
        questionnaire_id: i64,
        payload: CreateQuestionPayload,
    ) -> Result<Question> {
        let question = Self::insert_question(&self.pool, questionnaire_id, &payload).await?;
        tracing::info!(questionnaire_id, question_id = question.id, "question added");
        Ok(question)
    }

    pub async fn get_question(&self, question_id: i64) -> Result<Question> {
        sqlx::query_as::<_, Question>(r#"SELECT * FROM questions WHERE id = $1"#)
            .bind(question_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Question {} not found", question_id)))
    }

    /// Edits apply in place. Graded attempts keep their stored breakdown, so
    /// their scores do not move.
    pub async fn update_question(
        &self,
        question_id: i64,
        payload: UpdateQuestionPayload,
    ) -> Result<Question> {
        let options = match &payload.options {
            Some(opts) => Some(normalize_options(opts)?),
            None => None,
        };
        let option = |i: usize| options.as_ref().map(|o| o[i].clone());

        let question = sqlx::query_as::<_, Question>(
            r#"
            UPDATE questions
            SET text = COALESCE($2, text),
                option1 = COALESCE($3, option1),
                option2 = COALESCE($4, option2),
                option3 = COALESCE($5, option3),
                option4 = COALESCE($6, option4),
                correct_answer = COALESCE($7, correct_answer),
                image_url = COALESCE($8, image_url),
                position = COALESCE($9, position),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(question_id)
        .bind(payload.text.as_deref().map(str::trim))
        .bind(option(0))
        .bind(option(1))
        .bind(option(2))
        .bind(option(3))
        .bind(payload.correct_answer)
        .bind(payload.image_url)
        .bind(payload.position)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| Error::NotFound(format!("Question {} not found", question_id)))?;

        let graded: i64 = sqlx::query_scalar(
            r#"SELECT COUNT(*) FROM quiz_attempts WHERE questionnaire_id = $1"#,
        )
        .bind(question.questionnaire_id)
        .fetch_one(&self.pool)
        .await?;
        if graded > 0 {
            tracing::warn!(
                question_id,
                questionnaire_id = question.questionnaire_id,
                graded_attempts = graded,
                "question edited after attempts were graded"
            );
        }

        Ok(question)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::user::Role;
    use chrono::Utc;

    fn questionnaire(created_by: Option<Uuid>) -> Questionnaire {
        Questionnaire {
            id: 3,
            title: "Fractions".into(),
            phase: 2,
            grade: "4".into(),
            category: "math".into(),
            created_by,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn only_the_author_or_an_admin_may_edit() {
        let author = AuthUser {
            id: Uuid::new_v4(),
            role: Role::Teacher,
        };
        let other = AuthUser {
            id: Uuid::new_v4(),
            role: Role::Teacher,
        };
        let admin = AuthUser {
            id: Uuid::new_v4(),
            role: Role::Admin,
        };
        let q = questionnaire(Some(author.id));
        assert!(ensure_owner(&author, &q).is_ok());
        assert!(ensure_owner(&admin, &q).is_ok());
        assert!(matches!(ensure_owner(&other, &q), Err(Error::Forbidden(_))));
    }

    #[test]
    fn options_are_trimmed_and_counted() {
        let opts = ["  a ", "b", "c", "d"].map(String::from);
        assert_eq!(normalize_options(&opts).unwrap()[0], "a");
        assert!(normalize_options(&opts[..3]).is_err());
        let blank = ["a", " ", "c", "d"].map(String::from);
        assert!(normalize_options(&blank).is_err());
    }
}
