use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::{PgPool, Postgres, Transaction};
use tracing::debug;
use uuid::Uuid;

use crate::models::candidate::{
    Availability, Candidate, CandidateRow, CandidateUpdate, EngagedCandidate, NewCandidate,
};
use crate::models::referral::{NewReferral, Referral, ReferralRow};
use crate::models::requisition::{NewRequisition, Requisition, RequisitionRow, RequisitionStatus};
use crate::referrals::decision::DecisionError;
use crate::store::{
    decode, DecisionApplied, InsertOutcome, RecruitingStore, ResumeReplaced, StoreError,
    TransitionContext, TransitionRule,
};

const REQUISITION_COLUMNS: &str = "id, title, client_name, document_path, status, \
    required_experience, manager_id, created_at";

const REFERRAL_COLUMNS: &str = "id, requisition_id, candidate_id, match_score, justification, \
    matching_skills, status, created_at, updated_at";

/// Candidate columns with the skill set folded into a TEXT[].
const CANDIDATE_SELECT: &str = r#"
    SELECT c.id, c.full_name, c.years_of_experience, c.availability,
           c.expected_availability_date, c.resume_path, c.updated_at,
           COALESCE(array_agg(s.name ORDER BY s.name) FILTER (WHERE s.name IS NOT NULL), '{}') AS skills
    FROM candidates c
    LEFT JOIN candidate_skills cs ON cs.candidate_id = c.id
    LEFT JOIN skills s ON s.id = cs.skill_id
"#;

/// Postgres-backed store.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RecruitingStore for PgStore {
    async fn create_requisition(&self, new: NewRequisition) -> Result<Requisition, StoreError> {
        let sql = format!(
            "INSERT INTO requisitions (id, title, client_name, document_path, manager_id) \
             VALUES ($1, $2, $3, $4, $5) RETURNING {REQUISITION_COLUMNS}"
        );
        let row = sqlx::query_as::<_, RequisitionRow>(&sql)
            .bind(Uuid::new_v4())
            .bind(&new.title)
            .bind(&new.client_name)
            .bind(&new.document_path)
            .bind(new.manager_id)
            .fetch_one(&self.pool)
            .await?;
        decode(row)
    }

    async fn find_requisition(&self, id: Uuid) -> Result<Option<Requisition>, StoreError> {
        let sql = format!("SELECT {REQUISITION_COLUMNS} FROM requisitions WHERE id = $1");
        sqlx::query_as::<_, RequisitionRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(decode)
            .transpose()
    }

    async fn requisitions_for_manager(
        &self,
        manager_id: Uuid,
    ) -> Result<Vec<Requisition>, StoreError> {
        let sql = format!(
            "SELECT {REQUISITION_COLUMNS} FROM requisitions \
             WHERE manager_id = $1 ORDER BY created_at DESC"
        );
        sqlx::query_as::<_, RequisitionRow>(&sql)
            .bind(manager_id)
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(decode)
            .collect()
    }

    async fn set_required_experience(&self, id: Uuid, years: i32) -> Result<bool, StoreError> {
        let result = sqlx::query("UPDATE requisitions SET required_experience = $2 WHERE id = $1")
            .bind(id)
            .bind(years)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn set_requisition_status(
        &self,
        id: Uuid,
        status: RequisitionStatus,
    ) -> Result<Option<Requisition>, StoreError> {
        let sql = format!(
            "UPDATE requisitions SET status = $2 WHERE id = $1 RETURNING {REQUISITION_COLUMNS}"
        );
        sqlx::query_as::<_, RequisitionRow>(&sql)
            .bind(id)
            .bind(status.as_str())
            .fetch_optional(&self.pool)
            .await?
            .map(decode)
            .transpose()
    }

    async fn create_candidate(&self, new: NewCandidate) -> Result<Candidate, StoreError> {
        let id = Uuid::new_v4();
        sqlx::query(
            r#"
            INSERT INTO candidates
                (id, full_name, years_of_experience, availability, expected_availability_date)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(id)
        .bind(&new.full_name)
        .bind(new.years_of_experience)
        .bind(new.availability.as_str())
        .bind(new.expected_availability_date)
        .execute(&self.pool)
        .await?;

        self.find_candidate(id)
            .await?
            .ok_or_else(|| StoreError::Unavailable(format!("candidate {id} vanished after insert")))
    }

    async fn find_candidate(&self, id: Uuid) -> Result<Option<Candidate>, StoreError> {
        let sql = format!("{CANDIDATE_SELECT} WHERE c.id = $1 GROUP BY c.id");
        sqlx::query_as::<_, CandidateRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(decode)
            .transpose()
    }

    async fn candidates_available_by(
        &self,
        threshold: NaiveDate,
    ) -> Result<Vec<Candidate>, StoreError> {
        let sql = format!(
            "{CANDIDATE_SELECT} \
             WHERE c.availability = 'AVAILABLE' \
                OR (c.availability = 'ON_PROJECT' AND c.expected_availability_date <= $1) \
             GROUP BY c.id ORDER BY c.full_name"
        );
        sqlx::query_as::<_, CandidateRow>(&sql)
            .bind(threshold)
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(decode)
            .collect()
    }

    async fn replace_resume_path(
        &self,
        id: Uuid,
        path: &str,
    ) -> Result<Option<ResumeReplaced>, StoreError> {
        let mut tx = self.pool.begin().await?;

        let previous: Option<Option<String>> =
            sqlx::query_scalar("SELECT resume_path FROM candidates WHERE id = $1 FOR UPDATE")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?;
        let Some(previous) = previous else {
            return Ok(None);
        };

        sqlx::query("UPDATE candidates SET resume_path = $2, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .bind(path)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(Some(ResumeReplaced { previous }))
    }

    async fn replace_candidate_skills(
        &self,
        id: Uuid,
        skills: &[String],
    ) -> Result<Vec<String>, StoreError> {
        let mut tx = self.pool.begin().await?;
        let stored = write_skills(&mut tx, id, skills).await?;

        sqlx::query("UPDATE candidates SET updated_at = NOW() WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(stored)
    }

    async fn update_candidate(
        &self,
        id: Uuid,
        update: &CandidateUpdate,
    ) -> Result<Option<Candidate>, StoreError> {
        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query(
            "UPDATE candidates SET full_name = $2, years_of_experience = $3, availability = $4, \
             expected_availability_date = $5, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(&update.full_name)
        .bind(update.years_of_experience)
        .bind(update.availability.as_str())
        .bind(update.expected_availability_date)
        .execute(&mut *tx)
        .await?;
        if updated.rows_affected() == 0 {
            return Ok(None);
        }

        write_skills(&mut tx, id, &update.skills).await?;
        tx.commit().await?;
        debug!("Candidate {id} profile rewritten with {} skills", update.skills.len());

        self.find_candidate(id).await
    }

    async fn engaged_candidates(&self) -> Result<Vec<EngagedCandidate>, StoreError> {
        let rows: Vec<(Uuid, String, String, Option<Uuid>, Option<String>, Option<String>)> =
            sqlx::query_as(
                r#"
                SELECT c.id, c.full_name, c.availability, r.id, r.title, r.client_name
                FROM candidates c
                LEFT JOIN LATERAL (
                    SELECT q.id, q.title, q.client_name
                    FROM referrals f
                    JOIN requisitions q ON q.id = f.requisition_id
                    WHERE f.candidate_id = c.id AND f.status IN ('SELECTED', 'RESERVED')
                    ORDER BY f.updated_at DESC
                    LIMIT 1
                ) r ON TRUE
                WHERE c.availability IN ('ON_PROJECT', 'RESERVED')
                ORDER BY c.full_name
                "#,
            )
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter()
            .map(
                |(candidate_id, full_name, availability, requisition_id, title, client_name)|
                 -> Result<EngagedCandidate, StoreError> {
                    Ok(EngagedCandidate {
                        candidate_id,
                        full_name,
                        availability: availability.parse::<Availability>()?,
                        requisition_id,
                        requisition_title: title,
                        client_name,
                    })
                },
            )
            .collect()
    }

    async fn insert_referral(&self, new: NewReferral) -> Result<InsertOutcome, StoreError> {
        // The EXISTS guard drops writes for requisitions deleted or closed mid-run.
        let sql = format!(
            "INSERT INTO referrals \
                (id, requisition_id, candidate_id, match_score, justification, matching_skills) \
             SELECT $1, $2, $3, $4, $5, $6 \
             WHERE EXISTS (SELECT 1 FROM requisitions WHERE id = $2 AND status = 'OPEN') \
             ON CONFLICT (requisition_id, candidate_id) DO NOTHING \
             RETURNING {REFERRAL_COLUMNS}"
        );
        let inserted = sqlx::query_as::<_, ReferralRow>(&sql)
            .bind(Uuid::new_v4())
            .bind(new.requisition_id)
            .bind(new.candidate_id)
            .bind(new.match_score)
            .bind(&new.justification)
            .bind(&new.matching_skills)
            .fetch_optional(&self.pool)
            .await?;

        if let Some(row) = inserted {
            return Ok(InsertOutcome::Created(decode(row)?));
        }

        let open: Option<bool> =
            sqlx::query_scalar("SELECT status = 'OPEN' FROM requisitions WHERE id = $1")
                .bind(new.requisition_id)
                .fetch_optional(&self.pool)
                .await?;

        debug!(
            "Referral insert for requisition {} candidate {} affected no rows (open: {:?})",
            new.requisition_id, new.candidate_id, open
        );

        Ok(match open {
            Some(true) => InsertOutcome::Duplicate,
            _ => InsertOutcome::RequisitionUnavailable,
        })
    }

    async fn referrals_for_requisition(
        &self,
        requisition_id: Uuid,
    ) -> Result<Vec<Referral>, StoreError> {
        let sql = format!(
            "SELECT {REFERRAL_COLUMNS} FROM referrals \
             WHERE requisition_id = $1 ORDER BY match_score DESC, created_at ASC"
        );
        sqlx::query_as::<_, ReferralRow>(&sql)
            .bind(requisition_id)
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(decode)
            .collect()
    }

    async fn find_referral(&self, id: Uuid) -> Result<Option<Referral>, StoreError> {
        let sql = format!("SELECT {REFERRAL_COLUMNS} FROM referrals WHERE id = $1");
        sqlx::query_as::<_, ReferralRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(decode)
            .transpose()
    }

    async fn apply_transition(
        &self,
        referral_id: Uuid,
        rule: &TransitionRule,
    ) -> Result<DecisionApplied, DecisionError> {
        let mut tx = self.pool.begin().await.map_err(StoreError::from)?;

        let sql = format!("SELECT {REFERRAL_COLUMNS} FROM referrals WHERE id = $1 FOR UPDATE");
        let row = sqlx::query_as::<_, ReferralRow>(&sql)
            .bind(referral_id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(StoreError::from)?
            .ok_or(DecisionError::ReferralNotFound(referral_id))?;
        let referral: Referral = decode(row)?;

        let availability: String =
            sqlx::query_scalar("SELECT availability FROM candidates WHERE id = $1 FOR UPDATE")
                .bind(referral.candidate_id)
                .fetch_one(&mut *tx)
                .await
                .map_err(StoreError::from)?;
        let candidate_availability = availability
            .parse::<Availability>()
            .map_err(StoreError::from)?;

        let other_active_referral: Option<Uuid> = sqlx::query_scalar(
            "SELECT id FROM referrals \
             WHERE candidate_id = $1 AND id <> $2 AND status IN ('SELECTED', 'RESERVED') \
             LIMIT 1",
        )
        .bind(referral.candidate_id)
        .bind(referral.id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(StoreError::from)?;

        let plan = rule(&TransitionContext {
            referral: &referral,
            candidate_availability,
            other_active_referral,
        })?;

        let sql = format!(
            "UPDATE referrals SET status = $2, updated_at = NOW() WHERE id = $1 \
             RETURNING {REFERRAL_COLUMNS}"
        );
        let updated = sqlx::query_as::<_, ReferralRow>(&sql)
            .bind(referral.id)
            .bind(plan.status.as_str())
            .fetch_one(&mut *tx)
            .await
            .map_err(StoreError::from)?;

        if let Some(availability) = plan.availability {
            sqlx::query(
                r#"
                UPDATE candidates
                SET availability = $2,
                    expected_availability_date = CASE WHEN $2 = 'ON_PROJECT'
                        THEN expected_availability_date ELSE NULL END,
                    updated_at = NOW()
                WHERE id = $1
                "#,
            )
            .bind(referral.candidate_id)
            .bind(availability.as_str())
            .execute(&mut *tx)
            .await
            .map_err(StoreError::from)?;
        }

        tx.commit().await.map_err(StoreError::from)?;

        Ok(DecisionApplied {
            referral: decode(updated)?,
            previous_status: referral.status,
            availability: plan.availability,
        })
    }
}

/// Swaps the candidate's skill links inside `tx`, creating vocabulary entries
/// that do not exist yet. Returns the canonical stored names.
async fn write_skills(
    tx: &mut Transaction<'_, Postgres>,
    candidate_id: Uuid,
    skills: &[String],
) -> Result<Vec<String>, StoreError> {
    let mut stored = Vec::with_capacity(skills.len());

    sqlx::query("DELETE FROM candidate_skills WHERE candidate_id = $1")
        .bind(candidate_id)
        .execute(&mut **tx)
        .await?;

    for name in skills {
        sqlx::query("INSERT INTO skills (id, name) VALUES ($1, $2) ON CONFLICT ((lower(name))) DO NOTHING")
            .bind(Uuid::new_v4())
            .bind(name)
            .execute(&mut **tx)
            .await?;

        let (skill_id, canonical): (Uuid, String) =
            sqlx::query_as("SELECT id, name FROM skills WHERE lower(name) = lower($1)")
                .bind(name)
                .fetch_one(&mut **tx)
                .await?;

        sqlx::query(
            "INSERT INTO candidate_skills (candidate_id, skill_id) VALUES ($1, $2) \
             ON CONFLICT DO NOTHING",
        )
        .bind(candidate_id)
        .bind(skill_id)
        .execute(&mut **tx)
        .await?;

        stored.push(canonical);
    }

    Ok(stored)
}
