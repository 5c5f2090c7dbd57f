//! Fire-and-forget notification rows written alongside the mutation that
//! triggered them.

use crate::ApiError;

pub struct NotificationService;

impl NotificationService {
    pub async fn create_notification(
        pool: &sqlx::Pool<sqlx::Sqlite>,
        user_id: i64,
        notification_type: &str,
        title: &str,
        body: &str,
    ) -> Result<i64, ApiError> {
        let now = chrono::Utc::now().to_rfc3339();

        let result = sqlx::query(
            r#"
            INSERT INTO notifications (user_id, type, title, body, read, created_at)
            VALUES (?, ?, ?, ?, FALSE, ?)
            "#,
        )
        .bind(user_id)
        .bind(notification_type)
        .bind(title)
        .bind(body)
        .bind(&now)
        .execute(pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to create notification: {}", e);
            ApiError::internal_server_error("Failed to create notification")
        })?;

        Ok(result.last_insert_rowid())
    }

    pub async fn notify_claim_filed(
        pool: &sqlx::Pool<sqlx::Sqlite>,
        owner_user_id: i64,
        claimant_name: &str,
        item_title: &str,
    ) -> Result<(), ApiError> {
        let title = format!("New claim on {}", item_title);
        let body = format!("{} filed an ownership claim", claimant_name);

        Self::create_notification(pool, owner_user_id, "claim_filed", &title, &body).await?;

        Ok(())
    }

    pub async fn notify_claim_decision(
        pool: &sqlx::Pool<sqlx::Sqlite>,
        claimant_user_id: i64,
        item_title: &str,
        decision: &str,
    ) -> Result<(), ApiError> {
        let title = format!("Claim {} for {}", decision, item_title);
        let body = format!("Your claim on {} was {}", item_title, decision);

        Self::create_notification(pool, claimant_user_id, "claim_decision", &title, &body).await?;

        Ok(())
    }

    pub async fn notify_claim_completed(
        pool: &sqlx::Pool<sqlx::Sqlite>,
        claimant_user_id: i64,
        item_title: &str,
        handover_location: &str,
    ) -> Result<(), ApiError> {
        let title = format!("Handover arranged for {}", item_title);
        let body = format!("Pickup at {}", handover_location);

        Self::create_notification(pool, claimant_user_id, "claim_completed", &title, &body).await?;

        Ok(())
    }

    pub async fn notify_new_message(
        pool: &sqlx::Pool<sqlx::Sqlite>,
        recipient_user_id: i64,
        sender_name: &str,
        item_title: &str,
    ) -> Result<(), ApiError> {
        let title = format!("New message about {}", item_title);
        let body = format!("{} sent a message", sender_name);

        Self::create_notification(pool, recipient_user_id, "new_message", &title, &body).await?;

        Ok(())
    }

    pub async fn notify_verification_decision(
        pool: &sqlx::Pool<sqlx::Sqlite>,
        submitter_user_id: i64,
        org_name: &str,
        decision: &str,
    ) -> Result<(), ApiError> {
        let title = format!("Verification {} for {}", decision, org_name);
        let body = format!("The verification application for {} was {}", org_name, decision);

        Self::create_notification(pool, submitter_user_id, "verification_decision", &title, &body)
            .await?;

        Ok(())
    }

    pub async fn notify_member_added(
        pool: &sqlx::Pool<sqlx::Sqlite>,
        member_user_id: i64,
        org_name: &str,
        role: &str,
    ) -> Result<(), ApiError> {
        let title = format!("Added to {}", org_name);
        let body = format!("You were added to {} as {}", org_name, role);

        Self::create_notification(pool, member_user_id, "member_added", &title, &body).await?;

        Ok(())
    }
}
