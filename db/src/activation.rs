use chrono::{NaiveDateTime, Utc};
use common::error::{AppError, Res};
use sqlx::{Executor, Sqlite, SqlitePool};

use crate::{
    dtos::activation::{ActivationCreateRequest, CredentialsUpdate},
    models::activation::{ActivationRequest, ReminderCandidate, Statistics},
};

pub async fn insert_activation<'e, E: Executor<'e, Database = Sqlite>>(
    executor: E,
    data: ActivationCreateRequest,
) -> Res<ActivationRequest> {
    sqlx::query_as::<_, ActivationRequest>(
        r#"
        INSERT INTO activations (user_id, phone, name, username, created_at)
        VALUES (?, ?, ?, ?, ?)
        RETURNING *
        "#,
    )
    .bind(data.user_id)
    .bind(data.phone)
    .bind(data.name)
    .bind(data.username)
    .bind(Utc::now().naive_utc())
    .fetch_one(executor)
    .await
    .map_err(AppError::from)
}

pub async fn get_activation_by_id<'e, E: Executor<'e, Database = Sqlite>>(
    executor: E,
    activation_id: i64,
) -> Res<Option<ActivationRequest>> {
    sqlx::query_as::<_, ActivationRequest>("SELECT * FROM activations WHERE id = ?")
        .bind(activation_id)
        .fetch_optional(executor)
        .await
        .map_err(AppError::from)
}

/// All activations, newest first.
pub async fn get_all_activations<'e, E: Executor<'e, Database = Sqlite>>(
    executor: E,
) -> Res<Vec<ActivationRequest>> {
    sqlx::query_as::<_, ActivationRequest>(
        "SELECT * FROM activations ORDER BY created_at DESC, id DESC",
    )
    .fetch_all(executor)
    .await
    .map_err(AppError::from)
}

/// Activations staff have not marked as serviced yet, newest first.
pub async fn get_pending_activations<'e, E: Executor<'e, Database = Sqlite>>(
    executor: E,
) -> Res<Vec<ActivationRequest>> {
    sqlx::query_as::<_, ActivationRequest>(
        "SELECT * FROM activations WHERE service_provided = 0 ORDER BY created_at DESC, id DESC",
    )
    .fetch_all(executor)
    .await
    .map_err(AppError::from)
}

/// Serviced activations, most recently serviced first.
pub async fn get_processed_activations<'e, E: Executor<'e, Database = Sqlite>>(
    executor: E,
) -> Res<Vec<ActivationRequest>> {
    sqlx::query_as::<_, ActivationRequest>(
        r#"
        SELECT * FROM activations
        WHERE service_provided = 1
        ORDER BY service_provided_at DESC, id DESC
        "#,
    )
    .fetch_all(executor)
    .await
    .map_err(AppError::from)
}

// Field captures below are keyed by the activation the session created,
// so a user with several requests only ever touches the one in progress.

pub async fn set_serial_number<'e, E: Executor<'e, Database = Sqlite>>(
    executor: E,
    activation_id: i64,
    serial_number: &str,
) -> Res<bool> {
    update_text_field(executor, "serial_number", activation_id, serial_number).await
}

pub async fn set_serial_photo<'e, E: Executor<'e, Database = Sqlite>>(
    executor: E,
    activation_id: i64,
    file_ref: &str,
) -> Res<bool> {
    update_text_field(executor, "serial_photo_file_id", activation_id, file_ref).await
}

pub async fn set_box_serial_number<'e, E: Executor<'e, Database = Sqlite>>(
    executor: E,
    activation_id: i64,
    box_serial_number: &str,
) -> Res<bool> {
    update_text_field(executor, "box_serial_number", activation_id, box_serial_number).await
}

pub async fn set_box_serial_photo<'e, E: Executor<'e, Database = Sqlite>>(
    executor: E,
    activation_id: i64,
    file_ref: &str,
) -> Res<bool> {
    update_text_field(executor, "box_serial_photo_file_id", activation_id, file_ref).await
}

async fn update_text_field<'e, E: Executor<'e, Database = Sqlite>>(
    executor: E,
    column: &'static str,
    activation_id: i64,
    value: &str,
) -> Res<bool> {
    let sql = format!("UPDATE activations SET {column} = ? WHERE id = ?");
    let result = sqlx::query(&sql)
        .bind(value)
        .bind(activation_id)
        .execute(executor)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Records a successful payment against the user's most recent pending
/// activation. Payment flag, reference and status change in one statement;
/// an activation that is no longer pending is never matched, so a repeated
/// payment event is a no-op. Returns the confirmed activation id.
pub async fn confirm_payment<'e, E: Executor<'e, Database = Sqlite>>(
    executor: E,
    user_id: i64,
    charge_ref: &str,
) -> Res<Option<i64>> {
    sqlx::query_scalar::<_, i64>(
        r#"
        UPDATE activations
        SET payment_received = 1, receipt_file_id = ?, status = 'payment_confirmed'
        WHERE id = (
            SELECT id FROM activations
            WHERE user_id = ? AND status = 'pending'
            ORDER BY id DESC
            LIMIT 1
        )
        AND status = 'pending'
        RETURNING id
        "#,
    )
    .bind(charge_ref)
    .bind(user_id)
    .fetch_optional(executor)
    .await
    .map_err(AppError::from)
}

/// Stores the kit number on the user's most recent paid activation and
/// completes it. Returns the completed activation id.
pub async fn complete_with_kit<'e, E: Executor<'e, Database = Sqlite>>(
    executor: E,
    user_id: i64,
    kit_number: &str,
) -> Res<Option<i64>> {
    sqlx::query_scalar::<_, i64>(
        r#"
        UPDATE activations
        SET kit_number = ?, status = 'completed'
        WHERE id = (
            SELECT id FROM activations
            WHERE user_id = ? AND status = 'payment_confirmed'
            ORDER BY id DESC
            LIMIT 1
        )
        AND status = 'payment_confirmed'
        RETURNING id
        "#,
    )
    .bind(kit_number)
    .bind(user_id)
    .fetch_optional(executor)
    .await
    .map_err(AppError::from)
}

/// Starts the subscription window. Re-marking restarts it and re-arms reminders.
pub async fn mark_service_provided<'e, E: Executor<'e, Database = Sqlite>>(
    executor: E,
    activation_id: i64,
    now: NaiveDateTime,
) -> Res<bool> {
    let result = sqlx::query(
        r#"
        UPDATE activations
        SET service_provided = 1, service_provided_at = ?, last_reminder_day = NULL
        WHERE id = ?
        "#,
    )
    .bind(now)
    .bind(activation_id)
    .execute(executor)
    .await?;
    Ok(result.rows_affected() > 0)
}

/// Flips the serviced mark. Unmarking drops the subscription window entirely.
pub async fn toggle_service_provided<'e, E: Executor<'e, Database = Sqlite>>(
    executor: E,
    activation_id: i64,
    now: NaiveDateTime,
) -> Res<bool> {
    let result = sqlx::query(
        r#"
        UPDATE activations
        SET service_provided = 1 - service_provided,
            service_provided_at = CASE WHEN service_provided = 1 THEN NULL ELSE ? END,
            last_reminder_day = NULL
        WHERE id = ?
        "#,
    )
    .bind(now)
    .bind(activation_id)
    .execute(executor)
    .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn update_credentials<'e, E: Executor<'e, Database = Sqlite>>(
    executor: E,
    activation_id: i64,
    data: CredentialsUpdate,
) -> Res<bool> {
    let result = sqlx::query("UPDATE activations SET email = ?, password = ? WHERE id = ?")
        .bind(data.email)
        .bind(data.password)
        .bind(activation_id)
        .execute(executor)
        .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn delete_activation<'e, E: Executor<'e, Database = Sqlite>>(
    executor: E,
    activation_id: i64,
) -> Res<bool> {
    let result = sqlx::query("DELETE FROM activations WHERE id = ?")
        .bind(activation_id)
        .execute(executor)
        .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn get_reminder_candidates<'e, E: Executor<'e, Database = Sqlite>>(
    executor: E,
) -> Res<Vec<ReminderCandidate>> {
    sqlx::query_as::<_, ReminderCandidate>(
        r#"
        SELECT id, user_id, name, service_provided_at, last_reminder_day
        FROM activations
        WHERE service_provided = 1 AND service_provided_at IS NOT NULL
        "#,
    )
    .fetch_all(executor)
    .await
    .map_err(AppError::from)
}

pub async fn set_last_reminder_day<'e, E: Executor<'e, Database = Sqlite>>(
    executor: E,
    activation_id: i64,
    days_left: i64,
) -> Res<()> {
    sqlx::query("UPDATE activations SET last_reminder_day = ? WHERE id = ?")
        .bind(days_left)
        .bind(activation_id)
        .execute(executor)
        .await?;
    Ok(())
}

pub async fn get_statistics(pool: &SqlitePool) -> Res<Statistics> {
    let total_purchases = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM purchases")
        .fetch_one(pool)
        .await?;

    let (total_activations, pending_activations, payment_confirmed, completed_activations) =
        sqlx::query_as::<_, (i64, i64, i64, i64)>(
            r#"
            SELECT
                COUNT(*),
                COALESCE(SUM(status = 'pending'), 0),
                COALESCE(SUM(status = 'payment_confirmed'), 0),
                COALESCE(SUM(status = 'completed'), 0)
            FROM activations
            "#,
        )
        .fetch_one(pool)
        .await?;

    Ok(Statistics {
        total_purchases,
        total_activations,
        pending_activations,
        payment_confirmed,
        completed_activations,
    })
}
