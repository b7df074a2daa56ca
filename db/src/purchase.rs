use chrono::Utc;
use common::error::{AppError, Res};
use sqlx::{Executor, Sqlite};

use crate::{dtos::purchase::PurchaseCreateRequest, models::purchase::PurchaseRequest};

pub async fn insert_purchase<'e, E: Executor<'e, Database = Sqlite>>(
    executor: E,
    data: PurchaseCreateRequest,
) -> Res<PurchaseRequest> {
    sqlx::query_as::<_, PurchaseRequest>(
        r#"
        INSERT INTO purchases (user_id, phone, name, username, created_at)
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

pub async fn get_purchase_by_id<'e, E: Executor<'e, Database = Sqlite>>(
    executor: E,
    purchase_id: i64,
) -> Res<Option<PurchaseRequest>> {
    sqlx::query_as::<_, PurchaseRequest>("SELECT * FROM purchases WHERE id = ?")
        .bind(purchase_id)
        .fetch_optional(executor)
        .await
        .map_err(AppError::from)
}

/// All purchases, newest first.
pub async fn get_all_purchases<'e, E: Executor<'e, Database = Sqlite>>(
    executor: E,
) -> Res<Vec<PurchaseRequest>> {
    sqlx::query_as::<_, PurchaseRequest>(
        "SELECT * FROM purchases ORDER BY created_at DESC, id DESC",
    )
    .fetch_all(executor)
    .await
    .map_err(AppError::from)
}

pub async fn delete_purchase<'e, E: Executor<'e, Database = Sqlite>>(
    executor: E,
    purchase_id: i64,
) -> Res<bool> {
    let result = sqlx::query("DELETE FROM purchases WHERE id = ?")
        .bind(purchase_id)
        .execute(executor)
        .await?;
    Ok(result.rows_affected() > 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(user_id: i64, name: &str) -> PurchaseCreateRequest {
        PurchaseCreateRequest {
            user_id,
            phone: "+79991234567".into(),
            name: name.into(),
            username: Some("ivan".into()),
        }
    }

    #[tokio::test]
    async fn insert_assigns_increasing_ids() {
        let pool = crate::setup_in_memory().await.unwrap();
        let first = insert_purchase(&*pool, request(1, "Иван")).await.unwrap();
        let second = insert_purchase(&*pool, request(2, "Пётр")).await.unwrap();

        assert!(second.id > first.id);
        assert_eq!(first.request_number(), format!("BUY-{:06}", first.id));
        assert_eq!(first.username.as_deref(), Some("ivan"));
    }

    #[tokio::test]
    async fn list_is_newest_first_and_delete_removes() {
        let pool = crate::setup_in_memory().await.unwrap();
        let first = insert_purchase(&*pool, request(1, "Иван")).await.unwrap();
        let second = insert_purchase(&*pool, request(2, "Пётр")).await.unwrap();

        let all = get_all_purchases(&*pool).await.unwrap();
        assert_eq!(all.iter().map(|p| p.id).collect::<Vec<_>>(), vec![second.id, first.id]);

        assert!(delete_purchase(&*pool, first.id).await.unwrap());
        assert!(!delete_purchase(&*pool, first.id).await.unwrap());
        assert!(get_purchase_by_id(&*pool, first.id).await.unwrap().is_none());
    }
}
