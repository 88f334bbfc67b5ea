//! PostgreSQL 仓储测试
//!
//! 需要 `DATABASE_URL`，运行：`cargo test -p client-otp -- --ignored`

use std::sync::Arc;

use chrono::{Duration, Utc};
use client_otp::domain::repositories::{ClientDirectory, OtpRecordRepository};
use client_otp::domain::{Cedula, OtpCode, OtpRecord};
use client_otp::infrastructure::persistence::{
    PostgresClientDirectory, PostgresOtpRecordRepository, run_migrations,
};
use sqlx::PgPool;
use taller_common::ClientId;
use uuid::Uuid;

async fn seed_client(pool: &PgPool, cedula: &str) -> ClientId {
    run_migrations(pool).await.unwrap();

    let id = Uuid::now_v7();
    sqlx::query("INSERT INTO clients (id, cedula, name, email) VALUES ($1, $2, $3, $4)")
        .bind(id)
        .bind(cedula)
        .bind("Luis Andrade")
        .bind("luis@example.com")
        .execute(pool)
        .await
        .unwrap();

    ClientId::from_uuid(id)
}

#[sqlx::test(migrations = false)]
#[ignore]
async fn test_find_client_by_cedula(pool: PgPool) {
    let client_id = seed_client(&pool, "0102030405").await;
    let directory = PostgresClientDirectory::new(pool);

    let found = directory
        .find_by_cedula(&Cedula::parse("0102030405").unwrap())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(found.id, client_id);
    assert_eq!(found.email, "luis@example.com");

    let missing = directory
        .find_by_cedula(&Cedula::parse("9999999999").unwrap())
        .await
        .unwrap();
    assert!(missing.is_none());
}

#[sqlx::test(migrations = false)]
#[ignore]
async fn test_find_client_with_lowercase_cedula(pool: PgPool) {
    let client_id = seed_client(&pool, "ab-123").await;
    let directory = PostgresClientDirectory::new(pool);

    let found = directory
        .find_by_cedula(&Cedula::parse(" ab-123 ").unwrap())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(found.id, client_id);
    assert_eq!(found.cedula.as_str(), "ab-123");
}

#[sqlx::test(migrations = false)]
#[ignore]
async fn test_record_lifecycle(pool: PgPool) {
    let client_id = seed_client(&pool, "0102030405").await;
    let repo = PostgresOtpRecordRepository::new(pool);
    let t0 = Utc::now();

    let older = OtpRecord::issue(client_id, OtpCode::from_stored("111111"), t0);
    let newer = OtpRecord::issue(
        client_id,
        OtpCode::from_stored("222222"),
        t0 + Duration::minutes(1),
    );
    repo.insert(&older).await.unwrap();
    repo.insert(&newer).await.unwrap();

    let latest = repo.find_latest_by_client(&client_id).await.unwrap().unwrap();
    assert_eq!(latest.id, newer.id);
    assert!(!latest.valid);

    let by_code = repo
        .find_unconsumed_by_code(&client_id, "111111")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(by_code.id, older.id);

    let consumed_at = t0 + Duration::minutes(2);
    assert!(repo.mark_consumed(&newer.id, consumed_at, 5).await.unwrap());
    assert!(!repo.mark_consumed(&newer.id, consumed_at, 5).await.unwrap());

    let consumed = repo.find_latest_by_client(&client_id).await.unwrap().unwrap();
    assert!(consumed.valid);
    assert!(consumed.consumed_at.is_some());

    assert_eq!(repo.delete_stale(t0 + Duration::seconds(30)).await.unwrap(), 1);
}

#[sqlx::test(migrations = false)]
#[ignore]
async fn test_concurrent_mark_consumed(pool: PgPool) {
    let client_id = seed_client(&pool, "0102030405").await;
    let repo = Arc::new(PostgresOtpRecordRepository::new(pool));

    let record = OtpRecord::issue(client_id, OtpCode::from_stored("333333"), Utc::now());
    repo.insert(&record).await.unwrap();

    let attempts = (0..8).map(|_| {
        let repo = repo.clone();
        let id = record.id;
        tokio::spawn(async move { repo.mark_consumed(&id, Utc::now(), 0).await.unwrap() })
    });

    let winners = futures::future::join_all(attempts)
        .await
        .into_iter()
        .filter(|joined| matches!(joined, Ok(true)))
        .count();
    assert_eq!(winners, 1);
}

#[sqlx::test(migrations = false)]
#[ignore]
async fn test_migrations_are_idempotent(pool: PgPool) {
    let first = run_migrations(&pool).await.unwrap();
    let second = run_migrations(&pool).await.unwrap();
    assert_eq!(first, 3);
    assert_eq!(second, 0);
}

#[sqlx::test(migrations = false)]
#[ignore]
async fn test_insert_within_cap_is_atomic(pool: PgPool) {
    let client_id = seed_client(&pool, "0102030405").await;
    let repo = Arc::new(PostgresOtpRecordRepository::new(pool.clone()));
    let now = Utc::now();
    let since = now - Duration::hours(24);

    let attempts = (0..16).map(|_| {
        let repo = repo.clone();
        tokio::spawn(async move {
            let record = OtpRecord::issue(client_id, OtpCode::generate(6), now);
            repo.insert_within_cap(&record, since, 1).await.unwrap()
        })
    });

    let inserted = futures::future::join_all(attempts)
        .await
        .into_iter()
        .filter(|joined| matches!(joined, Ok(true)))
        .count();
    assert_eq!(inserted, 1);

    let stored: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM otp_validaciones")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(stored, 1);
}

#[sqlx::test(migrations = false)]
#[ignore]
async fn test_failed_attempts_block_consume(pool: PgPool) {
    let client_id = seed_client(&pool, "0102030405").await;
    let repo = PostgresOtpRecordRepository::new(pool);

    let record = OtpRecord::issue(client_id, OtpCode::from_stored("444444"), Utc::now());
    repo.insert(&record).await.unwrap();

    repo.record_failed_attempt(&record.id).await.unwrap();
    repo.record_failed_attempt(&record.id).await.unwrap();

    let stored = repo.find_latest_by_client(&client_id).await.unwrap().unwrap();
    assert_eq!(stored.failed_attempts, 2);

    assert!(!repo.mark_consumed(&record.id, Utc::now(), 2).await.unwrap());
    assert!(repo.mark_consumed(&record.id, Utc::now(), 3).await.unwrap());
}
