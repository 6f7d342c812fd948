//! Concurrent resolution against PostgreSQL, where advisory locks are the only
//! thing keeping racing merges apart. Ignored by default.
//!
//! Run with: `DATABASE_URL=postgres://... cargo test --test postgres_resolution -- --ignored`

use std::sync::Arc;

use futures::future::join_all;
use identity_repository::{ContactRepository, PostgresContactRepository};
use identity_resolver::IdentityResolver;
use identity_shared::NewContact;

#[sqlx::test(migrations = "../identity-repository/src/postgres/migrations")]
#[ignore = "requires DATABASE_URL"]
async fn test_racing_bridges_leave_one_primary(pool: sqlx::PgPool) {
    let repository = PostgresContactRepository::new(pool.clone());

    let mut tx = repository.begin().await.unwrap();
    let older = tx
        .create(NewContact::primary(Some("a@x.io".to_string()), Some("1".to_string())))
        .await
        .unwrap();
    let newer = tx
        .create(NewContact::primary(Some("b@x.io".to_string()), Some("2".to_string())))
        .await
        .unwrap();
    tx.commit().await.unwrap();

    let resolver = Arc::new(IdentityResolver::new(Arc::new(repository)));
    let tasks = (0..6).map(|i| {
        let resolver = Arc::clone(&resolver);
        tokio::spawn(async move {
            if i % 2 == 0 {
                resolver.resolve_identity(Some("a@x.io"), Some("2")).await
            } else {
                resolver.resolve_identity(Some("b@x.io"), Some("1")).await
            }
        })
    });

    for joined in join_all(tasks).await {
        let view = joined.unwrap().unwrap();
        assert_eq!(view.primary_contact_id, older.id);
        assert_eq!(view.secondary_contact_ids, vec![newer.id]);
    }

    let primaries: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM contact WHERE link_precedence = 'primary' AND deleted_at IS NULL",
    )
    .fetch_one(&pool)
    .await
    .unwrap();
    let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM contact")
        .fetch_one(&pool)
        .await
        .unwrap();

    assert_eq!(primaries, 1);
    assert_eq!(total, 2);
}
