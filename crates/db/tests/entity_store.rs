//! Integration tests for the PostgreSQL-backed entity store.
//!
//! Each test runs against a fresh database provisioned by `sqlx::test` from
//! `DATABASE_URL`.

use std::sync::Arc;

use assert_matches::assert_matches;
use provision_core::error::{CoreError, StoreError};
use provision_core::import::{CommandContext, IdentityStore, ImportOutcome, ImportResolver, NaturalKey};
use provision_core::types::Payload;
use provision_core::validation::ReferenceStore;
use provision_db::repositories::{EntityRepo, EventRepo};
use serde_json::{json, Value};
use sqlx::PgPool;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn payload(value: Value) -> Payload {
    value.as_object().cloned().unwrap()
}

fn resolver(pool: &PgPool, kind: &str) -> ImportResolver {
    ImportResolver::new(
        Arc::new(EntityRepo::new(pool.clone(), kind)),
        NaturalKey::new(["name"]).unwrap(),
    )
}

fn ctx(command: &str) -> CommandContext {
    CommandContext::new(command, Payload::new())
}

// ---------------------------------------------------------------------------
// Store contract
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "./migrations")]
async fn duplicate_natural_key_reports_the_constraint(pool: PgPool) {
    let repo = EntityRepo::new(pool, "repo");
    let key = payload(json!({"name": "centos"}));

    let created = repo
        .create_if_absent(&key, &payload(json!({"name": "centos", "task": null})))
        .await
        .unwrap();
    assert!(!created.fields.contains_key("task"));

    let err = repo
        .create_if_absent(&key, &payload(json!({"name": "centos", "url": "http://x"})))
        .await
        .unwrap_err();
    assert_matches!(err, StoreError::UniqueViolation { ref constraint }
        if constraint == "uq_entities_kind_natural_key");

    let fetched = repo.fetch_by_natural_key(&key).await.unwrap().unwrap();
    assert_eq!(fetched.id, created.id);
    assert_eq!(repo.find_by_id(created.id).await.unwrap(), Some(fetched));
}

#[sqlx::test(migrations = "./migrations")]
async fn natural_keys_are_scoped_by_kind(pool: PgPool) {
    let repos = EntityRepo::new(pool.clone(), "repo");
    let tags = EntityRepo::new(pool, "tag");
    let key = payload(json!({"name": "small"}));

    repos.create_if_absent(&key, &key).await.unwrap();
    tags.create_if_absent(&key, &key).await.unwrap();

    assert_eq!(repos.list(10, 0).await.unwrap().len(), 1);
    assert_eq!(tags.list(10, 0).await.unwrap().len(), 1);
}

#[sqlx::test(migrations = "./migrations")]
async fn reference_lookup_matches_on_a_field(pool: PgPool) {
    let repo = EntityRepo::new(pool, "broker");
    repo.create_if_absent(
        &payload(json!({"name": "puppet"})),
        &payload(json!({"name": "puppet", "broker_type": "puppet"})),
    )
    .await
    .unwrap();

    assert!(repo.lookup("name", &json!("puppet")).await.unwrap().is_some());
    assert!(repo.lookup("name", &json!("chef")).await.unwrap().is_none());
}

// ---------------------------------------------------------------------------
// Import engine against Postgres
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "./migrations")]
async fn import_creates_matches_and_conflicts(pool: PgPool) {
    let resolver = resolver(&pool, "repo");
    let data = payload(json!({"name": "centos", "url": "http://mirror"}));

    let first = resolver.import(&data, &ctx("create-repo")).await.unwrap();
    assert_eq!(first.outcome, ImportOutcome::Created);

    let second = resolver.import(&data, &ctx("create-repo")).await.unwrap();
    assert_eq!(second.outcome, ImportOutcome::Matched);
    assert_eq!(second.entity.id, first.entity.id);

    let err = resolver
        .import(
            &payload(json!({"name": "centos", "url": "http://other"})),
            &ctx("create-repo"),
        )
        .await
        .unwrap_err();
    assert_matches!(err, CoreError::Conflict(ref msg)
        if msg == "The repo name=centos already exists with different attributes: url");
}

#[sqlx::test(migrations = "./migrations")]
async fn concurrent_imports_create_exactly_one_row(pool: PgPool) {
    let resolver = Arc::new(resolver(&pool, "tag"));
    let data = payload(json!({"name": "small", "rule": ["<", ["fact", "memorysize"], 1]}));

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let resolver = Arc::clone(&resolver);
            let data = data.clone();
            tokio::spawn(async move { resolver.import(&data, &ctx("create-tag")).await })
        })
        .collect();

    let mut created = 0;
    for handle in handles {
        if handle.await.unwrap().unwrap().outcome == ImportOutcome::Created {
            created += 1;
        }
    }
    assert_eq!(created, 1);

    let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM entities WHERE kind = 'tag'")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(count.0, 1);
}

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "./migrations")]
async fn events_are_listed_per_entity(pool: PgPool) {
    let payload = json!({"name": "centos"});
    EventRepo::insert(&pool, "repo.created", Some("repo"), Some(1), Some("create-repo"), &payload)
        .await
        .unwrap();
    EventRepo::insert(&pool, "repo.matched", Some("repo"), Some(1), Some("create-repo"), &payload)
        .await
        .unwrap();
    EventRepo::insert(&pool, "repo.created", Some("repo"), Some(2), None, &payload)
        .await
        .unwrap();

    let events = EventRepo::list_for_entity(&pool, "repo", 1).await.unwrap();
    let types: Vec<_> = events.iter().map(|e| e.event_type.as_str()).collect();
    assert_eq!(types, vec!["repo.created", "repo.matched"]);

    let recent = EventRepo::list_recent(&pool, 1, 0).await.unwrap();
    assert_eq!(recent[0].entity_id, Some(2));
}

// ---------------------------------------------------------------------------
// Schema conventions
// ---------------------------------------------------------------------------

/// Every table must have created_at and updated_at as timestamptz.
#[sqlx::test(migrations = "./migrations")]
async fn all_tables_have_timestamps(pool: PgPool) {
    let tables: Vec<(String,)> = sqlx::query_as(
        "SELECT table_name
         FROM information_schema.tables
         WHERE table_schema = 'public'
           AND table_type = 'BASE TABLE'
           AND table_name != '_sqlx_migrations'",
    )
    .fetch_all(&pool)
    .await
    .unwrap();

    for (table,) in &tables {
        for col in ["created_at", "updated_at"] {
            let (data_type,): (String,) = sqlx::query_as(
                "SELECT data_type
                 FROM information_schema.columns
                 WHERE table_schema = 'public' AND table_name = $1 AND column_name = $2",
            )
            .bind(table)
            .bind(col)
            .fetch_one(&pool)
            .await
            .unwrap_or_else(|e| panic!("{table}.{col} lookup failed: {e}"));
            assert_eq!(data_type, "timestamp with time zone", "{table}.{col}");
        }
    }
}
