//! Database integration tests.
//!
//! These tests require a running `PostgreSQL` instance.
//! Run with: `cargo test --test db_integration -- --ignored`
//!
//! Environment variables:
//!   `TEST_DB_HOST` (default: localhost)
//!   `TEST_DB_PORT` (default: 5433)
//!   `TEST_DB_USER` (default: `formkit_test`)
//!   `TEST_DB_PASSWORD` (default: `formkit_test`)
//!   `TEST_DB_NAME` (default: `formkit_test`)
//!
//! Every test truncates the shared schema on connect, so each `Fixture`
//! holds `DB_LOCK` for its lifetime and the tests run one at a time.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use chrono::Utc;
use formkit_common::AppError;
use formkit_db::{
    entities::{question, question::QuestionType},
    repositories::{FormRepository, OrderUpdate, QuestionRepository},
    test_utils::{TestDatabase, TestDbConfig},
};
use sea_orm::Set;
use tokio::sync::{Mutex, MutexGuard};
use uuid::Uuid;

static DB_LOCK: Mutex<()> = Mutex::const_new(());

struct Fixture {
    db: TestDatabase,
    forms: FormRepository,
    questions: QuestionRepository,
    _serial: MutexGuard<'static, ()>,
}

async fn setup() -> Fixture {
    let serial = DB_LOCK.lock().await;
    let db = TestDatabase::connect().await.expect("Failed to connect");
    Fixture {
        forms: FormRepository::new(db.connection()),
        questions: QuestionRepository::new(db.connection()),
        db,
        _serial: serial,
    }
}

async fn append_question(fx: &Fixture, form_id: &str, text: &str) -> question::Model {
    let now = Utc::now().into();
    let order = fx.questions.next_order(form_id).await.unwrap();
    fx.questions
        .create(question::ActiveModel {
            id: Set(Uuid::new_v4().to_string()),
            form_id: Set(form_id.to_string()),
            text: Set(text.to_string()),
            question_type: Set(QuestionType::Text),
            order: Set(order),
            required: Set(false),
            options: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        })
        .await
        .unwrap()
}

#[tokio::test]
#[ignore = "requires running PostgreSQL instance"]
async fn test_duplicate_email_is_conflict() {
    let fx = setup().await;

    fx.db.seed_user("dup@example.com").await.unwrap();
    let err = fx.db.seed_user("dup@example.com").await.unwrap_err();

    assert!(matches!(err, AppError::Conflict(_)), "got {err:?}");
}

#[tokio::test]
#[ignore = "requires running PostgreSQL instance"]
async fn test_orders_are_contiguous_and_survive_deletion() {
    let fx = setup().await;
    let owner = fx.db.seed_user("order@example.com").await.unwrap();
    let form = fx.db.seed_form(&owner.id).await.unwrap();

    let q0 = append_question(&fx, &form.id, "A").await;
    let q1 = append_question(&fx, &form.id, "B").await;
    let q2 = append_question(&fx, &form.id, "C").await;
    assert_eq!((q0.order, q1.order, q2.order), (0, 1, 2));

    fx.questions.delete(&q1.id).await.unwrap();
    let remaining = fx.questions.find_by_form_id(&form.id).await.unwrap();
    let orders: Vec<i32> = remaining.iter().map(|q| q.order).collect();
    assert_eq!(orders, vec![0, 2]);

    let q3 = append_question(&fx, &form.id, "D").await;
    assert_eq!(q3.order, 3);
}

#[tokio::test]
#[ignore = "requires running PostgreSQL instance"]
async fn test_failed_reorder_rolls_back() {
    let fx = setup().await;
    let owner = fx.db.seed_user("rollback@example.com").await.unwrap();
    let form = fx.db.seed_form(&owner.id).await.unwrap();
    let q0 = append_question(&fx, &form.id, "A").await;
    let q1 = append_question(&fx, &form.id, "B").await;

    let updates = vec![
        OrderUpdate { id: q1.id.clone(), order: 0 },
        OrderUpdate { id: Uuid::new_v4().to_string(), order: 1 },
    ];
    assert!(fx.questions.update_orders(&form.id, &updates).await.is_err());

    let after = fx.questions.find_by_form_id(&form.id).await.unwrap();
    let ids: Vec<&str> = after.iter().map(|q| q.id.as_str()).collect();
    assert_eq!(ids, vec![q0.id.as_str(), q1.id.as_str()]);
    assert_eq!(after[1].order, 1);
}

#[tokio::test]
#[ignore = "requires running PostgreSQL instance"]
async fn test_deleting_form_cascades_to_questions() {
    let fx = setup().await;
    let owner = fx.db.seed_user("cascade@example.com").await.unwrap();
    let form = fx.db.seed_form(&owner.id).await.unwrap();
    let question = append_question(&fx, &form.id, "A").await;

    fx.forms.delete(&form.id).await.unwrap();

    assert!(fx.questions.find_by_id(&question.id).await.unwrap().is_none());
}

#[tokio::test]
#[ignore = "requires running PostgreSQL instance"]
async fn test_second_fixture_waits_for_first() {
    let fx = setup().await;
    let owner = fx.db.seed_user("serial@example.com").await.unwrap();
    let form = fx.db.seed_form(&owner.id).await.unwrap();
    append_question(&fx, &form.id, "A").await;

    let waiter = tokio::spawn(async { drop(setup().await) });
    tokio::time::sleep(std::time::Duration::from_millis(100)).await;

    assert!(!waiter.is_finished());
    assert_eq!(fx.questions.find_by_form_id(&form.id).await.unwrap().len(), 1);

    drop(fx);
    waiter.await.unwrap();
}

#[test]
fn test_config_from_env() {
    let config = TestDbConfig::default();
    assert!(!config.host.is_empty());
    assert!(config.port > 0);
    assert!(!config.username.is_empty());
    assert!(!config.database.is_empty());
}
