#![allow(dead_code)]

use sea_orm::{ConnectionTrait, Database, DatabaseConnection, Statement};

use engine::{Ad, AdCategory, AdCondition, AdDraft, Engine, NewUser};
use migration::MigratorTrait;

pub const PASSWORD: &str = "Secret123";

/// Engine over a migrated in-memory database with `alice`, `bob` and `carol`.
pub async fn engine_with_db() -> (Engine, DatabaseConnection) {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    let engine = Engine::builder()
        .database(db.clone())
        .build()
        .await
        .unwrap();
    for username in ["alice", "bob", "carol"] {
        engine
            .register(NewUser {
                username: username.to_string(),
                email: format!("{username}@example.com"),
                password: PASSWORD.to_string(),
                first_name: None,
                last_name: None,
            })
            .await
            .unwrap();
    }
    (engine, db)
}

pub fn draft(title: &str, category: AdCategory) -> AdDraft {
    AdDraft {
        title: title.to_string(),
        description: format!("{title} in good shape, pick up in town"),
        category,
        condition: AdCondition::Used,
        image_url: None,
    }
}

pub async fn ad(engine: &Engine, owner: &str, title: &str, category: AdCategory) -> Ad {
    engine.new_ad(owner, draft(title, category)).await.unwrap()
}

pub async fn count(db: &DatabaseConnection, table: &str) -> i64 {
    let row = db
        .query_one(Statement::from_string(
            db.get_database_backend(),
            format!("SELECT COUNT(*) AS n FROM {table}"),
        ))
        .await
        .unwrap()
        .unwrap();
    row.try_get("", "n").unwrap()
}

/// Make every statement matching `event` on `table` fail.
pub async fn fail_on(db: &DatabaseConnection, name: &str, event: &str, table: &str) {
    db.execute(Statement::from_string(
        db.get_database_backend(),
        format!(
            "CREATE TRIGGER {name} BEFORE {event} ON {table} \
             BEGIN SELECT RAISE(ABORT, 'injected failure'); END"
        ),
    ))
    .await
    .unwrap();
}

pub async fn exec(db: &DatabaseConnection, sql: &str) {
    db.execute(Statement::from_string(
        db.get_database_backend(),
        sql.to_string(),
    ))
    .await
    .unwrap();
}
