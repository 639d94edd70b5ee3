use anyhow::{Context, Result};
use entity::employees;
use migration::{Migrator, MigratorTrait};
use platform_db::{DatabaseSettings, DbPool, connect};
use products_hr::{EmployeeDraft, EmployeeRepository, RepoError, SeaOrmEmployeeRepository};
use sea_orm::EntityTrait;
use uuid::Uuid;

/// Fresh migrated database. Uses `TEST_DATABASE_URL` when set, otherwise an
/// in-memory SQLite database.
async fn migrated_pool() -> Result<DbPool> {
    let settings = match std::env::var("TEST_DATABASE_URL") {
        Ok(url) => DatabaseSettings::with_url(url),
        Err(_) => DatabaseSettings::with_url("sqlite::memory:").max_connections(1),
    };
    let pool = connect(&settings).await?;
    Migrator::up(&pool, None).await?;
    Ok(pool)
}

fn draft(username: &str) -> EmployeeDraft {
    EmployeeDraft {
        username: username.to_string(),
        first_name: "Ada".into(),
        last_name: "Lovelace".into(),
        email: Some(format!("{username}@example.test")),
        phone: None,
    }
}

fn unique_username(prefix: &str) -> String {
    format!("{prefix}-{}", Uuid::new_v4().simple())
}

#[tokio::test]
async fn created_employee_is_stored_with_a_hash_only() -> Result<()> {
    let pool = migrated_pool().await?;
    let repo = SeaOrmEmployeeRepository::new(pool.clone());
    let username = unique_username("ada");

    let created = repo.create(draft(&username), Some("p@ss")).await?;
    let row = employees::Entity::find_by_id(created.id)
        .one(&pool)
        .await?
        .context("row missing")?;

    assert_eq!(row.username, username);
    assert_ne!(row.password_hash, "p@ss");
    assert!(row.password_hash.starts_with("$argon2"));
    let fetched = repo.get(created.id).await?.context("employee missing")?;
    assert_eq!(fetched.username, created.username);
    assert_eq!(fetched.email, created.email);
    Ok(())
}

#[tokio::test]
async fn authenticate_matches_only_the_right_pair() -> Result<()> {
    let pool = migrated_pool().await?;
    let repo = SeaOrmEmployeeRepository::new(pool);
    let username = unique_username("grace");
    let created = repo.create(draft(&username), Some("p@ss")).await?;

    let found = repo.authenticate(&username, "p@ss").await?;
    assert_eq!(found.map(|e| e.id), Some(created.id));
    assert_eq!(repo.authenticate(&username, "nope").await?, None);
    assert_eq!(repo.authenticate("missing-user", "p@ss").await?, None);
    assert_eq!(repo.authenticate(&username, "   ").await?, None);
    Ok(())
}

#[tokio::test]
async fn create_rejects_missing_password_blank_username_and_duplicates() -> Result<()> {
    let pool = migrated_pool().await?;
    let repo = SeaOrmEmployeeRepository::new(pool);
    let username = unique_username("linus");
    repo.create(draft(&username), Some("p@ss")).await?;

    assert_eq!(
        repo.create(draft("someone"), None).await,
        Err(RepoError::Validation("Password is required".into()))
    );
    assert_eq!(
        repo.create(draft("someone"), Some("  ")).await,
        Err(RepoError::Validation("Password is required".into()))
    );
    assert_eq!(
        repo.create(draft(" "), Some("p@ss")).await,
        Err(RepoError::Validation("Username is required".into()))
    );
    assert_eq!(
        repo.create(draft(&username), Some("other")).await,
        Err(RepoError::Conflict(format!(
            "Username \"{username}\" is already taken"
        )))
    );
    Ok(())
}

#[tokio::test]
async fn update_keeps_blank_fields_and_rehashes_new_password() -> Result<()> {
    let pool = migrated_pool().await?;
    let repo = SeaOrmEmployeeRepository::new(pool);
    let username = unique_username("ken");
    let created = repo.create(draft(&username), Some("old")).await?;

    let changes = EmployeeDraft {
        first_name: "Kenneth".into(),
        ..EmployeeDraft::default()
    };
    let updated = repo.update(created.id, changes, Some("new")).await?;

    assert_eq!(updated.username, username);
    assert_eq!(updated.first_name, "Kenneth");
    assert_eq!(updated.last_name, "Lovelace");
    assert_eq!(updated.email, created.email);
    assert!(repo.authenticate(&username, "new").await?.is_some());
    assert!(repo.authenticate(&username, "old").await?.is_none());

    let untouched = repo.update(created.id, EmployeeDraft::default(), None).await?;
    assert!(repo.authenticate(&username, "new").await?.is_some());
    assert_eq!(untouched.first_name, "Kenneth");
    Ok(())
}

#[tokio::test]
async fn update_refuses_taken_username_and_unknown_id() -> Result<()> {
    let pool = migrated_pool().await?;
    let repo = SeaOrmEmployeeRepository::new(pool);
    let first = unique_username("a");
    let second = unique_username("b");
    let a = repo.create(draft(&first), Some("p")).await?;
    repo.create(draft(&second), Some("p")).await?;

    assert_eq!(
        repo.update(a.id, draft(&second), None).await,
        Err(RepoError::Conflict(format!(
            "Username \"{second}\" is already taken"
        )))
    );
    let renamed = repo.update(a.id, draft(&first), None).await?;
    assert_eq!(renamed.username, first);

    assert_eq!(
        repo.update(i32::MAX, draft("ghost"), None).await,
        Err(RepoError::NotFound("Employee not found".into()))
    );
    Ok(())
}

#[tokio::test]
async fn list_is_ordered_by_id() -> Result<()> {
    let pool = migrated_pool().await?;
    let repo = SeaOrmEmployeeRepository::new(pool);
    let before = repo.list().await?.len();
    for prefix in ["x", "y", "z"] {
        repo.create(draft(&unique_username(prefix)), Some("p")).await?;
    }
    let listed = repo.list().await?;
    assert_eq!(listed.len(), before + 3);
    assert!(listed.windows(2).all(|pair| pair[0].id < pair[1].id));
    Ok(())
}

#[tokio::test]
async fn over_long_fields_are_rejected_on_create_and_update() -> Result<()> {
    let pool = migrated_pool().await?;
    let repo = SeaOrmEmployeeRepository::new(pool);

    assert_eq!(
        repo.create(draft(&"u".repeat(129)), Some("p")).await,
        Err(RepoError::Validation(
            "Username must be at most 128 characters".into()
        ))
    );

    let username = unique_username("len");
    let created = repo.create(draft(&username), Some("p")).await?;
    let too_long_email = EmployeeDraft {
        email: Some(format!("{}@example.com", "e".repeat(320))),
        ..EmployeeDraft::default()
    };
    assert_eq!(
        repo.update(created.id, too_long_email, None).await,
        Err(RepoError::Validation(
            "Email must be at most 320 characters".into()
        ))
    );

    let exactly_max = EmployeeDraft {
        last_name: "l".repeat(128),
        ..EmployeeDraft::default()
    };
    let updated = repo.update(created.id, exactly_max, None).await?;
    assert_eq!(updated.last_name.chars().count(), 128);
    assert_eq!(updated.username, username);
    Ok(())
}
