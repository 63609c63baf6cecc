//! Postgres integration suite. Runs only when a database is reachable via
//! DATABASE_URL or POSTGRES_* (same discovery as the app config); otherwise
//! every test is a silent skip.

use std::sync::Arc;

use sqlx::PgPool;
use uuid::Uuid;

use quiz_regrade::core::time::primitive_now_utc;
use quiz_regrade::repositories::{questions, quizzes};
use quiz_regrade::{
    PgRegradeStore, QuestionWriter, RegradeRequest, RegradeStore, RegradeStrategy, RegradeTracker,
    SaveQuestion,
};

fn database_configured() -> bool {
    dotenvy::dotenv().ok();

    let url_set =
        std::env::var("DATABASE_URL").map(|url| !url.trim().is_empty()).unwrap_or(false);
    url_set || std::env::var("POSTGRES_SERVER").is_ok()
}

async fn connect() -> Option<PgPool> {
    if !database_configured() {
        return None;
    }

    let settings = quiz_regrade::core::config::Settings::load().ok()?;
    // try_init fails on every call after the first; that is fine here
    quiz_regrade::core::telemetry::init_tracing(&settings).ok();

    let pool = quiz_regrade::db::init_pool(&settings).await.ok()?;
    quiz_regrade::db::run_migrations(&pool).await.ok()?;
    Some(pool)
}

async fn insert_quiz(pool: &PgPool, title: &str) -> anyhow::Result<quiz_regrade::db::models::Quiz> {
    let now = primitive_now_utc();
    let quiz = quizzes::create(
        pool,
        quizzes::CreateQuiz {
            id: &Uuid::new_v4().to_string(),
            title,
            created_by: "teacher-1",
            created_at: now,
            updated_at: now,
        },
    )
    .await?;
    Ok(quiz)
}

#[tokio::test]
async fn migrations_apply_and_tables_exist() -> anyhow::Result<()> {
    let Some(pool) = connect().await else {
        eprintln!("skipping: no database configured");
        return Ok(());
    };

    for table in ["quizzes", "quiz_questions", "quiz_regrades", "quiz_question_regrades"] {
        let regclass: Option<String> =
            sqlx::query_scalar("SELECT to_regclass($1)::text").bind(table).fetch_one(&pool).await?;
        assert!(regclass.is_some(), "expected table {table} to exist after migrations");
    }

    Ok(())
}

#[tokio::test]
async fn record_regrade_upserts_by_natural_key() -> anyhow::Result<()> {
    let Some(pool) = connect().await else {
        eprintln!("skipping: no database configured");
        return Ok(());
    };

    let quiz = insert_quiz(&pool, "Pg upsert quiz").await?;
    let store = Arc::new(PgRegradeStore::new(pool.clone()));
    let tracker = RegradeTracker::new(store.clone());
    let question_id = Uuid::new_v4().to_string();

    tracker
        .record_regrade(RegradeRequest {
            quiz_id: &quiz.id,
            quiz_version: quiz.version_number,
            question_id: &question_id,
            strategy: "update_scores",
            acting_user: "teacher-1",
        })
        .await?;
    tracker
        .record_regrade(RegradeRequest {
            quiz_id: &quiz.id,
            quiz_version: quiz.version_number,
            question_id: &question_id,
            strategy: "no_regrade",
            acting_user: "teacher-2",
        })
        .await?;

    let episode = store
        .find_episode(&quiz.id, quiz.version_number)
        .await
        .map_err(|err| anyhow::anyhow!(err))?
        .expect("episode");
    assert_eq!(episode.created_by, "teacher-1");

    let entries =
        store.list_entries(&episode.id).await.map_err(|err| anyhow::anyhow!(err))?;
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].regrade_option, RegradeStrategy::NoRegrade);

    let episode_rows: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM quiz_regrades WHERE quiz_id = $1")
            .bind(&quiz.id)
            .fetch_one(&pool)
            .await?;
    assert_eq!(episode_rows, 1);

    Ok(())
}

#[tokio::test]
async fn question_save_records_bookkeeping_and_positions() -> anyhow::Result<()> {
    let Some(pool) = connect().await else {
        eprintln!("skipping: no database configured");
        return Ok(());
    };

    let quiz = insert_quiz(&pool, "Pg writer quiz").await?;
    let writer = QuestionWriter::new(pool.clone());

    let first_id = Uuid::new_v4().to_string();
    let first = writer
        .save_question(SaveQuestion {
            quiz_id: &quiz.id,
            question_id: &first_id,
            position: None,
            data: serde_json::json!({
                "question_type": "multiple_choice",
                "question_name": "First",
                "answers": [{"text": "A", "weight": 100.0}]
            }),
        })
        .await?;
    assert_eq!(first.position, 1);

    let second_id = Uuid::new_v4().to_string();
    let second = writer
        .save_question(SaveQuestion {
            quiz_id: &quiz.id,
            question_id: &second_id,
            position: None,
            data: serde_json::json!({
                "question_type": "short_answer",
                "answers": [{"text": "ok"}, {"text": ""}],
                "regrade_option": "full_credit",
                "regrade_user": "teacher-1"
            }),
        })
        .await?;
    assert_eq!(second.position, 2);

    let store = PgRegradeStore::new(pool.clone());
    let episode = store
        .find_episode(&quiz.id, quiz.version_number)
        .await
        .map_err(|err| anyhow::anyhow!(err))?
        .expect("episode from save");
    let entries =
        store.list_entries(&episode.id).await.map_err(|err| anyhow::anyhow!(err))?;
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].quiz_question_id, second_id);

    // blank short answers are dropped before persistence
    let saved = questions::find_by_id(&pool, &second_id).await?.expect("saved question");
    let answers = saved.question_data.0["answers"].as_array().expect("answers").len();
    assert_eq!(answers, 1);

    writer.delete_question(&first_id).await?;
    let active = questions::list_active_by_quiz(&pool, &quiz.id).await?;
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].id, second_id);

    Ok(())
}

#[tokio::test]
async fn finalize_bumps_version_and_scopes_new_episodes() -> anyhow::Result<()> {
    let Some(pool) = connect().await else {
        eprintln!("skipping: no database configured");
        return Ok(());
    };

    let quiz = insert_quiz(&pool, "Pg finalize quiz").await?;
    let store = Arc::new(PgRegradeStore::new(pool.clone()));
    let tracker = RegradeTracker::new(store.clone());
    let question_id = Uuid::new_v4().to_string();

    tracker
        .record_regrade(RegradeRequest {
            quiz_id: &quiz.id,
            quiz_version: quiz.version_number,
            question_id: &question_id,
            strategy: "disregard",
            acting_user: "teacher-1",
        })
        .await?;

    let bumped = quizzes::finalize(&pool, &quiz.id, primitive_now_utc()).await?.expect("bumped");
    assert_eq!(bumped, quiz.version_number + 1);
    assert_eq!(quizzes::current_version(&pool, &quiz.id).await?, Some(bumped));
    assert_eq!(quizzes::current_version(&pool, "no-such-quiz").await?, None);

    tracker
        .record_regrade(RegradeRequest {
            quiz_id: &quiz.id,
            quiz_version: bumped,
            question_id: &question_id,
            strategy: "disregard",
            acting_user: "teacher-1",
        })
        .await?;

    let episode_rows: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM quiz_regrades WHERE quiz_id = $1")
            .bind(&quiz.id)
            .fetch_one(&pool)
            .await?;
    assert_eq!(episode_rows, 2);

    Ok(())
}
