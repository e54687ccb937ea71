use anyhow::Context;
use sqlmapper::driver::memory::{ColumnSpec, MemoryDatabase};
use sqlmapper::mapping::{ResultDescriptor, SqlCommandType};
use sqlmapper::{Configuration, JdbcType, Settings, SqlSessionFactory};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Debug, Clone, Default)]
struct Author {
    id: Option<i64>,
    name: Option<String>,
    email: Option<String>,
}
sqlmapper::mapped_entity!(Author { id: Option<i64>, name: Option<String>, email: Option<String> });

fn main() -> anyhow::Result<()> {
    // Init logging
    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new("info"))?;
    fmt().with_env_filter(filter).init();

    let settings = match std::env::var("SQLMAPPER_SETTINGS") {
        Ok(path) => Settings::load_with_env(&path).with_context(|| format!("loading settings from {}", path))?,
        Err(_) => Settings::from_env(),
    };
    let rust_log = std::env::var("RUST_LOG").unwrap_or_else(|_| "<unset>".to_string());
    info!(
        target: "sqlmapper",
        "sqlmapper demo starting: RUST_LOG='{}', environment='{}', cache_enabled={}, log_sql={}",
        rust_log, settings.environment_id, settings.cache_enabled, settings.log_sql
    );

    let db = MemoryDatabase::new();
    db.create_table("author", vec![
        ColumnSpec::new("id", JdbcType::BigInt).auto_increment(),
        ColumnSpec::new("name", JdbcType::Varchar),
        ColumnSpec::new("email", JdbcType::Varchar),
    ])?;

    let mut cfg = Configuration::with_data_source(settings, Arc::new(db.clone()));
    let author = ResultDescriptor::Object("Author".into());
    let insert = cfg.statement("author.insert", SqlCommandType::Insert, "INSERT INTO author (name, email) VALUES (#{name}, #{email,jdbcType=VARCHAR})")?
        .generated_keys("id")
        .build()?;
    let by_id = cfg.statement("author.byId", SqlCommandType::Select, "SELECT * FROM author WHERE id = #{id}")?
        .result_type(author.clone())
        .build()?;
    let search = cfg.statement(
        "author.search",
        SqlCommandType::Select,
        "SELECT * FROM author WHERE id > 0 <if test=\"name != null\">AND name = #{name}</if> ORDER BY id",
    )?
    .result_type(author)
    .build()?;
    for ms in [insert, by_id, search] {
        cfg.add_mapped_statement(ms)?;
    }
    let factory = SqlSessionFactory::new(cfg);

    let mut session = factory.open_session();
    for (name, email) in [("ada", Some("ada@example.org")), ("grace", None)] {
        let mut a = Author { id: None, name: Some(name.to_string()), email: email.map(str::to_string) };
        session.insert("author.insert", &mut a)?;
        info!(target: "sqlmapper", "inserted {:?}", a);
    }
    session.commit()?;

    let first = session.select_one::<Author>("author.byId", &1i64)?;
    info!(target: "sqlmapper", "author.byId(1) = {:?}", first);
    let again = session.select_one::<Author>("author.byId", &1i64)?;
    info!(target: "sqlmapper", "second lookup served from cache: {}", again.is_some());

    let filter = Author { name: Some("grace".into()), ..Author::default() };
    let found = session.select_list::<Author>("author.search", &filter)?;
    info!(target: "sqlmapper", "author.search(name=grace) -> {} row(s)", found.len());
    let all = session.select_list::<Author>("author.search", &Author::default())?;
    info!(target: "sqlmapper", "author.search() -> {} row(s)", all.len());
    session.close();

    info!(target: "sqlmapper", "executed {} statements against the store", db.executed_statements());
    Ok(())
}
