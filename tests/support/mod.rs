#![allow(dead_code)]

use sqlmapper::driver::memory::{ColumnSpec, MemoryDatabase};
use sqlmapper::mapping::{ResultDescriptor, SqlCommandType};
use sqlmapper::value::ValueType;
use sqlmapper::{Configuration, JdbcType, Settings, SqlSessionFactory};
use std::sync::Arc;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Author {
    pub id: Option<i64>,
    pub name: Option<String>,
    pub email: Option<String>,
}
sqlmapper::mapped_entity!(Author { id: Option<i64>, name: Option<String>, email: Option<String> });

impl Author {
    pub fn new(name: &str, email: Option<&str>) -> Self {
        Self { id: None, name: Some(name.to_string()), email: email.map(str::to_string) }
    }
}

pub struct Fixture {
    pub db: MemoryDatabase,
    pub factory: SqlSessionFactory,
}

impl Fixture {
    /// Statements executed against the store since it was created.
    pub fn executed(&self) -> u64 { self.db.executed_statements() }
}

pub fn fixture(settings: Settings) -> Fixture { fixture_with(settings, |_| {}) }

pub fn fixture_with<F: FnOnce(&mut Configuration)>(settings: Settings, customize: F) -> Fixture {
    let db = MemoryDatabase::new();
    db.create_table("author", vec![
        ColumnSpec::new("id", JdbcType::BigInt).auto_increment(),
        ColumnSpec::new("name", JdbcType::Varchar),
        ColumnSpec::new("email", JdbcType::Varchar),
    ])
    .expect("create author table");

    let mut cfg = Configuration::with_data_source(settings, Arc::new(db.clone()));
    let author = ResultDescriptor::Object("Author".into());
    let defs: Vec<(&str, SqlCommandType, &str, Option<ResultDescriptor>)> = vec![
        ("author.insert", SqlCommandType::Insert, "INSERT INTO author (name, email) VALUES (#{name}, #{email,jdbcType=VARCHAR})", None),
        ("author.byId", SqlCommandType::Select, "SELECT * FROM author WHERE id = #{id}", Some(author.clone())),
        ("author.all", SqlCommandType::Select, "SELECT * FROM author ORDER BY id", Some(author.clone())),
        (
            "author.byName",
            SqlCommandType::Select,
            "SELECT * FROM author <if test=\"name != null\">WHERE name = #{name}</if> ORDER BY id",
            Some(author.clone()),
        ),
        ("author.names", SqlCommandType::Select, "SELECT name FROM author ORDER BY id", Some(ResultDescriptor::Scalar(ValueType::String))),
        ("author.updateEmail", SqlCommandType::Update, "UPDATE author SET email = #{email,jdbcType=VARCHAR} WHERE id = #{id}", None),
        ("author.deleteById", SqlCommandType::Delete, "DELETE FROM author WHERE id = #{id}", None),
        ("missing.all", SqlCommandType::Select, "SELECT * FROM nowhere", Some(author)),
    ];
    for (id, command, template, result) in defs {
        let mut b = cfg.statement(id, command, template).expect("template");
        if let Some(r) = result { b = b.result_type(r); }
        if id == "author.insert" { b = b.generated_keys("id"); }
        cfg.add_mapped_statement(b.build().expect("statement")).expect("register");
    }
    customize(&mut cfg);
    Fixture { db, factory: SqlSessionFactory::new(cfg) }
}

/// Insert and commit the given authors; returns them with their generated ids.
pub fn seed(f: &Fixture, rows: &[(&str, Option<&str>)]) -> Vec<Author> {
    let mut session = f.factory.open_session();
    let mut out = Vec::new();
    for (name, email) in rows {
        let mut a = Author::new(name, *email);
        session.insert("author.insert", &mut a).expect("insert");
        out.push(a);
    }
    session.commit().expect("commit");
    out
}
