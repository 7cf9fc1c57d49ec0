//! In-memory schema session for testing.
//!
//! Models just enough of a Postgres catalog to exercise the applier: tables,
//! indexes, functions and triggers, a pending copy of the catalog while a
//! transaction is open, `IF NOT EXISTS` / `OR REPLACE` guards, and
//! `REFERENCES` targets. Failures can be injected per statement, for commit,
//! rollback, the catalog query and close.

use std::collections::BTreeSet;
use std::sync::{Arc, Mutex};

use regex::Regex;

use dbinit_core::error::{DbInitError, Result};
use dbinit_core::migration::{MigrationStep, StepKind};

use crate::migrations::{SchemaSession, SessionFuture};

/// A call made on a mock session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionCall {
    Begin,
    Execute(String),
    Commit,
    Rollback,
    TableNames(String),
    Close,
}

/// Catalog contents visible to a session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MockCatalog {
    pub tables: BTreeSet<String>,
    pub indexes: BTreeSet<String>,
    pub functions: BTreeSet<String>,
    pub triggers: BTreeSet<String>,
    pub comments: BTreeSet<String>,
}

#[derive(Default)]
struct MockState {
    committed: MockCatalog,
    pending: Option<MockCatalog>,
    calls: Vec<SessionCall>,
    closes: usize,
    fail_on: Option<(String, String)>,
    fail_commit: Option<String>,
    fail_rollback: Option<String>,
    fail_catalog: Option<String>,
    fail_close: Option<String>,
}

/// Shared fake database handing out [`MockSession`]s.
///
/// Sessions share one committed catalog, so applying twice through two
/// sessions behaves like two invocations against the same server.
#[derive(Clone, Default)]
pub struct MockDatabase {
    state: Arc<Mutex<MockState>>,
}

impl MockDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a new session on this database.
    pub fn session(&self) -> MockSession {
        MockSession {
            state: Arc::clone(&self.state),
        }
    }

    /// Fail any statement containing `needle` with `message`.
    pub fn fail_on(&self, needle: &str, message: &str) {
        self.state.lock().unwrap().fail_on = Some((needle.to_string(), message.to_string()));
    }

    pub fn fail_commit(&self, message: &str) {
        self.state.lock().unwrap().fail_commit = Some(message.to_string());
    }

    pub fn fail_rollback(&self, message: &str) {
        self.state.lock().unwrap().fail_rollback = Some(message.to_string());
    }

    pub fn fail_catalog(&self, message: &str) {
        self.state.lock().unwrap().fail_catalog = Some(message.to_string());
    }

    pub fn fail_close(&self, message: &str) {
        self.state.lock().unwrap().fail_close = Some(message.to_string());
    }

    /// Add a committed table that no plan created.
    pub fn seed_table(&self, name: &str) {
        self.state
            .lock()
            .unwrap()
            .committed
            .tables
            .insert(name.to_string());
    }

    /// Every call made by every session, in order.
    pub fn calls(&self) -> Vec<SessionCall> {
        self.state.lock().unwrap().calls.clone()
    }

    /// Committed table names, ascending.
    pub fn committed_tables(&self) -> Vec<String> {
        self.state
            .lock()
            .unwrap()
            .committed
            .tables
            .iter()
            .cloned()
            .collect()
    }

    /// Copy of the committed catalog.
    pub fn snapshot(&self) -> MockCatalog {
        self.state.lock().unwrap().committed.clone()
    }

    /// How many sessions were closed.
    pub fn close_count(&self) -> usize {
        self.state.lock().unwrap().closes
    }
}

/// A session on a [`MockDatabase`].
pub struct MockSession {
    state: Arc<Mutex<MockState>>,
}

impl MockSession {
    fn with_state<T>(&self, f: impl FnOnce(&mut MockState) -> Result<T>) -> Result<T> {
        let mut state = self.state.lock().unwrap();
        f(&mut state)
    }
}

impl SchemaSession for MockSession {
    fn begin(&mut self) -> SessionFuture<'_, ()> {
        let result = self.with_state(|state| {
            state.calls.push(SessionCall::Begin);
            if state.pending.is_some() {
                return Err(DbInitError::Transaction(
                    "there is already a transaction in progress".into(),
                ));
            }
            state.pending = Some(state.committed.clone());
            Ok(())
        });
        Box::pin(async move { result })
    }

    fn execute<'a>(&'a mut self, sql: &'a str) -> SessionFuture<'a, ()> {
        let result = self.with_state(|state| {
            state.calls.push(SessionCall::Execute(sql.to_string()));

            if let Some((needle, message)) = &state.fail_on {
                if sql.contains(needle.as_str()) {
                    return Err(engine_error(message));
                }
            }

            let MockState {
                committed, pending, ..
            } = state;
            // Outside a transaction each statement autocommits
            let catalog = pending.as_mut().unwrap_or(committed);
            apply_statement(catalog, sql)
        });
        Box::pin(async move { result })
    }

    fn commit(&mut self) -> SessionFuture<'_, ()> {
        let result = self.with_state(|state| {
            state.calls.push(SessionCall::Commit);
            let pending = state.pending.take();
            if let Some(message) = &state.fail_commit {
                return Err(DbInitError::Transaction(message.clone()));
            }
            if let Some(catalog) = pending {
                state.committed = catalog;
            }
            Ok(())
        });
        Box::pin(async move { result })
    }

    fn rollback(&mut self) -> SessionFuture<'_, ()> {
        let result = self.with_state(|state| {
            state.calls.push(SessionCall::Rollback);
            state.pending = None;
            match &state.fail_rollback {
                Some(message) => Err(DbInitError::Rollback(message.clone())),
                None => Ok(()),
            }
        });
        Box::pin(async move { result })
    }

    fn table_names<'a>(&'a mut self, schema: &'a str) -> SessionFuture<'a, Vec<String>> {
        let result = self.with_state(|state| {
            state.calls.push(SessionCall::TableNames(schema.to_string()));
            if let Some(message) = &state.fail_catalog {
                return Err(DbInitError::Catalog(message.clone()));
            }
            let catalog = state.pending.as_ref().unwrap_or(&state.committed);
            Ok(tables_in_schema(catalog, schema))
        });
        Box::pin(async move { result })
    }

    fn close(self) -> SessionFuture<'static, ()> {
        let result = self.with_state(|state| {
            state.calls.push(SessionCall::Close);
            state.closes += 1;
            // Closing with an open transaction discards it
            state.pending = None;
            match &state.fail_close {
                Some(message) => Err(DbInitError::Release(message.clone())),
                None => Ok(()),
            }
        });
        Box::pin(async move { result })
    }
}

fn engine_error(message: &str) -> DbInitError {
    DbInitError::Sql(sqlx::Error::Protocol(message.to_string()))
}

fn apply_statement(catalog: &mut MockCatalog, sql: &str) -> Result<()> {
    let step = MigrationStep::classify(0, "mock", sql)?;
    let object = step.object().to_string();

    match step.kind() {
        StepKind::CreateTable => {
            for target in referenced_tables(sql) {
                require_table(catalog, &target)?;
            }
            create(&mut catalog.tables, object, step.is_guarded(), "relation")
        }
        StepKind::CreateIndex => {
            if let Some(table) = indexed_table(sql) {
                require_table(catalog, &table)?;
            }
            create(&mut catalog.indexes, object, step.is_guarded(), "relation")
        }
        StepKind::CreateFunction => {
            create(&mut catalog.functions, object, step.is_guarded(), "function")
        }
        StepKind::DropTrigger => {
            let key = trigger_key(&step);
            if !catalog.triggers.remove(&key) && !step.is_guarded() {
                return Err(engine_error(&format!("trigger \"{}\" does not exist", object)));
            }
            Ok(())
        }
        StepKind::CreateTrigger => {
            if let Some(table) = step.table() {
                require_table(catalog, table)?;
            }
            create(&mut catalog.triggers, trigger_key(&step), step.is_guarded(), "trigger")
        }
        StepKind::Comment => {
            require_comment_target(catalog, sql, &object)?;
            catalog.comments.insert(object);
            Ok(())
        }
    }
}

/// Triggers are named per table.
fn trigger_key(step: &MigrationStep) -> String {
    format!("{}.{}", step.table().unwrap_or_default(), step.object())
}

fn require_comment_target(catalog: &MockCatalog, sql: &str, object: &str) -> Result<()> {
    let re = Regex::new(r"(?i)^COMMENT\s+ON\s+(\w+)").unwrap();
    let target = re
        .captures(sql.trim())
        .map(|c| c[1].to_uppercase())
        .unwrap_or_default();

    let found = match target.as_str() {
        "TABLE" => catalog.tables.contains(object),
        // `table.column`; the column itself is not tracked
        "COLUMN" => match object.rsplit_once('.') {
            Some((table, _)) => catalog.tables.contains(table),
            None => false,
        },
        "INDEX" => catalog.indexes.contains(object),
        "FUNCTION" => catalog.functions.contains(object),
        "TRIGGER" => {
            let re = Regex::new(r"(?i)^COMMENT\s+ON\s+TRIGGER\s+\w+\s+ON\s+(\w+)").unwrap();
            re.captures(sql.trim())
                .map(|c| catalog.triggers.contains(&format!("{}.{}", c[1].to_lowercase(), object)))
                .unwrap_or(false)
        }
        _ => false,
    };

    if found {
        Ok(())
    } else {
        let what = match target.as_str() {
            "INDEX" | "TABLE" | "COLUMN" => "relation",
            other => other,
        };
        let name = match target.as_str() {
            "COLUMN" => object.rsplit_once('.').map_or(object, |(table, _)| table),
            _ => object,
        };
        Err(engine_error(&format!(
            "{} \"{}\" does not exist",
            what.to_lowercase(),
            name
        )))
    }
}

/// Unqualified tables live in `public`; `schema.table` lives in `schema`.
fn tables_in_schema(catalog: &MockCatalog, schema: &str) -> Vec<String> {
    let mut tables: Vec<String> = catalog
        .tables
        .iter()
        .filter_map(|name| match name.split_once('.') {
            Some((owner, table)) if owner == schema => Some(table.to_string()),
            Some(_) => None,
            None if schema == "public" => Some(name.clone()),
            None => None,
        })
        .collect();
    tables.sort();
    tables
}

fn create(set: &mut BTreeSet<String>, name: String, guarded: bool, what: &str) -> Result<()> {
    if set.contains(&name) && !guarded {
        return Err(engine_error(&format!("{} \"{}\" already exists", what, name)));
    }
    set.insert(name);
    Ok(())
}

fn require_table(catalog: &MockCatalog, table: &str) -> Result<()> {
    if catalog.tables.contains(table) {
        Ok(())
    } else {
        Err(engine_error(&format!("relation \"{}\" does not exist", table)))
    }
}

fn referenced_tables(sql: &str) -> Vec<String> {
    let re = Regex::new(r"(?i)REFERENCES\s+(\w+)").unwrap();
    re.captures_iter(sql)
        .map(|c| c[1].to_lowercase())
        .collect()
}

fn indexed_table(sql: &str) -> Option<String> {
    let re = Regex::new(r"(?i)\sON\s+(\w+)").unwrap();
    re.captures(sql).map(|c| c[1].to_lowercase())
}
