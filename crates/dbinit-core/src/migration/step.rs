use std::fmt;

use once_cell::sync::Lazy;
use regex_lite::{Captures, Regex};
use serde::Serialize;

use crate::error::{DbInitError, Result};

/// A possibly schema-qualified name whose parts may be double-quoted.
const NAME: &str = r#"((?:\w+|"[^"]*")(?:\.(?:\w+|"[^"]*"))*)"#;

static CREATE_TABLE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(r"(?is)^CREATE\s+TABLE\s+(IF\s+NOT\s+EXISTS\s+)?{}", NAME)).expect("valid regex")
});
static CREATE_INDEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)^CREATE\s+(?:UNIQUE\s+)?INDEX\s+(?:CONCURRENTLY\s+)?(IF\s+NOT\s+EXISTS\s+)?(\w+)")
        .expect("valid regex")
});
static CREATE_FUNCTION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)^CREATE\s+(OR\s+REPLACE\s+)?FUNCTION\s+([\w.]+)").expect("valid regex")
});
static DROP_TRIGGER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(r"(?is)^DROP\s+TRIGGER\s+(IF\s+EXISTS\s+)?(\w+)\s+ON\s+{}", NAME))
        .expect("valid regex")
});
static CREATE_TRIGGER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(r"(?is)^CREATE\s+(OR\s+REPLACE\s+)?TRIGGER\s+(\w+)\s.*?\sON\s+{}", NAME))
        .expect("valid regex")
});
static COMMENT_ON: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(r"(?is)^COMMENT\s+ON\s+(?:TABLE|COLUMN|INDEX|FUNCTION|TRIGGER)\s+{}", NAME))
        .expect("valid regex")
});

/// Kind of DDL a migration step performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StepKind {
    CreateTable,
    CreateIndex,
    CreateFunction,
    DropTrigger,
    CreateTrigger,
    Comment,
}

impl StepKind {
    /// Human-readable verb phrase used in step labels.
    pub fn describe(&self) -> &'static str {
        match self {
            Self::CreateTable => "create table",
            Self::CreateIndex => "create index",
            Self::CreateFunction => "create function",
            Self::DropTrigger => "drop trigger",
            Self::CreateTrigger => "create trigger",
            Self::Comment => "comment on",
        }
    }
}

impl fmt::Display for StepKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.describe())
    }
}

/// One ordered unit of DDL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MigrationStep {
    position: usize,
    kind: StepKind,
    object: String,
    guarded: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    table: Option<String>,
    label: String,
    sql: String,
}

impl MigrationStep {
    /// Classify a single statement into a step.
    ///
    /// `source` names the migration the statement came from and prefixes the label.
    pub fn classify(position: usize, source: &str, sql: &str) -> Result<Self> {
        let sql = sql.trim();
        let (kind, guarded, object, table) = if let Some(c) = CREATE_TABLE.captures(sql) {
            (StepKind::CreateTable, c.get(1).is_some(), group(&c, 2), None)
        } else if let Some(c) = CREATE_INDEX.captures(sql) {
            (StepKind::CreateIndex, c.get(1).is_some(), group(&c, 2), None)
        } else if let Some(c) = CREATE_FUNCTION.captures(sql) {
            (StepKind::CreateFunction, c.get(1).is_some(), group(&c, 2), None)
        } else if let Some(c) = DROP_TRIGGER.captures(sql) {
            (StepKind::DropTrigger, c.get(1).is_some(), group(&c, 2), Some(normalize_name(group(&c, 3))))
        } else if let Some(c) = CREATE_TRIGGER.captures(sql) {
            (StepKind::CreateTrigger, c.get(1).is_some(), group(&c, 2), Some(normalize_name(group(&c, 3))))
        } else if let Some(c) = COMMENT_ON.captures(sql) {
            (StepKind::Comment, true, group(&c, 1), None)
        } else {
            let head: String = sql.chars().take(60).collect();
            return Err(DbInitError::Config(format!(
                "Unrecognized statement in migration '{}': {}",
                source, head
            )));
        };

        let object = normalize_name(object);
        let label = format!("{}: {} {}", source, kind, object);

        Ok(Self {
            position,
            kind,
            object,
            guarded,
            table,
            label,
            sql: sql.to_string(),
        })
    }

    /// 1-based execution position.
    pub fn position(&self) -> usize {
        self.position
    }

    pub fn kind(&self) -> StepKind {
        self.kind
    }

    /// Name of the object the step creates, drops or comments on.
    pub fn object(&self) -> &str {
        &self.object
    }

    /// Whether the statement carries its own existence guard
    /// (`IF NOT EXISTS`, `OR REPLACE`, `IF EXISTS`).
    ///
    /// Comments always count as guarded since reissuing one overwrites it.
    pub fn is_guarded(&self) -> bool {
        self.guarded
    }

    /// Table a trigger step is attached to.
    pub fn table(&self) -> Option<&str> {
        self.table.as_deref()
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }
}

fn group<'h>(captures: &Captures<'h>, index: usize) -> &'h str {
    captures.get(index).map_or("", |m| m.as_str())
}

/// Fold unquoted parts to lower case and strip quotes from quoted parts,
/// the way Postgres resolves identifiers.
fn normalize_name(raw: &str) -> String {
    let mut name = String::with_capacity(raw.len());
    let mut quoted = false;
    for c in raw.chars() {
        match c {
            '"' => quoted = !quoted,
            _ if quoted => name.push(c),
            _ => name.extend(c.to_lowercase()),
        }
    }
    name
}
