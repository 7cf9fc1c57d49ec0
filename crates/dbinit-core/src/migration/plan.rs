use std::collections::HashSet;

use tracing::debug;

use super::split::split_statements;
use super::step::{MigrationStep, StepKind};
use crate::error::{DbInitError, Result};

/// An ordered list of migration steps.
///
/// Positions are contiguous from 1 in the order statements were added.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MigrationPlan {
    steps: Vec<MigrationStep>,
}

impl MigrationPlan {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a plan from named SQL sources, applied in the given order.
    pub fn from_sources<I, N, S>(sources: I) -> Result<Self>
    where
        I: IntoIterator<Item = (N, S)>,
        N: AsRef<str>,
        S: AsRef<str>,
    {
        let mut plan = Self::new();
        for (name, sql) in sources {
            plan.push_source(name.as_ref(), sql.as_ref())?;
        }
        Ok(plan)
    }

    /// Split a SQL source into statements and append each as a step.
    pub fn push_source(&mut self, name: &str, sql: &str) -> Result<&mut Self> {
        let statements = split_statements(sql);
        if statements.is_empty() {
            return Err(DbInitError::Config(format!(
                "Migration '{}' contains no statements",
                name
            )));
        }

        for statement in &statements {
            self.push_statement(name, statement)?;
        }
        debug!("Loaded {} statements from {}", statements.len(), name);
        Ok(self)
    }

    /// Append a single statement as the next step.
    pub fn push_statement(&mut self, source: &str, sql: &str) -> Result<&mut Self> {
        let step = MigrationStep::classify(self.steps.len() + 1, source, sql)?;
        self.steps.push(step);
        Ok(self)
    }

    pub fn steps(&self) -> &[MigrationStep] {
        &self.steps
    }

    pub fn iter(&self) -> std::slice::Iter<'_, MigrationStep> {
        self.steps.iter()
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Tables created by this plan, in creation order.
    pub fn tables(&self) -> Vec<&str> {
        self.steps
            .iter()
            .filter(|s| s.kind() == StepKind::CreateTable)
            .map(|s| s.object())
            .collect()
    }

    /// Check that re-running the plan on a provisioned database is a no-op.
    ///
    /// Every create must carry its own guard, except `CREATE TRIGGER`, which
    /// must follow a `DROP TRIGGER IF EXISTS` for the same trigger on the same
    /// table. Trigger names are only unique per table.
    pub fn validate(&self) -> Result<()> {
        let mut dropped_triggers = HashSet::new();

        for step in &self.steps {
            match step.kind() {
                StepKind::DropTrigger => {
                    if !step.is_guarded() {
                        return Err(unguarded(step, "DROP TRIGGER needs IF EXISTS"));
                    }
                    dropped_triggers.insert((step.object(), step.table()));
                }
                StepKind::CreateTrigger => {
                    let key = (step.object(), step.table());
                    if !step.is_guarded() && !dropped_triggers.contains(&key) {
                        return Err(unguarded(
                            step,
                            "CREATE TRIGGER must follow DROP TRIGGER IF EXISTS",
                        ));
                    }
                }
                StepKind::CreateTable | StepKind::CreateIndex => {
                    if !step.is_guarded() {
                        return Err(unguarded(step, "missing IF NOT EXISTS"));
                    }
                }
                StepKind::CreateFunction => {
                    if !step.is_guarded() {
                        return Err(unguarded(step, "missing OR REPLACE"));
                    }
                }
                StepKind::Comment => {}
            }
        }

        Ok(())
    }
}

impl<'a> IntoIterator for &'a MigrationPlan {
    type Item = &'a MigrationStep;
    type IntoIter = std::slice::Iter<'a, MigrationStep>;

    fn into_iter(self) -> Self::IntoIter {
        self.steps.iter()
    }
}

fn unguarded(step: &MigrationStep, reason: &str) -> DbInitError {
    DbInitError::Config(format!(
        "Step {} ({}) is not idempotent: {}",
        step.position(),
        step.label(),
        reason
    ))
}
