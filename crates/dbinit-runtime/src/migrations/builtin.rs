//! Built-in user schema migrations.
//!
//! Every statement is idempotent, so the whole set is re-applied on each run.
//! There is no applied-migrations ledger.

use dbinit_core::error::Result;
use dbinit_core::migration::MigrationPlan;

/// Named SQL sources for the user schema, in application order.
pub const USER_SCHEMA_SOURCES: [(&str, &str); 4] = [
    ("0001_users", include_str!("../../migrations/0001_users.sql")),
    (
        "0002_user_profiles",
        include_str!("../../migrations/0002_user_profiles.sql"),
    ),
    (
        "0003_user_reports",
        include_str!("../../migrations/0003_user_reports.sql"),
    ),
    (
        "0004_user_inquiries",
        include_str!("../../migrations/0004_user_inquiries.sql"),
    ),
];

/// Build the ordered plan for the user schema.
pub fn user_schema_plan() -> Result<MigrationPlan> {
    MigrationPlan::from_sources(USER_SCHEMA_SOURCES)
}

#[cfg(test)]
mod tests {
    use super::*;
    use dbinit_core::migration::StepKind;

    #[test]
    fn test_user_schema_plan_validates() {
        let plan = user_schema_plan().unwrap();
        assert!(plan.validate().is_ok());
        assert_eq!(plan.len(), 36);
    }

    #[test]
    fn test_tables_in_dependency_order() {
        let plan = user_schema_plan().unwrap();
        assert_eq!(
            plan.tables(),
            vec!["users", "user_profiles", "user_reports", "user_inquiries"]
        );
    }

    #[test]
    fn test_every_step_is_guarded_or_replaced() {
        let plan = user_schema_plan().unwrap();
        for step in &plan {
            match step.kind() {
                StepKind::CreateTable => assert!(step.sql().contains("IF NOT EXISTS")),
                StepKind::CreateIndex => assert!(step.sql().contains("IF NOT EXISTS")),
                StepKind::CreateFunction => assert!(step.sql().contains("OR REPLACE")),
                StepKind::DropTrigger => assert!(step.sql().contains("IF EXISTS")),
                StepKind::CreateTrigger | StepKind::Comment => {}
            }
        }
    }

    #[test]
    fn test_triggers_are_dropped_first() {
        let plan = user_schema_plan().unwrap();
        let steps = plan.steps();
        for (i, step) in steps.iter().enumerate() {
            if step.kind() == StepKind::CreateTrigger {
                let previous = &steps[i - 1];
                assert_eq!(previous.kind(), StepKind::DropTrigger);
                assert_eq!(previous.object(), step.object());
                assert_eq!(previous.table(), step.table());
            }
        }
    }

    #[test]
    fn test_function_defined_before_triggers() {
        let plan = user_schema_plan().unwrap();
        let function = plan
            .iter()
            .position(|s| s.kind() == StepKind::CreateFunction)
            .unwrap();
        let first_trigger = plan
            .iter()
            .position(|s| s.kind() == StepKind::CreateTrigger)
            .unwrap();
        assert!(function < first_trigger);
        assert!(plan.steps()[function].sql().contains("RETURN NEW;"));
    }

    #[test]
    fn test_foreign_keys_reference_earlier_tables() {
        let plan = user_schema_plan().unwrap();
        let users = plan.iter().position(|s| s.object() == "users").unwrap();
        for step in plan.iter().filter(|s| s.sql().contains("REFERENCES users")) {
            assert!(step.position() > users + 1);
        }
    }

    #[test]
    fn test_labels_name_source_and_object() {
        let plan = user_schema_plan().unwrap();
        assert_eq!(plan.steps()[0].label(), "0001_users: create table users");
        let last = plan.steps().last().unwrap();
        assert_eq!(
            last.label(),
            "0004_user_inquiries: comment on user_inquiries.status"
        );
    }
}
