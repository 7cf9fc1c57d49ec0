use anyhow::Result;
use clap::Parser;
use console::style;

use dbinit::{user_schema_plan, MigrationPlan};

/// Print the built-in migration plan.
#[derive(Parser)]
pub struct StepsCommand {
    /// Also print each statement's SQL.
    #[arg(long)]
    pub sql: bool,
}

impl StepsCommand {
    /// Execute the steps command.
    pub fn execute(self) -> Result<()> {
        let plan = user_schema_plan()?;
        plan.validate()?;

        println!();
        println!(
            "  {} {} steps, {} tables",
            style("dbinit").bold().cyan(),
            plan.len(),
            plan.tables().len()
        );
        println!();
        print!("{}", render(&plan, self.sql));
        Ok(())
    }
}

fn render(plan: &MigrationPlan, with_sql: bool) -> String {
    let mut out = String::new();
    for step in plan {
        out.push_str(&format!("  {:>3}  {}\n", step.position(), step.label()));
        if with_sql {
            for line in step.sql().lines() {
                out.push_str(&format!("         {}\n", line));
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_lists_steps_in_order() {
        let plan = user_schema_plan().unwrap();
        let out = render(&plan, false);
        let lines: Vec<&str> = out.lines().collect();

        assert_eq!(lines.len(), plan.len());
        assert_eq!(lines[0], "    1  0001_users: create table users");
        assert!(lines[1].ends_with("0001_users: create index idx_users_email"));
    }

    #[test]
    fn test_render_with_sql() {
        let plan = user_schema_plan().unwrap();
        let out = render(&plan, true);
        assert!(out.contains("CREATE TABLE IF NOT EXISTS user_inquiries"));
    }
}
