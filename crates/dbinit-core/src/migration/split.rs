/// Split SQL into individual statements.
///
/// Semicolons inside single-quoted literals, `E'...'` escape strings,
/// double-quoted identifiers and dollar-quoted bodies (`$$` or `$tag$`) do not
/// end a statement. Line comments and (possibly nested) block comments outside
/// those spans are dropped, so comment-only fragments vanish.
pub fn split_statements(sql: &str) -> Vec<String> {
    let mut statements = Vec::new();
    let mut current = String::new();
    let mut dollar_tag: Option<String> = None;
    let mut quote: Option<char> = None;
    let mut backslash_escapes = false;
    let mut comment_depth = 0usize;
    let mut in_line_comment = false;
    let mut chars = sql.chars().peekable();

    while let Some(c) = chars.next() {
        if in_line_comment {
            if c == '\n' {
                in_line_comment = false;
                current.push('\n');
            }
            continue;
        }

        if comment_depth > 0 {
            match c {
                '*' if chars.peek() == Some(&'/') => {
                    chars.next();
                    comment_depth -= 1;
                    if comment_depth == 0 {
                        current.push(' ');
                    }
                }
                '/' if chars.peek() == Some(&'*') => {
                    chars.next();
                    comment_depth += 1;
                }
                _ => {}
            }
            continue;
        }

        if let Some(tag) = &dollar_tag {
            current.push(c);
            if c == '$' && current.ends_with(tag.as_str()) {
                dollar_tag = None;
            }
            continue;
        }

        if let Some(open) = quote {
            current.push(c);
            if c == '\\' && backslash_escapes {
                if let Some(escaped) = chars.next() {
                    current.push(escaped);
                }
            } else if c == open {
                quote = None;
            }
            continue;
        }

        match c {
            '\'' => {
                // A doubled quote reopens the same literal
                if !current.ends_with('\'') {
                    backslash_escapes = has_escape_prefix(&current);
                }
                quote = Some(c);
                current.push(c);
            }
            '"' => {
                backslash_escapes = false;
                quote = Some(c);
                current.push(c);
            }
            '$' => {
                let mut tag = String::from("$");
                while let Some(&next) = chars.peek() {
                    if next.is_alphanumeric() || next == '_' {
                        tag.push(next);
                        chars.next();
                    } else {
                        break;
                    }
                }

                // `$1` is a parameter placeholder, not a tag
                let is_param = tag[1..].starts_with(|ch: char| ch.is_ascii_digit());
                if !is_param && chars.peek() == Some(&'$') {
                    chars.next();
                    tag.push('$');
                    current.push_str(&tag);
                    dollar_tag = Some(tag);
                } else {
                    current.push_str(&tag);
                }
            }
            '-' if chars.peek() == Some(&'-') => {
                chars.next();
                in_line_comment = true;
            }
            '/' if chars.peek() == Some(&'*') => {
                chars.next();
                comment_depth = 1;
            }
            ';' => flush(&mut current, &mut statements),
            _ => current.push(c),
        }
    }

    flush(&mut current, &mut statements);
    statements
}

/// Whether a quote opened right after `current` starts an `E'...'` string.
fn has_escape_prefix(current: &str) -> bool {
    let mut rev = current.chars().rev();
    match rev.next() {
        Some('E') | Some('e') => !matches!(rev.next(), Some(ch) if ch.is_alphanumeric() || ch == '_'),
        _ => false,
    }
}

fn flush(current: &mut String, statements: &mut Vec<String>) {
    let stmt = current.trim();
    if !stmt.is_empty() {
        statements.push(stmt.to_string());
    }
    current.clear();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_simple_statements() {
        let stmts = split_statements("SELECT 1; SELECT 2; SELECT 3;");
        assert_eq!(stmts, vec!["SELECT 1", "SELECT 2", "SELECT 3"]);
    }

    #[test]
    fn test_split_without_trailing_semicolon() {
        let stmts = split_statements("SELECT 1;\nSELECT 2");
        assert_eq!(stmts, vec!["SELECT 1", "SELECT 2"]);
    }

    #[test]
    fn test_split_with_dollar_quoted_function() {
        let sql = r#"
CREATE OR REPLACE FUNCTION touch() RETURNS TRIGGER AS $$
BEGIN
    NEW.updated_at = CURRENT_TIMESTAMP;
    RETURN NEW;
END;
$$ LANGUAGE plpgsql;

SELECT 3;
"#;
        let stmts = split_statements(sql);
        assert_eq!(stmts.len(), 2);
        assert!(stmts[0].starts_with("CREATE OR REPLACE FUNCTION"));
        assert!(stmts[0].contains("RETURN NEW;"));
        assert!(stmts[0].ends_with("$$ LANGUAGE plpgsql"));
        assert_eq!(stmts[1], "SELECT 3");
    }

    #[test]
    fn test_split_named_dollar_tag() {
        let sql = "CREATE FUNCTION f() RETURNS int AS $body$ SELECT 1; $body$ LANGUAGE sql; SELECT 2;";
        let stmts = split_statements(sql);
        assert_eq!(stmts.len(), 2);
        assert!(stmts[0].contains("$body$ SELECT 1; $body$"));
    }

    #[test]
    fn test_split_ignores_semicolon_in_literal() {
        let sql = "COMMENT ON TABLE t IS 'first; second'; SELECT 1;";
        let stmts = split_statements(sql);
        assert_eq!(stmts.len(), 2);
        assert_eq!(stmts[0], "COMMENT ON TABLE t IS 'first; second'");
    }

    #[test]
    fn test_split_escaped_quote_in_literal() {
        let sql = "COMMENT ON TABLE t IS 'it''s; fine'; SELECT 1;";
        let stmts = split_statements(sql);
        assert_eq!(stmts[0], "COMMENT ON TABLE t IS 'it''s; fine'");
    }

    #[test]
    fn test_split_drops_comments() {
        let sql = "-- leading comment\n-- another\nSELECT 1; -- trailing\n-- only comments here\n";
        let stmts = split_statements(sql);
        assert_eq!(stmts, vec!["SELECT 1"]);
    }

    #[test]
    fn test_split_keeps_double_dash_inside_literal() {
        let stmts = split_statements("SELECT '--not a comment';");
        assert_eq!(stmts, vec!["SELECT '--not a comment'"]);
    }

    #[test]
    fn test_split_parameter_placeholder() {
        let stmts = split_statements("SELECT $1; SELECT 2;");
        assert_eq!(stmts, vec!["SELECT $1", "SELECT 2"]);
    }

    #[test]
    fn test_split_drops_block_comment_header() {
        let sql = "/* users; v2 */\nCREATE TABLE IF NOT EXISTS users (id INT);";
        let stmts = split_statements(sql);
        assert_eq!(stmts, vec!["CREATE TABLE IF NOT EXISTS users (id INT)"]);
    }

    #[test]
    fn test_split_nested_block_comment() {
        let sql = "/* outer /* inner; */ still comment; */ SELECT 1; SELECT /* mid */ 2;";
        let stmts = split_statements(sql);
        assert_eq!(stmts, vec!["SELECT 1", "SELECT   2"]);
    }

    #[test]
    fn test_split_comment_only_block_vanishes() {
        let stmts = split_statements("SELECT 1;\n/* trailing; notes */\n");
        assert_eq!(stmts, vec!["SELECT 1"]);
    }

    #[test]
    fn test_split_keeps_comment_markers_inside_literal() {
        let stmts = split_statements("SELECT '/* not; a comment */';");
        assert_eq!(stmts, vec!["SELECT '/* not; a comment */'"]);
    }

    #[test]
    fn test_split_ignores_semicolon_in_quoted_identifier() {
        let sql = r#"COMMENT ON COLUMN users."a;b" IS 'x'; SELECT 1;"#;
        let stmts = split_statements(sql);
        assert_eq!(stmts, vec![r#"COMMENT ON COLUMN users."a;b" IS 'x'"#, "SELECT 1"]);
    }

    #[test]
    fn test_split_escape_string_backslash_quote() {
        let sql = r"COMMENT ON TABLE t IS E'it\'s; fine'; SELECT 1;";
        let stmts = split_statements(sql);
        assert_eq!(stmts, vec![r"COMMENT ON TABLE t IS E'it\'s; fine'", "SELECT 1"]);
    }

    #[test]
    fn test_split_escape_string_doubled_quote() {
        let sql = r"SELECT E'a''b\'c;d'; SELECT 2;";
        let stmts = split_statements(sql);
        assert_eq!(stmts, vec![r"SELECT E'a''b\'c;d'", "SELECT 2"]);
    }

    #[test]
    fn test_split_backslash_is_literal_in_plain_string() {
        let sql = r"SELECT 'C:\'; SELECT 2;";
        let stmts = split_statements(sql);
        assert_eq!(stmts, vec![r"SELECT 'C:\'", "SELECT 2"]);
    }
}
