//! Keyword classification of raw SQL text.
//!
//! Three independent tests live here and they can disagree:
//! `is_dangerous` gates execution, `is_read_only` drives analyst mode and
//! `is_modification` only labels results. `INSERT`, `UPDATE` and `CREATE`
//! are modifications but not dangerous.

use regex::{Regex, RegexSet};
use serde::Serialize;
use std::sync::LazyLock;

static DANGEROUS_PATTERNS: LazyLock<RegexSet> = LazyLock::new(|| {
    RegexSet::new([
        r"(?i)\bDROP\s+TABLE\b",
        r"(?i)\bDROP\s+DATABASE\b",
        r"(?i)\bTRUNCATE\b",
        r"(?i)\bDELETE\s+FROM\b",
        r"(?i)\bALTER\s+TABLE\b",
        r"(?i)\bDROP\s+COLUMN\b",
        r"(?i)\bDROP\s+INDEX\b",
    ])
    .unwrap()
});

static READ_ONLY_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^\s*(SELECT|SHOW|DESCRIBE|EXPLAIN)\b").unwrap());

static PROFILING_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^(EXPLAIN\s+)?ANALYZE\b").unwrap());

static MODIFICATION_PREFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*(INSERT|UPDATE|DELETE|CREATE|DROP|ALTER|TRUNCATE)").unwrap()
});

/// Both flags may be false (`SET`, `INSERT`, ...), meaning "allowed, no warning".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Classification {
    pub is_dangerous: bool,
    pub is_read_only: bool,
}

impl Classification {
    pub fn of(sql: &str) -> Self {
        Self {
            is_dangerous: is_dangerous(sql),
            is_read_only: is_read_only(sql),
        }
    }
}

/// Destructive clause anywhere in the text, not only at the start.
pub fn is_dangerous(sql: &str) -> bool {
    DANGEROUS_PATTERNS.is_match(sql)
}

pub fn is_read_only(sql: &str) -> bool {
    READ_ONLY_PREFIX.is_match(sql)
}

/// Result label only; never used for gating.
pub fn is_modification(sql: &str) -> bool {
    MODIFICATION_PREFIX.is_match(sql)
}

/// Drops leading whitespace, `--` line comments and `/* */` block comments.
/// An unterminated comment swallows the rest of the text.
pub fn strip_leading_comments(sql: &str) -> &str {
    let mut rest = sql.trim_start();
    loop {
        if let Some(comment) = rest.strip_prefix("--") {
            rest = comment.split_once('\n').map_or("", |(_, tail)| tail).trim_start();
        } else if let Some(comment) = rest.strip_prefix("/*") {
            rest = comment.split_once("*/").map_or("", |(_, tail)| tail).trim_start();
        } else {
            return rest;
        }
    }
}

/// `ANALYZE` and `EXPLAIN ANALYZE` run the statement they wrap.
pub fn is_profiling(sql: &str) -> bool {
    PROFILING_PREFIX.is_match(strip_leading_comments(sql))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dangerous_patterns() {
        for sql in [
            "DROP TABLE users",
            "drop   database shop",
            "TRUNCATE orders",
            "delete from orders where id = 1",
            "ALTER TABLE users ADD COLUMN age INT",
            "alter table users drop column age",
            "DROP INDEX idx_users_email",
        ] {
            assert!(is_dangerous(sql), "expected dangerous: {}", sql);
        }
    }

    #[test]
    fn test_dangerous_matches_anywhere() {
        assert!(is_dangerous("-- cleanup\nDELETE FROM orders"));
        assert!(is_dangerous("SELECT 1;\n  drop table x"));
    }

    #[test]
    fn test_dangerous_needs_word_boundaries() {
        assert!(!is_dangerous("SELECT * FROM dropdown_tables"));
        assert!(!is_dangerous("SELECT truncated FROM logs"));
        assert!(!is_dangerous("SELECT deleted FROM audit"));
    }

    #[test]
    fn test_read_only_prefix() {
        assert!(is_read_only("SELECT * FROM users"));
        assert!(is_read_only("   show tables"));
        assert!(is_read_only("\n\tDESCRIBE users"));
        assert!(is_read_only("explain select 1"));
        assert!(!is_read_only("INSERT INTO users VALUES (1)"));
        assert!(!is_read_only("SELECTED"));
        assert!(!is_read_only("WITH x AS (SELECT 1) SELECT * FROM x"));
    }

    #[test]
    fn test_sets_are_not_complements() {
        for sql in [
            "INSERT INTO t VALUES (1)",
            "UPDATE t SET a = 1",
            "CREATE TABLE t (a INT)",
            "SET threads = 4",
        ] {
            assert_eq!(
                Classification::of(sql),
                Classification {
                    is_dangerous: false,
                    is_read_only: false
                },
                "{}",
                sql
            );
        }
    }

    #[test]
    fn test_modification_is_broader_than_dangerous() {
        assert!(is_modification("INSERT INTO t VALUES (1)"));
        assert!(is_modification("update t set a = 1"));
        assert!(is_modification("CREATE TABLE t (a INT)"));
        assert!(is_modification("DELETE FROM t"));
        assert!(!is_modification("SELECT * FROM t WHERE note = 'DELETE FROM'"));
        assert!(!is_dangerous("INSERT INTO t VALUES (1)"));
    }

    #[test]
    fn test_strip_leading_comments() {
        assert_eq!(strip_leading_comments("  SELECT 1"), "SELECT 1");
        assert_eq!(strip_leading_comments("-- list\nSELECT 1"), "SELECT 1");
        assert_eq!(
            strip_leading_comments("/* a */ -- b\n\t/* c\n */SELECT 1 -- tail"),
            "SELECT 1 -- tail"
        );
        assert_eq!(strip_leading_comments("-- only a comment"), "");
        assert_eq!(strip_leading_comments("/* open"), "");
    }

    #[test]
    fn test_profiling_prefix() {
        assert!(is_profiling("ANALYZE DELETE FROM orders"));
        assert!(is_profiling("explain   analyze select 1"));
        assert!(is_profiling("-- note\nEXPLAIN ANALYZE DELETE FROM orders"));
        assert!(is_profiling("/* x */ analyze"));
        assert!(!is_profiling("EXPLAIN SELECT 1"));
        assert!(!is_profiling("SELECT analyze FROM t"));
        assert!(!is_profiling("ANALYZED"));
    }
}
