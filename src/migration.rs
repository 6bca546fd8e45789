//! Apply the dialect's migration file at startup. Failures are logged, never fatal.
//! Postgres runs the file as one batch; mysql runs statement by statement and keeps going.

use crate::config::Dialect;
use crate::error::MigrationError;
use crate::ops_log::{OpsLevel, OpsLog};
use async_trait::async_trait;
use serde::Serialize;
use std::path::{Path, PathBuf};

pub const SCHEMA_FIX_FILE: &str = "mysql_schema_fix.sql";

const DELIMITER_OPEN: &str = "DELIMITER //";
const DELIMITER_CLOSE: &str = "DELIMITER ;";

/// Something that can run raw SQL text against the active database.
#[async_trait]
pub trait SqlExecutor: Send + Sync {
    fn dialect(&self) -> Dialect;
    /// Run a whole script (possibly many statements) in one round trip.
    async fn execute_batch(&self, sql: &str) -> Result<(), sqlx::Error>;
    /// Run a single statement; returns rows affected.
    async fn execute(&self, sql: &str) -> Result<u64, sqlx::Error>;
}

#[derive(Clone, Debug)]
pub struct MigrationOptions {
    pub dir: PathBuf,
}

impl MigrationOptions {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        MigrationOptions { dir: dir.into() }
    }

    pub fn file_for(&self, dialect: Dialect) -> PathBuf {
        self.dir.join(format!("{}.sql", dialect.name()))
    }
}

#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct FailedStatement {
    pub file: String,
    pub statement: String,
    pub error: String,
}

#[derive(Clone, Debug, Default, Serialize, PartialEq)]
pub struct MigrationReport {
    pub file: String,
    pub attempted: usize,
    pub succeeded: usize,
    pub failed: Vec<FailedStatement>,
    /// Set when the run stopped early (unreadable file, failed postgres batch).
    pub aborted: Option<String>,
}

impl MigrationReport {
    fn new(file: &Path) -> Self {
        MigrationReport {
            file: file.display().to_string(),
            ..Default::default()
        }
    }
}

/// Apply `<dir>/<dialect>.sql` (and, on mysql, the schema fix file). Never returns an error:
/// anything that goes wrong ends up in the report, in tracing, and in the operations log.
pub async fn apply_migrations(
    exec: &dyn SqlExecutor,
    opts: &MigrationOptions,
    ops: &OpsLog,
) -> MigrationReport {
    let path = opts.file_for(exec.dialect());
    let mut report = MigrationReport::new(&path);
    if let Err(e) = run(exec, opts, &path, ops, &mut report).await {
        tracing::error!(file = %report.file, error = %e, "migration aborted");
        ops.record(OpsLevel::Error, "migration", &format!("{}: {}", report.file, e))
            .await;
        report.aborted = Some(e.to_string());
    }
    tracing::info!(
        file = %report.file,
        attempted = report.attempted,
        succeeded = report.succeeded,
        failed = report.failed.len(),
        "migrations applied"
    );
    report
}

async fn run(
    exec: &dyn SqlExecutor,
    opts: &MigrationOptions,
    path: &Path,
    ops: &OpsLog,
    report: &mut MigrationReport,
) -> Result<(), MigrationError> {
    let Some(text) = read_optional(path).await? else {
        tracing::info!(file = %path.display(), "no migration file, skipping");
        ops.record(
            OpsLevel::Info,
            "migration",
            &format!("{} not found, skipped", path.display()),
        )
        .await;
        return Ok(());
    };

    match exec.dialect() {
        Dialect::Postgres => {
            report.attempted += 1;
            exec.execute_batch(&text).await?;
            report.succeeded += 1;
        }
        Dialect::MySql => {
            let file = path.display().to_string();
            run_each(exec, &file, split_statements(&text), ops, report).await;

            let fix = opts.dir.join(SCHEMA_FIX_FILE);
            if let Some(text) = read_optional(&fix).await? {
                let file = fix.display().to_string();
                run_each(exec, &file, split_schema_fix(&text), ops, report).await;
            }
        }
    }
    Ok(())
}

async fn read_optional(path: &Path) -> Result<Option<String>, MigrationError> {
    match tokio::fs::read_to_string(path).await {
        Ok(text) => Ok(Some(text)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(source) => Err(MigrationError::Io {
            path: path.display().to_string(),
            source,
        }),
    }
}

async fn run_each(
    exec: &dyn SqlExecutor,
    file: &str,
    statements: Vec<String>,
    ops: &OpsLog,
    report: &mut MigrationReport,
) {
    for stmt in statements {
        report.attempted += 1;
        match exec.execute(&stmt).await {
            Ok(_) => report.succeeded += 1,
            Err(e) => {
                tracing::warn!(file, statement = %excerpt(&stmt), error = %e, "migration statement failed");
                ops.record(
                    OpsLevel::Warn,
                    "migration",
                    &format!("{}: {} ({})", file, excerpt(&stmt), e),
                )
                .await;
                report.failed.push(FailedStatement {
                    file: file.to_string(),
                    statement: stmt,
                    error: e.to_string(),
                });
            }
        }
    }
}

fn excerpt(stmt: &str) -> String {
    let line = stmt.lines().next().unwrap_or_default();
    if line.chars().count() > 80 {
        format!("{}...", line.chars().take(80).collect::<String>())
    } else {
        line.to_string()
    }
}

/// Split a script on `;`, ignoring semicolons inside quotes, backticks and comments.
/// Comments are dropped; empty statements are skipped.
pub fn split_statements(sql: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut cur = String::new();
    let mut chars = sql.chars().peekable();
    let mut quote: Option<char> = None;

    while let Some(c) = chars.next() {
        if let Some(q) = quote {
            cur.push(c);
            if c == '\\' && q != '`' {
                if let Some(n) = chars.next() {
                    cur.push(n);
                }
            } else if c == q {
                quote = None;
            }
            continue;
        }
        match c {
            '\'' | '"' | '`' => {
                quote = Some(c);
                cur.push(c);
            }
            '-' if chars.peek() == Some(&'-') => skip_line(&mut chars),
            '#' => skip_line(&mut chars),
            '/' if chars.peek() == Some(&'*') => {
                chars.next();
                let mut prev = '\0';
                for n in chars.by_ref() {
                    if prev == '*' && n == '/' {
                        break;
                    }
                    prev = n;
                }
                cur.push(' ');
            }
            ';' => push_statement(&mut out, &mut cur),
            _ => cur.push(c),
        }
    }
    push_statement(&mut out, &mut cur);
    out
}

fn skip_line(chars: &mut std::iter::Peekable<std::str::Chars<'_>>) {
    for n in chars.by_ref() {
        if n == '\n' {
            break;
        }
    }
}

fn push_statement(out: &mut Vec<String>, cur: &mut String) {
    let stmt = cur.trim();
    if !stmt.is_empty() {
        out.push(stmt.to_string());
    }
    cur.clear();
}

/// Split the mysql schema fix file: statements before `DELIMITER //` run one by one, each
/// `//`-terminated unit after it runs whole, and statements after `DELIMITER ;` run one by one.
pub fn split_schema_fix(sql: &str) -> Vec<String> {
    let Some(open) = sql.find(DELIMITER_OPEN) else {
        return split_statements(sql);
    };
    let (pre, rest) = (&sql[..open], &sql[open + DELIMITER_OPEN.len()..]);
    let (block, post) = match rest.find(DELIMITER_CLOSE) {
        Some(close) => (&rest[..close], &rest[close + DELIMITER_CLOSE.len()..]),
        None => (rest, ""),
    };
    let mut out = split_statements(pre);
    out.extend(
        block
            .split("//")
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from),
    );
    out.extend(split_statements(post));
    out
}
