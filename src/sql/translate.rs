//! Rewrite PostgreSQL-flavoured SQL text into something MySQL accepts.
//!
//! This is string rewriting, not parsing. Single-quoted literals are set aside before any step
//! runs and put back at the end, so their contents are never rewritten. It is lossy by contract:
//! casts it cannot map (compound casts, array casts, unknown types) are dropped, and `RETURNING`
//! clauses are removed without a replacement value (callers that need the generated id must
//! fetch it themselves; see `service::records`).

use crate::config::Dialect;
use regex::{Captures, Regex};
use std::sync::LazyLock;

/// Identifiers MySQL reserves that the schema or hand-written queries use as column names.
pub const MYSQL_RESERVED_WORDS: &[&str] = &[
    "rank", "order", "key", "group", "where", "option", "read", "index", "join", "limit",
    "values", "update", "default",
];

/// Hand-written MySQL replacement for the session store's table statement.
pub const SESSION_TABLE_MYSQL: &str = "CREATE TABLE IF NOT EXISTS `session` (\
`sid` VARCHAR(255) NOT NULL, \
`sess` JSON NOT NULL, \
`expire` DATETIME(6) NOT NULL, \
PRIMARY KEY (`sid`), \
INDEX `IDX_session_expire` (`expire`)\
) ENGINE=InnoDB DEFAULT CHARSET=utf8mb4";

const SLOT_OPEN: char = '\u{E000}';
const SLOT_CLOSE: char = '\u{E001}';

static SESSION_TABLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)^\s*CREATE\s+TABLE\b.*?["`]?\bsession\b["`]?\s*\(.*::"#)
        .expect("valid session table regex")
});

static COMPOUND_CAST: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\)::[A-Za-z_][A-Za-z0-9_]*(?:\[\])?").expect("valid compound cast regex")
});

static SIMPLE_CAST: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?i)((?:"[^"]+"|[A-Za-z_][A-Za-z0-9_]*)(?:\.(?:"[^"]+"|[A-Za-z_][A-Za-z0-9_]*))*)::(text|jsonb|json|integer|int|boolean|bool|date|timestamp)\b(\[\])?"#,
    )
    .expect("valid simple cast regex")
});

static RESIDUAL_CAST: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"::\s*[A-Za-z_][A-Za-z0-9_]*(?:\[\])?").expect("valid residual cast regex")
});

/// A column followed by one or more `->` / `->>` steps whose keys are masked literals.
static JSON_CHAIN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"((?:[A-Za-z_][A-Za-z0-9_]*\.)?[A-Za-z_][A-Za-z0-9_]*)((?:\s*->>?\s*\x{E000}\d+\x{E001})+)",
    )
    .expect("valid json chain regex")
});

static JSON_STEP: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(->>?)\s*\x{E000}(\d+)\x{E001}").expect("valid json step regex")
});

static LITERAL_SLOT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\x{E000}(\d+)\x{E001}").expect("valid literal slot regex"));

static RETURNING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)\s+RETURNING\s+(?:\*|[A-Za-z_`"][\w`".]*(?:\s*,\s*[A-Za-z_`"][\w`".]*)*)"#)
        .expect("valid returning regex")
});

/// Something the translator dropped without an exact equivalent.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TranslateWarning {
    ResidualCastStripped { cast: String },
    ReturningRemoved { clause: String },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Translation {
    pub sql: String,
    pub warnings: Vec<TranslateWarning>,
}

/// Translate `sql` for `dialect`. Identity for postgres.
///
/// Reserved words are matched in lower case only; upper-case spellings are keywords. Lower-case
/// `order by`, `group by`, `limit <n>` and `values (` are read as keywords too. Any other bare
/// lower-case reserved word is taken as an identifier and backticked.
pub fn translate(sql: &str, dialect: Dialect) -> String {
    translate_with_report(sql, dialect).sql
}

/// Translate and report what was dropped along the way.
pub fn translate_with_report(sql: &str, dialect: Dialect) -> Translation {
    if dialect == Dialect::Postgres {
        return Translation {
            sql: sql.to_string(),
            warnings: Vec::new(),
        };
    }

    if SESSION_TABLE.is_match(sql) {
        tracing::debug!(before = %sql, after = %SESSION_TABLE_MYSQL, "session table statement replaced");
        return Translation {
            sql: SESSION_TABLE_MYSQL.to_string(),
            warnings: Vec::new(),
        };
    }

    let mut warnings = Vec::new();
    let (masked, literals) = mask_literals(sql);

    let out = COMPOUND_CAST.replace_all(&masked, ")").into_owned();

    let out = SIMPLE_CAST
        .replace_all(&out, |caps: &Captures| {
            if caps.get(3).is_some() {
                warnings.push(TranslateWarning::ResidualCastStripped {
                    cast: format!("::{}[]", &caps[2]),
                });
                return caps[1].to_string();
            }
            format!("CAST({} AS {})", &caps[1], mysql_cast_type(&caps[2]))
        })
        .into_owned();

    let out = RESIDUAL_CAST
        .replace_all(&out, |caps: &Captures| {
            warnings.push(TranslateWarning::ResidualCastStripped {
                cast: caps[0].to_string(),
            });
            String::new()
        })
        .into_owned();

    let out = JSON_CHAIN
        .replace_all(&out, |caps: &Captures| json_extract(&caps[1], &caps[2], &literals))
        .into_owned();

    let out = quote_reserved_words(&out);

    let out = RETURNING
        .replace_all(&out, |caps: &Captures| {
            warnings.push(TranslateWarning::ReturningRemoved {
                clause: caps[0].trim().to_string(),
            });
            String::new()
        })
        .into_owned();

    let out = unmask_literals(&out, &literals);

    if out != sql {
        tracing::debug!(before = %sql, after = %out, "translated SQL for mysql");
    }
    for w in &warnings {
        match w {
            TranslateWarning::ResidualCastStripped { cast } => {
                tracing::warn!(cast = %cast, "stripped cast with no MySQL mapping")
            }
            TranslateWarning::ReturningRemoved { clause } => {
                tracing::warn!(clause = %clause, "removed RETURNING clause; no value is returned on mysql")
            }
        }
    }

    Translation { sql: out, warnings }
}

fn mysql_cast_type(pg: &str) -> &'static str {
    match pg.to_ascii_lowercase().as_str() {
        "text" => "CHAR",
        "json" | "jsonb" => "JSON",
        "int" | "integer" => "SIGNED",
        "bool" | "boolean" => "UNSIGNED",
        "date" => "DATE",
        "timestamp" => "DATETIME",
        _ => "CHAR",
    }
}

/// `JSON_EXTRACT` over the whole arrow chain; unquoted when the last step is `->>`.
fn json_extract(column: &str, chain: &str, literals: &[String]) -> String {
    let mut path = String::from("$");
    let mut unquote = false;
    for step in JSON_STEP.captures_iter(chain) {
        unquote = &step[1] == "->>";
        path.push_str(&json_path_segment(&literal_text(literal(literals, &step[2]))));
    }
    let extract = format!("JSON_EXTRACT({}, '{}')", column, path.replace('\'', "''"));
    if unquote {
        format!("JSON_UNQUOTE({})", extract)
    } else {
        extract
    }
}

fn json_path_segment(key: &str) -> String {
    let plain = !key.is_empty()
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
        && !key.starts_with(|c: char| c.is_ascii_digit());
    if plain {
        format!(".{}", key)
    } else {
        format!(".\"{}\"", key.replace('"', "\\\""))
    }
}

/// Replace each single-quoted literal with a numbered slot. Quoted identifiers pass through.
fn mask_literals(sql: &str) -> (String, Vec<String>) {
    let chars: Vec<char> = sql.chars().collect();
    let mut out = String::with_capacity(sql.len());
    let mut literals = Vec::new();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        if c == '\'' || c == '"' || c == '`' {
            let end = closing_quote(&chars, i);
            let run: String = chars[i..end].iter().collect();
            if c == '\'' {
                out.push(SLOT_OPEN);
                out.push_str(&literals.len().to_string());
                out.push(SLOT_CLOSE);
                literals.push(run);
            } else {
                out.push_str(&run);
            }
            i = end;
            continue;
        }
        out.push(c);
        i += 1;
    }
    (out, literals)
}

fn unmask_literals(sql: &str, literals: &[String]) -> String {
    LITERAL_SLOT
        .replace_all(sql, |caps: &Captures| literal(literals, &caps[1]).to_string())
        .into_owned()
}

fn literal<'a>(literals: &'a [String], slot: &str) -> &'a str {
    slot.parse::<usize>()
        .ok()
        .and_then(|i| literals.get(i))
        .map(String::as_str)
        .unwrap_or_default()
}

/// Contents of a quoted literal, with doubled quotes collapsed.
fn literal_text(quoted: &str) -> String {
    let inner = quoted
        .strip_prefix('\'')
        .map(|s| s.strip_suffix('\'').unwrap_or(s))
        .unwrap_or(quoted);
    inner.replace("''", "'")
}

/// Backtick bare lowercase reserved words outside quotes, unless a `(` follows (function call)
/// or the word is in one of the lower-case keyword positions `translate` documents.
fn quote_reserved_words(sql: &str) -> String {
    let chars: Vec<char> = sql.chars().collect();
    let mut out = String::with_capacity(sql.len() + 8);
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        if c == '\'' || c == '"' || c == '`' {
            let end = closing_quote(&chars, i);
            out.extend(&chars[i..end]);
            i = end;
            continue;
        }
        if is_word_char(c) {
            let start = i;
            while i < chars.len() && is_word_char(chars[i]) {
                i += 1;
            }
            let word: String = chars[start..i].iter().collect();
            let called = chars.get(i) == Some(&'(');
            if !called
                && MYSQL_RESERVED_WORDS.contains(&word.as_str())
                && !used_as_keyword(&word, &chars[i..])
            {
                out.push('`');
                out.push_str(&word);
                out.push('`');
            } else {
                out.push_str(&word);
            }
            continue;
        }
        out.push(c);
        i += 1;
    }
    out
}

fn used_as_keyword(word: &str, rest: &[char]) -> bool {
    let next_char = rest.iter().find(|c| !c.is_whitespace());
    let next_word: String = rest
        .iter()
        .skip_while(|c| c.is_whitespace())
        .take_while(|c| is_word_char(**c))
        .collect();
    match word {
        "order" | "group" => next_word.eq_ignore_ascii_case("by"),
        "limit" => matches!(next_char, Some(c) if c.is_ascii_digit() || *c == '?'),
        "values" => next_char == Some(&'('),
        _ => false,
    }
}

fn is_word_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '$'
}

/// Index one past the quote that closes the quoted run starting at `start`.
/// Doubled quotes and backslash escapes stay inside the run; an unterminated run ends the input.
fn closing_quote(chars: &[char], start: usize) -> usize {
    let q = chars[start];
    let mut i = start + 1;
    while i < chars.len() {
        if chars[i] == '\\' && q != '`' {
            i += 2;
            continue;
        }
        if chars[i] == q {
            if chars.get(i + 1) == Some(&q) {
                i += 2;
                continue;
            }
            return i + 1;
        }
        i += 1;
    }
    chars.len()
}
