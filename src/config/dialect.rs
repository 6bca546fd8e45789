//! Dialect selection: which SQL backend the process talks to.

use serde::Serialize;
use std::fmt;

/// Active SQL dialect. Resolved once at startup and passed down explicitly.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    Postgres,
    MySql,
}

impl Dialect {
    pub const ALL: [Dialect; 2] = [Dialect::Postgres, Dialect::MySql];

    /// Parse a configured name. Unknown names yield None.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" | "pg" => Some(Dialect::Postgres),
            "mysql" | "mariadb" => Some(Dialect::MySql),
            _ => None,
        }
    }

    /// Name used for migration files and logs.
    pub fn name(self) -> &'static str {
        match self {
            Dialect::Postgres => "postgres",
            Dialect::MySql => "mysql",
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Signals available on client code paths (a browser page, or a request carrying them).
#[derive(Clone, Debug, Default)]
pub struct ClientContext {
    /// Current hostname, e.g. from `location.hostname` or the `Host` header.
    pub hostname: Option<String>,
    /// Explicit override, e.g. `?db=mysql`.
    pub dialect_override: Option<String>,
    /// Host that is served by the MySQL-backed deployment.
    pub mysql_site_host: Option<String>,
}

impl ClientContext {
    fn on_mysql_site(&self) -> bool {
        match (&self.hostname, &self.mysql_site_host) {
            (Some(host), Some(site)) => host.eq_ignore_ascii_case(site),
            _ => false,
        }
    }
}

/// Resolve the dialect: explicit override > hostname > configured default (postgres when unset).
pub fn resolve_dialect(configured: Option<&str>, client: Option<&ClientContext>) -> Dialect {
    if let Some(ctx) = client {
        if let Some(d) = ctx.dialect_override.as_deref().and_then(Dialect::from_name) {
            return d;
        }
        if ctx.on_mysql_site() {
            return Dialect::MySql;
        }
    }
    configured
        .and_then(Dialect::from_name)
        .unwrap_or(Dialect::Postgres)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx(host: Option<&str>, over: Option<&str>) -> ClientContext {
        ClientContext {
            hostname: host.map(String::from),
            dialect_override: over.map(String::from),
            mysql_site_host: Some("guild.example.net".into()),
        }
    }

    #[test]
    fn configured_value_is_the_default() {
        assert_eq!(resolve_dialect(Some("mysql"), None), Dialect::MySql);
        assert_eq!(resolve_dialect(Some("PostgreSQL"), None), Dialect::Postgres);
        assert_eq!(resolve_dialect(None, None), Dialect::Postgres);
        assert_eq!(resolve_dialect(Some("oracle"), None), Dialect::Postgres);
    }

    #[test]
    fn hostname_beats_configuration() {
        let c = ctx(Some("GUILD.example.net"), None);
        assert_eq!(resolve_dialect(Some("postgres"), Some(&c)), Dialect::MySql);
        let other = ctx(Some("localhost"), None);
        assert_eq!(resolve_dialect(Some("postgres"), Some(&other)), Dialect::Postgres);
    }

    #[test]
    fn override_beats_hostname() {
        let c = ctx(Some("guild.example.net"), Some("postgres"));
        assert_eq!(resolve_dialect(Some("mysql"), Some(&c)), Dialect::Postgres);
        let unknown = ctx(Some("guild.example.net"), Some("sqlite"));
        assert_eq!(resolve_dialect(None, Some(&unknown)), Dialect::MySql);
    }

    #[test]
    fn resolution_is_stable() {
        let c = ctx(Some("localhost"), Some("mysql"));
        let first = resolve_dialect(Some("postgres"), Some(&c));
        let second = resolve_dialect(Some("postgres"), Some(&c));
        assert_eq!(first, second);
    }
}
