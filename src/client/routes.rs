//! Environment route resolver: logical API path → concrete URL path for the current deployment.
//!
//! The MySQL-backed production site serves authentication endpoints as standalone `.php` files,
//! so a fixed set of logical paths is rewritten there (and on generic hosts). Every resolved
//! path carries a `t=<epoch-ms>` cache buster.

use std::fmt;
use std::sync::Arc;

pub const API_PREFIX: &str = "/api";
pub const AUTH_PREFIX: &str = "/api/auth";
pub const DEFAULT_DEV_HOSTS: [&str; 3] = ["localhost", "127.0.0.1", "::1"];

/// Logical path → concrete path. Immutable, shared by every resolver.
pub static ROUTE_OVERRIDES: [(&str, &str); 7] = [
    ("/api/auth/status", "/auth-status.php"),
    ("/api/auth/bnet", "/auth-bnet.php"),
    ("/api/auth/bnet/callback", "/auth-callback.php"),
    ("/api/auth/bnet-direct", "/auth-bnet-direct.php"),
    ("/api/auth/logout", "/auth-logout.php"),
    ("/api/auth/user", "/auth-user.php"),
    ("/api/auth/my-characters", "/auth-my-characters.php"),
];

const LOGIN_DIRECT: &str = "/auth-bnet-direct.php";
const LOGIN_CALLBACK: &str = "/auth-callback.php";
const LOGIN: &str = "/auth-bnet.php";

pub type SiteProbe = Arc<dyn Fn() -> bool + Send + Sync>;
pub type Clock = Arc<dyn Fn() -> i64 + Send + Sync>;

/// Split `path?query` into the path and the `?query` suffix (empty when absent).
fn split_query(logical: &str) -> (&str, &str) {
    match logical.find('?') {
        Some(i) => logical.split_at(i),
        None => (logical, ""),
    }
}

/// Override entry for a logical path, ignoring any query string.
pub fn override_for(logical: &str) -> Option<&'static str> {
    let (path, _) = split_query(logical);
    ROUTE_OVERRIDES
        .iter()
        .find(|(from, _)| *from == path)
        .map(|(_, to)| *to)
}

/// Authentication endpoint, in logical (`/api/auth/...`) or concrete (`/auth-*.php`) form.
pub fn is_auth_path(path: &str) -> bool {
    let (path, _) = split_query(path);
    path == AUTH_PREFIX
        || path.starts_with("/api/auth/")
        || path.starts_with("/auth/")
        || path.starts_with("/auth-")
}

/// Remove a trailing `t=<digits>` cache buster added by [`RouteResolver::resolve`].
pub fn strip_cache_buster(url: &str) -> &str {
    let Some(i) = url.rfind("t=") else {
        return url;
    };
    let digits = &url[i + 2..];
    let sep_ok = i > 0 && matches!(url.as_bytes()[i - 1], b'?' | b'&');
    if sep_ok && !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()) {
        &url[..i - 1]
    } else {
        url
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Environment {
    Development,
    MySqlSite,
    Generic,
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Environment::Development => "development",
            Environment::MySqlSite => "mysql-site",
            Environment::Generic => "generic",
        })
    }
}

/// Full-page navigation, as opposed to a fetch.
pub trait Navigator {
    fn navigate(&self, url: &str);
}

#[derive(Clone)]
pub struct ResolverConfig {
    pub hostname: String,
    /// Host served by the MySQL-backed deployment.
    pub mysql_site_host: Option<String>,
    pub dev_hosts: Vec<String>,
    /// When set, its result replaces the hostname comparison with `mysql_site_host`.
    pub mysql_site_probe: Option<SiteProbe>,
}

impl ResolverConfig {
    pub fn new(hostname: impl Into<String>) -> Self {
        ResolverConfig {
            hostname: hostname.into(),
            mysql_site_host: None,
            dev_hosts: DEFAULT_DEV_HOSTS.iter().map(|h| h.to_string()).collect(),
            mysql_site_probe: None,
        }
    }

    pub fn mysql_site_host(mut self, host: impl Into<String>) -> Self {
        self.mysql_site_host = Some(host.into());
        self
    }

    pub fn mysql_site_probe(mut self, probe: impl Fn() -> bool + Send + Sync + 'static) -> Self {
        self.mysql_site_probe = Some(Arc::new(probe));
        self
    }
}

impl fmt::Debug for ResolverConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolverConfig")
            .field("hostname", &self.hostname)
            .field("mysql_site_host", &self.mysql_site_host)
            .field("dev_hosts", &self.dev_hosts)
            .field("mysql_site_probe", &self.mysql_site_probe.is_some())
            .finish()
    }
}

#[derive(Clone)]
pub struct RouteResolver {
    config: ResolverConfig,
    clock: Clock,
}

impl fmt::Debug for RouteResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteResolver")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl RouteResolver {
    pub fn new(config: ResolverConfig) -> Self {
        RouteResolver {
            config,
            clock: Arc::new(|| chrono::Utc::now().timestamp_millis()),
        }
    }

    /// Replace the cache-buster clock (epoch milliseconds).
    pub fn with_clock(mut self, clock: impl Fn() -> i64 + Send + Sync + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    pub fn environment(&self) -> Environment {
        let on_site = match &self.config.mysql_site_probe {
            Some(probe) => probe(),
            None => self
                .config
                .mysql_site_host
                .as_deref()
                .is_some_and(|site| site.eq_ignore_ascii_case(&self.config.hostname)),
        };
        if on_site {
            Environment::MySqlSite
        } else if self.is_dev_host() {
            Environment::Development
        } else {
            Environment::Generic
        }
    }

    fn is_dev_host(&self) -> bool {
        let host = self.config.hostname.to_ascii_lowercase();
        host.ends_with(".local") || self.config.dev_hosts.iter().any(|h| h.eq_ignore_ascii_case(&host))
    }

    fn with_cache_buster(&self, path: &str) -> String {
        let sep = if path.contains('?') { '&' } else { '?' };
        format!("{}{}t={}", path, sep, (self.clock)())
    }

    fn concrete_path(&self, logical: &str) -> String {
        match (self.environment(), override_for(logical)) {
            (Environment::MySqlSite | Environment::Generic, Some(to)) => {
                let (_, query) = split_query(logical);
                format!("{}{}", to, query)
            }
            _ => logical.to_string(),
        }
    }

    /// Concrete path for a fetch, cache buster included.
    pub fn resolve(&self, logical: &str) -> String {
        let resolved = self.with_cache_buster(&self.concrete_path(logical));
        tracing::trace!(logical, resolved = %resolved, env = %self.environment(), "route resolved");
        resolved
    }

    /// Alternative path to try once after a 404 on `logical`, if this environment has one.
    pub fn fallback_for_not_found(&self, logical: &str) -> Option<String> {
        let (path, query) = split_query(logical);
        match self.environment() {
            Environment::MySqlSite if is_auth_path(path) => {
                let last = path.rsplit('/').find(|s| !s.is_empty())?;
                Some(self.with_cache_buster(&format!("/auth-{}.php{}", last, query)))
            }
            Environment::Generic => {
                let stripped = path.strip_prefix(API_PREFIX).filter(|p| p.starts_with('/'))?;
                Some(self.with_cache_buster(&format!("{}{}", stripped, query)))
            }
            _ => None,
        }
    }

    /// Target of a full-page navigation to `logical`.
    pub fn redirect_target(&self, logical: &str) -> String {
        let (path, query) = split_query(logical);
        if !is_auth_path(path) || self.environment() == Environment::Development {
            return self.resolve(logical);
        }
        let target = if path.ends_with("/bnet-direct") || path.ends_with("/direct") {
            LOGIN_DIRECT
        } else if path.ends_with("/callback") {
            LOGIN_CALLBACK
        } else if path.ends_with("/bnet") || path.ends_with("/login") {
            LOGIN
        } else {
            return self.resolve(logical);
        };
        self.with_cache_buster(&format!("{}{}", target, query))
    }

    /// Navigate to `logical`; returns the URL handed to the navigator.
    pub fn redirect(&self, logical: &str, navigator: &dyn Navigator) -> String {
        let url = self.redirect_target(logical);
        tracing::debug!(logical, url = %url, "redirect");
        navigator.navigate(&url);
        url
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    fn fixed(config: ResolverConfig) -> RouteResolver {
        RouteResolver::new(config).with_clock(|| 1_700_000_000_000)
    }

    fn site() -> RouteResolver {
        fixed(ResolverConfig::new("guild.example.com").mysql_site_host("guild.example.com"))
    }

    fn generic() -> RouteResolver {
        fixed(ResolverConfig::new("guild.onrender.com").mysql_site_host("guild.example.com"))
    }

    fn dev() -> RouteResolver {
        fixed(ResolverConfig::new("localhost").mysql_site_host("guild.example.com"))
    }

    #[test]
    fn environment_detection() {
        assert_eq!(site().environment(), Environment::MySqlSite);
        assert_eq!(generic().environment(), Environment::Generic);
        assert_eq!(dev().environment(), Environment::Development);
        assert_eq!(
            fixed(ResolverConfig::new("box.local")).environment(),
            Environment::Development
        );
        assert_eq!(
            fixed(ResolverConfig::new("GUILD.example.com").mysql_site_host("guild.example.com"))
                .environment(),
            Environment::MySqlSite
        );
    }

    #[test]
    fn probe_replaces_hostname_check() {
        let on = fixed(ResolverConfig::new("localhost").mysql_site_probe(|| true));
        assert_eq!(on.environment(), Environment::MySqlSite);
        let off = fixed(
            ResolverConfig::new("guild.example.com")
                .mysql_site_host("guild.example.com")
                .mysql_site_probe(|| false),
        );
        assert_eq!(off.environment(), Environment::Generic);
    }

    #[test]
    fn user_route_on_site_and_in_development() {
        assert_eq!(site().resolve("/api/auth/user"), "/auth-user.php?t=1700000000000");
        assert_eq!(dev().resolve("/api/auth/user"), "/api/auth/user?t=1700000000000");
        assert_eq!(generic().resolve("/api/auth/user"), "/auth-user.php?t=1700000000000");
    }

    #[test]
    fn non_override_paths_pass_through() {
        assert_eq!(site().resolve("/api/roster"), "/api/roster?t=1700000000000");
        assert_eq!(
            site().resolve("/api/roster?guild=1"),
            "/api/roster?guild=1&t=1700000000000"
        );
    }

    #[test]
    fn every_override_ends_in_php() {
        for (from, to) in ROUTE_OVERRIDES {
            assert!(from.starts_with(AUTH_PREFIX));
            assert!(to.ends_with(".php"));
            assert_eq!(site().resolve(from), format!("{}?t=1700000000000", to));
        }
    }

    #[test]
    fn resolution_is_idempotent_modulo_timestamp() {
        let r = RouteResolver::new(ResolverConfig::new("guild.example.com").mysql_site_host("guild.example.com"));
        for path in ["/api/auth/status", "/api/roster", "/api/raids?tier=1"] {
            let a = r.resolve(path);
            let b = r.resolve(path);
            assert_eq!(strip_cache_buster(&a), strip_cache_buster(&b));
        }
    }

    #[test]
    fn strip_cache_buster_only_removes_trailing_stamp() {
        assert_eq!(strip_cache_buster("/a?t=123"), "/a");
        assert_eq!(strip_cache_buster("/a?x=1&t=123"), "/a?x=1");
        assert_eq!(strip_cache_buster("/a?t=abc"), "/a?t=abc");
        assert_eq!(strip_cache_buster("/cat=1"), "/cat=1");
    }

    #[test]
    fn not_found_fallbacks() {
        assert_eq!(
            site().fallback_for_not_found("/api/auth/bnet/callback").as_deref(),
            Some("/auth-callback.php?t=1700000000000")
        );
        assert_eq!(site().fallback_for_not_found("/api/roster"), None);
        assert_eq!(
            generic().fallback_for_not_found("/api/auth/status").as_deref(),
            Some("/auth/status?t=1700000000000")
        );
        assert_eq!(
            generic().fallback_for_not_found("/api/roster?x=1").as_deref(),
            Some("/roster?x=1&t=1700000000000")
        );
        assert_eq!(generic().fallback_for_not_found("/roster"), None);
        assert_eq!(dev().fallback_for_not_found("/api/auth/status"), None);
    }

    struct Recorder(Mutex<Vec<String>>);

    impl Navigator for Recorder {
        fn navigate(&self, url: &str) {
            self.0.lock().unwrap().push(url.to_string());
        }
    }

    #[test]
    fn redirect_branches_by_purpose() {
        let nav = Recorder(Mutex::new(Vec::new()));
        let r = site();
        r.redirect("/api/auth/bnet-direct", &nav);
        r.redirect("/api/auth/bnet/callback?code=x", &nav);
        r.redirect("/api/auth/bnet?returnTo=/roster", &nav);
        r.redirect("/api/auth/logout", &nav);
        dev().redirect("/api/auth/bnet", &nav);
        assert_eq!(
            *nav.0.lock().unwrap(),
            vec![
                "/auth-bnet-direct.php?t=1700000000000",
                "/auth-callback.php?code=x&t=1700000000000",
                "/auth-bnet.php?returnTo=/roster&t=1700000000000",
                "/auth-logout.php?t=1700000000000",
                "/api/auth/bnet?t=1700000000000",
            ]
        );
    }
}
