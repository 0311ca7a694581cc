use shared::domain::SessionState;
use tracing::warn;

pub const HOME_PATH: &str = "/";
pub const DASHBOARD_PATH: &str = "/dashboard";

/// Side-effect capability for navigation. Consumers request navigation
/// through this seam and never perform it themselves; the embedding UI
/// supplies the implementation.
pub trait Navigator: Send + Sync {
    fn redirect(&self, path: &str);
    fn back(&self);
}

pub struct MissingNavigator;

impl Navigator for MissingNavigator {
    fn redirect(&self, path: &str) {
        warn!(path, "navigation requested but no navigator is attached");
    }

    fn back(&self) {
        warn!("back navigation requested but no navigator is attached");
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathClass {
    Public,
    Protected,
}

/// Static route classification supplied at startup. Public paths match
/// exactly; everything else is protected. The prefixes name the guarded
/// sub-trees for `is_guarded_subtree`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteConfig {
    pub public_paths: Vec<String>,
    pub protected_prefixes: Vec<String>,
}

impl Default for RouteConfig {
    fn default() -> Self {
        Self {
            public_paths: vec![
                "/".to_string(),
                "/register".to_string(),
                "/forgot-password".to_string(),
            ],
            protected_prefixes: vec![
                "/dashboard".to_string(),
                "/interview".to_string(),
                "/questionnaire".to_string(),
            ],
        }
    }
}

impl RouteConfig {
    pub fn classify(&self, path: &str) -> PathClass {
        if self.public_paths.iter().any(|public| public == path) {
            PathClass::Public
        } else {
            PathClass::Protected
        }
    }

    /// Whether the path falls under a route the guard is mounted on: an
    /// exact public path, or a protected prefix and its sub-tree.
    pub fn is_guarded_subtree(&self, path: &str) -> bool {
        if self.public_paths.iter().any(|public| public == path) {
            return true;
        }
        self.protected_prefixes.iter().any(|prefix| {
            path == prefix || path.strip_prefix(prefix.as_str()).is_some_and(|rest| rest.starts_with('/'))
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteDecision {
    Allow,
    RedirectTo(String),
}

/// Per-navigation guard. `decide` is pure over the current session state
/// and must be re-evaluated on every navigation, before any protected
/// content is rendered.
#[derive(Debug, Clone, Default)]
pub struct RouteGuard {
    config: RouteConfig,
}

impl RouteGuard {
    pub fn new(config: RouteConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RouteConfig {
        &self.config
    }

    pub fn decide(&self, path: &str, session: &SessionState) -> RouteDecision {
        match self.config.classify(path) {
            PathClass::Public if session.identity.is_some() => {
                RouteDecision::RedirectTo(DASHBOARD_PATH.to_string())
            }
            PathClass::Protected if session.identity.is_none() => {
                RouteDecision::RedirectTo(HOME_PATH.to_string())
            }
            _ => RouteDecision::Allow,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::domain::{Identity, UserId};
    use uuid::Uuid;

    fn logged_in() -> SessionState {
        SessionState {
            identity: Some(Identity {
                id: UserId(Uuid::nil()),
                email: "jordan@example.com".to_string(),
                name: "jordan".to_string(),
            }),
            loading: false,
        }
    }

    fn logged_out() -> SessionState {
        SessionState {
            identity: None,
            loading: false,
        }
    }

    #[test]
    fn protected_path_without_identity_redirects_home() {
        let guard = RouteGuard::default();
        assert_eq!(
            guard.decide("/dashboard", &logged_out()),
            RouteDecision::RedirectTo("/".to_string())
        );
    }

    #[test]
    fn public_path_with_identity_redirects_to_dashboard() {
        let guard = RouteGuard::default();
        assert_eq!(
            guard.decide("/", &logged_in()),
            RouteDecision::RedirectTo("/dashboard".to_string())
        );
    }

    #[test]
    fn public_path_without_identity_is_allowed() {
        let guard = RouteGuard::default();
        assert_eq!(guard.decide("/register", &logged_out()), RouteDecision::Allow);
    }

    #[test]
    fn protected_path_with_identity_is_allowed() {
        let guard = RouteGuard::default();
        assert_eq!(
            guard.decide("/interview/abc-123", &logged_in()),
            RouteDecision::Allow
        );
    }

    #[test]
    fn classification_uses_exact_matches_for_public_paths() {
        let config = RouteConfig::default();
        assert_eq!(config.classify("/"), PathClass::Public);
        assert_eq!(config.classify("/register"), PathClass::Public);
        assert_eq!(config.classify("/register/extra"), PathClass::Protected);
        assert_eq!(config.classify("/anything-else"), PathClass::Protected);
    }

    #[test]
    fn guarded_subtrees_cover_prefixes_but_not_lookalikes() {
        let config = RouteConfig::default();
        assert!(config.is_guarded_subtree("/"));
        assert!(config.is_guarded_subtree("/dashboard"));
        assert!(config.is_guarded_subtree("/dashboard/interviews/7"));
        assert!(config.is_guarded_subtree("/questionnaire/q1"));
        assert!(!config.is_guarded_subtree("/dashboardy"));
        assert!(!config.is_guarded_subtree("/about"));
    }
}
