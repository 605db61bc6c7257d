/// CSRF protection configuration
#[derive(Debug, Clone)]
pub struct CsrfConfig {
    /// Session key the real token is stored under
    pub session_key: String,

    /// Header name for CSRF token
    pub header_name: String,

    /// Form field name for CSRF token
    pub field_name: String,

    /// Path prefixes to exclude from CSRF protection
    pub exclude_paths: Vec<String>,
}

impl CsrfConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_session_key(mut self, key: impl Into<String>) -> Self {
        self.session_key = key.into();
        self
    }

    /// Set header name
    pub fn with_header_name(mut self, name: impl Into<String>) -> Self {
        self.header_name = name.into();
        self
    }

    /// Set field name
    pub fn with_field_name(mut self, name: impl Into<String>) -> Self {
        self.field_name = name.into();
        self
    }

    /// Add excluded paths
    pub fn with_exclude_paths(mut self, paths: Vec<String>) -> Self {
        self.exclude_paths = paths;
        self
    }
}

impl Default for CsrfConfig {
    fn default() -> Self {
        Self {
            session_key: "csrf_token".to_string(),
            header_name: "X-CSRF-Token".to_string(),
            field_name: "csrf_token".to_string(),
            exclude_paths: Vec::new(),
        }
    }
}
