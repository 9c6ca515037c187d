/// Process-wide attachment configuration.
///
/// Constructed once at startup and handed to the pieces that need it;
/// read-only afterwards.
#[derive(Debug, Clone, Default)]
pub struct AttachConfig {
    /// Base url (scheme + authority) prepended to attachment urls.
    /// Urls stay relative while unset.
    pub host: Option<String>,

    /// Path segment inserted before the backend name in urls.
    pub prefix: Option<String>,

    /// Secret key for url signing. Signing is off while unset.
    pub secret: Option<String>,

    /// Ceiling for accepted upload sizes. Unlimited while unset.
    pub max_upload_bytes: Option<u64>,
}

impl AttachConfig {
    /// Create a new config with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the base url for generated attachment urls
    pub fn with_host<S: Into<String>>(mut self, host: S) -> Self {
        self.host = Some(host.into());
        self
    }

    /// Set the path prefix for generated attachment urls
    pub fn with_prefix<S: Into<String>>(mut self, prefix: S) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    /// Set the url signing secret
    pub fn with_secret<S: Into<String>>(mut self, secret: S) -> Self {
        self.secret = Some(secret.into());
        self
    }

    /// Set the upload size ceiling
    pub fn with_max_upload_bytes(mut self, bytes: u64) -> Self {
        self.max_upload_bytes = Some(bytes);
        self
    }
}
