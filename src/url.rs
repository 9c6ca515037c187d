use crate::attacher::Attacher;
use crate::config::AttachConfig;
use crate::meta;
use crate::sign::Signer;
use crate::types::{FileId, UploadMetadata};

/// Presentation options for attachment urls. All independent and
/// composable; anything unset falls back to the config or the stored
/// metadata.
#[derive(Debug, Clone, Default)]
pub struct UrlOptions {
    pub host: Option<String>,
    pub prefix: Option<String>,
    pub filename: Option<String>,
    pub format: Option<String>,
}

impl UrlOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_host<S: Into<String>>(mut self, host: S) -> Self {
        self.host = Some(host.into());
        self
    }

    pub fn with_prefix<S: Into<String>>(mut self, prefix: S) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    pub fn with_filename<S: Into<String>>(mut self, filename: S) -> Self {
        self.filename = Some(filename.into());
        self
    }

    pub fn with_format<S: Into<String>>(mut self, format: S) -> Self {
        self.format = Some(format.into());
        self
    }
}

/// Deterministic url construction over `(backend name, id, presentation
/// options)`.
///
/// Template: `[host][/prefix]/<backend>/<id>/<filename>[.<format>]`.
/// No backend round trips are involved; everything needed is in the
/// metadata record and the options.
pub struct UrlBuilder<'a> {
    config: &'a AttachConfig,
}

impl<'a> UrlBuilder<'a> {
    pub fn new(config: &'a AttachConfig) -> Self {
        Self { config }
    }

    /// Canonical url for an attachment, `None` while the slot is empty.
    ///
    /// The attachment's declared name is the filename fallback.
    pub fn attachment_url(&self, attacher: &Attacher, options: &UrlOptions) -> Option<String> {
        let metadata = attacher.metadata()?;
        let backend_name = attacher.backend_name()?;
        Some(self.file_url(backend_name, metadata, attacher.name(), options))
    }

    /// Url for a bare metadata record with an explicit filename fallback
    pub fn file_url(
        &self,
        backend_name: &str,
        metadata: &UploadMetadata,
        fallback: &str,
        options: &UrlOptions,
    ) -> String {
        let filename = resolve_filename(metadata, fallback, options);

        let mut path = String::new();
        if let Some(prefix) = options.prefix.as_deref().or(self.config.prefix.as_deref()) {
            path.push('/');
            path.push_str(prefix.trim_matches('/'));
        }
        path.push('/');
        path.push_str(backend_name);
        path.push('/');
        path.push_str(metadata.id.as_str());
        path.push('/');
        // the whole segment is escaped, slashes included, so a filename
        // can never introduce extra path segments
        path.push_str(&urlencoding::encode(&filename));

        let path = match self.config.secret.as_deref() {
            Some(secret) => Signer::new(secret).append_signature(&path),
            None => path,
        };

        match options.host.as_deref().or(self.config.host.as_deref()) {
            Some(host) => format!("{}{}", host.trim_end_matches('/'), path),
            None => path,
        }
    }
}

/// Filename resolution: explicit option, then stored filename, then the
/// fallback. An explicit format always appends; otherwise one is
/// inferred from the stored content type when the resolved name carries
/// no extension of its own.
fn resolve_filename(metadata: &UploadMetadata, fallback: &str, options: &UrlOptions) -> String {
    let mut filename = options
        .filename
        .clone()
        .or_else(|| metadata.filename.clone())
        .unwrap_or_else(|| fallback.to_string());

    let format = options.format.clone().or_else(|| {
        if filename.contains('.') {
            None
        } else {
            metadata
                .content_type
                .as_deref()
                .and_then(meta::extension_for)
                .map(str::to_string)
        }
    });

    if let Some(format) = format {
        filename.push('.');
        filename.push_str(&format);
    }
    filename
}

/// Invert the canonical scheme: split a request path into
/// `(backend name, id, filename)`.
///
/// `prefix` must match what the urls were built with. Query strings are
/// the signature layer's business and must be split off beforehand.
pub fn parse_attachment_path<'p>(
    path: &'p str,
    prefix: Option<&str>,
) -> Option<(&'p str, FileId, String)> {
    let mut rest = path.strip_prefix('/')?;
    if let Some(prefix) = prefix {
        rest = rest
            .strip_prefix(prefix.trim_matches('/'))?
            .strip_prefix('/')?;
    }

    let mut parts = rest.splitn(3, '/');
    let backend_name = parts.next()?;
    let id = parts.next()?;
    let filename = parts.next()?;
    if backend_name.is_empty() || id.is_empty() || filename.is_empty() || filename.contains('/') {
        return None;
    }

    let filename = urlencoding::decode(filename).ok()?.into_owned();
    Some((backend_name, FileId::from_string(id.to_string()), filename))
}
