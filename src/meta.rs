use std::collections::HashMap;

use once_cell::sync::Lazy;

use crate::stream::UploadInfo;

/// Extension to MIME type table.
///
/// Replaceable data asset: extend it here when a deployment needs more
/// types. Where several extensions share a type, the canonical one is
/// listed first and wins the reverse lookup.
static EXT_TO_MIME: &[(&str, &str)] = &[
    ("avi", "video/x-msvideo"),
    ("bmp", "image/bmp"),
    ("css", "text/css"),
    ("csv", "text/csv"),
    ("doc", "application/msword"),
    ("docx", "application/vnd.openxmlformats-officedocument.wordprocessingml.document"),
    ("gif", "image/gif"),
    ("gz", "application/gzip"),
    ("html", "text/html"),
    ("htm", "text/html"),
    ("ico", "image/vnd.microsoft.icon"),
    ("jpg", "image/jpeg"),
    ("jpeg", "image/jpeg"),
    ("js", "text/javascript"),
    ("json", "application/json"),
    ("md", "text/markdown"),
    ("mov", "video/quicktime"),
    ("mp3", "audio/mpeg"),
    ("mp4", "video/mp4"),
    ("ogg", "audio/ogg"),
    ("pdf", "application/pdf"),
    ("png", "image/png"),
    ("svg", "image/svg+xml"),
    ("tar", "application/x-tar"),
    ("tiff", "image/tiff"),
    ("tif", "image/tiff"),
    ("txt", "text/plain"),
    ("wav", "audio/wav"),
    ("webm", "video/webm"),
    ("webp", "image/webp"),
    ("xls", "application/vnd.ms-excel"),
    ("xlsx", "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"),
    ("xml", "application/xml"),
    ("zip", "application/zip"),
];

static MIME_LOOKUP: Lazy<HashMap<&'static str, &'static str>> =
    Lazy::new(|| EXT_TO_MIME.iter().copied().collect());

static EXT_LOOKUP: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    let mut map = HashMap::new();
    for (ext, mime) in EXT_TO_MIME {
        map.entry(*mime).or_insert(*ext);
    }
    map
});

/// Determine a filename for an upload source.
///
/// Prefers an explicitly declared filename, then the last segment of the
/// source's path. Directory components are stripped whichever separator
/// style they use.
pub fn extract_filename(source: &dyn UploadInfo) -> Option<String> {
    if let Some(name) = source.original_filename() {
        return last_segment(name);
    }
    source
        .path()
        .and_then(|path| last_segment(&path.to_string_lossy()))
}

/// Determine a content type for an upload source.
///
/// Prefers an explicitly declared type, then a case-insensitive
/// extension lookup on the extracted filename. Unknown extensions map
/// to `None` rather than a guess.
pub fn extract_content_type(source: &dyn UploadInfo) -> Option<String> {
    if let Some(content_type) = source.content_type() {
        return Some(content_type.to_string());
    }
    let filename = extract_filename(source)?;
    let (_, extension) = filename.rsplit_once('.')?;
    content_type_for(extension).map(str::to_string)
}

/// MIME type registered for an extension (case-insensitive)
pub fn content_type_for(extension: &str) -> Option<&'static str> {
    MIME_LOOKUP
        .get(extension.to_ascii_lowercase().as_str())
        .copied()
}

/// Canonical extension for a MIME type, used for url format inference
pub fn extension_for(content_type: &str) -> Option<&'static str> {
    EXT_LOOKUP.get(content_type).copied()
}

fn last_segment(value: &str) -> Option<String> {
    let segment = value.rsplit(['/', '\\']).next()?;
    if segment.is_empty() {
        None
    } else {
        Some(segment.to_string())
    }
}
