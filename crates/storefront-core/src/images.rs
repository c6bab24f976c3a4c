//! Menu image URLs.
//!
//! Admins paste Google Drive share links (or bare file ids) into the menu
//! sheet. Drive serves the same file under several URL shapes with varying
//! reliability, so a client tries [`drive_url_candidates`] in order and keeps
//! the first one that loaded in [`ResolvedImages`].

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;
use url::Url;

/// Inline SVG shown when no candidate loads.
pub const PLACEHOLDER_IMG: &str = "data:image/svg+xml;utf8,<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"640\" height=\"360\"><rect width=\"100%\" height=\"100%\" fill=\"%23f3f4f6\"/><text x=\"50%\" y=\"50%\" font-family=\"Arial, sans-serif\" font-size=\"20\" fill=\"%239ca3af\" text-anchor=\"middle\" dominant-baseline=\"middle\">No image</text></svg>";

/// Placeholder token in a proxy template.
pub const PROXY_URL_TOKEN: &str = "${url}";

static RAW_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_-]{10,}$").expect("Invalid Drive id regex"));

static DRIVE_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"drive\.google\.com/file/d/([A-Za-z0-9_-]+)",
        r"drive\.google\.com/open\?id=([A-Za-z0-9_-]+)",
        r"drive\.google\.com/uc\?id=([A-Za-z0-9_-]+)",
        r"drive\.google\.com/thumbnail\?id=([A-Za-z0-9_-]+)",
        r"drive\.usercontent\.google\.com/uc\?id=([A-Za-z0-9_-]+)",
        r"lh3\.googleusercontent\.com/d/([A-Za-z0-9_-]+)",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("Invalid Drive URL regex"))
    .collect()
});

/// Extracts a Google Drive file id from a bare id or a Drive URL. Returns
/// `None` when the input is neither.
///
/// # Examples
///
/// ```
/// use storefront_core::images::extract_drive_id;
///
/// let url = "https://drive.google.com/file/d/1AbCdEfGhIjK_lmn/view?usp=sharing";
/// assert_eq!(extract_drive_id(url).as_deref(), Some("1AbCdEfGhIjK_lmn"));
/// assert_eq!(extract_drive_id("https://example.com/a.png"), None);
/// ```
pub fn extract_drive_id(input: &str) -> Option<String> {
    let s = input.trim();
    if s.is_empty() {
        return None;
    }
    if RAW_ID.is_match(s) && !s.contains("http") {
        return Some(s.to_string());
    }
    for re in DRIVE_PATTERNS.iter() {
        if let Some(m) = re.captures(s).and_then(|c| c.get(1)) {
            return Some(m.as_str().to_string());
        }
    }
    Url::parse(s).ok().and_then(|url| {
        url.query_pairs()
            .find(|(k, v)| k == "id" && !v.is_empty())
            .map(|(_, v)| v.into_owned())
    })
}

/// Percent-encodes like `encodeURIComponent`, with spaces as `%20`.
pub fn encode_component(s: &str) -> String {
    url::form_urlencoded::byte_serialize(s.as_bytes())
        .collect::<String>()
        .replace('+', "%20")
}

/// Optional image proxy (e.g. an image-resizing worker).
///
/// The base is either a template containing `${url}`, or a prefix to which
/// the encoded URL is appended (with a `/` separator when missing).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImageProxy {
    base: Option<String>,
}

impl ImageProxy {
    /// Creates a proxy; an empty base disables it.
    pub fn new(base: impl AsRef<str>) -> Self {
        let base = base.as_ref().trim();
        Self {
            base: (!base.is_empty()).then(|| base.to_string()),
        }
    }

    /// A proxy that passes URLs through.
    pub fn disabled() -> Self {
        Self::default()
    }

    /// Returns `true` when a proxy base is set.
    pub fn is_enabled(&self) -> bool {
        self.base.is_some()
    }

    /// Wraps `url` with the proxy, if any.
    pub fn wrap(&self, url: &str) -> String {
        let Some(base) = &self.base else {
            return url.to_string();
        };
        let encoded = encode_component(url);
        if base.contains(PROXY_URL_TOKEN) {
            base.replacen(PROXY_URL_TOKEN, &encoded, 1)
        } else if base.ends_with('/') {
            format!("{base}{encoded}")
        } else {
            format!("{base}/{encoded}")
        }
    }

    /// Origin of the proxy host, for connection warm-up.
    pub fn origin(&self) -> Option<String> {
        let base = self.base.as_ref()?;
        let sample = base.replace(PROXY_URL_TOKEN, "https://x");
        let url = Url::parse(&sample).ok()?;
        Some(url.origin().ascii_serialization())
    }
}

/// Candidate URLs for an image, best first, each wrapped by `proxy`.
///
/// A Drive id yields seven Drive/lh3 variants. Anything else yields the
/// input itself followed by [`PLACEHOLDER_IMG`].
pub fn drive_url_candidates(input: &str, proxy: &ImageProxy) -> Vec<String> {
    let raw = match extract_drive_id(input) {
        Some(id) => vec![
            format!("https://drive.usercontent.google.com/uc?id={id}&export=view"),
            format!("https://lh3.googleusercontent.com/d/{id}=w2000"),
            format!("https://lh3.googleusercontent.com/d/{id}"),
            format!("https://drive.google.com/thumbnail?id={id}&sz=w2000"),
            format!("https://drive.google.com/uc?export=view&id={id}"),
            format!("https://drive.google.com/uc?id={id}"),
            format!("https://drive.google.com/uc?export=download&id={id}"),
        ],
        None => vec![input.to_string(), PLACEHOLDER_IMG.to_string()],
    };
    raw.iter().map(|u| proxy.wrap(u)).collect()
}

/// Hosts worth warming up before the first image loads.
pub fn preconnect_hosts(proxy: &ImageProxy) -> Vec<String> {
    let mut hosts = vec![
        "https://lh3.googleusercontent.com".to_string(),
        "https://drive.usercontent.google.com".to_string(),
        "https://drive.google.com".to_string(),
    ];
    if let Some(origin) = proxy.origin()
        && !hosts.contains(&origin)
    {
        hosts.push(origin);
    }
    hosts
}

/// First candidate that loaded, keyed by item id and by original URL.
#[derive(Debug, Clone, Default)]
pub struct ResolvedImages {
    by_key: HashMap<String, String>,
}

impl ResolvedImages {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolved URL for an item, looked up by id then by original URL.
    pub fn get(&self, item_id: &str, original: &str) -> Option<&str> {
        self.by_key
            .get(item_id)
            .or_else(|| self.by_key.get(original))
            .map(String::as_str)
    }

    /// Records the candidate that loaded.
    pub fn record(&mut self, item_id: &str, original: &str, resolved: impl Into<String>) {
        let resolved = resolved.into();
        if !item_id.is_empty() {
            self.by_key.insert(item_id.to_string(), resolved.clone());
        }
        if !original.is_empty() {
            self.by_key.insert(original.to_string(), resolved);
        }
    }

    /// Candidates still to try for an item: the resolved URL alone when
    /// known, the full list otherwise.
    pub fn candidates(&self, item_id: &str, original: &str, proxy: &ImageProxy) -> Vec<String> {
        match self.get(item_id, original) {
            Some(url) => vec![url.to_string()],
            None => drive_url_candidates(original, proxy),
        }
    }

    /// Number of cached keys.
    pub fn len(&self) -> usize {
        self.by_key.len()
    }

    /// Returns `true` when nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.by_key.is_empty()
    }
}
