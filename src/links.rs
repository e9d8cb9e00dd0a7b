//! Link and URL helpers shared by both backend dialects.
//!
//! Confluence hands back links in several shapes: absolute URLs, paths
//! rooted at the site context (`/spaces/KEY/pages/1`), and bare relative
//! paths. Everything funnels through [`to_web_url`] so callers never see
//! a doubled or missing slash at the join point.

use url::Url;

/// Strips every trailing `/` from a URL.
pub fn ensure_no_trailing_slash(url: &str) -> &str {
    url.trim_end_matches('/')
}

/// Joins `base` and `path` with exactly one `/` between them.
///
/// Trailing slashes on `base` are dropped; a missing leading slash on
/// `path` is supplied.
pub fn join_url(base: &str, path: &str) -> String {
    let sep = if path.starts_with('/') { "" } else { "/" };
    format!("{}{}{}", ensure_no_trailing_slash(base), sep, path)
}

/// Joins `base` and `path` and sets the `expand` query parameter when
/// `expand` is non-empty.
pub fn join_url_with_expand(
    base: &str,
    path: &str,
    expand: Option<&str>,
) -> Result<Url, url::ParseError> {
    let mut url = Url::parse(&join_url(base, path))?;
    if let Some(expand) = expand.filter(|e| !e.is_empty()) {
        url.query_pairs_mut().append_pair("expand", expand);
    }
    Ok(url)
}

/// Builds `<api_root>/rest/api/content/<id>?expand=<expand>`.
///
/// The id is pushed as a single path segment, so reserved characters in
/// it are percent-encoded instead of changing the path.
pub fn content_url(api_root: &str, id: &str, expand: &str) -> Result<Url, url::ParseError> {
    let mut url = join_url_with_expand(api_root, "/rest/api/content", Some(expand))?;
    if let Ok(mut segments) = url.path_segments_mut() {
        segments.pop_if_empty().push(id);
    }
    Ok(url)
}

/// Resolves a web UI link reported by Confluence into an absolute URL.
///
/// Absolute `http(s)://` links pass through unchanged. Anything else is
/// treated as a path under `base_url`, regardless of whether it carries a
/// leading slash or the base carries a trailing one.
///
/// Returns `None` for a missing or empty link, or when the pair cannot be
/// parsed as a URL.
pub fn to_web_url(base_url: &str, webui: Option<&str>) -> Option<String> {
    let webui = webui.filter(|w| !w.is_empty())?;

    if is_absolute_http(webui) {
        return Some(webui.to_string());
    }

    let base = format!("{}/", ensure_no_trailing_slash(base_url));
    let base = Url::parse(&base).ok()?;
    base.join(webui.trim_start_matches('/'))
        .ok()
        .map(|u| u.to_string())
}

/// Returns the Confluence Cloud REST root, which always lives under `/wiki`.
///
/// Cloud sites are configured either as `https://x.atlassian.net` or
/// `https://x.atlassian.net/wiki`; both resolve to the latter.
pub fn cloud_wiki_base(base_url: &str) -> String {
    let base = ensure_no_trailing_slash(base_url);
    if base.ends_with("/wiki") {
        base.to_string()
    } else {
        format!("{}/wiki", base)
    }
}

fn is_absolute_http(s: &str) -> bool {
    let lower = s.get(..8).unwrap_or(s).to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}
