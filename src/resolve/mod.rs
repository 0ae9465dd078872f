//! URL and path resolution for source names
//!
//! A pure resolver with standard relative-URL semantics, sufficient for
//! the URLs that appear in source maps: absolute URLs with schemes,
//! protocol-relative URLs, absolute paths, and relative paths (including
//! ones that climb above their base with `..`).

/// How an input string addresses its target, ordered from most relative
/// to fully absolute. Resolution copies every component the input lacks
/// from the base, starting at the input's own level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum UrlKind {
    Empty,
    Hash,
    Query,
    RelativePath,
    AbsolutePath,
    SchemeRelative,
    Absolute,
}

#[derive(Debug, Clone)]
struct Url {
    kind: UrlKind,
    /// Includes the trailing `:`, e.g. `"https:"`.
    scheme: String,
    /// Includes the trailing `@` when present.
    user: String,
    host: String,
    /// Includes the leading `:` when present.
    port: String,
    /// Always stored with a leading `/`.
    path: String,
    /// Includes the leading `?` when present.
    query: String,
    /// Includes the leading `#` when present.
    hash: String,
}

impl Url {
    fn relative(kind: UrlKind, path: String, query: String, hash: String) -> Self {
        Url {
            kind,
            scheme: String::new(),
            user: String::new(),
            host: String::new(),
            port: String::new(),
            path,
            query,
            hash,
        }
    }
}

/// Split `rest` (everything after the authority) into path, query, hash.
fn split_path_query_hash(rest: &str) -> (&str, &str, &str) {
    let (before_hash, hash) = match rest.find('#') {
        Some(i) => rest.split_at(i),
        None => (rest, ""),
    };
    let (path, query) = match before_hash.find('?') {
        Some(i) => before_hash.split_at(i),
        None => (before_hash, ""),
    };
    (path, query, hash)
}

fn is_scheme(s: &str) -> bool {
    !s.is_empty()
        && s.bytes()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'+' | b'.' | b'-' | b'_'))
}

/// Parse `scheme://authority/path?query#hash`. Returns `None` when the
/// input has no `scheme://` prefix.
fn try_parse_absolute(input: &str) -> Option<Url> {
    let colon = input.find(':')?;
    let (scheme, rest) = input.split_at(colon);
    if !is_scheme(scheme) {
        return None;
    }
    let rest = rest.strip_prefix("://")?;

    let authority_end = rest.find(['/', '?', '#']).unwrap_or(rest.len());
    let (authority, tail) = rest.split_at(authority_end);
    let (user, host_port) = match authority.rfind('@') {
        Some(i) => authority.split_at(i + 1),
        None => ("", authority),
    };
    let (host, port) = match host_port.find(':') {
        Some(i) => host_port.split_at(i),
        None => (host_port, ""),
    };

    let (path, query, hash) = split_path_query_hash(tail);
    let path = if path.is_empty() {
        "/".to_string()
    } else {
        path.to_string()
    };

    Some(Url {
        kind: UrlKind::Absolute,
        scheme: format!("{scheme}:"),
        user: user.to_string(),
        host: host.to_string(),
        port: port.to_string(),
        path,
        query: query.to_string(),
        hash: hash.to_string(),
    })
}

fn parse_url(input: &str) -> Url {
    if let Some(rest) = input.strip_prefix("//") {
        let mut url = try_parse_absolute(&format!("http://{rest}"))
            .unwrap_or_else(|| Url::relative(UrlKind::SchemeRelative, "/".to_string(), String::new(), String::new()));
        url.scheme = String::new();
        url.kind = UrlKind::SchemeRelative;
        return url;
    }

    if input.starts_with('/') {
        let (path, query, hash) = split_path_query_hash(input);
        return Url::relative(
            UrlKind::AbsolutePath,
            path.to_string(),
            query.to_string(),
            hash.to_string(),
        );
    }

    if let Some(url) = try_parse_absolute(input) {
        return url;
    }

    let kind = if input.is_empty() {
        UrlKind::Empty
    } else if input.starts_with('#') {
        UrlKind::Hash
    } else if input.starts_with('?') {
        UrlKind::Query
    } else {
        UrlKind::RelativePath
    };
    let (path, query, hash) = split_path_query_hash(input);
    Url::relative(kind, format!("/{path}"), query.to_string(), hash.to_string())
}

/// Collapse `.` and `..` path segments. Relative paths keep excess `..`
/// parents; a segment removed by `..` leaves a trailing slash behind.
fn normalize_path(path: &str, relative: bool) -> String {
    let mut kept: Vec<&str> = Vec::new();
    let mut trailing_slash = false;

    for piece in path.split('/').skip(1) {
        if piece.is_empty() {
            trailing_slash = true;
            continue;
        }
        trailing_slash = false;
        if piece == "." {
            continue;
        }
        if piece == ".." {
            match kept.last() {
                Some(&"..") | None => {
                    if relative {
                        kept.push(piece);
                    }
                }
                Some(_) => {
                    kept.pop();
                    trailing_slash = true;
                }
            }
            continue;
        }
        kept.push(piece);
    }

    let mut out = String::new();
    for piece in &kept {
        out.push('/');
        out.push_str(piece);
    }
    if out.is_empty() || (trailing_slash && !out.ends_with("/..")) {
        out.push('/');
    }
    out
}

/// Merge a relative input path onto its base path. A bare `/` input path
/// (query/hash/empty inputs) takes the base path wholesale.
fn merge_paths(url: &mut Url, base: &Url) {
    let base_path = normalize_path(&base.path, base.kind <= UrlKind::RelativePath);
    if url.path == "/" {
        url.path = base_path;
    } else {
        url.path = format!("{}{}", strip_path_filename(&base_path), url.path);
    }
}

fn strip_path_filename(path: &str) -> &str {
    match path.rfind('/') {
        Some(i) => &path[..=i],
        None => "",
    }
}

fn starts_relative(input: &str) -> bool {
    input.starts_with('.')
}

/// Resolve `input` against an optional `base`, with standard
/// relative-URL semantics.
pub fn resolve(input: &str, base: &str) -> String {
    if input.is_empty() && base.is_empty() {
        return String::new();
    }

    let mut url = parse_url(input);
    let mut kind = url.kind;

    if !base.is_empty() && kind != UrlKind::Absolute {
        let base_url = parse_url(base);

        if kind <= UrlKind::Hash {
            if kind == UrlKind::Empty {
                url.hash = base_url.hash.clone();
            }
            url.query = base_url.query.clone();
        }
        if kind <= UrlKind::RelativePath {
            merge_paths(&mut url, &base_url);
        }
        if kind <= UrlKind::AbsolutePath {
            // The user, host, and port travel together.
            url.user = base_url.user.clone();
            url.host = base_url.host.clone();
            url.port = base_url.port.clone();
        }
        if kind <= UrlKind::SchemeRelative {
            url.scheme = base_url.scheme.clone();
        }

        if base_url.kind > kind {
            kind = base_url.kind;
        }
    }

    url.path = normalize_path(&url.path, kind <= UrlKind::RelativePath);
    let query_hash = format!("{}{}", url.query, url.hash);

    match kind {
        UrlKind::Empty | UrlKind::Hash | UrlKind::Query => query_hash,
        UrlKind::RelativePath => {
            let path = &url.path[1..];
            if path.is_empty() {
                return if query_hash.is_empty() {
                    ".".to_string()
                } else {
                    query_hash
                };
            }
            let anchor = if base.is_empty() { input } else { base };
            if starts_relative(anchor) && !starts_relative(path) {
                return format!("./{path}{query_hash}");
            }
            format!("{path}{query_hash}")
        }
        UrlKind::AbsolutePath => format!("{}{}", url.path, query_hash),
        _ => format!(
            "{}//{}{}{}{}{}",
            url.scheme, url.user, url.host, url.port, url.path, query_hash
        ),
    }
}

/// Remove the final path component of a URL, keeping the trailing slash.
pub fn strip_filename(url: &str) -> &str {
    match url.rfind('/') {
        Some(i) => &url[..=i],
        None => "",
    }
}
