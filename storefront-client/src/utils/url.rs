/// Path prefix the primary API is mounted under.
pub const API_PREFIX: &str = "/api";

fn is_absolute(path: &str) -> bool {
    path.starts_with("http://") || path.starts_with("https://")
}

/// Collapse a caller path that repeats the base URL's `/api` prefix.
///
/// With a base ending in `/api`, `/api/orders` becomes `/orders`. Repeated
/// prefixes are all removed so the result is stable under re-normalization.
pub fn normalize_path(base_url: &str, path: &str) -> String {
    if is_absolute(path) {
        return path.to_string();
    }

    let mut path = if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{}", path)
    };

    if base_url.trim_end_matches('/').ends_with(API_PREFIX) {
        let doubled = format!("{}/", API_PREFIX);
        while path.starts_with(&doubled) {
            path.replace_range(..API_PREFIX.len(), "");
        }
    }

    path
}

/// Full request URL for `path` under `base_url`.
pub fn join_url(base_url: &str, path: &str) -> String {
    let path = normalize_path(base_url, path);
    if is_absolute(&path) {
        return path;
    }
    format!("{}{}", base_url.trim_end_matches('/'), path)
}
