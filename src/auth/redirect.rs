/// Where a finished sign-in lands when no usable target was given.
pub const DEFAULT_NEXT: &str = "/main";

const BASE_ORIGIN: &str = "http://dinespot.internal/";

/// Keep post-login redirects on this site. Anything that is not a plain
/// absolute path (schemes, `//host`, backslashes, control characters) falls
/// back to [`DEFAULT_NEXT`].
pub fn sanitize_next(next: Option<&str>) -> String {
    let Some(next) = next.map(str::trim).filter(|n| !n.is_empty()) else {
        return DEFAULT_NEXT.to_string();
    };

    let plain_path = next.starts_with('/')
        && !next.starts_with("//")
        && !next.contains('\\')
        && !next.chars().any(char::is_control);
    if !plain_path {
        return DEFAULT_NEXT.to_string();
    }

    // Browsers resolve the Location header against our origin; make sure it
    // cannot resolve anywhere else.
    let stays_home = url::Url::parse(BASE_ORIGIN)
        .and_then(|base| base.join(next))
        .map(|u| u.host_str() == Some("dinespot.internal"))
        .unwrap_or(false);

    if stays_home {
        next.to_string()
    } else {
        DEFAULT_NEXT.to_string()
    }
}
