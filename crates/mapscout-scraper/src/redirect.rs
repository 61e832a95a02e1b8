//! Unwrapping of tracking/redirect links to their destination URL.

use reqwest::Url;

/// Query parameters that carry the destination in known wrapper links.
const TARGET_PARAMS: [&str; 4] = ["q", "url", "adurl", "u"];

// Base used only to parse relative wrapper links such as `/url?q=...`.
const RELATIVE_BASE: &str = "https://wrapper.invalid/";

/// Returns the destination embedded in a redirect-wrapper link, or `raw`
/// unchanged when it is not a wrapper or cannot be parsed.
///
/// Only absolute `http`/`https` destinations are unwrapped; a wrapper whose
/// parameter holds anything else is passed through as-is.
#[must_use]
pub fn resolve_redirect(raw: &str) -> String {
    let trimmed = raw.trim();
    let parsed = if trimmed.starts_with('/') && !trimmed.starts_with("//") {
        Url::parse(RELATIVE_BASE).and_then(|base| base.join(trimmed))
    } else {
        Url::parse(trimmed)
    };

    let Ok(url) = parsed else {
        return raw.to_owned();
    };

    TARGET_PARAMS
        .iter()
        .find_map(|name| {
            url.query_pairs()
                .find(|(key, _)| &**key == *name)
                .map(|(_, value)| value.into_owned())
                .filter(|value| is_absolute_http(value))
        })
        .unwrap_or_else(|| raw.to_owned())
}

fn is_absolute_http(value: &str) -> bool {
    Url::parse(value).is_ok_and(|u| matches!(u.scheme(), "http" | "https") && u.has_host())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unwraps_q_parameter() {
        assert_eq!(
            resolve_redirect("https://example.com/url?q=https://biz.example/"),
            "https://biz.example/"
        );
    }

    #[test]
    fn wrapper_without_target_param_passes_through() {
        let raw = "https://example.com/url?sa=t&source=web";
        assert_eq!(resolve_redirect(raw), raw);
    }

    #[test]
    fn decodes_percent_encoded_target() {
        assert_eq!(
            resolve_redirect("https://example.com/url?sa=U&url=https%3A%2F%2Fbiz.example%2Fmenu%3Fa%3D1"),
            "https://biz.example/menu?a=1"
        );
    }

    #[test]
    fn relative_wrapper_is_resolved() {
        assert_eq!(
            resolve_redirect("/url?q=https://lune.example/&sa=U&ved=abc"),
            "https://lune.example/"
        );
    }

    #[test]
    fn ad_click_wrapper_uses_adurl() {
        assert_eq!(
            resolve_redirect("https://example.com/aclk?sa=l&adurl=https://ads.example/landing"),
            "https://ads.example/landing"
        );
    }

    #[test]
    fn non_http_target_is_not_unwrapped() {
        let raw = "https://example.com/search?q=plumbers+austin";
        assert_eq!(resolve_redirect(raw), raw);
    }

    #[test]
    fn direct_url_is_unchanged() {
        assert_eq!(resolve_redirect("https://biz.example/"), "https://biz.example/");
    }

    #[test]
    fn unparseable_input_passes_through() {
        assert_eq!(resolve_redirect("not a url"), "not a url");
        assert_eq!(resolve_redirect("No Website"), "No Website");
    }
}
