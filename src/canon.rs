use std::fmt;

/// Normalized form of a URL: explicit scheme, lower-cased host, path (with
/// query and fragment) verbatim. The only key type the cache and expander
/// accept.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CanonicalUrl(String);

impl CanonicalUrl {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for CanonicalUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Normalizes a raw URL string. Pure, no I/O, idempotent.
///
/// Inputs without a scheme default to plain `http`. Only the host is
/// case-folded; the path keeps query strings and fragments untouched.
/// An empty host is not an error.
pub fn canonicalize(raw: &str) -> CanonicalUrl {
    let (scheme, rest) = match raw.split_once("://") {
        Some((scheme, rest)) => (scheme, rest),
        None => ("http", raw),
    };

    let (host, path) = match rest.find('/') {
        Some(idx) => (&rest[..idx], &rest[idx..]),
        None => (rest, ""),
    };

    CanonicalUrl(format!("{}://{}{}", scheme, host.to_lowercase(), path))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scheme_defaults_to_http() {
        assert_eq!(
            canonicalize("example.com/a").as_str(),
            "http://example.com/a"
        );
        assert_eq!(canonicalize("bit.ly/x").as_str(), "http://bit.ly/x");
    }

    #[test]
    fn test_existing_scheme_preserved() {
        assert_eq!(
            canonicalize("https://example.com/a").as_str(),
            "https://example.com/a"
        );
    }

    #[test]
    fn test_host_lowercased_path_untouched() {
        assert_eq!(
            canonicalize("HTTPS://Example.COM/Path?Q=1#Frag").as_str(),
            "HTTPS://example.com/Path?Q=1#Frag"
        );
    }

    #[test]
    fn test_no_path() {
        assert_eq!(canonicalize("Example.com").as_str(), "http://example.com");
        assert_eq!(
            canonicalize("http://example.com").as_str(),
            "http://example.com"
        );
    }

    #[test]
    fn test_empty_host_is_not_an_error() {
        assert_eq!(canonicalize("").as_str(), "http://");
        assert_eq!(canonicalize("http://").as_str(), "http://");
    }

    #[test]
    fn test_idempotent() {
        let samples = [
            "example.com/a",
            "HTTP://Example.COM/Path?Q=1#f",
            "https://a.b/c/d",
            "bit.ly/x",
            "",
            "///",
            "no spaces expected but tolerated",
            "http://example.com:8080/p?a=b://c",
        ];
        for raw in samples {
            let once = canonicalize(raw);
            let twice = canonicalize(once.as_str());
            assert_eq!(once, twice, "not idempotent for {:?}", raw);
        }
    }
}
