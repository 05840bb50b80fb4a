use std::sync::OnceLock;

use http::header::{self, HeaderMap, HeaderName, HeaderValue};
use regex::Regex;
use relay_config::{HeaderRuleConfig, is_header_pattern};

/// Compiled rule for building outbound provider headers
#[derive(Debug, Clone)]
pub enum HeaderRule {
    /// Forward a header from the incoming request
    Forward {
        name: NameOrPattern,
        rename: Option<HeaderName>,
        default: Option<HeaderValue>,
    },
    /// Insert a static header value
    Insert { name: HeaderName, value: HeaderValue },
    /// Remove a header set by an earlier rule
    Remove { name: NameOrPattern },
}

/// Either a specific header name or a regex pattern
#[derive(Debug, Clone)]
pub enum NameOrPattern {
    Name(HeaderName),
    Pattern(Regex),
}

impl NameOrPattern {
    fn matches(&self, candidate: &HeaderName) -> bool {
        match self {
            Self::Name(name) => name == candidate,
            Self::Pattern(pattern) => pattern.is_match(candidate.as_str()),
        }
    }
}

/// Failure compiling a configured header rule
#[derive(Debug, thiserror::Error)]
pub enum HeaderRuleError {
    #[error("invalid header name '{0}'")]
    Name(String),
    #[error("invalid header value for '{0}'")]
    Value(String),
    #[error("invalid header pattern '{0}': {1}")]
    Pattern(String, regex::Error),
}

impl TryFrom<&HeaderRuleConfig> for HeaderRule {
    type Error = HeaderRuleError;

    fn try_from(config: &HeaderRuleConfig) -> Result<Self, Self::Error> {
        let rule = match config {
            HeaderRuleConfig::Forward(forward) => Self::Forward {
                name: name_or_pattern(&forward.name)?,
                rename: forward.rename.as_deref().map(header_name).transpose()?,
                default: forward
                    .default
                    .as_deref()
                    .map(|value| header_value(&forward.name, value))
                    .transpose()?,
            },
            HeaderRuleConfig::Insert(insert) => Self::Insert {
                name: header_name(&insert.name)?,
                value: header_value(&insert.name, &insert.value)?,
            },
            HeaderRuleConfig::Remove(remove) => Self::Remove {
                name: name_or_pattern(&remove.name)?,
            },
        };

        Ok(rule)
    }
}

impl HeaderRule {
    /// Compile a list of configured rules, preserving order
    ///
    /// # Errors
    ///
    /// Returns the first rule that fails to compile
    pub fn compile_all(configs: &[HeaderRuleConfig]) -> Result<Vec<Self>, HeaderRuleError> {
        configs.iter().map(Self::try_from).collect()
    }
}

fn header_name(name: &str) -> Result<HeaderName, HeaderRuleError> {
    HeaderName::try_from(name).map_err(|_| HeaderRuleError::Name(name.to_owned()))
}

fn header_value(name: &str, value: &str) -> Result<HeaderValue, HeaderRuleError> {
    HeaderValue::try_from(value).map_err(|_| HeaderRuleError::Value(name.to_owned()))
}

fn name_or_pattern(raw: &str) -> Result<NameOrPattern, HeaderRuleError> {
    if is_header_pattern(raw) {
        Regex::new(raw)
            .map(NameOrPattern::Pattern)
            .map_err(|e| HeaderRuleError::Pattern(raw.to_owned(), e))
    } else {
        header_name(raw).map(NameOrPattern::Name)
    }
}

/// Headers that must never be forwarded to the provider
static DENY_LIST: OnceLock<[HeaderName; 15]> = OnceLock::new();

/// Get the header deny list
pub fn get_deny_list() -> &'static [HeaderName] {
    DENY_LIST.get_or_init(|| {
        [
            header::ACCEPT,
            header::ACCEPT_CHARSET,
            header::ACCEPT_ENCODING,
            header::CONTENT_LENGTH,
            header::CONTENT_TYPE,
            header::CONNECTION,
            HeaderName::from_static("keep-alive"),
            header::PROXY_AUTHENTICATE,
            header::PROXY_AUTHORIZATION,
            header::TE,
            header::TRAILER,
            header::TRANSFER_ENCODING,
            header::UPGRADE,
            header::ORIGIN,
            header::HOST,
        ]
    })
}

/// Check if a header name is in the deny list
pub fn is_header_denied(name: &HeaderName) -> bool {
    get_deny_list().contains(name)
}

/// Apply header rules to build the header map for an outgoing request
///
/// Rules run in order; a later rule sees what earlier rules produced.
pub fn apply_header_rules(incoming: &HeaderMap, rules: &[HeaderRule]) -> HeaderMap {
    let mut result = HeaderMap::new();

    for rule in rules {
        match rule {
            HeaderRule::Forward { name, rename, default } => {
                apply_forward(incoming, name, rename.as_ref(), default.as_ref(), &mut result);
            }
            HeaderRule::Insert { name, value } => {
                result.insert(name.clone(), value.clone());
            }
            HeaderRule::Remove { name } => {
                let to_remove: Vec<_> = result.keys().filter(|key| name.matches(key)).cloned().collect();
                for key in to_remove {
                    result.remove(&key);
                }
            }
        }
    }

    result
}

fn apply_forward(
    incoming: &HeaderMap,
    name: &NameOrPattern,
    rename: Option<&HeaderName>,
    default: Option<&HeaderValue>,
    result: &mut HeaderMap,
) {
    match name {
        NameOrPattern::Name(header_name) => {
            if is_header_denied(header_name) {
                return;
            }

            let value = incoming.get(header_name).or(default).cloned();

            if let Some(value) = value {
                result.insert(rename.unwrap_or(header_name).clone(), value);
            }
        }
        NameOrPattern::Pattern(_) => {
            for (key, value) in incoming {
                if is_header_denied(key) || !name.matches(key) {
                    continue;
                }
                result.insert(rename.unwrap_or(key).clone(), value.clone());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use relay_config::default_primary_headers;

    use super::*;

    fn incoming(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert(HeaderName::from_static(name), HeaderValue::from_static(value));
        }
        map
    }

    #[test]
    fn default_rules_map_referer_and_add_title() {
        let rules = HeaderRule::compile_all(&default_primary_headers()).unwrap();
        let headers = incoming(&[
            ("authorization", "Bearer sk-caller"),
            ("referer", "https://app.test"),
            ("content-type", "application/json"),
            ("x-unrelated", "1"),
        ]);

        let out = apply_header_rules(&headers, &rules);

        assert_eq!(out["authorization"], "Bearer sk-caller");
        assert_eq!(out["http-referer"], "https://app.test");
        assert_eq!(out["x-title"], relay_config::DEFAULT_TITLE);
        assert!(out.get("referer").is_none());
        assert!(out.get("x-unrelated").is_none());
        assert!(out.get("content-type").is_none());
    }

    #[test]
    fn missing_header_uses_default() {
        let rules = vec![HeaderRule::Forward {
            name: NameOrPattern::Name(HeaderName::from_static("referer")),
            rename: Some(HeaderName::from_static("http-referer")),
            default: Some(HeaderValue::from_static("http://localhost")),
        }];

        let out = apply_header_rules(&HeaderMap::new(), &rules);
        assert_eq!(out["http-referer"], "http://localhost");
    }

    #[test]
    fn pattern_forward_skips_denied_headers() {
        let rules = vec![HeaderRule::Forward {
            name: NameOrPattern::Pattern(Regex::new("^(x-.*|host)$").unwrap()),
            rename: None,
            default: None,
        }];
        let headers = incoming(&[("x-trace", "abc"), ("host", "relay.test")]);

        let out = apply_header_rules(&headers, &rules);
        assert_eq!(out["x-trace"], "abc");
        assert!(out.get("host").is_none());
    }

    #[test]
    fn remove_drops_earlier_insert() {
        let rules = vec![
            HeaderRule::Insert {
                name: HeaderName::from_static("x-title"),
                value: HeaderValue::from_static("t"),
            },
            HeaderRule::Remove {
                name: NameOrPattern::Name(HeaderName::from_static("x-title")),
            },
        ];

        assert!(apply_header_rules(&HeaderMap::new(), &rules).is_empty());
    }
}
