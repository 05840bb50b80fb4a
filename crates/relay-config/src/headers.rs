use serde::Deserialize;

/// Outbound header rule for the primary provider
///
/// Rules apply in order against the caller's inbound headers and build the
/// header set sent upstream.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HeaderRuleConfig {
    /// Copy a header from the inbound request, optionally renaming it
    Forward(HeaderForwardConfig),
    /// Insert a static header
    Insert(HeaderInsertConfig),
    /// Remove a header set by an earlier rule
    Remove(HeaderRemoveConfig),
}

/// Forward a header, optionally renaming it
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HeaderForwardConfig {
    /// Header name, or regex when it contains pattern metacharacters
    pub name: String,
    /// Name used on the outbound request
    #[serde(default)]
    pub rename: Option<String>,
    /// Value sent when the inbound request lacks the header
    #[serde(default)]
    pub default: Option<String>,
}

/// Insert a static header
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HeaderInsertConfig {
    pub name: String,
    pub value: String,
}

/// Remove a header by name or pattern
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HeaderRemoveConfig {
    pub name: String,
}

/// Whether a configured header name is meant as a regex
pub fn is_header_pattern(name: &str) -> bool {
    name.contains(['*', '?', '[', '(', '^', '$'])
}

/// Marker sent as `X-Title` on every primary-provider request
pub const DEFAULT_TITLE: &str = "OpenRouter API Wrapper";

/// Authorization passed through, `Referer` mapped to `HTTP-Referer`, fixed `X-Title`
pub fn default_primary_headers() -> Vec<HeaderRuleConfig> {
    vec![
        HeaderRuleConfig::Forward(HeaderForwardConfig {
            name: "authorization".to_owned(),
            rename: None,
            default: None,
        }),
        HeaderRuleConfig::Forward(HeaderForwardConfig {
            name: "referer".to_owned(),
            rename: Some("http-referer".to_owned()),
            default: None,
        }),
        HeaderRuleConfig::Insert(HeaderInsertConfig {
            name: "x-title".to_owned(),
            value: DEFAULT_TITLE.to_owned(),
        }),
    ]
}
