//! resource::request
//!
//! Pure assembly of one outbound call.
//!
//! # Steps
//!
//! Given an endpoint path, its schema node and the caller's parameters, the
//! builder:
//!
//! 1. Checks every required parameter is present (type suffixes ignored on
//!    both sides).
//! 2. Resolves the HTTP method: a `method` parameter overrides the schema.
//! 3. Resolves the API version: a `version` parameter overrides the client
//!    default. `method` and `version` never reach the wire.
//! 4. Injects credentials the caller did not already supply.
//! 5. Encodes parameters into the query string (`GET`/`HEAD`) or a form body.
//!
//! Nothing here performs I/O, so every rule is testable without a server.

use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE, USER_AGENT};
use reqwest::Method;
use url::form_urlencoded;

use super::error::ClientError;
use super::params::Params;
use super::Credentials;
use crate::schema::node::split_type_suffix;
use crate::schema::SchemaNode;

/// User-Agent header value sent on every call.
pub const USER_AGENT_VALUE: &str = concat!("chaincall/", env!("CARGO_PKG_VERSION"));

/// Content type for write-style bodies.
pub const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// Parameter carrying the write-capable key.
pub const SECRET_PARAM: &str = "api_secret";

/// Parameter carrying the read-capable key.
pub const PUBLIC_PARAM: &str = "api_key";

/// Alternate public-key parameter; suppresses injection when present.
pub const PUBLIC_ALIAS_PARAM: &str = "api_public";

/// A fully assembled outbound call.
#[derive(Debug, Clone)]
pub struct PreparedRequest {
    /// HTTP method
    pub method: Method,
    /// Slash-separated endpoint path (without version or `.json`)
    pub endpoint: String,
    /// Full URL including the query string for read-style calls
    pub url: String,
    /// Headers to send
    pub headers: HeaderMap,
    /// Form-encoded body for write-style calls
    pub body: Option<String>,
}

impl PreparedRequest {
    /// Decoded query-string pairs, in order.
    pub fn query_pairs(&self) -> Vec<(String, String)> {
        match self.url.split_once('?') {
            Some((_, query)) => decode_pairs(query),
            None => Vec::new(),
        }
    }

    /// Decoded body pairs, in order.
    pub fn body_pairs(&self) -> Vec<(String, String)> {
        self.body.as_deref().map(decode_pairs).unwrap_or_default()
    }

    /// Whether parameters travel in the query string.
    pub fn is_read_style(&self) -> bool {
        is_read_style(&self.method)
    }
}

fn decode_pairs(encoded: &str) -> Vec<(String, String)> {
    form_urlencoded::parse(encoded.as_bytes())
        .into_owned()
        .collect()
}

/// Methods whose parameters travel in the query string.
pub fn is_read_style(method: &Method) -> bool {
    *method == Method::GET || *method == Method::HEAD
}

/// Assembles [`PreparedRequest`]s for one client.
#[derive(Debug, Clone, Copy)]
pub struct RequestBuilder<'a> {
    host: &'a str,
    default_version: &'a str,
    credentials: &'a Credentials,
}

impl<'a> RequestBuilder<'a> {
    pub fn new(host: &'a str, default_version: &'a str, credentials: &'a Credentials) -> Self {
        Self {
            host,
            default_version,
            credentials,
        }
    }

    /// Build the call for `endpoint` (slash-separated) validated against
    /// `schema`.
    pub fn build(
        &self,
        endpoint: &str,
        schema: &SchemaNode,
        mut params: Params,
    ) -> Result<PreparedRequest, ClientError> {
        check_required(schema, &params)?;

        let method = match params.remove("method") {
            Some(value) => parse_method(value.first().unwrap_or_default())?,
            None => schema
                .method()
                .cloned()
                .ok_or_else(|| ClientError::InterfaceNotDefined(endpoint.replace('/', ".")))?,
        };

        let version = match params.remove("version") {
            Some(value) => value.first().unwrap_or_default().to_string(),
            None => self.default_version.to_string(),
        };
        if version.is_empty() {
            return Err(ClientError::Configuration("API version is empty".into()));
        }

        inject_credentials(&mut params, self.credentials);

        let encoded = encode_pairs(&params.to_pairs());
        let mut url = format!(
            "{}/api/{}/{}.json",
            self.host.trim_end_matches('/'),
            version,
            endpoint
        );

        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(USER_AGENT_VALUE));

        let body = if is_read_style(&method) {
            if !encoded.is_empty() {
                url.push('?');
                url.push_str(&encoded);
            }
            None
        } else {
            headers.insert(CONTENT_TYPE, HeaderValue::from_static(FORM_CONTENT_TYPE));
            Some(encoded)
        };

        Ok(PreparedRequest {
            method,
            endpoint: endpoint.to_string(),
            url,
            headers,
            body,
        })
    }
}

/// Fail with `MissingArgument` listing every absent required parameter.
fn check_required(schema: &SchemaNode, params: &Params) -> Result<(), ClientError> {
    let supplied: Vec<&str> = params
        .names()
        .map(|name| split_type_suffix(name).0)
        .collect();

    let missing: Vec<&str> = schema
        .required()
        .iter()
        .map(|r| r.name())
        .filter(|name| !supplied.contains(name))
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(ClientError::MissingArgument(missing.join(", ")))
    }
}

fn parse_method(raw: &str) -> Result<Method, ClientError> {
    if raw.is_empty() {
        return Err(ClientError::Configuration("empty `method` parameter".into()));
    }
    Method::from_bytes(raw.to_ascii_uppercase().as_bytes())
        .map_err(|_| ClientError::Configuration(format!("invalid HTTP method '{}'", raw)))
}

/// Add configured keys the caller has not supplied.
fn inject_credentials(params: &mut Params, credentials: &Credentials) {
    if !params.contains(SECRET_PARAM) {
        if let Some(secret) = credentials.secret_key() {
            params.set(SECRET_PARAM, secret);
        }
    }
    if !params.contains(PUBLIC_ALIAS_PARAM) && !params.contains(PUBLIC_PARAM) {
        if let Some(public) = credentials.public_key() {
            params.set(PUBLIC_PARAM, public);
        }
    }
}

/// Form-encode pairs, preserving order.
pub fn encode_pairs(pairs: &[(String, String)]) -> String {
    form_urlencoded::Serializer::new(String::new())
        .extend_pairs(pairs.iter().map(|(k, v)| (k.as_str(), v.as_str())))
        .finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::SchemaRegistry;

    const HOST: &str = "https://disqus.com";

    fn registry() -> SchemaRegistry {
        SchemaRegistry::from_json_str(
            r#"{
                "threads": { "details": { "required": ["thread"], "method": "GET" } },
                "posts": {
                    "create": { "required": ["message", "author_email:string"], "method": "POST" },
                    "list": { "method": "GET" }
                }
            }"#,
        )
        .expect("schema")
    }

    fn both_keys() -> Credentials {
        Credentials::new(Some("SECRET".into()), Some("PUBLIC".into()))
    }

    fn build(
        creds: &Credentials,
        endpoint: &str,
        params: Params,
    ) -> Result<PreparedRequest, ClientError> {
        let reg = registry();
        let node = reg.lookup_dotted(&endpoint.replace('/', "."));
        RequestBuilder::new(HOST, "3.0", creds).build(endpoint, node, params)
    }

    fn value_of<'p>(pairs: &'p [(String, String)], key: &str) -> Vec<&'p str> {
        pairs
            .iter()
            .filter(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
            .collect()
    }

    mod validation {
        use super::*;

        #[test]
        fn missing_required_fails() {
            let err = build(&both_keys(), "threads/details", Params::new()).unwrap_err();
            assert!(matches!(err, ClientError::MissingArgument(ref n) if n == "thread"));
        }

        #[test]
        fn typed_requirement_satisfied_by_bare_name() {
            let params = Params::new()
                .with("message", "hi")
                .with("author_email", "a@example.com");
            assert!(build(&both_keys(), "posts/create", params).is_ok());
        }

        #[test]
        fn supplied_name_suffix_is_stripped() {
            let params = Params::new()
                .with("message", "hi")
                .with("author_email:string", "a@example.com");
            assert!(build(&both_keys(), "posts/create", params).is_ok());
        }

        #[test]
        fn lists_all_missing() {
            let err = build(&both_keys(), "posts/create", Params::new()).unwrap_err();
            match err {
                ClientError::MissingArgument(names) => {
                    assert_eq!(names, "message, author_email");
                }
                other => panic!("unexpected error: {:?}", other),
            }
        }

        #[test]
        fn missing_argument_checked_before_method() {
            let reg = SchemaRegistry::from_json_str(r#"{"x": {"required": ["a"]}}"#).unwrap();
            let err = RequestBuilder::new(HOST, "3.0", &both_keys())
                .build("x", reg.lookup(&["x"]), Params::new())
                .unwrap_err();
            assert!(matches!(err, ClientError::MissingArgument(_)));
        }
    }

    mod method {
        use super::*;

        #[test]
        fn undefined_endpoint_without_method_fails() {
            let err = build(&both_keys(), "users/details", Params::new()).unwrap_err();
            assert!(matches!(err, ClientError::InterfaceNotDefined(ref e) if e == "users.details"));
        }

        #[test]
        fn explicit_method_on_undefined_endpoint() {
            let req = build(
                &both_keys(),
                "users/details",
                Params::new().with("method", "get"),
            )
            .unwrap();
            assert_eq!(req.method, Method::GET);
            assert!(value_of(&req.query_pairs(), "method").is_empty());
        }

        #[test]
        fn explicit_method_overrides_schema() {
            let req = build(
                &both_keys(),
                "threads/details",
                Params::new().with("thread", "1").with("method", "POST"),
            )
            .unwrap();
            assert_eq!(req.method, Method::POST);
            assert!(req.body.is_some());
        }

        #[test]
        fn empty_method_param_is_configuration_error() {
            let err = build(
                &both_keys(),
                "posts/list",
                Params::new().with("method", ""),
            )
            .unwrap_err();
            assert!(matches!(err, ClientError::Configuration(_)));
        }
    }

    mod credentials {
        use super::*;

        #[test]
        fn injects_both_keys() {
            let req = build(&both_keys(), "posts/list", Params::new()).unwrap();
            let pairs = req.query_pairs();
            assert_eq!(value_of(&pairs, "api_secret"), vec!["SECRET"]);
            assert_eq!(value_of(&pairs, "api_key"), vec!["PUBLIC"]);
        }

        #[test]
        fn caller_api_key_is_not_duplicated() {
            let req = build(
                &both_keys(),
                "posts/list",
                Params::new().with("api_key", "CALLER"),
            )
            .unwrap();
            assert_eq!(value_of(&req.query_pairs(), "api_key"), vec!["CALLER"]);
        }

        #[test]
        fn api_public_suppresses_public_key() {
            let req = build(
                &both_keys(),
                "posts/list",
                Params::new().with("api_public", "P2"),
            )
            .unwrap();
            let pairs = req.query_pairs();
            assert!(value_of(&pairs, "api_key").is_empty());
            assert_eq!(value_of(&pairs, "api_public"), vec!["P2"]);
        }

        #[test]
        fn caller_secret_wins() {
            let req = build(
                &both_keys(),
                "posts/list",
                Params::new().with("api_secret", "MINE"),
            )
            .unwrap();
            assert_eq!(value_of(&req.query_pairs(), "api_secret"), vec!["MINE"]);
        }

        #[test]
        fn nothing_injected_without_keys() {
            let req = build(&Credentials::default(), "posts/list", Params::new()).unwrap();
            assert!(req.query_pairs().is_empty());
            assert!(!req.url.contains('?'));
        }
    }

    mod encoding {
        use super::*;

        #[test]
        fn read_style_uses_query_string() {
            let req = build(
                &Credentials::default(),
                "threads/details",
                Params::new().with("thread", "link:https://a.b/c d"),
            )
            .unwrap();
            assert!(req.body.is_none());
            assert!(req.headers.get(CONTENT_TYPE).is_none());
            assert_eq!(
                req.url,
                "https://disqus.com/api/3.0/threads/details.json?thread=link%3Ahttps%3A%2F%2Fa.b%2Fc+d"
            );
            assert_eq!(
                value_of(&req.query_pairs(), "thread"),
                vec!["link:https://a.b/c d"]
            );
        }

        #[test]
        fn write_style_uses_form_body() {
            let req = build(
                &both_keys(),
                "posts/create",
                Params::new()
                    .with("message", "hello world")
                    .with("author_email", "a@example.com"),
            )
            .unwrap();
            assert_eq!(req.url, "https://disqus.com/api/3.0/posts/create.json");
            assert_eq!(
                req.headers.get(CONTENT_TYPE).unwrap(),
                "application/x-www-form-urlencoded"
            );
            let body = req.body_pairs();
            assert_eq!(value_of(&body, "message"), vec!["hello world"]);
            assert_eq!(value_of(&body, "api_secret"), vec!["SECRET"]);
        }

        #[test]
        fn multi_valued_param_repeats_in_order() {
            let req = build(
                &Credentials::default(),
                "posts/list",
                Params::new().with("related", vec!["thread", "forum", "author"]),
            )
            .unwrap();
            assert_eq!(
                value_of(&req.query_pairs(), "related"),
                vec!["thread", "forum", "author"]
            );
        }

        #[test]
        fn version_override_is_stripped() {
            let req = build(
                &Credentials::default(),
                "posts/list",
                Params::new().with("version", "3.1"),
            )
            .unwrap();
            assert_eq!(req.url, "https://disqus.com/api/3.1/posts/list.json");
        }

        #[test]
        fn user_agent_always_set() {
            let req = build(&Credentials::default(), "posts/list", Params::new()).unwrap();
            assert_eq!(req.headers.get(USER_AGENT).unwrap(), USER_AGENT_VALUE);
        }

        #[test]
        fn trailing_slash_on_host() {
            let creds = Credentials::default();
            let reg = registry();
            let req = RequestBuilder::new("https://example.com/", "3.0", &creds)
                .build("posts/list", reg.lookup_dotted("posts.list"), Params::new())
                .unwrap();
            assert_eq!(req.url, "https://example.com/api/3.0/posts/list.json");
        }
    }
}
