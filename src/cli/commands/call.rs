//! call command - Invoke an endpoint and print the result

use anyhow::{bail, Result};
use serde_json::Value;

use crate::cli::Context;
use crate::resource::{Client, ParamValue, Params};
use crate::ui::output;

/// Invoke `endpoint` with `KEY=VALUE` parameters.
pub fn call(
    ctx: &Context,
    endpoint: &str,
    raw_params: &[String],
    method: Option<&str>,
    api_version: Option<&str>,
    pretty: bool,
) -> Result<()> {
    let mut params = parse_params(raw_params)?;
    if let Some(method) = method {
        params.set("method", method);
    }
    if let Some(version) = api_version {
        params.set("version", version);
    }

    let client = super::build_client(ctx)?;
    if method.is_some() && !client.registry().lookup_dotted(endpoint).is_declared() {
        output::warn(
            format!("endpoint '{}' is not declared in the schema", endpoint),
            ctx.verbosity,
        );
    }

    let rt = tokio::runtime::Runtime::new()?;
    let value = rt.block_on(invoke(&client, endpoint, params))?;

    output::print(output::format_json(&value, pretty), ctx.verbosity);
    Ok(())
}

/// Invoke a dot-separated endpoint and render the result as JSON.
///
/// Pages render as `{"items": [...], "cursor": {...}}` so the cursor is not
/// lost.
pub(crate) async fn invoke(client: &Client, endpoint: &str, params: Params) -> Result<Value> {
    let response = client.resource(endpoint).invoke(params).await?;
    Ok(serde_json::to_value(&response)?)
}

/// Parse `KEY=VALUE` arguments.
///
/// The value is everything after the first `=`. A key given more than once
/// becomes a multi-valued parameter, values in argument order.
pub fn parse_params(raw: &[String]) -> Result<Params> {
    let mut params = Params::new();
    for arg in raw {
        let Some((key, value)) = arg.split_once('=') else {
            bail!("Invalid parameter '{}': expected KEY=VALUE", arg);
        };
        if key.is_empty() {
            bail!("Invalid parameter '{}': key is empty", arg);
        }

        let merged = match params.get(key) {
            Some(ParamValue::Single(first)) => {
                ParamValue::Multi(vec![first.clone(), value.to_string()])
            }
            Some(ParamValue::Multi(values)) => {
                let mut values = values.clone();
                values.push(value.to_string());
                ParamValue::Multi(values)
            }
            None => ParamValue::Single(value.to_string()),
        };
        params.set(key, merged);
    }
    Ok(params)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::mock::MockTransport;
    use crate::resource::{ClientError, Credentials};
    use crate::schema::SchemaRegistry;
    use serde_json::json;
    use std::sync::Arc;

    fn args(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    mod parsing {
        use super::*;

        #[test]
        fn single_values_keep_order() {
            let params = parse_params(&args(&["b=2", "a=1"])).unwrap();
            assert_eq!(params.names().collect::<Vec<_>>(), vec!["b", "a"]);
        }

        #[test]
        fn value_may_contain_equals() {
            let params = parse_params(&args(&["thread=link:https://x.test/?a=b"])).unwrap();
            assert_eq!(
                params.get("thread"),
                Some(&ParamValue::Single("link:https://x.test/?a=b".into()))
            );
        }

        #[test]
        fn repeated_key_becomes_multi() {
            let params =
                parse_params(&args(&["related=thread", "x=1", "related=forum", "related=author"]))
                    .unwrap();
            assert_eq!(
                params.get("related"),
                Some(&ParamValue::Multi(vec![
                    "thread".into(),
                    "forum".into(),
                    "author".into()
                ]))
            );
            assert_eq!(params.len(), 2);
        }

        #[test]
        fn empty_value_allowed() {
            let params = parse_params(&args(&["cursor="])).unwrap();
            assert_eq!(params.get("cursor"), Some(&ParamValue::Single(String::new())));
        }

        #[test]
        fn missing_equals_rejected() {
            let err = parse_params(&args(&["thread"])).unwrap_err();
            assert!(err.to_string().contains("KEY=VALUE"));
        }

        #[test]
        fn empty_key_rejected() {
            assert!(parse_params(&args(&["=x"])).is_err());
        }
    }

    mod invoking {
        use super::*;

        fn client(transport: &MockTransport) -> Client {
            Client::new(
                Credentials::default(),
                Arc::new(SchemaRegistry::empty()),
                Arc::new(transport.clone()),
            )
        }

        #[tokio::test]
        async fn undeclared_endpoint_with_method() {
            let transport = MockTransport::new();
            transport.push_json(200, json!({"code": 0, "response": {"id": "u1"}}));
            let c = client(&transport);

            let params = parse_params(&args(&["user=1", "method=get"])).unwrap();
            let value = invoke(&c, "users.details", params).await.unwrap();
            assert_eq!(value, json!({"id": "u1"}));

            let req = transport.last_request().unwrap();
            assert_eq!(req.endpoint, "users/details");
            assert!(!req.url.contains("method="));
        }

        #[tokio::test]
        async fn undeclared_endpoint_without_method() {
            let transport = MockTransport::new();
            let c = client(&transport);
            let err = invoke(&c, "users.details", Params::new()).await.unwrap_err();
            assert!(matches!(
                err.downcast_ref::<ClientError>(),
                Some(ClientError::InterfaceNotDefined(name)) if name == "users.details"
            ));
            assert_eq!(transport.call_count(), 0);
        }

        #[tokio::test]
        async fn page_renders_with_cursor() {
            let transport = MockTransport::new();
            transport.push_json(
                200,
                json!({"code": 0, "cursor": {"next": "c2"}, "response": [{"id": 1}]}),
            );
            let c = client(&transport);
            let params = Params::new().with("method", "GET");
            let value = invoke(&c, "posts.list", params).await.unwrap();
            assert_eq!(value["items"], json!([{"id": 1}]));
            assert_eq!(value["cursor"], json!({"next": "c2"}));
        }
    }
}
