use super::{ContentSource, PortalItem};
use crate::config::PortalConfig;
use crate::error::{BackupError, Result};
use crate::esri::{FeatureSet, LayerInfo, TableRows};
use reqwest::blocking::{Client, RequestBuilder};
use reqwest::header::REFERER;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;

const USER_AGENT: &str = concat!("agol-gpkg/", env!("CARGO_PKG_VERSION"));
const TOKEN_PATH: &str = "/sharing/rest/generateToken";
const ITEMS_PATH: &str = "/sharing/rest/content/items";
/// Token lifetime requested at sign-in, in minutes.
const TOKEN_EXPIRATION: &str = "120";

/// Signed-in session against one portal.
///
/// The token is bound to the portal URL as referer, so every request after
/// sign-in carries that URL in its `Referer` header.
#[derive(Debug)]
pub struct PortalClient {
    client: Client,
    portal_url: String,
    token: String,
}

#[derive(Deserialize)]
struct TokenResponse {
    token: Option<String>,
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    code: i64,
    #[serde(default)]
    message: String,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

impl PortalClient {
    /// Sign in once and keep the token for every later request.
    pub fn sign_in(config: &PortalConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .connect_timeout(Duration::from_secs(30))
            .build()?;
        let portal_url = config.url.trim_end_matches('/').to_string();

        debug!(portal = %portal_url, username = %config.username, "requesting token");
        let body = token_request(&client, &portal_url, config)
            .send()?
            .error_for_status()?
            .text()?;
        let token = token_from_body(&body)?;

        Ok(Self {
            client,
            portal_url,
            token,
        })
    }

    fn request(&self, url: &str, query: &[(&str, &str)]) -> RequestBuilder {
        self.client
            .get(url)
            .header(REFERER, self.portal_url.as_str())
            .query(query)
            .query(&[("f", "json"), ("token", self.token.as_str())])
    }

    fn get<T: DeserializeOwned>(&self, url: &str, query: &[(&str, &str)]) -> Result<T> {
        let body = self
            .request(url, query)
            .send()?
            .error_for_status()?
            .text()?;
        parse_response(&body)
    }

    fn query_all(&self, item: &PortalItem, layer: u32, return_geometry: bool) -> Result<FeatureSet> {
        let service_url = item
            .url
            .as_deref()
            .ok_or_else(|| BackupError::MissingServiceUrl {
                item_id: item.id.clone(),
            })?;
        let layer_url = format!("{}/{layer}", service_url.trim_end_matches('/'));

        // Paging by offset is only stable under a fixed order.
        let info: LayerInfo = self.get(&layer_url, &[])?;
        let order_by = info.object_id_field.unwrap_or_default();

        let url = format!("{layer_url}/query");
        let return_geometry = if return_geometry { "true" } else { "false" };
        fetch_all_pages(|offset| {
            debug!(url = %url, offset, "fetching page");
            let offset = offset.to_string();
            let query = query_params(return_geometry, &order_by, &offset);
            self.get(&url, &query)
        })
    }
}

impl ContentSource for PortalClient {
    fn item(&self, id: &str) -> Result<PortalItem> {
        self.get(&format!("{}{ITEMS_PATH}/{id}", self.portal_url), &[])
    }

    fn query_features(&self, item: &PortalItem, layer: u32) -> Result<FeatureSet> {
        self.query_all(item, layer, true)
    }

    fn query_rows(&self, item: &PortalItem, layer: u32) -> Result<TableRows> {
        self.query_all(item, layer, false).map(TableRows::from)
    }
}

fn token_request(client: &Client, portal_url: &str, config: &PortalConfig) -> RequestBuilder {
    client
        .post(format!("{portal_url}{TOKEN_PATH}"))
        .header(REFERER, portal_url)
        .form(&[
            ("username", config.username.as_str()),
            ("password", config.password.as_str()),
            ("client", "referer"),
            ("referer", portal_url),
            ("expiration", TOKEN_EXPIRATION),
            ("f", "json"),
        ])
}

/// Extract the token from a `generateToken` response body.
fn token_from_body(body: &str) -> Result<String> {
    match parse_response::<TokenResponse>(body) {
        Ok(TokenResponse { token: Some(token) }) if !token.is_empty() => Ok(token),
        Ok(_) => Err(BackupError::Authentication(
            "response carried no token".to_string(),
        )),
        Err(BackupError::Remote { code, message }) => {
            Err(BackupError::Authentication(format!("{code}: {message}")))
        }
        Err(e) => Err(e),
    }
}

fn query_params<'a>(
    return_geometry: &'a str,
    order_by: &'a str,
    offset: &'a str,
) -> Vec<(&'static str, &'a str)> {
    let mut params = vec![
        ("where", "1=1"),
        ("outFields", "*"),
        ("returnGeometry", return_geometry),
        ("resultOffset", offset),
    ];
    if !order_by.is_empty() {
        params.push(("orderByFields", order_by));
    }
    params
}

/// Fetch pages from offset zero while the service reports more rows.
///
/// `page` receives the number of features fetched so far; an empty page
/// ends the loop even when the limit flag is still set.
pub(crate) fn fetch_all_pages<F>(mut page: F) -> Result<FeatureSet>
where
    F: FnMut(usize) -> Result<FeatureSet>,
{
    let mut set = page(0)?;
    while set.exceeded_transfer_limit {
        let next = page(set.features.len())?;
        if next.features.is_empty() {
            break;
        }
        set.extend_page(next);
    }
    Ok(set)
}

/// Decode a JSON response body, turning an error envelope into [`BackupError::Remote`].
///
/// The portal reports most failures with HTTP 200 and an `error` object.
pub fn parse_response<T: DeserializeOwned>(body: &str) -> Result<T> {
    let value: serde_json::Value = serde_json::from_str(body)?;
    if value.get("error").is_some_and(serde_json::Value::is_object) {
        let ErrorEnvelope { error } = serde_json::from_value(value)?;
        return Err(BackupError::Remote {
            code: error.code,
            message: error.message,
        });
    }
    Ok(serde_json::from_value(value)?)
}
