//! HTTP implementation of `ActivityApi` and `ProductCatalogApi` against the
//! seller portal
//!
//! Every call is a JSON POST carrying the session cookies and the browser-like
//! headers the portal expects. Responses use the `{success, errorMsg, result}`
//! envelope.

use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use reqwest::header::{self, HeaderMap, HeaderValue};
use reqwest::{Client, ClientBuilder, Response};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::{debug, error, info};

use crate::domain::activity::ActivityQueryResponse;
use crate::domain::product_listing::ProductPageResponse;
use crate::domain::{
    ActivityApi, ApiError, CancelRequest, ProductActivityResult, ProductCatalogApi,
    ProductListQuery, ProductPage,
};
use crate::infrastructure::config::{ApiConfig, SiteConfig};
use crate::infrastructure::session::SessionCredentials;

/// Envelope of the cancel endpoint
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CancelResponse {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    error_msg: Option<String>,
}

pub struct PortalActivityClient {
    client: Client,
    query_url: String,
    cancel_url: String,
    product_list_url: String,
}

impl PortalActivityClient {
    /// Builds a client bound to one site; `credentials` are filtered to that site.
    pub fn new(site: &SiteConfig, api: &ApiConfig, credentials: &SessionCredentials) -> Result<Self> {
        let base_url = site.base_url()?;
        let credentials = credentials.for_site(&base_url)?;
        if credentials.is_empty() {
            return Err(anyhow!("{} (no cookies for {base_url})", ApiError::NotAuthenticated));
        }

        let mall_id = site.mall_id.as_deref().or(credentials.mall_id.as_deref());
        let headers = default_headers(&base_url, &credentials.cookie_header(), mall_id)?;

        let client = ClientBuilder::new()
            .timeout(Duration::from_secs(api.request_timeout_seconds))
            .user_agent(&api.user_agent)
            .default_headers(headers)
            .gzip(true)
            .build()
            .context("Failed to create HTTP client")?;

        info!("🌐 Portal client ready for {} ({} cookies)", base_url, credentials.cookies.len());
        Ok(Self {
            client,
            query_url: format!("{base_url}{}", api.query_path),
            cancel_url: format!("{base_url}{}", api.cancel_path),
            product_list_url: format!("{base_url}{}", api.product_list_path),
        })
    }

    async fn post_json<T: DeserializeOwned>(
        &self,
        url: &str,
        body: &serde_json::Value,
    ) -> Result<T, ApiError> {
        debug!("🌐 HTTP POST: {}", url);
        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;

        let response = check_status(response).await?;
        response.json::<T>().await.map_err(|e| ApiError::Decode(e.to_string()))
    }
}

async fn check_status(response: Response) -> Result<Response, ApiError> {
    let status = response.status();
    if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
        return Err(ApiError::NotAuthenticated);
    }
    if !status.is_success() {
        let message = response.text().await.unwrap_or_default();
        error!("❌ HTTP error {}: {}", status, message);
        return Err(ApiError::Http { status: status.as_u16(), message });
    }
    Ok(response)
}

fn default_headers(base_url: &str, cookie: &str, mall_id: Option<&str>) -> Result<HeaderMap> {
    let mut headers = HeaderMap::new();
    headers.insert(header::ACCEPT, HeaderValue::from_static("application/json"));
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
    headers.insert(
        header::ACCEPT_LANGUAGE,
        HeaderValue::from_static("zh-CN,zh;q=0.9,en;q=0.8"),
    );
    headers.insert(header::ORIGIN, HeaderValue::from_str(base_url).context("Invalid origin")?);
    headers.insert(
        header::REFERER,
        HeaderValue::from_str(&format!("{base_url}/")).context("Invalid referer")?,
    );
    headers.insert("sec-fetch-dest", HeaderValue::from_static("empty"));
    headers.insert("sec-fetch-mode", HeaderValue::from_static("cors"));
    headers.insert("sec-fetch-site", HeaderValue::from_static("same-origin"));

    let mut cookie = HeaderValue::from_str(cookie).context("Cookie contains invalid characters")?;
    cookie.set_sensitive(true);
    headers.insert(header::COOKIE, cookie);

    if let Some(mall_id) = mall_id {
        headers.insert("mallid", HeaderValue::from_str(mall_id).context("Invalid mall id")?);
    }
    Ok(headers)
}

#[async_trait]
impl ActivityApi for PortalActivityClient {
    async fn query_activities(&self, product_id: &str) -> Result<ProductActivityResult, ApiError> {
        let response: ActivityQueryResponse =
            self.post_json(&self.query_url, &json!({ "productId": product_id })).await?;

        if response.success == Some(false) {
            return Err(ApiError::Rejected {
                message: response.error_msg.unwrap_or_else(|| "查询活动失败".to_string()),
            });
        }
        let payload = response
            .result
            .ok_or_else(|| ApiError::NotFound { product_id: product_id.to_string() })?;
        Ok(payload.into_result(product_id))
    }

    async fn cancel_activity(&self, request: &CancelRequest) -> Result<(), ApiError> {
        let body = serde_json::to_value(request).map_err(|e| ApiError::Decode(e.to_string()))?;
        let response: CancelResponse = self.post_json(&self.cancel_url, &body).await?;

        if response.success {
            info!("✅ Cancelled enrollment {} of product {}", request.enroll_id, request.product_id);
            Ok(())
        } else {
            Err(ApiError::Rejected {
                message: response.error_msg.unwrap_or_else(|| "取消活动失败".to_string()),
            })
        }
    }
}

#[async_trait]
impl ProductCatalogApi for PortalActivityClient {
    async fn list_products(&self, query: &ProductListQuery) -> Result<ProductPage, ApiError> {
        let body = serde_json::to_value(query).map_err(|e| ApiError::Decode(e.to_string()))?;
        let response: ProductPageResponse = self.post_json(&self.product_list_url, &body).await?;

        match response.result {
            Some(payload) if response.success != Some(false) => {
                let page = payload.into_page(query);
                debug!("Product page {}: {} records", page.page, page.records.len());
                Ok(page)
            }
            _ => Err(ApiError::Rejected {
                message: response.error_msg.unwrap_or_else(|| "获取商品失败".to_string()),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::session::Cookie;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn credentials() -> SessionCredentials {
        SessionCredentials::new(vec![
            Cookie { name: "api_uid".into(), value: "u1".into(), domain: "127.0.0.1".into(), path: "/".into() },
            Cookie { name: "other".into(), value: "x".into(), domain: ".example.com".into(), path: "/".into() },
        ])
    }

    fn client(server: &MockServer) -> PortalActivityClient {
        let site = SiteConfig {
            base_url: Some(server.uri()),
            mall_id: Some("634418212233".into()),
            ..SiteConfig::default()
        };
        PortalActivityClient::new(&site, &ApiConfig::default(), &credentials()).unwrap()
    }

    #[tokio::test]
    async fn query_sends_cookies_and_parses_activities() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(ApiConfig::default().query_path))
            .and(header("cookie", "api_uid=u1"))
            .and(header("mallid", "634418212233"))
            .and(body_json(json!({ "productId": "1234567890" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": true,
                "result": {
                    "productId": 1234567890,
                    "productName": "Desk Lamp",
                    "activityList": [{
                        "activityName": "Flash Sale",
                        "activityType": 1,
                        "feedbackEnrollInfoList": [{
                            "enrollId": 998877,
                            "minActivityPrice": 1999,
                            "maxActivityPrice": 2599,
                            "stock": 20,
                            "enrollSessions": [
                                {"siteName": "US", "sessionStatus": 2, "startDateStr": "2025-01-01", "endDateStr": "2025-01-07"}
                            ]
                        }]
                    }]
                }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let result = client(&server).query_activities("1234567890").await.unwrap();

        assert_eq!(result.info.display_name(), "Desk Lamp");
        let enrollment = &result.activities[0].enrollments[0];
        assert_eq!(enrollment.enroll_id, "998877");
        assert_eq!(enrollment.product_id, "1234567890");
        assert_eq!(enrollment.active_site_count(), 1);
    }

    #[tokio::test]
    async fn missing_result_is_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "success": true, "result": null })))
            .mount(&server)
            .await;

        let err = client(&server).query_activities("1234567890").await.unwrap_err();
        assert_eq!(err, ApiError::NotFound { product_id: "1234567890".into() });
    }

    #[tokio::test]
    async fn cancel_maps_envelope_and_status() {
        let server = MockServer::start().await;
        let request = CancelRequest {
            product_id: "1234567890".into(),
            enroll_id: "998877".into(),
            activity_name: "Flash Sale".into(),
            remark: "申请退出".into(),
        };
        Mock::given(method("POST"))
            .and(path(ApiConfig::default().cancel_path))
            .and(body_json(json!({
                "productId": "1234567890",
                "enrollId": "998877",
                "activityName": "Flash Sale",
                "remark": "申请退出"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "success": false, "errorMsg": "活动已开始" })))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503).set_body_string("busy"))
            .mount(&server)
            .await;

        let client = client(&server);
        assert_eq!(
            client.cancel_activity(&request).await,
            Err(ApiError::Rejected { message: "活动已开始".into() })
        );
        assert_eq!(
            client.cancel_activity(&request).await,
            Err(ApiError::Http { status: 503, message: "busy".into() })
        );
    }

    #[tokio::test]
    async fn forbidden_means_not_authenticated() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&server)
            .await;

        assert_eq!(
            client(&server).query_activities("1234567890").await.unwrap_err(),
            ApiError::NotAuthenticated
        );
    }

    #[tokio::test]
    async fn product_listing_posts_paging_and_parses_records() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(ApiConfig::default().product_list_path))
            .and(header("cookie", "api_uid=u1"))
            .and(body_json(json!({ "page": 1, "pageSize": 100, "skcTopStatus": 100 })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": true,
                "result": {
                    "total": 1,
                    "page": 1,
                    "pageSize": 100,
                    "records": [{
                        "productSkcId": 88001,
                        "productName": "Desk Lamp",
                        "extCode": "LAMP-01",
                        "salePrice": "19.99",
                        "stock": 42
                    }]
                }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let page = client(&server).list_products(&ProductListQuery::default()).await.unwrap();

        assert_eq!(page.total, 1);
        assert_eq!(page.records.len(), 1);
        assert_eq!(page.records[0].product_id, "88001");
        assert_eq!(page.records[0].sale_price.as_deref(), Some("19.99"));
        assert_eq!(page.records[0].status, "在售");
    }

    #[tokio::test]
    async fn product_listing_failure_carries_portal_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(ApiConfig::default().product_list_path))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": false,
                "errorMsg": "登录已过期"
            })))
            .mount(&server)
            .await;

        assert_eq!(
            client(&server).list_products(&ProductListQuery::default()).await.unwrap_err(),
            ApiError::Rejected { message: "登录已过期".into() }
        );
    }

    #[test]
    fn refuses_to_build_without_site_cookies() {
        let only_foreign = SessionCredentials::new(vec![Cookie {
            name: "api_uid".into(),
            value: "u1".into(),
            domain: "seller.kuajingmaihuo.com".into(),
            path: "/".into(),
        }]);
        let result = PortalActivityClient::new(&SiteConfig::default(), &ApiConfig::default(), &only_foreign);
        assert!(result.is_err());
    }
}
