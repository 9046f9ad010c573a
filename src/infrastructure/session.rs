//! Session credentials harvested from a logged-in browser session
//!
//! The portal authenticates with cookies only. A cookie dump holds cookies for
//! several related hosts; `for_site` keeps the ones the target host would receive.

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use url::Url;

/// Cookies whose presence means the user is logged in
const LOGIN_COOKIES: [&str; 3] = ["SUB_PASS_ID", "_bee", "api_uid"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cookie {
    pub name: String,
    pub value: String,
    #[serde(default)]
    pub domain: String,
    #[serde(default = "default_path")]
    pub path: String,
}

fn default_path() -> String {
    "/".to_string()
}

/// Host split into the full name and its registrable domain
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomainInfo {
    pub full_domain: String,
    /// Last two labels, e.g. `temu.com` for `agentseller-us.temu.com`
    pub main_domain: String,
}

impl DomainInfo {
    pub fn from_url(url: &str) -> Result<Self> {
        let parsed = Url::parse(url).with_context(|| format!("Invalid site url: {url}"))?;
        let full_domain = parsed
            .host_str()
            .with_context(|| format!("Site url has no host: {url}"))?
            .to_ascii_lowercase();

        let labels: Vec<&str> = full_domain.split('.').collect();
        let main_domain = if labels.len() >= 2 {
            labels[labels.len() - 2..].join(".")
        } else {
            full_domain.clone()
        };
        Ok(Self { full_domain, main_domain })
    }

    /// Whether a cookie set for `cookie_domain` belongs to this site
    #[must_use]
    pub fn accepts(&self, cookie_domain: &str) -> bool {
        let cookie_domain = cookie_domain.to_ascii_lowercase();
        let bare = cookie_domain.strip_prefix('.').unwrap_or(&cookie_domain);
        bare == self.full_domain || bare == self.main_domain
    }
}

/// Opaque credential bundle for one site
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionCredentials {
    pub cookies: Vec<Cookie>,
    #[serde(default)]
    pub mall_id: Option<String>,
}

/// Cookie dumps come either as a bare array or wrapped with the mall id
#[derive(Deserialize)]
#[serde(untagged)]
enum CookieDump {
    Bare(Vec<Cookie>),
    Wrapped(SessionCredentials),
}

impl SessionCredentials {
    #[must_use]
    pub fn new(cookies: Vec<Cookie>) -> Self {
        Self { cookies, mall_id: None }
    }

    #[must_use]
    pub fn with_mall_id(mut self, mall_id: impl Into<String>) -> Self {
        self.mall_id = Some(mall_id.into());
        self
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let dump: CookieDump = serde_json::from_str(json).context("Failed to parse cookie dump")?;
        Ok(match dump {
            CookieDump::Bare(cookies) => Self::new(cookies),
            CookieDump::Wrapped(credentials) => credentials,
        })
    }

    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read cookie file {}", path.display()))?;
        let credentials = Self::from_json(&content)?;
        info!("🍪 Loaded {} cookies from {}", credentials.cookies.len(), path.display());
        Ok(credentials)
    }

    /// Cookies the given site would receive
    pub fn for_site(&self, site_url: &str) -> Result<Self> {
        let domain = DomainInfo::from_url(site_url)?;
        let cookies: Vec<Cookie> = self
            .cookies
            .iter()
            .filter(|c| domain.accepts(&c.domain))
            .cloned()
            .collect();
        debug!(
            "Kept {}/{} cookies for {} (main domain {})",
            cookies.len(),
            self.cookies.len(),
            domain.full_domain,
            domain.main_domain
        );
        Ok(Self { cookies, mall_id: self.mall_id.clone() })
    }

    /// `name=value; name=value`
    #[must_use]
    pub fn cookie_header(&self) -> String {
        self.cookies
            .iter()
            .map(|c| format!("{}={}", c.name, c.value))
            .collect::<Vec<_>>()
            .join("; ")
    }

    #[must_use]
    pub fn has_login_cookie(&self) -> bool {
        self.cookies.iter().any(|c| LOGIN_COOKIES.contains(&c.name.as_str()))
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cookies.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn cookie(name: &str, domain: &str) -> Cookie {
        Cookie { name: name.into(), value: format!("{name}-v"), domain: domain.into(), path: "/".into() }
    }

    #[rstest]
    #[case("agentseller-us.temu.com", true)]
    #[case(".agentseller-us.temu.com", true)]
    #[case("temu.com", true)]
    #[case(".temu.com", true)]
    #[case("agentseller-eu.temu.com", false)]
    #[case("seller.kuajingmaihuo.com", false)]
    fn domain_matching(#[case] cookie_domain: &str, #[case] expected: bool) {
        let info = DomainInfo::from_url("https://agentseller-us.temu.com/").unwrap();
        assert_eq!(info.main_domain, "temu.com");
        assert_eq!(info.accepts(cookie_domain), expected);
    }

    #[test]
    fn for_site_filters_and_builds_header() {
        let credentials = SessionCredentials::new(vec![
            cookie("api_uid", ".temu.com"),
            cookie("SUB_PASS_ID", "seller.kuajingmaihuo.com"),
            cookie("_bee", "agentseller.temu.com"),
        ])
        .with_mall_id("634418212233");

        let site = credentials.for_site("https://agentseller.temu.com/").unwrap();
        assert_eq!(site.cookie_header(), "api_uid=api_uid-v; _bee=_bee-v");
        assert_eq!(site.mall_id.as_deref(), Some("634418212233"));
        assert!(site.has_login_cookie());

        let center = credentials.for_site("https://seller.kuajingmaihuo.com/main").unwrap();
        assert_eq!(center.cookies.len(), 1);
        assert!(credentials.for_site("not a url").is_err());
    }

    #[test]
    fn parses_bare_and_wrapped_dumps() {
        let bare = r#"[{"name": "api_uid", "value": "x", "domain": ".temu.com"}]"#;
        let parsed = SessionCredentials::from_json(bare).unwrap();
        assert_eq!(parsed.cookies[0].path, "/");
        assert_eq!(parsed.mall_id, None);

        let wrapped = r#"{"cookies": [{"name": "n", "value": "v"}], "mall_id": "42"}"#;
        let parsed = SessionCredentials::from_json(wrapped).unwrap();
        assert_eq!(parsed.mall_id.as_deref(), Some("42"));
        assert!(!parsed.has_login_cookie());

        assert!(SessionCredentials::from_json("{").is_err());
    }

    #[tokio::test]
    async fn loads_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cookies.json");
        std::fs::write(&path, r#"[{"name": "_bee", "value": "b", "domain": "temu.com"}]"#).unwrap();

        let credentials = SessionCredentials::load(&path).await.unwrap();
        assert!(credentials.has_login_cookie());
        assert!(SessionCredentials::load(dir.path().join("missing.json")).await.is_err());
    }
}
