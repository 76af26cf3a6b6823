use std::time::Duration;

use anyhow::anyhow;
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, warn};

use crate::app::ports::{ScrapedWebsite, WebsiteScraperPort};
use crate::config::WebsiteConfig;

static DOMAIN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^https?://(?:www\.)?([^/?#]+)").expect("valid domain regex"));

static PHONE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:\+?1[-.\s]?)?\(?\d{3}\)?[-.\s]?\d{3}[-.\s]?\d{4}").expect("valid phone regex")
});

/// Lower-case and trim a website address, adding `https://` when no scheme is given
pub fn normalize_url(url: &str) -> Option<String> {
    let url = url.trim().to_lowercase();
    if url.is_empty() {
        return None;
    }
    if url.starts_with("http") {
        Some(url)
    } else {
        Some(format!("https://{}", url))
    }
}

/// Host part of a website address, without any leading `www.`
pub fn domain_of(url: &str) -> Option<String> {
    let url = normalize_url(url)?;
    DOMAIN_RE
        .captures(&url)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

fn selector(css: &str) -> anyhow::Result<Selector> {
    Selector::parse(css).map_err(|e| anyhow!("invalid selector '{}': {:?}", css, e))
}

fn element_text(element: ElementRef<'_>) -> Option<String> {
    let text = element.text().collect::<Vec<_>>().join(" ");
    let text = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

fn first_text(document: &Html, css: &str) -> anyhow::Result<Option<String>> {
    let sel = selector(css)?;
    Ok(document.select(&sel).find_map(element_text))
}

/// Pull provider details out of a page.
///
/// Looks at Open Graph and title tags for the name, `tel:` links or any
/// US-style number for the phone, and schema.org microdata for the address
/// and specialties.
pub fn parse_page(html: &str) -> anyhow::Result<ScrapedWebsite> {
    let document = Html::parse_document(html);

    let og_site_name = selector(r#"meta[property="og:site_name"]"#)?;
    let name = document
        .select(&og_site_name)
        .filter_map(|el| el.value().attr("content"))
        .map(str::trim)
        .find(|s| !s.is_empty())
        .map(str::to_string);
    let name = match name {
        Some(name) => Some(name),
        None => match first_text(&document, "title")? {
            Some(title) => Some(title),
            None => first_text(&document, "h1")?,
        },
    };

    let tel_link = selector(r#"a[href^="tel:"]"#)?;
    let phone = document
        .select(&tel_link)
        .filter_map(|el| el.value().attr("href"))
        .map(|href| href.trim_start_matches("tel:").trim())
        .find(|s| !s.is_empty())
        .map(str::to_string);
    let phone = match phone {
        Some(phone) => Some(phone),
        None => {
            let body = selector("body")?;
            document
                .select(&body)
                .find_map(element_text)
                .and_then(|text| PHONE_RE.find(&text).map(|m| m.as_str().to_string()))
        }
    };

    let specialty_sel = selector(r#"[itemprop="medicalSpecialty"]"#)?;
    let specialties = document.select(&specialty_sel).filter_map(element_text).collect();

    Ok(ScrapedWebsite {
        name,
        phone,
        street: first_text(&document, r#"[itemprop="streetAddress"]"#)?,
        city: first_text(&document, r#"[itemprop="addressLocality"]"#)?,
        state: first_text(&document, r#"[itemprop="addressRegion"]"#)?,
        specialties,
    })
}

/// Fetches provider websites over HTTP and extracts what they publish
pub struct HtmlWebsiteScraper {
    client: reqwest::Client,
}

impl HtmlWebsiteScraper {
    pub fn new(config: &WebsiteConfig) -> crate::error::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .user_agent(config.user_agent.clone())
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl WebsiteScraperPort for HtmlWebsiteScraper {
    async fn scrape(&self, url: &str) -> anyhow::Result<Option<ScrapedWebsite>> {
        let Some(url) = normalize_url(url) else {
            return Ok(None);
        };

        let response = match self.client.get(&url).send().await {
            Ok(response) => response,
            Err(e) => {
                warn!("Website {} unreachable: {}", url, e);
                return Ok(None);
            }
        };
        if !response.status().is_success() {
            warn!("Website {} returned status {}", url, response.status());
            return Ok(None);
        }
        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                warn!("Failed to read body of {}: {}", url, e);
                return Ok(None);
            }
        };

        let site = parse_page(&body)?;
        if site == ScrapedWebsite::default() {
            debug!("No provider details found on {}", url);
            return Ok(None);
        }
        debug!("Scraped {} ({} bytes)", url, body.len());
        Ok(Some(site))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_url() {
        assert_eq!(
            normalize_url(" WWW.Example-Clinic.com "),
            Some("https://www.example-clinic.com".to_string())
        );
        assert_eq!(
            normalize_url("http://clinic.org/about"),
            Some("http://clinic.org/about".to_string())
        );
        assert_eq!(normalize_url("   "), None);
    }

    #[test]
    fn test_domain_strips_www_and_path() {
        assert_eq!(domain_of("https://www.janedoe-peds.com/contact"), Some("janedoe-peds.com".to_string()));
        assert_eq!(domain_of("smallclinic.org"), Some("smallclinic.org".to_string()));
        assert_eq!(domain_of(""), None);
    }

    #[test]
    fn test_parse_page_reads_microdata() {
        let html = r#"
            <html>
              <head>
                <title>Welcome | Example Clinic</title>
                <meta property="og:site_name" content="Example Clinic">
              </head>
              <body>
                <h1>Example Clinic</h1>
                <a href="tel:212-555-1234">Call us</a>
                <div itemscope itemtype="https://schema.org/MedicalClinic">
                  <span itemprop="streetAddress">123 Main St</span>
                  <span itemprop="addressLocality">New York</span>
                  <span itemprop="addressRegion">NY</span>
                  <li itemprop="medicalSpecialty">Cardiology</li>
                  <li itemprop="medicalSpecialty">Internal Medicine</li>
                </div>
              </body>
            </html>"#;

        let site = parse_page(html).unwrap();

        assert_eq!(site.name.as_deref(), Some("Example Clinic"));
        assert_eq!(site.phone.as_deref(), Some("212-555-1234"));
        assert_eq!(site.street.as_deref(), Some("123 Main St"));
        assert_eq!(site.city.as_deref(), Some("New York"));
        assert_eq!(site.state.as_deref(), Some("NY"));
        assert_eq!(site.specialties, vec!["Cardiology", "Internal Medicine"]);
    }

    #[test]
    fn test_parse_page_falls_back_to_title_and_text_phone() {
        let html = "<html><head><title>Dr. Jane Roe</title></head>\
                    <body><p>Appointments: (310) 555-0101</p></body></html>";

        let site = parse_page(html).unwrap();

        assert_eq!(site.name.as_deref(), Some("Dr. Jane Roe"));
        assert_eq!(site.phone.as_deref(), Some("(310) 555-0101"));
        assert!(site.street.is_none());
        assert!(site.specialties.is_empty());
    }
}
