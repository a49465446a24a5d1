//! Crawler-facing documents: the XML sitemap and robots.txt.

use axum::extract::State;
use axum::http::{header, HeaderMap};
use axum::response::{IntoResponse, Response};
use chrono::NaiveDate;

use crate::api::types::ApiContext;

/// Public pages with their sitemap priority and change frequency.
pub const SITE_ROUTES: [(&str, f32, &str); 6] = [
    ("/", 1.0, "weekly"),
    ("/features", 0.9, "weekly"),
    ("/pricing", 0.9, "weekly"),
    ("/demo", 0.8, "monthly"),
    ("/about", 0.7, "monthly"),
    ("/contact", 0.7, "monthly"),
];

const SITEMAP_CACHE_CONTROL: &str = "public, max-age=3600";

pub fn sitemap_xml(site_url: &str, last_modified: NaiveDate) -> String {
    let base = site_url.trim_end_matches('/');
    let lastmod = last_modified.format("%Y-%m-%d");

    let mut xml = String::from(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
         <urlset xmlns=\"http://www.sitemaps.org/schemas/sitemap/0.9\">\n",
    );
    for (path, priority, changefreq) in SITE_ROUTES {
        let loc = if path == "/" {
            format!("{base}/")
        } else {
            format!("{base}{path}")
        };
        xml.push_str(&format!(
            "  <url>\n    <loc>{loc}</loc>\n    <lastmod>{lastmod}</lastmod>\n    \
             <changefreq>{changefreq}</changefreq>\n    \
             <priority>{priority:.1}</priority>\n  </url>\n"
        ));
    }
    xml.push_str("</urlset>\n");
    xml
}

pub fn robots_txt(host: &str) -> String {
    format!(
        "User-agent: *\n\
         Allow: /\n\
         Disallow: /api/\n\
         Disallow: /dashboard\n\
         \n\
         Sitemap: https://{host}/api/sitemap\n"
    )
}

/// Host of the configured site URL, used when a request carries no Host header.
fn configured_host(site_url: &str) -> &str {
    let without_scheme = site_url
        .split_once("://")
        .map(|(_, rest)| rest)
        .unwrap_or(site_url);
    without_scheme.split('/').next().unwrap_or(without_scheme)
}

/// `GET /api/sitemap`
pub async fn sitemap(State(ctx): State<ApiContext>) -> Response {
    let body = sitemap_xml(&ctx.config.site_url, crate::validation::today());
    (
        [
            (header::CONTENT_TYPE, "application/xml"),
            (header::CACHE_CONTROL, SITEMAP_CACHE_CONTROL),
        ],
        body,
    )
        .into_response()
}

/// `GET /robots.txt`
pub async fn robots(State(ctx): State<ApiContext>, headers: HeaderMap) -> Response {
    let host = headers
        .get(header::HOST)
        .and_then(|h| h.to_str().ok())
        .filter(|h| !h.is_empty())
        .unwrap_or_else(|| configured_host(&ctx.config.site_url))
        .to_string();

    ([(header::CONTENT_TYPE, "text/plain")], robots_txt(&host)).into_response()
}
