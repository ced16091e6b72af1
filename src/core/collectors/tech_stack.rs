// src/core/collectors/tech_stack.rs

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::header::HeaderMap;
use scraper::{Html, Selector};
use tracing::{debug, info, warn};

use super::{CollectOptions, Collector, CollectorError};
use crate::core::models::{Fragment, FragmentKind, HeaderCheck, Technology, TechnologyFragment};

/// Security headers in reporting order: (header name, display name).
const SECURITY_HEADERS: &[(&str, &str)] = &[
    ("strict-transport-security", "Strict-Transport-Security"),
    ("content-security-policy", "Content-Security-Policy"),
    ("x-frame-options", "X-Frame-Options"),
    ("x-content-type-options", "X-Content-Type-Options"),
    ("x-xss-protection", "X-XSS-Protection"),
    ("referrer-policy", "Referrer-Policy"),
    ("permissions-policy", "Permissions-Policy"),
];

/// First matching header wins.
const CDN_INDICATORS: &[(&str, &str)] = &[
    ("cf-ray", "Cloudflare"),
    ("x-amz-cf-id", "Amazon CloudFront"),
    ("x-served-by", "Fastly"),
    ("x-akamai-transformed", "Akamai"),
    ("x-cdn", "Generic CDN"),
    ("x-cache", "Caching Layer"),
    ("via", "Proxy/CDN"),
];

const NOTE_HEADER_DISCLOSURE: &str = "Version exposed in response headers (information disclosure)";
const NOTE_GENERATOR: &str = "Generator meta tag reveals system information";
const NOTE_WORDPRESS: &str = "WordPress detected: keep core and plugins updated";
const NOTE_DRUPAL: &str = "Drupal detected: check for known CVEs in core and modules";

/// Where a rule looks for its signature.
enum Check {
    Header(&'static str, &'static Lazy<Regex>),
    MetaTag(&'static str, &'static Lazy<Regex>),
    Body(&'static Lazy<Regex>),
    ScriptSrc(&'static Lazy<Regex>),
    LinkHref(&'static Lazy<Regex>),
    Cookie(&'static Lazy<Regex>),
}

struct FingerprintRule {
    tech_name: &'static str,
    category: &'static str,
    check: Check,
    security_note: Option<&'static str>,
}

// The first capture group, when present, is the version.
static RE_NGINX: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)nginx(?:/([\d.]+))?").unwrap());
static RE_APACHE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)apache(?:/([\d.]+))?").unwrap());
static RE_IIS: Lazy<Regex> = Lazy::new(|| Regex::new(r"Microsoft-IIS(?:/([\d.]+))?").unwrap());
static RE_LITESPEED: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)litespeed").unwrap());
static RE_PHP: Lazy<Regex> = Lazy::new(|| Regex::new(r"PHP(?:/([\d.]+))?").unwrap());
static RE_EXPRESS: Lazy<Regex> = Lazy::new(|| Regex::new(r"Express").unwrap());
static RE_ASPNET: Lazy<Regex> = Lazy::new(|| Regex::new(r"([\d.]+)").unwrap());
static RE_NEXTJS_HEADER: Lazy<Regex> = Lazy::new(|| Regex::new(r"Next\.js(?: ([\d.]+))?").unwrap());
static RE_WORDPRESS_META: Lazy<Regex> = Lazy::new(|| Regex::new(r"WordPress ?([\d.]+)?").unwrap());
static RE_WORDPRESS_BODY: Lazy<Regex> = Lazy::new(|| Regex::new(r"/wp-content/|/wp-includes/").unwrap());
static RE_DRUPAL: Lazy<Regex> = Lazy::new(|| Regex::new(r"Drupal ?([\d.]+)?").unwrap());
static RE_DRUPAL_BODY: Lazy<Regex> = Lazy::new(|| Regex::new(r"/sites/default/files/").unwrap());
static RE_JOOMLA: Lazy<Regex> = Lazy::new(|| Regex::new(r"Joomla!").unwrap());
static RE_DJANGO: Lazy<Regex> = Lazy::new(|| Regex::new(r"csrfmiddlewaretoken|csrftoken").unwrap());
static RE_LARAVEL: Lazy<Regex> = Lazy::new(|| Regex::new(r"laravel_session|XSRF-TOKEN").unwrap());
static RE_RAILS: Lazy<Regex> = Lazy::new(|| Regex::new(r"_rails_session|csrf-param").unwrap());
static RE_NEXTJS_SCRIPT: Lazy<Regex> = Lazy::new(|| Regex::new(r"/_next/static/").unwrap());
static RE_NUXT: Lazy<Regex> = Lazy::new(|| Regex::new(r"__NUXT__|/_nuxt/").unwrap());
static RE_GATSBY: Lazy<Regex> = Lazy::new(|| Regex::new(r#"id=["']___gatsby["']"#).unwrap());
static RE_ANGULAR: Lazy<Regex> = Lazy::new(|| Regex::new(r#"ng-version="([\d.]+)""#).unwrap());
static RE_REACT: Lazy<Regex> = Lazy::new(|| Regex::new(r"react(?:-dom)?(?:@|[.-])?([\d]+\.[\d]+\.[\d]+)?").unwrap());
static RE_VUE: Lazy<Regex> = Lazy::new(|| Regex::new(r"data-v-app|__VUE__").unwrap());
static RE_JQUERY: Lazy<Regex> = Lazy::new(|| Regex::new(r"jquery(?:[.-]?([\d]+\.[\d]+\.[\d]+))?").unwrap());
static RE_BOOTSTRAP: Lazy<Regex> = Lazy::new(|| Regex::new(r"bootstrap(?:@|[.-])?([\d]+\.[\d]+\.[\d]+)?[^/]*\.css").unwrap());
static RE_TAILWIND: Lazy<Regex> = Lazy::new(|| Regex::new(r"tailwind").unwrap());
static RE_GOOGLE_ANALYTICS: Lazy<Regex> = Lazy::new(|| Regex::new(r"google-analytics\.com/").unwrap());
static RE_GTM: Lazy<Regex> = Lazy::new(|| Regex::new(r"googletagmanager\.com/").unwrap());
static RE_HOTJAR: Lazy<Regex> = Lazy::new(|| Regex::new(r"static\.hotjar\.com").unwrap());
static RE_MIXPANEL: Lazy<Regex> = Lazy::new(|| Regex::new(r"cdn\.mxpnl\.com|mixpanel\.com").unwrap());
static RE_SEGMENT: Lazy<Regex> = Lazy::new(|| Regex::new(r"cdn\.segment\.com").unwrap());

static RULES: &[FingerprintRule] = &[
    FingerprintRule { tech_name: "Nginx", category: "Web Server", check: Check::Header("server", &RE_NGINX), security_note: None },
    FingerprintRule { tech_name: "Apache", category: "Web Server", check: Check::Header("server", &RE_APACHE), security_note: None },
    FingerprintRule { tech_name: "IIS", category: "Web Server", check: Check::Header("server", &RE_IIS), security_note: None },
    FingerprintRule { tech_name: "LiteSpeed", category: "Web Server", check: Check::Header("server", &RE_LITESPEED), security_note: None },
    FingerprintRule { tech_name: "PHP", category: "Backend Framework", check: Check::Header("x-powered-by", &RE_PHP), security_note: Some(NOTE_HEADER_DISCLOSURE) },
    FingerprintRule { tech_name: "Express", category: "Backend Framework", check: Check::Header("x-powered-by", &RE_EXPRESS), security_note: Some(NOTE_HEADER_DISCLOSURE) },
    FingerprintRule { tech_name: "ASP.NET", category: "Web Framework", check: Check::Header("x-aspnet-version", &RE_ASPNET), security_note: Some(NOTE_HEADER_DISCLOSURE) },
    FingerprintRule { tech_name: "Next.js", category: "React Framework", check: Check::Header("x-powered-by", &RE_NEXTJS_HEADER), security_note: Some(NOTE_HEADER_DISCLOSURE) },
    FingerprintRule { tech_name: "WordPress", category: "CMS", check: Check::MetaTag("generator", &RE_WORDPRESS_META), security_note: Some(NOTE_GENERATOR) },
    FingerprintRule { tech_name: "WordPress", category: "CMS", check: Check::Body(&RE_WORDPRESS_BODY), security_note: Some(NOTE_WORDPRESS) },
    FingerprintRule { tech_name: "Drupal", category: "CMS", check: Check::MetaTag("generator", &RE_DRUPAL), security_note: Some(NOTE_GENERATOR) },
    FingerprintRule { tech_name: "Drupal", category: "CMS", check: Check::Body(&RE_DRUPAL_BODY), security_note: Some(NOTE_DRUPAL) },
    FingerprintRule { tech_name: "Joomla", category: "CMS", check: Check::MetaTag("generator", &RE_JOOMLA), security_note: Some(NOTE_GENERATOR) },
    FingerprintRule { tech_name: "Django", category: "Web Framework", check: Check::Body(&RE_DJANGO), security_note: None },
    FingerprintRule { tech_name: "Django", category: "Web Framework", check: Check::Cookie(&RE_DJANGO), security_note: None },
    FingerprintRule { tech_name: "Laravel", category: "PHP Framework", check: Check::Cookie(&RE_LARAVEL), security_note: None },
    FingerprintRule { tech_name: "Ruby on Rails", category: "Web Framework", check: Check::Cookie(&RE_RAILS), security_note: None },
    FingerprintRule { tech_name: "Next.js", category: "React Framework", check: Check::ScriptSrc(&RE_NEXTJS_SCRIPT), security_note: None },
    FingerprintRule { tech_name: "Nuxt.js", category: "Vue Framework", check: Check::Body(&RE_NUXT), security_note: None },
    FingerprintRule { tech_name: "Gatsby", category: "Static Site Generator", check: Check::Body(&RE_GATSBY), security_note: None },
    FingerprintRule { tech_name: "Angular", category: "JavaScript Framework", check: Check::Body(&RE_ANGULAR), security_note: None },
    FingerprintRule { tech_name: "React", category: "JavaScript Framework", check: Check::ScriptSrc(&RE_REACT), security_note: None },
    FingerprintRule { tech_name: "Vue.js", category: "JavaScript Framework", check: Check::Body(&RE_VUE), security_note: None },
    FingerprintRule { tech_name: "jQuery", category: "JavaScript Library", check: Check::ScriptSrc(&RE_JQUERY), security_note: None },
    FingerprintRule { tech_name: "Bootstrap", category: "CSS Framework", check: Check::LinkHref(&RE_BOOTSTRAP), security_note: None },
    FingerprintRule { tech_name: "TailwindCSS", category: "CSS Framework", check: Check::LinkHref(&RE_TAILWIND), security_note: None },
    FingerprintRule { tech_name: "Google Analytics", category: "Analytics", check: Check::ScriptSrc(&RE_GOOGLE_ANALYTICS), security_note: None },
    FingerprintRule { tech_name: "Google Tag Manager", category: "Analytics", check: Check::ScriptSrc(&RE_GTM), security_note: None },
    FingerprintRule { tech_name: "Hotjar", category: "Analytics", check: Check::Body(&RE_HOTJAR), security_note: None },
    FingerprintRule { tech_name: "Mixpanel", category: "Analytics", check: Check::Body(&RE_MIXPANEL), security_note: None },
    FingerprintRule { tech_name: "Segment", category: "Analytics", check: Check::Body(&RE_SEGMENT), security_note: None },
];

/// Fetches the landing page (HTTPS, then HTTP) and fingerprints the stack
/// from headers, cookies and markup.
pub struct TechStackCollector {
    client: reqwest::Client,
}

impl TechStackCollector {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    async fn fetch(&self, domain: &str) -> Result<(HeaderMap, String), CollectorError> {
        let mut last_error = None;
        for scheme in ["https", "http"] {
            let url = format!("{}://{}", scheme, domain);
            match self.client.get(&url).send().await {
                Ok(response) => {
                    info!(status = %response.status(), url = %url, "Received HTTP response.");
                    let headers = response.headers().clone();
                    let body = response.text().await?;
                    debug!(bytes = body.len(), "Read response body.");
                    return Ok((headers, body));
                }
                Err(e) => {
                    warn!(url = %url, error = %e, "HTTP request failed.");
                    last_error = Some(e);
                }
            }
        }
        match last_error {
            Some(e) => Err(CollectorError::Http(e)),
            None => Err(CollectorError::Task("no scheme attempted".into())),
        }
    }
}

#[async_trait]
impl Collector for TechStackCollector {
    fn kind(&self) -> FragmentKind {
        FragmentKind::TechStack
    }

    async fn collect(
        &self,
        target: &str,
        _options: &CollectOptions,
    ) -> Result<Option<Fragment>, CollectorError> {
        info!(target, "Starting technology fingerprint scan.");
        let (headers, body) = self.fetch(target).await?;
        let fragment = analyze(target, &headers, &body);
        info!(
            technologies = fragment.technologies.len(),
            missing_headers = fragment.missing_headers().count(),
            "Technology fingerprint scan finished."
        );
        Ok(Some(Fragment::TechStack(fragment)))
    }
}

/// Builds the fragment from one HTTP response.
pub fn analyze(domain: &str, headers: &HeaderMap, body: &str) -> TechnologyFragment {
    let document = Html::parse_document(body);
    let cookies = headers
        .get_all("set-cookie")
        .into_iter()
        .filter_map(|v| v.to_str().ok())
        .collect::<Vec<_>>()
        .join("; ");
    let header = |name: &str| headers.get(name).and_then(|v| v.to_str().ok());

    let mut technologies: Vec<Technology> = Vec::new();
    debug!(total_rules = RULES.len(), "Applying fingerprinting rules.");
    for rule in RULES {
        let version = match &rule.check {
            Check::Header(name, re) => check_with_regex(header(*name), re),
            Check::MetaTag(name, re) => check_meta_tag(&document, name, re),
            Check::Body(re) => check_with_regex(Some(body), re),
            Check::ScriptSrc(re) => check_attr(&document, "script[src]", "src", re),
            Check::LinkHref(re) => check_attr(&document, "link[href]", "href", re),
            Check::Cookie(re) => check_with_regex(Some(&cookies), re),
        };
        let Some(version) = version else { continue };

        debug!(tech = rule.tech_name, version = ?version, "Rule matched.");
        match technologies.iter_mut().find(|t| t.name == rule.tech_name) {
            Some(existing) => {
                if existing.version.is_none() {
                    existing.version = version;
                }
                if existing.security_note.is_none() {
                    existing.security_note = rule.security_note.map(String::from);
                }
            }
            None => technologies.push(Technology {
                name: rule.tech_name.to_string(),
                category: rule.category.to_string(),
                version,
                security_note: rule.security_note.map(String::from),
            }),
        }
    }

    // A version in the Server banner is a disclosure in its own right.
    for tech in technologies.iter_mut().filter(|t| t.category == "Web Server") {
        if tech.version.is_some() && tech.security_note.is_none() {
            tech.security_note = Some(NOTE_HEADER_DISCLOSURE.to_string());
        }
    }

    let security_headers = SECURITY_HEADERS
        .iter()
        .map(|(key, name)| HeaderCheck { name: name.to_string(), present: headers.contains_key(*key) })
        .collect();
    let cdn = CDN_INDICATORS
        .iter()
        .find(|(key, _)| headers.contains_key(*key))
        .map(|(_, name)| name.to_string())
        .or_else(|| {
            header("server")
                .filter(|s| s.to_lowercase().contains("cloudflare"))
                .map(|_| "Cloudflare".to_string())
        });
    let analytics = technologies
        .iter()
        .filter(|t| t.category == "Analytics")
        .map(|t| t.name.clone())
        .collect();

    let mut fragment = TechnologyFragment {
        domain: domain.to_string(),
        web_server: header("server").map(String::from),
        cdn,
        technologies,
        security_headers,
        analytics,
        notes: Vec::new(),
    };
    fragment.notes = notes(&fragment);
    fragment
}

/// `Some(version)` when the pattern matched; the inner option is the
/// captured version, if any.
fn check_with_regex(text: Option<&str>, re: &Regex) -> Option<Option<String>> {
    let caps = re.captures(text?)?;
    Some(caps.get(1).map(|m| m.as_str().to_string()).filter(|s| !s.is_empty()))
}

fn check_meta_tag(doc: &Html, name: &str, re: &Regex) -> Option<Option<String>> {
    let selector = Selector::parse(&format!("meta[name='{}']", name)).ok()?;
    doc.select(&selector)
        .filter_map(|el| el.value().attr("content"))
        .find_map(|content| check_with_regex(Some(content), re))
}

fn check_attr(doc: &Html, css: &str, attr: &str, re: &Regex) -> Option<Option<String>> {
    let selector = Selector::parse(css).ok()?;
    doc.select(&selector)
        .filter_map(|el| el.value().attr(attr))
        .find_map(|value| check_with_regex(Some(value), re))
}

fn notes(fragment: &TechnologyFragment) -> Vec<String> {
    let mut notes = Vec::new();

    if let Some(server) = fragment.web_server.as_deref().map(str::to_lowercase) {
        if server.contains("apache") {
            notes.push("Apache server: check for misconfigured .htaccess and directory listings".to_string());
        } else if server.contains("nginx") {
            notes.push("Nginx server: review configuration for path traversal issues".to_string());
        } else if server.contains("iis") {
            notes.push("IIS server: check for outdated versions and default configurations".to_string());
        }
    }

    let missing: Vec<&str> = fragment.missing_headers().map(|h| h.name.as_str()).collect();
    if missing.is_empty() {
        notes.push("Good security header implementation".to_string());
    } else {
        notes.push(format!("Missing security headers: {}", missing.join(", ")));
    }

    match &fragment.cdn {
        Some(cdn) => notes.push(format!("Using CDN ({}): DDoS protection and caching in place", cdn)),
        None => notes.push("No CDN detected: origin server directly exposed".to_string()),
    }

    let versioned = fragment.technologies.iter().filter(|t| t.version.is_some()).count();
    if versioned > 0 {
        notes.push(format!("{} technologies with exposed versions, verify if outdated", versioned));
    }

    notes
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.append(*name, HeaderValue::from_static(*value));
        }
        map
    }

    #[test]
    fn headers_reveal_server_versions_and_cdn() {
        let map = headers(&[
            ("server", "nginx/1.18.0"),
            ("x-powered-by", "PHP/7.4.3"),
            ("cf-ray", "7d1-LHR"),
            ("strict-transport-security", "max-age=31536000"),
        ]);
        let fragment = analyze("example.com", &map, "<html></html>");

        let nginx = fragment.technologies.iter().find(|t| t.name == "Nginx").unwrap();
        assert_eq!(nginx.version.as_deref(), Some("1.18.0"));
        assert!(nginx.security_note.as_deref().unwrap().contains("exposed"));
        let php = fragment.technologies.iter().find(|t| t.name == "PHP").unwrap();
        assert_eq!(php.version.as_deref(), Some("7.4.3"));

        assert_eq!(fragment.cdn.as_deref(), Some("Cloudflare"));
        assert_eq!(fragment.security_headers.len(), 7);
        assert!(fragment.security_headers[0].present);
        assert_eq!(fragment.missing_headers().count(), 6);
    }

    #[test]
    fn markup_rules_detect_cms_and_libraries() {
        let body = r#"<html><head>
            <meta name="generator" content="WordPress 6.4.2">
            <link rel="stylesheet" href="/css/bootstrap.min.css">
            <script src="/wp-includes/js/jquery/jquery-3.7.1.min.js"></script>
            <script src="https://www.googletagmanager.com/gtag/js?id=G-1"></script>
            </head><body class="wp-content"></body></html>"#;
        let fragment = analyze("blog.example.com", &HeaderMap::new(), body);

        let names: Vec<_> = fragment.technologies.iter().map(|t| t.name.as_str()).collect();
        assert!(names.contains(&"WordPress"));
        assert!(names.contains(&"jQuery"));
        assert!(names.contains(&"Bootstrap"));
        let wp = fragment.technologies.iter().find(|t| t.name == "WordPress").unwrap();
        assert_eq!(wp.version.as_deref(), Some("6.4.2"));
        assert_eq!(fragment.analytics, vec!["Google Tag Manager".to_string()]);
        assert!(fragment.cdn.is_none());
        assert!(fragment.notes.iter().any(|n| n.starts_with("No CDN detected")));
    }

    #[test]
    fn cookies_identify_backend_frameworks() {
        let map = headers(&[("set-cookie", "laravel_session=abc; HttpOnly")]);
        let fragment = analyze("app.example.com", &map, "");
        assert!(fragment.technologies.iter().any(|t| t.name == "Laravel"));
    }
}
