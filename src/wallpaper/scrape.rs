//! Locating a skin's full-size artwork on the wiki.
//!
//! The cosmetics page opens its file viewer client-side, so the file named
//! in the page's `file=` parameter is looked up through the wiki's MediaWiki
//! API instead. When the API itself is unusable the file's description page
//! is read and its full-size link taken from the HTML.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use reqwest::Url;
use scraper::{Html, Selector};
use serde::Deserialize;
use tokio_util::sync::CancellationToken;

use crate::fetch::{ByteSource, FetchError};

/// Anchors that point at the original upload: the file viewer's link and
/// the description page's image and "Original file" links.
const FULL_SIZE_LINK: &str = "a.see-full-size-link, .fullImageLink > a, .fullMedia a.internal";

/// What a scrape produced. A timeout is imposed by the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScrapeReply {
    Url(String),
    Fail,
}

/// Turns a wiki page URL into a direct image URL.
#[async_trait]
pub trait PageScraper: Send + Sync {
    async fn resolve(&self, page_url: &str) -> ScrapeReply;
}

/// [`PageScraper`] for Fandom wikis, backed by the MediaWiki API.
pub struct FandomScraper {
    source: Arc<dyn ByteSource>,
}

impl FandomScraper {
    pub fn new(source: Arc<dyn ByteSource>) -> Self {
        Self { source }
    }

    /// Original-upload URL from `imageinfo`. `None` when the wiki answered
    /// but has no such file.
    async fn image_info(&self, lookup: &FileLookup) -> Result<Option<String>, FetchError> {
        let url = lookup.api_url.as_str();
        let body = self.source.download(url).await?;
        let reply: ApiReply =
            serde_json::from_slice(&body).map_err(|source| FetchError::Decode {
                url: url.to_string(),
                source,
            })?;
        if let Some(error) = reply.error {
            return Err(FetchError::Payload {
                url: url.to_string(),
                reason: format!("{}: {}", error.code, error.info),
            });
        }
        Ok(reply
            .query
            .into_iter()
            .flat_map(|query| query.pages)
            .flat_map(|page| page.imageinfo)
            .map(|info| info.url)
            .find(|url| !url.is_empty())
            .map(|url| absolute_url(&url)))
    }
}

#[async_trait]
impl PageScraper for FandomScraper {
    async fn resolve(&self, page_url: &str) -> ScrapeReply {
        let Some(lookup) = FileLookup::from_page_url(page_url) else {
            tracing::warn!(url = page_url, "Wiki page URL names no file");
            return ScrapeReply::Fail;
        };

        match self.image_info(&lookup).await {
            Ok(Some(url)) => return ScrapeReply::Url(url),
            Ok(None) => {
                tracing::debug!(file = %lookup.file, "Wiki has no file for this skin");
                return ScrapeReply::Fail;
            }
            Err(e) => tracing::warn!(
                file = %lookup.file,
                error = %e,
                "Wiki API unusable, reading the file page"
            ),
        }

        let body = match self.source.download(lookup.file_page_url.as_str()).await {
            Ok(body) => body,
            Err(e) => {
                tracing::warn!(url = %lookup.file_page_url, error = %e, "Wiki file page unavailable");
                return ScrapeReply::Fail;
            }
        };
        match extract_full_size_link(&String::from_utf8_lossy(&body)) {
            Some(url) => ScrapeReply::Url(url),
            None => ScrapeReply::Fail,
        }
    }
}

/// Where to ask about the file a cosmetics page URL refers to.
#[derive(Debug)]
struct FileLookup {
    file: String,
    api_url: Url,
    file_page_url: Url,
}

impl FileLookup {
    fn from_page_url(page_url: &str) -> Option<Self> {
        let page = Url::parse(page_url).ok()?;
        let file = page
            .query_pairs()
            .find(|(key, _)| key == "file")
            .map(|(_, value)| value.into_owned())
            .filter(|file| !file.is_empty())?;
        let title = format!("File:{file}");

        let mut api_url = page.join("/api.php").ok()?;
        api_url.query_pairs_mut().extend_pairs([
            ("action", "query"),
            ("titles", title.as_str()),
            ("prop", "imageinfo"),
            ("iiprop", "url"),
            ("format", "json"),
            ("formatversion", "2"),
        ]);
        let file_page_url = page.join(&format!("/wiki/{title}")).ok()?;

        Some(Self {
            file,
            api_url,
            file_page_url,
        })
    }
}

#[derive(Debug, Deserialize)]
struct ApiReply {
    #[serde(default)]
    query: Option<ApiQuery>,
    #[serde(default)]
    error: Option<ApiFailure>,
}

#[derive(Debug, Deserialize)]
struct ApiFailure {
    #[serde(default)]
    code: String,
    #[serde(default)]
    info: String,
}

#[derive(Debug, Deserialize)]
struct ApiQuery {
    #[serde(default)]
    pages: Vec<ApiPage>,
}

/// One page of a `formatversion=2` reply. A missing file carries
/// `"missing": true` and no `imageinfo`.
#[derive(Debug, Deserialize)]
struct ApiPage {
    #[serde(default)]
    imageinfo: Vec<ImageInfo>,
}

#[derive(Debug, Deserialize)]
struct ImageInfo {
    url: String,
}

/// `href` of the first full-size link in a wiki page, made absolute.
pub fn extract_full_size_link(html: &str) -> Option<String> {
    let selector = Selector::parse(FULL_SIZE_LINK).ok()?;
    let document = Html::parse_document(html);
    document
        .select(&selector)
        .filter_map(|anchor| anchor.value().attr("href"))
        .find(|href| !href.is_empty())
        .map(absolute_url)
}

/// Wiki image links are often protocol-relative.
fn absolute_url(href: &str) -> String {
    match href.strip_prefix("//") {
        Some(rest) => format!("https://{rest}"),
        None => href.to_string(),
    }
}

/// A registered resolution. Holds the token that fires when a newer
/// registration replaces it.
#[derive(Debug)]
pub struct Registration {
    generation: u64,
    token: CancellationToken,
}

impl Registration {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub async fn superseded(&self) {
        self.token.cancelled().await
    }
}

/// Single outstanding resolution. Registering cancels whatever was
/// registered before; the last caller wins.
#[derive(Debug, Default)]
pub struct ResolutionSlot {
    generation: AtomicU64,
    current: Mutex<Option<CancellationToken>>,
}

impl ResolutionSlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self) -> Registration {
        let mut current = self.current.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(previous) = current.take() {
            previous.cancel();
        }
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let token = CancellationToken::new();
        *current = Some(token.clone());
        Registration { generation, token }
    }

    /// Whether `registration` is still the latest one.
    pub fn is_current(&self, registration: &Registration) -> bool {
        self.generation.load(Ordering::SeqCst) == registration.generation
    }

    /// Free the slot if `registration` still owns it.
    pub fn release(&self, registration: &Registration) {
        let mut current = self.current.lock().unwrap_or_else(|e| e.into_inner());
        if self.is_current(registration) {
            *current = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::collections::HashMap;

    const PAGE_URL: &str =
        "https://wiki.test/wiki/Aatrox/LoL/Cosmetics?file=Aatrox_JusticarSkin_HD.jpg";
    const HD_URL: &str = "https://static.wikia.nocookie.net/leagueoflegends/images/a/ab/Aatrox_JusticarSkin_HD.jpg/revision/latest?cb=20200929";

    /// Serves canned bodies; any URL containing a key gets that body, the
    /// rest get a 404.
    #[derive(Default)]
    struct ScriptedWiki {
        routes: HashMap<&'static str, String>,
        calls: Mutex<Vec<String>>,
    }

    impl ScriptedWiki {
        fn route(mut self, fragment: &'static str, body: impl Into<String>) -> Self {
            self.routes.insert(fragment, body.into());
            self
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ByteSource for ScriptedWiki {
        async fn download(&self, url: &str) -> Result<Vec<u8>, FetchError> {
            self.calls.lock().unwrap().push(url.to_string());
            self.routes
                .iter()
                .find(|(fragment, _)| url.contains(*fragment))
                .map(|(_, body)| body.clone().into_bytes())
                .ok_or_else(|| FetchError::HttpStatus {
                    status: 404,
                    url: url.to_string(),
                })
        }
    }

    fn scraper(wiki: ScriptedWiki) -> (FandomScraper, Arc<ScriptedWiki>) {
        let wiki = Arc::new(wiki);
        (FandomScraper::new(wiki.clone()), wiki)
    }

    #[tokio::test]
    async fn test_api_imageinfo_url_is_returned() {
        let reply = format!(
            r#"{{"batchcomplete":true,"query":{{"pages":[{{"pageid":9,"ns":6,"title":"File:Aatrox JusticarSkin HD.jpg","imageinfo":[{{"url":"{HD_URL}","descriptionurl":"https://wiki.test/wiki/File:Aatrox_JusticarSkin_HD.jpg"}}]}}]}}}}"#
        );
        let (scraper, wiki) = scraper(ScriptedWiki::default().route("/api.php", reply));

        assert_eq!(scraper.resolve(PAGE_URL).await, ScrapeReply::Url(HD_URL.to_string()));

        let calls = wiki.calls();
        assert_eq!(calls.len(), 1);
        assert!(calls[0].starts_with("https://wiki.test/api.php?action=query&"));
        assert!(calls[0].contains("titles=File%3AAatrox_JusticarSkin_HD.jpg"));
        assert!(calls[0].contains("prop=imageinfo&iiprop=url&format=json"));
    }

    #[tokio::test]
    async fn test_missing_file_is_a_fail_without_page_fallback() {
        let reply = r#"{"batchcomplete":true,"query":{"pages":[{"ns":6,"title":"File:Aatrox JusticarSkin HD.jpg","missing":true}]}}"#;
        let (scraper, wiki) = scraper(ScriptedWiki::default().route("/api.php", reply));

        assert_eq!(scraper.resolve(PAGE_URL).await, ScrapeReply::Fail);
        assert_eq!(wiki.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_page_without_imageinfo_is_a_fail() {
        let reply = r#"{"query":{"pages":[{"pageid":9,"ns":6,"title":"File:Aatrox JusticarSkin HD.jpg"}]}}"#;
        let (scraper, _) = scraper(ScriptedWiki::default().route("/api.php", reply));
        assert_eq!(scraper.resolve(PAGE_URL).await, ScrapeReply::Fail);
    }

    #[tokio::test]
    async fn test_api_error_falls_back_to_file_page() {
        let api_error = r#"{"error":{"code":"readapidenied","info":"You need read permission"}}"#;
        let page = format!(
            r#"<html><body><div class="fullImageLink" id="file"><a href="{HD_URL}"><img src="thumb.jpg"></a></div></body></html>"#
        );
        let (scraper, wiki) = scraper(
            ScriptedWiki::default()
                .route("/api.php", api_error)
                .route("/wiki/File:", page),
        );

        assert_eq!(scraper.resolve(PAGE_URL).await, ScrapeReply::Url(HD_URL.to_string()));
        assert_eq!(
            wiki.calls()[1],
            "https://wiki.test/wiki/File:Aatrox_JusticarSkin_HD.jpg"
        );
    }

    #[tokio::test]
    async fn test_unreachable_wiki_is_a_fail() {
        let (scraper, wiki) = scraper(ScriptedWiki::default());
        assert_eq!(scraper.resolve(PAGE_URL).await, ScrapeReply::Fail);
        assert_eq!(wiki.calls().len(), 2);
    }

    #[tokio::test]
    async fn test_page_url_without_file_is_a_fail() {
        let (scraper, wiki) = scraper(ScriptedWiki::default());
        let reply = scraper
            .resolve("https://wiki.test/wiki/Aatrox/LoL/Cosmetics")
            .await;
        assert_eq!(reply, ScrapeReply::Fail);
        assert!(wiki.calls().is_empty());
    }

    #[test]
    fn test_link_reads_href_not_other_attributes() {
        let page = r#"<a data-href="https://wrong.example/thumb.jpg" href="https://static.example/hd.jpg" class="see-full-size-link">See full size image</a>"#;
        assert_eq!(
            extract_full_size_link(page).as_deref(),
            Some("https://static.example/hd.jpg")
        );
    }

    #[test]
    fn test_link_with_single_quotes_and_entities() {
        let page = "<a class='see-full-size-link' href='https://static.example/hd.jpg?a=1&#38;b=2&amp;c=3'>x</a>";
        assert_eq!(
            extract_full_size_link(page).as_deref(),
            Some("https://static.example/hd.jpg?a=1&b=2&c=3")
        );
    }

    #[test]
    fn test_protocol_relative_href() {
        let page = r#"<div class="fullMedia"><p><a href="//static.wikia.nocookie.net/x.jpg" class="internal">Original file</a></p></div>"#;
        assert_eq!(
            extract_full_size_link(page).as_deref(),
            Some("https://static.wikia.nocookie.net/x.jpg")
        );
    }

    #[test]
    fn test_class_name_outside_anchor_is_ignored() {
        let page = r#"<style>.see-full-size-link { color: red }</style><div class="modalContent"><h1>No file by this name exists</h1></div>"#;
        assert_eq!(extract_full_size_link(page), None);
    }

    #[test]
    fn test_register_cancels_previous() {
        let slot = ResolutionSlot::new();
        let first = slot.register();
        let second = slot.register();

        assert!(first.token.is_cancelled());
        assert!(!second.token.is_cancelled());
        assert!(!slot.is_current(&first));
        assert!(slot.is_current(&second));
        assert!(second.generation() > first.generation());
    }

    #[test]
    fn test_stale_release_keeps_newer_registration() {
        let slot = ResolutionSlot::new();
        let first = slot.register();
        let second = slot.register();

        slot.release(&first);
        assert!(slot.current.lock().unwrap().is_some());
        slot.release(&second);
        assert!(slot.current.lock().unwrap().is_none());
    }
}
