//! Meme feed client.
//!
//! Produces a deduplicated, filtered, shuffled page of at most 20 media
//! items. Individual source failures are logged and swallowed; only when
//! every source comes back empty does the page fall back to the fixed
//! placeholder items, and even that path is a successful result.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use memelingo_schema::{now_millis, MediaItem};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::Deserialize;
use thiserror::Error;

use crate::storage::{Store, StorageResult};

const MEME_API_BASE: &str = "https://meme-api.com";
const REDDIT_API_BASE: &str = "https://www.reddit.com";

pub const PAGE_SIZE: usize = 20;

const ENGLISH_SUBREDDITS: [&str; 5] = [
    "memes",
    "wholesomememes",
    "ProgrammerHumor",
    "EnglishMemes",
    "educationalmemes",
];

/// How many subreddit listings to try when the primary source yields nothing.
const MAX_FALLBACK_SUBREDDITS: usize = 2;

/// Keywords blocking an item when they appear in its title or subreddit.
const FILTER_KEYWORDS: [&str; 10] = [
    "nsfw",
    "adult",
    "sexual",
    "violence",
    "hate",
    "offensive",
    "inappropriate",
    "explicit",
    "mature",
    "disturbing",
];

const IMAGE_EXTENSIONS: [&str; 5] = ["jpg", "jpeg", "png", "gif", "webp"];
const IMAGE_HOSTS: [&str; 2] = ["i.redd.it", "imgur.com"];

const SOURCE_TIMEOUT: Duration = Duration::from_secs(10);

/// Where a page's items came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedOrigin {
    /// At least one upstream source produced items.
    Upstream,
    /// Every source failed or came back empty; the page holds the fixed
    /// placeholder items.
    Placeholder,
}

#[derive(Debug, Clone)]
pub struct FeedPage {
    pub items: Vec<MediaItem>,
    pub origin: FeedOrigin,
}

#[derive(Debug, Error)]
enum SourceError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("HTTP {0}")]
    Status(reqwest::StatusCode),
    #[error("unexpected payload: {0}")]
    Decode(#[from] serde_json::Error),
}

pub struct FeedClient {
    client: reqwest::Client,
    meme_api_base: String,
    reddit_api_base: String,
}

impl FeedClient {
    pub fn new() -> Self {
        Self::with_endpoints(MEME_API_BASE, REDDIT_API_BASE)
    }

    /// Constructor with overridable endpoints, used by tests.
    pub fn with_endpoints(
        meme_api_base: impl Into<String>,
        reddit_api_base: impl Into<String>,
    ) -> Self {
        let client = reqwest::Client::builder()
            .timeout(SOURCE_TIMEOUT)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            client,
            meme_api_base: meme_api_base.into(),
            reddit_api_base: reddit_api_base.into(),
        }
    }

    /// Fetches one page of media items. Never fails and never returns an
    /// empty page: total upstream failure produces the placeholder items.
    pub async fn fetch_page(&self, page_index: usize) -> FeedPage {
        let mut collected: Vec<MediaItem> = Vec::new();

        match self.fetch_from_meme_api().await {
            Ok(items) => collected.extend(items),
            Err(err) => log::warn!("primary feed source failed: {err}"),
        }

        if collected.is_empty() {
            for subreddit in ENGLISH_SUBREDDITS.iter().take(MAX_FALLBACK_SUBREDDITS) {
                match self.fetch_from_subreddit(subreddit).await {
                    Ok(items) => collected.extend(items),
                    Err(err) => log::warn!("feed source r/{subreddit} failed: {err}"),
                }
            }
        }

        let page = assemble_page(collected, &mut rand::thread_rng());
        log::debug!(
            "feed page {page_index}: {} items ({:?})",
            page.items.len(),
            page.origin
        );
        page
    }

    async fn fetch_from_meme_api(&self) -> Result<Vec<MediaItem>, SourceError> {
        let url = format!("{}/gimme/{PAGE_SIZE}", self.meme_api_base);
        let response = self.client.get(&url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::Status(status));
        }

        let bytes = response.bytes().await?;
        let payload: MemeApiResponse = serde_json::from_slice(&bytes)?;
        let posts = match payload {
            MemeApiResponse::Page { memes } => memes,
            MemeApiResponse::Single(post) => vec![*post],
        };

        Ok(posts.into_iter().filter_map(map_meme_api_post).collect())
    }

    async fn fetch_from_subreddit(&self, subreddit: &str) -> Result<Vec<MediaItem>, SourceError> {
        let url = format!("{}/r/{subreddit}/hot.json?limit=25", self.reddit_api_base);
        let response = self.client.get(&url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::Status(status));
        }

        let bytes = response.bytes().await?;
        let listing: RedditListing = serde_json::from_slice(&bytes)?;

        Ok(listing
            .data
            .children
            .into_iter()
            .filter_map(|child| map_reddit_post(child.data))
            .collect())
    }
}

impl Default for FeedClient {
    fn default() -> Self {
        Self::new()
    }
}

/// Dedups (first occurrence wins), shuffles and truncates the collected
/// candidates; an empty candidate set becomes the placeholder page.
fn assemble_page<R: Rng>(candidates: Vec<MediaItem>, rng: &mut R) -> FeedPage {
    let mut seen: HashSet<String> = HashSet::new();
    let mut unique: Vec<MediaItem> = Vec::new();
    for item in candidates {
        if seen.insert(item.id.clone()) {
            unique.push(item);
        }
    }

    if unique.is_empty() {
        return FeedPage {
            items: placeholder_items(),
            origin: FeedOrigin::Placeholder,
        };
    }

    unique.shuffle(rng);
    unique.truncate(PAGE_SIZE);

    FeedPage {
        items: unique,
        origin: FeedOrigin::Upstream,
    }
}

fn is_image_url(url: &str) -> bool {
    let lowered = url.to_lowercase();
    let path = lowered.split(['?', '#']).next().unwrap_or(&lowered);

    IMAGE_EXTENSIONS
        .iter()
        .any(|ext| path.ends_with(&format!(".{ext}")))
        || IMAGE_HOSTS.iter().any(|host| lowered.contains(host))
}

fn is_content_appropriate(title: &str, subreddit: &str) -> bool {
    let haystack = format!("{title} {subreddit}").to_lowercase();
    !FILTER_KEYWORDS
        .iter()
        .any(|keyword| haystack.contains(keyword))
}

// ============================================================
// Upstream payloads
// ============================================================

/// `/gimme/<n>` wraps posts in a `memes` array; bare `/gimme` returns a
/// single post object.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum MemeApiResponse {
    Page { memes: Vec<MemeApiPost> },
    Single(Box<MemeApiPost>),
}

#[derive(Debug, Deserialize)]
struct MemeApiPost {
    #[serde(rename = "postLink")]
    post_link: Option<String>,
    subreddit: Option<String>,
    title: Option<String>,
    url: Option<String>,
    #[serde(default)]
    nsfw: bool,
    author: Option<String>,
    #[serde(default)]
    ups: i64,
}

fn map_meme_api_post(post: MemeApiPost) -> Option<MediaItem> {
    let title = post.title.filter(|t| !t.is_empty())?;
    let url = post.url.filter(|u| !u.is_empty())?;
    let subreddit = match post.subreddit.filter(|s| !s.is_empty()) {
        Some(name) if name.starts_with("r/") => name,
        Some(name) => format!("r/{name}"),
        None => "r/memes".to_string(),
    };

    if post.nsfw || !is_image_url(&url) || !is_content_appropriate(&title, &subreddit) {
        return None;
    }

    let id = post
        .post_link
        .as_deref()
        .and_then(|link| link.trim_end_matches('/').rsplit('/').next())
        .filter(|segment| !segment.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| uuid::Uuid::new_v4().simple().to_string());

    Some(MediaItem {
        id,
        title,
        source_url: url,
        origin_subreddit: subreddit,
        permalink: post.post_link.unwrap_or_else(|| "#".to_string()),
        upvote_count: post.ups,
        author: post.author.unwrap_or_else(|| "unknown".to_string()),
        created_at: now_millis(),
    })
}

#[derive(Debug, Deserialize)]
struct RedditListing {
    data: RedditListingData,
}

#[derive(Debug, Deserialize)]
struct RedditListingData {
    children: Vec<RedditChild>,
}

#[derive(Debug, Deserialize)]
struct RedditChild {
    data: RedditPost,
}

#[derive(Debug, Deserialize)]
struct RedditPost {
    id: String,
    title: String,
    url: String,
    subreddit: String,
    permalink: String,
    #[serde(default)]
    ups: i64,
    author: String,
    #[serde(default)]
    created_utc: f64,
    #[serde(default)]
    over_18: bool,
    #[serde(default)]
    is_video: bool,
}

fn map_reddit_post(post: RedditPost) -> Option<MediaItem> {
    if post.over_18
        || post.is_video
        || !is_image_url(&post.url)
        || !is_content_appropriate(&post.title, &post.subreddit)
    {
        return None;
    }

    Some(MediaItem {
        id: post.id,
        title: post.title,
        source_url: post.url,
        origin_subreddit: format!("r/{}", post.subreddit),
        permalink: format!("https://reddit.com{}", post.permalink),
        upvote_count: post.ups,
        author: post.author,
        created_at: (post.created_utc * 1000.0) as i64,
    })
}

/// The fixed demo content shown when every upstream source fails.
fn placeholder_items() -> Vec<MediaItem> {
    let created_at = now_millis();
    vec![
        MediaItem {
            id: "demo1".to_string(),
            title: "When you finally understand a complex English idiom".to_string(),
            source_url:
                "https://images.unsplash.com/photo-1517077304055-6e89abbf09b0?auto=format&fit=crop&w=600&h=400"
                    .to_string(),
            origin_subreddit: "r/EnglishLearning".to_string(),
            permalink: "https://reddit.com/r/EnglishLearning/demo1".to_string(),
            upvote_count: 1234,
            author: "learner123".to_string(),
            created_at,
        },
        MediaItem {
            id: "demo2".to_string(),
            title: "Me trying to use 'whom' correctly in a sentence".to_string(),
            source_url:
                "https://images.unsplash.com/photo-1516131206008-dd041a9764fd?auto=format&fit=crop&w=600&h=400"
                    .to_string(),
            origin_subreddit: "r/EnglishMemes".to_string(),
            permalink: "https://reddit.com/r/EnglishMemes/demo2".to_string(),
            upvote_count: 987,
            author: "grammar_geek".to_string(),
            created_at,
        },
        MediaItem {
            id: "demo3".to_string(),
            title: "When someone asks if you speak English and you say 'yes' but then they use slang"
                .to_string(),
            source_url:
                "https://images.unsplash.com/photo-1616347004137-2ed2eb9f6fce?auto=format&fit=crop&w=600&h=400"
                    .to_string(),
            origin_subreddit: "r/memes".to_string(),
            permalink: "https://reddit.com/r/memes/demo3".to_string(),
            upvote_count: 2345,
            author: "confusedlearner".to_string(),
            created_at,
        },
    ]
}

// ============================================================
// Feed + store integration
// ============================================================

/// Combines the feed client with the local store: upstream pages are written
/// through to the media item cache, and a cached page can be served when the
/// caller wants stored data instead of a network round trip.
pub struct FeedService {
    client: FeedClient,
    store: Arc<Store>,
}

impl FeedService {
    pub fn new(client: FeedClient, store: Arc<Store>) -> Self {
        Self { client, store }
    }

    /// Fetches a page and caches upstream items. A failing cache write only
    /// costs persistence, not the page, so it is logged and ignored.
    pub async fn load_page(&self, page_index: usize) -> FeedPage {
        let page = self.client.fetch_page(page_index).await;

        if page.origin == FeedOrigin::Upstream {
            if let Err(err) = self.store.media_items().put_batch(&page.items) {
                log::warn!("failed to cache feed page: {err}");
            }
        }

        page
    }

    /// Serves a page from the cache, `PAGE_SIZE` items per page.
    pub fn cached_page(&self, page_index: usize) -> StorageResult<Vec<MediaItem>> {
        self.store
            .media_items()
            .list(PAGE_SIZE, page_index * PAGE_SIZE)
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    use super::*;

    fn candidate(id: &str, title: &str, subreddit: &str, url: &str) -> MediaItem {
        MediaItem {
            id: id.to_string(),
            title: title.to_string(),
            source_url: url.to_string(),
            origin_subreddit: subreddit.to_string(),
            permalink: format!("https://reddit.com/{subreddit}/{id}"),
            upvote_count: 1,
            author: "a".to_string(),
            created_at: 0,
        }
    }

    #[test]
    fn image_url_heuristic() {
        assert!(is_image_url("https://example.com/funny.JPG"));
        assert!(is_image_url("https://example.com/funny.png?width=600"));
        assert!(is_image_url("https://i.redd.it/abc123"));
        assert!(is_image_url("https://imgur.com/gallery/xyz"));
        assert!(!is_image_url("https://v.redd.it/clip.mp4"));
        assert!(!is_image_url("https://example.com/article"));
    }

    #[test]
    fn blocklist_matches_case_insensitively() {
        assert!(!is_content_appropriate("NSFW content", "r/memes"));
        assert!(!is_content_appropriate("harmless title", "r/MatureMemes"));
        assert!(is_content_appropriate("wholesome cat picture", "r/memes"));
    }

    #[test]
    fn reddit_posts_are_filtered() {
        let keep = RedditPost {
            id: "ok1".to_string(),
            title: "a cat".to_string(),
            url: "https://i.redd.it/ok1.jpg".to_string(),
            subreddit: "memes".to_string(),
            permalink: "/r/memes/ok1".to_string(),
            ups: 10,
            author: "a".to_string(),
            created_utc: 1_700_000_000.0,
            over_18: false,
            is_video: false,
        };
        let mapped = map_reddit_post(keep).unwrap();
        assert_eq!(mapped.origin_subreddit, "r/memes");
        assert_eq!(mapped.permalink, "https://reddit.com/r/memes/ok1");
        assert_eq!(mapped.created_at, 1_700_000_000_000);

        let adult = RedditPost {
            id: "no1".to_string(),
            title: "a cat".to_string(),
            url: "https://i.redd.it/no1.jpg".to_string(),
            subreddit: "memes".to_string(),
            permalink: "/r/memes/no1".to_string(),
            ups: 10,
            author: "a".to_string(),
            created_utc: 0.0,
            over_18: true,
            is_video: false,
        };
        assert!(map_reddit_post(adult).is_none());
    }

    #[test]
    fn meme_api_post_id_comes_from_post_link() {
        let post = MemeApiPost {
            post_link: Some("https://redd.it/abc123".to_string()),
            subreddit: Some("memes".to_string()),
            title: Some("a title".to_string()),
            url: Some("https://i.redd.it/abc123.png".to_string()),
            nsfw: false,
            author: Some("a".to_string()),
            ups: 5,
        };

        let mapped = map_meme_api_post(post).unwrap();
        assert_eq!(mapped.id, "abc123");
        assert_eq!(mapped.origin_subreddit, "r/memes");
    }

    #[test]
    fn assemble_dedups_first_occurrence_wins() {
        let candidates = vec![
            candidate("a", "first a", "r/memes", "https://i.redd.it/a.jpg"),
            candidate("b", "b", "r/memes", "https://i.redd.it/b.jpg"),
            candidate("a", "second a", "r/memes", "https://i.redd.it/a2.jpg"),
        ];

        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let page = assemble_page(candidates, &mut rng);

        assert_eq!(page.origin, FeedOrigin::Upstream);
        assert_eq!(page.items.len(), 2);
        let a = page.items.iter().find(|item| item.id == "a").unwrap();
        assert_eq!(a.title, "first a");
    }

    #[test]
    fn assemble_shuffles_without_losing_items_and_truncates() {
        let candidates: Vec<MediaItem> = (0..30)
            .map(|i| {
                candidate(
                    &format!("m{i}"),
                    "title",
                    "r/memes",
                    &format!("https://i.redd.it/m{i}.jpg"),
                )
            })
            .collect();

        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let page = assemble_page(candidates.clone(), &mut rng);

        assert_eq!(page.items.len(), PAGE_SIZE);
        let all_ids: HashSet<&str> = candidates.iter().map(|i| i.id.as_str()).collect();
        assert!(page.items.iter().all(|item| all_ids.contains(item.id.as_str())));
    }

    #[test]
    fn assemble_falls_back_to_placeholders_when_empty() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let page = assemble_page(Vec::new(), &mut rng);

        assert_eq!(page.origin, FeedOrigin::Placeholder);
        let ids: Vec<&str> = page.items.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["demo1", "demo2", "demo3"]);
    }

    #[tokio::test]
    async fn fetch_page_returns_placeholders_when_all_sources_unreachable() {
        // Port 9 (discard) is not listening; both sources fail fast.
        let client = FeedClient::with_endpoints("http://127.0.0.1:9", "http://127.0.0.1:9");

        let page = client.fetch_page(0).await;

        assert_eq!(page.origin, FeedOrigin::Placeholder);
        assert_eq!(page.items.len(), 3);
    }

    #[tokio::test]
    async fn feed_service_caches_nothing_for_placeholder_pages() {
        let store = Arc::new(Store::in_memory().unwrap());
        let client = FeedClient::with_endpoints("http://127.0.0.1:9", "http://127.0.0.1:9");
        let service = FeedService::new(client, Arc::clone(&store));

        let page = service.load_page(0).await;
        assert_eq!(page.origin, FeedOrigin::Placeholder);
        assert!(service.cached_page(0).unwrap().is_empty());
    }
}
