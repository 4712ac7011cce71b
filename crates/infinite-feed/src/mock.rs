//! Mock data provider
//!
//! Synthesizes pages from fixed text and author tables after a simulated
//! round-trip delay. Stands in for a backend until one exists.

use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::error::ProviderError;
use crate::ids::IdAllocator;
use crate::item::{Author, Engagement, FeedItem};
use crate::provider::{DataProvider, FeedFilter, PageRequest};

pub const DEFAULT_LATENCY: Duration = Duration::from_millis(500);

/// Probability that an item carries any images
const IMAGE_PROBABILITY: f64 = 0.3;
const MAX_IMAGES: usize = 10;
const LIKED_PROBABILITY: f64 = 0.3;
const RETWEETED_PROBABILITY: f64 = 0.1;

const SAMPLE_TEXTS: &[&str] = &[
    "Great weather today!",
    "Started a new side project this week. Rust all the way down.",
    "Coffee first, code second. #morning",
    "Perfect afternoon for a long walk.",
    "Finished a book I could not put down. Highly recommended.",
    "Learning something new every day. #learning",
    "Pasta for lunch, no regrets.",
    "Post-workout mood: unstoppable.",
    "Spent the evening with old friends.",
    "Just watched a film that stuck with me all night.",
    "Cooking at home is my new favourite hobby.",
    "Music on, editor open, phone on silent.",
    "Long day at work. Time to log off.",
    "Weekend plans? Still undecided.",
    "Found a quiet little cafe around the corner.",
    "Running every morning is finally paying off.",
    "Rediscovering the joy of reading on paper.",
    "Family dinner is the best part of the week.",
    "Thinking about picking up watercolours.",
    "Grateful for today. Good night, everyone.",
];

/// (display name, username)
const SAMPLE_AUTHORS: &[(&str, &str)] = &[
    ("Kim Chulsoo", "kimcs"),
    ("Park Younghee", "parkyh"),
    ("Lee Minsoo", "leems"),
    ("Choi Sujin", "choisj"),
    ("Jeong Donghyun", "jeongdh"),
    ("Han Jimin", "hanjm"),
    ("Yun Seojun", "yunsj"),
    ("Kang Hyejin", "kanghj"),
    ("Jo Minwoo", "jomw"),
    ("Song Eunji", "songej"),
];

const TIME_LABELS: &[&str] = &[
    "just now", "1m", "5m", "10m", "30m", "1h", "2h", "3h", "5h", "1d", "2d", "3d",
];

/// Every author in the sample table
pub fn sample_authors() -> Vec<Author> {
    (0..SAMPLE_AUTHORS.len()).map(sample_author).collect()
}

/// Look up a sample author, falling back to a synthesized profile for
/// usernames outside the table.
pub fn author_by_username(username: &str) -> Author {
    match SAMPLE_AUTHORS.iter().position(|(_, handle)| *handle == username) {
        Some(index) => sample_author(index),
        None => Author {
            name: username.to_string(),
            username: username.to_string(),
            avatar_url: format!("https://picsum.photos/40/40?random={}", username),
        },
    }
}

fn sample_author(index: usize) -> Author {
    let (name, username) = SAMPLE_AUTHORS[index];
    Author {
        name: name.to_string(),
        username: username.to_string(),
        avatar_url: format!("https://picsum.photos/40/40?random={}", index + 1),
    }
}

pub struct MockProvider {
    latency: Duration,
    rng: Mutex<StdRng>,
}

impl MockProvider {
    pub fn new(latency: Duration) -> Self {
        Self {
            latency,
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// Provider whose output depends only on `seed` and the ids handed to it
    pub fn seeded(latency: Duration, seed: u64) -> Self {
        Self {
            latency,
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    pub fn latency(&self) -> Duration {
        self.latency
    }

    fn synthesize(
        &self,
        request: &PageRequest,
        ids: &dyn IdAllocator,
    ) -> Result<Vec<FeedItem>, ProviderError> {
        let fixed_author = match &request.filter {
            Some(FeedFilter::Author(username)) => Some(author_by_username(username)),
            None => None,
        };

        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        let mut items = Vec::with_capacity(request.count);
        for _ in 0..request.count {
            let id = ids.allocate()?;
            let author = match &fixed_author {
                Some(author) => author.clone(),
                None => sample_author(rng.gen_range(0..SAMPLE_AUTHORS.len())),
            };
            let text = SAMPLE_TEXTS[rng.gen_range(0..SAMPLE_TEXTS.len())];
            let time_label = TIME_LABELS[rng.gen_range(0..TIME_LABELS.len())];
            let engagement = Engagement {
                replies: rng.gen_range(0..50),
                retweets: rng.gen_range(0..100),
                likes: rng.gen_range(0..200),
                views: rng.gen_range(100..1100),
            };
            let images = if rng.gen_bool(IMAGE_PROBABILITY) {
                let count = rng.gen_range(1..=MAX_IMAGES);
                (0..count)
                    .map(|i| format!("https://picsum.photos/500/300?random={}_{}", id, i))
                    .collect()
            } else {
                Vec::new()
            };

            items.push(FeedItem {
                id,
                author,
                text: text.to_string(),
                time_label: time_label.to_string(),
                engagement,
                images,
                liked: rng.gen_bool(LIKED_PROBABILITY),
                retweeted: rng.gen_bool(RETWEETED_PROBABILITY),
            });
        }
        Ok(items)
    }
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new(DEFAULT_LATENCY)
    }
}

#[async_trait]
impl DataProvider for MockProvider {
    async fn fetch_page(
        &self,
        request: &PageRequest,
        ids: &dyn IdAllocator,
    ) -> Result<Vec<FeedItem>, ProviderError> {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        let items = self.synthesize(request, ids)?;
        tracing::debug!("mock provider produced {} items (filter={:?})", items.len(), request.filter);
        Ok(items)
    }
}
