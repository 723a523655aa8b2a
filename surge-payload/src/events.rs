use chrono::{SecondsFormat, Utc};
use rand::Rng;
use rand::seq::IndexedRandom;
use serde_json::{Value, json};
use uuid::Uuid;

use crate::EventType;

const DEVICE_TYPES: &[&str] = &["mobile", "desktop", "tablet"];
const PLATFORMS: &[&str] = &["ios", "android", "web"];
const NETWORK_TYPES: &[&str] = &["wifi", "cellular", "unknown"];
const MEDIA_TYPES: &[&str] = &["image", "video", "text"];
const CONNECTION_SPEEDS: &[&str] = &["slow", "medium", "fast"];
const PAGES: &[&str] = &[
    "home", "feed", "explore", "profile", "settings", "search", "checkout", "messages",
];
const CATEGORIES: &[&str] = &[
    "sports", "music", "travel", "food", "tech", "fashion", "gaming", "news",
];
const CITIES: &[(&str, &str, &str)] = &[
    ("Berlin", "Germany", "Europe/Berlin"),
    ("Lisbon", "Portugal", "Europe/Lisbon"),
    ("Austin", "United States", "America/Chicago"),
    ("Osaka", "Japan", "Asia/Tokyo"),
    ("Nairobi", "Kenya", "Africa/Nairobi"),
    ("Toronto", "Canada", "America/Toronto"),
];
const ERROR_MESSAGES: &[&str] = &[
    "Request failed after retry budget was exhausted.",
    "Upstream returned an unexpected response.",
    "Validation rejected the submitted form.",
    "Connection dropped while uploading media.",
];

fn pick<R: Rng>(rng: &mut R, items: &[&'static str]) -> &'static str {
    items.choose(rng).copied().unwrap_or_default()
}

fn short_id() -> String {
    let mut id = Uuid::new_v4().simple().to_string();
    id.truncate(8);
    id
}

fn timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn semver<R: Rng>(rng: &mut R, major: std::ops::RangeInclusive<u32>) -> String {
    format!(
        "{}.{}.{}",
        rng.random_range(major),
        rng.random_range(0..=9),
        rng.random_range(0..=9)
    )
}

/// Fields every event kind carries.
fn base_event<R: Rng>(
    rng: &mut R,
    event_type: EventType,
    event_name: String,
    element_id: String,
) -> serde_json::Map<String, Value> {
    let mut event = serde_json::Map::new();
    event.insert("event_id".into(), json!(Uuid::new_v4().to_string()));
    event.insert("event_type".into(), json!(event_type.as_ref()));
    event.insert("event_name".into(), json!(event_name));
    event.insert("page_name".into(), json!(format!("/{}", pick(rng, PAGES))));
    event.insert("element_id".into(), json!(element_id));
    event.insert("user_id".into(), json!(Uuid::new_v4().to_string()));
    event.insert("session_id".into(), json!(Uuid::new_v4().to_string()));
    event.insert("event_time".into(), json!(timestamp()));
    event.insert("device_type".into(), json!(pick(rng, DEVICE_TYPES)));
    event.insert("platform".into(), json!(pick(rng, PLATFORMS)));
    event.insert("app_version".into(), json!(semver(rng, 1..=5)));
    event.insert("network_type".into(), json!(pick(rng, NETWORK_TYPES)));
    event
}

fn click<R: Rng>(rng: &mut R) -> Value {
    const TARGETS: &[&str] = &["button", "link", "menu_item", "tab", "form"];
    const ACTIONS: &[&str] = &["submit", "navigate", "toggle", "select", "close"];

    let name = format!("{}_{}", pick(rng, TARGETS), pick(rng, ACTIONS));
    let element = format!("{}_{}", pick(rng, TARGETS), short_id());
    let mut event = base_event(rng, EventType::Click, name, element);
    event.insert(
        "content".into(),
        json!({
            "category": pick(rng, CATEGORIES),
            "mediaType": pick(rng, MEDIA_TYPES),
            "isSponsored": rng.random_bool(0.5),
        }),
    );
    event.insert(
        "behavior".into(),
        json!({
            "position": rng.random_range(0..=100),
            "durationMs": rng.random_range(50..=1000),
            "scrollDepth": rng.random_range(0..=100),
        }),
    );
    event.insert(
        "performance".into(),
        json!({
            "loadTimeMs": rng.random_range(100..=2000),
            "connectionSpeed": pick(rng, CONNECTION_SPEEDS),
        }),
    );
    Value::Object(event)
}

fn action<R: Rng>(rng: &mut R) -> Value {
    const ACTIONS: &[&str] = &["share", "follow", "post", "comment", "upload"];
    const INTERACTIONS: &[&str] = &["like", "comment", "share", "follow"];

    let name = format!("{}_action", pick(rng, ACTIONS));
    let element = format!("action_{}", short_id());
    let mut event = base_event(rng, EventType::Action, name, element);
    event.insert(
        "content".into(),
        json!({
            "postId": Uuid::new_v4().to_string(),
            "mediaType": pick(rng, MEDIA_TYPES),
            "category": pick(rng, CATEGORIES),
            "ageHours": rng.random_range(0..=72),
        }),
    );
    event.insert(
        "interaction".into(),
        json!({
            "senderId": Uuid::new_v4().to_string(),
            "receiverId": Uuid::new_v4().to_string(),
            "interactionType": pick(rng, INTERACTIONS),
        }),
    );
    let (city, country, timezone) = CITIES
        .choose(rng)
        .copied()
        .unwrap_or(("Berlin", "Germany", "Europe/Berlin"));
    event.insert(
        "location".into(),
        json!({ "city": city, "country": country, "timezone": timezone }),
    );
    Value::Object(event)
}

fn impression<R: Rng>(rng: &mut R) -> Value {
    const CONTENT_TYPES: &[&str] = &["post", "ad", "story", "recommendation"];

    let name = format!("{}_impression", pick(rng, CONTENT_TYPES));
    let element = format!("impression_{}", short_id());
    let mut event = base_event(rng, EventType::Impression, name, element);
    let ad_id = rng
        .random_bool(0.5)
        .then(|| Uuid::new_v4().to_string());
    event.insert(
        "content".into(),
        json!({
            "postId": Uuid::new_v4().to_string(),
            "adId": ad_id,
            "mediaType": pick(rng, MEDIA_TYPES),
            "category": pick(rng, CATEGORIES),
            "isSponsored": rng.random_bool(0.5),
            "ageHours": rng.random_range(0..=72),
        }),
    );
    if rng.random_bool(0.5) {
        let cents: u32 = rng.random_range(99..=99_999);
        event.insert(
            "commerce".into(),
            json!({
                "productId": Uuid::new_v4().to_string(),
                "price": f64::from(cents) / 100.0,
                "currency": "USD",
            }),
        );
    }
    Value::Object(event)
}

fn error<R: Rng>(rng: &mut R) -> Value {
    const ERROR_TYPES: &[&str] = &["network", "validation", "timeout", "api", "upload"];
    const COMPONENTS: &[&str] = &["feed", "profile", "messaging", "upload", "search"];

    let name = format!("{}_error", pick(rng, ERROR_TYPES));
    let element = format!("{}_{}", pick(rng, COMPONENTS), short_id());
    let mut event = base_event(rng, EventType::Error, name, element);
    event.insert(
        "error".into(),
        json!({
            "errorCode": format!("ERR_{}", rng.random_range(1000..=9999u32)),
            "errorMessage": pick(rng, ERROR_MESSAGES),
            "retryCount": rng.random_range(0..=3),
        }),
    );
    event.insert(
        "performance".into(),
        json!({
            "loadTimeMs": rng.random_range(1000..=10_000),
            "connectionSpeed": pick(rng, CONNECTION_SPEEDS),
        }),
    );
    Value::Object(event)
}

/// One event of `event_type` (`Mixed` resolves to a random concrete kind).
pub fn generate_event<R: Rng>(event_type: EventType, rng: &mut R) -> Value {
    match event_type.resolve(rng) {
        EventType::Click => click(rng),
        EventType::Action => action(rng),
        EventType::Impression => impression(rng),
        EventType::Error | EventType::Mixed => error(rng),
    }
}

/// A batch envelope holding `size` events. `Mixed` resolves per event.
pub fn generate_batch<R: Rng>(event_type: EventType, size: u64, rng: &mut R) -> Value {
    let events: Vec<Value> = (0..size).map(|_| generate_event(event_type, rng)).collect();
    json!({
        "batchId": Uuid::new_v4().to_string(),
        "sentAt": timestamp(),
        "clientInfo": {
            "sdkVersion": semver(rng, 1..=3),
            "deviceId": Uuid::new_v4().to_string(),
            "appBuild": rng.random_range(100..=999u32).to_string(),
        },
        "events": events,
    })
}
