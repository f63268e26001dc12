// src/domain/feed.rs

//! Feed-level domain types.
//!
//! Adafruit IO exposes every feed as a pair of MQTT topics built from a fixed
//! template. This module owns that template in both directions: formatting a
//! topic for a feed, and recovering the feed from an inbound topic.
//!
//! Nothing in here touches a transport; the functions are pure string work.

use std::fmt;
use std::sync::Arc;

use crate::{Address, Subscription};

/// Leading part shared by both feed topics.
pub const FEED_TOPIC_PREFIX: &str = "api/feeds/";

/// Trailing part of the topic the service publishes feed updates on.
pub const RECEIVE_TOPIC_SUFFIX: &str = "/streams/receive.json";

/// Trailing part of the topic clients publish new feed values to.
pub const SEND_TOPIC_SUFFIX: &str = "/streams/send.json";

/// Identifier of a feed on the remote service.
///
/// The token is opaque: it is embedded into topics verbatim and never
/// validated beyond what the inbound parser needs.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FeedId(pub Arc<str>);

impl FeedId {
    /// Borrow the feed id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Topic the service delivers updates of this feed on.
    ///
    /// ```
    /// # use adafruit_io_mqtt::FeedId;
    /// let feed = FeedId::from("temperature");
    /// assert_eq!(feed.receive_topic().0.as_ref(), "api/feeds/temperature/streams/receive.json");
    /// ```
    pub fn receive_topic(&self) -> Subscription {
        Subscription::from(format!(
            "{FEED_TOPIC_PREFIX}{}{RECEIVE_TOPIC_SUFFIX}",
            self.0
        ))
    }

    /// Topic new values for this feed are published to.
    ///
    /// ```
    /// # use adafruit_io_mqtt::FeedId;
    /// let feed = FeedId::from("temperature");
    /// assert_eq!(feed.send_topic().0.as_ref(), "api/feeds/temperature/streams/send.json");
    /// ```
    pub fn send_topic(&self) -> Address {
        Address::from(format!("{FEED_TOPIC_PREFIX}{}{SEND_TOPIC_SUFFIX}", self.0))
    }

    /// Recover the feed id from an inbound topic.
    ///
    /// Returns `None` unless the topic is exactly
    /// `api/feeds/{feed_id}/streams/receive.json`. The id may be empty.
    pub fn from_receive_topic(topic: &str) -> Option<FeedId> {
        let feed_id = topic
            .strip_prefix(FEED_TOPIC_PREFIX)?
            .strip_suffix(RECEIVE_TOPIC_SUFFIX)?;

        Some(FeedId::from(feed_id))
    }

    /// Recover the feed id from an outbound topic.
    ///
    /// The counterpart of [`FeedId::from_receive_topic`] for
    /// `api/feeds/{feed_id}/streams/send.json`.
    pub fn from_send_topic(topic: &str) -> Option<FeedId> {
        let feed_id = topic
            .strip_prefix(FEED_TOPIC_PREFIX)?
            .strip_suffix(SEND_TOPIC_SUFFIX)?;

        Some(FeedId::from(feed_id))
    }
}

impl<T> From<T> for FeedId
where
    T: Into<Arc<str>>,
{
    fn from(value: T) -> Self {
        FeedId(value.into())
    }
}

impl fmt::Display for FeedId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Adafruit IO access key.
///
/// Sent as the MQTT username with an empty password. The value never shows
/// up in `Debug` output or logs.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials(Arc<str>);

impl Credentials {
    /// Wrap an access key.
    pub fn new(key: impl Into<Arc<str>>) -> Self {
        Self(key.into())
    }

    /// The MQTT username derived from the key.
    pub fn username(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credentials(<redacted>)")
    }
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;

    #[test]
    fn test_topics_follow_template() {
        // ---
        let feed = FeedId::from("photocell");
        assert_eq!(
            feed.receive_topic().0.as_ref(),
            "api/feeds/photocell/streams/receive.json"
        );
        assert_eq!(
            feed.send_topic().0.as_ref(),
            "api/feeds/photocell/streams/send.json"
        );
    }

    #[test]
    fn test_parse_receive_topic() {
        // ---
        let feed = FeedId::from_receive_topic("api/feeds/photocell/streams/receive.json");
        assert_eq!(feed, Some(FeedId::from("photocell")));

        // group-qualified keys pass through untouched
        let feed = FeedId::from_receive_topic("api/feeds/garden.soil-1/streams/receive.json");
        assert_eq!(feed.as_ref().map(FeedId::as_str), Some("garden.soil-1"));
    }

    #[test]
    fn test_parse_inverts_format() {
        // ---
        for id in ["", "a", "door", "kitchen.temp", "x y", "42"] {
            let feed = FeedId::from(id);
            let topic = feed.receive_topic();
            assert_eq!(FeedId::from_receive_topic(&topic.0), Some(feed));
        }
    }

    #[test]
    fn test_parse_accepts_empty_feed_id() {
        // ---
        assert_eq!(
            FeedId::from_receive_topic("api/feeds//streams/receive.json"),
            Some(FeedId::from(""))
        );
        assert_eq!(
            FeedId::from_send_topic("api/feeds//streams/send.json"),
            Some(FeedId::from(""))
        );
    }

    #[test]
    fn test_parse_rejects_foreign_topics() {
        // ---
        for topic in [
            "other/topic",
            "",
            "api/feeds/",
            "api/feeds/door/streams/send.json",
            "api/feeds/door/streams/receive.jsonx",
            "xapi/feeds/door/streams/receive.json",
            "/streams/receive.json",
        ] {
            assert_eq!(FeedId::from_receive_topic(topic), None, "topic {topic:?}");
        }
    }

    #[test]
    fn test_parse_send_topic() {
        // ---
        let feed = FeedId::from_send_topic("api/feeds/door/streams/send.json");
        assert_eq!(feed, Some(FeedId::from("door")));
        assert_eq!(
            FeedId::from_send_topic("api/feeds/door/streams/receive.json"),
            None
        );
    }

    #[test]
    fn test_credentials_debug_is_redacted() {
        // ---
        let creds = Credentials::new("abc123");
        assert_eq!(creds.username(), "abc123");
        assert!(!format!("{creds:?}").contains("abc123"));
    }
}
