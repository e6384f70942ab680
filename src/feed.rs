// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use chrono::{DateTime, Utc};
use url::Url;

use crate::error::{ApiError, FeedError};
use crate::http::HttpClient;
use crate::model::{sort_newest_first, Episode, Show};

/// Fetch and parse a podcast RSS feed into the common show shape
pub async fn fetch_feed<C: HttpClient>(client: &C, url: &Url) -> Result<Show, FeedError> {
    let response = client.get(url, &[]).await?;
    if !(200..300).contains(&response.status) {
        return Err(FeedError::Fetch(ApiError::Status {
            url: url.to_string(),
            code: response.status,
            body: String::from_utf8_lossy(&response.body).into_owned(),
        }));
    }
    parse_feed(&response.body, url)
}

/// Parse RSS feed XML bytes into a Show
///
/// The feed URL doubles as the show id; items without an audio enclosure
/// are skipped. Episodes come out newest first.
pub fn parse_feed(xml_bytes: &[u8], feed_url: &Url) -> Result<Show, FeedError> {
    let channel = rss::Channel::read_from(xml_bytes)?;

    let mut episodes: Vec<Episode> = channel.items().iter().filter_map(parse_item).collect();
    sort_newest_first(&mut episodes);

    let image_url = channel
        .image()
        .and_then(|img| Url::parse(img.url()).ok())
        .or_else(|| {
            channel
                .itunes_ext()
                .and_then(|ext| ext.image())
                .and_then(|url| Url::parse(url).ok())
        });

    let publisher = channel
        .itunes_ext()
        .and_then(|ext| ext.author().map(String::from))
        .or_else(|| channel.managing_editor().map(String::from))
        .unwrap_or_else(|| "Unknown publisher".to_string());

    let genres = channel
        .categories()
        .iter()
        .map(|category| category.name().to_string())
        .collect();

    Ok(Show {
        id: feed_url.to_string(),
        title: channel.title().to_string(),
        publisher,
        thumbnail_url: image_url.clone(),
        image_url,
        total_episodes: episodes.len() as u32,
        description: channel.description().to_string(),
        rss: Some(feed_url.to_string()),
        genres,
        latest_episodes: episodes,
    })
}

fn parse_item(item: &rss::Item) -> Option<Episode> {
    let enclosure = item.enclosure()?;

    let id = item
        .guid()
        .map(|guid| guid.value().to_string())
        .unwrap_or_else(|| enclosure.url().to_string());

    let publish_date = item
        .pub_date()
        .and_then(|date| DateTime::parse_from_rfc2822(date).ok())
        .map(|date| date.with_timezone(&Utc));

    let itunes = item.itunes_ext();

    Some(Episode {
        id,
        title: item
            .title()
            .map(String::from)
            .unwrap_or_else(|| "Untitled Episode".to_string()),
        audio_url: Url::parse(enclosure.url()).ok(),
        thumbnail_url: itunes
            .and_then(|ext| ext.image())
            .and_then(|url| Url::parse(url).ok()),
        description: item.description().map(String::from).unwrap_or_default(),
        duration: itunes
            .and_then(|ext| ext.duration())
            .map(parse_duration)
            .unwrap_or(0),
        publish_date,
        explicit: itunes
            .and_then(|ext| ext.explicit())
            .map(|value| matches!(value.to_lowercase().as_str(), "yes" | "true"))
            .unwrap_or(false),
    })
}

/// Parse an itunes duration: plain seconds, "MM:SS" or "HH:MM:SS"
fn parse_duration(text: &str) -> u32 {
    let parts: Vec<&str> = text.split(':').collect();
    let numbers: Vec<u32> = parts
        .iter()
        .filter_map(|part| part.trim().parse().ok())
        .collect();
    if numbers.len() != parts.len() {
        return 0;
    }

    match numbers.as_slice() {
        [seconds] => *seconds,
        [minutes, seconds] => minutes * 60 + seconds,
        [hours, minutes, seconds] => hours * 3600 + minutes * 60 + seconds,
        _ => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_FEED: &str = r#"<?xml version="1.0"?>
<rss version="2.0" xmlns:itunes="http://www.itunes.com/dtds/podcast-1.0.dtd">
  <channel>
    <title>Test Podcast</title>
    <description>A test podcast</description>
    <link>https://example.com</link>
    <itunes:author>Example Media</itunes:author>
    <category>Technology</category>
    <item>
      <title>Episode 1</title>
      <guid>ep1-guid</guid>
      <description>First episode</description>
      <pubDate>Mon, 10 Jun 2024 05:30:00 GMT</pubDate>
      <enclosure url="https://example.com/ep1.mp3" length="100" type="audio/mpeg"/>
      <itunes:duration>10:30</itunes:duration>
      <itunes:explicit>yes</itunes:explicit>
    </item>
    <item>
      <title>Episode 2</title>
      <pubDate>Tue, 18 Jun 2024 05:30:00 GMT</pubDate>
      <enclosure url="https://example.com/ep2.mp3" length="100" type="audio/mpeg"/>
      <itunes:duration>3600</itunes:duration>
    </item>
    <item>
      <title>No Audio Here</title>
      <guid>ep3-guid</guid>
    </item>
  </channel>
</rss>"#;

    fn feed_url() -> Url {
        Url::parse("https://example.com/feed.xml").unwrap()
    }

    #[test]
    fn parses_channel_into_show() {
        let show = parse_feed(SAMPLE_FEED.as_bytes(), &feed_url()).unwrap();

        assert_eq!(show.id, "https://example.com/feed.xml");
        assert_eq!(show.title, "Test Podcast");
        assert_eq!(show.publisher, "Example Media");
        assert_eq!(show.genres, vec!["Technology"]);
        assert_eq!(show.rss.as_deref(), Some("https://example.com/feed.xml"));
        // The enclosure-less item is skipped
        assert_eq!(show.total_episodes, 2);
    }

    #[test]
    fn episodes_come_out_newest_first() {
        let show = parse_feed(SAMPLE_FEED.as_bytes(), &feed_url()).unwrap();

        let titles: Vec<&str> = show
            .latest_episodes
            .iter()
            .map(|e| e.title.as_str())
            .collect();
        assert_eq!(titles, vec!["Episode 2", "Episode 1"]);
    }

    #[test]
    fn item_fields_are_mapped() {
        let show = parse_feed(SAMPLE_FEED.as_bytes(), &feed_url()).unwrap();
        let episode = &show.latest_episodes[1];

        assert_eq!(episode.id, "ep1-guid");
        assert_eq!(episode.duration, 630);
        assert!(episode.explicit);
        assert_eq!(
            episode.audio_url.as_ref().unwrap().as_str(),
            "https://example.com/ep1.mp3"
        );
    }

    #[test]
    fn guid_falls_back_to_enclosure_url() {
        let show = parse_feed(SAMPLE_FEED.as_bytes(), &feed_url()).unwrap();
        let episode = &show.latest_episodes[0];

        assert_eq!(episode.id, "https://example.com/ep2.mp3");
    }

    #[test]
    fn duration_parser_accepts_all_forms() {
        assert_eq!(parse_duration("45"), 45);
        assert_eq!(parse_duration("10:30"), 630);
        assert_eq!(parse_duration("1:02:03"), 3723);
        assert_eq!(parse_duration("not a duration"), 0);
    }
}
