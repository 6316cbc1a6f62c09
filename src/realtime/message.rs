//! Messages on the `/ws` chat and presence channel.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::constants::UNKNOWN_COUNTRY;
use crate::error::AppError;

/// A chat line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    #[serde(default = "unknown_country")]
    pub country: String,
    #[serde(default)]
    pub msg: String,
}

fn unknown_country() -> String {
    UNKNOWN_COUNTRY.to_string()
}

/// One leaderboard row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LeaderboardEntry {
    pub country: String,
    pub score: i64,
    /// Number of chat messages sent from this country
    pub chats: i64,
}

#[derive(Deserialize)]
struct RawEntry {
    country: Option<String>,
    score: Option<i64>,
    chats: Option<i64>,
}

/// Leaderboards arrive as a list of rows, or as a `{country: score}` map
/// from older servers.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawLeaderboard {
    List(Vec<RawEntry>),
    Map(BTreeMap<String, i64>),
}

/// Country ranking, best first.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "RawLeaderboard")]
pub struct Leaderboard(pub Vec<LeaderboardEntry>);

impl From<RawLeaderboard> for Leaderboard {
    fn from(raw: RawLeaderboard) -> Self {
        match raw {
            // Lists come ranked from the server
            RawLeaderboard::List(rows) => Leaderboard(
                rows.into_iter()
                    .map(|row| LeaderboardEntry {
                        country: row.country.unwrap_or_else(unknown_country),
                        score: row.score.unwrap_or(0),
                        chats: row.chats.unwrap_or(0),
                    })
                    .collect(),
            ),
            RawLeaderboard::Map(scores) => {
                let mut rows: Vec<LeaderboardEntry> = scores
                    .into_iter()
                    .map(|(country, score)| LeaderboardEntry {
                        country,
                        score,
                        chats: 0,
                    })
                    .collect();
                rows.sort_by(|a, b| b.score.cmp(&a.score));
                Leaderboard(rows)
            }
        }
    }
}

impl Leaderboard {
    pub fn entries(&self) -> &[LeaderboardEntry] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Server to client.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Inbound {
    /// A chat line, possibly with the leaderboard it changed
    Chat {
        #[serde(flatten)]
        message: ChatMessage,
        #[serde(default)]
        leaderboard: Option<Leaderboard>,
    },
    /// Sent once after connecting
    Init {
        #[serde(default)]
        leaderboard: Leaderboard,
        #[serde(default)]
        history: Vec<ChatMessage>,
        #[serde(default)]
        online: Option<u32>,
    },
    UpdateScore {
        #[serde(default)]
        leaderboard: Option<Leaderboard>,
    },
    OnlineCount {
        count: u32,
        /// Human-readable per-country breakdown, e.g. `"DK: 2, SE: 1"`
        #[serde(default)]
        distribution: Option<String>,
    },
}

impl Inbound {
    pub fn parse(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}

/// Client to server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Outbound {
    Chat { country: String, msg: String },
    /// Credit the country for a successful extraction
    Score { country: String },
}

impl Outbound {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// `/ws` endpoint for a server URL: `http` becomes `ws`, `https` becomes `wss`.
pub fn ws_url(server_url: &str) -> Result<String, AppError> {
    let mut url = Url::parse(server_url)?;
    let scheme = match url.scheme() {
        "https" | "wss" => "wss",
        _ => "ws",
    };
    // Only fails for non-special schemes such as `mailto:`
    if url.set_scheme(scheme).is_err() {
        log::warn!("Cannot derive websocket scheme from {}", server_url);
    }
    url.set_path("/ws");
    url.set_query(None);
    url.set_fragment(None);
    Ok(url.to_string())
}
