//! Chat panel state: message log, unread badge, presence and leaderboard.

use crate::constants::UNREAD_BADGE_CAP;
use crate::error::{AppError, ValidationError};
use crate::realtime::{
    ChannelStatus, ChatMessage, Inbound, Leaderboard, LeaderboardEntry, Outbound, RealtimeEvent,
};

/// Badge shown next to a leaderboard row: medals for the podium, `#n` below.
pub fn rank_badge(rank: usize) -> String {
    match rank {
        1 => "🥇".to_string(),
        2 => "🥈".to_string(),
        3 => "🥉".to_string(),
        n => format!("#{}", n),
    }
}

/// State behind the chat drawer.
#[derive(Debug, Clone)]
pub struct ChatPanel {
    country: String,
    messages: Vec<ChatMessage>,
    leaderboard: Leaderboard,
    online: Option<u32>,
    distribution: Option<String>,
    status: ChannelStatus,
    open: bool,
    unread: usize,
}

impl ChatPanel {
    pub fn new(country: impl Into<String>) -> Self {
        Self {
            country: country.into(),
            messages: Vec::new(),
            leaderboard: Leaderboard::default(),
            online: None,
            distribution: None,
            status: ChannelStatus::Connecting,
            open: false,
            unread: 0,
        }
    }

    pub fn country(&self) -> &str {
        &self.country
    }

    /// Update the country once geo lookup or config provides one.
    pub fn set_country(&mut self, country: impl Into<String>) {
        self.country = country.into();
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn leaderboard(&self) -> &Leaderboard {
        &self.leaderboard
    }

    /// Leaderboard rows with their rank badge.
    pub fn ranked(&self) -> Vec<(String, &LeaderboardEntry)> {
        self.leaderboard
            .entries()
            .iter()
            .enumerate()
            .map(|(i, entry)| (rank_badge(i + 1), entry))
            .collect()
    }

    pub fn status(&self) -> ChannelStatus {
        self.status
    }

    pub fn is_connected(&self) -> bool {
        self.status == ChannelStatus::Connected
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    /// Open the drawer and mark everything read.
    pub fn open(&mut self) {
        self.open = true;
        self.unread = 0;
    }

    pub fn close(&mut self) {
        self.open = false;
    }

    /// Flip the drawer; returns whether it is open afterwards.
    pub fn toggle(&mut self) -> bool {
        if self.open {
            self.close();
        } else {
            self.open();
        }
        self.open
    }

    pub fn unread(&self) -> usize {
        self.unread
    }

    /// Unread badge text, `None` when there is nothing unread.
    pub fn unread_badge(&self) -> Option<String> {
        match self.unread {
            0 => None,
            n if n > UNREAD_BADGE_CAP => Some(format!("{}+", UNREAD_BADGE_CAP)),
            n => Some(n.to_string()),
        }
    }

    pub fn online(&self) -> Option<u32> {
        self.online
    }

    /// Online counter text, e.g. `(3)`.
    pub fn online_text(&self) -> Option<String> {
        self.online.map(|count| format!("({})", count))
    }

    /// Per-country breakdown of who is online, as sent by the server.
    pub fn distribution(&self) -> Option<&str> {
        self.distribution.as_deref()
    }

    /// Build the outbound message for `text`.
    ///
    /// Blank messages are rejected, and nothing can be sent while the
    /// channel is down.
    pub fn compose(&self, text: &str) -> Result<Outbound, AppError> {
        let msg = text.trim();
        if msg.is_empty() {
            return Err(ValidationError::EmptyMessage.into());
        }
        if !self.is_connected() {
            return Err(AppError::Disconnected);
        }
        Ok(Outbound::Chat {
            country: self.country.clone(),
            msg: msg.to_string(),
        })
    }

    /// Apply one realtime event.
    pub fn handle(&mut self, event: RealtimeEvent) {
        match event {
            RealtimeEvent::Status(status) => self.status = status,
            RealtimeEvent::Message(message) => self.apply(message),
            RealtimeEvent::Error(reason) => log::debug!("Chat channel error: {}", reason),
        }
    }

    /// Apply one inbound message.
    pub fn apply(&mut self, message: Inbound) {
        match message {
            Inbound::Chat {
                message,
                leaderboard,
            } => {
                if !self.open {
                    self.unread += 1;
                }
                self.messages.push(message);
                if let Some(board) = leaderboard {
                    self.leaderboard = board;
                }
            }
            Inbound::Init {
                leaderboard,
                history,
                online,
            } => {
                log::debug!("Chat init with {} history messages", history.len());
                self.messages = history;
                self.leaderboard = leaderboard;
                if online.is_some() {
                    self.online = online;
                }
            }
            Inbound::UpdateScore { leaderboard } => {
                if let Some(board) = leaderboard {
                    self.leaderboard = board;
                }
            }
            Inbound::OnlineCount {
                count,
                distribution,
            } => {
                self.online = Some(count);
                self.distribution = distribution;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chat(country: &str, msg: &str) -> Inbound {
        Inbound::Chat {
            message: ChatMessage {
                country: country.to_string(),
                msg: msg.to_string(),
            },
            leaderboard: None,
        }
    }

    fn connected() -> ChatPanel {
        let mut panel = ChatPanel::new("DK");
        panel.handle(RealtimeEvent::Status(ChannelStatus::Connected));
        panel
    }

    #[test]
    fn test_unread_counts_only_while_closed() {
        let mut panel = connected();
        panel.apply(chat("SE", "hej"));
        assert_eq!(panel.unread(), 1);
        assert_eq!(panel.unread_badge().as_deref(), Some("1"));

        panel.open();
        assert_eq!(panel.unread(), 0);
        panel.apply(chat("SE", "again"));
        assert_eq!(panel.unread(), 0);
        assert_eq!(panel.messages().len(), 2);
    }

    #[test]
    fn test_unread_badge_caps() {
        let mut panel = connected();
        for i in 0..100 {
            panel.apply(chat("SE", &i.to_string()));
        }
        assert_eq!(panel.unread_badge().as_deref(), Some("99+"));
        assert!(panel.toggle());
        assert_eq!(panel.unread_badge(), None);
        assert!(!panel.toggle());
    }

    #[test]
    fn test_compose_rules() {
        let mut panel = ChatPanel::new("DK");
        assert!(matches!(panel.compose("hi"), Err(AppError::Disconnected)));

        panel.handle(RealtimeEvent::Status(ChannelStatus::Connected));
        assert!(matches!(
            panel.compose("   "),
            Err(AppError::Validation(ValidationError::EmptyMessage))
        ));
        assert_eq!(
            panel.compose("  hi ").unwrap(),
            Outbound::Chat {
                country: "DK".to_string(),
                msg: "hi".to_string()
            }
        );

        panel.handle(RealtimeEvent::Status(ChannelStatus::Reconnecting));
        assert!(panel.compose("hi").is_err());
    }

    #[test]
    fn test_init_replaces_history_without_unread() {
        let mut panel = connected();
        panel.apply(chat("SE", "old"));
        let message = Inbound::parse(
            r#"{"type":"init","online":5,"history":[{"country":"KR","msg":"hi"}],
                "leaderboard":[{"country":"KR","score":4,"chats":1}]}"#,
        )
        .unwrap();
        panel.apply(message);

        assert_eq!(panel.messages().len(), 1);
        assert_eq!(panel.messages()[0].country, "KR");
        assert_eq!(panel.online_text().as_deref(), Some("(5)"));
        assert_eq!(panel.leaderboard().entries()[0].score, 4);
        assert_eq!(panel.unread(), 1);
    }

    #[test]
    fn test_online_count_and_distribution() {
        let mut panel = connected();
        panel.apply(Inbound::OnlineCount {
            count: 3,
            distribution: Some("DK: 2, SE: 1".to_string()),
        });
        assert_eq!(panel.online(), Some(3));
        assert_eq!(panel.distribution(), Some("DK: 2, SE: 1"));
    }

    #[test]
    fn test_chat_and_score_update_leaderboard() {
        let mut panel = connected();
        let message = Inbound::parse(
            r#"{"type":"chat","country":"DK","msg":"x","leaderboard":{"DK":2,"SE":7}}"#,
        )
        .unwrap();
        panel.apply(message);
        assert_eq!(panel.leaderboard().entries()[0].country, "SE");

        panel.apply(Inbound::UpdateScore { leaderboard: None });
        assert_eq!(panel.leaderboard().entries().len(), 2);
    }

    #[test]
    fn test_rank_badges() {
        let mut panel = connected();
        panel.apply(
            Inbound::parse(r#"{"type":"update_score","leaderboard":{"A":4,"B":3,"C":2,"D":1}}"#)
                .unwrap(),
        );
        let badges: Vec<String> = panel.ranked().into_iter().map(|(badge, _)| badge).collect();
        assert_eq!(badges, vec!["🥇", "🥈", "🥉", "#4"]);
    }
}
