//! Global constants for the paperpix client

use std::time::Duration;

/// Server used when the configuration does not name one
pub const DEFAULT_SERVER_URL: &str = "http://localhost:8000";

/// Country code sent with chat and score messages before one is configured
pub const UNKNOWN_COUNTRY: &str = "UNKNOWN";

/// Timeout for a single HTTP request (extraction can take a while)
pub const HTTP_TIMEOUT: Duration = Duration::from_secs(180);

/// Delay before the realtime channel dials again after losing the connection
pub const RECONNECT_DELAY: Duration = Duration::from_secs(3);

/// Upper bound for the TCP connect and handshake of the native realtime worker
pub const REALTIME_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Poll interval of the native realtime worker
pub const REALTIME_POLL_INTERVAL: Duration = Duration::from_millis(16);

/// Storage key for the recent DOI history
pub const HISTORY_KEY: &str = "paper_history";

/// Storage key for the ids of trending images the user liked
pub const LIKED_IDS_KEY: &str = "my_liked_ids";

/// Number of DOIs kept in the recent history
pub const MAX_HISTORY: usize = 2;

/// History entry used for uploads; never recorded
pub const UPLOAD_HISTORY_SENTINEL: &str = "uploaded_file";

/// Unread counts above this are shown as "99+"
pub const UNREAD_BADGE_CAP: usize = 99;

/// Trending entries whose DOI is not longer than this offer no extraction shortcut
pub const MIN_SHORTCUT_DOI_LEN: usize = 5;

/// Resolver used for rescue links
pub const DOI_RESOLVER: &str = "https://doi.org/";
