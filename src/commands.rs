//! Sub-command implementations of the native binary.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use paperpix::api::{HttpClient, PdfUpload, TrendingId, display_doi};
use paperpix::archive;
use paperpix::chat::ChatPanel;
use paperpix::config::AppConfig;
use paperpix::error::{AppError, Notice, NoticeKind};
use paperpix::realtime::{ChannelStatus, Inbound, Outbound, RealtimeClient, RealtimeEvent};
use paperpix::session::{Outcome, Session};
use paperpix::social::{TrendingBoard, like_notice, trending_notice};
use paperpix::storage::{FileStore, KeyValueStore, MemoryStore, SearchHistory};
use paperpix_gallery::{FilterThreshold, GalleryError, ImageId, NullView};
use web_time::Instant;

use crate::cli::{GalleryArgs, PeriodArg};

/// How long a one-shot command waits for the realtime channel.
const CONNECT_WAIT: Duration = Duration::from_secs(3);

/// Effective configuration plus where it came from.
pub struct Context {
    pub config: AppConfig,
    pub config_path: Option<PathBuf>,
}

/// What an extraction starts from.
pub enum Source {
    Doi(String),
    File(PathBuf),
}

fn open_store() -> Box<dyn KeyValueStore> {
    let opened = FileStore::default_path()
        .ok_or_else(|| AppError::Storage("No data directory".to_string()))
        .and_then(FileStore::open);
    match opened {
        Ok(store) => {
            log::debug!("Using state file {:?}", store.path());
            Box::new(store)
        }
        Err(e) => {
            log::warn!("State will not persist: {}", e);
            Box::new(MemoryStore::new())
        }
    }
}

fn print_notice(notice: Option<&Notice>) {
    let Some(notice) = notice else {
        return;
    };
    match notice.kind {
        NoticeKind::Error => eprintln!("{}", notice.message),
        NoticeKind::Success | NoticeKind::Info => println!("{}", notice.message),
    }
    if let Some(link) = &notice.rescue_link {
        eprintln!("Open the publisher site, download the PDF and upload it: {}", link);
    }
}

/// 1-based image number from the command line to an id.
fn image_id(number: u32) -> ImageId {
    ImageId(number.saturating_sub(1))
}

pub fn extract(ctx: &Context, source: Source, args: &GalleryArgs) -> Result<ExitCode, AppError> {
    let client = HttpClient::new(&ctx.config.server_url)?;
    let mut session = Session::new(NullView, ctx.config.clone(), open_store());

    let outcome = match source {
        Source::Doi(doi) => session.extract_doi(&doi, &client),
        Source::File(path) => {
            let filename = path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_else(|| "upload.pdf".to_string());
            let upload = PdfUpload::new(filename, None, std::fs::read(&path)?);
            session.extract_upload(&upload, &client)
        }
    };
    print_notice(session.notice());

    let score = match outcome? {
        Outcome::Loaded { score, .. } => score,
        Outcome::Stale | Outcome::Failed => return Ok(ExitCode::FAILURE),
    };

    apply_gallery_args(&mut session, args)?;

    if let Some(number) = args.like {
        let image = session
            .gallery()
            .session()
            .image(image_id(number))
            .cloned()
            .ok_or(GalleryError::UnknownImage(image_id(number)))?;
        let doi = session.doi_field().to_string();
        let country = session.config().country.clone();
        let mut board = TrendingBoard::load(session.store_mut());
        let result = board.like_image(
            &image,
            Some(doi.as_str()),
            &country,
            &client,
            session.store_mut(),
        );
        session.show_notice(like_notice(&result));
        print_notice(session.notice());
    }

    if args.list {
        list_images(&session);
    } else {
        let out_dir = output_dir(ctx, args);
        download(&session, &out_dir)?;
        if args.pdf {
            save_pdf(&session, &out_dir)?;
        }
    }

    if let Some(score) = score {
        send_once(&ctx.config.server_url, score);
    }
    Ok(ExitCode::SUCCESS)
}

fn apply_gallery_args(session: &mut Session<NullView>, args: &GalleryArgs) -> Result<(), AppError> {
    let gallery = session.gallery_mut();
    if let Some(percent) = args.threshold {
        gallery.set_threshold(FilterThreshold::new(percent)?);
    }
    if let Some(sort) = args.sort {
        gallery.set_sort_mode(sort.into());
    }
    for &number in &args.select {
        gallery.toggle(image_id(number))?;
    }
    if let [from, to] = args.range[..] {
        gallery.select_range(image_id(from), image_id(to))?;
    }
    if args.delete {
        let deleted = gallery.delete_selected();
        println!("Deleted {} images", deleted.len());
    }
    println!(
        "{} of {} images shown ({}, {})",
        gallery.visible_count(),
        gallery.session().images().len(),
        gallery.threshold().label(),
        gallery.sort_mode().name()
    );
    Ok(())
}

fn list_images(session: &Session<NullView>) {
    let gallery = session.gallery();
    let visible = gallery.visible();
    for image in gallery.session().display_order() {
        let mut flags = String::new();
        if gallery.selected().contains(&image.id()) {
            flags.push_str(" selected");
        }
        if !visible.contains(&image.id()) {
            flags.push_str(" hidden");
        }
        println!(
            "{:>4}  {}x{}  {}{}",
            image.id().ordinal(),
            image.width(),
            image.height(),
            image.extension(),
            flags
        );
    }
}

fn output_dir(ctx: &Context, args: &GalleryArgs) -> PathBuf {
    args.out.clone().unwrap_or_else(|| {
        let configured = &ctx.config.preferences.download_dir;
        if configured.is_empty() {
            PathBuf::from(".")
        } else {
            PathBuf::from(configured)
        }
    })
}

fn download(session: &Session<NullView>, out_dir: &Path) -> Result<(), AppError> {
    let gallery = session.gallery();
    let plan = gallery.download_plan();
    match archive::package(&plan)? {
        Some(artifact) => {
            let path = archive::save_to_dir(&artifact, out_dir)?;
            println!("{}: saved {}", gallery.download_label(), path.display());
        }
        None => println!("Nothing to download"),
    }
    Ok(())
}

fn save_pdf(session: &Session<NullView>, out_dir: &Path) -> Result<(), AppError> {
    let Some(pdf) = session.pdf() else {
        println!("The server did not return the PDF");
        return Ok(());
    };
    std::fs::create_dir_all(out_dir)?;
    let path = out_dir.join(format!("{}.pdf", session.gallery().session().title()));
    std::fs::write(&path, pdf)?;
    println!("Saved original PDF to {}", path.display());
    Ok(())
}

fn wait_connected(client: &RealtimeClient, timeout: Duration) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if let Some(RealtimeEvent::Status(ChannelStatus::Connected)) =
            client.next_event(Duration::from_millis(50))
        {
            return true;
        }
    }
    false
}

/// Connect, deliver one message, and hang up.
fn send_once(server_url: &str, message: Outbound) {
    let client = match RealtimeClient::spawn(server_url) {
        Ok(client) => client,
        Err(e) => {
            log::warn!("Realtime channel unavailable: {}", e);
            return;
        }
    };
    if !wait_connected(&client, CONNECT_WAIT) {
        log::warn!("Realtime channel did not connect, {:?} not sent", message);
        return;
    }
    match client.send(message) {
        Ok(()) => println!("Research point earned!"),
        Err(e) => log::warn!("Failed to send score: {}", e),
    }
}

pub fn trending(ctx: &Context, period: PeriodArg) -> Result<ExitCode, AppError> {
    let client = HttpClient::new(&ctx.config.server_url)?;
    let store = open_store();
    let mut board = TrendingBoard::load(store.as_ref());
    board.set_period(period.into());

    if let Err(e) = board.refresh(&client) {
        log::warn!("Trending request failed: {}", e);
        print_notice(Some(&trending_notice(&e)));
        return Ok(ExitCode::FAILURE);
    }
    for line in trending_lines(&board) {
        println!("{}", line);
    }
    Ok(ExitCode::SUCCESS)
}

fn trending_lines(board: &TrendingBoard) -> Vec<String> {
    let rows = board.rows();
    if rows.is_empty() {
        return vec!["No trending images yet. Be the first to like one!".to_string()];
    }

    let mut lines = Vec::new();
    for row in rows {
        let liked = if row.liked { " ♥" } else { "" };
        lines.push(format!(
            "#{:<3} {:>5} likes  id {}{}",
            row.rank, row.image.likes, row.image.id, liked
        ));
        if let Some(url) = &row.image.url {
            lines.push(format!("      {}", url));
        }
        if let Some(doi) = row.shortcut {
            lines.push(format!("      paperpix extract {}", doi));
        }
    }
    lines
}

pub fn vote(ctx: &Context, raw_id: &str) -> Result<ExitCode, AppError> {
    let client = HttpClient::new(&ctx.config.server_url)?;
    let mut store = open_store();
    let mut board = TrendingBoard::load(store.as_ref());
    let id = raw_id
        .trim()
        .parse::<i64>()
        .map(TrendingId::from)
        .unwrap_or_else(|_| TrendingId::from(raw_id.trim()));

    if board.vote(&id, &client, store.as_mut())? {
        println!("Liked {}", id);
    } else {
        println!("Already liked {}", id);
    }
    Ok(ExitCode::SUCCESS)
}

pub fn history(remove: Option<&str>) -> Result<ExitCode, AppError> {
    let mut store = open_store();
    let mut history = SearchHistory::load(store.as_ref());
    if let Some(doi) = remove {
        if history.remove(doi) {
            history.save(store.as_mut())?;
            println!("Removed {}", doi);
        } else {
            println!("{} is not in the history", doi);
        }
    }
    if history.is_empty() {
        println!("No recent papers");
    }
    for doi in history.entries() {
        println!("{}", display_doi(doi));
    }
    Ok(ExitCode::SUCCESS)
}

pub fn chat(
    ctx: &Context,
    message: Option<String>,
    listen: Duration,
) -> Result<ExitCode, AppError> {
    let client = RealtimeClient::spawn(&ctx.config.server_url)?;
    let mut panel = ChatPanel::new(ctx.config.country.clone());
    panel.open();

    let mut outgoing = message;
    let mut printed = 0;
    let deadline = Instant::now() + listen;
    while Instant::now() < deadline {
        if let Some(event) = client.next_event(Duration::from_millis(100)) {
            match &event {
                RealtimeEvent::Status(status) if *status != panel.status() => {
                    println!("-- {}", status.label());
                }
                RealtimeEvent::Message(Inbound::Init { .. }) => printed = 0,
                _ => {}
            }
            panel.handle(event);
            for line in &panel.messages()[printed.min(panel.messages().len())..] {
                println!("[{}] {}", line.country, line.msg);
            }
            printed = panel.messages().len();
        }

        if panel.is_connected() {
            if let Some(text) = outgoing.take() {
                client.send(panel.compose(&text)?)?;
            }
        }
    }

    if outgoing.is_some() {
        eprintln!("Not connected, message not sent");
    }
    if let Some(online) = panel.online_text() {
        println!("Online {}", online);
    }
    if let Some(distribution) = panel.distribution() {
        println!("{}", distribution);
    }
    for (badge, entry) in panel.ranked() {
        println!(
            "{:>3} {:<8} {:>5} pts {:>4} chats",
            badge, entry.country, entry.score, entry.chats
        );
    }
    Ok(ExitCode::SUCCESS)
}

pub fn show_config(ctx: &Context, save: bool) -> Result<ExitCode, AppError> {
    println!("{}", ctx.config.to_json()?);
    if save {
        let path = ctx
            .config_path
            .clone()
            .ok_or_else(|| AppError::Storage("No config directory".to_string()))?;
        ctx.config
            .save_to_path(&path)
            .map_err(|e| AppError::Storage(e.to_string()))?;
        println!("Saved to {}", path.display());
    }
    Ok(ExitCode::SUCCESS)
}

#[cfg(test)]
mod tests {
    use paperpix::api::{LikeReceipt, LikeUpload, SocialService, TrendingImage, TrendingPeriod};
    use paperpix::constants::LIKED_IDS_KEY;

    use super::*;

    struct FixedBoard(Vec<TrendingImage>);

    impl SocialService for FixedBoard {
        fn trending(&self, _period: TrendingPeriod) -> Result<Vec<TrendingImage>, AppError> {
            Ok(self.0.clone())
        }

        fn vote(&self, _id: &TrendingId) -> Result<Option<i64>, AppError> {
            Ok(None)
        }

        fn like(&self, _upload: &LikeUpload) -> Result<LikeReceipt, AppError> {
            Err(AppError::backend("unused"))
        }
    }

    #[test]
    fn test_trending_lines_flag_liked_rows() {
        let service = FixedBoard(vec![
            TrendingImage {
                id: TrendingId::Number(4),
                likes: 12,
                doi: Some("10.1000/xyz".to_string()),
                url: Some("https://img.example/4.png".to_string()),
            },
            TrendingImage {
                id: TrendingId::from("abc"),
                likes: 3,
                doi: Some("short".to_string()),
                url: None,
            },
        ]);
        let mut store = MemoryStore::new();
        store.set(LIKED_IDS_KEY, r#"["abc"]"#).unwrap();
        let mut board = TrendingBoard::load(&store);
        board.refresh(&service).unwrap();

        let lines = trending_lines(&board);
        assert_eq!(
            lines,
            vec![
                "#1      12 likes  id 4".to_string(),
                "      https://img.example/4.png".to_string(),
                "      paperpix extract 10.1000/xyz".to_string(),
                "#2       3 likes  id abc ♥".to_string(),
            ]
        );
    }

    #[test]
    fn test_trending_lines_for_empty_board() {
        let mut board = TrendingBoard::default();
        board.refresh(&FixedBoard(Vec::new())).unwrap();
        assert_eq!(
            trending_lines(&board),
            vec!["No trending images yet. Be the first to like one!".to_string()]
        );
    }
}
