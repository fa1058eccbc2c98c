use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use futures::TryStreamExt;

use crate::app::{AppContext, Result};
use crate::archive::{ArchiveDriver, ArchiveSummary, ChannelResolver};
use crate::cli::ArchiveArgs;
use crate::config::Config;
use crate::store::Store;

/// Apply command-line overrides on top of the loaded configuration.
pub fn apply_overrides(config: &mut Config, args: &ArchiveArgs) {
    if let Some(channel) = &args.channel {
        config.channel_name = Some(channel.clone());
    }
    if let Some(from) = args.from {
        config.archive.start_after = from;
    }
    if let Some(limit) = args.limit {
        config.archive.limit = limit;
    }
    if let Some(output) = &args.output {
        config.archive.output_dir = output.clone();
    }
}

pub async fn archive(
    ctx: &AppContext,
    resume: bool,
    running: Arc<AtomicBool>,
) -> anyhow::Result<ArchiveSummary> {
    let channel_name = ctx.config.require_channel()?;
    let store = Arc::new(ctx.open_store()?);

    let driver = ArchiveDriver::connect(
        ctx.api.clone(),
        channel_name,
        ctx.renderer(),
        ctx.writer(),
        ctx.driver_settings(),
    )
    .await?
    .with_reactions(ctx.reactions())
    .with_store(store.clone())
    .with_running_flag(running);

    let start_after = if resume {
        store
            .last_archived_id(&driver.channel().numeric_id)?
            .unwrap_or(ctx.config.archive.start_after)
    } else {
        ctx.config.archive.start_after
    };

    println!(
        "Archiving {} into {} (after post {})",
        channel_name,
        ctx.config.archive.posts_path().display(),
        start_after
    );

    let summary = driver.run(start_after).await?;

    match summary.last_post_id {
        Some(id) => println!(
            "Done: {} posts written, last post {}, {} retries",
            summary.written, id, summary.retries
        ),
        None => println!("Done: no new posts"),
    }
    if summary.cancelled {
        println!("Stopped early; rerun with --resume to continue");
    }

    Ok(summary)
}

pub async fn list_dialogs(ctx: &AppContext) -> Result<()> {
    let mut dialogs = ctx.api.list_dialogs();
    let mut count = 0;
    while let Some(dialog) = dialogs.try_next().await? {
        println!("- {}: {}", dialog.name, dialog.id);
        count += 1;
    }
    if count == 0 {
        println!("No dialogs");
    }
    Ok(())
}

pub async fn status(ctx: &AppContext) -> anyhow::Result<()> {
    let channel_name = ctx.config.require_channel()?;
    let channel = ChannelResolver::new(ctx.api.as_ref())
        .resolve(channel_name)
        .await?;
    let store = ctx.open_store()?;

    let count = store.archived_count(&channel.numeric_id)?;
    match store.last_archived_id(&channel.numeric_id)? {
        Some(last) => println!(
            "{}: {} posts archived, last post {}",
            channel.name, count, last
        ),
        None => println!("{}: nothing archived yet", channel.name),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{MemoryApi, RawMessage};
    use chrono::{TimeZone, Utc};
    use std::path::{Path, PathBuf};

    fn context(dir: &Path, api: MemoryApi) -> AppContext {
        let mut config = Config::default();
        config.channel_name = Some("News".into());
        config.archive.output_dir = dir.to_path_buf();
        config.archive.pacing_ms = 0;
        config.archive.backoff_secs = 0;
        AppContext::with_api(config, Arc::new(api))
    }

    fn history(ids: std::ops::RangeInclusive<i64>) -> MemoryApi {
        ids.fold(MemoryApi::new().with_dialog("News", -1007), |api, id| {
            let mut message =
                RawMessage::new(id, Utc.with_ymd_and_hms(2024, 2, 1, 8, 0, 0).unwrap());
            message.text = Some(format!("post {}", id));
            api.with_message(message)
        })
    }

    #[test]
    fn test_overrides() {
        let mut config = Config::default();
        let args = ArchiveArgs {
            channel: Some("News".into()),
            from: Some(12),
            limit: Some(50),
            output: Some(PathBuf::from("/tmp/out")),
            resume: false,
        };
        apply_overrides(&mut config, &args);
        assert_eq!(config.channel_name.as_deref(), Some("News"));
        assert_eq!(config.archive.start_after, 12);
        assert_eq!(config.archive.limit, 50);
        assert_eq!(config.archive.output_dir, PathBuf::from("/tmp/out"));
    }

    #[test]
    fn test_overrides_keep_config_when_absent() {
        let mut config = Config::default();
        apply_overrides(&mut config, &ArchiveArgs::default());
        assert_eq!(config.archive.limit, 1000);
        assert_eq!(config.channel_name, None);
    }

    #[tokio::test]
    async fn test_archive_then_resume() {
        let dir = tempfile::tempdir().unwrap();
        let running = Arc::new(AtomicBool::new(true));

        let first = context(dir.path(), history(1..=3));
        let summary = archive(&first, false, running.clone()).await.unwrap();
        assert_eq!(summary.written, 3);

        let second = context(dir.path(), history(1..=5));
        let summary = archive(&second, true, running).await.unwrap();
        assert_eq!(summary.written, 2);
        assert_eq!(summary.last_post_id, Some(5));

        // Resuming leaves already archived documents alone
        let doc = std::fs::read_to_string(dir.path().join("posts").join("1.md")).unwrap();
        assert_eq!(doc.matches("channel: News").count(), 1);
    }

    #[tokio::test]
    async fn test_dialogs_and_status() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(dir.path(), history(1..=2));
        tokio_test::assert_ok!(list_dialogs(&ctx).await);
        tokio_test::assert_ok!(status(&ctx).await);

        archive(&ctx, false, Arc::new(AtomicBool::new(true)))
            .await
            .unwrap();
        let store = ctx.open_store().unwrap();
        assert_eq!(store.archived_count("7").unwrap(), 2);
        tokio_test::assert_ok!(status(&ctx).await);
    }

    #[tokio::test]
    async fn test_status_unknown_channel_fails() {
        let dir = tempfile::tempdir().unwrap();
        let mut ctx = context(dir.path(), history(1..=1));
        ctx.config.channel_name = Some("Elsewhere".into());
        assert!(status(&ctx).await.is_err());
    }

    #[tokio::test]
    async fn test_archive_requires_channel() {
        let dir = tempfile::tempdir().unwrap();
        let mut ctx = context(dir.path(), history(1..=1));
        ctx.config.channel_name = None;
        assert!(archive(&ctx, false, Arc::new(AtomicBool::new(true)))
            .await
            .is_err());
    }
}
