//! Video-to-GIF converter cog: `;video2gif` with an attached .mp4 downloads the video,
//! converts it with ffmpeg, and uploads the result.

use crate::{config, event::*, helper::MessageHelper, log_internal, plugin::*};
use anyhow::{anyhow, Result};
use serenity::all::{CreateAttachment, CreateMessage, Message};
use std::path::Path;
use std::time::Duration;

const CONVERT_TIMEOUT: Duration = Duration::from_secs(300);

pub struct PluginVideo2Gif;

#[serenity::async_trait]
impl Plugin for PluginVideo2Gif {
    fn name(&self) -> &'static str {
        "video2gif"
    }

    async fn usage(&self, ctx: &Context) -> Option<String> {
        let cfg = ctx.cfg.read().await;
        Some(format!(
            "{}video2gif - convert an attached .mp4 into a GIF (owner only)",
            cfg.general.command_prefix
        ))
    }

    async fn handle(&self, ctx: &Context, event: &Event) -> Result<EventHandled> {
        let Some((msg, _rest)) = event.is_bot_cmd(ctx, "video2gif").await else {
            return Ok(EventHandled::No);
        };

        if !msg.is_from_owner(ctx).await {
            msg.reply(ctx.cache_http, "Only the bot owner can do that.")
                .await?;
            return Ok(EventHandled::Yes);
        }

        match convert(ctx, msg).await {
            Ok(()) => {}
            Err(e) => {
                msg.reply(ctx.cache_http, format!("Conversion failed: {}", e))
                    .await?;
            }
        }
        Ok(EventHandled::Yes)
    }
}

fn check_attachment(filename: &str, size: u64, max_bytes: u64) -> Result<()> {
    if !filename.to_lowercase().ends_with(".mp4") {
        return Err(anyhow!("attach an .mp4 video"));
    }
    if size > max_bytes {
        return Err(anyhow!(
            "video is too large ({} bytes, limit {})",
            size, max_bytes
        ));
    }
    Ok(())
}

async fn convert(ctx: &Context<'_>, msg: &Message) -> Result<()> {
    let (max_bytes, frame_rate, gif_width) = {
        let cfg = ctx.cfg.read().await;
        (
            cfg.video2gif.max_video_bytes,
            cfg.video2gif.frame_rate,
            cfg.video2gif.gif_width,
        )
    };

    let attachment = msg
        .attachments
        .first()
        .ok_or_else(|| anyhow!("attach an .mp4 video"))?;
    check_attachment(&attachment.filename, u64::from(attachment.size), max_bytes)?;

    let work_dir = config::data_dir()?;
    let video_path = work_dir.join(format!("video2gif-{}.mp4", msg.id));
    let gif_path = work_dir.join(format!("video2gif-{}.gif", msg.id));

    let typing = msg.channel_id.start_typing(ctx.http);
    let result = download_and_convert(
        &attachment.url,
        &video_path,
        &gif_path,
        frame_rate,
        gif_width,
    )
    .await;
    typing.stop();

    if result.is_ok() {
        msg.channel_id
            .send_message(
                ctx.cache_http,
                CreateMessage::new().add_file(CreateAttachment::path(&gif_path).await?),
            )
            .await?;
    }

    // Best-effort cleanup whether or not the conversion succeeded.
    let _ = tokio::fs::remove_file(&video_path).await;
    let _ = tokio::fs::remove_file(&gif_path).await;

    result
}

async fn download_and_convert(
    url: &str,
    video_path: &Path,
    gif_path: &Path,
    frame_rate: u32,
    gif_width: u32,
) -> Result<()> {
    log_internal!("Downloading video from {}... ", url);
    let bytes = reqwest::get(url).await?.bytes().await?;
    tokio::fs::write(video_path, &bytes).await?;
    log_internal!("Downloading video from {}... done", url);

    run_ffmpeg(video_path, gif_path, frame_rate, gif_width).await
}

async fn run_ffmpeg(
    video_path: &Path,
    gif_path: &Path,
    frame_rate: u32,
    gif_width: u32,
) -> Result<()> {
    // lanczos scaling gives noticeably better GIF output than the default.
    let filter = format!(
        "fps={},scale={}:-1:flags=lanczos",
        frame_rate, gif_width
    );

    log_internal!("Converting {:?} to GIF... ", video_path);
    let child = tokio::process::Command::new("ffmpeg")
        .arg("-y")
        .arg("-i")
        .arg(video_path)
        .arg("-vf")
        .arg(&filter)
        .arg(gif_path)
        .output();
    let output = tokio::time::timeout(CONVERT_TIMEOUT, child)
        .await
        .map_err(|_| anyhow!("ffmpeg timed out"))?
        .map_err(|e| anyhow!("failed to run ffmpeg: {}", e))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(anyhow!(
            "ffmpeg exited with {}: {}",
            output.status,
            stderr.lines().last().unwrap_or("")
        ));
    }
    log_internal!("Converting {:?} to GIF... done", video_path);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_non_mp4_attachments() {
        assert!(check_attachment("clip.mov", 1024, 8_000_000).is_err());
    }

    #[test]
    fn rejects_oversized_videos() {
        assert!(check_attachment("clip.mp4", 9_000_000, 8_000_000).is_err());
    }

    #[test]
    fn accepts_mp4_within_limit() {
        assert!(check_attachment("CLIP.MP4", 1024, 8_000_000).is_ok());
    }
}
