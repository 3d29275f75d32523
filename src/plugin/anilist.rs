//! AniList cog: search anime, manga, characters, studios, staff, and users on the
//! AniList GraphQL API, plus trending/random picks and the airing schedule.

use crate::{event::*, log_internal, plugin::*};
use anyhow::Result;
use rand::seq::SliceRandom;
use serenity::all::{CreateEmbed, CreateEmbedFooter, CreateMessage, Message};

const ANILIST_URL: &str = "https://graphql.anilist.co";

/// Genres AniList recognizes; anything else passed to `;random` is treated as a search tag.
const GENRES: &[&str] = &[
    "Action",
    "Adventure",
    "Comedy",
    "Drama",
    "Ecchi",
    "Fantasy",
    "Hentai",
    "Horror",
    "Mahou Shoujo",
    "Mecha",
    "Music",
    "Mystery",
    "Psychological",
    "Romance",
    "Sci-Fi",
    "Slice of Life",
    "Sports",
    "Supernatural",
    "Thriller",
];

const MEDIA_QUERY: &str = "\
query ($search: String, $type: MediaType) {
  Media(search: $search, type: $type) {
    title { romaji english }
    format
    status
    episodes
    chapters
    averageScore
    description(asHtml: false)
    siteUrl
    coverImage { large }
  }
}";

const TRENDING_QUERY: &str = "\
query ($type: MediaType) {
  Page(page: 1, perPage: 10) {
    media(type: $type, sort: TRENDING_DESC) {
      title { romaji english }
      format
      status
      episodes
      chapters
      averageScore
      description(asHtml: false)
      siteUrl
      coverImage { large }
    }
  }
}";

const RANDOM_GENRE_QUERY: &str = "\
query ($type: MediaType, $genre: String, $formats: [MediaFormat]) {
  Page(page: 1, perPage: 1) {
    media(type: $type, genre: $genre, format_in: $formats) {
      title { romaji english }
      format
      status
      episodes
      chapters
      averageScore
      description(asHtml: false)
      siteUrl
      coverImage { large }
    }
  }
}";

const RANDOM_TAG_QUERY: &str = "\
query ($type: MediaType, $genre: String, $formats: [MediaFormat]) {
  Page(page: 1, perPage: 1) {
    media(type: $type, tag: $genre, format_in: $formats) {
      title { romaji english }
      format
      status
      episodes
      chapters
      averageScore
      description(asHtml: false)
      siteUrl
      coverImage { large }
    }
  }
}";

const CHARACTER_QUERY: &str = "\
query ($search: String) {
  Character(search: $search, sort: SEARCH_MATCH) {
    name { full native }
    image { large }
    description(asHtml: false)
    siteUrl
    favourites
  }
}";

const STUDIO_QUERY: &str = "\
query ($search: String) {
  Studio(search: $search) {
    name
    siteUrl
    favourites
    isAnimationStudio
    media(sort: POPULARITY_DESC, perPage: 5) {
      nodes { title { romaji english } siteUrl }
    }
  }
}";

const SCHEDULE_QUERY: &str = "\
query ($notYetAired: Boolean, $sort: [AiringSort]) {
  Page(page: 1, perPage: 20) {
    airingSchedules(notYetAired: $notYetAired, sort: $sort) {
      airingAt
      episode
      media { title { romaji english } siteUrl }
    }
  }
}";

const STAFF_QUERY: &str = "\
query ($search: String) {
  Staff(search: $search) {
    name { full native }
    image { large }
    description(asHtml: false)
    siteUrl
    languageV2
    primaryOccupations
  }
}";

const USER_QUERY: &str = "\
query ($search: String) {
  User(search: $search) {
    name
    siteUrl
    about(asHtml: false)
    avatar { large }
    statistics {
      anime { count meanScore }
      manga { count meanScore }
    }
  }
}";

pub struct PluginAnilist;

#[serenity::async_trait]
impl Plugin for PluginAnilist {
    fn name(&self) -> &'static str {
        "anilist"
    }

    async fn usage(&self, ctx: &Context) -> Option<String> {
        let cfg = ctx.cfg.read().await;
        Some(format!(
            "{p}anime <query> - fetch info on an anime from AniList\n\
             {p}manga <query> - fetch info on a manga from AniList\n\
             {p}trending <anime|manga> - currently trending titles\n\
             {p}random <anime|manga> [genre or tag] - a pick from a genre or tag\n\
             {p}character <query> - fetch info on an anime/manga character\n\
             {p}studio <query> - fetch info on an animation studio\n\
             {p}upcoming - animes airing within the next day\n\
             {p}lastaired - animes aired in the past day\n\
             {p}anistaff <query> - fetch info on anime/manga staff or seiyuu\n\
             {p}aniuser <name> - fetch an AniList user profile",
            p = cfg.general.command_prefix
        ))
    }

    async fn handle(&self, ctx: &Context, event: &Event) -> Result<EventHandled> {
        for (cmd, media_type) in [("anime", "ANIME"), ("manga", "MANGA")] {
            if let Some((msg, query)) = event.is_bot_cmd(ctx, cmd).await {
                media_search(ctx, msg, query, media_type).await?;
                return Ok(EventHandled::Yes);
            }
        }
        if let Some((msg, args)) = event.is_bot_cmd(ctx, "trending").await {
            trending(ctx, msg, args).await?;
            return Ok(EventHandled::Yes);
        }
        if let Some((msg, args)) = event.is_bot_cmd(ctx, "random").await {
            random_media(ctx, msg, args).await?;
            return Ok(EventHandled::Yes);
        }
        if let Some((msg, query)) = event.is_bot_cmd(ctx, "character").await {
            character(ctx, msg, query).await?;
            return Ok(EventHandled::Yes);
        }
        if let Some((msg, query)) = event.is_bot_cmd(ctx, "studio").await {
            studio(ctx, msg, query).await?;
            return Ok(EventHandled::Yes);
        }
        if let Some((msg, _)) = event.is_bot_cmd(ctx, "upcoming").await {
            schedule(ctx, msg, true).await?;
            return Ok(EventHandled::Yes);
        }
        if let Some((msg, _)) = event.is_bot_cmd(ctx, "lastaired").await {
            schedule(ctx, msg, false).await?;
            return Ok(EventHandled::Yes);
        }
        if let Some((msg, query)) = event.is_bot_cmd(ctx, "anistaff").await {
            staff(ctx, msg, query).await?;
            return Ok(EventHandled::Yes);
        }
        if let Some((msg, query)) = event.is_bot_cmd(ctx, "aniuser").await {
            ani_user(ctx, msg, query).await?;
            return Ok(EventHandled::Yes);
        }
        Ok(EventHandled::No)
    }
}

#[derive(serde::Deserialize)]
struct GraphQlResponse<T> {
    data: Option<T>,
}

#[derive(serde::Deserialize)]
struct MediaData {
    #[serde(rename = "Media")]
    media: Option<Media>,
}

#[derive(serde::Deserialize)]
struct MediaPageData {
    #[serde(rename = "Page")]
    page: Option<MediaPage>,
}

#[derive(serde::Deserialize)]
struct MediaPage {
    media: Vec<Media>,
}

#[derive(serde::Deserialize)]
struct Media {
    title: MediaTitle,
    format: Option<String>,
    status: Option<String>,
    episodes: Option<u32>,
    chapters: Option<u32>,
    #[serde(rename = "averageScore")]
    average_score: Option<u32>,
    description: Option<String>,
    #[serde(rename = "siteUrl")]
    site_url: String,
    #[serde(rename = "coverImage")]
    cover_image: Option<Portrait>,
}

#[derive(serde::Deserialize)]
struct MediaTitle {
    romaji: Option<String>,
    english: Option<String>,
}

impl MediaTitle {
    fn display(&self) -> String {
        self.romaji
            .clone()
            .or_else(|| self.english.clone())
            .unwrap_or_else(|| "Title ???".to_string())
    }
}

#[derive(serde::Deserialize)]
struct Portrait {
    large: Option<String>,
}

#[derive(serde::Deserialize)]
struct PersonName {
    full: Option<String>,
    native: Option<String>,
}

impl PersonName {
    fn display(&self) -> String {
        self.full
            .clone()
            .or_else(|| self.native.clone())
            .unwrap_or_else(|| "Name ???".to_string())
    }
}

#[derive(serde::Deserialize)]
struct CharacterData {
    #[serde(rename = "Character")]
    character: Option<Character>,
}

#[derive(serde::Deserialize)]
struct Character {
    name: PersonName,
    image: Option<Portrait>,
    description: Option<String>,
    #[serde(rename = "siteUrl")]
    site_url: String,
    favourites: Option<u32>,
}

#[derive(serde::Deserialize)]
struct StudioData {
    #[serde(rename = "Studio")]
    studio: Option<Studio>,
}

#[derive(serde::Deserialize)]
struct Studio {
    name: String,
    #[serde(rename = "siteUrl")]
    site_url: String,
    favourites: Option<u32>,
    #[serde(rename = "isAnimationStudio")]
    is_animation_studio: bool,
    media: Option<StudioMedia>,
}

#[derive(serde::Deserialize)]
struct StudioMedia {
    nodes: Vec<StudioWork>,
}

#[derive(serde::Deserialize)]
struct StudioWork {
    title: MediaTitle,
    #[serde(rename = "siteUrl")]
    site_url: String,
}

#[derive(serde::Deserialize)]
struct SchedulePageData {
    #[serde(rename = "Page")]
    page: Option<SchedulePage>,
}

#[derive(serde::Deserialize)]
struct SchedulePage {
    #[serde(rename = "airingSchedules")]
    airing_schedules: Vec<Airing>,
}

#[derive(serde::Deserialize)]
struct Airing {
    #[serde(rename = "airingAt")]
    airing_at: u64,
    episode: u32,
    media: AiringMedia,
}

#[derive(serde::Deserialize)]
struct AiringMedia {
    title: MediaTitle,
    #[serde(rename = "siteUrl")]
    site_url: String,
}

#[derive(serde::Deserialize)]
struct StaffData {
    #[serde(rename = "Staff")]
    staff: Option<Staff>,
}

#[derive(serde::Deserialize)]
struct Staff {
    name: PersonName,
    image: Option<Portrait>,
    description: Option<String>,
    #[serde(rename = "siteUrl")]
    site_url: String,
    #[serde(rename = "languageV2")]
    language: Option<String>,
    #[serde(rename = "primaryOccupations")]
    occupations: Option<Vec<String>>,
}

#[derive(serde::Deserialize)]
struct UserData {
    #[serde(rename = "User")]
    user: Option<AniListUser>,
}

#[derive(serde::Deserialize)]
struct AniListUser {
    name: String,
    #[serde(rename = "siteUrl")]
    site_url: String,
    about: Option<String>,
    avatar: Option<Portrait>,
    statistics: Option<UserStatistics>,
}

#[derive(serde::Deserialize)]
struct UserStatistics {
    anime: Option<LibraryStats>,
    manga: Option<LibraryStats>,
}

#[derive(serde::Deserialize)]
struct LibraryStats {
    count: u32,
    #[serde(rename = "meanScore")]
    mean_score: f64,
}

/// One POST to the AniList GraphQL endpoint.
///
/// AniList reports "not found" as an HTTP error with a JSON body, so the body is parsed
/// regardless of status; a missing `data` object is the caller's no-result case.
async fn gql<T: serde::de::DeserializeOwned>(
    query: &str,
    variables: serde_json::Value,
) -> Result<Option<T>> {
    let body = serde_json::json!({ "query": query, "variables": variables });
    let response = reqwest::Client::new()
        .post(ANILIST_URL)
        .json(&body)
        .send()
        .await?
        .json::<GraphQlResponse<T>>()
        .await?;
    Ok(response.data)
}

async fn no_results(ctx: &Context<'_>, msg: &Message, query: &str) -> Result<()> {
    msg.reply(ctx.cache_http, format!("No results found for `{}`.", query))
        .await?;
    Ok(())
}

fn media_embed(media: Media, max_chars: usize) -> CreateEmbed {
    let description = media
        .description
        .map(|d| clean_description(&d, max_chars))
        .unwrap_or_default();

    let mut embed = CreateEmbed::new()
        .title(media.title.display())
        .url(media.site_url)
        .description(description)
        .footer(CreateEmbedFooter::new("Data from AniList"));
    if let Some(format) = media.format {
        embed = embed.field("Format", format, true);
    }
    if let Some(status) = media.status {
        embed = embed.field("Status", status, true);
    }
    if let Some(episodes) = media.episodes {
        embed = embed.field("Episodes", episodes.to_string(), true);
    }
    if let Some(chapters) = media.chapters {
        embed = embed.field("Chapters", chapters.to_string(), true);
    }
    if let Some(score) = media.average_score {
        embed = embed.field("Score", format!("{}/100", score), true);
    }
    if let Some(large) = media.cover_image.and_then(|c| c.large) {
        embed = embed.thumbnail(large);
    }
    embed
}

async fn media_search(
    ctx: &Context<'_>,
    msg: &Message,
    query: &str,
    media_type: &str,
) -> Result<()> {
    if query.is_empty() {
        msg.reply(ctx.cache_http, "Give me something to search for.")
            .await?;
        return Ok(());
    }

    let typing = msg.channel_id.start_typing(ctx.http);
    log_internal!("AniList {} search for `{}`", media_type, query);
    let response = gql::<MediaData>(
        MEDIA_QUERY,
        serde_json::json!({ "search": query, "type": media_type }),
    )
    .await;
    typing.stop();

    let Some(media) = response?.and_then(|d| d.media) else {
        return no_results(ctx, msg, query).await;
    };

    let max_chars = ctx.cfg.read().await.anilist.max_description_chars;
    msg.channel_id
        .send_message(
            ctx.cache_http,
            CreateMessage::new().embed(media_embed(media, max_chars)),
        )
        .await?;
    Ok(())
}

async fn trending(ctx: &Context<'_>, msg: &Message, args: &str) -> Result<()> {
    let Some(media_type) = media_type_arg(args) else {
        msg.reply(ctx.cache_http, "Tell me which: `trending anime` or `trending manga`.")
            .await?;
        return Ok(());
    };

    let typing = msg.channel_id.start_typing(ctx.http);
    let response = gql::<MediaPageData>(
        TRENDING_QUERY,
        serde_json::json!({ "type": media_type }),
    )
    .await;
    typing.stop();

    let entries = response?
        .and_then(|d| d.page)
        .map(|p| p.media)
        .unwrap_or_default();
    if entries.is_empty() {
        return no_results(ctx, msg, args).await;
    }

    let lines: Vec<String> = entries
        .iter()
        .enumerate()
        .map(|(i, media)| {
            let score = media
                .average_score
                .map(|s| format!(" • {}/100", s))
                .unwrap_or_default();
            format!("**{}.** [{}]({}){}", i + 1, media.title.display(), media.site_url, score)
        })
        .collect();

    let embed = CreateEmbed::new()
        .title(format!("Trending {} on AniList", args.trim().to_lowercase()))
        .description(lines.join("\n"))
        .footer(CreateEmbedFooter::new("Data from AniList"));
    msg.channel_id
        .send_message(ctx.cache_http, CreateMessage::new().embed(embed))
        .await?;
    Ok(())
}

async fn random_media(ctx: &Context<'_>, msg: &Message, args: &str) -> Result<()> {
    let (type_word, genre_or_tag) = match args.split_once(char::is_whitespace) {
        Some((first, rest)) => (first, rest.trim()),
        None => (args.trim(), ""),
    };
    let Some(media_type) = media_type_arg(type_word) else {
        msg.reply(
            ctx.cache_http,
            "Usage: `random <anime|manga> [genre or tag]`.",
        )
        .await?;
        return Ok(());
    };

    let genre_or_tag = if genre_or_tag.is_empty() {
        // The rng handle is not Send, keep it out of any await
        let picked = {
            let mut rng = rand::thread_rng();
            GENRES.choose(&mut rng).copied().unwrap_or(GENRES[0])
        };
        msg.reply(
            ctx.cache_http,
            format!("No genre or tag provided, so I chose random genre: **{}**", picked),
        )
        .await?;
        picked.to_string()
    } else {
        genre_or_tag.to_string()
    };

    let formats = if media_type == "ANIME" {
        serde_json::json!(["TV", "TV_SHORT", "MOVIE", "OVA", "ONA"])
    } else {
        serde_json::json!(["MANGA", "NOVEL", "ONE_SHOT"])
    };
    let query = if known_genre(&genre_or_tag) {
        RANDOM_GENRE_QUERY
    } else {
        RANDOM_TAG_QUERY
    };

    let typing = msg.channel_id.start_typing(ctx.http);
    let response = gql::<MediaPageData>(
        query,
        serde_json::json!({
            "type": media_type,
            "genre": genre_or_tag,
            "formats": formats,
        }),
    )
    .await;
    typing.stop();

    let media = response?
        .and_then(|d| d.page)
        .and_then(|p| p.media.into_iter().next());
    let Some(media) = media else {
        msg.reply(
            ctx.cache_http,
            "Could not find anything from the given genre or tag.\n\
             See if it is valid as per AniList or try again with a different genre/tag.",
        )
        .await?;
        return Ok(());
    };

    let max_chars = ctx.cfg.read().await.anilist.max_description_chars;
    msg.channel_id
        .send_message(
            ctx.cache_http,
            CreateMessage::new().embed(media_embed(media, max_chars)),
        )
        .await?;
    Ok(())
}

async fn character(ctx: &Context<'_>, msg: &Message, query: &str) -> Result<()> {
    if query.is_empty() {
        msg.reply(ctx.cache_http, "Give me a character name to search for.")
            .await?;
        return Ok(());
    }

    let typing = msg.channel_id.start_typing(ctx.http);
    let response = gql::<CharacterData>(
        CHARACTER_QUERY,
        serde_json::json!({ "search": query }),
    )
    .await;
    typing.stop();

    let Some(character) = response?.and_then(|d| d.character) else {
        return no_results(ctx, msg, query).await;
    };

    let max_chars = ctx.cfg.read().await.anilist.max_description_chars;
    let description = character
        .description
        .map(|d| clean_description(&d, max_chars))
        .unwrap_or_default();

    let mut embed = CreateEmbed::new()
        .title(character.name.display())
        .url(character.site_url)
        .description(description)
        .footer(CreateEmbedFooter::new("Data from AniList"));
    if let Some(native) = character.name.native {
        embed = embed.field("Native name", native, true);
    }
    if let Some(favourites) = character.favourites {
        embed = embed.field("Favourites", favourites.to_string(), true);
    }
    if let Some(large) = character.image.and_then(|i| i.large) {
        embed = embed.thumbnail(large);
    }

    msg.channel_id
        .send_message(ctx.cache_http, CreateMessage::new().embed(embed))
        .await?;
    Ok(())
}

async fn studio(ctx: &Context<'_>, msg: &Message, query: &str) -> Result<()> {
    if query.is_empty() {
        msg.reply(ctx.cache_http, "Give me a studio name to search for.")
            .await?;
        return Ok(());
    }

    let typing = msg.channel_id.start_typing(ctx.http);
    let response = gql::<StudioData>(STUDIO_QUERY, serde_json::json!({ "search": query })).await;
    typing.stop();

    let Some(studio) = response?.and_then(|d| d.studio) else {
        return no_results(ctx, msg, query).await;
    };

    let works: Vec<String> = studio
        .media
        .map(|m| m.nodes)
        .unwrap_or_default()
        .iter()
        .map(|work| format!("[{}]({})", work.title.display(), work.site_url))
        .collect();

    let mut embed = CreateEmbed::new()
        .title(studio.name)
        .url(studio.site_url)
        .footer(CreateEmbedFooter::new("Data from AniList"));
    embed = embed.field(
        "Type",
        if studio.is_animation_studio {
            "Animation studio"
        } else {
            "Producer"
        },
        true,
    );
    if let Some(favourites) = studio.favourites {
        embed = embed.field("Favourites", favourites.to_string(), true);
    }
    if !works.is_empty() {
        embed = embed.field("Popular works", works.join("\n"), false);
    }

    msg.channel_id
        .send_message(ctx.cache_http, CreateMessage::new().embed(embed))
        .await?;
    Ok(())
}

async fn schedule(ctx: &Context<'_>, msg: &Message, upcoming: bool) -> Result<()> {
    let sort = if upcoming { "TIME" } else { "TIME_DESC" };

    let typing = msg.channel_id.start_typing(ctx.http);
    let response = gql::<SchedulePageData>(
        SCHEDULE_QUERY,
        serde_json::json!({ "notYetAired": upcoming, "sort": [sort] }),
    )
    .await;
    typing.stop();

    let entries = response?
        .and_then(|d| d.page)
        .map(|p| p.airing_schedules)
        .unwrap_or_default();
    if entries.is_empty() {
        msg.reply(ctx.cache_http, "AniList has no airing data right now.")
            .await?;
        return Ok(());
    }

    let header = if upcoming {
        "Upcoming animes in next **24 to 48 hours**:"
    } else {
        "Recently aired animes in past **24 to 48 hours**:"
    };
    msg.reply(
        ctx.cache_http,
        format!("{}\n\n{}", header, airing_lines(&entries)),
    )
    .await?;
    Ok(())
}

fn airing_lines(entries: &[Airing]) -> String {
    let lines: Vec<String> = entries
        .iter()
        .map(|entry| {
            format!(
                "<t:{}:R> • [{}]({}) (episode {})",
                entry.airing_at,
                entry.media.title.display(),
                entry.media.site_url,
                entry.episode
            )
        })
        .collect();
    lines.join("\n")
}

async fn staff(ctx: &Context<'_>, msg: &Message, query: &str) -> Result<()> {
    if query.is_empty() {
        msg.reply(ctx.cache_http, "Give me a staff name to search for.")
            .await?;
        return Ok(());
    }

    let typing = msg.channel_id.start_typing(ctx.http);
    let response = gql::<StaffData>(STAFF_QUERY, serde_json::json!({ "search": query })).await;
    typing.stop();

    let Some(staff) = response?.and_then(|d| d.staff) else {
        return no_results(ctx, msg, query).await;
    };

    let max_chars = ctx.cfg.read().await.anilist.max_description_chars;
    let description = staff
        .description
        .map(|d| clean_description(&d, max_chars))
        .unwrap_or_default();

    let mut embed = CreateEmbed::new()
        .title(staff.name.display())
        .url(staff.site_url)
        .description(description)
        .footer(CreateEmbedFooter::new("Data from AniList"));
    if let Some(language) = staff.language {
        embed = embed.field("Language", language, true);
    }
    if let Some(occupations) = staff.occupations.filter(|o| !o.is_empty()) {
        embed = embed.field("Occupations", occupations.join(", "), true);
    }
    if let Some(large) = staff.image.and_then(|i| i.large) {
        embed = embed.thumbnail(large);
    }

    msg.channel_id
        .send_message(ctx.cache_http, CreateMessage::new().embed(embed))
        .await?;
    Ok(())
}

async fn ani_user(ctx: &Context<'_>, msg: &Message, query: &str) -> Result<()> {
    let username = query.trim();
    if username.is_empty() {
        msg.reply(ctx.cache_http, "Give me an AniList username to look up.")
            .await?;
        return Ok(());
    }

    let typing = msg.channel_id.start_typing(ctx.http);
    let response = gql::<UserData>(USER_QUERY, serde_json::json!({ "search": username })).await;
    typing.stop();

    let Some(user) = response?.and_then(|d| d.user) else {
        return no_results(ctx, msg, username).await;
    };

    let max_chars = ctx.cfg.read().await.anilist.max_description_chars;
    let about = user
        .about
        .map(|a| clean_description(&a, max_chars))
        .unwrap_or_default();

    let mut embed = CreateEmbed::new()
        .title(user.name)
        .url(user.site_url)
        .description(about)
        .footer(CreateEmbedFooter::new("Data from AniList"));
    if let Some(stats) = user.statistics {
        if let Some(anime) = stats.anime {
            embed = embed.field(
                "Anime",
                format!("{} entries, mean score {}", anime.count, anime.mean_score),
                true,
            );
        }
        if let Some(manga) = stats.manga {
            embed = embed.field(
                "Manga",
                format!("{} entries, mean score {}", manga.count, manga.mean_score),
                true,
            );
        }
    }
    if let Some(large) = user.avatar.and_then(|a| a.large) {
        embed = embed.thumbnail(large);
    }

    msg.channel_id
        .send_message(ctx.cache_http, CreateMessage::new().embed(embed))
        .await?;
    Ok(())
}

fn media_type_arg(word: &str) -> Option<&'static str> {
    match word.trim().to_ascii_lowercase().as_str() {
        "anime" => Some("ANIME"),
        "manga" => Some("MANGA"),
        _ => None,
    }
}

fn known_genre(genre_or_tag: &str) -> bool {
    GENRES.iter().any(|g| g.eq_ignore_ascii_case(genre_or_tag))
}

/// AniList descriptions carry light HTML markup; flatten it and cap the length.
fn clean_description(description: &str, max_chars: usize) -> String {
    let flat = description
        .replace("<br>", "\n")
        .replace("<br/>", "\n")
        .replace("<br />", "\n")
        .replace("<i>", "*")
        .replace("</i>", "*")
        .replace("<b>", "**")
        .replace("</b>", "**");
    let flat = flat.trim();

    if flat.chars().count() <= max_chars {
        return flat.to_string();
    }
    let truncated: String = flat.chars().take(max_chars).collect();
    format!("{}…", truncated.trim_end())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn description_markup_is_flattened() {
        assert_eq!(
            clean_description("An <i>epic</i> tale.<br>Truly.", 100),
            "An *epic* tale.\nTruly."
        );
    }

    #[test]
    fn description_is_truncated_on_char_boundary() {
        let cleaned = clean_description("díacrítics and more text here", 10);
        assert_eq!(cleaned, "díacrítics…");
    }

    #[test]
    fn genre_matching_is_case_insensitive() {
        assert!(known_genre("romance"));
        assert!(known_genre("Slice of Life"));
        assert!(!known_genre("isekai"));
    }

    #[test]
    fn media_type_words() {
        assert_eq!(media_type_arg("Anime"), Some("ANIME"));
        assert_eq!(media_type_arg("manga "), Some("MANGA"));
        assert_eq!(media_type_arg("movie"), None);
    }

    #[test]
    fn airing_lines_use_relative_timestamps() {
        let entries: Vec<Airing> = serde_json::from_value(serde_json::json!([
            {
                "airingAt": 1700000000,
                "episode": 7,
                "media": { "title": { "romaji": "Some Show", "english": null }, "siteUrl": "https://anilist.co/anime/1" }
            }
        ]))
        .unwrap();
        assert_eq!(
            airing_lines(&entries),
            "<t:1700000000:R> • [Some Show](https://anilist.co/anime/1) (episode 7)"
        );
    }
}
