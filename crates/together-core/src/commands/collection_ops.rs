use anyhow::{Context, bail};
use chrono::{NaiveDate, Utc};
use uuid::Uuid;

use crate::config::Config;
use crate::display;
use crate::render::Renderer;
use crate::store::SyncStore;

use super::views;

pub fn cmd_note(
    store: &mut SyncStore,
    renderer: &mut Renderer,
    user: &str,
    args: &[String],
) -> anyhow::Result<()> {
    if args.is_empty() {
        bail!("usage: together note <message>");
    }

    store.load_all();
    let outcome = store.add_note(user, &args.join(" ")).map(drop);
    finish(store, renderer, outcome)
}

pub fn cmd_movie(
    store: &mut SyncStore,
    renderer: &mut Renderer,
    user: &str,
    args: &[String],
) -> anyhow::Result<()> {
    if args.is_empty() {
        bail!("usage: together movie <title>");
    }

    store.load_all();
    let outcome = store.add_movie(&args.join(" "), user).map(drop);
    finish(store, renderer, outcome)
}

pub fn cmd_favorite(
    store: &mut SyncStore,
    renderer: &mut Renderer,
    user: &str,
    args: &[String],
) -> anyhow::Result<()> {
    match args.first().map(String::as_str) {
        None => views::cmd_favorites(store, renderer),
        Some("add") => {
            let rest = &args[1..];
            let (kind, name, emoji, person) = match rest {
                [kind, name, emoji] => (kind, name, emoji, user),
                [kind, name, emoji, person] => (kind, name, emoji, person.as_str()),
                _ => bail!("usage: together favorite add <kind> <name> <emoji> [person]"),
            };

            store.load_all();
            let outcome = store.add_favorite(kind, name, person, emoji).map(drop);
            finish(store, renderer, outcome)
        }
        Some("remove") => {
            let [_, raw_id] = args else {
                bail!("usage: together favorite remove <id>");
            };
            let id = parse_id(raw_id)?;

            store.load_all();
            let outcome = store.remove_favorite(id);
            finish(store, renderer, outcome)
        }
        Some(other) => bail!("unknown favorite subcommand: {other}"),
    }
}

pub fn cmd_bucket(
    store: &mut SyncStore,
    renderer: &mut Renderer,
    args: &[String],
) -> anyhow::Result<()> {
    match args.first().map(String::as_str) {
        None => views::cmd_bucket_list(store, renderer),
        Some("add") => {
            if args.len() < 2 {
                bail!("usage: together bucket add <item>");
            }

            store.load_all();
            let outcome = store.add_bucket_item(&args[1..].join(" ")).map(drop);
            finish(store, renderer, outcome)
        }
        Some("remove") => {
            let [_, raw_id] = args else {
                bail!("usage: together bucket remove <id>");
            };
            let id = parse_id(raw_id)?;

            store.load_all();
            let outcome = store.remove_bucket_item(id);
            finish(store, renderer, outcome)
        }
        Some(other) => bail!("unknown bucket subcommand: {other}"),
    }
}

pub fn cmd_mood(
    store: &mut SyncStore,
    renderer: &mut Renderer,
    user: &str,
    args: &[String],
) -> anyhow::Result<()> {
    let Some((emoji, text)) = args.split_first() else {
        bail!("usage: together mood <emoji> [text]");
    };

    store.load_all();
    let outcome = store.set_mood(user, emoji, &text.join(" ")).map(drop);
    finish(store, renderer, outcome)
}

pub fn cmd_photo(
    store: &mut SyncStore,
    cfg: &Config,
    renderer: &mut Renderer,
    user: &str,
    args: &[String],
) -> anyhow::Result<()> {
    let Some((url, caption)) = args.split_first() else {
        bail!("usage: together photo <url> [caption]");
    };

    // "today" is the sender's day, so the home view finds the photo again
    // under the same zone
    let tz = cfg
        .partner_named(user)
        .map(|partner| display::partner_timezone(&partner.timezone))
        .unwrap_or_else(|| *display::home_timezone());
    let today = Utc::now().with_timezone(&tz).date_naive();

    store.load_all();
    let outcome = store
        .set_daily_photo(user, url, &caption.join(" "), today)
        .map(drop);
    finish(store, renderer, outcome)
}

pub fn cmd_birthday(
    store: &mut SyncStore,
    renderer: &mut Renderer,
    user: &str,
    args: &[String],
) -> anyhow::Result<()> {
    let (raw_date, person) = match args {
        [raw_date] => (raw_date, user),
        [raw_date, person] => (raw_date, person.as_str()),
        _ => bail!("usage: together birthday <YYYY-MM-DD> [person]"),
    };

    let birth_date = NaiveDate::parse_from_str(raw_date, "%Y-%m-%d")
        .with_context(|| format!("invalid date (expected YYYY-MM-DD): {raw_date}"))?;

    store.load_all();
    let outcome = store.set_birthday(person, birth_date).map(drop);
    finish(store, renderer, outcome)
}

fn parse_id(raw: &str) -> anyhow::Result<Uuid> {
    raw.parse()
        .with_context(|| format!("invalid record id: {raw}"))
}

/// Prints the notices a mutation raised. A failure that produced no notice
/// was rejected before the remote call, so it surfaces as a plain error; a
/// remote failure was already toasted and the command still succeeds.
fn finish(
    store: &mut SyncStore,
    renderer: &mut Renderer,
    outcome: anyhow::Result<()>,
) -> anyhow::Result<()> {
    let notices = store.notices.drain();
    renderer.print_notices(&notices)?;

    match outcome {
        Err(err) if notices.is_empty() => Err(err),
        _ => Ok(()),
    }
}
