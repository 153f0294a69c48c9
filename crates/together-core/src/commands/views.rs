use std::time::Duration;

use chrono::Utc;

use crate::config::{Config, Partner};
use crate::display::{
    self, Ticker, birthday_countdown, format_clock_date, format_clock_time, hour_gap,
    mock_weather,
};
use crate::model::Collection;
use crate::render::Renderer;
use crate::store::SyncStore;

pub fn cmd_sync(store: &mut SyncStore, renderer: &mut Renderer) -> anyhow::Result<()> {
    store.load_all();

    let counts = [
        (Collection::Notes, store.state.notes.len()),
        (Collection::Movies, store.state.movies.len()),
        (Collection::Favorites, store.state.favorites.len()),
        (Collection::BucketList, store.state.bucket_list.len()),
        (Collection::Moods, store.state.moods.len()),
        (Collection::Photos, store.state.photos.len()),
        (Collection::Birthdays, store.state.birthdays.len()),
    ];
    let rows = counts
        .into_iter()
        .map(|(collection, count)| vec![collection.table().to_string(), count.to_string()])
        .collect();
    renderer.print_rows(vec!["Collection".to_string(), "Records".to_string()], rows)
}

pub fn cmd_home(
    store: &mut SyncStore,
    cfg: &Config,
    renderer: &mut Renderer,
) -> anyhow::Result<()> {
    store.load_all();

    let now = Utc::now();
    let partners = cfg.partners();

    let headers = vec![
        "Partner".to_string(),
        "Location".to_string(),
        "Local time".to_string(),
        "Date".to_string(),
        "Weather".to_string(),
        "Mood".to_string(),
        "Birthday in".to_string(),
    ];
    let rows = partners
        .iter()
        .map(|partner| {
            let tz = display::partner_timezone(&partner.timezone);
            let today = now.with_timezone(&tz).date_naive();

            let mood = store
                .mood_for(&partner.name)
                .map(|mood| format!("{} {}", mood.mood_emoji, mood.mood_text))
                .unwrap_or_else(|| "-".to_string());
            let birthday = store
                .birthday_for(&partner.name)
                .map(|birthday| {
                    let countdown = birthday_countdown(birthday.birth_date, now, tz);
                    format!(
                        "{}d {}h {}m",
                        countdown.days, countdown.hours, countdown.minutes
                    )
                })
                .unwrap_or_else(|| "-".to_string());

            vec![
                partner.name.clone(),
                partner.location.clone(),
                format_clock_time(now, tz),
                format_clock_date(now, tz),
                mock_weather(today, &partner.location).to_string(),
                mood,
                birthday,
            ]
        })
        .collect();
    renderer.print_rows(headers, rows)?;

    if let [a, b] = partners.as_slice() {
        let gap = hour_gap(
            now,
            display::partner_timezone(&a.timezone),
            display::partner_timezone(&b.timezone),
        );
        println!();
        println!("{gap} hours apart");
    }

    for partner in &partners {
        let tz = display::partner_timezone(&partner.timezone);
        let today = now.with_timezone(&tz).date_naive();
        if let Some(photo) = store.photo_for(&partner.name, today) {
            if photo.caption.is_empty() {
                println!("{}'s photo of the day: {}", partner.name, photo.photo_url);
            } else {
                println!(
                    "{}'s photo of the day: {} ({})",
                    partner.name, photo.photo_url, photo.caption
                );
            }
        }
    }

    println!();
    println!("Today's connection prompt: {}", display::random_prompt());
    Ok(())
}

pub fn cmd_notes(store: &mut SyncStore, renderer: &mut Renderer) -> anyhow::Result<()> {
    store.load_all();
    if store.state.notes.is_empty() {
        println!("no notes yet; start sharing your thoughts");
        return Ok(());
    }
    renderer.print_notes(&store.state.notes)
}

pub fn cmd_movies(store: &mut SyncStore, renderer: &mut Renderer) -> anyhow::Result<()> {
    store.load_all();
    if store.state.movies.is_empty() {
        println!("the movie list is empty");
        return Ok(());
    }
    renderer.print_movies(&store.state.movies)
}

pub fn cmd_favorites(store: &mut SyncStore, renderer: &mut Renderer) -> anyhow::Result<()> {
    store.load_all();
    if store.state.favorites.is_empty() {
        println!("no favorites saved yet");
        return Ok(());
    }
    renderer.print_favorites(&store.state.favorites)
}

pub fn cmd_bucket_list(store: &mut SyncStore, renderer: &mut Renderer) -> anyhow::Result<()> {
    store.load_all();
    if store.state.bucket_list.is_empty() {
        println!("no dreams added yet");
        return Ok(());
    }
    renderer.print_bucket_list(&store.state.bucket_list)
}

pub fn cmd_moods(store: &mut SyncStore, renderer: &mut Renderer) -> anyhow::Result<()> {
    store.load_all();
    if store.state.moods.is_empty() {
        println!("no moods shared yet");
        return Ok(());
    }
    renderer.print_moods(&store.state.moods)
}

pub fn cmd_photos(store: &mut SyncStore, renderer: &mut Renderer) -> anyhow::Result<()> {
    store.load_all();
    if store.state.photos.is_empty() {
        println!("no photos shared yet");
        return Ok(());
    }
    renderer.print_photos(&store.state.photos)
}

pub fn cmd_birthdays(
    store: &mut SyncStore,
    cfg: &Config,
    renderer: &mut Renderer,
) -> anyhow::Result<()> {
    store.load_all();
    if store.state.birthdays.is_empty() {
        println!("no birthdays saved yet");
        return Ok(());
    }

    let now = Utc::now();
    let headers = vec![
        "Partner".to_string(),
        "Birth date".to_string(),
        "Next in".to_string(),
    ];
    let rows = store
        .state
        .birthdays
        .iter()
        .map(|birthday| {
            let tz = zone_for(cfg, &birthday.user_name);
            let countdown = birthday_countdown(birthday.birth_date, now, tz);
            vec![
                birthday.user_name.clone(),
                birthday.birth_date.format("%Y-%m-%d").to_string(),
                format!(
                    "{}d {}h {}m",
                    countdown.days, countdown.hours, countdown.minutes
                ),
            ]
        })
        .collect();
    renderer.print_rows(headers, rows)
}

pub fn cmd_countdown(store: &mut SyncStore, cfg: &Config) -> anyhow::Result<()> {
    store.load_all();
    if store.state.birthdays.is_empty() {
        println!("no birthdays saved yet; run: together birthday <YYYY-MM-DD>");
        return Ok(());
    }

    let now = Utc::now();
    for birthday in &store.state.birthdays {
        let tz = zone_for(cfg, &birthday.user_name);
        let countdown = birthday_countdown(birthday.birth_date, now, tz);
        println!(
            "{}'s birthday in {} days, {} hours, {} minutes",
            birthday.user_name, countdown.days, countdown.hours, countdown.minutes
        );
    }
    Ok(())
}

pub fn cmd_clocks(cfg: &Config, renderer: &mut Renderer, args: &[String]) -> anyhow::Result<()> {
    let partners = cfg.partners();
    let watch = args.iter().any(|arg| arg == "--watch");

    print_clock_rows(&partners, renderer)?;
    if !watch {
        return Ok(());
    }

    // redraw every second until interrupted; dropping the ticker on the way
    // out stops its thread
    let ticker = Ticker::start(Duration::from_secs(1));
    while ticker.wait() {
        let now = Utc::now();
        let line = partners
            .iter()
            .map(|partner| {
                let tz = display::partner_timezone(&partner.timezone);
                format!("{}: {}", partner.name, format_clock_time(now, tz))
            })
            .collect::<Vec<_>>()
            .join("   ");
        println!("{line}");
    }
    Ok(())
}

fn print_clock_rows(partners: &[Partner], renderer: &mut Renderer) -> anyhow::Result<()> {
    let now = Utc::now();
    let headers = vec![
        "Partner".to_string(),
        "Location".to_string(),
        "Local time".to_string(),
        "Date".to_string(),
    ];
    let rows = partners
        .iter()
        .map(|partner| {
            let tz = display::partner_timezone(&partner.timezone);
            vec![
                partner.name.clone(),
                partner.location.clone(),
                format_clock_time(now, tz),
                format_clock_date(now, tz),
            ]
        })
        .collect();
    renderer.print_rows(headers, rows)
}

fn zone_for(cfg: &Config, user_name: &str) -> chrono_tz::Tz {
    cfg.partner_named(user_name)
        .map(|partner| display::partner_timezone(&partner.timezone))
        .unwrap_or_else(|| *display::home_timezone())
}
