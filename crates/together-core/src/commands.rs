use anyhow::{anyhow, bail};
use tracing::{debug, instrument};

use crate::cli::Invocation;
use crate::config::Config;
use crate::render::Renderer;
use crate::session::SessionFile;
use crate::store::SyncStore;

mod collection_ops;
mod session_ops;
mod views;

pub fn known_command_names() -> Vec<&'static str> {
    vec![
        "login",
        "logout",
        "whoami",
        "home",
        "sync",
        "note",
        "notes",
        "movie",
        "movies",
        "favorite",
        "favorites",
        "bucket",
        "mood",
        "moods",
        "photo",
        "photos",
        "birthday",
        "birthdays",
        "countdown",
        "prompt",
        "clocks",
        "_show",
        "help",
        "version",
    ]
}

pub fn expand_command_abbrev<'a>(token: &'a str, known: &[&'a str]) -> Option<&'a str> {
    if known.contains(&token) {
        return Some(token);
    }

    let mut matches = known.iter().copied().filter(|name| name.starts_with(token));
    let first = matches.next()?;
    if matches.next().is_some() {
        None
    } else {
        Some(first)
    }
}

#[instrument(skip(store, cfg, session, renderer, inv))]
pub fn dispatch(
    store: &mut SyncStore,
    cfg: &Config,
    session: &SessionFile,
    renderer: &mut Renderer,
    inv: Invocation,
) -> anyhow::Result<()> {
    let command = inv.command.as_str();
    debug!(command, args = ?inv.args, "dispatching command");

    // login, logout and the introspection commands run without a session;
    // everything else sits behind the guard
    match command {
        "login" => return session_ops::cmd_login(session, cfg, &inv.args),
        "logout" => return session_ops::cmd_logout(session),
        "help" => return cmd_help(),
        "version" => {
            println!("{}", env!("CARGO_PKG_VERSION"));
            return Ok(());
        }
        "_show" => return cmd_show(cfg),
        _ => {}
    }

    let Some(user) = session.current()? else {
        bail!("not signed in; run: together login <name> <secret>");
    };

    match command {
        "whoami" => {
            println!("{user}");
            Ok(())
        }
        "home" => views::cmd_home(store, cfg, renderer),
        "sync" => views::cmd_sync(store, renderer),
        "notes" => views::cmd_notes(store, renderer),
        "movies" => views::cmd_movies(store, renderer),
        "favorites" => views::cmd_favorites(store, renderer),
        "moods" => views::cmd_moods(store, renderer),
        "photos" => views::cmd_photos(store, renderer),
        "birthdays" => views::cmd_birthdays(store, cfg, renderer),
        "countdown" => views::cmd_countdown(store, cfg),
        "clocks" => views::cmd_clocks(cfg, renderer, &inv.args),
        "prompt" => {
            println!("{}", crate::display::random_prompt());
            Ok(())
        }
        "note" => collection_ops::cmd_note(store, renderer, &user, &inv.args),
        "movie" => collection_ops::cmd_movie(store, renderer, &user, &inv.args),
        "favorite" => collection_ops::cmd_favorite(store, renderer, &user, &inv.args),
        "bucket" => collection_ops::cmd_bucket(store, renderer, &inv.args),
        "mood" => collection_ops::cmd_mood(store, renderer, &user, &inv.args),
        "photo" => collection_ops::cmd_photo(store, cfg, renderer, &user, &inv.args),
        "birthday" => collection_ops::cmd_birthday(store, renderer, &user, &inv.args),
        other => Err(anyhow!("unknown command: {other}")),
    }
}

fn cmd_help() -> anyhow::Result<()> {
    println!("together <command> [args]");
    println!();
    println!("  login <name> <secret>    sign in as one of the two partners");
    println!("  logout                   sign out");
    println!("  whoami                   print the signed-in partner");
    println!("  home                     dashboard: clocks, moods, countdowns, prompt");
    println!("  sync                     refresh every collection and show counts");
    println!("  note <message>           send a note; notes lists them");
    println!("  movie <title>            add to the movie list; movies lists it");
    println!("  favorite add <kind> <name> <emoji> [person]");
    println!("  favorite remove <id>     favorites lists them");
    println!("  bucket [add <item> | remove <id>]");
    println!("  mood <emoji> [text]      share how you feel; moods shows both");
    println!("  photo <url> [caption]    today's photo; photos lists them");
    println!("  birthday <YYYY-MM-DD> [person]");
    println!("  countdown                days/hours/minutes to each birthday");
    println!("  clocks [--watch]         both partners' local time");
    println!("  prompt                   a random connection prompt");
    Ok(())
}

fn cmd_show(cfg: &Config) -> anyhow::Result<()> {
    let mut entries: Vec<(String, String)> = cfg
        .iter()
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();
    entries.sort();
    for (key, value) in entries {
        println!("{key}={value}");
    }
    Ok(())
}
