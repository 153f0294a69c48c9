use std::io::{self, IsTerminal, Write};

use anyhow::anyhow;
use chrono::Local;
use unicode_width::UnicodeWidthStr;

use crate::config::Config;
use crate::model::{BucketListItem, DailyPhoto, Favorite, Movie, Note, UserMood};
use crate::notify::{Level, Notice};

#[derive(Debug, Clone)]
pub struct Renderer {
    color: bool,
}

impl Renderer {
    pub fn new(cfg: &Config) -> anyhow::Result<Self> {
        let color_cfg = cfg.get("color").unwrap_or_else(|| "on".to_string());
        let color = match color_cfg.to_ascii_lowercase().as_str() {
            "on" | "yes" | "true" | "1" => true,
            "off" | "no" | "false" | "0" => false,
            other => return Err(anyhow!("invalid color setting: {other}")),
        };

        Ok(Self { color })
    }

    #[tracing::instrument(skip(self, notes))]
    pub fn print_notes(&mut self, notes: &[Note]) -> anyhow::Result<()> {
        let headers = vec![
            "When".to_string(),
            "From".to_string(),
            "Message".to_string(),
        ];
        let rows = notes
            .iter()
            .map(|note| {
                vec![
                    local_stamp(note.created_at),
                    self.paint(&note.from_user, "36"),
                    note.message.clone(),
                ]
            })
            .collect();
        self.table(headers, rows)
    }

    #[tracing::instrument(skip(self, movies))]
    pub fn print_movies(&mut self, movies: &[Movie]) -> anyhow::Result<()> {
        let headers = vec![
            "When".to_string(),
            "Title".to_string(),
            "Added by".to_string(),
        ];
        let rows = movies
            .iter()
            .map(|movie| {
                vec![
                    local_stamp(movie.created_at),
                    movie.title.clone(),
                    movie.added_by.clone(),
                ]
            })
            .collect();
        self.table(headers, rows)
    }

    #[tracing::instrument(skip(self, favorites))]
    pub fn print_favorites(&mut self, favorites: &[Favorite]) -> anyhow::Result<()> {
        let headers = vec![
            "Emoji".to_string(),
            "Name".to_string(),
            "Kind".to_string(),
            "Person".to_string(),
            "Id".to_string(),
        ];
        let rows = favorites
            .iter()
            .map(|favorite| {
                vec![
                    favorite.emoji.clone(),
                    favorite.name.clone(),
                    favorite.kind.clone(),
                    favorite.person.clone(),
                    self.paint(&favorite.id.to_string(), "33"),
                ]
            })
            .collect();
        self.table(headers, rows)
    }

    #[tracing::instrument(skip(self, items))]
    pub fn print_bucket_list(&mut self, items: &[BucketListItem]) -> anyhow::Result<()> {
        let headers = vec!["Dream".to_string(), "Added".to_string(), "Id".to_string()];
        let rows = items
            .iter()
            .map(|entry| {
                vec![
                    entry.item.clone(),
                    local_stamp(entry.created_at),
                    self.paint(&entry.id.to_string(), "33"),
                ]
            })
            .collect();
        self.table(headers, rows)
    }

    #[tracing::instrument(skip(self, moods))]
    pub fn print_moods(&mut self, moods: &[UserMood]) -> anyhow::Result<()> {
        let headers = vec![
            "Partner".to_string(),
            "Mood".to_string(),
            "Note".to_string(),
            "Updated".to_string(),
        ];
        let rows = moods
            .iter()
            .map(|mood| {
                vec![
                    self.paint(&mood.user_name, "36"),
                    mood.mood_emoji.clone(),
                    mood.mood_text.clone(),
                    local_stamp(mood.updated_at),
                ]
            })
            .collect();
        self.table(headers, rows)
    }

    #[tracing::instrument(skip(self, photos))]
    pub fn print_photos(&mut self, photos: &[DailyPhoto]) -> anyhow::Result<()> {
        let headers = vec![
            "Date".to_string(),
            "Partner".to_string(),
            "Caption".to_string(),
            "Url".to_string(),
        ];
        let rows = photos
            .iter()
            .map(|photo| {
                vec![
                    photo.photo_date.format("%Y-%m-%d").to_string(),
                    photo.user_name.clone(),
                    photo.caption.clone(),
                    photo.photo_url.clone(),
                ]
            })
            .collect();
        self.table(headers, rows)
    }

    /// Free-form aligned table for the dashboard views.
    #[tracing::instrument(skip(self, headers, rows))]
    pub fn print_rows(
        &mut self,
        headers: Vec<String>,
        rows: Vec<Vec<String>>,
    ) -> anyhow::Result<()> {
        self.table(headers, rows)
    }

    #[tracing::instrument(skip(self, notices))]
    pub fn print_notices(&mut self, notices: &[Notice]) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();
        for notice in notices {
            let line = match notice.level {
                Level::Success => self.paint(&format!("✓ {}", notice.message), "32"),
                Level::Error => self.paint(&format!("✗ {}", notice.message), "31"),
            };
            writeln!(out, "{line}")?;
        }
        Ok(())
    }

    fn table(&mut self, headers: Vec<String>, rows: Vec<Vec<String>>) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();
        write_table(&mut out, headers, rows)
    }

    fn paint(&self, text: &str, code: &str) -> String {
        if !self.color || !io::stdout().is_terminal() {
            return text.to_string();
        }
        format!("\x1b[{code}m{text}\x1b[0m")
    }
}

fn local_stamp(instant: chrono::DateTime<chrono::Utc>) -> String {
    instant
        .with_timezone(&Local)
        .format("%Y-%m-%d %H:%M")
        .to_string()
}

fn write_table<W: Write>(
    mut writer: W,
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
) -> anyhow::Result<()> {
    let column_count = headers.len();
    let mut widths = vec![0usize; column_count];

    for (idx, header) in headers.iter().enumerate() {
        widths[idx] = widths[idx].max(UnicodeWidthStr::width(header.as_str()));
    }

    for row in &rows {
        for (idx, cell) in row.iter().enumerate() {
            widths[idx] = widths[idx].max(UnicodeWidthStr::width(strip_ansi(cell).as_str()));
        }
    }

    for idx in 0..column_count {
        write!(writer, "{:width$} ", headers[idx], width = widths[idx])?;
    }
    writeln!(writer)?;

    for idx in 0..column_count {
        write!(writer, "{:-<width$} ", "", width = widths[idx])?;
    }
    writeln!(writer)?;

    for row in rows {
        for idx in 0..column_count {
            let cell = &row[idx];
            let visible_width = UnicodeWidthStr::width(strip_ansi(cell).as_str());
            let padding = widths[idx].saturating_sub(visible_width);
            write!(writer, "{}{} ", cell, " ".repeat(padding))?;
        }
        writeln!(writer)?;
    }

    Ok(())
}

fn strip_ansi(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut escaped = false;

    for ch in s.chars() {
        if escaped {
            if ch == 'm' {
                escaped = false;
            }
            continue;
        }

        if ch == '\x1b' {
            escaped = true;
            continue;
        }

        out.push(ch);
    }

    out
}
