use chrono::{NaiveDate, Utc};
use serde_json::json;
use tempfile::tempdir;
use together_core::collections::MemoryCollections;
use together_core::model::Collection;
use together_core::session::{PartnerPairs, SessionFile};
use together_core::store::SyncStore;
use uuid::Uuid;

fn partners() -> Vec<String> {
    vec!["Imran".to_string(), "Ajsa".to_string()]
}

fn seeded_client() -> MemoryCollections {
    let client = MemoryCollections::new();
    client.seed(
        Collection::Notes,
        vec![
            json!({
                "id": Uuid::new_v4(),
                "from_user": "Imran",
                "message": "good morning",
                "created_at": "2026-08-06T07:00:00Z",
                "updated_at": "2026-08-06T07:00:00Z",
            }),
            json!({
                "id": Uuid::new_v4(),
                "from_user": "Ajsa",
                "message": "good night",
                "created_at": "2026-08-07T04:30:00Z",
                "updated_at": "2026-08-07T04:30:00Z",
            }),
        ],
    );
    client.seed(
        Collection::Movies,
        vec![json!({
            "id": Uuid::new_v4(),
            "title": "Before Sunrise",
            "added_by": "Ajsa",
            "created_at": "2026-08-01T20:00:00Z",
        })],
    );
    client
}

#[test]
fn load_mirrors_sources_and_inserts_stay_isolated() {
    let mut store = SyncStore::new(Box::new(seeded_client()), partners());
    store.load_all();

    // populated collections mirror the source, newest first
    assert_eq!(store.state.notes.len(), 2);
    assert_eq!(store.state.notes[0].message, "good night");
    assert_eq!(store.state.movies.len(), 1);

    // untouched collections are genuinely empty
    assert!(store.state.favorites.is_empty());
    assert!(store.state.bucket_list.is_empty());
    assert!(store.state.moods.is_empty());

    // a single insert touches exactly one slice
    store
        .add_bucket_item("see the northern lights")
        .expect("add bucket item");
    assert_eq!(store.state.bucket_list.len(), 1);
    assert_eq!(store.state.notes.len(), 2);
    assert_eq!(store.state.movies.len(), 1);
    assert!(store.state.favorites.is_empty());

    // and the head of the mutated slice is the confirmed record
    assert_eq!(store.state.bucket_list[0].item, "see the northern lights");
    assert!(!store.notices.is_empty());
}

#[test]
fn daily_photo_upsert_is_keyed_on_user_and_date() {
    let mut store = SyncStore::new(Box::new(MemoryCollections::new()), partners());
    let monday = NaiveDate::from_ymd_opt(2026, 8, 3).expect("valid date");
    let tuesday = NaiveDate::from_ymd_opt(2026, 8, 4).expect("valid date");

    store
        .set_daily_photo("Imran", "https://photos.example/one.jpg", "sunrise", monday)
        .expect("set photo");
    store
        .set_daily_photo("Imran", "https://photos.example/two.jpg", "better sunrise", monday)
        .expect("replace photo");
    store
        .set_daily_photo("Imran", "https://photos.example/three.jpg", "", tuesday)
        .expect("next day photo");
    store
        .set_daily_photo("Ajsa", "https://photos.example/four.jpg", "", monday)
        .expect("other partner photo");

    assert_eq!(store.state.photos.len(), 3);
    let replaced = store
        .photo_for("Imran", monday)
        .expect("photo for monday");
    assert_eq!(replaced.photo_url, "https://photos.example/two.jpg");

    store.load_all();
    assert_eq!(store.state.photos.len(), 3, "remote agrees after reload");
}

#[test]
fn birthday_roundtrip_feeds_the_countdown() {
    let mut store = SyncStore::new(Box::new(MemoryCollections::new()), partners());
    let birth = NaiveDate::from_ymd_opt(1998, 12, 24).expect("valid date");

    store.set_birthday("Ajsa", birth).expect("set birthday");
    store.set_birthday("Ajsa", birth).expect("idempotent upsert");
    assert_eq!(store.state.birthdays.len(), 1);

    let saved = store.birthday_for("Ajsa").expect("birthday saved");
    let countdown =
        together_core::display::birthday_countdown(saved.birth_date, Utc::now(), chrono_tz::UTC);
    assert!(countdown.days <= 366);
    assert!((0..24).contains(&countdown.hours));
    assert!((0..60).contains(&countdown.minutes));
}

#[test]
fn session_survives_reopen_and_logout_clears() {
    let temp = tempdir().expect("tempdir");
    let check = PartnerPairs::new(&[]);

    // empty pair set refuses everyone
    let session = SessionFile::open(temp.path(), partners());
    assert!(
        !session
            .authenticate(&check, "Imran", "Imran")
            .expect("authenticate")
    );

    let check = PartnerPairs::new(
        &[("Imran", "Imran"), ("Ajsa", "Ajsa")]
            .map(|(name, secret)| together_core::config::Partner {
                name: name.to_string(),
                secret: secret.to_string(),
                timezone: "Europe/London".to_string(),
                location: "Manchester".to_string(),
            }),
    );
    assert!(
        session
            .authenticate(&check, "Ajsa", "Ajsa")
            .expect("authenticate")
    );

    // a fresh handle on the same data dir still sees the identity
    let reopened = SessionFile::open(temp.path(), partners());
    assert_eq!(
        reopened.current().expect("current"),
        Some("Ajsa".to_string())
    );

    reopened.logout().expect("logout");
    assert_eq!(session.current().expect("current"), None);
}
