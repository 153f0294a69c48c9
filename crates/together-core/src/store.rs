use std::thread;

use anyhow::{anyhow, bail};
use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tracing::{debug, error, instrument};
use uuid::Uuid;

use crate::collections::Collections;
use crate::model::{
    Birthday, BucketListItem, Collection, DailyPhoto, Favorite, Movie, Note, UserMood,
};
use crate::notify::Notices;

/// Local mirror of the remote collections. One slice per collection; each
/// slice only ever holds what the store last confirmed.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct AppState {
    pub notes: Vec<Note>,
    pub movies: Vec<Movie>,
    pub favorites: Vec<Favorite>,
    pub bucket_list: Vec<BucketListItem>,
    pub moods: Vec<UserMood>,
    pub photos: Vec<DailyPhoto>,
    pub birthdays: Vec<Birthday>,
}

/// Keeps `AppState` consistent with the remote collections. Strictly
/// confirm-then-update: no mutation touches local state until the client
/// returned the canonical record, so local state is never ahead of the last
/// confirmed response.
pub struct SyncStore {
    client: Box<dyn Collections>,
    partners: Vec<String>,
    pub state: AppState,
    pub notices: Notices,
}

impl SyncStore {
    pub fn new(client: Box<dyn Collections>, partners: Vec<String>) -> Self {
        Self {
            client,
            partners,
            state: AppState::default(),
            notices: Notices::default(),
        }
    }

    /// Fetches every collection, one concurrent request each. A failing
    /// fetch is logged and leaves that slice at its previous value; the
    /// other slices still refresh.
    #[instrument(skip(self))]
    pub fn load_all(&mut self) {
        let client = &*self.client;
        let results: Vec<(Collection, anyhow::Result<Vec<Value>>)> = thread::scope(|scope| {
            let handles: Vec<_> = Collection::ALL
                .into_iter()
                .map(|collection| (collection, scope.spawn(move || client.select(collection))))
                .collect();

            handles
                .into_iter()
                .map(|(collection, handle)| {
                    let result = handle
                        .join()
                        .unwrap_or_else(|_| Err(anyhow!("fetch thread panicked")));
                    (collection, result)
                })
                .collect()
        });

        for (collection, result) in results {
            match result {
                Ok(rows) => self.apply_rows(collection, rows),
                Err(err) => {
                    let chain = format!("{err:#}");
                    error!(
                        collection = %collection,
                        error = %chain,
                        "fetch failed; keeping cached slice"
                    );
                }
            }
        }
    }

    fn apply_rows(&mut self, collection: Collection, rows: Vec<Value>) {
        let count = rows.len();
        let payload = Value::Array(rows);
        let outcome = match collection {
            Collection::Notes => serde_json::from_value(payload).map(|v| self.state.notes = v),
            Collection::Movies => serde_json::from_value(payload).map(|v| self.state.movies = v),
            Collection::Favorites => {
                serde_json::from_value(payload).map(|v| self.state.favorites = v)
            }
            Collection::BucketList => {
                serde_json::from_value(payload).map(|v| self.state.bucket_list = v)
            }
            Collection::Moods => serde_json::from_value(payload).map(|v| self.state.moods = v),
            Collection::Photos => serde_json::from_value(payload).map(|v| self.state.photos = v),
            Collection::Birthdays => {
                serde_json::from_value(payload).map(|v| self.state.birthdays = v)
            }
        };

        match outcome {
            Ok(()) => debug!(collection = %collection, count, "slice refreshed"),
            Err(err) => {
                error!(
                    collection = %collection,
                    error = %err,
                    "undecodable rows; keeping cached slice"
                );
            }
        }
    }

    #[instrument(skip(self, message))]
    pub fn add_note(&mut self, from_user: &str, message: &str) -> anyhow::Result<Note> {
        self.ensure_partner(from_user)?;
        let message = message.trim();
        if message.is_empty() {
            bail!("note message cannot be empty");
        }

        let payload = json!({"from_user": from_user, "message": message});
        let note: Note = self.confirm_insert(Collection::Notes, payload, "note")?;
        self.state.notes.insert(0, note.clone());
        self.notices.success(format!("note sent as {from_user}"));
        Ok(note)
    }

    #[instrument(skip(self, title))]
    pub fn add_movie(&mut self, title: &str, added_by: &str) -> anyhow::Result<Movie> {
        self.ensure_partner(added_by)?;
        let title = title.trim();
        if title.is_empty() {
            bail!("movie title cannot be empty");
        }

        let payload = json!({"title": title, "added_by": added_by});
        let movie: Movie = self.confirm_insert(Collection::Movies, payload, "movie")?;
        self.state.movies.insert(0, movie.clone());
        self.notices
            .success(format!("\"{}\" added to the movie list", movie.title));
        Ok(movie)
    }

    #[instrument(skip(self, name, emoji))]
    pub fn add_favorite(
        &mut self,
        kind: &str,
        name: &str,
        person: &str,
        emoji: &str,
    ) -> anyhow::Result<Favorite> {
        self.ensure_partner(person)?;
        let name = name.trim();
        if name.is_empty() {
            bail!("favorite name cannot be empty");
        }

        let payload = json!({
            "type": kind.trim(),
            "name": name,
            "person": person,
            "emoji": emoji.trim(),
        });
        let favorite: Favorite = self.confirm_insert(Collection::Favorites, payload, "favorite")?;
        self.state.favorites.insert(0, favorite.clone());
        self.notices
            .success(format!("{} saved as {person}'s favorite", favorite.name));
        Ok(favorite)
    }

    #[instrument(skip(self, item))]
    pub fn add_bucket_item(&mut self, item: &str) -> anyhow::Result<BucketListItem> {
        let item = item.trim();
        if item.is_empty() {
            bail!("bucket list item cannot be empty");
        }

        let payload = json!({"item": item});
        let entry: BucketListItem =
            self.confirm_insert(Collection::BucketList, payload, "bucket list item")?;
        self.state.bucket_list.insert(0, entry.clone());
        self.notices.success("dream added to the bucket list");
        Ok(entry)
    }

    #[instrument(skip(self, mood_text))]
    pub fn set_mood(
        &mut self,
        user_name: &str,
        mood_emoji: &str,
        mood_text: &str,
    ) -> anyhow::Result<UserMood> {
        self.ensure_partner(user_name)?;
        if mood_emoji.trim().is_empty() {
            bail!("mood emoji cannot be empty");
        }

        let payload = json!({
            "user_name": user_name,
            "mood_emoji": mood_emoji.trim(),
            "mood_text": mood_text.trim(),
        });
        let mood: UserMood = self.confirm_upsert(Collection::Moods, payload, "mood")?;
        upsert_slice(&mut self.state.moods, mood.clone(), |row| {
            row.user_name == user_name
        });
        self.notices
            .success(format!("mood updated for {user_name}"));
        Ok(mood)
    }

    #[instrument(skip(self, photo_url, caption))]
    pub fn set_daily_photo(
        &mut self,
        user_name: &str,
        photo_url: &str,
        caption: &str,
        photo_date: NaiveDate,
    ) -> anyhow::Result<DailyPhoto> {
        self.ensure_partner(user_name)?;
        let photo_url = photo_url.trim();
        if photo_url.is_empty() {
            bail!("photo url cannot be empty");
        }

        let payload = json!({
            "user_name": user_name,
            "photo_url": photo_url,
            "caption": caption.trim(),
            "photo_date": photo_date,
        });
        let photo: DailyPhoto = self.confirm_upsert(Collection::Photos, payload, "photo")?;
        upsert_slice(&mut self.state.photos, photo.clone(), |row| {
            row.user_name == user_name && row.photo_date == photo_date
        });
        self.notices
            .success(format!("photo of the day saved for {user_name}"));
        Ok(photo)
    }

    #[instrument(skip(self))]
    pub fn set_birthday(
        &mut self,
        user_name: &str,
        birth_date: NaiveDate,
    ) -> anyhow::Result<Birthday> {
        self.ensure_partner(user_name)?;

        let payload = json!({"user_name": user_name, "birth_date": birth_date});
        let birthday: Birthday = self.confirm_upsert(Collection::Birthdays, payload, "birthday")?;
        upsert_slice(&mut self.state.birthdays, birthday.clone(), |row| {
            row.user_name == user_name
        });
        self.notices
            .success(format!("birthday saved for {user_name}"));
        Ok(birthday)
    }

    #[instrument(skip(self))]
    pub fn remove_favorite(&mut self, id: Uuid) -> anyhow::Result<()> {
        match self.client.delete(Collection::Favorites, id) {
            Ok(()) => {
                self.state.favorites.retain(|favorite| favorite.id != id);
                self.notices.success("favorite removed");
                Ok(())
            }
            Err(err) => {
                let chain = format!("{err:#}");
                error!(id = %id, error = %chain, "delete failed; keeping cached slice");
                Err(err)
            }
        }
    }

    #[instrument(skip(self))]
    pub fn remove_bucket_item(&mut self, id: Uuid) -> anyhow::Result<()> {
        match self.client.delete(Collection::BucketList, id) {
            Ok(()) => {
                self.state.bucket_list.retain(|entry| entry.id != id);
                self.notices.success("bucket list item removed");
                Ok(())
            }
            Err(err) => {
                let chain = format!("{err:#}");
                error!(id = %id, error = %chain, "delete failed; keeping cached slice");
                Err(err)
            }
        }
    }

    pub fn mood_for(&self, user_name: &str) -> Option<&UserMood> {
        self.state
            .moods
            .iter()
            .find(|mood| mood.user_name == user_name)
    }

    pub fn birthday_for(&self, user_name: &str) -> Option<&Birthday> {
        self.state
            .birthdays
            .iter()
            .find(|birthday| birthday.user_name == user_name)
    }

    pub fn photo_for(&self, user_name: &str, photo_date: NaiveDate) -> Option<&DailyPhoto> {
        self.state
            .photos
            .iter()
            .find(|photo| photo.user_name == user_name && photo.photo_date == photo_date)
    }

    pub fn partners(&self) -> &[String] {
        &self.partners
    }

    fn ensure_partner(&self, name: &str) -> anyhow::Result<()> {
        if self.partners.iter().any(|partner| partner == name) {
            return Ok(());
        }
        Err(anyhow!(
            "unknown person: {name} (expected one of: {})",
            self.partners.join(", ")
        ))
    }

    /// Remote insert, then decode the canonical row. On any failure the
    /// caller's slice stays untouched and a failure notice carries the
    /// remote message.
    fn confirm_insert<T: DeserializeOwned>(
        &mut self,
        collection: Collection,
        payload: Value,
        what: &str,
    ) -> anyhow::Result<T> {
        let confirmed = self
            .client
            .insert(collection, payload)
            .and_then(|row| Ok(serde_json::from_value(row)?));
        self.note_mutation_failure(collection, what, confirmed)
    }

    fn confirm_upsert<T: DeserializeOwned>(
        &mut self,
        collection: Collection,
        payload: Value,
        what: &str,
    ) -> anyhow::Result<T> {
        let conflict_key = collection
            .conflict_key()
            .ok_or_else(|| anyhow!("{collection} has no conflict key"))?;
        let confirmed = self
            .client
            .upsert(collection, payload, conflict_key)
            .and_then(|row| Ok(serde_json::from_value(row)?));
        self.note_mutation_failure(collection, what, confirmed)
    }

    fn note_mutation_failure<T>(
        &mut self,
        collection: Collection,
        what: &str,
        result: anyhow::Result<T>,
    ) -> anyhow::Result<T> {
        if let Err(err) = &result {
            let chain = format!("{err:#}");
            error!(collection = %collection, error = %chain, "mutation rejected");
            self.notices.error(format!("could not save {what}: {chain}"));
        }
        result
    }
}

fn upsert_slice<T: Clone>(slice: &mut Vec<T>, record: T, same_key: impl Fn(&T) -> bool) {
    if let Some(existing) = slice.iter_mut().find(|row| same_key(row)) {
        *existing = record;
    } else {
        slice.insert(0, record);
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use serde_json::{Value, json};
    use uuid::Uuid;

    use super::SyncStore;
    use crate::collections::{Collections, MemoryCollections};
    use crate::model::{Collection, Note};
    use crate::notify::Level;

    struct FailingCollections;

    impl Collections for FailingCollections {
        fn select(&self, _collection: Collection) -> anyhow::Result<Vec<Value>> {
            anyhow::bail!("service unavailable")
        }

        fn insert(&self, _collection: Collection, _row: Value) -> anyhow::Result<Value> {
            anyhow::bail!("row level security violation")
        }

        fn upsert(
            &self,
            _collection: Collection,
            _row: Value,
            _conflict_key: &str,
        ) -> anyhow::Result<Value> {
            anyhow::bail!("row level security violation")
        }

        fn delete(&self, _collection: Collection, _id: Uuid) -> anyhow::Result<()> {
            anyhow::bail!("row level security violation")
        }
    }

    /// Delegates to memory but refuses selects on one collection.
    struct OneBadFetch {
        inner: MemoryCollections,
        poisoned: Collection,
    }

    impl Collections for OneBadFetch {
        fn select(&self, collection: Collection) -> anyhow::Result<Vec<Value>> {
            if collection == self.poisoned {
                anyhow::bail!("connection reset");
            }
            self.inner.select(collection)
        }

        fn insert(&self, collection: Collection, row: Value) -> anyhow::Result<Value> {
            self.inner.insert(collection, row)
        }

        fn upsert(
            &self,
            collection: Collection,
            row: Value,
            conflict_key: &str,
        ) -> anyhow::Result<Value> {
            self.inner.upsert(collection, row, conflict_key)
        }

        fn delete(&self, collection: Collection, id: Uuid) -> anyhow::Result<()> {
            self.inner.delete(collection, id)
        }
    }

    fn partners() -> Vec<String> {
        vec!["Imran".to_string(), "Ajsa".to_string()]
    }

    fn cached_note() -> Note {
        Note {
            id: Uuid::new_v4(),
            from_user: "Ajsa".to_string(),
            message: "still here".to_string(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn failed_insert_leaves_state_untouched_and_raises_notice() {
        let mut store = SyncStore::new(Box::new(FailingCollections), partners());
        store.state.notes.push(cached_note());
        let before = store.state.clone();

        let result = store.add_note("Imran", "hello you");
        assert!(result.is_err());
        assert_eq!(store.state, before);

        let notices = store.notices.drain();
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].level, Level::Error);
        assert!(notices[0].message.contains("row level security violation"));
    }

    #[test]
    fn validation_rejects_before_any_remote_call() {
        let mut store = SyncStore::new(Box::new(FailingCollections), partners());
        let before = store.state.clone();

        assert!(store.add_note("Stranger", "hi").is_err());
        assert!(store.add_note("Imran", "   ").is_err());
        assert!(store.set_mood("Nobody", "😊", "").is_err());

        // validation failures never produce a toast, only the returned error
        assert!(store.notices.is_empty());
        assert_eq!(store.state, before);
    }

    #[test]
    fn successful_insert_prepends_exactly_once() {
        let mut store = SyncStore::new(Box::new(MemoryCollections::new()), partners());
        store.load_all();

        store.add_note("Imran", "first").expect("add note");
        let note = store.add_note("Ajsa", "second").expect("add note");

        assert_eq!(store.state.notes.len(), 2);
        assert_eq!(store.state.notes[0], note);
        assert_eq!(
            store
                .state
                .notes
                .iter()
                .filter(|candidate| candidate.id == note.id)
                .count(),
            1
        );
    }

    #[test]
    fn mood_upsert_never_duplicates_a_user() {
        let mut store = SyncStore::new(Box::new(MemoryCollections::new()), partners());

        store.set_mood("Imran", "😊", "good").expect("set mood");
        store.set_mood("Imran", "😴", "sleepy").expect("set mood");
        store.set_mood("Ajsa", "💕", "").expect("set mood");

        assert_eq!(store.state.moods.len(), 2);
        let imran = store.mood_for("Imran").expect("mood present");
        assert_eq!(imran.mood_emoji, "😴");

        // the remote side agrees after a reload
        store.load_all();
        assert_eq!(store.state.moods.len(), 2);
    }

    #[test]
    fn failed_fetch_keeps_previous_slice_and_refreshes_the_rest() {
        let inner = MemoryCollections::new();
        inner.seed(
            Collection::Movies,
            vec![json!({
                "id": Uuid::new_v4(),
                "title": "Arrival",
                "added_by": "Imran",
                "created_at": Utc::now(),
            })],
        );
        let mut store = SyncStore::new(
            Box::new(OneBadFetch {
                inner,
                poisoned: Collection::Notes,
            }),
            partners(),
        );
        store.state.notes.push(cached_note());

        store.load_all();

        assert_eq!(store.state.notes.len(), 1, "poisoned slice keeps cache");
        assert_eq!(store.state.movies.len(), 1, "healthy slice refreshed");
    }

    #[test]
    fn remove_favorite_deletes_exactly_that_id() {
        let mut store = SyncStore::new(Box::new(MemoryCollections::new()), partners());
        let keep = store
            .add_favorite("food", "Pizza", "Imran", "🍕")
            .expect("add favorite");
        let gone = store
            .add_favorite("place", "The lake", "Ajsa", "🌊")
            .expect("add favorite");

        store.remove_favorite(gone.id).expect("remove favorite");

        assert_eq!(store.state.favorites.len(), 1);
        assert_eq!(store.state.favorites[0].id, keep.id);

        store.load_all();
        assert_eq!(store.state.favorites.len(), 1);
    }
}
