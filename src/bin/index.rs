//! One-shot indexer: loads the OpenITI corpus metadata dumps into the
//! configured search service.
//!
//! Usage: `fihrist-index [authors|books|all]`

use anyhow::{bail, Context, Result};
use fihrist::client::SearchClient;
use fihrist::config::AppConfig;
use fihrist::documents::{AuthorRecord, BookRecord, AUTHORS_SPEC, BOOKS_SPEC};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{HashMap, HashSet};

const AUTHORS_DUMP_URL: &str = "https://raw.githubusercontent.com/OpenITI/kitab-metadata-automation/master/output/OpenITI_Github_clone_all_author_meta.json";
const BOOKS_DUMP_URL: &str = "https://raw.githubusercontent.com/OpenITI/kitab-metadata-automation/master/output/OpenITI_Github_clone_all_book_meta.json";

const IMPORT_BATCH_SIZE: usize = 100;

/// Author entry in the OpenITI metadata dump, keyed by URI.
#[derive(Debug, Default, Deserialize)]
struct RawAuthor {
    #[serde(default)]
    author_ar: Vec<String>,
    #[serde(default)]
    author_lat: Vec<String>,
    /// Death year as text, not always numeric.
    #[serde(default)]
    date: String,
    #[serde(default)]
    shuhra: String,
    #[serde(default)]
    full_name: String,
    #[serde(default)]
    uri: String,
}

#[derive(Debug, Default, Deserialize)]
struct RawBook {
    #[serde(default)]
    title_ar: Vec<String>,
    #[serde(default)]
    title_lat: Vec<String>,
    #[serde(default)]
    genre_tags: Vec<String>,
    #[serde(default)]
    uri: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let target = std::env::args().nth(1).unwrap_or_else(|| "all".to_string());
    let config = AppConfig::from_env()?;
    let client = SearchClient::new(&config);

    match target.as_str() {
        "authors" => index_authors(&client).await?,
        "books" => index_books(&client).await?,
        "all" => {
            index_authors(&client).await?;
            index_books(&client).await?;
        }
        other => bail!("unknown target {other:?}, expected authors, books or all"),
    }

    Ok(())
}

async fn index_authors(client: &SearchClient) -> Result<()> {
    let url = std::env::var("FIHRIST_AUTHORS_DUMP").unwrap_or_else(|_| AUTHORS_DUMP_URL.to_string());

    tracing::info!("Fetching author metadata...");
    let raw: HashMap<String, RawAuthor> = fetch_dump(&url).await?;

    let records: Vec<AuthorRecord> = raw
        .into_values()
        .filter(|author| !author.uri.is_empty())
        .map(author_record)
        .collect();

    tracing::info!("Recreating authors collection...");
    client.recreate_collection(&AUTHORS_SPEC).await?;

    import_records(client, AUTHORS_SPEC.name, &records).await
}

async fn index_books(client: &SearchClient) -> Result<()> {
    let url = std::env::var("FIHRIST_BOOKS_DUMP").unwrap_or_else(|_| BOOKS_DUMP_URL.to_string());

    tracing::info!("Fetching book metadata...");
    let raw: HashMap<String, RawBook> = fetch_dump(&url).await?;

    let records: Vec<BookRecord> = raw.into_values().filter_map(book_record).collect();

    tracing::info!("Recreating books collection...");
    client.recreate_collection(&BOOKS_SPEC).await?;

    import_records(client, BOOKS_SPEC.name, &records).await
}

async fn fetch_dump<T: DeserializeOwned>(url: &str) -> Result<HashMap<String, T>> {
    let response = reqwest::Client::new()
        .get(url)
        .send()
        .await
        .context("Failed to fetch metadata dump")?;

    if !response.status().is_success() {
        bail!("Metadata dump fetch failed with status {}", response.status());
    }

    response
        .json()
        .await
        .context("Failed to parse metadata dump")
}

async fn import_records<T: Serialize>(
    client: &SearchClient,
    collection: &str,
    records: &[T],
) -> Result<()> {
    let documents: Vec<Value> = records
        .iter()
        .map(serde_json::to_value)
        .collect::<Result<_, _>>()
        .context("Failed to serialize records")?;

    let total_batches = documents.len().div_ceil(IMPORT_BATCH_SIZE);
    for (i, batch) in documents.chunks(IMPORT_BATCH_SIZE).enumerate() {
        tracing::info!("Indexing batch {} / {}", i + 1, total_batches);
        client.import_batch(collection, batch).await?;
    }

    tracing::info!("Indexed {} documents into {}", documents.len(), collection);
    Ok(())
}

/// Trims and dedupes name variants, dropping empties and keeping
/// first-seen order.
fn dedupe_names(names: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    names
        .iter()
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty() && seen.insert(name.clone()))
        .collect()
}

/// First name is the primary one; the rest are alternates.
fn split_primary(names: Vec<String>) -> (Option<String>, Vec<String>) {
    let mut names = names.into_iter();
    let primary = names.next();
    (primary, names.collect())
}

fn author_record(raw: RawAuthor) -> AuthorRecord {
    let (primary_arabic_name, other_arabic_names) = split_primary(dedupe_names(&raw.author_ar));

    // The transliterated full name is searchable alongside the other
    // Latin-script variants.
    let mut latin_names = raw.author_lat.clone();
    if !raw.full_name.trim().is_empty() {
        latin_names.push(raw.full_name.clone());
    }
    let (primary_latin_name, other_latin_names) = split_primary(dedupe_names(&latin_names));

    let shuhra = Some(raw.shuhra.trim().to_string()).filter(|name| !name.is_empty());
    let year = raw.date.trim().parse().ok();

    AuthorRecord {
        id: raw.uri,
        year,
        primary_arabic_name,
        other_arabic_names,
        primary_latin_name,
        other_latin_names,
        shuhra,
    }
}

/// Books without a URI or without any title are not indexable.
fn book_record(raw: RawBook) -> Option<BookRecord> {
    if raw.uri.is_empty() {
        return None;
    }

    let (primary_arabic_name, other_arabic_names) = split_primary(dedupe_names(&raw.title_ar));
    let (primary_latin_name, other_latin_names) = split_primary(dedupe_names(&raw.title_lat));
    if primary_arabic_name.is_none() && primary_latin_name.is_none() {
        return None;
    }

    let author_id = raw
        .uri
        .split('.')
        .next()
        .unwrap_or_default()
        .to_string();

    Some(BookRecord {
        id: raw.uri,
        author_id,
        primary_arabic_name,
        other_arabic_names,
        primary_latin_name,
        other_latin_names,
        genre_tags: raw.genre_tags,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dedupe_names() {
        let names = vec![
            " al-Bukhari ".to_string(),
            "al-Bukhari".to_string(),
            "".to_string(),
            "Muhammad b. Ismail".to_string(),
        ];
        assert_eq!(dedupe_names(&names), vec!["al-Bukhari", "Muhammad b. Ismail"]);
    }

    #[test]
    fn test_author_record_transformation() {
        let raw = RawAuthor {
            author_ar: vec!["البخاري".to_string(), "محمد بن إسماعيل".to_string()],
            author_lat: vec!["al-Bukhari".to_string()],
            date: "256".to_string(),
            shuhra: "Bukhari".to_string(),
            full_name: "Muhammad b. Ismail al-Bukhari".to_string(),
            uri: "0256Bukhari".to_string(),
        };

        let record = author_record(raw);
        assert_eq!(record.id, "0256Bukhari");
        assert_eq!(record.year, Some(256));
        assert_eq!(record.primary_arabic_name.as_deref(), Some("البخاري"));
        assert_eq!(record.other_arabic_names, vec!["محمد بن إسماعيل"]);
        assert_eq!(record.primary_latin_name.as_deref(), Some("al-Bukhari"));
        assert_eq!(record.other_latin_names, vec!["Muhammad b. Ismail al-Bukhari"]);
        assert_eq!(record.shuhra.as_deref(), Some("Bukhari"));
    }

    #[test]
    fn test_author_record_handles_missing_data() {
        let raw = RawAuthor {
            uri: "0001Anon".to_string(),
            date: "unknown".to_string(),
            ..Default::default()
        };

        let record = author_record(raw);
        assert_eq!(record.year, None);
        assert_eq!(record.primary_arabic_name, None);
        assert_eq!(record.shuhra, None);
        assert!(record.other_latin_names.is_empty());
    }

    #[test]
    fn test_book_record_derives_author_id() {
        let raw = RawBook {
            title_ar: vec!["الجامع الصحيح".to_string()],
            genre_tags: vec!["hadith".to_string()],
            uri: "0256Bukhari.Sahih".to_string(),
            ..Default::default()
        };

        let record = book_record(raw).unwrap();
        assert_eq!(record.id, "0256Bukhari.Sahih");
        assert_eq!(record.author_id, "0256Bukhari");
        assert_eq!(record.genre_tags, vec!["hadith"]);
    }

    #[test]
    fn test_book_record_skips_untitled() {
        let raw = RawBook {
            uri: "0256Bukhari.Unknown".to_string(),
            ..Default::default()
        };
        assert!(book_record(raw).is_none());

        let no_uri = RawBook {
            title_ar: vec!["كتاب".to_string()],
            ..Default::default()
        };
        assert!(book_record(no_uri).is_none());
    }
}
