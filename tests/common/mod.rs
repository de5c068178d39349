#![allow(dead_code)]

use serde_json::{Value, json};
use std::path::Path;
use tempfile::TempDir;
use tessera::{AppState, Config};

/// A library of 100 landscape photos. Every third photo has no GPS data.
pub fn manifest() -> Value {
    let media: Vec<Value> = (1..=100)
        .map(|id| {
            json!({
                "id": id,
                "file": format!("2024/05/photo-{}.jpg", id),
                "width": 1200,
                "height": 800,
                "sizes": {
                    "medium": { "file": format!("photo-{}-300.jpg", id), "width": 300, "height": 200 },
                    "large": { "file": format!("photo-{}-1024.jpg", id), "width": 1024, "height": 683 }
                },
                "caption": format!("Photo {}", id),
                "alt": format!("Alt {}", id),
                "title": format!("Photo {:03}", id),
                "date": "2024-05-01T10:00:00Z",
                "menu_order": id,
                "gps": if id % 3 == 0 { json!(null) } else { json!({ "lat": 45.0, "lon": f64::from(id) / 10.0 }) },
                "parent": if id <= 4 { json!(500) } else { json!(null) }
            })
        })
        .collect();

    json!({
        "base_url": "https://photos.example.com",
        "media": media,
        "posts": [
            { "id": 5, "title": "Harbour", "excerpt": "Boats", "slug": "harbour", "featured_image": 11, "date": "2024-06-05T00:00:00Z" },
            { "id": 7, "title": "Market", "excerpt": "Stalls", "slug": "market", "featured_image": 12, "date": "2024-06-07T00:00:00Z" },
            { "id": 8, "title": "Notes", "excerpt": "", "slug": "notes", "date": "2024-06-08T00:00:00Z" },
            { "id": 500, "title": "Host", "excerpt": "", "slug": "host", "date": "2024-01-01T00:00:00Z" }
        ],
        "galleries": [
            {
                "id": "coast",
                "name": "Coast",
                "layout": "justified",
                "media_ids": [21, 22, 23],
                "options": { "justified_row_height": 250 },
                "created_at": "2024-01-01T00:00:00Z",
                "updated_at": "2024-02-01T00:00:00Z"
            },
            {
                "id": "city",
                "name": "City",
                "media_ids": [31, 32],
                "created_at": "2024-01-01T00:00:00Z",
                "updated_at": "2024-03-01T00:00:00Z"
            }
        ],
        "collections": [
            { "id": "travel", "name": "Travel", "gallery_ids": ["coast", "city"], "updated_at": "2024-04-01T00:00:00Z" }
        ]
    })
}

/// Writes the manifest and points a config at it and at a fresh option store.
pub fn write_config(dir: &TempDir, manifest: &Value) -> Config {
    let manifest_path = dir.path().join("library.json");
    std::fs::write(&manifest_path, manifest.to_string()).unwrap();

    let mut config = Config::default();
    config.library.manifest = manifest_path;
    config.options.store = dir.path().join("data").join("options.json");
    config
}

pub fn write_options(path: &Path, options: &Value) {
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, options.to_string()).unwrap();
}

pub fn app_state(dir: &TempDir) -> AppState {
    AppState::from_config(&write_config(dir, &manifest())).unwrap()
}

pub fn ids(range: std::ops::RangeInclusive<u64>) -> String {
    range.map(|id| id.to_string()).collect::<Vec<_>>().join(",")
}
