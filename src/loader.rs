//! Bulk import of TourAPI exports into the site collection.

use std::collections::{BTreeMap, HashSet};

use anyhow::{bail, Result};
use chrono::Utc;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::pricing::{estimate_price, PriceHints};
use crate::storage::DocumentStore;
use crate::types::{field_string, TOUR_COLLECTION};

/// Plain string fields copied (trimmed) from each item
const COPIED_FIELDS: &[&str] = &[
    "title",
    "addr1",
    "addr2",
    "overview",
    "tel",
    "firstimage",
    "firstimage2",
    "mapx",
    "mapy",
    "contentid",
    "contenttypeid",
    "areacode",
    "sigungucode",
    "cat1",
    "cat2",
    "cat3",
    "lDongRegnCd",
    "lDongSignguCd",
    "lclsSystm1",
    "lclsSystm2",
    "lclsSystm3",
    "cpyrhtDivCd",
    "zipcode",
    "mlevel",
    "createdtime",
    "modifiedtime",
];

const REGION: &str = "의성군";
const PROVINCE: &str = "경상북도";

/// Outcome of a load
#[derive(Debug, Default, Clone, Serialize)]
pub struct LoadReport {
    pub total: usize,
    pub added: usize,
    pub skipped: usize,
    pub failed: usize,
    /// Added items per category name
    pub categories: BTreeMap<String, usize>,
    pub dry_run: bool,
}

/// Extract the item list from a TourAPI response or a bare array
pub fn parse_items(data: &Value) -> Result<Vec<Map<String, Value>>> {
    let items = match data {
        Value::Array(items) => items,
        _ => match data.pointer("/response/body/items/item") {
            Some(Value::Array(items)) => items,
            // A single result is returned as an object rather than an array
            Some(Value::Object(item)) => return Ok(vec![item.clone()]),
            _ => bail!("Expected a TourAPI response or an array of items"),
        },
    };
    Ok(items
        .iter()
        .filter_map(|item| item.as_object().cloned())
        .collect())
}

/// Category name for a TourAPI content type id
pub fn category_name(contenttypeid: &str) -> &'static str {
    match contenttypeid {
        "12" => "관광지",
        "14" => "문화시설",
        "15" => "축제공연행사",
        "28" => "레포츠",
        "32" => "숙박",
        "38" => "쇼핑",
        "39" => "음식점",
        _ => "일반",
    }
}

fn theme_tag(cat1: &str) -> Option<&'static str> {
    Some(match cat1 {
        "A01" => "자연",
        "A02" => "인문",
        "A03" => "레포츠",
        "A04" => "쇼핑",
        "A05" => "음식",
        "B02" => "숙박",
        _ => return None,
    })
}

/// Document id for the item at 1-based `position`
pub fn document_id(item: &Map<String, Value>, position: usize) -> String {
    let id = field_string(item, "contentid").trim().to_string();
    if id.is_empty() {
        format!("item_{position}")
    } else {
        id
    }
}

/// Build the stored document for one item. Empty values are left out.
pub fn build_document(item: &Map<String, Value>, source: &str, loaded_at: &str) -> Map<String, Value> {
    let get = |key: &str| field_string(item, key).trim().to_string();
    let mut doc = Map::new();

    for &key in COPIED_FIELDS {
        let value = get(key);
        if !value.is_empty() {
            doc.insert(key.to_string(), Value::from(value));
        }
    }

    doc.insert(
        "category".into(),
        Value::from(category_name(&get("contenttypeid"))),
    );

    let listed_price = get("price");
    let price = if listed_price.is_empty() {
        let (contenttypeid, cat1, title, overview) =
            (get("contenttypeid"), get("cat1"), get("title"), get("overview"));
        estimate_price(&PriceHints {
            contenttypeid: &contenttypeid,
            cat1: &cat1,
            title: &title,
            overview: &overview,
        })
        .to_string()
    } else {
        listed_price
    };
    doc.insert("price".into(), Value::from(price));

    for (field, source_key) in [("latitude", "mapy"), ("longitude", "mapx")] {
        if let Ok(coord) = get(source_key).parse::<f64>() {
            doc.insert(field.into(), Value::from(coord));
        }
    }

    let mut tags = Vec::new();
    if !get("tel").is_empty() {
        tags.push("연락처있음");
    }
    if !get("firstimage").is_empty() {
        tags.push("이미지있음");
    }
    if !get("cpyrhtDivCd").is_empty() {
        tags.push("저작권표시");
    }
    tags.extend([REGION, PROVINCE]);
    tags.extend(theme_tag(&get("cat1")));
    doc.insert("tags".into(), Value::from(tags));

    let keywords = search_keywords(&get("title"));
    if !keywords.is_empty() {
        doc.insert("search_keywords".into(), Value::from(keywords));
    }

    doc.insert("readcount".into(), Value::from(0));
    doc.insert("source".into(), Value::from(source));
    doc.insert("region".into(), Value::from(REGION));
    doc.insert("province".into(), Value::from(PROVINCE));
    doc.insert("loaded_at".into(), Value::from(loaded_at));
    doc
}

/// Title split on whitespace and brackets
fn search_keywords(title: &str) -> Vec<String> {
    title
        .split(|c: char| c.is_whitespace() || matches!(c, '(' | ')' | '[' | ']'))
        .filter(|w| !w.is_empty())
        .map(str::to_string)
        .collect()
}

/// Add every item not already present. With `dry_run` the store is not
/// read or written and every item counts as added.
pub async fn load_items(
    store: &dyn DocumentStore,
    items: &[Map<String, Value>],
    source: &str,
    dry_run: bool,
) -> Result<LoadReport> {
    let mut report = LoadReport {
        total: items.len(),
        dry_run,
        ..Default::default()
    };

    let mut existing: HashSet<String> = if dry_run {
        HashSet::new()
    } else {
        store
            .list(TOUR_COLLECTION)
            .await?
            .iter()
            .flat_map(|doc| [doc.id.clone(), field_string(&doc.fields, "contentid")])
            .filter(|id| !id.is_empty())
            .collect()
    };

    let loaded_at = Utc::now().to_rfc3339();
    for (index, item) in items.iter().enumerate() {
        let id = document_id(item, index + 1);
        if existing.contains(&id) {
            report.skipped += 1;
            tracing::debug!("Skipping {} (already loaded)", id);
            continue;
        }

        let doc = build_document(item, source, &loaded_at);
        let category = field_string(&doc, "category");
        if !dry_run {
            if let Err(e) = store.set(TOUR_COLLECTION, &id, doc).await {
                report.failed += 1;
                tracing::warn!("Failed to store {}: {}", id, e);
                continue;
            }
        }
        report.added += 1;
        *report.categories.entry(category).or_default() += 1;
        existing.insert(id);
    }

    tracing::info!(
        "Load finished: {} added, {} skipped, {} failed",
        report.added,
        report.skipped,
        report.failed
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use serde_json::json;

    fn item(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    fn sample() -> Value {
        json!({"response": {"body": {"items": {"item": [
            {
                "contentid": "126",
                "contenttypeid": "12",
                "cat1": "A01",
                "title": "빙계계곡(군립공원)",
                "mapx": "128.6758",
                "mapy": "36.3712",
                "tel": "054-830-6000",
                "firstimage": "",
                "overview": "  여름에도 얼음이 어는 계곡  "
            },
            {
                "contentid": "200",
                "contenttypeid": "39",
                "title": "의성 한정식",
                "price": 30000
            },
            {"title": "무명 장소"}
        ]}}}})
    }

    #[test]
    fn test_parse_items_envelope_and_array() {
        assert_eq!(parse_items(&sample()).unwrap().len(), 3);
        assert_eq!(parse_items(&json!([{"title": "a"}, 5])).unwrap().len(), 1);
        assert_eq!(
            parse_items(&json!({"response": {"body": {"items": {"item": {"title": "a"}}}}}))
                .unwrap()
                .len(),
            1
        );
        assert!(parse_items(&json!({"other": 1})).is_err());
    }

    #[test]
    fn test_category_names() {
        assert_eq!(category_name("12"), "관광지");
        assert_eq!(category_name("39"), "음식점");
        assert_eq!(category_name("99"), "일반");
    }

    #[test]
    fn test_build_document() {
        let items = parse_items(&sample()).unwrap();
        let doc = build_document(&items[0], "tour.json", "2025-01-01T00:00:00+00:00");

        assert_eq!(doc["title"], "빙계계곡(군립공원)");
        assert_eq!(doc["overview"], "여름에도 얼음이 어는 계곡");
        assert_eq!(doc["category"], "관광지");
        assert_eq!(doc["latitude"], 36.3712);
        assert_eq!(doc["longitude"], 128.6758);
        assert_eq!(doc["price"], "0");
        assert_eq!(doc["readcount"], 0);
        assert_eq!(doc["tags"], json!(["연락처있음", "의성군", "경상북도", "자연"]));
        assert_eq!(doc["search_keywords"], json!(["빙계계곡", "군립공원"]));
        assert!(!doc.contains_key("firstimage"));
        assert!(!doc.contains_key("addr1"));
    }

    #[test]
    fn test_listed_price_wins_over_estimate() {
        let doc = build_document(&item(json!({"contenttypeid": "39", "price": 30000})), "s", "t");
        assert_eq!(doc["price"], "30000");
        let doc = build_document(&item(json!({"contenttypeid": "39", "title": "국밥"})), "s", "t");
        assert_eq!(doc["price"], "15000");
    }

    #[test]
    fn test_document_id_falls_back_to_position() {
        assert_eq!(document_id(&item(json!({"contentid": " 7 "})), 1), "7");
        assert_eq!(document_id(&item(json!({"title": "x"})), 3), "item_3");
    }

    #[tokio::test]
    async fn test_load_skips_existing() {
        let store = MemoryStore::new();
        let items = parse_items(&sample()).unwrap();

        let first = load_items(&store, &items, "tour.json", false).await.unwrap();
        assert_eq!(first.added, 3);
        assert_eq!(first.categories["관광지"], 1);
        assert_eq!(first.categories["음식점"], 1);
        assert_eq!(first.categories["일반"], 1);
        assert!(store.get(TOUR_COLLECTION, "item_3").await.unwrap().is_some());

        let second = load_items(&store, &items, "tour.json", false).await.unwrap();
        assert_eq!(second.added, 0);
        assert_eq!(second.skipped, 3);
        assert_eq!(store.count(TOUR_COLLECTION).await, 3);
    }

    #[tokio::test]
    async fn test_dry_run_writes_nothing() {
        let store = MemoryStore::new();
        let items = parse_items(&sample()).unwrap();
        let report = load_items(&store, &items, "tour.json", true).await.unwrap();
        assert_eq!(report.added, 3);
        assert!(report.dry_run);
        assert_eq!(store.count(TOUR_COLLECTION).await, 0);
    }

    #[tokio::test]
    async fn test_duplicate_in_one_file_is_skipped() {
        let items = parse_items(&json!([
            {"contentid": "300", "title": "사촌역 은행나무길"},
            {"contentid": "300", "title": "사촌역 은행나무길 (중복)"}
        ]))
        .unwrap();

        let store = MemoryStore::new();
        let report = load_items(&store, &items, "tour.json", false).await.unwrap();
        assert_eq!(report.added, 1);
        assert_eq!(report.skipped, 1);
        let doc = store.get(TOUR_COLLECTION, "300").await.unwrap().unwrap();
        assert_eq!(doc.fields["title"], "사촌역 은행나무길");

        let dry = load_items(&MemoryStore::new(), &items, "tour.json", true)
            .await
            .unwrap();
        assert_eq!(dry.added, 1);
        assert_eq!(dry.skipped, 1);
    }
}
