use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Collection holding tourism site records
pub const TOUR_COLLECTION: &str = "tour_list";
/// Collection holding registered businesses
pub const BUSINESS_COLLECTION: &str = "businesses";
/// Collection holding QR generation requests
pub const QR_REQUEST_COLLECTION: &str = "qr_requests";
/// Collection holding generated QR image URLs
pub const QR_RESULT_COLLECTION: &str = "qr_results";

/// Lightweight view of a site used for keyword matching
#[derive(Debug, Clone, PartialEq)]
pub struct SiteSummary {
    pub id: String,
    pub name: String,
    pub overview: String,
    pub category: String,
}

impl SiteSummary {
    /// Build a summary from a stored document. The `contentid` field wins
    /// over the document id when present.
    pub fn from_fields(doc_id: &str, fields: &Map<String, Value>) -> Self {
        let id = field_string(fields, "contentid");
        Self {
            id: if id.is_empty() { doc_id.to_string() } else { id },
            name: field_string(fields, "title"),
            overview: field_string(fields, "overview"),
            category: field_string(fields, "category"),
        }
    }
}

/// Full projection of a site returned to clients
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SiteDetail {
    pub addr1: String,
    pub addr2: String,
    pub areacode: String,
    pub cat1: String,
    pub cat2: String,
    pub cat3: String,
    pub contentid: String,
    pub contenttypeid: String,
    pub createdtime: String,
    pub firstimage: String,
    pub firstimage2: String,
    pub mapx: String,
    pub mapy: String,
    pub tel: String,
    pub title: String,
    pub zipcode: String,
    pub overview: String,
    pub price: String,
}

impl SiteDetail {
    pub fn from_fields(fields: &Map<String, Value>) -> Self {
        let f = |key: &str| field_string(fields, key);
        Self {
            addr1: f("addr1"),
            addr2: f("addr2"),
            areacode: f("areacode"),
            cat1: f("cat1"),
            cat2: f("cat2"),
            cat3: f("cat3"),
            contentid: f("contentid"),
            contenttypeid: f("contenttypeid"),
            createdtime: f("createdtime"),
            firstimage: f("firstimage"),
            firstimage2: f("firstimage2"),
            mapx: f("mapx"),
            mapy: f("mapy"),
            tel: f("tel"),
            title: f("title"),
            zipcode: f("zipcode"),
            overview: f("overview"),
            price: f("price"),
        }
    }
}

/// Structured interpretation of a user query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryAnalysis {
    pub keywords: Vec<String>,
    pub categories: Vec<String>,
    pub preferences: Vec<String>,
    pub intent: String,
    pub processed_query: String,
    pub confidence: f32,
}

/// Analysis plus how it was produced
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisOutcome {
    pub analysis: QueryAnalysis,
    /// False when the degraded fallback produced the analysis
    pub ai_used: bool,
}

/// Response body of the query endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recommendation {
    pub success: bool,
    pub query: String,
    pub analysis: QueryAnalysis,
    pub ai_used: bool,
    pub recommended_spots: Vec<SiteDetail>,
    pub total_found: usize,
    pub returned_count: usize,
}

/// Message published for the QR worker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QrMessage {
    pub store: String,
    pub price: String,
    pub timestamp: String,
    pub request_id: String,
    /// Derived lookup key (`store|price|timestamp`)
    pub original_data: String,
}

/// Derived string used as the QR lookup key
pub fn derived_key(store: &str, price: &str, timestamp: &str) -> String {
    format!("{store}|{price}|{timestamp}")
}

/// Timestamp component of QR keys and object names (UTC, `%Y%m%d_%H%M%S`)
pub fn qr_timestamp(at: DateTime<Utc>) -> String {
    at.format("%Y%m%d_%H%M%S").to_string()
}

/// Read a document field as a display string. Numbers and booleans are
/// rendered, missing or null fields become empty.
pub fn field_string(fields: &Map<String, Value>, key: &str) -> String {
    fields.get(key).map(value_string).unwrap_or_default()
}

/// Render a scalar JSON value as text. Integral floats lose their `.0` so
/// prices stored as `15000.0` and `"15000"` read the same.
pub fn value_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => match n.as_f64() {
            Some(f) if !n.is_i64() && !n.is_u64() && f.fract() == 0.0 && f.abs() < 1e15 => {
                format!("{}", f as i64)
            }
            _ => n.to_string(),
        },
        Value::Bool(b) => b.to_string(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
