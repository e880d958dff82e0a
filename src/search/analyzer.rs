//! Query analysis through the text generator.
//!
//! The model is asked for a small JSON object. Anything that goes wrong on
//! the way (no generator, API error, blocked reply, unparseable text) ends
//! in a degraded analysis built from a fixed vocabulary instead of an error.

use std::sync::{Arc, OnceLock};

use regex::Regex;
use serde_json::Value;

use crate::ai::{GenerationError, TextGenerator};
use crate::types::{AnalysisOutcome, QueryAnalysis};

/// Keywords used when nothing better is available
pub const DEFAULT_KEYWORDS: &[&str] = &["관광", "의성"];

/// Terms scanned for by the degraded analysis
const FALLBACK_VOCABULARY: &[&str] = &[
    "마늘", "양파", "조문국", "빙계계곡", "사촌역", "은행나무", "향교", "관광", "맛집", "숙박",
];

/// Categories offered to the model
const CATEGORIES: &[&str] = &[
    "문화재/유적지",
    "자연관광지",
    "체험관광지",
    "음식/맛집",
    "숙박시설",
    "레저/스포츠",
];

const DEFAULT_INTENT: &str = "general_search";
const DEFAULT_CONFIDENCE: f32 = 0.7;
const DEGRADED_CONFIDENCE: f32 = 0.4;
const PROCESSED_QUERY_CHARS: usize = 100;

const SYSTEM_INSTRUCTION: &str = "\
당신은 경상북도 의성군 전문 AI 관광 어시스턴트입니다.

핵심 임무:
1. 의성군 관광정보 전문가로서 정확하고 유용한 정보 제공
2. 사용자 쿼리를 정확히 분석하여 맞춤형 관광지 추천
3. 의성군의 지역 특색을 반영한 개인화된 서비스 제공

응답 원칙:
- 항상 JSON 형태로 구조화된 응답 제공
- 의성군의 문화적, 지리적 특성을 고려
- 실용적이고 실행 가능한 정보만 제공
- 사용자의 의도와 맥락을 정확히 파악

의성군 전문 지식:
- 마늘, 양파 특산품과 관련 관광자원
- 조문국 역사문화유적 (조문국사적지, 조문국박물관)
- 자연관광지 (빙계계곡, 사촌역 은행나무길)
- 전통문화시설 (의성향교, 의성관아)
- 체험관광 프로그램 및 시설";

/// Turns free text into a [`QueryAnalysis`]
pub struct QueryAnalyzer {
    generator: Option<Arc<dyn TextGenerator>>,
}

impl QueryAnalyzer {
    /// `None` means no model is configured and every analysis is degraded
    pub fn new(generator: Option<Arc<dyn TextGenerator>>) -> Self {
        Self { generator }
    }

    pub async fn analyze(&self, query: &str) -> AnalysisOutcome {
        let reply = match &self.generator {
            Some(generator) => generator.generate(SYSTEM_INSTRUCTION, &build_prompt(query)).await,
            None => Err(GenerationError::Unavailable),
        };

        match reply {
            Ok(text) => match parse_analysis(&text) {
                Some(analysis) => {
                    tracing::info!(
                        "Analyzed query {:?}: keywords={:?}",
                        query,
                        analysis.keywords
                    );
                    AnalysisOutcome {
                        analysis,
                        ai_used: true,
                    }
                }
                None => {
                    tracing::warn!(
                        "Could not parse model reply as JSON: {}",
                        preview(&text)
                    );
                    degraded_analysis(query, Some(&text))
                }
            },
            Err(e) => {
                tracing::warn!("Query analysis fell back to vocabulary scan: {}", e);
                degraded_analysis(query, None)
            }
        }
    }
}

/// Prompt embedding the query and the category list
pub fn build_prompt(query: &str) -> String {
    let categories: String = CATEGORIES.iter().map(|c| format!("- {c}\n")).collect();
    format!(
        r#"사용자 관광 쿼리 분석:

입력: "{query}"

다음 JSON 형식으로 분석 결과를 제공해주세요:

{{
    "keywords": ["관련 키워드들"],
    "categories": ["관광지 유형"],
    "preferences": ["사용자 선호 사항"],
    "intent": "사용자 의도",
    "processed_query": "정제된 쿼리",
    "confidence": 0.8
}}

의성군 관광 카테고리:
{categories}"#
    )
}

/// Parse a model reply. Returns `None` when no JSON object can be read.
pub fn parse_analysis(reply: &str) -> Option<QueryAnalysis> {
    let body = strip_code_fence(reply);
    let object = first_json_object(body)?;
    let parsed: Value = serde_json::from_str(object).ok()?;
    let map = parsed.as_object()?;

    let mut keywords = string_list(map.get("keywords"));
    if keywords.is_empty() {
        keywords = default_keywords();
    }

    let processed_query = map
        .get("processed_query")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map_or_else(|| reply.trim().to_string(), str::to_string);

    let intent = map
        .get("intent")
        .and_then(Value::as_str)
        .filter(|s| !s.trim().is_empty())
        .unwrap_or(DEFAULT_INTENT)
        .to_string();

    Some(QueryAnalysis {
        keywords,
        categories: string_list(map.get("categories")),
        preferences: string_list(map.get("preferences")),
        intent,
        processed_query,
        confidence: confidence(map.get("confidence")),
    })
}

/// Analysis used whenever the model cannot be used. Scans the query and the
/// model reply (if any) for known vocabulary.
pub fn degraded_analysis(query: &str, reply: Option<&str>) -> AnalysisOutcome {
    let haystack = format!("{} {}", query, reply.unwrap_or_default()).to_lowercase();
    let mut keywords: Vec<String> = FALLBACK_VOCABULARY
        .iter()
        .filter(|term| haystack.contains(*term))
        .map(|term| (*term).to_string())
        .collect();
    if keywords.is_empty() {
        keywords = default_keywords();
    }

    let source = reply.unwrap_or(query).trim();
    AnalysisOutcome {
        analysis: QueryAnalysis {
            keywords,
            categories: Vec::new(),
            preferences: Vec::new(),
            intent: DEFAULT_INTENT.to_string(),
            processed_query: source.chars().take(PROCESSED_QUERY_CHARS).collect(),
            confidence: DEGRADED_CONFIDENCE,
        },
        ai_used: false,
    }
}

fn default_keywords() -> Vec<String> {
    DEFAULT_KEYWORDS.iter().map(|k| (*k).to_string()).collect()
}

fn fence_regex() -> &'static Regex {
    static FENCE: OnceLock<Regex> = OnceLock::new();
    FENCE.get_or_init(|| Regex::new(r"```(?:json|JSON)?\s*([\s\S]*?)```").expect("valid regex"))
}

/// Contents of the first fenced block, or the text after an unclosed fence
fn strip_code_fence(text: &str) -> &str {
    if let Some(inner) = fence_regex().captures(text).and_then(|c| c.get(1)) {
        return inner.as_str().trim();
    }
    match text.find("```") {
        Some(start) => {
            let rest = &text[start + 3..];
            rest.strip_prefix("json").unwrap_or(rest).trim()
        }
        None => text,
    }
}

/// Slice of the first balanced top-level `{...}`, skipping braces that
/// appear inside JSON strings
fn first_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in text[start..].char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + offset + 1]);
                }
            }
            _ => {}
        }
    }
    None
}

/// Array of strings (other scalars are rendered), or a comma separated string
fn string_list(value: Option<&Value>) -> Vec<String> {
    let items: Vec<String> = match value {
        Some(Value::Array(items)) => items
            .iter()
            .map(|v| match v {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .collect(),
        Some(Value::String(s)) => s.split(',').map(str::to_string).collect(),
        _ => Vec::new(),
    };
    items
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn confidence(value: Option<&Value>) -> f32 {
    let raw = match value {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    };
    raw.map_or(DEFAULT_CONFIDENCE, |c| c.clamp(0.0, 1.0) as f32)
}

fn preview(text: &str) -> String {
    text.chars().take(200).collect()
}
