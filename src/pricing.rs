//! Admission price estimates for sites without a listed price.
//!
//! Prices are in won and only depend on the content type, the `cat1` theme
//! code, the title and (as a last resort) the overview.

/// Site attributes the estimate looks at
#[derive(Debug, Default, Clone, Copy)]
pub struct PriceHints<'a> {
    pub contenttypeid: &'a str,
    pub cat1: &'a str,
    pub title: &'a str,
    pub overview: &'a str,
}

pub fn estimate_price(hints: &PriceHints<'_>) -> u32 {
    let PriceHints {
        contenttypeid,
        cat1,
        title,
        overview,
    } = *hints;
    let title_has = |words: &[&str]| words.iter().any(|w| title.contains(w));

    match contenttypeid {
        // Lodging
        _ if contenttypeid == "32" || cat1 == "B02" => {
            if title_has(&["고택", "한옥", "Quality"]) {
                120_000
            } else {
                80_000
            }
        }
        // Restaurants
        _ if contenttypeid == "39" || cat1 == "A05" => {
            if title_has(&["한정식", "갈비"]) {
                25_000
            } else if title_has(&["햄버거", "레스토랑"]) {
                18_000
            } else {
                15_000
            }
        }
        "15" => {
            if title_has(&["축제", "행사"]) {
                5_000
            } else {
                3_000
            }
        }
        "14" => {
            if title_has(&["박물관", "문학관"]) {
                3_000
            } else if title_has(&["문화원", "문화회관"]) {
                2_000
            } else {
                1_000
            }
        }
        // Leisure and hands-on programs
        _ if contenttypeid == "28" || cat1 == "A03" => {
            if title_has(&["야영장", "캠핑"]) {
                25_000
            } else if title_has(&["컬링", "CC"]) {
                30_000
            } else {
                20_000
            }
        }
        // Markets and shops are free to enter
        _ if contenttypeid == "38" || cat1 == "A04" => 0,
        "12" => attraction_price(cat1, title),
        _ => overview_price(overview),
    }
}

fn attraction_price(cat1: &str, title: &str) -> u32 {
    let title_has = |words: &[&str]| words.iter().any(|w| title.contains(w));

    // Temples, academies and shrines
    if title_has(&["사", "서원", "향교", "정사", "당"]) {
        return 0;
    }
    match cat1 {
        "A01" if title_has(&["휴양림", "생태"]) => 3_000,
        "A02" if title_has(&["체험", "마을"]) => 5_000,
        "A02" if title_has(&["온천"]) => 8_000,
        _ => 0,
    }
}

fn overview_price(overview: &str) -> u32 {
    let has = |word: &str| overview.contains(word);
    if has("맛집") {
        20_000
    } else if has("축제") || has("행사") {
        5_000
    } else if has("체험") {
        10_000
    } else if has("고택") || has("한옥") {
        100_000
    } else {
        0
    }
}
