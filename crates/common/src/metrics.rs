//! Content metric extractors
//!
//! Pure functions over a parsed [`Page`]. They are total: missing numbers
//! are zero, missing strings are empty, and nothing here can fail.
//!
//! Lengths count Unicode scalar values, so Hangul and Latin text weigh the same
//! per character.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::artifact::{Element, ElementKind, Page};

/// Minimum trimmed length for a text element to count as content.
pub const MIN_CONTENT_CHARS: usize = 2;

const TITLE_MARKER: &str = "title";
const SUBTITLE_MARKER: &str = "subtitle";
const BODY_MARKERS: &[&str] = &["body", "callout"];
const BULLET_PREFIX: &str = "- ";
const BODY_FONT_MARKERS: &[&str] = &["body", "callout", "table", "flow"];
const COPY_EXCLUDED_ROLES: &[&str] = &["header"];
const COVERAGE_EXCLUDED_ROLES: &[&str] = &["background", "header", "footer", "decorative"];

/// Collapse runs of whitespace to single spaces and trim the ends.
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn char_len(text: &str) -> usize {
    text.chars().count()
}

fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

/// Title/body presence on one page.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Completeness {
    pub page_number: Option<u32>,
    pub title_count: usize,
    pub body_or_callout_count: usize,
}

impl Completeness {
    pub fn satisfied(&self) -> bool {
        self.title_count >= 1 && self.body_or_callout_count >= 1
    }
}

/// Count title-like and body/callout-like rendered text elements.
pub fn completeness(page: &Page) -> Completeness {
    let mut title_count = 0;
    let mut body_or_callout_count = 0;

    for element in page.elements.iter().filter(|e| e.is_rendered_text()) {
        let text = element.text.trim();
        if char_len(text) < MIN_CONTENT_CHARS {
            continue;
        }

        let id = element.id.to_lowercase();
        if id.contains(TITLE_MARKER) && !id.contains(SUBTITLE_MARKER) {
            title_count += 1;
        }
        if BODY_MARKERS.iter().any(|m| id.contains(m)) || text.starts_with(BULLET_PREFIX) {
            body_or_callout_count += 1;
        }
    }

    Completeness {
        page_number: page.page_number,
        title_count,
        body_or_callout_count,
    }
}

/// Copy volume on one page.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CopyDensity {
    pub page_number: Option<u32>,
    pub template: String,
    pub text_chars: usize,
    pub text_blocks: usize,
    /// Smallest declared body-like font size, 0 when the page has none.
    pub body_font_min_pt: f64,
}

fn is_body_font_element(element: &Element) -> bool {
    let id = element.id.to_lowercase();
    BODY_FONT_MARKERS.iter().any(|m| id.contains(m))
}

pub fn copy_density(page: &Page) -> CopyDensity {
    let mut text_chars = 0;
    let mut text_blocks = 0;
    let mut body_font_min_pt: Option<f64> = None;

    for element in page.elements.iter().filter(|e| e.is_rendered_text()) {
        if COPY_EXCLUDED_ROLES.contains(&element.role.as_str()) {
            continue;
        }

        let text = collapse_whitespace(&element.text);
        if text.is_empty() {
            continue;
        }

        text_chars += char_len(&text);
        text_blocks += 1;

        if is_body_font_element(element) {
            let size = element.font_size_pt;
            body_font_min_pt = Some(body_font_min_pt.map_or(size, |current| current.min(size)));
        }
    }

    CopyDensity {
        page_number: page.page_number,
        template: page.template_id.clone(),
        text_chars,
        text_blocks,
        body_font_min_pt: round_to(body_font_min_pt.unwrap_or(0.0), 2),
    }
}

/// Geometric density of one page.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LayoutDensity {
    pub page_number: Option<u32>,
    pub role: String,
    pub template: String,
    pub text_chars: usize,
    pub coverage_ratio: f64,
    pub content_groups: usize,
}

/// Bounding area in mm²; lines never cover anything.
pub fn element_area(element: &Element) -> f64 {
    if element.kind() == ElementKind::Line {
        return 0.0;
    }
    (element.w_mm * element.h_mm).max(0.0)
}

/// Key grouping overlapping elements: collision group, else id, else
/// `{type}-{index}`.
pub fn density_group_key(element: &Element, index: usize) -> String {
    let collision = element.collision_group.trim();
    if !collision.is_empty() {
        return collision.to_string();
    }
    let id = element.id.trim();
    if !id.is_empty() {
        return id.to_string();
    }
    let kind = if element.kind_name.is_empty() {
        "unknown"
    } else {
        element.kind_name.as_str()
    };
    format!("{kind}-{index}")
}

pub fn layout_density(page: &Page) -> LayoutDensity {
    let page_area = page.width_mm.max(1.0) * page.height_mm.max(1.0);

    let mut text_chars = 0;
    let mut groups: BTreeMap<String, f64> = BTreeMap::new();

    for (index, element) in page.elements.iter().enumerate() {
        if element.debug_only || COVERAGE_EXCLUDED_ROLES.contains(&element.role.as_str()) {
            continue;
        }

        if element.kind() == ElementKind::Text {
            text_chars += char_len(&collapse_whitespace(&element.text));
        }

        let area = element_area(element);
        if area <= 0.0 {
            continue;
        }
        let slot = groups.entry(density_group_key(element, index)).or_insert(0.0);
        *slot = slot.max(area);
    }

    let coverage: f64 = groups.values().sum::<f64>() / page_area;

    LayoutDensity {
        page_number: page.page_number,
        role: page.page_role.clone(),
        template: page.template_id.clone(),
        text_chars,
        coverage_ratio: round_to(coverage, 4),
        content_groups: groups.len(),
    }
}

/// Per-class minimums for [`LayoutDensity`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DensityFloor {
    pub min_text_chars: usize,
    pub min_coverage: f64,
    pub min_groups: usize,
}

/// Page classes that carry their own density floor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum PageClass {
    SectionDivider,
    TextOnly,
    General,
}

impl PageClass {
    pub fn of(density: &LayoutDensity) -> Self {
        let role = density.role.to_lowercase();
        if density.template.eq_ignore_ascii_case("SECTION_DIVIDER") || role == "section-divider" {
            PageClass::SectionDivider
        } else if role == "text-only" {
            PageClass::TextOnly
        } else {
            PageClass::General
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            PageClass::SectionDivider => "section-divider",
            PageClass::TextOnly => "text-only",
            PageClass::General => "general",
        }
    }
}

/// Role/template-specific density thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DensityPolicy {
    pub section_divider: DensityFloor,
    pub text_only: DensityFloor,
    pub general: DensityFloor,
}

impl Default for DensityPolicy {
    fn default() -> Self {
        Self {
            section_divider: DensityFloor {
                min_text_chars: 70,
                min_coverage: 0.22,
                min_groups: 3,
            },
            text_only: DensityFloor {
                min_text_chars: 78,
                min_coverage: 0.22,
                min_groups: 3,
            },
            general: DensityFloor {
                min_text_chars: 58,
                min_coverage: 0.18,
                min_groups: 2,
            },
        }
    }
}

impl DensityPolicy {
    pub fn floor(&self, class: PageClass) -> DensityFloor {
        match class {
            PageClass::SectionDivider => self.section_divider,
            PageClass::TextOnly => self.text_only,
            PageClass::General => self.general,
        }
    }

    /// `None` when the page meets its floor, otherwise the reason it does not.
    pub fn shortfall(&self, density: &LayoutDensity) -> Option<String> {
        let class = PageClass::of(density);
        let floor = self.floor(class);
        let below = density.text_chars < floor.min_text_chars
            || density.coverage_ratio < floor.min_coverage
            || density.content_groups < floor.min_groups;
        below.then(|| format!("{} density below threshold", class.label()))
    }
}
