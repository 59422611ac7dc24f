//! Arrangement data models: assignable items, sections, and the load/save aggregate.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Competition identifier as issued by the tournament backend
pub type CompetitionId = String;

/// Athlete or team entry identifier
pub type ItemId = String;

/// Section key (the content/category id the section corresponds to)
pub type SectionId = String;

/// Content type an arrangement is scoped to
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ContentType {
    /// Forms (quyen) events
    #[default]
    Quyen,
    /// Music performance events
    Music,
}

impl ContentType {
    /// Wire name of the content type
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentType::Quyen => "QUYEN",
            ContentType::Music => "MUSIC",
        }
    }

    /// File name used when exporting the running order
    pub fn export_file_name(&self) -> String {
        format!("order-{}.json", self.as_str().to_lowercase())
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContentType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "quyen" | "forms" => Ok(ContentType::Quyen),
            "music" => Ok(ContentType::Music),
            other => Err(format!("Unknown content type '{}'", other)),
        }
    }
}

/// Kind of assignable entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ItemKind {
    /// Individual competitor
    Athlete,
    /// Team entry
    Team,
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ItemKind::Athlete => f.write_str("athlete"),
            ItemKind::Team => f.write_str("team"),
        }
    }
}

/// Gender category of an entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
    Mixed,
}

impl Gender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Male => "male",
            Gender::Female => "female",
            Gender::Mixed => "mixed",
        }
    }
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Gender {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "male" | "m" => Ok(Gender::Male),
            "female" | "f" => Ok(Gender::Female),
            "mixed" => Ok(Gender::Mixed),
            other => Err(format!("Unknown gender '{}'", other)),
        }
    }
}

/// Member of a team entry. Read-only metadata, never placed on its own.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamMember {
    pub name: String,
    pub gender: Gender,
    #[serde(default)]
    pub student_code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub form_label: Option<String>,
}

/// A competitor or team that can be placed into a section
///
/// Placement attributes (`section_id`, `order_index`) are only present while the
/// item sits in a section. Pool items carry neither.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignableItem {
    pub id: ItemId,
    pub kind: ItemKind,
    pub name: String,
    pub gender: Gender,
    #[serde(default)]
    pub student_code: String,
    /// Form/style label, only meaningful for forms content
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub form_label: Option<String>,
    pub content_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub section_id: Option<SectionId>,
    /// 1-based position inside the section
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_index: Option<u32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub members: Vec<TeamMember>,
}

impl AssignableItem {
    /// Create an unplaced athlete entry
    pub fn athlete(
        id: impl Into<ItemId>,
        name: impl Into<String>,
        gender: Gender,
        content_id: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            kind: ItemKind::Athlete,
            name: name.into(),
            gender,
            student_code: String::new(),
            form_label: None,
            content_id: content_id.into(),
            section_id: None,
            order_index: None,
            members: Vec::new(),
        }
    }

    /// Create an unplaced team entry
    pub fn team(
        id: impl Into<ItemId>,
        name: impl Into<String>,
        gender: Gender,
        content_id: impl Into<String>,
        members: Vec<TeamMember>,
    ) -> Self {
        Self {
            kind: ItemKind::Team,
            members,
            ..Self::athlete(id, name, gender, content_id)
        }
    }

    pub fn with_student_code(mut self, code: impl Into<String>) -> Self {
        self.student_code = code.into();
        self
    }

    pub fn with_form_label(mut self, label: impl Into<String>) -> Self {
        self.form_label = Some(label.into());
        self
    }

    pub fn is_placed(&self) -> bool {
        self.section_id.is_some()
    }

    /// Mark the item as sitting at `order_index` inside `section_id`
    pub fn place(&mut self, section_id: &str, order_index: u32) {
        self.section_id = Some(section_id.to_string());
        self.order_index = Some(order_index);
    }

    /// Strip placement attributes before the item returns to the pool
    pub fn clear_placement(&mut self) {
        self.section_id = None;
        self.order_index = None;
    }
}

/// One ordered line-up for a content/category
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Section {
    /// Content id, doubles as the section key
    pub content_id: SectionId,
    pub name: String,
    #[serde(default)]
    pub items: Vec<AssignableItem>,
}

impl Section {
    /// Create an empty section
    pub fn new(content_id: impl Into<SectionId>, name: impl Into<String>) -> Self {
        Self {
            content_id: content_id.into(),
            name: name.into(),
            items: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Position (0-based) of an item inside the line-up
    pub fn position(&self, item_id: &str) -> Option<usize> {
        self.items.iter().position(|item| item.id == item_id)
    }

    pub fn contains(&self, item_id: &str) -> bool {
        self.position(item_id).is_some()
    }
}

/// Pool plus sections, the unit of load and randomize responses
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Arrangement {
    #[serde(default)]
    pub pool: Vec<AssignableItem>,
    #[serde(default)]
    pub sections: Vec<Section>,
}

impl Arrangement {
    /// Every item in the arrangement, pool first
    pub fn all_items(&self) -> impl Iterator<Item = &AssignableItem> {
        self.pool
            .iter()
            .chain(self.sections.iter().flat_map(|section| section.items.iter()))
    }
}

/// Catalog entry describing a content/category of a competition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentItem {
    pub id: String,
    pub name: String,
}

/// Competition and content type the store operates on
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Scope {
    pub competition_id: Option<CompetitionId>,
    pub content_type: ContentType,
}

/// Optional narrowing applied to randomize requests and pool views
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemFilters {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gender: Option<Gender>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub form_label: Option<String>,
}

impl ItemFilters {
    pub fn is_empty(&self) -> bool {
        self.gender.is_none() && self.form_label.is_none()
    }

    /// Whether an item passes every filter that is set
    pub fn matches(&self, item: &AssignableItem) -> bool {
        let gender_ok = self.gender.is_none_or(|gender| item.gender == gender);
        let form_ok = self
            .form_label
            .as_deref()
            .is_none_or(|label| item.form_label.as_deref() == Some(label));
        gender_ok && form_ok
    }
}

/// Randomize request body (minus the competition id, which scopes the call)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RandomizeRequest {
    pub content_type: ContentType,
    /// `false` asks for registration order instead of a random draw
    pub randomize: bool,
    #[serde(flatten)]
    pub filters: ItemFilters,
}

/// Placement of one item as sent on save
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemPlacement {
    pub id: ItemId,
    pub kind: ItemKind,
    pub order_index: u32,
}

/// Ordered contents of one section as sent on save
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionOrder {
    pub content_id: SectionId,
    pub items: Vec<ItemPlacement>,
}

/// Save request body (minus the competition id)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveArrangement {
    pub content_type: ContentType,
    pub sections: Vec<SectionOrder>,
}

/// Downloadable running-order file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportSnapshot {
    /// `order-{contenttype}.json`
    pub file_name: String,
    /// Pretty-printed `{contentType, sections}` document
    pub contents: String,
}

/// Document body of an export file
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ExportDocument<'a> {
    pub content_type: ContentType,
    pub sections: Vec<&'a Section>,
}
