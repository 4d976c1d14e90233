//! crates/portfolio_core/src/domain.rs
//!
//! Defines the pure, core data structures for the portfolio builder.
//! Every document operation returns a fresh document, leaving the input untouched,
//! so callers can hold on to earlier snapshots while newer ones are produced.

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;
use url::Url;
use uuid::Uuid;

use crate::ports::AuthError;

static HEX_COLOR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^#(?:[0-9a-fA-F]{3}|[0-9a-fA-F]{6})$").expect("hex color pattern is valid")
});

static USERNAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9._-]{1,64}$").expect("username pattern is valid"));

pub const MIN_PASSWORD_LEN: usize = 6;

const DEFAULT_USERNAME: &str = "creator";

//=========================================================================================
// Document Errors
//=========================================================================================

/// Rejections produced by document operations. The document is never left half-edited.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DocumentError {
    #[error("Section {0} not found")]
    SectionNotFound(SectionId),
    #[error("Section {0} already exists")]
    DuplicateSection(SectionId),
    #[error("A {0} section does not take an image")]
    ImageNotSupported(String),
    #[error("'{0}' is not an http(s) image URL")]
    InvalidImageUrl(String),
    #[error("'{0}' is not a valid username (1-64 letters, digits, '.', '_' or '-')")]
    InvalidUsername(String),
    #[error("'{0}' is not a hex color")]
    InvalidColor(String),
}

//=========================================================================================
// Sections
//=========================================================================================

/// Opaque section identifier, unique within one document.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SectionId(String);

impl SectionId {
    fn generate(kind: SectionKind) -> Self {
        Self(format!("{}-{}", kind.as_str(), Uuid::new_v4().simple()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for SectionId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for SectionId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for SectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The four layouts a section can take.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SectionKind {
    Hero,
    Projects,
    About,
    Contact,
}

impl SectionKind {
    pub const ALL: [SectionKind; 4] = [Self::Hero, Self::Projects, Self::About, Self::Contact];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Hero => "hero",
            Self::Projects => "projects",
            Self::About => "about",
            Self::Contact => "contact",
        }
    }

    /// Default (title, content) a freshly added section starts with.
    pub fn template(self) -> (&'static str, &'static str) {
        match self {
            Self::Hero => (
                "Welcome to my portfolio",
                "I'm a creative developer building amazing things.",
            ),
            Self::Projects => ("My Projects", "Here are some of my best works..."),
            Self::About => (
                "About Me",
                "I'm passionate about creating digital experiences.",
            ),
            Self::Contact => ("Get in Touch", "Feel free to reach out to me."),
        }
    }
}

impl FromStr for SectionKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| format!("unknown section type '{}'", s))
    }
}

/// An absolute http(s) URL pointing at an image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageUrl(String);

impl ImageUrl {
    /// Parses user input. Blank input means "no image".
    pub fn parse(raw: &str) -> Result<Option<Self>, DocumentError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Ok(None);
        }
        let url =
            Url::parse(trimmed).map_err(|_| DocumentError::InvalidImageUrl(trimmed.to_string()))?;
        match url.scheme() {
            "http" | "https" => Ok(Some(Self(trimmed.to_string()))),
            _ => Err(DocumentError::InvalidImageUrl(trimmed.to_string())),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Type-specific payload of a section. Contact sections cannot hold an image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SectionBody {
    Hero { image: Option<ImageUrl> },
    Projects { image: Option<ImageUrl> },
    About { image: Option<ImageUrl> },
    Contact,
    /// A stored section whose type this build does not know. Kept so that
    /// re-saving the document does not drop it; never rendered.
    Unknown { type_name: String },
}

impl SectionBody {
    fn empty(kind: SectionKind) -> Self {
        match kind {
            SectionKind::Hero => Self::Hero { image: None },
            SectionKind::Projects => Self::Projects { image: None },
            SectionKind::About => Self::About { image: None },
            SectionKind::Contact => Self::Contact,
        }
    }

    pub fn kind(&self) -> Option<SectionKind> {
        match self {
            Self::Hero { .. } => Some(SectionKind::Hero),
            Self::Projects { .. } => Some(SectionKind::Projects),
            Self::About { .. } => Some(SectionKind::About),
            Self::Contact => Some(SectionKind::Contact),
            Self::Unknown { .. } => None,
        }
    }

    pub fn type_name(&self) -> &str {
        match self {
            Self::Unknown { type_name } => type_name,
            known => known.kind().map(SectionKind::as_str).unwrap_or_default(),
        }
    }

    pub fn image(&self) -> Option<&ImageUrl> {
        match self {
            Self::Hero { image } | Self::Projects { image } | Self::About { image } => {
                image.as_ref()
            }
            Self::Contact | Self::Unknown { .. } => None,
        }
    }
}

/// One content block of a portfolio.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "SectionRecord", into = "SectionRecord")]
pub struct Section {
    pub id: SectionId,
    pub title: String,
    pub content: String,
    pub body: SectionBody,
}

impl Section {
    /// Creates a section of `kind` pre-filled from its template, with a fresh id.
    pub fn from_template(kind: SectionKind) -> Self {
        let (title, content) = kind.template();
        Self {
            id: SectionId::generate(kind),
            title: title.to_string(),
            content: content.to_string(),
            body: SectionBody::empty(kind),
        }
    }

    pub fn kind(&self) -> Option<SectionKind> {
        self.body.kind()
    }

    fn patched(&self, patch: &SectionPatch) -> Result<Self, DocumentError> {
        let mut next = self.clone();
        if let Some(title) = &patch.title {
            next.title = title.clone();
        }
        if let Some(content) = &patch.content {
            next.content = content.clone();
        }
        if let Some(raw) = &patch.image {
            let parsed = ImageUrl::parse(raw)?;
            match &mut next.body {
                SectionBody::Hero { image }
                | SectionBody::Projects { image }
                | SectionBody::About { image } => *image = parsed,
                other => {
                    return Err(DocumentError::ImageNotSupported(other.type_name().to_string()))
                }
            }
        }
        Ok(next)
    }
}

/// Partial update of a section. `None` leaves a field alone; an empty image clears it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SectionPatch {
    pub title: Option<String>,
    pub content: Option<String>,
    pub image: Option<String>,
}

/// Flat storage shape: `{id, type, title, content, image?}`.
#[derive(Debug, Serialize, Deserialize)]
struct SectionRecord {
    id: String,
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    image: Option<String>,
}

impl From<SectionRecord> for Section {
    fn from(record: SectionRecord) -> Self {
        // A malformed stored URL is dropped rather than failing the whole document.
        let image = record
            .image
            .as_deref()
            .and_then(|raw| ImageUrl::parse(raw).ok().flatten());
        let body = match record.kind.parse::<SectionKind>() {
            Ok(SectionKind::Hero) => SectionBody::Hero { image },
            Ok(SectionKind::Projects) => SectionBody::Projects { image },
            Ok(SectionKind::About) => SectionBody::About { image },
            Ok(SectionKind::Contact) => SectionBody::Contact,
            Err(_) => SectionBody::Unknown {
                type_name: record.kind,
            },
        };
        Self {
            id: SectionId(record.id),
            title: record.title,
            content: record.content,
            body,
        }
    }
}

impl Section {
    /// Strict reading of a submitted section: a bad image URL, or an image on a
    /// section that cannot show one, is an error instead of being dropped.
    fn from_submitted(record: SectionRecord) -> Result<Self, DocumentError> {
        let image = match record.image.as_deref() {
            Some(raw) => ImageUrl::parse(raw)?,
            None => None,
        };
        let body = match record.kind.parse::<SectionKind>() {
            Ok(SectionKind::Hero) => SectionBody::Hero { image },
            Ok(SectionKind::Projects) => SectionBody::Projects { image },
            Ok(SectionKind::About) => SectionBody::About { image },
            Ok(SectionKind::Contact) | Err(_) if image.is_some() => {
                return Err(DocumentError::ImageNotSupported(record.kind));
            }
            Ok(SectionKind::Contact) => SectionBody::Contact,
            Err(_) => SectionBody::Unknown {
                type_name: record.kind,
            },
        };
        Ok(Self {
            id: SectionId(record.id),
            title: record.title,
            content: record.content,
            body,
        })
    }
}

impl From<Section> for SectionRecord {
    fn from(section: Section) -> Self {
        Self {
            id: section.id.0,
            kind: section.body.type_name().to_string(),
            title: section.title,
            content: section.content,
            image: section.body.image().map(|url| url.0.clone()),
        }
    }
}

//=========================================================================================
// Theme & Presets
//=========================================================================================

/// A `#rgb` or `#rrggbb` color.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct HexColor(String);

impl HexColor {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for HexColor {
    type Error = DocumentError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        if HEX_COLOR.is_match(&value) {
            Ok(Self(value))
        } else {
            Err(DocumentError::InvalidColor(value))
        }
    }
}

impl FromStr for HexColor {
    type Err = DocumentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::try_from(s.to_string())
    }
}

impl From<HexColor> for String {
    fn from(color: HexColor) -> Self {
        color.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FontFamily {
    #[serde(rename = "Space Grotesk")]
    SpaceGrotesk,
    Inter,
    Poppins,
}

impl FontFamily {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::SpaceGrotesk => "Space Grotesk",
            Self::Inter => "Inter",
            Self::Poppins => "Poppins",
        }
    }

    pub fn css_class(self) -> &'static str {
        match self {
            Self::SpaceGrotesk => "font-grotesk",
            Self::Inter => "font-sans",
            Self::Poppins => "font-poppins",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Theme {
    pub primary_color: HexColor,
    pub background_color: HexColor,
    pub font_family: FontFamily,
}

impl Theme {
    fn new(primary: &str, background: &str, font_family: FontFamily) -> Self {
        Self {
            primary_color: HexColor(primary.to_string()),
            background_color: HexColor(background.to_string()),
            font_family,
        }
    }
}

impl Default for Theme {
    fn default() -> Self {
        Self::new("#6FC3DF", "#0A0A0A", FontFamily::SpaceGrotesk)
    }
}

/// Starting looks offered on the landing page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Preset {
    DevBuilder,
    ArtistLight,
    MinimalPro,
    ShowcaseClassic,
    Custom,
}

impl Preset {
    pub const ALL: [Preset; 5] = [
        Self::DevBuilder,
        Self::ArtistLight,
        Self::MinimalPro,
        Self::ShowcaseClassic,
        Self::Custom,
    ];

    pub fn id(self) -> &'static str {
        match self {
            Self::DevBuilder => "dev-builder",
            Self::ArtistLight => "artist-light",
            Self::MinimalPro => "minimal-pro",
            Self::ShowcaseClassic => "showcase-classic",
            Self::Custom => "custom",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::DevBuilder => "Dev Builder",
            Self::ArtistLight => "Artist Light",
            Self::MinimalPro => "Minimal Pro",
            Self::ShowcaseClassic => "Showcase Classic",
            Self::Custom => "Custom",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Self::DevBuilder => "Perfect for Roblox creators and game developers",
            Self::ArtistLight => "Bright, minimal design with focus on visual work",
            Self::MinimalPro => "Clean, professional CV-style portfolio",
            Self::ShowcaseClassic => "Bold layouts with animated project showcases",
            Self::Custom => "Start blank and design your own",
        }
    }

    /// The theme this preset installs. `Custom` keeps whatever theme is already there.
    pub fn theme(self) -> Option<Theme> {
        match self {
            Self::DevBuilder => Some(Theme::default()),
            Self::ArtistLight => Some(Theme::new("#FF8CBA", "#F9F9FB", FontFamily::Poppins)),
            Self::MinimalPro => Some(Theme::new("#6FC3DF", "#FFFFFF", FontFamily::Inter)),
            Self::ShowcaseClassic => Some(Theme::new(
                "#C0A7FF",
                "#0A0A0A",
                FontFamily::SpaceGrotesk,
            )),
            Self::Custom => None,
        }
    }
}

impl FromStr for Preset {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|preset| preset.id() == s)
            .ok_or_else(|| format!("unknown preset '{}'", s))
    }
}

//=========================================================================================
// Portfolio Document
//=========================================================================================

/// The whole editable portfolio, stored and published as one record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioDocument {
    pub title: String,
    pub description: String,
    pub username: String,
    #[serde(default)]
    pub sections: Vec<Section>,
    pub theme: Theme,
    /// Assigned by the store on every write.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl PortfolioDocument {
    /// The document a brand new user starts editing: default metadata and one hero section.
    pub fn starter(display_name: Option<&str>) -> Self {
        Self {
            title: "My Portfolio".to_string(),
            description: "Welcome to my creative universe".to_string(),
            username: default_username(display_name),
            sections: vec![Section::from_template(SectionKind::Hero)],
            theme: Theme::default(),
            updated_at: None,
        }
    }

    pub fn section(&self, id: &SectionId) -> Option<&Section> {
        self.sections.iter().find(|s| &s.id == id)
    }

    fn position(&self, id: &SectionId) -> Result<usize, DocumentError> {
        self.sections
            .iter()
            .position(|s| &s.id == id)
            .ok_or_else(|| DocumentError::SectionNotFound(id.clone()))
    }

    /// Appends `section` at the end of the list.
    pub fn with_section(&self, section: Section) -> Result<Self, DocumentError> {
        if self.section(&section.id).is_some() {
            return Err(DocumentError::DuplicateSection(section.id));
        }
        let mut next = self.clone();
        next.sections.push(section);
        Ok(next)
    }

    pub fn with_section_updated(
        &self,
        id: &SectionId,
        patch: &SectionPatch,
    ) -> Result<Self, DocumentError> {
        let index = self.position(id)?;
        let updated = self.sections[index].patched(patch)?;
        let mut next = self.clone();
        next.sections[index] = updated;
        Ok(next)
    }

    pub fn without_section(&self, id: &SectionId) -> Result<Self, DocumentError> {
        let index = self.position(id)?;
        let mut next = self.clone();
        next.sections.remove(index);
        Ok(next)
    }

    /// Moves a section to `to`; indices past the end move it last.
    pub fn with_section_moved(&self, id: &SectionId, to: usize) -> Result<Self, DocumentError> {
        let from = self.position(id)?;
        let mut next = self.clone();
        let section = next.sections.remove(from);
        let to = to.min(next.sections.len());
        next.sections.insert(to, section);
        Ok(next)
    }

    pub fn with_title(&self, title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..self.clone()
        }
    }

    pub fn with_description(&self, description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            ..self.clone()
        }
    }

    pub fn with_username(&self, username: &str) -> Result<Self, DocumentError> {
        let username = validate_username(username)?;
        Ok(Self {
            username,
            ..self.clone()
        })
    }

    pub fn with_theme(&self, theme: Theme) -> Self {
        Self {
            theme,
            ..self.clone()
        }
    }

    /// Checks the invariants every operation above maintains: section ids are
    /// unique and the username is a valid handle.
    pub fn validate(&self) -> Result<(), DocumentError> {
        let mut seen = HashSet::new();
        if let Some(dup) = self.sections.iter().find(|s| !seen.insert(&s.id)) {
            return Err(DocumentError::DuplicateSection(dup.id.clone()));
        }
        if validate_username(&self.username)? != self.username {
            return Err(DocumentError::InvalidUsername(self.username.clone()));
        }
        Ok(())
    }

    pub fn with_preset(&self, preset: Preset) -> Self {
        match preset.theme() {
            Some(theme) => self.with_theme(theme),
            None => self.clone(),
        }
    }
}

/// A whole document as submitted for an explicit save.
///
/// Stored documents are read leniently, but a draft is checked the way editor
/// mutations are before it may replace what is stored.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentDraft {
    title: String,
    description: String,
    username: String,
    #[serde(default)]
    sections: Vec<SectionRecord>,
    theme: Theme,
}

impl TryFrom<DocumentDraft> for PortfolioDocument {
    type Error = DocumentError;

    fn try_from(draft: DocumentDraft) -> Result<Self, Self::Error> {
        let sections = draft
            .sections
            .into_iter()
            .map(Section::from_submitted)
            .collect::<Result<Vec<_>, _>>()?;
        let document = Self {
            title: draft.title,
            description: draft.description,
            username: validate_username(&draft.username)?,
            sections,
            theme: draft.theme,
            updated_at: None,
        };
        document.validate()?;
        Ok(document)
    }
}

/// Trims and checks a public handle.
pub fn validate_username(raw: &str) -> Result<String, DocumentError> {
    let trimmed = raw.trim();
    if USERNAME.is_match(trimmed) {
        Ok(trimmed.to_string())
    } else {
        Err(DocumentError::InvalidUsername(raw.to_string()))
    }
}

/// Derives a handle from a display name: lowercased, whitespace turned into `-`,
/// other unsupported characters dropped. Falls back to "creator".
pub fn default_username(display_name: Option<&str>) -> String {
    let slug: String = display_name
        .unwrap_or_default()
        .trim()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("-")
        .to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
        .take(64)
        .collect();
    if slug.is_empty() {
        DEFAULT_USERNAME.to_string()
    } else {
        slug
    }
}

//=========================================================================================
// Accounts
//=========================================================================================

/// The signed-in user as reported by the auth provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthUser {
    pub uid: Uuid,
    pub display_name: Option<String>,
    pub email: String,
}

/// A browser login session (auth cookie).
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub token: String,
    pub user: AuthUser,
    pub expires_at: DateTime<Utc>,
}

/// Sign-up checks shared by every auth provider.
pub fn check_new_credentials(email: &str, password: &str) -> Result<(), AuthError> {
    let email = email.trim();
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && domain.contains('.') => {}
        _ => return Err(AuthError::InvalidEmail),
    }
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AuthError::WeakPassword);
    }
    Ok(())
}
