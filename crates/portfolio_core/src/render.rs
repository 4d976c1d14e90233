//! crates/portfolio_core/src/render.rs
//!
//! Turns a published document into the visual tree the public page is drawn from.
//! Rendering is pure and only branches on the section type.

use serde::Serialize;

use crate::domain::{ImageUrl, PortfolioDocument, Section, SectionBody};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderedPage {
    pub title: String,
    pub description: String,
    pub username: String,
    pub theme: RenderedTheme,
    /// One block per renderable section, in document order. May be empty.
    pub blocks: Vec<Block>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderedTheme {
    pub primary_color: String,
    pub background_color: String,
    pub font_family: String,
    pub font_class: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Image {
    pub src: String,
    pub alt: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "layout", rename_all = "snake_case")]
pub enum Block {
    /// Centered heading with an optional round avatar above it.
    Hero {
        id: String,
        heading: String,
        body: String,
        avatar: Option<Image>,
    },
    /// Heading, text, then a full-width banner.
    Projects {
        id: String,
        heading: String,
        body: String,
        banner: Option<Image>,
    },
    /// Text beside an optional portrait.
    About {
        id: String,
        heading: String,
        body: String,
        portrait: Option<Image>,
    },
    Contact {
        id: String,
        heading: String,
        body: String,
    },
}

pub fn render(document: &PortfolioDocument) -> RenderedPage {
    RenderedPage {
        title: document.title.clone(),
        description: document.description.clone(),
        username: document.username.clone(),
        theme: RenderedTheme {
            primary_color: document.theme.primary_color.as_str().to_string(),
            background_color: document.theme.background_color.as_str().to_string(),
            font_family: document.theme.font_family.as_str().to_string(),
            font_class: document.theme.font_family.css_class().to_string(),
        },
        blocks: document.sections.iter().filter_map(render_section).collect(),
    }
}

fn render_section(section: &Section) -> Option<Block> {
    let id = section.id.as_str().to_string();
    let heading = section.title.clone();
    let body = section.content.clone();
    let image = |url: &Option<ImageUrl>, alt: &str| {
        url.as_ref().map(|url| Image {
            src: url.as_str().to_string(),
            alt: alt.to_string(),
        })
    };

    let block = match &section.body {
        SectionBody::Hero { image: url } => Block::Hero {
            avatar: image(url, "Hero"),
            id,
            heading,
            body,
        },
        SectionBody::Projects { image: url } => Block::Projects {
            banner: image(url, &section.title),
            id,
            heading,
            body,
        },
        SectionBody::About { image: url } => Block::About {
            portrait: image(url, &section.title),
            id,
            heading,
            body,
        },
        SectionBody::Contact => Block::Contact { id, heading, body },
        SectionBody::Unknown { .. } => return None,
    };
    Some(block)
}
