pub mod domain;
pub mod ports;
pub mod render;

pub use domain::{
    AuthSession, AuthUser, DocumentDraft, DocumentError, FontFamily, HexColor, ImageUrl,
    PortfolioDocument, Preset, Section, SectionBody, SectionId, SectionKind, SectionPatch, Theme,
};
pub use ports::{
    AuthError, AuthProvider, AuthResult, DocumentStore, PortError, PortResult,
    PublishedPortfolio,
};
pub use render::{render, Block, RenderedPage};
