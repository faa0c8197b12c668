//! Pure mapping from theme + reveal state to per-item presentation values.

use std::{fmt, str::FromStr, time::Duration};

use serde::{Deserialize, Serialize};

use crate::stagger::stagger_delay;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Palette {
    pub name: &'static str,
    pub background: &'static str,
    pub surface: &'static str,
    pub text: &'static str,
    pub muted_text: &'static str,
    pub accent: &'static str,
    pub border: &'static str,
}

pub const DARK_PALETTE: Palette = Palette {
    name: "dark",
    background: "#0f172a",
    surface: "#1e293b",
    text: "#f8fafc",
    muted_text: "#94a3b8",
    accent: "#38bdf8",
    border: "#334155",
};

pub const LIGHT_PALETTE: Palette = Palette {
    name: "light",
    background: "#ffffff",
    surface: "#f1f5f9",
    text: "#0f172a",
    muted_text: "#475569",
    accent: "#0284c7",
    border: "#e2e8f0",
};

pub fn palette_for(is_dark_mode: bool) -> &'static Palette {
    if is_dark_mode {
        &DARK_PALETTE
    } else {
        &LIGHT_PALETTE
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Transform {
    Identity,
    TranslateX { px: f32 },
    TranslateY { px: f32 },
}

impl fmt::Display for Transform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Transform::Identity => f.write_str("none"),
            Transform::TranslateX { px } => write!(f, "translateX({px}px)"),
            Transform::TranslateY { px } => write!(f, "translateY({px}px)"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ResolvedStyle {
    pub palette: &'static Palette,
    pub transform: Transform,
    pub opacity: f32,
    pub transition_delay_seconds: f64,
}

impl ResolvedStyle {
    pub fn css_transform(&self) -> String {
        self.transform.to_string()
    }
}

/// Resolver bound to one call site's hidden-state offset.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StyleResolver {
    offset: Transform,
}

impl StyleResolver {
    pub fn new(offset: Transform) -> Self {
        Self { offset }
    }

    pub fn offset(&self) -> Transform {
        self.offset
    }

    pub fn resolve(
        &self,
        is_dark_mode: bool,
        is_revealed: bool,
        index: usize,
        base_delay: Duration,
    ) -> ResolvedStyle {
        ResolvedStyle {
            palette: palette_for(is_dark_mode),
            transform: if is_revealed {
                Transform::Identity
            } else {
                self.offset
            },
            opacity: if is_revealed { 1.0 } else { 0.0 },
            transition_delay_seconds: stagger_delay(index, base_delay).as_secs_f64(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Section {
    About,
    Government,
    Internships,
    Mentors,
    Partners,
    Team,
    Testimonials,
}

impl Section {
    pub const ALL: [Section; 7] = [
        Section::About,
        Section::Government,
        Section::Internships,
        Section::Mentors,
        Section::Partners,
        Section::Team,
        Section::Testimonials,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Section::About => "about",
            Section::Government => "government",
            Section::Internships => "internships",
            Section::Mentors => "mentors",
            Section::Partners => "partners",
            Section::Team => "team",
            Section::Testimonials => "testimonials",
        }
    }
}

impl FromStr for Section {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Section::ALL
            .into_iter()
            .find(|section| section.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown section '{s}'"))
    }
}

/// Reveal parameters of one call site.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SectionStyle {
    pub base_interval_ms: u64,
    pub offset: Transform,
}

impl SectionStyle {
    pub const fn new(base_interval_ms: u64, offset: Transform) -> Self {
        Self {
            base_interval_ms,
            offset,
        }
    }

    pub fn base_interval(&self) -> Duration {
        Duration::from_millis(self.base_interval_ms)
    }

    pub fn resolver(&self) -> StyleResolver {
        StyleResolver::new(self.offset)
    }

    pub fn resolve(&self, is_dark_mode: bool, is_revealed: bool, index: usize) -> ResolvedStyle {
        self.resolver()
            .resolve(is_dark_mode, is_revealed, index, self.base_interval())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SectionStyles {
    pub about: SectionStyle,
    pub government: SectionStyle,
    pub internships: SectionStyle,
    pub mentors: SectionStyle,
    pub partners: SectionStyle,
    pub team: SectionStyle,
    pub testimonials: SectionStyle,
}

impl Default for SectionStyles {
    fn default() -> Self {
        Self {
            about: SectionStyle::new(300, Transform::TranslateY { px: 40.0 }),
            government: SectionStyle::new(1000, Transform::TranslateX { px: -100.0 }),
            internships: SectionStyle::new(200, Transform::TranslateX { px: -100.0 }),
            mentors: SectionStyle::new(150, Transform::TranslateY { px: 50.0 }),
            partners: SectionStyle::new(150, Transform::TranslateY { px: 20.0 }),
            team: SectionStyle::new(200, Transform::TranslateY { px: 30.0 }),
            testimonials: SectionStyle::new(300, Transform::TranslateX { px: -50.0 }),
        }
    }
}

impl SectionStyles {
    pub fn get(&self, section: Section) -> SectionStyle {
        match section {
            Section::About => self.about,
            Section::Government => self.government,
            Section::Internships => self.internships,
            Section::Mentors => self.mentors,
            Section::Partners => self.partners,
            Section::Team => self.team,
            Section::Testimonials => self.testimonials,
        }
    }
}

#[cfg(test)]
#[path = "tests/style_tests.rs"]
mod tests;
