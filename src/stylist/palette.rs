//! Built-in refinement swatches offered by the front-end.

use crate::stylist::selection::SunglassesStyle;

pub const HAIR_COLORS: [&str; 20] = [
    "#000000", "#2C1608", "#4E342E", "#D7CCC8", "#FFECB3", "#E65100", "#BF360C", "#B71C1C",
    "#4A148C", "#311B92", "#1A237E", "#0D47A1", "#01579B", "#006064", "#004D40", "#1B5E20",
    "#F57F17", "#FF6F00", "#E91E63", "#9C27B0",
];

pub const LIP_COLORS: [&str; 15] = [
    "#D50000", "#C51162", "#AA00FF", "#6200EA", "#B01212", "#E05D5D", "#F48FB1", "#CE93D8",
    "#FF4081", "#FF5252", "#FF7999", "#D93059", "#B73E3E", "#912B2B", "#791E1E",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SunglassesOption {
    pub name: &'static str,
    pub prompt: &'static str,
}

impl SunglassesOption {
    pub fn style(&self) -> SunglassesStyle {
        SunglassesStyle::from_prompt(self.prompt)
    }
}

pub const SUNGLASSES: [SunglassesOption; 4] = [
    SunglassesOption {
        name: "None",
        prompt: SunglassesStyle::NONE_SENTINEL,
    },
    SunglassesOption {
        name: "Aviator",
        prompt: "classic aviator sunglasses",
    },
    SunglassesOption {
        name: "Wayfarer",
        prompt: "classic wayfarer sunglasses",
    },
    SunglassesOption {
        name: "Round",
        prompt: "round John Lennon style sunglasses",
    },
];

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("no swatch #{index} ({first}-{last})")]
pub struct UnknownSwatch {
    pub index: String,
    pub first: usize,
    pub last: usize,
}

fn is_swatch_index(value: &str) -> bool {
    !value.is_empty() && value.bytes().all(|byte| byte.is_ascii_digit())
}

/// Resolves a 1-based swatch index or a literal color value. Digit-only input
/// must name an existing swatch.
pub fn resolve_color(palette: &[&str], value: &str) -> Result<String, UnknownSwatch> {
    let trimmed = value.trim();
    if !is_swatch_index(trimmed) {
        return Ok(trimmed.to_string());
    }
    trimmed
        .parse::<usize>()
        .ok()
        .and_then(|index| index.checked_sub(1))
        .and_then(|index| palette.get(index))
        .map(|color| color.to_string())
        .ok_or_else(|| UnknownSwatch {
            index: trimmed.to_string(),
            first: 1,
            last: palette.len(),
        })
}

/// Sunglasses options are numbered from 0, matching the help listing.
/// `none` and free text are also accepted.
pub fn resolve_sunglasses(value: &str) -> Result<SunglassesStyle, UnknownSwatch> {
    let trimmed = value.trim();
    if trimmed.eq_ignore_ascii_case("none") {
        return Ok(SunglassesStyle::None);
    }
    if !is_swatch_index(trimmed) {
        return Ok(SunglassesStyle::from_prompt(trimmed));
    }
    trimmed
        .parse::<usize>()
        .ok()
        .and_then(|index| SUNGLASSES.get(index))
        .map(SunglassesOption::style)
        .ok_or_else(|| UnknownSwatch {
            index: trimmed.to_string(),
            first: 0,
            last: SUNGLASSES.len() - 1,
        })
}
