use std::fmt;
use std::str::FromStr;

const CATEGORY_COUNT: usize = 12;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StyleCategory {
    Hairstyle,
    Makeup,
    Jewelry,
    Clothing,
    Glasses,
    Earrings,
    Necklace,
    WatchBracelet,
    ShoesSocks,
    Hat,
    Tattoo,
    Handbag,
}

impl StyleCategory {
    pub const ALL: [StyleCategory; CATEGORY_COUNT] = [
        StyleCategory::Hairstyle,
        StyleCategory::Makeup,
        StyleCategory::Jewelry,
        StyleCategory::Clothing,
        StyleCategory::Glasses,
        StyleCategory::Earrings,
        StyleCategory::Necklace,
        StyleCategory::WatchBracelet,
        StyleCategory::ShoesSocks,
        StyleCategory::Hat,
        StyleCategory::Tattoo,
        StyleCategory::Handbag,
    ];

    pub fn key(self) -> &'static str {
        match self {
            StyleCategory::Hairstyle => "hairstyle",
            StyleCategory::Makeup => "makeup",
            StyleCategory::Jewelry => "jewelry",
            StyleCategory::Clothing => "clothing",
            StyleCategory::Glasses => "glasses",
            StyleCategory::Earrings => "earrings",
            StyleCategory::Necklace => "necklace",
            StyleCategory::WatchBracelet => "watch_bracelet",
            StyleCategory::ShoesSocks => "shoes_socks",
            StyleCategory::Hat => "hat",
            StyleCategory::Tattoo => "tattoo",
            StyleCategory::Handbag => "handbag",
        }
    }

    /// Label used when naming the category to the model.
    pub fn label(self) -> &'static str {
        match self {
            StyleCategory::Hairstyle => "hairstyle",
            StyleCategory::Makeup => "makeup",
            StyleCategory::Jewelry => "jewelry",
            StyleCategory::Clothing => "clothing",
            StyleCategory::Glasses => "glasses",
            StyleCategory::Earrings => "earrings",
            StyleCategory::Necklace => "necklace",
            StyleCategory::WatchBracelet => "watch or bracelet",
            StyleCategory::ShoesSocks => "shoes and socks",
            StyleCategory::Hat => "hat",
            StyleCategory::Tattoo => "tattoos",
            StyleCategory::Handbag => "handbag",
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for StyleCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown style category '{0}'")]
pub struct UnknownCategory(pub String);

impl FromStr for StyleCategory {
    type Err = UnknownCategory;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_lowercase().replace(['-', ' '], "_");
        StyleCategory::ALL
            .into_iter()
            .find(|category| category.key() == normalized)
            .ok_or_else(|| UnknownCategory(value.trim().to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StyleSelection {
    enabled: [bool; CATEGORY_COUNT],
}

impl Default for StyleSelection {
    fn default() -> Self {
        let mut selection = Self::none();
        selection.set(StyleCategory::Hairstyle, true);
        selection.set(StyleCategory::Makeup, true);
        selection
    }
}

impl StyleSelection {
    pub fn none() -> Self {
        Self {
            enabled: [false; CATEGORY_COUNT],
        }
    }

    pub fn of(categories: &[StyleCategory]) -> Self {
        let mut selection = Self::none();
        for category in categories {
            selection.set(*category, true);
        }
        selection
    }

    pub fn is_enabled(&self, category: StyleCategory) -> bool {
        self.enabled[category.index()]
    }

    pub fn set(&mut self, category: StyleCategory, enabled: bool) {
        self.enabled[category.index()] = enabled;
    }

    /// Flips one category and returns its new value.
    pub fn toggle(&mut self, category: StyleCategory) -> bool {
        let slot = &mut self.enabled[category.index()];
        *slot = !*slot;
        *slot
    }

    pub fn any_enabled(&self) -> bool {
        self.enabled.iter().any(|enabled| *enabled)
    }

    pub fn enabled_categories(&self) -> impl Iterator<Item = StyleCategory> + '_ {
        StyleCategory::ALL
            .into_iter()
            .filter(|category| self.is_enabled(*category))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SunglassesStyle {
    #[default]
    None,
    Style(String),
}

impl SunglassesStyle {
    pub const NONE_SENTINEL: &'static str = "no sunglasses";

    /// Maps the "no sunglasses" sentinel and blank input to `None`.
    pub fn from_prompt(prompt: &str) -> Self {
        let trimmed = prompt.trim();
        if trimmed.is_empty() || trimmed.eq_ignore_ascii_case(Self::NONE_SENTINEL) {
            SunglassesStyle::None
        } else {
            SunglassesStyle::Style(trimmed.to_string())
        }
    }

    pub fn as_prompt(&self) -> &str {
        match self {
            SunglassesStyle::None => Self::NONE_SENTINEL,
            SunglassesStyle::Style(style) => style,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RefinementSelection {
    pub hair_color: Option<String>,
    pub lipstick_color: Option<String>,
    pub sunglasses: SunglassesStyle,
}

impl RefinementSelection {
    pub fn is_default(&self) -> bool {
        *self == RefinementSelection::default()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefinementField {
    HairColor(String),
    LipstickColor(String),
    Sunglasses(SunglassesStyle),
}

impl RefinementSelection {
    /// Colors toggle: choosing the selected color again clears it.
    pub fn apply(&mut self, field: RefinementField) {
        match field {
            RefinementField::HairColor(color) => toggle_color(&mut self.hair_color, color),
            RefinementField::LipstickColor(color) => toggle_color(&mut self.lipstick_color, color),
            RefinementField::Sunglasses(style) => self.sunglasses = style,
        }
    }
}

fn toggle_color(slot: &mut Option<String>, color: String) {
    let color = color.trim().to_string();
    if color.is_empty() {
        *slot = None;
        return;
    }
    let same = slot
        .as_deref()
        .is_some_and(|current| current.eq_ignore_ascii_case(&color));
    *slot = if same { None } else { Some(color) };
}
