use crate::stylist::selection::{RefinementSelection, StyleSelection, SunglassesStyle};

pub const NO_SUNGLASSES_CLAUSE: &str = "Ensure the person is not wearing sunglasses.";

/// Comma list of the enabled category labels, or `None` when nothing is enabled.
pub fn style_list(selection: &StyleSelection) -> Option<String> {
    let labels: Vec<&str> = selection
        .enabled_categories()
        .map(|category| category.label())
        .collect();
    if labels.is_empty() {
        None
    } else {
        Some(labels.join(", "))
    }
}

/// Instruction for the initial stylization. Image order in the request is
/// character first, style reference second.
pub fn build_style_instruction(selection: &StyleSelection) -> Option<String> {
    let styles = style_list(selection)?;
    Some(format!(
        "Act as an expert virtual stylist. Your task is to apply specific styles from the second image (style reference) to the person in the first image (character). \
Apply only the following styles: {styles}. \
It is crucial to preserve the facial identity of the person from the first image and maintain the original background. \
The final output must be a high-quality, photorealistic image."
    ))
}

pub fn refinement_clauses(selection: &RefinementSelection) -> Vec<String> {
    let mut clauses = Vec::new();
    if let Some(color) = selection.hair_color.as_deref() {
        clauses.push(format!("Change the hair color to {color}."));
    }
    if let Some(color) = selection.lipstick_color.as_deref() {
        clauses.push(format!("Change the lipstick color to {color}."));
    }
    match &selection.sunglasses {
        SunglassesStyle::Style(style) => clauses.push(format!("Add {style}.")),
        SunglassesStyle::None => clauses.push(NO_SUNGLASSES_CLAUSE.to_string()),
    }
    clauses
}

/// Instruction for a refinement pass over the current result. The eyewear
/// state is always asserted.
pub fn build_refinement_instruction(selection: &RefinementSelection) -> String {
    format!(
        "Modify the person in this image. {} Preserve all other features and the background. The output must be a photorealistic image.",
        refinement_clauses(selection).join(" ")
    )
}
