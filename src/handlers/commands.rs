use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use tracing::{info, warn};

use crate::llm::model::ImageModel;
use crate::stylist::error::StylistError;
use crate::stylist::image::ImageAsset;
use crate::stylist::orchestrator::Stylist;
use crate::stylist::palette::{
    resolve_color, resolve_sunglasses, HAIR_COLORS, LIP_COLORS, SUNGLASSES,
};
use crate::stylist::selection::{RefinementField, StyleCategory, SunglassesStyle};
use crate::stylist::state::{SelectionState, Status};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Character(PathBuf),
    Style(PathBuf),
    Toggle(StyleCategory),
    Hair(String),
    Lips(String),
    Sunglasses(SunglassesStyle),
    Generate,
    Refine,
    Reset,
    Save(PathBuf),
    Status,
    Help,
    Quit,
}

pub fn help_text() -> String {
    let categories: Vec<&str> = StyleCategory::ALL.iter().map(|category| category.key()).collect();
    let sunglasses: Vec<String> = SUNGLASSES
        .iter()
        .enumerate()
        .map(|(index, option)| format!("{}={}", index, option.name))
        .collect();
    [
        "Commands:".to_string(),
        "  character <path>      load the character photo".to_string(),
        "  style <path>          load the style reference photo".to_string(),
        format!("  toggle <category>     enable/disable a style ({})", categories.join(", ")),
        format!("  hair <color|1-{}>     pick a hair color (again to clear)", HAIR_COLORS.len()),
        format!("  lips <color|1-{}>     pick a lipstick color (again to clear)", LIP_COLORS.len()),
        format!("  sunglasses <option>   {} or a free-text style", sunglasses.join(", ")),
        "  generate              apply the selected styles".to_string(),
        "  refine                apply hair/lips/sunglasses to the result".to_string(),
        "  reset                 start over (style toggles are kept)".to_string(),
        "  save <path>           write the current result to disk".to_string(),
        "  status | help | quit".to_string(),
    ]
    .join("\n")
}

fn required_arg<'a>(command: &str, arg: &'a str) -> Result<&'a str> {
    if arg.is_empty() {
        return Err(anyhow!("Missing value for {command}"));
    }
    Ok(arg)
}

/// Returns `Ok(None)` for blank lines.
pub fn parse_command(line: &str) -> Result<Option<Command>> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    let (name, arg) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
    let arg = arg.trim();

    let command = match name.to_ascii_lowercase().as_str() {
        "character" => Command::Character(PathBuf::from(required_arg(name, arg)?)),
        "style" => Command::Style(PathBuf::from(required_arg(name, arg)?)),
        "toggle" => Command::Toggle(required_arg(name, arg)?.parse()?),
        "hair" => Command::Hair(resolve_color(&HAIR_COLORS, required_arg(name, arg)?)?),
        "lips" => Command::Lips(resolve_color(&LIP_COLORS, required_arg(name, arg)?)?),
        "sunglasses" => Command::Sunglasses(resolve_sunglasses(required_arg(name, arg)?)?),
        "generate" => Command::Generate,
        "refine" => Command::Refine,
        "reset" => Command::Reset,
        "save" => Command::Save(PathBuf::from(required_arg(name, arg)?)),
        "status" => Command::Status,
        "help" | "?" => Command::Help,
        "quit" | "exit" => Command::Quit,
        other => return Err(anyhow!("Unknown command: {other} (try 'help')")),
    };
    Ok(Some(command))
}

fn mime_for_path(path: &Path) -> Option<&'static str> {
    let extension = path.extension()?.to_str()?.to_ascii_lowercase();
    match extension.as_str() {
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "webp" => Some("image/webp"),
        "heic" => Some("image/heic"),
        "heif" => Some("image/heif"),
        _ => None,
    }
}

async fn load_asset(path: &Path) -> Result<ImageAsset> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("failed reading {}", path.display()))?;
    let asset = ImageAsset::from_bytes(&bytes, mime_for_path(path))
        .with_context(|| format!("{} is not a usable image", path.display()))?;
    info!(
        "Loaded {} ({}, {} bytes)",
        path.display(),
        asset.mime_type(),
        bytes.len()
    );
    Ok(asset)
}

pub fn describe_state(state: &SelectionState) -> String {
    let mut lines = Vec::new();
    let loaded = |asset: Option<&ImageAsset>| match asset {
        Some(asset) => format!("loaded ({})", asset.mime_type()),
        None => "missing".to_string(),
    };
    lines.push(format!("character: {}", loaded(state.character_image())));
    lines.push(format!("style:     {}", loaded(state.style_image())));

    let styles: Vec<&str> = state
        .style_selection()
        .enabled_categories()
        .map(|category| category.key())
        .collect();
    lines.push(format!(
        "styles:    {}",
        if styles.is_empty() {
            "(none)".to_string()
        } else {
            styles.join(", ")
        }
    ));

    let refinement = state.refinement();
    lines.push(format!(
        "refine:    hair={} lips={} sunglasses={}",
        refinement.hair_color.as_deref().unwrap_or("-"),
        refinement.lipstick_color.as_deref().unwrap_or("-"),
        refinement.sunglasses.as_prompt()
    ));
    lines.push(format!("result:    {}", loaded(state.result_image())));

    let status = match state.status() {
        Status::Idle => "idle".to_string(),
        Status::Loading { message, .. } => format!("loading: {message}"),
        Status::Error { message, .. } => format!("error: {message}"),
    };
    lines.push(format!("status:    {status}"));
    lines.push(format!(
        "can generate: {}, can refine: {}",
        state.can_generate(),
        state.can_refine()
    ));
    lines.join("\n")
}

fn failure_reply(state: &SelectionState, err: &StylistError) -> String {
    match state.error_message() {
        Some(message) => format!("Error: {message}"),
        None => format!("Error: {}", err.user_message()),
    }
}

/// Runs one command and returns the text to show. Stylist failures are
/// reported through the session status rather than as `Err`.
pub async fn handle_command<M: ImageModel>(stylist: &Stylist<M>, command: Command) -> Result<String> {
    let reply = match command {
        Command::Character(path) => {
            let asset = load_asset(&path).await?;
            stylist.state().set_character_image(asset);
            format!("Character image set from {}", path.display())
        }
        Command::Style(path) => {
            let asset = load_asset(&path).await?;
            stylist.state().set_style_image(asset);
            format!("Style image set from {}", path.display())
        }
        Command::Toggle(category) => {
            let enabled = stylist.state().toggle_style_category(category);
            format!(
                "{} {}",
                category.label(),
                if enabled { "enabled" } else { "disabled" }
            )
        }
        Command::Hair(color) => {
            let mut state = stylist.state();
            state.set_refinement_field(RefinementField::HairColor(color));
            format!(
                "Hair color: {}",
                state.refinement().hair_color.as_deref().unwrap_or("(none)")
            )
        }
        Command::Lips(color) => {
            let mut state = stylist.state();
            state.set_refinement_field(RefinementField::LipstickColor(color));
            format!(
                "Lipstick color: {}",
                state.refinement().lipstick_color.as_deref().unwrap_or("(none)")
            )
        }
        Command::Sunglasses(style) => {
            let label = style.as_prompt().to_string();
            stylist
                .state()
                .set_refinement_field(RefinementField::Sunglasses(style));
            format!("Sunglasses: {label}")
        }
        Command::Generate => match stylist.generate().await {
            Ok(_) => "New look generated. Use 'save <path>' to keep it.".to_string(),
            Err(err) => {
                warn!("generate command failed: {err}");
                failure_reply(&stylist.state(), &err)
            }
        },
        Command::Refine => match stylist.refine().await {
            Ok(None) => "Nothing to refine yet: generate a look and pick a change first.".to_string(),
            Ok(Some(_)) => "Refinement applied.".to_string(),
            Err(err) => {
                warn!("refine command failed: {err}");
                failure_reply(&stylist.state(), &err)
            }
        },
        Command::Reset => {
            stylist.state().reset();
            "Session cleared.".to_string()
        }
        Command::Save(path) => {
            let asset = stylist
                .state()
                .result_image()
                .cloned()
                .ok_or_else(|| anyhow!("No result to save yet"))?;
            let bytes = asset.decode()?;
            tokio::fs::write(&path, &bytes)
                .await
                .with_context(|| format!("failed writing {}", path.display()))?;
            format!(
                "Saved {} bytes ({}) to {}",
                bytes.len(),
                asset.mime_type(),
                path.display()
            )
        }
        Command::Status => describe_state(&stylist.state()),
        Command::Help => help_text(),
        Command::Quit => String::new(),
    };
    Ok(reply)
}
