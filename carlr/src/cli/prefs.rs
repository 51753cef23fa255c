use anyhow::Result;
use carlog::prelude::*;
use serde::Serialize;

use super::{PrefsArgs, PrefsCommands};
use crate::{cli::AppContext, output::OutputFormat};

#[derive(Serialize)]
struct PrefsReport<'a> {
    #[serde(flatten)]
    prefs: &'a AppPreferences,
    primary_foreground: &'static str,
    accent_foreground: &'static str,
}

pub fn handle(ctx: &AppContext, args: PrefsArgs) -> Result<()> {
    let store = match &ctx.prefs_file {
        Some(path) => FilePrefStore::new(path),
        None => FilePrefStore::open_default()?,
    };
    let prefs = match args.command {
        PrefsCommands::Show => AppPreferences::load(&store)?,
        PrefsCommands::Set {
            primary,
            accent,
            background,
            no_background,
        } => {
            let mut prefs = AppPreferences::load(&store)?;
            apply_set(
                &mut prefs,
                primary.as_deref(),
                accent.as_deref(),
                background,
                no_background,
            )?;
            prefs.save(&store)?;
            prefs
        }
        PrefsCommands::Reset => AppPreferences::reset(&store)?,
    };
    emit_prefs(ctx, &prefs)
}

fn apply_set(
    prefs: &mut AppPreferences,
    primary: Option<&str>,
    accent: Option<&str>,
    background: Option<String>,
    no_background: bool,
) -> Result<()> {
    if let Some(color) = primary {
        prefs.set_primary_color(color)?;
    }
    if let Some(color) = accent {
        prefs.set_accent_color(color)?;
    }
    if no_background {
        prefs.background_image = None;
    } else if let Some(image) = background.filter(|s| !s.trim().is_empty()) {
        prefs.background_image = Some(image);
    }
    Ok(())
}

fn emit_prefs(ctx: &AppContext, prefs: &AppPreferences) -> Result<()> {
    if ctx.output.format() == OutputFormat::Table {
        let text = format!(
            "primary color:     {}\naccent color:      {}\nbackground image:  {}",
            prefs.primary_color,
            prefs.accent_color,
            prefs.background_image.as_deref().unwrap_or("none"),
        );
        return ctx.output.emit_text(&text);
    }
    ctx.output.emit_json(&PrefsReport {
        prefs,
        primary_foreground: prefs.primary_foreground(),
        accent_foreground: prefs.accent_foreground(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_set_round_trips_through_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = FilePrefStore::new(dir.path().join("prefs.json"));

        let mut prefs = AppPreferences::load(&store).unwrap();
        apply_set(
            &mut prefs,
            Some("#112233"),
            None,
            Some("https://example.com/garage.png".to_string()),
            false,
        )
        .unwrap();
        prefs.save(&store).unwrap();

        let loaded = AppPreferences::load(&store).unwrap();
        assert_eq!(loaded.primary_color, "#112233");
        assert_eq!(loaded.accent_color, AppPreferences::default().accent_color);
        assert_eq!(
            loaded.background_image.as_deref(),
            Some("https://example.com/garage.png")
        );

        let mut prefs = loaded;
        apply_set(&mut prefs, None, None, None, true).unwrap();
        prefs.save(&store).unwrap();
        assert_eq!(AppPreferences::load(&store).unwrap().background_image, None);
    }

    #[test]
    fn test_apply_set_rejects_bad_color() {
        let mut prefs = AppPreferences::default();
        assert!(apply_set(&mut prefs, Some("blurple"), None, None, false).is_err());
        assert_eq!(prefs, AppPreferences::default());
    }
}
