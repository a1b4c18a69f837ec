use anyhow::{Context as _, bail};
use marknote_core::{Settings, SettingsStore, Theme, ViewMode};

/// Change one key in the file behind `store` and return the result.
///
/// A settings file that exists but cannot be read or parsed is left alone
/// rather than replaced with defaults plus the new key.
pub(crate) fn set(store: &SettingsStore, key: &str, value: &str) -> anyhow::Result<Settings> {
    let current = store
        .try_load()
        .with_context(|| {
            format!(
                "not changing {}; fix or reset it first",
                store.path().display()
            )
        })?
        .unwrap_or_default();
    let updated = apply(current, key, value)?;
    store.save(&updated)?;
    Ok(updated)
}

/// Return `settings` with the key named as in the settings file set to `value`.
pub(crate) fn apply(settings: Settings, key: &str, value: &str) -> anyhow::Result<Settings> {
    let updated = match key {
        "fontFamily" => settings.with_font_family(value),
        "fontSize" => settings.with_font_size(
            value
                .parse()
                .with_context(|| format!("fontSize must be a whole number, got {value:?}"))?,
        ),
        "lineHeight" => settings.with_line_height(
            value
                .parse()
                .with_context(|| format!("lineHeight must be a number, got {value:?}"))?,
        ),
        "theme" => {
            let Some(theme) = Theme::from_name(value) else {
                bail!("unknown theme {value:?} (expected cream, dark or white)");
            };
            settings.with_theme(theme)
        }
        "autoSave" => settings.with_auto_save(
            value
                .parse()
                .with_context(|| format!("autoSave must be true or false, got {value:?}"))?,
        ),
        "viewMode" => {
            let Some(mode) = ViewMode::from_name(value) else {
                bail!("unknown view mode {value:?} (expected editor, preview or split)");
            };
            settings.with_view_mode(mode)
        }
        other => bail!("unknown setting `{other}`"),
    };
    Ok(updated)
}
