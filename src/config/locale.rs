use super::types::Config;

pub const SUPPORTED_LOCALES: [&str; 2] = ["en", "ru"];

fn detect_system_locale() -> Option<String> {
    std::env::var("LANG")
        .or_else(|_| std::env::var("LC_MESSAGES"))
        .ok()
        .map(|lang| lang.trim().to_lowercase())
        .filter(|lang| !lang.is_empty())
}

/// Detect locale: `CHATRELAY_LANG` env -> config value -> system `LANG` -> `"en"`.
fn detect_locale(config_locale: &str) -> String {
    if let Ok(lang) = std::env::var("CHATRELAY_LANG") {
        let lang = lang.trim().to_lowercase();
        if !lang.is_empty() {
            return supported_or_default(&normalise_locale(&lang));
        }
    }

    let config_locale = config_locale.trim().to_lowercase();
    if config_locale != "en" && !config_locale.is_empty() {
        return supported_or_default(&normalise_locale(&config_locale));
    }

    if let Some(system_locale) = detect_system_locale() {
        return supported_or_default(&normalise_locale(&system_locale));
    }

    "en".into()
}

/// Normalise `"ru_RU.UTF-8"` -> `"ru"`, `"en_US"` -> `"en"`, passthrough `"ru"`.
fn normalise_locale(raw: &str) -> String {
    let base = raw.split('.').next().unwrap_or(raw);
    let lang = base.split(['_', '-']).next().unwrap_or(base);
    lang.to_string()
}

fn supported_or_default(lang: &str) -> String {
    if SUPPORTED_LOCALES.contains(&lang) {
        lang.to_string()
    } else {
        "en".into()
    }
}

impl Config {
    /// Resolved reply language, one of [`SUPPORTED_LOCALES`].
    pub fn resolved_locale(&self) -> String {
        detect_locale(&self.locale)
    }

    /// Resolve the locale and make it the process default for `t!`.
    pub fn apply_locale(&self) -> String {
        let locale = self.resolved_locale();
        rust_i18n::set_locale(&locale);
        locale
    }
}
