use std::env;
use std::sync::OnceLock;

static FUSERS_DISABLE_COMPILE_CACHE: OnceLock<bool> = OnceLock::new();

fn parse_bool(value: &str) -> bool {
    let normalized = value.trim().to_ascii_lowercase();
    matches!(normalized.as_str(), "1" | "true" | "yes" | "on")
}

pub(crate) fn compile_cache_disabled() -> bool {
    *FUSERS_DISABLE_COMPILE_CACHE.get_or_init(|| match env::var("FUSERS_DISABLE_COMPILE_CACHE") {
        Ok(value) if !value.trim().is_empty() => parse_bool(&value),
        _ => false,
    })
}

#[cfg(test)]
mod tests {
    use super::parse_bool;

    #[test]
    fn parse_bool_accepts_common_truthy_spellings() {
        for value in ["1", "true", "TRUE", " yes ", "On"] {
            assert!(parse_bool(value), "{value:?} should parse as true");
        }
        for value in ["0", "false", "off", "", "enabled"] {
            assert!(!parse_bool(value), "{value:?} should parse as false");
        }
    }
}
