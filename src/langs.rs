/// Crowdin expects region subtags in upper case (`pt-BR`).
pub fn format_lang_for_vendor(lang: &str) -> String {
    let mut parts = lang.split('-');
    let primary = parts.next().unwrap_or_default();
    match parts.next() {
        Some(region) => {
            let mut formatted = format!("{}-{}", primary, region.to_uppercase());
            for rest in parts {
                formatted.push('-');
                formatted.push_str(rest);
            }
            formatted
        }
        None => primary.to_string(),
    }
}

pub fn format_langs_for_vendor(langs: &[String]) -> Vec<String> {
    langs.iter().map(|lang| format_lang_for_vendor(lang)).collect()
}

/// Language tags compare case-insensitively (`pt-br` == `pt-BR`).
pub fn langs_are_the_same(a: &str, b: &str) -> bool {
    a.eq_ignore_ascii_case(b)
}
