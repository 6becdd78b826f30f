/// Irregular plurals that suffix rules get wrong.
const IRREGULAR: &[(&str, &str)] = &[
    ("children", "child"),
    ("feet", "foot"),
    ("geese", "goose"),
    ("lives", "life"),
    ("knives", "knife"),
    ("men", "man"),
    ("mice", "mouse"),
    ("people", "person"),
    ("teeth", "tooth"),
    ("wives", "wife"),
    ("women", "woman"),
];

/// Endings that look plural but are not.
const KEEP_SUFFIXES: &[&str] = &["ss", "us", "is"];

/// Noun lemmatization with WordNet's detachment rules, applied without a
/// dictionary lookup. Expects a lowercase token.
pub fn lemmatize(token: &str) -> String {
    if let Some((_, lemma)) = IRREGULAR.iter().find(|(plural, _)| *plural == token) {
        return (*lemma).to_string();
    }

    if token.len() <= 3 || !token.ends_with('s') {
        return token.to_string();
    }
    if KEEP_SUFFIXES.iter().any(|s| token.ends_with(s)) {
        return token.to_string();
    }

    if let Some(stem) = token.strip_suffix("ies") {
        return format!("{stem}y");
    }
    for suffix in ["ches", "shes", "xes", "zes", "sses"] {
        if token.ends_with(suffix) {
            return token[..token.len() - 2].to_string();
        }
    }

    token[..token.len() - 1].to_string()
}
