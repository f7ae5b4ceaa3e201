//! Template Engine — placeholder substitution.
//!
//! A template is opaque markup with a fixed set of `{{NAME}}` tokens. `render`
//! makes one left-to-right pass: recognised tokens that have a fragment are
//! replaced, everything else (including unknown `{{...}}` text and recognised
//! tokens without a fragment) is copied verbatim. Inserted fragments are never
//! rescanned, so user text can't smuggle in a token.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// The bundled one-page template.
pub const DEFAULT_TEMPLATE: &str = include_str!("../templates/resume.tex");

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Placeholder {
    PersonalInfo,
    Education,
    Experience,
    Projects,
    Skills,
}

impl Placeholder {
    pub const ALL: [Placeholder; 5] = [
        Placeholder::PersonalInfo,
        Placeholder::Education,
        Placeholder::Experience,
        Placeholder::Projects,
        Placeholder::Skills,
    ];

    pub fn token(self) -> &'static str {
        match self {
            Placeholder::PersonalInfo => "{{PERSONAL_INFO}}",
            Placeholder::Education => "{{EDUCATION}}",
            Placeholder::Experience => "{{EXPERIENCE}}",
            Placeholder::Projects => "{{PROJECTS}}",
            Placeholder::Skills => "{{SKILLS}}",
        }
    }

    /// Record key of the section this slot renders.
    pub fn section(self) -> &'static str {
        match self {
            Placeholder::PersonalInfo => "personal_info",
            Placeholder::Education => "education",
            Placeholder::Experience => "experience",
            Placeholder::Projects => "projects",
            Placeholder::Skills => "skills",
        }
    }

    /// The placeholder whose token starts `text`, if any.
    fn match_prefix(text: &str) -> Option<Placeholder> {
        Self::ALL.into_iter().find(|p| text.starts_with(p.token()))
    }
}

impl fmt::Display for Placeholder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

/// Rendered fragments keyed by slot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FragmentMap {
    fragments: BTreeMap<Placeholder, String>,
}

impl FragmentMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, placeholder: Placeholder, fragment: impl Into<String>) {
        self.fragments.insert(placeholder, fragment.into());
    }

    pub fn get(&self, placeholder: Placeholder) -> Option<&str> {
        self.fragments.get(&placeholder).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.fragments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }

    fn total_len(&self) -> usize {
        self.fragments.values().map(String::len).sum()
    }
}

/// Substitutes fragments into `template` in a single, non-recursive pass.
pub fn render(template: &str, fragments: &FragmentMap) -> String {
    let mut out = String::with_capacity(template.len() + fragments.total_len());
    let mut rest = template;

    while let Some(idx) = rest.find("{{") {
        out.push_str(&rest[..idx]);
        let candidate = &rest[idx..];
        let hit = Placeholder::match_prefix(candidate)
            .and_then(|p| fragments.get(p).map(|fragment| (p, fragment)));
        match hit {
            Some((placeholder, fragment)) => {
                out.push_str(fragment);
                rest = &candidate[placeholder.token().len()..];
            }
            None => {
                // Advance one brace so `{{{TOKEN}}` still finds the token.
                out.push('{');
                rest = &candidate[1..];
            }
        }
    }

    out.push_str(rest);
    out
}

/// Recognised tokens still present in `text`, in slot order.
pub fn remaining_placeholders(text: &str) -> Vec<Placeholder> {
    Placeholder::ALL
        .into_iter()
        .filter(|p| text.contains(p.token()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn all_fragments(value: &str) -> FragmentMap {
        let mut map = FragmentMap::new();
        for p in Placeholder::ALL {
            map.insert(p, format!("{value}-{}", p.section()));
        }
        map
    }

    #[test]
    fn test_replaces_every_occurrence() {
        let mut map = FragmentMap::new();
        map.insert(Placeholder::Skills, "S");
        assert_eq!(render("{{SKILLS}} and {{SKILLS}}", &map), "S and S");
    }

    #[test]
    fn test_missing_fragment_leaves_token() {
        let mut map = FragmentMap::new();
        map.insert(Placeholder::Education, "E");
        let out = render("{{EDUCATION}}|{{PROJECTS}}", &map);
        assert_eq!(out, "E|{{PROJECTS}}");
        assert_eq!(remaining_placeholders(&out), vec![Placeholder::Projects]);
    }

    #[test]
    fn test_unknown_tokens_are_untouched() {
        let template = r"\textbf{{\Huge X}} {{NAME}} {{ SKILLS }} {{skills}}";
        assert_eq!(render(template, &all_fragments("x")), template);
    }

    #[test]
    fn test_extra_leading_brace_is_kept() {
        let mut map = FragmentMap::new();
        map.insert(Placeholder::Projects, "P");
        assert_eq!(render("{{{PROJECTS}}}", &map), "{P}");
    }

    #[test]
    fn test_fragments_are_not_rescanned() {
        let mut map = FragmentMap::new();
        map.insert(Placeholder::Experience, "{{SKILLS}}");
        map.insert(Placeholder::Skills, "INJECTED");
        assert_eq!(render("{{EXPERIENCE}}", &map), "{{SKILLS}}");
    }

    #[test]
    fn test_empty_fragment_is_substituted() {
        let mut map = FragmentMap::new();
        map.insert(Placeholder::Projects, "");
        assert_eq!(render("a{{PROJECTS}}b", &map), "ab");
    }

    #[test]
    fn test_non_placeholder_content_is_verbatim() {
        let template = "% comment\n\\begin{document}\n{{PERSONAL_INFO}}\n\\end{document}\n";
        let out = render(template, &all_fragments("v"));
        assert_eq!(out, "% comment\n\\begin{document}\nv-personal_info\n\\end{document}\n");
    }

    #[test]
    fn test_unicode_around_tokens() {
        let mut map = FragmentMap::new();
        map.insert(Placeholder::PersonalInfo, "Zoë");
        assert_eq!(render("→{{PERSONAL_INFO}}←", &map), "→Zoë←");
    }

    #[test]
    fn test_default_template_has_all_slots() {
        assert_eq!(remaining_placeholders(DEFAULT_TEMPLATE), Placeholder::ALL.to_vec());
        let out = render(DEFAULT_TEMPLATE, &all_fragments(""));
        assert!(remaining_placeholders(&out).is_empty());
    }
}
