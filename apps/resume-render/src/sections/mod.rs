//! Section Formatters — one pure function per resume section.
//!
//! Every formatter escapes each raw field exactly once and returns a markup
//! fragment built from the macros the bundled template defines. An empty
//! section yields an empty fragment, never a heading with no entries.

pub mod education;
pub mod experience;
pub mod personal;
pub mod projects;
pub mod skills;

pub use education::format_education;
pub use experience::format_experience;
pub use personal::format_personal_info;
pub use projects::format_projects;
pub use skills::format_skills;

use crate::errors::AppError;
use crate::escape::escape_latex;
use crate::models::ResumeRecord;
use crate::template::{remaining_placeholders, FragmentMap, Placeholder};

/// Runs every formatter and checks each fragment before it reaches a template.
pub fn format_all(record: &ResumeRecord) -> Result<FragmentMap, AppError> {
    let mut fragments = FragmentMap::new();
    for placeholder in Placeholder::ALL {
        let fragment = match placeholder {
            Placeholder::PersonalInfo => format_personal_info(&record.personal_info),
            Placeholder::Education => format_education(&record.education),
            Placeholder::Experience => format_experience(&record.experience),
            Placeholder::Projects => format_projects(&record.projects),
            Placeholder::Skills => format_skills(&record.skills),
        };
        check_fragment(placeholder, &fragment)?;
        fragments.insert(placeholder, fragment);
    }
    Ok(fragments)
}

/// Structural sanity check: braces balance and no template token leaked through.
fn check_fragment(placeholder: Placeholder, fragment: &str) -> Result<(), AppError> {
    if let Some(token) = remaining_placeholders(fragment).first() {
        return Err(AppError::render(
            placeholder.section(),
            format!("fragment contains template token {token}"),
        ));
    }

    let mut depth: i64 = 0;
    let mut backslashes = 0usize;
    for c in fragment.chars() {
        let literal = backslashes % 2 == 1;
        match c {
            '{' if !literal => depth += 1,
            '}' if !literal => {
                depth -= 1;
                if depth < 0 {
                    return Err(AppError::render(placeholder.section(), "unbalanced '}'"));
                }
            }
            _ => {}
        }
        backslashes = if c == '\\' { backslashes + 1 } else { 0 };
    }
    if depth != 0 {
        return Err(AppError::render(
            placeholder.section(),
            format!("{depth} unclosed '{{'"),
        ));
    }
    Ok(())
}

// ────────────────────────────────────────────────────────────────────────────
// Shared markup builders
// ────────────────────────────────────────────────────────────────────────────

/// `\section{TITLE}` plus the sub-heading list wrapper around `body`.
pub(crate) fn wrap_section(title: &str, body: &str) -> String {
    format!(
        "\\section{{{title}}}\n\\resumeSubHeadingListStart\n{body}\\resumeSubHeadingListEnd\n"
    )
}

/// Four-slot heading: `#1` bold top-left, `#2` top-right, `#3`/`#4` second line.
pub(crate) fn subheading(top_left: &str, top_right: &str, bottom_left: &str, bottom_right: &str) -> String {
    format!("\\resumeSubheading\n{{{top_left}}}{{{top_right}}}\n{{{bottom_left}}}{{{bottom_right}}}\n")
}

/// Three-slot heading used when an entry has no location.
pub(crate) fn subheading_no_location(top_left: &str, top_right: &str, bottom: &str) -> String {
    format!("\\resumeSubheadingNoLocation\n{{{top_left}}}{{{top_right}}}\n{{{bottom}}}\n")
}

/// Itemized bullets from already-rendered markup. Empty input → empty string.
pub(crate) fn item_list(items: &[String]) -> String {
    if items.is_empty() {
        return String::new();
    }
    let mut out = String::from("\\resumeItemListStart\n");
    for item in items {
        out.push_str("\\resumeItem{");
        out.push_str(item);
        out.push_str("}\n");
    }
    out.push_str("\\resumeItemListEnd\n");
    out
}

pub(crate) fn escaped_items(raw: &[String]) -> Vec<String> {
    raw.iter().map(|s| escape_latex(s)).collect()
}
