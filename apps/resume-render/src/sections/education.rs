use super::{escaped_items, item_list, subheading, subheading_no_location, wrap_section};
use crate::escape::escape_latex;
use crate::models::Education;

/// One sub-heading per entry, in input order.
pub fn format_education(entries: &[Education]) -> String {
    if entries.is_empty() {
        return String::new();
    }
    let body: String = entries.iter().map(format_entry).collect();
    wrap_section("Education", &body)
}

fn format_entry(entry: &Education) -> String {
    let institution = escape_latex(strip_location_suffix(
        &entry.institution,
        entry.location.as_deref(),
    ));
    let degree = escape_latex(&entry.degree);
    let dates = escape_latex(&entry.dates);

    let mut out = match entry.location.as_deref() {
        Some(location) => subheading(&institution, &escape_latex(location), &degree, &dates),
        None => subheading_no_location(&institution, &dates, &degree),
    };
    out.push_str(&item_list(&escaped_items(&entry.details)));
    out
}

/// Producers often append the location to the institution name
/// ("MIT Cambridge, MA" + "Cambridge, MA"); drop the duplicate.
fn strip_location_suffix<'a>(institution: &'a str, location: Option<&str>) -> &'a str {
    let Some(location) = location.filter(|l| !l.is_empty()) else {
        return institution;
    };
    match institution.strip_suffix(location) {
        Some(stripped) => {
            let stripped = stripped.trim_end().trim_end_matches(',').trim_end();
            if stripped.is_empty() {
                institution
            } else {
                stripped
            }
        }
        None => institution,
    }
}
