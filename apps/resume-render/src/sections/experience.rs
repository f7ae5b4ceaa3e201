use super::{escaped_items, item_list, subheading, subheading_no_location, wrap_section};
use crate::escape::escape_latex;
use crate::models::Experience;

/// One block per job in input order: title/dates over company/location, then
/// one bullet per detail. No details means no bullet list at all.
pub fn format_experience(entries: &[Experience]) -> String {
    if entries.is_empty() {
        return String::new();
    }
    let body: String = entries.iter().map(format_entry).collect();
    wrap_section("Experience", &body)
}

fn format_entry(job: &Experience) -> String {
    let title = escape_latex(&job.title);
    let dates = escape_latex(&job.dates);
    let company = escape_latex(&job.company);

    let mut out = match job.location.as_deref() {
        Some(location) => subheading(&title, &dates, &company, &escape_latex(location)),
        None => subheading_no_location(&title, &dates, &company),
    };
    out.push_str(&item_list(&escaped_items(&job.details)));
    out
}
