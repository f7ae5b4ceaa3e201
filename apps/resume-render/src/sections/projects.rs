use super::{escaped_items, item_list, wrap_section};
use crate::escape::escape_latex;
use crate::models::Project;

/// Technology lists longer than this (rendered characters) get their own bullet.
const INLINE_TECHNOLOGIES_MAX: usize = 40;

pub fn format_projects(projects: &[Project]) -> String {
    if projects.is_empty() {
        return String::new();
    }
    let body: String = projects.iter().map(format_entry).collect();
    wrap_section("Projects", &body)
}

fn format_entry(project: &Project) -> String {
    let name = escape_latex(&project.name);
    let technologies = project
        .technologies
        .as_list()
        .into_iter()
        .map(escape_latex)
        .collect::<Vec<_>>()
        .join(", ");

    let mut bullets = Vec::with_capacity(project.details.len() + 1);
    let heading = if technologies.is_empty() {
        format!("\\textbf{{{name}}}")
    } else if technologies.chars().count() <= INLINE_TECHNOLOGIES_MAX {
        format!("\\textbf{{{name}}} $|$ \\emph{{{technologies}}}")
    } else {
        bullets.push(format!("\\emph{{Technologies:}} {technologies}"));
        format!("\\textbf{{{name}}}")
    };
    bullets.extend(escaped_items(&project.details));

    let mut out = format!("\\resumeProjectHeading\n{{{heading}}}{{}}\n");
    out.push_str(&item_list(&bullets));
    out
}
