use crate::escape::escape_latex;
use crate::models::{SkillCategory, SkillGroup, SkillSubgroup};

const SKILLS_LIST_START: &str = "\\section{Technical Skills}\n\
\\begin{itemize}[leftmargin=0pt, itemindent=0pt, labelwidth=0pt, labelsep=0pt, align=left, label={}]%\n\
\\small{\\item{\n";
const SKILLS_LIST_END: &str = "\n}}\n\\end{itemize}\n";
const LINE_BREAK: &str = " \\\\\n";

/// A nested category with this name renders its sub-categories without the
/// redundant outer label, since the section heading already says it.
const SECTION_TITLE_CATEGORY: &str = "Technical Skills";

/// One line per category in input order. Flat lists render as
/// `\textbf{Category}: a, b`; nested ones render a labelled line per sub-category.
pub fn format_skills(categories: &[SkillCategory]) -> String {
    let mut lines = Vec::with_capacity(categories.len());

    for category in categories {
        match &category.group {
            SkillGroup::Flat(items) => {
                if !items.is_empty() {
                    lines.push(labelled(&category.name, items));
                }
            }
            SkillGroup::Nested(subgroups) => {
                let sub_lines = nested_lines(subgroups);
                if sub_lines.is_empty() {
                    continue;
                }
                if category.name == SECTION_TITLE_CATEGORY {
                    lines.extend(sub_lines);
                } else {
                    lines.push(format!(
                        "\\textbf{{{}}}: {}",
                        escape_latex(&category.name),
                        sub_lines.join(LINE_BREAK)
                    ));
                }
            }
        }
    }

    if lines.is_empty() {
        return String::new();
    }
    format!("{SKILLS_LIST_START}{}{SKILLS_LIST_END}", lines.join(LINE_BREAK))
}

fn nested_lines(subgroups: &[SkillSubgroup]) -> Vec<String> {
    subgroups
        .iter()
        .filter(|sub| !sub.items.is_empty())
        .map(|sub| labelled(&sub.name, &sub.items))
        .collect()
}

fn labelled(label: &str, items: &[String]) -> String {
    let joined = items
        .iter()
        .map(|item| escape_latex(item))
        .collect::<Vec<_>>()
        .join(", ");
    format!("\\textbf{{{}}}: {joined}", escape_latex(label))
}
