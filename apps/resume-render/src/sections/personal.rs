use crate::escape::{ensure_url_protocol, escape_latex, escape_url, phone_href};
use crate::models::PersonalInfo;

const CONTACT_SEPARATOR: &str = " $|$ ";

/// Centered header: the name, then one hyperlinked entry per present contact
/// field in the fixed order phone, email, linkedin, github.
pub fn format_personal_info(info: &PersonalInfo) -> String {
    let name = escape_latex(&info.name);
    let contacts = contact_items(info);

    let mut out = String::from("\\begin{center}\n");
    if contacts.is_empty() {
        out.push_str(&format!("\\textbf{{\\Huge \\scshape {name}}}\n"));
    } else {
        out.push_str(&format!(
            "\\textbf{{\\Huge \\scshape {name}}} \\\\ \\vspace{{1pt}}\n"
        ));
        out.push_str(&format!("\\small {}\n", contacts.join(CONTACT_SEPARATOR)));
    }
    out.push_str("\\end{center}\n");
    out
}

fn contact_items(info: &PersonalInfo) -> Vec<String> {
    let mut items = Vec::with_capacity(4);

    if let Some(phone) = &info.phone {
        items.push(format!(
            "\\href{{{}}}{{{}}}",
            phone_href(phone),
            escape_latex(phone)
        ));
    }
    if let Some(email) = &info.email {
        items.push(format!(
            "\\href{{mailto:{}}}{{\\underline{{{}}}}}",
            escape_url(email),
            escape_latex(email)
        ));
    }
    for profile in [&info.linkedin, &info.github].into_iter().flatten() {
        items.push(format!(
            "\\href{{{}}}{{\\underline{{{}}}}}",
            escape_url(&ensure_url_protocol(profile)),
            escape_latex(profile)
        ));
    }

    items
}
