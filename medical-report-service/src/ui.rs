//! Server-rendered browser pages.

use consult_flow::{ConsultSession, Role};

pub const TITLE: &str = "🩺 Medical Report Analyzer";
pub const UPLOAD_WARNING: &str = "👆 Please upload a medical report file first.";
pub const UPLOAD_SUCCESS: &str = "Medical report uploaded successfully! ✅";

const STYLE: &str = "
body { font-family: sans-serif; margin: 0; display: flex; min-height: 100vh; }
aside { width: 20rem; background: #f0f2f6; padding: 1.5rem; }
main { flex: 1; padding: 2rem 3rem; }
.notice { padding: 0.75rem 1rem; border-radius: 0.5rem; margin: 1rem 0; }
.success { background: #dff5e3; color: #1b5e20; }
.warning { background: #fff6d6; color: #7a5b00; }
.error { background: #fde2e1; color: #8a1c1c; }
pre.result { white-space: pre-wrap; background: #fafafa; border: 1px solid #ddd; padding: 1rem; }
button, select { font-size: 1rem; padding: 0.4rem 0.8rem; margin-top: 0.5rem; }
";

/// Escape text for use in HTML element content and attribute values.
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

fn layout(sidebar: &str, content: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n<title>Medical Report Analyzer</title>\n<style>{STYLE}</style>\n</head>\n<body>\n<aside>\n{sidebar}</aside>\n<main>\n<h1>{TITLE}</h1>\n{content}</main>\n</body>\n</html>\n"
    )
}

fn notice(kind: &str, message: &str) -> String {
    format!(
        "<div class=\"notice {}\">{}</div>\n",
        kind,
        escape_html(message)
    )
}

fn upload_form() -> String {
    "<h2>Step 1: Upload Medical Report</h2>\n\
     <form method=\"post\" action=\"/upload\" enctype=\"multipart/form-data\">\n\
     <label for=\"report\">Upload a .txt file</label><br>\n\
     <input type=\"file\" id=\"report\" name=\"report\" accept=\".txt,text/plain\" required><br>\n\
     <button type=\"submit\">Upload</button>\n\
     </form>\n"
        .to_string()
}

/// Landing page: upload form and the blocking warning, no role selection.
pub fn upload_page(error: Option<&str>) -> String {
    let mut content = String::new();
    if let Some(error) = error {
        content.push_str(&notice("error", error));
    }
    content.push_str(&notice("warning", UPLOAD_WARNING));
    layout(&upload_form(), &content)
}

fn role_selection(session_id: &str, selected: Role) -> String {
    let id = escape_html(session_id);
    let options: String = Role::selectable()
        .iter()
        .map(|role| {
            format!(
                "<option value=\"{0}\"{1}>{0}</option>\n",
                role.as_str(),
                if *role == selected { " selected" } else { "" }
            )
        })
        .collect();

    format!(
        "<h2>Step 2: Select Agent</h2>\n\
         <form method=\"get\" action=\"/session/{id}\">\n\
         <label for=\"role\">Choose the agent</label><br>\n\
         <select id=\"role\" name=\"role\" onchange=\"this.form.submit()\">\n{options}</select>\n\
         <noscript><button type=\"submit\">Select</button></noscript>\n\
         </form>\n"
    )
}

fn trigger(session_id: &str, selected: Role) -> String {
    format!(
        "<form method=\"post\" action=\"/session/{}/consult\">\n\
         <input type=\"hidden\" name=\"role\" value=\"{}\">\n\
         <button type=\"submit\">{}</button>\n\
         </form>\n",
        escape_html(session_id),
        selected.as_str(),
        selected.trigger_label()
    )
}

/// Session page: role selection and trigger once a report exists, the blocking
/// warning otherwise. The last result is shown read-only under its heading.
pub fn session_page(session: &ConsultSession, selected: Option<Role>, error: Option<&str>) -> String {
    if !session.has_report() {
        let mut content = String::new();
        if let Some(error) = error {
            content.push_str(&notice("error", error));
        }
        content.push_str(&notice("warning", UPLOAD_WARNING));
        return layout(&upload_form(), &content);
    }

    let selected = selected
        .or_else(|| session.last.as_ref().map(|c| c.role))
        .filter(|role| Role::selectable().contains(role))
        .unwrap_or(Role::Cardiologist);

    let mut sidebar = upload_form();
    sidebar.push_str(&role_selection(&session.id, selected));

    let mut content = notice("success", UPLOAD_SUCCESS);
    if let Some(error) = error {
        content.push_str(&notice("error", error));
    }
    content.push_str(&trigger(&session.id, selected));

    if let Some(consultation) = &session.last {
        content.push_str(&format!(
            "<h3>{}</h3>\n<pre class=\"result\">{}</pre>\n",
            consultation.heading(),
            escape_html(&consultation.output)
        ));
    }

    layout(&sidebar, &content)
}

pub fn not_found_page(session_id: &str) -> String {
    let content = format!(
        "{}<p><a href=\"/\">Start over</a></p>\n",
        notice("error", &format!("Session {} not found", session_id))
    );
    layout(&upload_form(), &content)
}
