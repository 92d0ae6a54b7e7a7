//! Screen rendering.
//!
//! Bodies use the platform's HTML subset. Every catalog string is escaped
//! before interpolation; labels are capped at the platform limit. Children
//! whose token cannot be encoded are left out rather than sent with a
//! broken control.

use std::cmp::Ordering;

use learnverse_catalog::{FileRef, Subject, Syllabus, SyllabusSummary, Year};
use learnverse_core::markup::{MAX_MESSAGE_CHARS, escape_html, truncate_label};
use learnverse_core::{Button, Keyboard, OutgoingMessage};
use tracing::warn;

use crate::screen::{Failure, Notice, Screen};
use crate::token::{Level, NavToken};

const SEARCH_HEADER: &str =
    "<b>🔍 Search Files</b>\n\nSelect your branch to find study materials and files:";
const START_OVER: &str = "🏠 Start Over";

/// Settings shared by every rendered screen.
#[derive(Clone, Debug)]
pub struct RenderContext {
    /// Base URL of the web catalog; file links point at its viewer.
    pub web_base_url: String,
}

impl RenderContext {
    /// Context linking into `web_base_url`.
    pub fn new(web_base_url: impl Into<String>) -> Self {
        Self {
            web_base_url: web_base_url.into(),
        }
    }
}

/// Render `screen` as an outgoing message.
pub fn render(screen: &Screen, ctx: &RenderContext) -> OutgoingMessage {
    match screen {
        Screen::Branches { branches, notice } => {
            let mut text = String::new();
            if notice == &Some(Notice::InvalidSelection) {
                text.push_str("⚠️ That selection is no longer available. Please start again.\n\n");
            }
            if branches.is_empty() {
                text.push_str("⚠️ No branches available at the moment.");
                return OutgoingMessage::html(text).with_keyboard(vec![vec![start_over()]]);
            }
            text.push_str(SEARCH_HEADER);
            let rows = branches
                .iter()
                .filter_map(|b| {
                    child(
                        format!("📚 {} ({})", b.name, b.code),
                        Level::Branch,
                        &b.id,
                        None,
                    )
                })
                .collect();
            OutgoingMessage::html(text).with_keyboard(rows)
        }

        Screen::Years { branch } => {
            let back = back_button("⬅️ Back to Branches", &NavToken::Root);
            if branch.years.is_empty() {
                return OutgoingMessage::html(format!(
                    "⚠️ No years available for {} at the moment.",
                    escape_html(&branch.name)
                ))
                .with_keyboard(vec![vec![back]]);
            }
            let text = format!(
                "<b>🎓 {} ({})</b>\n\nSelect your year to find files:",
                escape_html(&branch.name),
                escape_html(&branch.code)
            );
            let mut rows: Keyboard = branch
                .years
                .iter()
                .filter_map(|y| {
                    let label = y
                        .code
                        .as_deref()
                        .or(y.name.as_deref())
                        .unwrap_or(y.id.as_str());
                    child(format!("📅 {label}"), Level::Year, &y.id, Some(branch.id.as_str()))
                })
                .collect();
            rows.push(vec![back]);
            OutgoingMessage::html(text).with_keyboard(rows)
        }

        Screen::Curricula { year, back } => render_curricula(year, back),
        Screen::Subjects { syllabus, back } => render_subjects(syllabus, back),
        Screen::Materials { subject, back } => render_materials(subject, back, ctx),
        Screen::Failed(failure) => render_failure(*failure),
    }
}

fn render_curricula(year: &Year, back: &NavToken) -> OutgoingMessage {
    let back = back_button("⬅️ Back to Years", back);
    let name = escape_html(year.display_name());
    if year.syllabuses.is_empty() {
        return OutgoingMessage::html(format!(
            "⚠️ No syllabuses available for {name} at the moment."
        ))
        .with_keyboard(vec![vec![back]]);
    }

    let university = year
        .branch
        .as_ref()
        .and_then(|b| b.university.as_deref())
        .filter(|u| !u.is_empty())
        .unwrap_or("University");
    let text = format!(
        "<b>📚 {name} - {}</b>\n\nSelect the pattern to view available files:",
        escape_html(university)
    );

    let mut syllabuses: Vec<&SyllabusSummary> = year.syllabuses.iter().collect();
    syllabuses.sort_by(|a, b| by_pattern_year(&a.pattern_year, &b.pattern_year));
    let mut rows: Keyboard = syllabuses
        .into_iter()
        .filter_map(|s| {
            child(
                format!("📋 Pattern {}", s.pattern_year),
                Level::Syllabus,
                &s.id,
                Some(year.id.as_str()),
            )
        })
        .collect();
    rows.push(vec![back]);
    OutgoingMessage::html(text).with_keyboard(rows)
}

fn render_subjects(syllabus: &Syllabus, back: &NavToken) -> OutgoingMessage {
    let back = back_button("⬅️ Back to Patterns", back);
    let pattern = escape_html(&syllabus.pattern_year);
    if syllabus.subjects.is_empty() {
        return OutgoingMessage::html(format!(
            "<b>📚 Pattern {pattern}</b>\n\n⚠️ No subjects available at the moment."
        ))
        .with_keyboard(vec![vec![back]]);
    }

    let heading = match &syllabus.academic_year {
        Some(year) => format!(
            "📚 {} ({}) - Pattern {pattern}",
            escape_html(year.name.as_deref().unwrap_or_default()),
            escape_html(year.code.as_deref().unwrap_or_default())
        ),
        None => format!("📚 Pattern {pattern}"),
    };
    let text = format!("<b>{heading}</b>\n\nSelect a subject to view materials:");
    let mut rows: Keyboard = syllabus
        .subjects
        .iter()
        .filter_map(|s| {
            child(
                format!("📖 {} - {}", s.code, s.name),
                Level::Subject,
                &s.id,
                Some(syllabus.id.as_str()),
            )
        })
        .collect();
    rows.push(vec![back]);
    OutgoingMessage::html(text).with_keyboard(rows)
}

fn render_materials(subject: &Subject, back: &NavToken, ctx: &RenderContext) -> OutgoingMessage {
    let mut header = format!(
        "<b>📖 {}</b>\n<i>Code: {}</i>\n<i>Pattern: {}</i>\n\n",
        escape_html(&subject.name),
        escape_html(&subject.code),
        escape_html(subject.pattern_year().unwrap_or("N/A"))
    );

    let mut lines: Vec<String> = Vec::new();
    let mut units: Vec<_> = subject.units.iter().filter(|u| !u.files.is_empty()).collect();
    units.sort_by_key(|u| u.unit_number);
    if !units.is_empty() {
        lines.push("<b>📝 Notes</b>".into());
        for unit in units {
            lines.push(format!("\n<i>Unit {}:</i>", unit.unit_number));
            lines.extend(unit.files.iter().map(|f| file_line(f, ctx)));
        }
        lines.push(String::new());
    }
    let sections: [(&str, &[FileRef]); 4] = [
        (
            "📄 Previous Year Questions (InSem)",
            &subject.previous_year.insem,
        ),
        (
            "📄 Previous Year Questions (EndSem)",
            &subject.previous_year.endsem,
        ),
        ("🔍 Decodes", &subject.decodes),
        ("📚 Books", &subject.books),
    ];
    for (title, files) in sections {
        if files.is_empty() {
            continue;
        }
        lines.push(format!("<b>{title}</b>"));
        lines.extend(files.iter().map(|f| file_line(f, ctx)));
        lines.push(String::new());
    }

    if lines.is_empty() {
        header.push_str("<i>No materials available for this subject yet.</i>");
    } else {
        append_capped(&mut header, &lines, ctx);
    }

    OutgoingMessage::html(header.trim_end().to_string())
        .with_keyboard(vec![
            vec![back_button("⬅️ Back to Subjects", back)],
            vec![start_over()],
        ])
        .without_preview()
}

/// Append `lines` to `body`, stopping before the message limit and pointing
/// at the web catalog for the rest.
fn append_capped(body: &mut String, lines: &[String], ctx: &RenderContext) {
    let web = escape_html(&ctx.web_base_url);
    let footer = format!("\n… more materials on the web: <a href=\"{web}\">{web}</a>");
    let budget = MAX_MESSAGE_CHARS.saturating_sub(footer.chars().count());

    let mut used = body.chars().count();
    for (i, line) in lines.iter().enumerate() {
        let cost = line.chars().count() + 1;
        if used + cost > budget {
            warn!(
                shown = i,
                total = lines.len(),
                "materials list truncated at message limit"
            );
            body.push_str(&footer);
            return;
        }
        body.push_str(line);
        body.push('\n');
        used += cost;
    }
}

fn file_line(file: &FileRef, ctx: &RenderContext) -> String {
    format!(
        "• <a href=\"{}\">{}</a>",
        escape_html(&file.viewer_url(&ctx.web_base_url)),
        escape_html(&file.file_name)
    )
}

fn render_failure(failure: Failure) -> OutgoingMessage {
    let text = match failure {
        Failure::Unavailable => {
            "❌ Couldn't load this right now. Please try again in a moment.".to_string()
        }
        Failure::NotFound(entity) => format!("❌ {} not found.", capitalize(entity)),
        Failure::Internal => "❌ An error occurred. Please try again later.".to_string(),
    };
    OutgoingMessage::html(text).with_keyboard(vec![vec![start_over()]])
}

/// Pattern years compare numerically when both parse, else as text.
fn by_pattern_year(a: &str, b: &str) -> Ordering {
    match (a.trim().parse::<u32>(), b.trim().parse::<u32>()) {
        (Ok(x), Ok(y)) => x.cmp(&y),
        (Ok(_), Err(_)) => Ordering::Less,
        (Err(_), Ok(_)) => Ordering::Greater,
        (Err(_), Err(_)) => a.cmp(b),
    }
}

fn child(label: String, level: Level, id: &str, ancestor: Option<&str>) -> Option<Vec<Button>> {
    let token = NavToken::from_parts(level, id, ancestor).and_then(|t| t.encode());
    match token {
        Ok(token) => Some(vec![Button::callback(truncate_label(&label), token)]),
        Err(err) => {
            warn!(?level, id, error = %err, "skipping control with unencodable token");
            None
        }
    }
}

fn back_button(label: &str, target: &NavToken) -> Button {
    let token = target.encode().unwrap_or_else(|_| "r".to_string());
    Button::callback(label, token)
}

fn start_over() -> Button {
    Button::callback(START_OVER, "r")
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
