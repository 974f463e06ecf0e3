//! Markdown rendering of a composed briefing.

use super::Briefing;

pub const TITLE: &str = "GPU Signal Briefing";

pub fn render_markdown(b: &Briefing) -> String {
    let mut lines: Vec<String> = Vec::new();
    lines.push(format!("# {TITLE} ({})", b.mode.as_str()));
    lines.push(format!("_Window: last {} day(s)_\n", b.window_days));

    lines.push("## Tag snapshot".to_string());
    for (tag, count) in b.snapshot.iter() {
        lines.push(format!("- **{tag}**: {count}"));
    }

    for (heading, bullets) in b.narrative.sections() {
        lines.push(format!("\n## {heading}"));
        for bullet in bullets {
            lines.push(format!("- {bullet}"));
        }
    }

    // Verbatim digest for auditability.
    lines.push("\n---\n## Source headlines (input)".to_string());
    lines.push(b.digest.clone());

    lines.join("\n")
}
