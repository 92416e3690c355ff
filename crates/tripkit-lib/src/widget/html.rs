use std::fmt;

use super::{WidgetActivity, WidgetDay, WidgetPayload};

const STYLE: &str = r#"
    :root {
      --primary: #0A4B73;
      --accent: #B8860B;
      --text: #1a1a1a;
      --text-light: #555;
      --bg: #f8f9fa;
      --card: #ffffff;
      --border: #e0e0e0;
    }
    * { box-sizing: border-box; margin: 0; padding: 0; }
    body {
      font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif;
      background: var(--bg);
      color: var(--text);
      line-height: 1.5;
      font-size: 14px;
    }
    .header { background: var(--primary); color: white; padding: 16px; text-align: center; }
    .header h1 { font-size: 18px; font-weight: 600; margin-bottom: 4px; }
    .header p { font-size: 13px; opacity: 0.9; }
    .days { padding: 12px; }
    .day {
      background: var(--card);
      border-radius: 10px;
      margin-bottom: 12px;
      overflow: hidden;
      border: 1px solid var(--border);
    }
    .day-header {
      background: var(--bg);
      padding: 10px 14px;
      font-weight: 600;
      font-size: 13px;
      color: var(--primary);
      border-bottom: 1px solid var(--border);
    }
    .day-theme { font-weight: 400; color: var(--text-light); }
    .activities { list-style: none; padding: 8px 0; }
    .activity { padding: 10px 14px; border-bottom: 1px solid var(--border); }
    .activity:last-child { border-bottom: none; }
    .activity-time { font-size: 11px; color: var(--text-light); font-weight: 500; }
    .activity-name { font-weight: 500; margin: 2px 0; }
    .activity-location, .activity-desc { font-size: 12px; color: var(--text-light); }
    .activity-tip { font-size: 11px; color: var(--accent); margin-top: 4px; }
    .activity-tip::before { content: "Tip: "; font-weight: 500; }
    .cta {
      display: block;
      margin: 16px 12px;
      padding: 14px;
      background: var(--primary);
      color: white;
      text-align: center;
      text-decoration: none;
      border-radius: 8px;
      font-weight: 600;
    }
    .footer { text-align: center; padding: 12px; font-size: 11px; color: var(--text-light); }
"#;

/// Render a self-contained HTML card for `payload`.
///
/// Every piece of trip text is HTML-escaped; the output contains no script.
pub fn render_html(payload: &WidgetPayload) -> String {
    WidgetHtml(payload).to_string()
}

/// HTML card view of a payload.
pub struct WidgetHtml<'a>(pub &'a WidgetPayload);

impl fmt::Display for WidgetHtml<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let payload = self.0;

        f.write_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n")?;
        f.write_str("<meta charset=\"UTF-8\">\n")?;
        f.write_str("<meta name=\"viewport\" content=\"width=device-width, initial-scale=1.0\">\n")?;
        writeln!(f, "<title>{}</title>", Escaped(&payload.title))?;
        writeln!(f, "<style>{}</style>", STYLE)?;
        f.write_str("</head>\n<body>\n")?;

        writeln!(
            f,
            "<header class=\"header\"><h1>{}</h1><p>{} &middot; {} to {}</p></header>",
            Escaped(&payload.destination),
            DayCount(payload.day_count),
            Escaped(&payload.start_date),
            Escaped(&payload.end_date),
        )?;

        f.write_str("<main class=\"days\">\n")?;
        for day in &payload.days {
            write_day(f, day)?;
        }
        f.write_str("</main>\n")?;

        writeln!(
            f,
            "<a href=\"{}\" class=\"cta\" target=\"_blank\" rel=\"noopener\">Save &amp; edit this trip</a>",
            Escaped(&payload.save_url)
        )?;
        writeln!(
            f,
            "<footer class=\"footer\">{}</footer>",
            Escaped(&payload.summary)
        )?;
        f.write_str("</body>\n</html>\n")
    }
}

fn write_day(f: &mut fmt::Formatter<'_>, day: &WidgetDay) -> fmt::Result {
    writeln!(
        f,
        "<section class=\"day\" data-date=\"{}\">\n<h2 class=\"day-header\">{} <span class=\"day-theme\">{}</span></h2>\n<ul class=\"activities\">",
        Escaped(&day.date),
        Escaped(&day.label),
        Escaped(&day.theme),
    )?;
    for activity in &day.activities {
        write_activity(f, activity)?;
    }
    f.write_str("</ul>\n</section>\n")
}

fn write_activity(f: &mut fmt::Formatter<'_>, activity: &WidgetActivity) -> fmt::Result {
    write!(
        f,
        "<li class=\"activity\" data-category=\"{}\"><div class=\"activity-time\">{}</div><div class=\"activity-name\">{}</div>",
        Escaped(&activity.category),
        Escaped(&activity.time),
        Escaped(&activity.name),
    )?;
    if let Some(location) = &activity.location {
        write!(f, "<div class=\"activity-location\">{}</div>", Escaped(location))?;
    }
    if !activity.description.is_empty() {
        write!(f, "<div class=\"activity-desc\">{}</div>", Escaped(&activity.description))?;
    }
    if let Some(tip) = &activity.tip {
        write!(f, "<div class=\"activity-tip\">{}</div>", Escaped(tip))?;
    }
    f.write_str("</li>\n")
}

struct DayCount(usize);

impl fmt::Display for DayCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} day itinerary", self.0)
    }
}

/// Text escaped for HTML element content and quoted attribute values.
struct Escaped<'a>(&'a str);

const SPECIAL: &[char] = &['&', '<', '>', '"', '\''];

impl fmt::Display for Escaped<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut rest = self.0;
        while let Some(at) = rest.find(SPECIAL) {
            f.write_str(&rest[..at])?;
            f.write_str(match rest.as_bytes()[at] {
                b'&' => "&amp;",
                b'<' => "&lt;",
                b'>' => "&gt;",
                b'"' => "&quot;",
                _ => "&#39;",
            })?;
            rest = &rest[at + 1..];
        }
        f.write_str(rest)
    }
}
