//! Server-rendered HTML pages.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use axum::http::StatusCode;
use axum::response::Html;
use checkin_core::model::{CheckInWithAnswers, Flash, Id, Question, QuestionKind, User};
use checkin_core::stats::{ChartSeries, CoupleChart};
use checkin_core::week::format_week;
use chrono::NaiveDate;
use serde::Serialize;

use crate::db::CheckInDetail;

const CHART_JS: &str = "https://cdn.jsdelivr.net/npm/chart.js@4";

/// Per-request data shared by every page.
#[derive(Debug, Default)]
pub struct Page<'a> {
    pub user: Option<&'a User>,
    pub is_admin: bool,
    pub flashes: Vec<Flash>,
}

/// HTML-escapes text for element content and quoted attributes.
pub fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(ch),
        }
    }
    out
}

/// JSON safe to embed inside a `<script>` element.
fn json_script<T: Serialize>(value: &T) -> String {
    serde_json::to_string(value)
        .unwrap_or_else(|_| "null".to_string())
        .replace("</", "<\\/")
}

fn layout(title: &str, page: &Page<'_>, body: &str) -> Html<String> {
    let mut nav = String::from(r#"<a href="/">Avaleht</a>"#);
    match page.user {
        Some(user) => {
            nav.push_str(r#" <a href="/checkin">Check-in</a> <a href="/dashboard">Ülevaade</a> <a href="/couple">Meie graafik</a>"#);
            if page.is_admin {
                nav.push_str(r#" <a href="/admin/questions">Küsimused</a>"#);
            }
            let _ = write!(nav, r#" <span class="who">{}</span> <a href="/logout">Logi välja</a>"#, escape(&user.name));
        }
        None => nav.push_str(r#" <a href="/login">Logi sisse</a>"#),
    }

    let mut flashes = String::new();
    for f in &page.flashes {
        let _ = write!(
            flashes,
            r#"<div class="flash flash-{}">{}</div>"#,
            f.kind.as_str(),
            escape(&f.message)
        );
    }

    Html(format!(
        r#"<!doctype html>
<html lang="et">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>{title}</title>
<style>
body {{ font-family: system-ui, sans-serif; max-width: 48rem; margin: 0 auto; padding: 1rem; }}
nav a {{ margin-right: .75rem; }}
.flash {{ padding: .5rem .75rem; margin: .5rem 0; border-radius: 4px; }}
.flash-success {{ background: #e6f4ea; }}
.flash-danger {{ background: #fce8e6; }}
.flash-info {{ background: #e8f0fe; }}
label {{ display: block; margin-top: .75rem; }}
textarea, input[type=text], input[type=password] {{ width: 100%; }}
</style>
</head>
<body>
<nav>{nav}</nav>
{flashes}
<main>
{body}
</main>
</body>
</html>
"#,
        title = escape(title),
    ))
}

pub fn index(page: &Page<'_>) -> Html<String> {
    let body = match page.user {
        Some(user) => format!(
            r#"<h1>Tere, {}!</h1>
<p><a href="/checkin">Täida selle nädala check-in</a> või vaata <a href="/dashboard">ülevaadet</a>.</p>"#,
            escape(&user.name)
        ),
        None => r#"<h1>Nädala check-in</h1>
<p>Kord nädalas paar küsimust teineteisele. <a href="/login">Logi sisse</a>.</p>"#
            .to_string(),
    };
    layout("Nädala check-in", page, &body)
}

pub fn login(page: &Page<'_>, slug: &str) -> Html<String> {
    let body = format!(
        r#"<h1>Logi sisse</h1>
<form method="post" action="/login">
<label>Kasutaja <input type="text" name="slug" value="{}" autofocus required></label>
<label>Parool <input type="password" name="password" required></label>
<button type="submit">Sisene</button>
</form>"#,
        escape(slug)
    );
    layout("Logi sisse", page, &body)
}

pub fn checkin(
    page: &Page<'_>,
    questions: &[Question],
    week: NaiveDate,
    previous: &BTreeMap<Id, String>,
) -> Html<String> {
    let mut fields = String::new();
    for q in questions {
        let name = checkin_core::form::answer_field(q.id);
        let prev = previous.get(&q.id).map(String::as_str).unwrap_or("");
        let input = match q.kind {
            QuestionKind::Scale => format!(
                r#"<input type="number" name="{name}" min="1" max="10" value="{}">"#,
                escape(prev)
            ),
            QuestionKind::Text => format!(r#"<textarea name="{name}" rows="3">{}</textarea>"#, escape(prev)),
        };
        let _ = write!(fields, "<label>{}\n{input}</label>\n", escape(&q.text));
    }
    if questions.is_empty() {
        fields.push_str("<p>Küsimusi veel pole.</p>");
    }

    let body = format!(
        r#"<h1>Check-in: nädal {}</h1>
<form method="post" action="/checkin">
{fields}
<button type="submit">Salvesta</button>
</form>"#,
        format_week(week)
    );
    layout("Check-in", page, &body)
}

pub fn dashboard(
    page: &Page<'_>,
    checkins: &[CheckInWithAnswers],
    streak: u32,
    scale_question: Option<&Question>,
    chart: &ChartSeries,
) -> Html<String> {
    let mut body = format!(
        r#"<h1>Ülevaade</h1>
<p class="streak">Järjestikuseid nädalaid: <strong>{streak}</strong></p>"#
    );

    if let Some(q) = scale_question {
        if !chart.is_empty() {
            let _ = write!(
                body,
                r#"<h2>{}</h2>
<canvas id="chart"></canvas>
<script src="{CHART_JS}"></script>
<script>
const data = {};
new Chart(document.getElementById("chart"), {{
  type: "line",
  data: {{ labels: data.labels, datasets: [{{ label: "", data: data.values, spanGaps: true }}] }},
  options: {{ scales: {{ y: {{ min: 1, max: 10 }} }}, plugins: {{ legend: {{ display: false }} }} }}
}});
</script>"#,
                escape(&q.text),
                json_script(chart)
            );
        }
    }

    body.push_str("<h2>Varasemad check-inid</h2>\n");
    if checkins.is_empty() {
        body.push_str(r#"<p>Check-ine veel pole. <a href="/checkin">Alusta siit</a>.</p>"#);
    } else {
        body.push_str("<ul>\n");
        for c in checkins {
            let _ = writeln!(
                body,
                r#"<li><a href="/week/{}">{}</a> ({} vastust)</li>"#,
                c.checkin.id,
                format_week(c.checkin.week_start),
                c.answers.len()
            );
        }
        body.push_str("</ul>");
    }

    layout("Ülevaade", page, &body)
}

pub fn week_detail(page: &Page<'_>, detail: &CheckInDetail) -> Html<String> {
    let week = format_week(detail.checkin.week_start);
    let mut body = format!("<h1>Nädal {week}</h1>\n");
    if detail.lines.is_empty() {
        body.push_str("<p>Vastuseid pole.</p>");
    } else {
        body.push_str("<dl>\n");
        for line in &detail.lines {
            let _ = writeln!(
                body,
                "<dt>{}</dt><dd>{}</dd>",
                escape(&line.question_text),
                escape(&line.value)
            );
        }
        body.push_str("</dl>");
    }
    body.push_str(r#"<p><a href="/dashboard">Tagasi</a></p>"#);
    layout(&format!("Nädal {week}"), page, &body)
}

pub fn couple(page: &Page<'_>, scale_question: &Question, chart: &CoupleChart) -> Html<String> {
    let mut legend = String::from("<ul>\n");
    for s in &chart.series {
        let _ = writeln!(legend, "<li>{}</li>", escape(&s.name));
    }
    legend.push_str("</ul>");

    let body = format!(
        r#"<h1>Meie graafik</h1>
<h2>{}</h2>
{legend}
<canvas id="chart"></canvas>
<script src="{CHART_JS}"></script>
<script>
const data = {};
new Chart(document.getElementById("chart"), {{
  type: "line",
  data: {{
    labels: data.labels,
    datasets: data.series.map(s => ({{ label: s.name, data: s.values, spanGaps: true }}))
  }},
  options: {{ scales: {{ y: {{ min: 1, max: 10 }} }} }}
}});
</script>"#,
        escape(&scale_question.text),
        json_script(chart)
    );
    layout("Meie graafik", page, &body)
}

pub fn admin_questions(page: &Page<'_>, questions: &[Question]) -> Html<String> {
    let mut list = String::from("<ol>\n");
    for q in questions {
        let _ = writeln!(list, "<li>{} <small>({})</small></li>", escape(&q.text), q.kind);
    }
    list.push_str("</ol>");

    let body = format!(
        r#"<h1>Küsimused</h1>
{list}
<h2>Lisa küsimus</h2>
<form method="post" action="/admin/questions">
<label>Tekst <input type="text" name="text" maxlength="255" required></label>
<label>Tüüp
<select name="kind">
<option value="text">tekst</option>
<option value="scale">skaala (1–10)</option>
</select></label>
<button type="submit">Lisa</button>
</form>"#
    );
    layout("Küsimused", page, &body)
}

pub fn error(status: StatusCode, message: &str) -> Html<String> {
    let body = format!(
        r#"<h1>{}</h1>
<p>{}</p>
<p><a href="/">Avalehele</a></p>"#,
        status.as_u16(),
        escape(message)
    );
    layout(message, &Page::default(), &body)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_markup() {
        assert_eq!(escape(r#"<b>"x" & 'y'</b>"#), "&lt;b&gt;&quot;x&quot; &amp; &#x27;y&#x27;&lt;/b&gt;");
    }

    #[test]
    fn script_json_cannot_close_the_tag() {
        let chart = ChartSeries {
            labels: vec!["</script><script>alert(1)".into()],
            values: vec![Some(1)],
        };
        assert!(!json_script(&chart).contains("</script>"));
    }

    #[test]
    fn flashes_render_with_category() {
        let page = Page {
            user: None,
            is_admin: false,
            flashes: vec![Flash::danger("Vale <kasutaja>")],
        };
        let Html(html) = login(&page, "");
        assert!(html.contains(r#"class="flash flash-danger">Vale &lt;kasutaja&gt;"#));
    }
}
