// src/report.rs

//! Printable quiz history.
//!
//! The document is self-contained HTML meant for the browser's print-to-PDF.
//! Rows appear in insertion order, unranked.

use chrono::NaiveDate;

use crate::{
    models::quiz_attempt::{Marks, QuizAttempt},
    utils::html::escape_text,
};

const STYLE: &str = r#"
body { font-family: Arial, Helvetica, sans-serif; margin: 2rem; color: #222; }
h1 { font-size: 1.4rem; margin-bottom: 0.25rem; }
p.meta { color: #555; margin-top: 0; }
table { border-collapse: collapse; width: 100%; }
th, td { border: 1px solid #999; padding: 0.4rem 0.6rem; text-align: center; }
th { background: #eee; }
@media print { body { margin: 0; } }
"#;

fn yes_no(flag: bool) -> &'static str {
    if flag { "Yes" } else { "No" }
}

fn marks_cell(marks: Option<i32>) -> String {
    match Marks::from_option(marks) {
        Marks::Score(score) => score.to_string(),
        Marks::NotAttempted(sentinel) => sentinel.to_string(),
    }
}

/// Renders every attempt of `email` as an HTML table.
pub fn render_history_html(email: &str, attempts: &[QuizAttempt], generated_on: NaiveDate) -> String {
    let email = escape_text(email);
    let mut rows = String::new();

    for (i, a) in attempts.iter().enumerate() {
        rows.push_str(&format!(
            "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>\n",
            i + 1,
            yes_no(a.basic_quiz),
            marks_cell(a.basic_quiz_marks),
            yes_no(a.advance_quiz),
            marks_cell(a.advance_quiz_marks),
            a.date.format("%Y-%m-%d"),
        ));
    }

    if attempts.is_empty() {
        rows.push_str("<tr><td colspan=\"6\">No quiz attempts recorded.</td></tr>\n");
    }

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>Quiz history - {email}</title>
<style>{STYLE}</style>
</head>
<body>
<h1>Quiz history</h1>
<p class="meta">{email} &middot; generated {generated}</p>
<table>
<thead>
<tr><th>Attempt</th><th>Basic quiz</th><th>Basic marks</th><th>Advanced quiz</th><th>Advanced marks</th><th>Date</th></tr>
</thead>
<tbody>
{rows}</tbody>
</table>
</body>
</html>
"#,
        generated = generated_on.format("%Y-%m-%d"),
    )
}
