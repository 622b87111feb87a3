//! HTML page rendering for the form and its result.

use ssg_core::{
    formatting::escape_html,
    story::{profile::MIN_AGE, Gender},
};

use crate::handlers::StoryForm;

pub const TITLE: &str = "Social Story Generator 🧩";
pub const SUBMIT_LABEL: &str = "Create Social Story";
pub const PENDING_LABEL: &str = "Generating Social Story...";

/// What to show under the form.
#[derive(Clone, Copy, Debug)]
pub enum Outcome<'a> {
    Empty,
    Error(&'a str),
    /// Already-rendered story HTML.
    Story(&'a str),
}

const STYLE: &str = r#"
body { font-family: Arial, sans-serif; max-width: 720px; margin: 40px auto; padding: 0 16px; color: #222; }
label { display: block; margin-top: 12px; font-weight: bold; }
input, select { width: 100%; padding: 8px; margin-top: 4px; box-sizing: border-box; }
button { margin-top: 20px; padding: 10px 18px; background: #4a90e2; color: #fff; border: 0; border-radius: 6px; cursor: pointer; }
button[disabled] { background: #9bbde8; cursor: progress; }
.error { margin-top: 20px; padding: 12px; border-radius: 6px; background: #fdecea; color: #8a1c1c; }
.result { margin-top: 24px; }
"#;

pub fn render(model_label: &str, form: &StoryForm, outcome: Outcome<'_>) -> String {
    let gender_options = Gender::ALL
        .iter()
        .map(|g| {
            let selected = if form.gender.trim().eq_ignore_ascii_case(g.as_str()) {
                " selected"
            } else {
                ""
            };
            format!("<option value=\"{g}\"{selected}>{g}</option>")
        })
        .collect::<Vec<_>>()
        .join("");

    let age = if form.age.trim().is_empty() {
        MIN_AGE.to_string()
    } else {
        form.age.clone()
    };

    let result = match outcome {
        Outcome::Empty => String::new(),
        Outcome::Error(msg) => format!("<div class=\"error\">{}</div>", escape_html(msg)),
        Outcome::Story(html) => format!("<div class=\"result\">{html}</div>"),
    };

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>{title}</title>
<style>{STYLE}</style>
</head>
<body>
<h1>{title}</h1>
<p>🧠 Using model: {model}</p>
<form method="post" action="/generate" onsubmit="var b=this.querySelector('button');b.disabled=true;b.textContent='{PENDING_LABEL}';">
<label for="gender">Gender of the child:</label>
<select id="gender" name="gender">{gender_options}</select>
<label for="name">Child's Name:</label>
<input id="name" name="name" type="text" value="{name}">
<label for="age">Child's Age:</label>
<input id="age" name="age" type="number" min="{MIN_AGE}" step="1" value="{age}">
<label for="situation">Describe the situation:</label>
<input id="situation" name="situation" type="text" value="{situation}">
<button type="submit">{SUBMIT_LABEL}</button>
</form>
{result}
</body>
</html>
"#,
        title = escape_html(TITLE),
        model = escape_html(model_label),
        name = escape_html(&form.name),
        age = escape_html(&age),
        situation = escape_html(&form.situation),
    )
}
