//! Server-rendered HTML views
//!
//! - `repos`: repository list for the signed-in user
//! - `error`: generic failure page

use axum::response::Html;

use crate::github::Repository;

const PAGE_STYLE: &str = "body { font-family: sans-serif; max-width: 40rem; margin: 2rem auto; }";

fn render_page(title: &str, body: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="utf-8" />
  <meta name="viewport" content="width=device-width, initial-scale=1" />
  <title>{}</title>
  <style>{}</style>
</head>
<body>
{}
</body>
</html>"#,
        html_escape::encode_text(title),
        PAGE_STYLE,
        body
    )
}

/// Render the `repos` view
///
/// `name` is the greeting target from the landing query string.
pub fn render_repos(name: &str, repos: &[Repository]) -> Html<String> {
    let items = if repos.is_empty() {
        "  <p>No repositories found.</p>".to_string()
    } else {
        let entries = repos
            .iter()
            .map(|repo| {
                format!(
                    "    <li><a href=\"{}\">{}</a></li>",
                    html_escape::encode_double_quoted_attribute(&repo.html_url),
                    html_escape::encode_text(&repo.name)
                )
            })
            .collect::<Vec<_>>()
            .join("\n");
        format!("  <ul class=\"repos\">\n{}\n  </ul>", entries)
    };

    let body = format!(
        r#"  <h1>Hello, {}!</h1>
  <p>Your repositories, newest first:</p>
{}
  <form method="post" action="/logout">
    <button type="submit">Sign out</button>
  </form>"#,
        html_escape::encode_text(name),
        items
    );

    Html(render_page("Repositories", &body))
}

/// Render the `error` view
pub fn render_error(message: &str) -> Html<String> {
    let body = format!(
        r#"  <h1>Error</h1>
  <p class="error">{}</p>
  <p><a href="/">Start over</a></p>"#,
        html_escape::encode_text(message)
    );

    Html(render_page("Error", &body))
}
