use std::sync::Arc;

use axum::{extract::State, response::Html};

use crate::router::AppState;

pub async fn landing_page(State(state): State<Arc<AppState>>) -> Html<String> {
    let name = escape_html(state.build.name);
    let path = escape_html(&state.telemetry_path);
    let build = escape_html(&state.build.to_string());

    Html(format!(
        "<html>\n\
         <head><title>{name}</title></head>\n\
         <body>\n\
         <h1>{name}</h1>\n\
         <p><a href=\"{path}\">metrics</a></p>\n\
         <h2>Build</h2>\n\
         <pre>{build}</pre>\n\
         </body>\n\
         </html>\n"
    ))
}

fn escape_html(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
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
