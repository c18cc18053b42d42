use comrak::{ComrakOptions, markdown_to_html};
use once_cell::sync::Lazy;

static MARKDOWN_OPTIONS: Lazy<ComrakOptions> = Lazy::new(|| {
    let mut options = ComrakOptions::default();
    options.extension.table = true;
    options.extension.strikethrough = true;
    options.extension.autolink = true;
    // Webhook replies are untrusted; raw HTML stays escaped.
    options.render.unsafe_ = false;
    options.render.escape = true;
    options
});

/// Renders an assistant reply for the chat log.
pub fn reply_to_html(md: &str) -> String {
    markdown_to_html(md, &MARKDOWN_OPTIONS)
}
