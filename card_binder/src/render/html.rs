//! Page and index markup

use super::{page_file_name, TileView};
use crate::config::PageLayout;

/// Escape text for use in HTML element content and quoted attributes
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

fn head(title: &str) -> String {
    format!(
        "<!DOCTYPE html>\n\
         <html lang=\"en\">\n\
         <head>\n\
         <meta charset=\"utf-8\">\n\
         <meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n\
         <title>{}</title>\n\
         <link rel=\"stylesheet\" href=\"assets/styles.css\">\n\
         </head>\n",
        escape_html(title)
    )
}

fn pager(page_number: usize, total_pages: usize) -> String {
    let mut nav = String::from("<nav class=\"pager\">\n<a href=\"index.html\">Index</a>\n");
    if page_number > 1 {
        nav.push_str(&format!(
            "<a class=\"prev\" href=\"{}\">&larr; Previous</a>\n",
            page_file_name(page_number - 1)
        ));
    }
    nav.push_str(&format!(
        "<span class=\"page-number\">Page {} of {}</span>\n",
        page_number, total_pages
    ));
    if page_number < total_pages {
        nav.push_str(&format!(
            "<a class=\"next\" href=\"{}\">Next &rarr;</a>\n",
            page_file_name(page_number + 1)
        ));
    }
    nav.push_str("</nav>\n");
    nav
}

fn tile(tile: &TileView, anchor: &str) -> String {
    let name = escape_html(&tile.name);
    let foil = if tile.foil { "yes" } else { "no" };

    let (class, face) = match &tile.image_path {
        Some(path) => (
            "slot",
            format!(
                "<img src=\"{}\" alt=\"{}\" loading=\"lazy\">",
                escape_html(path),
                name
            ),
        ),
        None => (
            "slot placeholder",
            format!("<span class=\"placeholder-name\">{}</span>", name),
        ),
    };

    let mut html = format!("<div class=\"{}\">\n", class);
    html.push_str(&format!("<a class=\"card\" href=\"#{}\">\n{}\n", anchor, face));
    html.push_str(&format!("<span class=\"owned\">&times;{}</span>\n", tile.owned));
    if tile.foil {
        html.push_str("<span class=\"foil-badge\">Foil</span>\n");
    }
    html.push_str("</a>\n");

    html.push_str(&format!("<div class=\"popover\" id=\"{}\">\n", anchor));
    html.push_str("<a class=\"popover-close\" href=\"#\">&times;</a>\n");
    if let Some(path) = &tile.image_path {
        html.push_str(&format!(
            "<img src=\"{}\" alt=\"{}\">\n",
            escape_html(path),
            name
        ));
    }
    html.push_str(&format!(
        "<dl>\n\
         <dt>Name</dt><dd class=\"name\">{}</dd>\n\
         <dt>Owned</dt><dd class=\"owned\">{}</dd>\n\
         <dt>Foil</dt><dd class=\"foil\">{}</dd>\n\
         <dt>Condition</dt><dd class=\"condition\">{}</dd>\n\
         </dl>\n",
        name,
        tile.owned,
        foil,
        tile.condition.display_name()
    ));
    html.push_str("</div>\n</div>\n");
    html
}

/// Render one binder page.
///
/// `slots` is already padded to the page size; `first_index` is the global
/// position of the first slot, used for stable popover anchors.
pub(super) fn render_page(
    binder_name: &str,
    page_number: usize,
    total_pages: usize,
    first_index: usize,
    slots: &[Option<&TileView>],
    layout: PageLayout,
) -> String {
    let mut html = head(&format!(
        "{} - page {} of {}",
        binder_name, page_number, total_pages
    ));
    html.push_str("<body>\n<header class=\"binder-header\">\n");
    html.push_str(&format!("<h1>{}</h1>\n", escape_html(binder_name)));
    html.push_str(&pager(page_number, total_pages));
    html.push_str("</header>\n");
    html.push_str(&format!(
        "<main class=\"binder-page\" style=\"grid-template-columns: repeat({}, 1fr);\">\n",
        layout.cols
    ));

    for (offset, slot) in slots.iter().enumerate() {
        match slot {
            Some(view) => html.push_str(&tile(view, &format!("card-{}", first_index + offset + 1))),
            None => html.push_str("<div class=\"slot empty\"></div>\n"),
        }
    }

    html.push_str("</main>\n</body>\n</html>\n");
    html
}

/// Render the index linking every page
pub(super) fn render_index(binder_name: &str, total_pages: usize, total_cards: usize) -> String {
    let mut html = head(binder_name);
    html.push_str("<body>\n<header class=\"binder-header\">\n");
    html.push_str(&format!("<h1>{}</h1>\n", escape_html(binder_name)));
    html.push_str(&format!(
        "<p class=\"summary\">{} cards on {} pages</p>\n",
        total_cards, total_pages
    ));
    html.push_str("</header>\n<main>\n<ol class=\"page-index\">\n");
    for page in 1..=total_pages {
        html.push_str(&format!(
            "<li><a href=\"{}\">Page {}</a></li>\n",
            page_file_name(page),
            page
        ));
    }
    html.push_str("</ol>\n</main>\n</body>\n</html>\n");
    html
}
