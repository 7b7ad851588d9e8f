//! Markdown rendering for posts and segment text

use pulldown_cmark::{html, Options, Parser};

pub fn markdown_to_html(text: &str) -> String {
    let parser = Parser::new_ext(text, Options::ENABLE_TABLES | Options::ENABLE_STRIKETHROUGH);
    let mut output = String::with_capacity(text.len() * 3 / 2);
    html::push_html(&mut output, parser);
    output
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_renders_paragraph_and_emphasis() {
        assert_eq!(
            markdown_to_html("Call us *today*"),
            "<p>Call us <em>today</em></p>\n"
        );
    }
}
