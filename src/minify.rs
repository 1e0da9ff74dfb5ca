//! HTML minification.

/// Minify a full HTML page.
///
/// Closing tags and the `<html>`/`<head>` opening tags are kept so the output
/// stays valid for naive consumers; comments go, inline CSS and JS are
/// minified. The result depends only on the input.
pub fn minify(html: &[u8]) -> Vec<u8> {
    let mut cfg = minify_html::Cfg::new();
    cfg.keep_closing_tags = true;
    cfg.keep_html_and_head_opening_tags = true;
    cfg.keep_comments = false;
    cfg.minify_css = true;
    cfg.minify_js = true;
    cfg.remove_bangs = true;
    cfg.remove_processing_instructions = true;
    minify_html::minify(html, &cfg)
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"<!DOCTYPE html>
<html lang="en">
  <head>
    <title>  Page  </title>
    <style>
      .a   {   color :  red ;  }
    </style>
  </head>
  <body>
    <!-- drop me -->
    <p>
      Hello     world
    </p>
  </body>
</html>"#;

    #[test]
    fn shrinks_whitespace_and_drops_comments() {
        let out = String::from_utf8(minify(PAGE.as_bytes())).unwrap();
        assert!(out.len() < PAGE.len());
        assert!(!out.contains("drop me"));
        assert!(!out.contains("\n    "));
        assert!(out.contains("Hello world"));
    }

    #[test]
    fn keeps_closing_tags() {
        let out = String::from_utf8(minify(PAGE.as_bytes())).unwrap();
        assert!(out.contains("</p>"));
        assert!(out.contains("</body>"));
        assert!(out.contains("<head>"));
    }

    #[test]
    fn minify_is_pure() {
        assert_eq!(minify(PAGE.as_bytes()), minify(PAGE.as_bytes()));
    }
}
