use regex::bytes::{Captures, Regex};
use std::borrow::Cow;
use std::sync::LazyLock;

/// A root-relative `href`/`src` attribute: one leading slash, then anything
/// up to the matching closing quote. Protocol-relative `//` URLs are left
/// alone. Double-quoted values land in groups 1-2, single-quoted in 3-4.
/// Matching is bytewise so documents in any encoding are handled.
static ROOT_RELATIVE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?-u)(href|src)="/([^/"][^"]*)?"|(href|src)='/([^/'][^']*)?'"#).unwrap());

/// Makes root-relative asset URLs absolute so WeasyPrint can fetch them.
///
/// `root` must end with `/`; the attribute's own leading slash is dropped.
/// Input without any such attribute is returned as-is.
pub fn translate_paths<'a>(html: &'a [u8], root: &str) -> Cow<'a, [u8]> {
    ROOT_RELATIVE.replace_all(html, |caps: &Captures<'_>| {
        let (attr, quote, value) = match caps.get(1) {
            Some(attr) => (attr.as_bytes(), b'"', caps.get(2)),
            None => (&caps[3], b'\'', caps.get(4)),
        };
        let value = value.map_or(&b""[..], |m| m.as_bytes());
        let mut out = Vec::with_capacity(caps[0].len() + root.len());
        out.extend_from_slice(attr);
        out.push(b'=');
        out.push(quote);
        out.extend_from_slice(root.as_bytes());
        out.extend_from_slice(value);
        out.push(quote);
        out
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    const ROOT: &str = "http://example.com/";

    fn translate(html: &str) -> String {
        String::from_utf8(translate_paths(html.as_bytes(), ROOT).into_owned()).unwrap()
    }

    #[rstest]
    #[case(r#"<img src="/test.png" />"#, r#"<img src="http://example.com/test.png" />"#)]
    #[case(r#"<img src='/test.png' />"#, r#"<img src='http://example.com/test.png' />"#)]
    #[case(r#"<a href="/a/b.html">"#, r#"<a href="http://example.com/a/b.html">"#)]
    #[case(r#"<link href='/c.css'>"#, r#"<link href='http://example.com/c.css'>"#)]
    #[case(r#"<a href="/">home</a>"#, r#"<a href="http://example.com/">home</a>"#)]
    #[case(r#"<a href='/'>home</a>"#, r#"<a href='http://example.com/'>home</a>"#)]
    fn test_root_relative_paths_are_absolutized(#[case] html: &str, #[case] expected: &str) {
        assert_eq!(translate(html), expected);
    }

    #[rstest]
    #[case(r#"<img src="//cdn.example.org/x.png" />"#)]
    #[case(r#"<img src="https://example.org/x.png" />"#)]
    #[case(r#"<img src="x.png" /><a href="../y">"#)]
    #[case(r#"<img src='//cdn.example.org/x.png' />"#)]
    #[case(r#"<a href="/a.html'>"#)]
    #[case("<p>No links here at all.</p>")]
    fn test_other_urls_are_untouched(#[case] html: &str) {
        let out = translate_paths(html.as_bytes(), ROOT);
        assert!(matches!(out, Cow::Borrowed(_)));
        assert_eq!(&*out, html.as_bytes());
    }

    #[rstest]
    #[case::apostrophe_inside_double_quotes(
        r#"<img src="/it's.png" alt="x">"#,
        r#"<img src="http://example.com/it's.png" alt="x">"#
    )]
    #[case::double_quote_inside_single_quotes(
        r#"<a href='/say"hi"' title='x'>"#,
        r#"<a href='http://example.com/say"hi"' title='x'>"#
    )]
    fn test_values_run_to_the_matching_quote(#[case] html: &str, #[case] expected: &str) {
        assert_eq!(translate(html), expected);
    }

    #[test]
    fn every_occurrence_is_translated() {
        let html = r#"<link href="/a.css"><script src="/b.js"></script><img src="/c.png">"#;
        assert_eq!(
            translate(html),
            r#"<link href="http://example.com/a.css"><script src="http://example.com/b.js"></script><img src="http://example.com/c.png">"#
        );
    }

    #[test]
    fn custom_root_with_a_path() {
        let out = translate_paths(br#"<img src="/x.png">"#, "https://cdn.example.com/assets/");
        assert_eq!(&*out, br#"<img src="https://cdn.example.com/assets/x.png">"#);
    }

    #[test]
    fn non_utf8_bytes_survive() {
        let html = b"<p>\xff</p><img src=\"/x.png\">";
        let out = translate_paths(html, ROOT);
        assert_eq!(&*out, b"<p>\xff</p><img src=\"http://example.com/x.png\">");
    }

    #[test]
    fn non_utf8_bytes_inside_a_value_are_kept() {
        let out = translate_paths(b"<img src=\"/caf\xe9.png\">", ROOT);
        assert_eq!(&*out, b"<img src=\"http://example.com/caf\xe9.png\">");
    }
}
