//! Placeholder rendering for email templates stored in the database.
//!
//! Back-office users edit subject and body text containing `{{ name }}`
//! placeholders. Rendering is deliberately dumb: no loops, no conditionals,
//! unknown names render as nothing.

use std::collections::BTreeMap;

use askama::filters::{self, Html};

/// Variables available to a template.
pub type TemplateVars = BTreeMap<String, String>;

/// How substituted values are written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Escape {
    /// Values are inserted verbatim (subjects, plain-text bodies).
    None,
    /// Values are HTML-escaped (HTML bodies).
    Html,
}

/// HTML-escape a value with askama's escaper, matching the fallback email
/// templates.
#[must_use]
pub fn escape_html(value: &str) -> String {
    let Ok(escaped) = filters::escape(value, Html);
    escaped.to_string()
}

fn is_placeholder_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.')
}

/// Replace every `{{ name }}` in `template` with its value from `vars`.
///
/// Braces that do not enclose a valid name are copied through untouched.
///
/// ```
/// use greenleaf_core::template::{Escape, TemplateVars, render};
///
/// let mut vars = TemplateVars::new();
/// vars.insert("name".into(), "<Sam>".into());
/// assert_eq!(render("Hi {{ name }}!", &vars, Escape::Html), "Hi &#60;Sam&#62;!");
/// ```
#[must_use]
pub fn render(template: &str, vars: &TemplateVars, escape: Escape) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some((before, after_open)) = rest.split_once("{{") {
        out.push_str(before);

        match after_open.split_once("}}") {
            Some((name, after_close)) if is_placeholder_name(name.trim()) => {
                let value = vars.get(name.trim()).map_or("", String::as_str);
                match escape {
                    Escape::None => out.push_str(value),
                    Escape::Html => out.push_str(&escape_html(value)),
                }
                rest = after_close;
            }
            _ => {
                out.push_str("{{");
                rest = after_open;
            }
        }
    }

    out.push_str(rest);
    out
}

/// Placeholder names used in `template`, in order of first appearance.
#[must_use]
pub fn placeholders(template: &str) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    let mut rest = template;
    while let Some((_, after_open)) = rest.split_once("{{") {
        let Some((name, after_close)) = after_open.split_once("}}") else {
            break;
        };
        let name = name.trim();
        if is_placeholder_name(name) && !names.iter().any(|n| n == name) {
            names.push(name.to_owned());
        }
        rest = after_close;
    }
    names
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> TemplateVars {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect()
    }

    #[test]
    fn test_render_substitutes_and_tolerates_spacing() {
        let v = vars(&[("order_number", "#1001"), ("total", "$50.00")]);
        assert_eq!(
            render("Order {{order_number}} came to {{  total }}.", &v, Escape::None),
            "Order #1001 came to $50.00."
        );
    }

    #[test]
    fn test_unknown_placeholder_renders_empty() {
        assert_eq!(render("[{{ missing }}]", &TemplateVars::new(), Escape::None), "[]");
    }

    #[test]
    fn test_html_escaping_only_applies_to_values() {
        let v = vars(&[("name", "Tom & \"Jerry\"")]);
        assert_eq!(
            render("<p>{{ name }}</p>", &v, Escape::Html),
            "<p>Tom &#38; &#34;Jerry&#34;</p>"
        );
    }

    #[test]
    fn test_escape_html_covers_quotes() {
        assert_eq!(escape_html("<a href='x'>"), "&#60;a href=&#39;x&#39;&#62;");
        assert_eq!(escape_html("plain text"), "plain text");
    }

    #[test]
    fn test_unbalanced_and_invalid_braces_pass_through() {
        let v = vars(&[("a", "1")]);
        assert_eq!(render("{{ a }} {{", &v, Escape::None), "1 {{");
        assert_eq!(render("{{ not valid }}", &v, Escape::None), "{{ not valid }}");
        assert_eq!(render("{ a }", &v, Escape::None), "{ a }");
    }

    #[test]
    fn test_placeholders_deduplicates() {
        assert_eq!(
            placeholders("{{a}} {{ b }} {{a}} {{ bad name }}"),
            vec!["a".to_owned(), "b".to_owned()]
        );
    }
}
