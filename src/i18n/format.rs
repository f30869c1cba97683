//! Named-placeholder formatting for templates.

use std::borrow::Cow;
use std::collections::HashMap;

/// Named arguments: placeholder name -> replacement text.
pub type TextArgs = HashMap<String, String>;

/// What: Build a `TextArgs` map from name/value pairs.
///
/// Inputs:
/// - `pairs`: Iterator of `(name, value)` pairs
///
/// Output:
/// - `TextArgs` holding every pair (later duplicates win)
pub fn text_args<K, V, I>(pairs: I) -> TextArgs
where
    K: Into<String>,
    V: ToString,
    I: IntoIterator<Item = (K, V)>,
{
    pairs
        .into_iter()
        .map(|(k, v)| (k.into(), v.to_string()))
        .collect()
}

/// What: Substitute `{name}` placeholders in a template.
///
/// Inputs:
/// - `template`: Template text, possibly holding `{name}` placeholders
/// - `args`: Optional named arguments
///
/// Output:
/// - Rendered text; borrowed when nothing had to change
///
/// Details:
/// - Placeholders whose name is absent from `args` stay verbatim, so missing
///   arguments show up in the UI instead of failing
/// - Unbalanced braces and `{}` are copied through untouched
/// - No allocation when `args` is absent/empty or the template has no `{`
#[must_use]
pub fn format<'a>(template: &'a str, args: Option<&TextArgs>) -> Cow<'a, str> {
    let Some(args) = args.filter(|a| !a.is_empty()) else {
        return Cow::Borrowed(template);
    };
    if !template.contains('{') {
        return Cow::Borrowed(template);
    }

    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        match after.find(['{', '}']) {
            Some(close) if close > 0 && after.as_bytes()[close] == b'}' => {
                let name = &after[..close];
                if let Some(value) = args.get(name) {
                    out.push_str(value);
                } else {
                    out.push('{');
                    out.push_str(name);
                    out.push('}');
                }
                rest = &after[close + 1..];
            }
            _ => {
                out.push('{');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    Cow::Owned(out)
}
