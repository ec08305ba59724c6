/// Escape characters that would end a `**bold**` span early: `\`, `*`, `` ` ``.
pub(crate) fn escape_md_bold(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        if matches!(c, '\\' | '*' | '`') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Collapse a value onto one line so it can sit in a heading or list item.
pub(crate) fn single_line(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}
