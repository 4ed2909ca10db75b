//! The small markdown subset chat replies use: blank lines collapse, a line
//! starting with `- ` becomes a bullet, every other newline is a break.

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Text(String),
    LineBreak,
    Bullet,
}

pub const BULLET: &str = "• ";

pub fn parse(text: &str) -> Vec<Node> {
    // Pairs are collapsed left to right, so "\n\n\n" leaves two newlines.
    let collapsed = text.replace("\n\n", "\n");

    let mut nodes = Vec::new();
    let mut run = String::new();
    let mut rest = collapsed.as_str();

    while let Some(index) = rest.find('\n') {
        run.push_str(&rest[..index]);
        flush(&mut run, &mut nodes);
        nodes.push(Node::LineBreak);

        rest = &rest[index + 1..];
        if let Some(item) = rest.strip_prefix("- ") {
            nodes.push(Node::Bullet);
            rest = item;
        }
    }
    run.push_str(rest);
    flush(&mut run, &mut nodes);

    nodes
}

fn flush(run: &mut String, nodes: &mut Vec<Node>) {
    if !run.is_empty() {
        nodes.push(Node::Text(std::mem::take(run)));
    }
}

/// Renders nodes as HTML. Text runs are always escaped.
pub fn to_html(nodes: &[Node]) -> String {
    let mut html = String::new();
    for node in nodes {
        match node {
            Node::Text(text) => escape_html_into(text, &mut html),
            Node::LineBreak => html.push_str("<br>"),
            Node::Bullet => html.push_str(BULLET),
        }
    }
    html
}

pub fn to_plain_text(nodes: &[Node]) -> String {
    let mut plain = String::new();
    for node in nodes {
        match node {
            Node::Text(text) => plain.push_str(text),
            Node::LineBreak => plain.push('\n'),
            Node::Bullet => plain.push_str(BULLET),
        }
    }
    plain
}

pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    escape_html_into(text, &mut escaped);
    escaped
}

fn escape_html_into(text: &str, out: &mut String) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
}
