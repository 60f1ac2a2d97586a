//! Width-aware plain-text tables for terminal listings.

#[derive(Clone, Copy)]
pub enum Align {
    Left,
    Right,
}

#[derive(Clone)]
pub struct ColSpec {
    pub title: &'static str,
    pub min: usize,
    pub max: Option<usize>,
    pub weight: usize,
    pub align: Align,
    pub wrap: bool,
}

impl ColSpec {
    pub fn left(title: &'static str, min: usize, max: Option<usize>, weight: usize) -> Self {
        Self {
            title,
            min,
            max,
            weight,
            align: Align::Left,
            wrap: false,
        }
    }

    pub fn right(title: &'static str, min: usize) -> Self {
        Self {
            title,
            min,
            max: Some(min),
            weight: 0,
            align: Align::Right,
            wrap: false,
        }
    }

    pub fn wrapping(mut self) -> Self {
        self.wrap = true;
        self
    }
}

const FALLBACK_WIDTH: usize = 96;

/// Width of the attached terminal, then `$COLUMNS`, then a conservative
/// default when output is not a terminal.
pub fn terminal_width() -> usize {
    let size = crossterm::terminal::size().ok().map(|(w, _h)| w);
    resolve_width(size, std::env::var("COLUMNS").ok())
}

fn resolve_width(terminal: Option<u16>, columns: Option<String>) -> usize {
    terminal
        .filter(|w| *w > 0)
        .map(usize::from)
        .or_else(|| {
            columns
                .and_then(|v| v.trim().parse::<usize>().ok())
                .filter(|w| *w > 0)
        })
        .unwrap_or(FALLBACK_WIDTH)
}

/// Display width, ignoring ANSI color sequences.
pub fn visible_width(s: &str) -> usize {
    let mut w = 0usize;
    let mut it = s.chars().peekable();
    while let Some(ch) = it.next() {
        if ch == '\x1b' {
            if it.peek() == Some(&'[') {
                it.next();
                for c in it.by_ref() {
                    if c.is_ascii_alphabetic() {
                        break;
                    }
                }
            }
            continue;
        }
        w += 1;
    }
    w
}

pub fn truncate_visible(s: &str, max_w: usize) -> String {
    let mut out = String::new();
    let mut w = 0usize;
    let mut it = s.chars().peekable();

    while let Some(ch) = it.next() {
        if ch == '\x1b' {
            out.push(ch);
            if let Some(open) = it.next_if_eq(&'[') {
                out.push(open);
                for c in it.by_ref() {
                    out.push(c);
                    if c.is_ascii_alphabetic() {
                        break;
                    }
                }
            }
            continue;
        }
        if w + 1 > max_w {
            break;
        }
        out.push(ch);
        w += 1;
    }
    out
}

fn pad(s: &str, width: usize, align: Align) -> String {
    let t = truncate_visible(s, width);
    let vw = visible_width(&t);
    if vw >= width {
        return t;
    }
    let fill = " ".repeat(width - vw);
    match align {
        Align::Left => format!("{t}{fill}"),
        Align::Right => format!("{fill}{t}"),
    }
}

fn wrap_words(s: &str, width: usize) -> Vec<String> {
    if width == 0 {
        return vec![String::new()];
    }
    let mut lines = Vec::new();
    let mut cur = String::new();

    for word in s.split_whitespace() {
        let ww = visible_width(word);
        let cur_w = visible_width(&cur);
        if cur_w > 0 && cur_w + 1 + ww <= width {
            cur.push(' ');
            cur.push_str(word);
            continue;
        }
        if cur_w > 0 {
            lines.push(std::mem::take(&mut cur));
        }
        let mut rest: String = word.to_string();
        while visible_width(&rest) > width {
            let chunk = truncate_visible(&rest, width);
            rest = rest.chars().skip(chunk.chars().count()).collect();
            lines.push(chunk);
        }
        cur = rest;
    }

    if !cur.is_empty() {
        lines.push(cur);
    }
    if lines.is_empty() {
        lines.push(String::new());
    }
    lines
}

pub struct Table {
    w: usize,
    gutter: usize,
    cols: Vec<ColSpec>,
    widths: Vec<usize>,
}

impl Table {
    pub fn new(w: usize, gutter: usize, cols: Vec<ColSpec>) -> Self {
        let w = w.max(60);
        let widths = compute_widths(w, gutter, &cols);
        Self {
            w,
            gutter,
            cols,
            widths,
        }
    }

    pub fn header(&self, out: &mut String) {
        let cells: Vec<&str> = self.cols.iter().map(|c| c.title).collect();
        self.row(out, &cells);
    }

    pub fn row(&self, out: &mut String, cells: &[&str]) {
        let per_col: Vec<Vec<String>> = self
            .cols
            .iter()
            .enumerate()
            .map(|(i, col)| {
                let s = cells.get(i).copied().unwrap_or("");
                if col.wrap {
                    wrap_words(s, self.widths[i])
                } else {
                    vec![truncate_visible(s, self.widths[i])]
                }
            })
            .collect();
        let height = per_col.iter().map(Vec::len).max().unwrap_or(1);

        for r in 0..height {
            let mut line = String::new();
            for (i, col) in self.cols.iter().enumerate() {
                if i > 0 {
                    line.push_str(&" ".repeat(self.gutter));
                }
                let cell = per_col[i].get(r).map(String::as_str).unwrap_or("");
                line.push_str(&pad(cell, self.widths[i], col.align));
            }
            out.push_str(line.trim_end());
            out.push('\n');
        }
    }

    pub fn width(&self) -> usize {
        self.w
    }

    pub fn widths(&self) -> &[usize] {
        &self.widths
    }
}

/// Hands out the space left after every column's minimum, by weight, until
/// each column hits its maximum or nothing is left.
fn compute_widths(w: usize, gutter: usize, cols: &[ColSpec]) -> Vec<usize> {
    let gutters_total = gutter * cols.len().saturating_sub(1);
    let mut widths: Vec<usize> = cols.iter().map(|c| c.min).collect();
    let mut remaining = w.saturating_sub(widths.iter().sum::<usize>() + gutters_total);

    loop {
        let growable = |i: usize| cols[i].max.is_none_or(|m| widths[i] < m);
        let total_weight: usize = (0..cols.len())
            .filter(|i| growable(*i))
            .map(|i| cols[i].weight.max(1))
            .sum();
        if remaining == 0 || total_weight == 0 {
            break;
        }

        let mut progressed = false;
        let budget = remaining;
        for (i, c) in cols.iter().enumerate() {
            if remaining == 0 {
                break;
            }
            if c.max.is_some_and(|m| widths[i] >= m) {
                continue;
            }
            let share = (budget * c.weight.max(1) / total_weight).max(1).min(remaining);
            let grown = match c.max {
                Some(m) => (widths[i] + share).min(m),
                None => widths[i] + share,
            };
            let added = grown - widths[i];
            if added > 0 {
                widths[i] = grown;
                remaining -= added;
                progressed = true;
            }
        }
        if !progressed {
            break;
        }
    }
    widths
}
