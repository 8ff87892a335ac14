//! Output sink for everything the viewer shows.
//!
//! Nothing writes to the terminal directly; the session and the menu loop are
//! handed a [`Console`] and describe what to show. [`TerminalConsole`] renders
//! tables and panels with ratatui widgets into an off-screen buffer and flushes it
//! with crossterm styling, so output scrolls like ordinary terminal text.
//! [`MemoryConsole`] keeps the records for inspection in tests.

use crossterm::{
    queue,
    style::{Attribute, Color as TermColor, Print, ResetColor, SetAttribute, SetForegroundColor},
};
use ratatui::{
    buffer::{Buffer, Cell as BufferCell},
    layout::{Constraint, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Text},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table, Widget},
};
use std::io::{self, Write};
use unicode_width::UnicodeWidthStr;

const COLUMN_SPACING: u16 = 2;
const FALLBACK_WIDTH: u16 = 80;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    Plain,
    Heading,
    Info,
    Accent,
    Success,
    Notice,
    Error,
}

impl Tone {
    pub fn style(self) -> Style {
        match self {
            Tone::Plain => Style::default(),
            Tone::Heading => Style::default().fg(Color::Blue).add_modifier(Modifier::BOLD),
            Tone::Info => Style::default().fg(Color::Blue),
            Tone::Accent => Style::default().fg(Color::Cyan),
            Tone::Success => Style::default().fg(Color::Green),
            Tone::Notice => Style::default().fg(Color::Yellow),
            Tone::Error => Style::default().fg(Color::Red),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub header: String,
    pub tone: Tone,
}

impl Column {
    pub fn new(header: &str, tone: Tone) -> Column {
        Column {
            header: header.to_string(),
            tone,
        }
    }
}

/// A titled table of text cells.
#[derive(Debug, Clone, PartialEq)]
pub struct TableView {
    pub title: String,
    pub columns: Vec<Column>,
    pub rows: Vec<Vec<String>>,
}

impl TableView {
    pub fn new(title: impl Into<String>, columns: Vec<Column>) -> TableView {
        TableView {
            title: title.into(),
            columns,
            rows: Vec::new(),
        }
    }

    pub fn add_row(&mut self, cells: Vec<String>) {
        self.rows.push(cells);
    }

    /// Cells of one column, top to bottom.
    pub fn column(&self, index: usize) -> Vec<&str> {
        self.rows
            .iter()
            .map(|row| row.get(index).map(String::as_str).unwrap_or(""))
            .collect()
    }
}

pub trait Console {
    fn table(&mut self, table: &TableView);
    fn panel(&mut self, text: &str, tone: Tone);
    fn message(&mut self, text: &str, tone: Tone);
    /// Shows a prompt and leaves the cursor on the same line.
    fn prompt(&mut self, text: &str);
}

/// Writes styled output to a terminal (or any writer).
pub struct TerminalConsole<W: Write> {
    out: W,
    width: Option<u16>,
}

impl TerminalConsole<io::Stdout> {
    pub fn stdout() -> Self {
        TerminalConsole {
            out: io::stdout(),
            width: None,
        }
    }
}

impl<W: Write> TerminalConsole<W> {
    /// A console with a fixed width, for writers that are not a terminal.
    pub fn with_width(out: W, width: u16) -> Self {
        TerminalConsole {
            out,
            width: Some(width),
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn width(&self) -> u16 {
        self.width.unwrap_or_else(|| {
            crossterm::terminal::size()
                .map(|(w, _)| w)
                .unwrap_or(FALLBACK_WIDTH)
        })
    }

    fn emit(&mut self, result: io::Result<()>) {
        if let Err(e) = result.and_then(|_| self.out.flush()) {
            tracing::debug!(error = %e, "console write failed");
        }
    }
}

impl<W: Write> Console for TerminalConsole<W> {
    fn table(&mut self, table: &TableView) {
        let buffer = render_table(table, self.width());
        let result = write_buffer(&mut self.out, &buffer);
        self.emit(result);
    }

    fn panel(&mut self, text: &str, tone: Tone) {
        let buffer = render_panel(text, tone, self.width());
        let result = write_buffer(&mut self.out, &buffer);
        self.emit(result);
    }

    fn message(&mut self, text: &str, tone: Tone) {
        let result = write_styled(&mut self.out, text, tone.style())
            .and_then(|_| queue!(self.out, Print("\n")));
        self.emit(result);
    }

    fn prompt(&mut self, text: &str) {
        let result = write_styled(&mut self.out, text, Style::default());
        self.emit(result);
    }
}

/// Renders a table sized to its content, wrapping cells when the content is
/// wider than `max_width`.
pub fn render_table(table: &TableView, max_width: u16) -> Buffer {
    let widths = column_widths(table, max_width);

    let header = Row::new(
        table
            .columns
            .iter()
            .map(|c| Cell::from(c.header.as_str()).style(c.tone.style())),
    )
    .style(Style::default().add_modifier(Modifier::BOLD));

    let mut body_height: u16 = 0;
    let rows: Vec<Row> = table
        .rows
        .iter()
        .map(|cells| {
            let wrapped: Vec<Vec<String>> = widths
                .iter()
                .enumerate()
                .map(|(i, width)| {
                    let text = cells.get(i).map(String::as_str).unwrap_or("");
                    wrap(text, *width as usize)
                })
                .collect();
            let height = wrapped.iter().map(Vec::len).max().unwrap_or(1).max(1) as u16;
            body_height = body_height.saturating_add(height);
            let row_cells = wrapped.into_iter().zip(&table.columns).map(|(lines, column)| {
                let text = Text::from(lines.into_iter().map(Line::from).collect::<Vec<_>>());
                Cell::from(text).style(column.tone.style())
            });
            Row::new(row_cells).height(height)
        })
        .collect();

    let content_width: u16 = widths.iter().sum::<u16>()
        + COLUMN_SPACING.saturating_mul(widths.len().saturating_sub(1) as u16);
    let title_width = display_width(&table.title);
    let width = content_width
        .max(title_width)
        .saturating_add(2)
        .min(max_width.max(4));
    let area = Rect::new(0, 0, width, body_height.saturating_add(3));

    let widget = Table::new(rows, widths.iter().map(|w| Constraint::Length(*w)))
        .header(header)
        .column_spacing(COLUMN_SPACING)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(Line::from(table.title.as_str()).centered()),
        );

    let mut buffer = Buffer::empty(area);
    widget.render(area, &mut buffer);
    buffer
}

pub fn render_panel(text: &str, tone: Tone, max_width: u16) -> Buffer {
    let text_width = display_width(text);
    let width = text_width.saturating_add(4).min(max_width.max(4));
    let lines = wrap(text, width.saturating_sub(4) as usize);
    let height = u16::try_from(lines.len()).unwrap_or(u16::MAX);
    let area = Rect::new(0, 0, width, height.saturating_add(2));

    let paragraph = Paragraph::new(Text::from(
        lines
            .into_iter()
            .map(|line| Line::from(format!(" {}", line)))
            .collect::<Vec<_>>(),
    ))
    .style(tone.style())
    .block(Block::default().borders(Borders::ALL));

    let mut buffer = Buffer::empty(area);
    paragraph.render(area, &mut buffer);
    buffer
}

/// The buffer as plain text, one line per row, trailing blanks removed.
pub fn buffer_lines(buffer: &Buffer) -> Vec<String> {
    let area = buffer.area;
    (area.top()..area.bottom())
        .map(|y| {
            let line: String = visible_cells(buffer, y).map(|cell| cell.symbol()).collect();
            line.trim_end().to_string()
        })
        .collect()
}

fn column_widths(table: &TableView, max_width: u16) -> Vec<u16> {
    let mut widths: Vec<u16> = table
        .columns
        .iter()
        .enumerate()
        .map(|(i, column)| {
            let longest_cell = table
                .rows
                .iter()
                .filter_map(|row| row.get(i))
                .map(|cell| display_width(cell))
                .max()
                .unwrap_or(0);
            longest_cell.max(display_width(&column.header)).max(1)
        })
        .collect();

    let spacing = COLUMN_SPACING.saturating_mul(widths.len().saturating_sub(1) as u16);
    let available = u32::from(max_width.saturating_sub(spacing.saturating_add(2)));
    // Shrink the widest column one step at a time until everything fits
    while widths.iter().map(|w| u32::from(*w)).sum::<u32>() > available {
        match widths.iter_mut().max() {
            Some(widest) if *widest > 1 => *widest -= 1,
            _ => break,
        }
    }
    widths
}

/// Terminal columns taken by `text`.
fn display_width(text: &str) -> u16 {
    u16::try_from(text.width()).unwrap_or(u16::MAX)
}

fn wrap(text: &str, width: usize) -> Vec<String> {
    if width == 0 {
        return vec![String::new()];
    }
    textwrap::wrap(text, width)
        .into_iter()
        .map(|line| line.into_owned())
        .collect()
}

/// Cells of row `y` that start a symbol. A wide glyph covers the cells after it,
/// which hold filler and are skipped.
fn visible_cells(buffer: &Buffer, y: u16) -> impl Iterator<Item = &BufferCell> + '_ {
    let area = buffer.area;
    let mut hidden = 0;
    (area.left()..area.right()).filter_map(move |x| {
        if hidden > 0 {
            hidden -= 1;
            return None;
        }
        let cell = &buffer[(x, y)];
        hidden = cell.symbol().width().saturating_sub(1);
        Some(cell)
    })
}

fn write_buffer<W: Write>(out: &mut W, buffer: &Buffer) -> io::Result<()> {
    for line in styled_lines(buffer) {
        for (text, style) in line {
            write_styled(out, &text, style)?;
        }
        queue!(out, Print("\n"))?;
    }
    Ok(())
}

/// Groups each buffer row into runs of equally styled text.
fn styled_lines(buffer: &Buffer) -> Vec<Vec<(String, Style)>> {
    let area = buffer.area;
    (area.top()..area.bottom())
        .map(|y| {
            let mut runs: Vec<(String, Style)> = Vec::new();
            for cell in visible_cells(buffer, y) {
                let style = cell.style();
                match runs.last_mut() {
                    Some((text, last)) if *last == style => text.push_str(cell.symbol()),
                    _ => runs.push((cell.symbol().to_string(), style)),
                }
            }
            if let Some((text, _)) = runs.last_mut() {
                let trimmed = text.trim_end().len();
                text.truncate(trimmed);
            }
            runs
        })
        .collect()
}

fn write_styled<W: Write>(out: &mut W, text: &str, style: Style) -> io::Result<()> {
    let color = style.fg.and_then(term_color);
    let bold = style.add_modifier.contains(Modifier::BOLD);

    if color.is_none() && !bold {
        return queue!(out, Print(text));
    }
    if let Some(color) = color {
        queue!(out, SetForegroundColor(color))?;
    }
    if bold {
        queue!(out, SetAttribute(Attribute::Bold))?;
    }
    queue!(out, Print(text), SetAttribute(Attribute::Reset), ResetColor)
}

fn term_color(color: Color) -> Option<TermColor> {
    match color {
        Color::Red => Some(TermColor::DarkRed),
        Color::Green => Some(TermColor::DarkGreen),
        Color::Yellow => Some(TermColor::DarkYellow),
        Color::Blue => Some(TermColor::DarkBlue),
        Color::Cyan => Some(TermColor::DarkCyan),
        Color::Magenta => Some(TermColor::DarkMagenta),
        Color::Gray => Some(TermColor::Grey),
        Color::White => Some(TermColor::White),
        _ => None,
    }
}

/// One thing shown on a [`MemoryConsole`].
#[derive(Debug, Clone, PartialEq)]
pub enum Output {
    Table(TableView),
    Panel { text: String, tone: Tone },
    Message { text: String, tone: Tone },
    Prompt(String),
}

/// Records output instead of drawing it.
#[derive(Debug, Default)]
pub struct MemoryConsole {
    pub outputs: Vec<Output>,
}

impl MemoryConsole {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tables(&self) -> Vec<&TableView> {
        self.outputs
            .iter()
            .filter_map(|o| match o {
                Output::Table(t) => Some(t),
                _ => None,
            })
            .collect()
    }

    pub fn messages(&self) -> Vec<(&str, Tone)> {
        self.outputs
            .iter()
            .filter_map(|o| match o {
                Output::Message { text, tone } => Some((text.as_str(), *tone)),
                _ => None,
            })
            .collect()
    }

    pub fn prompts(&self) -> Vec<&str> {
        self.outputs
            .iter()
            .filter_map(|o| match o {
                Output::Prompt(text) => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    pub fn errors(&self) -> Vec<&str> {
        self.messages()
            .into_iter()
            .filter(|(_, tone)| *tone == Tone::Error)
            .map(|(text, _)| text)
            .collect()
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.messages().iter().any(|(text, _)| text.contains(needle))
    }
}

impl Console for MemoryConsole {
    fn table(&mut self, table: &TableView) {
        self.outputs.push(Output::Table(table.clone()));
    }

    fn panel(&mut self, text: &str, tone: Tone) {
        self.outputs.push(Output::Panel {
            text: text.to_string(),
            tone,
        });
    }

    fn message(&mut self, text: &str, tone: Tone) {
        self.outputs.push(Output::Message {
            text: text.to_string(),
            tone,
        });
    }

    fn prompt(&mut self, text: &str) {
        self.outputs.push(Output::Prompt(text.to_string()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_table() -> TableView {
        let mut table = TableView::new(
            "Preview of docs",
            vec![
                Column::new("ID", Tone::Accent),
                Column::new("Document", Tone::Success),
            ],
        );
        table.add_row(vec!["a".to_string(), "hello".to_string()]);
        table.add_row(vec!["b".to_string(), "world".to_string()]);
        table
    }

    #[test]
    fn test_render_table_contains_title_headers_and_cells() {
        let lines = buffer_lines(&render_table(&sample_table(), 80));
        let joined = lines.join("\n");
        assert!(lines[0].contains("Preview of docs"));
        assert!(joined.contains("ID"));
        assert!(joined.contains("Document"));
        assert!(joined.contains("hello"));
        assert!(joined.contains("world"));
        // border, header, two rows, border
        assert_eq!(lines.len(), 5);
    }

    #[test]
    fn test_render_table_wraps_to_width() {
        let mut table = TableView::new("t", vec![Column::new("Value", Tone::Plain)]);
        table.add_row(vec!["x".repeat(50)]);

        let buffer = render_table(&table, 20);
        assert_eq!(buffer.area.width, 20);
        let lines = buffer_lines(&buffer);
        // 50 characters in an 18-wide column take three lines
        assert_eq!(lines.len(), 2 + 1 + 3);
        let xs: usize = lines.iter().map(|l| l.matches('x').count()).sum();
        assert_eq!(xs, 50);
    }

    #[test]
    fn test_column_widths_fit_content() {
        let widths = column_widths(&sample_table(), 80);
        assert_eq!(widths, vec![2, 8]);
    }

    #[test]
    fn test_wrap() {
        assert_eq!(wrap("abcdef", 4), vec!["abcd", "ef"]);
        assert_eq!(wrap("", 4), vec![""]);
        assert_eq!(wrap("ab\ncd", 4), vec!["ab", "cd"]);
        assert_eq!(wrap("hello big world", 9), vec!["hello big", "world"]);
        // two columns per glyph
        assert_eq!(wrap("日本語のドキュメント", 8), vec!["日本語の", "ドキュメ", "ント"]);
    }

    #[test]
    fn test_wide_glyphs_render_whole() {
        let mut table = TableView::new("文書", vec![Column::new("Document", Tone::Success)]);
        table.add_row(vec!["日本語のドキュメント".to_string()]);

        assert_eq!(column_widths(&table, 80), vec![20]);
        let lines = buffer_lines(&render_table(&table, 80));
        assert!(lines[0].contains("文書"));
        assert!(lines.iter().any(|l| l.contains("│日本語のドキュメント│")));

        let mut console = TerminalConsole::with_width(Vec::new(), 80);
        console.table(&table);
        let output = String::from_utf8(console.into_inner()).unwrap();
        assert!(output.contains("日本語のドキュメント"));
    }

    #[test]
    fn test_wide_glyphs_wrap_in_narrow_table() {
        let mut table = TableView::new("t", vec![Column::new("Doc", Tone::Plain)]);
        table.add_row(vec!["日本語のドキュメント".to_string()]);

        let lines = buffer_lines(&render_table(&table, 10));
        let text: String = lines
            .iter()
            .filter(|l| l.starts_with('│'))
            .skip(1)
            .map(|l| l.trim_matches('│').trim_end())
            .collect();
        assert_eq!(text, "日本語のドキュメント");
    }

    #[test]
    fn test_render_panel() {
        let lines = buffer_lines(&render_panel("Connected!", Tone::Success, 80));
        assert_eq!(lines.len(), 3);
        assert!(lines[1].contains("Connected!"));
    }

    #[test]
    fn test_terminal_console_writes_text() {
        let mut console = TerminalConsole::with_width(Vec::new(), 60);
        console.message("Collection is empty", Tone::Notice);
        console.table(&sample_table());
        console.prompt("Select an option [1/2/3]: ");

        let output = String::from_utf8(console.into_inner()).unwrap();
        assert!(output.contains("Collection is empty"));
        assert!(output.contains("Preview of docs"));
        assert!(output.contains("hello"));
        assert!(output.ends_with("Select an option [1/2/3]: "));
    }

    #[test]
    fn test_memory_console_records() {
        let mut console = MemoryConsole::new();
        console.message("oops", Tone::Error);
        console.message("fine", Tone::Info);
        console.table(&sample_table());

        assert_eq!(console.errors(), vec!["oops"]);
        assert_eq!(console.tables().len(), 1);
        assert_eq!(console.tables()[0].column(0), vec!["a", "b"]);
        assert!(console.contains("fine"));
    }
}
