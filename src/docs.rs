//! Google Docs API document model: tabs, headings, and per-tab text rendering.

use serde::{Deserialize, Serialize};

use crate::models::TabInfo;

/// A document as returned by `documents.get?includeTabsContent=true`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    #[serde(default)]
    pub document_id: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub tabs: Vec<DocTab>,
    /// Only present for requests made without `includeTabsContent`.
    #[serde(default)]
    pub body: Option<Body>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocTab {
    #[serde(default)]
    pub tab_properties: Option<TabProperties>,
    #[serde(default)]
    pub child_tabs: Vec<DocTab>,
    #[serde(default)]
    pub document_tab: Option<DocumentTab>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TabProperties {
    #[serde(default)]
    pub tab_id: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct DocumentTab {
    #[serde(default)]
    pub body: Option<Body>,
}

#[derive(Debug, Default, Deserialize)]
pub struct Body {
    #[serde(default)]
    pub content: Vec<StructuralElement>,
}

#[derive(Debug, Default, Deserialize)]
pub struct StructuralElement {
    #[serde(default)]
    pub paragraph: Option<Paragraph>,
    #[serde(default)]
    pub table: Option<Table>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Paragraph {
    #[serde(default)]
    pub elements: Vec<ParagraphElement>,
    #[serde(default)]
    pub paragraph_style: Option<ParagraphStyle>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParagraphElement {
    #[serde(default)]
    pub text_run: Option<TextRun>,
}

#[derive(Debug, Default, Deserialize)]
pub struct TextRun {
    #[serde(default)]
    pub content: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParagraphStyle {
    #[serde(default)]
    pub named_style_type: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Table {
    #[serde(default)]
    pub table_rows: Vec<TableRow>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableRow {
    #[serde(default)]
    pub table_cells: Vec<TableCell>,
}

#[derive(Debug, Default, Deserialize)]
pub struct TableCell {
    #[serde(default)]
    pub content: Vec<StructuralElement>,
}

/// A heading found in a document body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Heading {
    pub level: u8,
    pub text: String,
}

impl Paragraph {
    fn text(&self) -> String {
        self.elements
            .iter()
            .filter_map(|e| e.text_run.as_ref())
            .map(|r| r.content.as_str())
            .collect()
    }

    /// Heading level: `TITLE` counts as 1, `HEADING_n` as n.
    fn heading_level(&self) -> Option<u8> {
        let style = self.paragraph_style.as_ref()?.named_style_type.as_deref()?;
        match style {
            "TITLE" => Some(1),
            s => s.strip_prefix("HEADING_")?.parse().ok(),
        }
    }
}

impl Document {
    /// All tabs, depth-first, child tabs right after their parent.
    pub fn flat_tabs(&self) -> Vec<&DocTab> {
        fn walk<'a>(tabs: &'a [DocTab], out: &mut Vec<&'a DocTab>) {
            for tab in tabs {
                out.push(tab);
                walk(&tab.child_tabs, out);
            }
        }
        let mut out = Vec::new();
        walk(&self.tabs, &mut out);
        out
    }

    /// Tab ids and titles in display order; untitled tabs become `Tab n`.
    pub fn tab_infos(&self) -> Vec<TabInfo> {
        self.flat_tabs()
            .into_iter()
            .enumerate()
            .map(|(idx, tab)| {
                let props = tab.tab_properties.as_ref();
                TabInfo {
                    tab_id: props
                        .and_then(|p| p.tab_id.clone())
                        .unwrap_or_else(|| format!("tab_{idx}")),
                    title: props
                        .and_then(|p| p.title.clone())
                        .filter(|t| !t.trim().is_empty())
                        .unwrap_or_else(|| format!("Tab {}", idx + 1)),
                }
            })
            .collect()
    }

    pub fn find_tab(&self, tab_id: &str) -> Option<&DocTab> {
        self.flat_tabs().into_iter().find(|tab| {
            tab.tab_properties
                .as_ref()
                .and_then(|p| p.tab_id.as_deref())
                == Some(tab_id)
        })
    }

    /// Headings across every tab body, or the legacy single body.
    pub fn headings(&self) -> Vec<Heading> {
        let bodies: Vec<&Body> = if self.tabs.is_empty() {
            self.body.iter().collect()
        } else {
            self.flat_tabs()
                .into_iter()
                .filter_map(|t| t.document_tab.as_ref()?.body.as_ref())
                .collect()
        };

        bodies
            .into_iter()
            .flat_map(|b| b.content.iter())
            .filter_map(|e| e.paragraph.as_ref())
            .filter_map(|p| {
                let level = p.heading_level()?;
                Some(Heading {
                    level,
                    text: p.text().trim().to_string(),
                })
            })
            .collect()
    }
}

impl DocTab {
    /// Render the tab body as markdown: headings become `#` lines, tables
    /// become pipe tables, everything else is plain paragraph text.
    pub fn to_markdown(&self) -> String {
        let mut out = String::new();
        if let Some(body) = self.document_tab.as_ref().and_then(|d| d.body.as_ref()) {
            render_elements(&body.content, &mut out);
        }
        out
    }
}

fn render_elements(elements: &[StructuralElement], out: &mut String) {
    for element in elements {
        if let Some(paragraph) = &element.paragraph {
            let text = paragraph.text();
            match paragraph.heading_level() {
                Some(level) if !text.trim().is_empty() => {
                    out.push_str(&"#".repeat(level.clamp(1, 6) as usize));
                    out.push(' ');
                    out.push_str(text.trim());
                    out.push('\n');
                }
                _ => out.push_str(&text),
            }
        } else if let Some(table) = &element.table {
            render_table(table, out);
        }
    }
}

fn render_table(table: &Table, out: &mut String) {
    for (row_idx, row) in table.table_rows.iter().enumerate() {
        let cells: Vec<String> = row
            .table_cells
            .iter()
            .map(|cell| {
                let mut text = String::new();
                render_elements(&cell.content, &mut text);
                text.split_whitespace().collect::<Vec<_>>().join(" ").replace('|', "\\|")
            })
            .collect();

        out.push_str("| ");
        out.push_str(&cells.join(" | "));
        out.push_str(" |\n");

        if row_idx == 0 {
            out.push('|');
            out.push_str(&" --- |".repeat(cells.len()));
            out.push('\n');
        }
    }
    out.push('\n');
}
