use anyhow::Result;
use clap::ValueEnum;
use ecolens_contracts::{ContentBlock, NormalizedResult};
use ecolens_engine::RequestState;
use serde_json::{json, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Html,
    Json,
}

pub fn render_state(state: &RequestState<'_>, format: OutputFormat) -> Result<String> {
    if let RequestState::Completed(result) = state {
        return render_result(result, format);
    }
    let message = match state {
        RequestState::Idle => "No image selected.",
        RequestState::Ready => "Image selected; not yet submitted.",
        _ => "Analyzing waste...",
    };
    Ok(match format {
        OutputFormat::Text => message.to_string(),
        OutputFormat::Html => format!("<p class=\"analysis-status\">{}</p>", escape_html(message)),
        OutputFormat::Json => serde_json::to_string_pretty(&json!({ "state": state.name() }))?,
    })
}

/// Blocks are rendered by tag only. `RawMarkup` is emitted verbatim in every
/// format: it was classified upstream as trusted markup.
pub fn render_result(result: &NormalizedResult, format: OutputFormat) -> Result<String> {
    Ok(match format {
        OutputFormat::Text => render_text(result),
        OutputFormat::Html => render_html(result),
        OutputFormat::Json => {
            let mut value = serde_json::to_value(result)?;
            if let Value::Object(map) = &mut value {
                map.insert("state".to_string(), Value::from("completed"));
            }
            serde_json::to_string_pretty(&value)?
        }
    })
}

fn render_text(result: &NormalizedResult) -> String {
    let blocks = match result {
        NormalizedResult::Failure { kind, message } => {
            return format!("❌ {}: {message}", kind.display_label());
        }
        NormalizedResult::Success { blocks } => blocks,
    };
    let mut lines: Vec<String> = Vec::new();
    for block in blocks {
        match block {
            ContentBlock::Heading(text) => {
                if !lines.is_empty() {
                    lines.push(String::new());
                }
                lines.push(text.clone());
                lines.push("-".repeat(text.chars().count().max(3)));
            }
            ContentBlock::ListItem(text) => lines.push(format!("  • {text}")),
            ContentBlock::Paragraph(text) | ContentBlock::RawMarkup(text) => {
                lines.push(text.clone())
            }
        }
    }
    lines.join("\n")
}

fn render_html(result: &NormalizedResult) -> String {
    let blocks = match result {
        NormalizedResult::Failure { kind, message } => {
            return format!(
                "<p class=\"analysis-error\">❌ {}: {}</p>",
                escape_html(kind.display_label()),
                escape_html(message)
            );
        }
        NormalizedResult::Success { blocks } => blocks,
    };

    let mut out = String::from("<div class=\"waste-analysis-content\">\n");
    let mut in_list = false;
    for block in blocks {
        let is_item = matches!(block, ContentBlock::ListItem(_));
        if in_list && !is_item {
            out.push_str("</ul>\n");
            in_list = false;
        }
        match block {
            ContentBlock::Heading(text) => {
                out.push_str(&format!("<h3>{}</h3>\n", escape_html(text)));
            }
            ContentBlock::ListItem(text) => {
                if !in_list {
                    out.push_str("<ul>\n");
                    in_list = true;
                }
                out.push_str(&format!("<li>{}</li>\n", escape_html(text)));
            }
            ContentBlock::Paragraph(text) => {
                out.push_str(&format!("<p>{}</p>\n", escape_html(text)));
            }
            ContentBlock::RawMarkup(markup) => {
                out.push_str(markup);
                out.push('\n');
            }
        }
    }
    if in_list {
        out.push_str("</ul>\n");
    }
    out.push_str("</div>");
    out
}

fn escape_html(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(ch),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use ecolens_contracts::{ContentBlock, ErrorKind, NormalizedResult};
    use ecolens_engine::RequestState;
    use serde_json::Value;

    use super::{render_result, render_state, OutputFormat};

    fn sample() -> NormalizedResult {
        NormalizedResult::success(vec![
            ContentBlock::Heading("Banana peel".to_string()),
            ContentBlock::ListItem("Chop it".to_string()),
            ContentBlock::ListItem("Bury <5cm> deep".to_string()),
            ContentBlock::Paragraph("Less methane & landfill.".to_string()),
        ])
    }

    #[test]
    fn text_output_styles_each_block() -> anyhow::Result<()> {
        let rendered = render_result(&sample(), OutputFormat::Text)?;
        assert_eq!(
            rendered,
            "Banana peel\n-----------\n  • Chop it\n  • Bury <5cm> deep\nLess methane & landfill."
        );
        Ok(())
    }

    #[test]
    fn html_output_escapes_text_blocks_and_groups_list_items() -> anyhow::Result<()> {
        let rendered = render_result(&sample(), OutputFormat::Html)?;
        assert_eq!(
            rendered,
            "<div class=\"waste-analysis-content\">\n\
             <h3>Banana peel</h3>\n\
             <ul>\n<li>Chop it</li>\n<li>Bury &lt;5cm&gt; deep</li>\n</ul>\n\
             <p>Less methane &amp; landfill.</p>\n\
             </div>"
        );
        Ok(())
    }

    #[test]
    fn raw_markup_is_injected_verbatim() -> anyhow::Result<()> {
        let result = NormalizedResult::success(vec![ContentBlock::RawMarkup(
            "<h2>Organic</h2><p>Yes</p>".to_string(),
        )]);
        let rendered = render_result(&result, OutputFormat::Html)?;
        assert!(rendered.contains("<h2>Organic</h2><p>Yes</p>"));
        Ok(())
    }

    #[test]
    fn failures_are_visibly_distinct() -> anyhow::Result<()> {
        let network = NormalizedResult::failure(ErrorKind::NetworkError, "timeout");
        assert_eq!(
            render_result(&network, OutputFormat::Text)?,
            "❌ Network error: timeout"
        );
        let app = NormalizedResult::failure(ErrorKind::ApplicationError, "<bad> image");
        assert_eq!(
            render_result(&app, OutputFormat::Html)?,
            "<p class=\"analysis-error\">❌ Error: &lt;bad&gt; image</p>"
        );
        Ok(())
    }

    #[test]
    fn empty_success_renders_nothing_in_text() -> anyhow::Result<()> {
        let empty = NormalizedResult::success(Vec::new());
        assert_eq!(render_result(&empty, OutputFormat::Text)?, "");
        Ok(())
    }

    #[test]
    fn json_output_carries_state_and_blocks() -> anyhow::Result<()> {
        let result = sample();
        let rendered = render_state(&RequestState::Completed(&result), OutputFormat::Json)?;
        let value: Value = serde_json::from_str(&rendered)?;
        assert_eq!(value["state"], Value::from("completed"));
        assert_eq!(value["status"], Value::from("success"));
        assert_eq!(value["blocks"][1]["type"], Value::from("list_item"));

        let idle = render_state(&RequestState::Idle, OutputFormat::Json)?;
        let value: Value = serde_json::from_str(&idle)?;
        assert_eq!(value["state"], Value::from("idle"));
        Ok(())
    }
}
