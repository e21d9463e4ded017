use anyhow::Result;
use ecolens_contracts::AnalysisPayload;

use super::Transport;
use crate::selection::ImageUpload;

/// Offline transport answering in the plain-text convention without contacting
/// any service.
#[derive(Debug, Clone, Default)]
pub struct DryrunTransport;

impl DryrunTransport {
    pub fn new() -> Self {
        Self
    }
}

/// Local input must never read as markup.
fn plain_text(value: &str) -> String {
    value.replace(['<', '>'], "")
}

fn describe_dimensions(bytes: &[u8]) -> String {
    match image::load_from_memory(bytes) {
        Ok(decoded) => format!("{}x{} pixels", decoded.width(), decoded.height()),
        Err(err) => {
            log::debug!("dryrun could not decode image: {err}");
            "unknown (image could not be decoded)".to_string()
        }
    }
}

impl Transport for DryrunTransport {
    fn name(&self) -> &str {
        "dryrun"
    }

    fn describe(&self, upload: &ImageUpload) -> Result<AnalysisPayload> {
        let text = format!(
            "**Dry run analysis**\n\
             * File: {}\n\
             * Media type: {}\n\
             * Size: {} bytes\n\
             * Dimensions: {}\n\n\
             No inference service was contacted.",
            plain_text(&upload.file_name),
            plain_text(&upload.media_type),
            upload.bytes.len(),
            describe_dimensions(&upload.bytes),
        );
        Ok(AnalysisPayload::Content(text))
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;
    use std::sync::Arc;

    use ecolens_contracts::{normalize, AnalysisPayload, ContentBlock};
    use image::{ImageFormat, Rgb, RgbImage};

    use super::DryrunTransport;
    use crate::selection::ImageUpload;
    use crate::transport::Transport;

    fn png_bytes(width: u32, height: u32) -> anyhow::Result<Vec<u8>> {
        let img = RgbImage::from_pixel(width, height, Rgb([40, 160, 60]));
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, ImageFormat::Png)?;
        Ok(out.into_inner())
    }

    #[test]
    fn dryrun_reports_decoded_dimensions_as_markdown_lite() -> anyhow::Result<()> {
        let upload = ImageUpload {
            file_name: "peel.png".to_string(),
            media_type: "image/png".to_string(),
            bytes: Arc::from(png_bytes(4, 3)?),
        };
        let payload = DryrunTransport::new().describe(&upload)?;
        let result = normalize(Some(&payload), None);
        let blocks = result.blocks();
        assert_eq!(
            blocks.first(),
            Some(&ContentBlock::Heading("Dry run analysis".to_string()))
        );
        assert!(blocks.contains(&ContentBlock::ListItem("Dimensions: 4x3 pixels".to_string())));
        assert_eq!(
            blocks.last(),
            Some(&ContentBlock::Paragraph(
                "No inference service was contacted.".to_string()
            ))
        );
        Ok(())
    }

    #[test]
    fn undecodable_bytes_still_answer() -> anyhow::Result<()> {
        let upload = ImageUpload {
            file_name: "broken.png".to_string(),
            media_type: "image/png".to_string(),
            bytes: Arc::from(b"not a png".to_vec()),
        };
        let payload = DryrunTransport::new().describe(&upload)?;
        assert!(matches!(payload, AnalysisPayload::Content(_)));
        Ok(())
    }

    #[test]
    fn angle_brackets_in_file_name_stay_plain_text() -> anyhow::Result<()> {
        let upload = ImageUpload {
            file_name: "<p onclick=x>.png".to_string(),
            media_type: "image/png".to_string(),
            bytes: Arc::from(png_bytes(2, 2)?),
        };
        let payload = DryrunTransport::new().describe(&upload)?;
        let result = normalize(Some(&payload), None);
        let blocks = result.blocks();
        assert!(!blocks
            .iter()
            .any(|block| matches!(block, ContentBlock::RawMarkup(_))));
        assert!(blocks.contains(&ContentBlock::ListItem("File: p onclick=x.png".to_string())));
        Ok(())
    }
}
