use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Output formats a finished variant can be delivered in.
///
/// Plain text and markdown are rendered here; paginated and word-processor
/// formats need an external converter and are refused until one is wired
/// in, without touching the cached variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum ExportFormat {
	Txt,
	Markdown,
	Pdf,
	Docx,
}

impl ExportFormat {
	pub fn extension(&self) -> &'static str {
		match self {
			Self::Txt => "txt",
			Self::Markdown => "md",
			Self::Pdf => "pdf",
			Self::Docx => "docx",
		}
	}

	pub fn content_type(&self) -> &'static str {
		match self {
			Self::Txt => "text/plain; charset=utf-8",
			Self::Markdown => "text/markdown; charset=utf-8",
			Self::Pdf => "application/pdf",
			Self::Docx => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
		}
	}
}

#[derive(Debug, Error)]
pub enum ExportError {
	#[error("no converter available for '{0}' output")]
	ConverterUnavailable(&'static str),
}

/// A rendered document ready to hand to the transport layer.
#[derive(Debug)]
pub struct ExportFile {
	pub filename: String,
	pub content_type: &'static str,
	pub bytes: Vec<u8>,
}

/// Render `text` for delivery. The markdown rendition gets a title line
/// built from the mode label so the document stands on its own.
pub fn render(job_id: uuid::Uuid, mode_label: &str, text: &str, format: ExportFormat) -> Result<ExportFile, ExportError> {
	let body = match format {
		ExportFormat::Txt => text.as_bytes().to_vec(),
		ExportFormat::Markdown => {
			let mut doc = String::with_capacity(text.len() + 64);
			doc.push_str(&format!("# Transcript ({mode_label})\n\n"));
			doc.push_str(text);
			if !text.ends_with('\n') {
				doc.push('\n');
			}
			doc.into_bytes()
		}
		ExportFormat::Pdf => return Err(ExportError::ConverterUnavailable("pdf")),
		ExportFormat::Docx => return Err(ExportError::ConverterUnavailable("docx")),
	};

	Ok(ExportFile {
		filename: format!("{job_id}.{}", format.extension()),
		content_type: format.content_type(),
		bytes: body,
	})
}
