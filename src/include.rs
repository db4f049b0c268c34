//! `include`: fetches remote content and shows it in place of an element, via `replace`.

use crate::{
	descriptor::{Component, Instruction, Method, Position},
	engine::Engine,
	error::IncludeError,
	host::Document,
	sanitize::escape_html,
};
use core::fmt;
use serde::{Deserialize, Serialize};
use tracing::{instrument, trace};

/// A fetched resource.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchResponse {
	pub status: u16,
	/// The `Content-Type` header, if any.
	pub content_type: Option<String>,
	pub body: Vec<u8>,
}

/// Retrieves remote resources for [`Engine::include`].
#[allow(async_fn_in_trait)]
pub trait Fetch {
	/// # Errors
	///
	/// Iff no response could be obtained at all. Error statuses are responses.
	async fn fetch(&self, url: &str) -> Result<FetchResponse, IncludeError>;
}

/// How fetched content is presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
	Html,
	Json,
	Form,
	Image,
	Video,
	Pdf,
	Text,
	Other,
}

impl ContentKind {
	/// Classifies a `Content-Type` header value. Parameters like `charset` are ignored.
	#[must_use]
	pub fn from_content_type(content_type: &str) -> Self {
		let essence = content_type.split(';').next().unwrap_or_default().trim().to_ascii_lowercase();
		match essence.as_str() {
			"text/html" | "application/xhtml+xml" => Self::Html,
			"application/json" => Self::Json,
			json if json.starts_with("application/") && json.ends_with("+json") => Self::Json,
			"application/x-www-form-urlencoded" | "multipart/form-data" => Self::Form,
			"application/pdf" => Self::Pdf,
			image if image.starts_with("image/") => Self::Image,
			video if video.starts_with("video/") => Self::Video,
			text if text.starts_with("text/") => Self::Text,
			_ => Self::Other,
		}
	}

	fn as_str(self) -> &'static str {
		match self {
			Self::Html => "html",
			Self::Json => "json",
			Self::Form => "form",
			Self::Image => "image",
			Self::Video => "video",
			Self::Pdf => "pdf",
			Self::Text => "text",
			Self::Other => "other",
		}
	}
}

impl fmt::Display for ContentKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct IncludeOptions {
	/// `id` of the element to replace, and of its replacement.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub id: Option<String>,
	/// Where to add the content if nothing is replaced.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub parent: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub position: Option<Position>,
	/// Rejects responses of any other kind.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub expect: Option<ContentKind>,
}

/// Outcome of a successful [`Engine::include`]. Displays as a short status line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncludeStatus {
	pub url: String,
	pub kind: ContentKind,
	pub status: u16,
}

impl fmt::Display for IncludeStatus {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{} {} {}", self.status, self.kind, self.url)
	}
}

impl<D: Document> Engine<D> {
	/// Fetches `url` and shows it in a `<div>` that replaces the element with `options.id`,
	/// or is added under `options.parent` if there's none.
	///
	/// Nothing is cancelled if the document changes while the fetch is pending.
	///
	/// # Errors
	///
	/// Iff the fetch fails, the response status isn't 2xx, its kind isn't `options.expect`,
	/// or a textual body isn't valid for its kind. The document is unchanged in that case.
	#[instrument(skip(self, fetch))]
	pub async fn include<F: Fetch>(&self, fetch: &F, url: &str, options: &IncludeOptions) -> Result<IncludeStatus, IncludeError> {
		let response = fetch.fetch(url).await?;
		if !(200..300).contains(&response.status) {
			return Err(IncludeError::Status {
				url: url.to_owned(),
				status: response.status,
			});
		}

		let content_type = response.content_type.as_deref().unwrap_or_default();
		let kind = ContentKind::from_content_type(content_type);
		if let Some(expected) = options.expect {
			if expected != kind {
				return Err(IncludeError::ContentType {
					url: url.to_owned(),
					expected: expected.to_string(),
					found: content_type.to_owned(),
				});
			}
		}
		trace!(%kind, "Fetched {} bytes.", response.body.len());

		let slot = render(kind, url, &response.body)?;
		let component = Component {
			kind: Some("div".to_owned()),
			id: options.id.clone(),
			slot: Some(slot),
			parent: options.parent.clone(),
			position: options.position,
			..Component::default()
		}
		.with_attribute("data-content-kind", kind.as_str());
		self.apply_ui(Instruction::new(Method::Replace).with_component(component));

		Ok(IncludeStatus {
			url: url.to_owned(),
			kind,
			status: response.status,
		})
	}
}

fn text<'a>(url: &str, body: &'a [u8]) -> Result<&'a str, IncludeError> {
	core::str::from_utf8(body).map_err(|error| IncludeError::Decode {
		url: url.to_owned(),
		reason: error.to_string(),
	})
}

/// Markup presenting a response body of the given kind.
fn render(kind: ContentKind, url: &str, body: &[u8]) -> Result<String, IncludeError> {
	let url_attribute = escape_html(url);
	Ok(match kind {
		ContentKind::Html => text(url, body)?.to_owned(),
		ContentKind::Json => {
			let value: serde_json::Value = serde_json::from_slice(body).map_err(|error| IncludeError::Decode {
				url: url.to_owned(),
				reason: error.to_string(),
			})?;
			let pretty = serde_json::to_string_pretty(&value).map_err(|error| IncludeError::Decode {
				url: url.to_owned(),
				reason: error.to_string(),
			})?;
			format!("<pre>{}</pre>", escape_html(&pretty))
		}
		ContentKind::Form => {
			let body = text(url, body)?;
			if body.contains('=') && !body.contains('\n') {
				let mut markup = String::from("<dl>");
				for (name, value) in parse_form(body) {
					markup.push_str(&format!("<dt>{}</dt><dd>{}</dd>", escape_html(&name), escape_html(&value)));
				}
				markup.push_str("</dl>");
				markup
			} else {
				format!("<pre>{}</pre>", escape_html(body))
			}
		}
		ContentKind::Image => format!(r#"<img src="{}" alt="">"#, url_attribute),
		ContentKind::Video => format!(r#"<video controls src="{}"></video>"#, url_attribute),
		ContentKind::Pdf => format!(r#"<embed type="application/pdf" src="{}">"#, url_attribute),
		ContentKind::Text => format!("<pre>{}</pre>", escape_html(text(url, body)?)),
		ContentKind::Other => format!(r#"<a href="{0}" download>{0}</a>"#, url_attribute),
	})
}

/// Decodes `application/x-www-form-urlencoded` pairs.
fn parse_form(body: &str) -> Vec<(String, String)> {
	body.split('&')
		.filter(|pair| !pair.is_empty())
		.map(|pair| {
			let (name, value) = pair.split_once('=').unwrap_or((pair, ""));
			(percent_decode(name), percent_decode(value))
		})
		.collect()
}

fn percent_decode(encoded: &str) -> String {
	let bytes = encoded.as_bytes();
	let mut decoded = Vec::with_capacity(bytes.len());
	let mut i = 0;
	while i < bytes.len() {
		match bytes[i] {
			b'+' => decoded.push(b' '),
			b'%' => match encoded.get(i + 1..i + 3).and_then(|hex| u8::from_str_radix(hex, 16).ok()) {
				Some(byte) => {
					decoded.push(byte);
					i += 2;
				}
				None => decoded.push(b'%'),
			},
			byte => decoded.push(byte),
		}
		i += 1;
	}
	String::from_utf8_lossy(&decoded).into_owned()
}
