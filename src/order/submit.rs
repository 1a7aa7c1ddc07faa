//! Exporting the finished scene and handing it to an order intake.

use std::path::PathBuf;

use anyhow::Context;
use xxhash_rust::xxh3::xxh3_64_with_seed;

use crate::foundation::error::{CakeError, CakeResult};
use crate::record::schema::CakeConfiguration;
use crate::scene::model::SceneNode;

/// Field name of the exported scene attachment.
pub const SCENE_FIELD: &str = "cakeModel";

#[derive(Clone, Debug, PartialEq, Eq)]
/// Serialized scene ready to attach to an order.
pub struct SceneExport {
    pub bytes: Vec<u8>,
    pub content_type: String,
    /// File extension without the dot.
    pub extension: String,
}

/// Turns the assembled scene into a transferable file.
pub trait SceneExporter {
    fn export(&self, scene: &SceneNode) -> CakeResult<SceneExport>;
}

#[derive(Clone, Copy, Debug, Default)]
/// Writes the scene-node tree as JSON; textures are summarized by size and content hash.
pub struct JsonSceneExporter {
    pub pretty: bool,
}

impl SceneExporter for JsonSceneExporter {
    fn export(&self, scene: &SceneNode) -> CakeResult<SceneExport> {
        let bytes = if self.pretty {
            serde_json::to_vec_pretty(scene)?
        } else {
            serde_json::to_vec(scene)?
        };
        Ok(SceneExport {
            bytes,
            content_type: "application/json".to_string(),
            extension: "json".to_string(),
        })
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
/// Order form fields in submission order.
pub struct OrderForm {
    fields: Vec<(String, String)>,
}

impl OrderForm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(name, value);
        self
    }

    /// Replace an existing field in place or append a new one.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let (name, value) = (name.into(), value.into());
        match self.fields.iter_mut().find(|(k, _)| *k == name) {
            Some((_, v)) => *v = value,
            None => self.fields.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn fields(&self) -> &[(String, String)] {
        &self.fields
    }
}

#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize)]
pub struct Attachment {
    pub field: String,
    pub file_name: String,
    pub content_type: String,
    #[serde(skip)]
    pub bytes: Vec<u8>,
}

#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize)]
/// Everything sent to the order endpoint.
pub struct OrderSubmission {
    pub fields: Vec<(String, String)>,
    pub attachment: Attachment,
}

impl OrderSubmission {
    /// Assemble a submission. The record's `cost` fills the `cost` field when the form has none.
    pub fn build(
        form: &OrderForm,
        cfg: &CakeConfiguration,
        export: SceneExport,
        unix_millis: u128,
    ) -> Self {
        let mut form = form.clone();
        if form.get("cost").is_none()
            && let Some(cost) = cfg.cost
        {
            form.set("cost", cost.to_string());
        }
        Self {
            fields: form.fields,
            attachment: Attachment {
                field: SCENE_FIELD.to_string(),
                file_name: format!("cake_{unix_millis}.{}", export.extension),
                content_type: export.content_type,
                bytes: export.bytes,
            },
        }
    }

    /// `Content-Type` header value for [`Self::encode_multipart`].
    pub fn multipart_content_type(boundary: &str) -> String {
        format!("multipart/form-data; boundary={boundary}")
    }

    /// Encode as a `multipart/form-data` body.
    ///
    /// Fails when `boundary` is malformed or occurs anywhere in the content, since either would
    /// let a value forge extra parts.
    pub fn encode_multipart(&self, boundary: &str) -> CakeResult<Vec<u8>> {
        let bchar = |b: u8| b.is_ascii_alphanumeric() || b"'()+_,-./:=?".contains(&b);
        if !(1..=70).contains(&boundary.len()) || !boundary.bytes().all(bchar) {
            return Err(CakeError::validation(format!(
                "invalid multipart boundary '{boundary}'"
            )));
        }
        let a = &self.attachment;
        let unquotable = |s: &str| s.contains(['"', '\r', '\n']);
        if self.fields.iter().any(|(k, _)| unquotable(k))
            || unquotable(&a.field)
            || unquotable(&a.file_name)
            || a.content_type.contains(['\r', '\n'])
        {
            return Err(CakeError::validation(
                "multipart names may not contain quotes or line breaks",
            ));
        }
        if self.boundary_occurs(boundary) {
            return Err(CakeError::validation(format!(
                "multipart boundary '{boundary}' occurs in the order content"
            )));
        }

        let mut out = Vec::new();
        for (name, value) in &self.fields {
            out.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
            out.extend_from_slice(
                format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n").as_bytes(),
            );
            out.extend_from_slice(value.as_bytes());
            out.extend_from_slice(b"\r\n");
        }
        out.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
        out.extend_from_slice(
            format!(
                "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
                a.field, a.file_name
            )
            .as_bytes(),
        );
        out.extend_from_slice(format!("Content-Type: {}\r\n\r\n", a.content_type).as_bytes());
        out.extend_from_slice(&a.bytes);
        out.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());
        Ok(out)
    }

    /// A boundary derived from the attachment hash that occurs nowhere in the content.
    pub fn pick_boundary(&self) -> String {
        let mut seed = 0u64;
        loop {
            let candidate = format!(
                "cakecraft-{:016x}",
                xxh3_64_with_seed(&self.attachment.bytes, seed)
            );
            if !self.boundary_occurs(&candidate) {
                return candidate;
            }
            seed += 1;
        }
    }

    /// Encode with [`Self::pick_boundary`]; returns the `Content-Type` header and the body.
    pub fn to_multipart(&self) -> CakeResult<(String, Vec<u8>)> {
        let boundary = self.pick_boundary();
        let body = self.encode_multipart(&boundary)?;
        Ok((Self::multipart_content_type(&boundary), body))
    }

    fn boundary_occurs(&self, boundary: &str) -> bool {
        let needle = boundary.as_bytes();
        let found = |hay: &[u8]| hay.windows(needle.len()).any(|w| w == needle);
        let a = &self.attachment;
        self.fields
            .iter()
            .any(|(k, v)| found(k.as_bytes()) || found(v.as_bytes()))
            || [
                a.field.as_bytes(),
                a.file_name.as_bytes(),
                a.content_type.as_bytes(),
                a.bytes.as_slice(),
            ]
            .into_iter()
            .any(found)
    }
}

/// The order endpoint. Returns its plain-text reply unchanged; no retries.
pub trait OrderIntake {
    fn submit(&self, submission: &OrderSubmission) -> CakeResult<String>;
}

#[derive(serde::Serialize)]
#[serde(rename_all = "camelCase")]
struct SpoolManifest<'a> {
    content_type: &'a str,
    #[serde(flatten)]
    order: &'a OrderSubmission,
}

#[derive(Clone, Debug)]
/// Intake that drops orders into a directory for offline processing.
///
/// Each order leaves the scene file, the encoded `multipart/form-data` body and a JSON manifest.
pub struct SpoolIntake {
    dir: PathBuf,
}

impl SpoolIntake {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl OrderIntake for SpoolIntake {
    fn submit(&self, submission: &OrderSubmission) -> CakeResult<String> {
        std::fs::create_dir_all(&self.dir)
            .with_context(|| format!("create spool dir '{}'", self.dir.display()))?;
        let a = &submission.attachment;
        let scene_path = self.dir.join(&a.file_name);
        std::fs::write(&scene_path, &a.bytes)
            .with_context(|| format!("write '{}'", scene_path.display()))?;

        let (content_type, body) = submission.to_multipart()?;
        let body_path = self.dir.join(format!("{}.multipart", a.file_name));
        std::fs::write(&body_path, body)
            .with_context(|| format!("write '{}'", body_path.display()))?;

        let form_path = self.dir.join(format!("{}.order.json", a.file_name));
        let manifest = SpoolManifest {
            content_type: &content_type,
            order: submission,
        };
        std::fs::write(&form_path, serde_json::to_vec_pretty(&manifest)?)
            .with_context(|| format!("write '{}'", form_path.display()))?;

        tracing::info!(file = %a.file_name, fields = submission.fields.len(), "order spooled");
        Ok(format!("Order received: {}", a.file_name))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/order/submit.rs"]
mod tests;
