use serde_json::Value;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;

use crate::error::{MailError, Result};

/// Loads mail templates from disk and composes them into full documents.
///
/// Each named template is wrapped into `base.html` by substituting the base's
/// `{{main}}` slot, the base's stylesheet is inlined onto the elements (mail
/// clients widely ignore `<style>` blocks), and the result is cached. The
/// composed document keeps its remaining `{{key}}` placeholders for per-send
/// data; placeholders live in text content, which inlining leaves untouched.
/// Variables use `{{key}}` syntax and are filled from a JSON object at render
/// time.
pub struct TemplateStore {
    dir: PathBuf,
    cache: Mutex<HashMap<String, String>>,
}

impl TemplateStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Compose (or fetch from cache) the full document for a named template
    pub fn build(&self, name: &str) -> Result<String> {
        {
            let cache = self.cache.lock().expect("template cache poisoned");
            if let Some(html) = cache.get(name) {
                return Ok(html.clone());
            }
        }

        let base = self.load("base")?;
        let main = self.load(name)?;
        let composed = base.replace("{{main}}", &main);
        let html =
            css_inline::inline(&composed).map_err(|e| MailError::Template(e.to_string()))?;

        let mut cache = self.cache.lock().expect("template cache poisoned");
        cache.insert(name.to_string(), html.clone());
        Ok(html)
    }

    fn load(&self, name: &str) -> Result<String> {
        let path = self.dir.join(format!("{}.html", name));
        if !path.is_file() {
            return Err(MailError::TemplateNotFound(name.to_string()));
        }
        Ok(std::fs::read_to_string(path)?)
    }

    /// Substitute `{{key}}` placeholders from a JSON object.
    ///
    /// String values are inserted verbatim; other values use their JSON
    /// rendering. Keys absent from the data leave their placeholders intact.
    pub fn render(template: &str, data: &Value) -> String {
        let mut html = template.to_string();
        if let Some(object) = data.as_object() {
            for (key, value) in object {
                let placeholder = format!("{{{{{}}}}}", key);
                match value.as_str() {
                    Some(s) => html = html.replace(&placeholder, s),
                    None => html = html.replace(&placeholder, &value.to_string()),
                }
            }
        }
        html
    }
}
