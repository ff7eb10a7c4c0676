use std::path::Path;

use minijinja::{path_loader, AutoEscape, Environment};
use minijinja::value::Value;

use crate::error::Result;
use crate::render::{LayoutRenderer, Model, ResourceRenderer};
use crate::resource::FileResource;
use crate::util::PathExt;

/// Renders content templates and layouts. Layouts, and anything templates
/// `extends`, `include` or `import`, are loaded by path relative to the
/// layout root.
#[derive(Debug)]
pub struct TemplateEngine {
    env: Environment<'static>,
}

impl TemplateEngine {
    pub fn new(layout_root: &Path) -> Self {
        let mut env = Environment::new();
        if layout_root.is_dir() {
            env.set_loader(path_loader(layout_root));
        }

        env.set_auto_escape_callback(|_| AutoEscape::None);
        env.add_function("now", ext::now);
        env.add_filter("deslug", ext::deslug);
        env.add_filter("slugify", ext::slugify);
        env.add_filter("date", ext::date);
        env.add_filter("split", ext::split);
        TemplateEngine { env }
    }

    /// Renders `source`, reported as `name`, with `model`.
    pub fn render_str(&self, name: &str, source: &str, model: &Model) -> Result<String> {
        Ok(self.env.render_named_str(name, source, Value::from_serialize(model))?)
    }
}

impl ResourceRenderer for TemplateEngine {
    fn output_extension(&self) -> Option<&str> {
        None
    }

    fn render(&self, file: &FileResource, _: &str, model: &Model) -> Result<String> {
        let content = file.content()?;
        let name = file.relative_path.to_url();
        self.render_str(&name, content.as_deref().unwrap_or_default(), model)
    }
}

impl LayoutRenderer for TemplateEngine {
    fn render(&self, layout: &Path, _: &FileResource, _: &str, model: &Model) -> Result<String> {
        let template = self.env.get_template(&layout.to_url())?;
        Ok(template.render(Value::from_serialize(model))?)
    }
}

mod ext {
    use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
    use minijinja::{value::Value, Error, ErrorKind};

    pub fn deslug(value: &str) -> String {
        value.replace('-', " ")
    }

    pub fn slugify(value: &str) -> String {
        crate::util::slugify(value)
    }

    pub fn date(value: Value, fmt: &str) -> Result<Value, Error> {
        if let Ok(ts) = i64::try_from(value.clone()) {
            let datetime = DateTime::from_timestamp(ts, 0)
                .ok_or_else(|| Error::new(
                    ErrorKind::InvalidOperation,
                    "invalid timestamp provided to `date`"
                ))?;

            return Ok(datetime.format(fmt).to_string().into());
        }

        let kind = value.kind();
        let string = value.as_str()
            .ok_or_else(|| Error::new(
                ErrorKind::InvalidOperation,
                format!("`date` must be applied to a string or integer, found {kind}")
            ))?;

        let datetime = string.parse::<NaiveDate>().map(|d| d.format(fmt))
            .or_else(|_| string.parse::<NaiveTime>().map(|t| t.format(fmt)))
            .or_else(|_| string.parse::<NaiveDateTime>().map(|dt| dt.format(fmt)))
            .or_else(|_| NaiveDateTime::parse_from_str(string, "%Y-%m-%d %H:%M:%S").map(|dt| dt.format(fmt)))
            .or_else(|_| string.parse::<DateTime<Utc>>().map(|dt| dt.format(fmt)))
            .map_err(|e| Error::new(
                ErrorKind::InvalidOperation,
                format!("failed to parse {string}: {e}")
            ))?;

        Ok(datetime.to_string().into())
    }

    pub fn split(value: &str, pat: &str, n: Option<usize>) -> Result<Value, Error> {
        match n {
            Some(n) => Ok(value.split(pat).nth(n).map(Value::from).unwrap_or(Value::UNDEFINED)),
            None => Ok(value.split(pat).map(Value::from).collect()),
        }
    }

    pub fn now() -> u64 {
        std::time::SystemTime::now()
            .duration_since(std::time::SystemTime::UNIX_EPOCH)
            .map_or(0, |d| d.as_secs())
    }
}

impl_error_detail_with_std_error!(minijinja::Error => Template);
