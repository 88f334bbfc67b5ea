//! 邮件模板系统

use taller_errors::{AppError, AppResult};
use tera::Tera;

/// 邮件模板管理器
///
/// 每个邮件由一对模板组成：`{name}.html` 与 `{name}.txt`。
pub struct EmailTemplate {
    tera: Tera,
}

impl EmailTemplate {
    /// 从内存中的模板字符串创建
    pub fn from_strings<'a>(
        templates: impl IntoIterator<Item = (&'a str, &'a str)>,
    ) -> AppResult<Self> {
        let mut tera = Tera::default();
        tera.add_raw_templates(templates)
            .map_err(|e| AppError::internal(format!("Failed to add templates: {}", e)))?;
        Ok(Self { tera })
    }

    /// 渲染单个模板
    pub fn render(&self, template_name: &str, context: &serde_json::Value) -> AppResult<String> {
        let context = tera::Context::from_serialize(context)
            .map_err(|e| AppError::internal(format!("Failed to create template context: {}", e)))?;

        self.tera.render(template_name, &context).map_err(|e| {
            AppError::internal(format!("Failed to render template {}: {}", template_name, e))
        })
    }

    /// 渲染 HTML 与纯文本两个版本
    pub fn render_pair(
        &self,
        name: &str,
        context: &serde_json::Value,
    ) -> AppResult<(String, String)> {
        let html = self.render(&format!("{}.html", name), context)?;
        let text = self.render(&format!("{}.txt", name), context)?;
        Ok((html, text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_pair() {
        let template = EmailTemplate::from_strings([
            ("greeting.html", "<h1>Hola {{ name }}!</h1>"),
            ("greeting.txt", "Hola {{ name }}!"),
        ])
        .unwrap();

        let (html, text) = template
            .render_pair("greeting", &serde_json::json!({ "name": "Ana" }))
            .unwrap();

        assert_eq!(html, "<h1>Hola Ana!</h1>");
        assert_eq!(text, "Hola Ana!");
    }

    #[test]
    fn test_html_is_escaped() {
        let template =
            EmailTemplate::from_strings([("x.html", "<p>{{ name }}</p>")]).unwrap();

        let html = template
            .render("x.html", &serde_json::json!({ "name": "<script>" }))
            .unwrap();

        assert_eq!(html, "<p>&lt;script&gt;</p>");
    }

    #[test]
    fn test_missing_template() {
        let template = EmailTemplate::from_strings([("a.html", "a")]).unwrap();
        assert!(template.render_pair("a", &serde_json::json!({})).is_err());
    }
}
